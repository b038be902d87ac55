//! CLI handlers for `diet ingredient` and `diet food` subcommands.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use diet_core::catalog::{self, FoodDetail, FoodInput};
use diet_db::models::MealKind;

use crate::{FoodCommands, IngredientCommands};

// -----------------------------------------------------------------------
// Public entry points
// -----------------------------------------------------------------------

pub async fn run_ingredient_command(command: IngredientCommands, pool: &PgPool) -> Result<()> {
    match command {
        IngredientCommands::Add { name } => {
            let ingredient = catalog::create_ingredient(pool, &name).await?;
            println!("Ingredient added: {} ({})", ingredient.name, ingredient.id);
        }
        IngredientCommands::List => cmd_list_ingredients(pool).await?,
        IngredientCommands::Rename { id, name } => {
            let id = parse_id(&id, "ingredient")?;
            let ingredient = catalog::rename_ingredient(pool, id, &name).await?;
            println!("Ingredient {id} renamed to {}.", ingredient.name);
        }
        IngredientCommands::Remove { id } => {
            let id = parse_id(&id, "ingredient")?;
            catalog::delete_ingredient(pool, id).await?;
            println!("Ingredient {id} removed.");
        }
    }
    Ok(())
}

pub async fn run_food_command(command: FoodCommands, pool: &PgPool) -> Result<()> {
    match command {
        FoodCommands::Add {
            name,
            meals,
            ingredients,
        } => {
            let input = food_input(name, meals, &ingredients)?;
            let detail = catalog::create_food(pool, &input).await?;
            println!("Food added.");
            print_food(&detail);
        }
        FoodCommands::List => cmd_list_foods(pool).await?,
        FoodCommands::Update {
            id,
            name,
            meals,
            ingredients,
        } => {
            let id = parse_id(&id, "food")?;
            let input = food_input(name, meals, &ingredients)?;
            let detail = catalog::update_food(pool, id, &input).await?;
            println!("Food updated.");
            print_food(&detail);
        }
        FoodCommands::Remove { id } => {
            let id = parse_id(&id, "food")?;
            catalog::delete_food(pool, id).await?;
            println!("Food {id} removed.");
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

pub fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("invalid {what} ID: {raw}"))
}

fn food_input(name: String, meals: Vec<MealKind>, ingredients: &[String]) -> Result<FoodInput> {
    let ingredient_ids = ingredients
        .iter()
        .map(|raw| parse_id(raw, "ingredient"))
        .collect::<Result<Vec<_>>>()?;
    Ok(FoodInput {
        name,
        allowed_meal_kinds: meals,
        ingredient_ids,
    })
}

fn print_food(detail: &FoodDetail) {
    let names: Vec<&str> = detail.ingredients.iter().map(|i| i.name.as_str()).collect();
    println!();
    println!("  Food ID:     {}", detail.food.id);
    println!("  Name:        {}", detail.food.name);
    println!("  Meals:       {}", detail.food.allowed_meal_kinds);
    println!("  Ingredients: {}", names.join(", "));
}

// -----------------------------------------------------------------------
// Listings
// -----------------------------------------------------------------------

async fn cmd_list_ingredients(pool: &PgPool) -> Result<()> {
    let ingredients = catalog::list_ingredients(pool).await?;
    if ingredients.is_empty() {
        println!("No ingredients yet. Use `diet ingredient add <name>` to add one.");
        return Ok(());
    }

    let name_w = ingredients
        .iter()
        .map(|i| i.name.len())
        .max()
        .unwrap_or(4)
        .max(4);
    println!("{:<36}  {:<name_w$}", "ID", "NAME");
    for ingredient in &ingredients {
        println!("{:<36}  {:<name_w$}", ingredient.id, ingredient.name);
    }
    Ok(())
}

async fn cmd_list_foods(pool: &PgPool) -> Result<()> {
    let foods = catalog::list_foods(pool).await?;
    if foods.is_empty() {
        println!("No foods yet. Use `diet food add` to add one.");
        return Ok(());
    }

    let name_w = foods
        .iter()
        .map(|f| f.food.name.len())
        .max()
        .unwrap_or(4)
        .max(4);
    let meals_w = 23;
    println!(
        "{:<36}  {:<name_w$}  {:<meals_w$}  INGREDIENTS",
        "ID", "NAME", "MEALS"
    );
    for detail in &foods {
        let names: Vec<&str> = detail.ingredients.iter().map(|i| i.name.as_str()).collect();
        println!(
            "{:<36}  {:<name_w$}  {:<meals_w$}  {}",
            detail.food.id,
            detail.food.name,
            detail.food.allowed_meal_kinds.to_string(),
            names.join(", "),
        );
    }
    Ok(())
}
