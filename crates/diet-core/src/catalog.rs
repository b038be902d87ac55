//! Catalog edits: ingredients and foods.
//!
//! Every write is validated first (trimmed non-empty names, unique names
//! ignoring case, known ingredient ids) and refused if the row is still
//! referenced.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use diet_db::models::{Food, Ingredient, MealKind, MealKindSet};
use diet_db::queries::foods::{self, NewFood};
use diet_db::queries::ingredients;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("name must not be empty")]
    NameRequired,

    #[error("a food needs at least one meal kind")]
    NoMealKinds,

    #[error("a food needs at least one ingredient")]
    NoIngredients,

    #[error("unknown ingredient ids: {}", join_ids(.0))]
    UnknownIngredients(Vec<Uuid>),

    #[error("name {0:?} is already taken")]
    DuplicateName(String),

    #[error("ingredient {0} not found")]
    IngredientNotFound(Uuid),

    #[error("food {0} not found")]
    FoodNotFound(Uuid),

    #[error("ingredient {0} is used by at least one food")]
    IngredientInUse(Uuid),

    #[error("food {0} is used by at least one week plan")]
    FoodInUse(Uuid),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::IngredientNotFound(_) | Self::FoodNotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName(_) | Self::IngredientInUse(_) | Self::FoodInUse(_)
        )
    }
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A food as submitted for create or update.
#[derive(Debug, Clone, Deserialize)]
pub struct FoodInput {
    pub name: String,
    pub allowed_meal_kinds: Vec<MealKind>,
    pub ingredient_ids: Vec<Uuid>,
}

/// A [`FoodInput`] that passed the checks needing no database.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFood {
    pub name: String,
    pub allowed_meal_kinds: MealKindSet,
    pub ingredient_ids: Vec<Uuid>,
}

impl ValidFood {
    fn as_new(&self) -> NewFood<'_> {
        NewFood {
            name: &self.name,
            allowed_meal_kinds: &self.allowed_meal_kinds,
            ingredient_ids: &self.ingredient_ids,
        }
    }
}

/// A food together with its resolved ingredients.
#[derive(Debug, Clone, Serialize)]
pub struct FoodDetail {
    #[serde(flatten)]
    pub food: Food,
    pub ingredients: Vec<Ingredient>,
}

/// Trim `name` and reject it if nothing is left.
pub fn normalize_name(name: &str) -> Result<String, CatalogError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::NameRequired);
    }
    Ok(trimmed.to_owned())
}

/// Shape checks on a food: name, meal kinds and ingredients present.
/// Duplicate meal kinds and ingredient ids collapse; order is kept.
pub fn validate_food_input(input: &FoodInput) -> Result<ValidFood, CatalogError> {
    let name = normalize_name(&input.name)?;

    let allowed_meal_kinds: MealKindSet = input.allowed_meal_kinds.iter().copied().collect();
    if allowed_meal_kinds.is_empty() {
        return Err(CatalogError::NoMealKinds);
    }

    let mut ingredient_ids = Vec::with_capacity(input.ingredient_ids.len());
    for id in &input.ingredient_ids {
        if !ingredient_ids.contains(id) {
            ingredient_ids.push(*id);
        }
    }
    if ingredient_ids.is_empty() {
        return Err(CatalogError::NoIngredients);
    }

    Ok(ValidFood {
        name,
        allowed_meal_kinds,
        ingredient_ids,
    })
}

// ---------------------------------------------------------------------------
// Ingredients
// ---------------------------------------------------------------------------

pub async fn list_ingredients(pool: &PgPool) -> Result<Vec<Ingredient>, CatalogError> {
    Ok(ingredients::list_ingredients(pool).await?)
}

pub async fn create_ingredient(pool: &PgPool, name: &str) -> Result<Ingredient, CatalogError> {
    let name = normalize_name(name)?;
    if ingredients::ingredient_name_taken(pool, &name, None).await? {
        return Err(CatalogError::DuplicateName(name));
    }

    let ingredient = ingredients::insert_ingredient(pool, &name).await?;
    info!(id = %ingredient.id, name = %ingredient.name, "created ingredient");
    Ok(ingredient)
}

pub async fn rename_ingredient(
    pool: &PgPool,
    id: Uuid,
    name: &str,
) -> Result<Ingredient, CatalogError> {
    let name = normalize_name(name)?;
    if ingredients::get_ingredient(pool, id).await?.is_none() {
        return Err(CatalogError::IngredientNotFound(id));
    }
    if ingredients::ingredient_name_taken(pool, &name, Some(id)).await? {
        return Err(CatalogError::DuplicateName(name));
    }

    let ingredient = ingredients::rename_ingredient(pool, id, &name)
        .await?
        .ok_or(CatalogError::IngredientNotFound(id))?;
    info!(%id, name = %ingredient.name, "renamed ingredient");
    Ok(ingredient)
}

pub async fn delete_ingredient(pool: &PgPool, id: Uuid) -> Result<(), CatalogError> {
    if ingredients::get_ingredient(pool, id).await?.is_none() {
        return Err(CatalogError::IngredientNotFound(id));
    }
    if ingredients::ingredient_in_use(pool, id).await? {
        return Err(CatalogError::IngredientInUse(id));
    }
    if !ingredients::delete_ingredient(pool, id).await? {
        return Err(CatalogError::IngredientNotFound(id));
    }
    info!(%id, "deleted ingredient");
    Ok(())
}

// ---------------------------------------------------------------------------
// Foods
// ---------------------------------------------------------------------------

/// Every food with its ingredients, ordered by name.
pub async fn list_foods(pool: &PgPool) -> Result<Vec<FoodDetail>, CatalogError> {
    let foods = foods::list_foods(pool).await?;
    let by_id: HashMap<Uuid, Ingredient> = ingredients::list_ingredients(pool)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();
    Ok(foods
        .into_iter()
        .map(|food| with_ingredients(food, &by_id))
        .collect())
}

/// Attach ingredients to a food, ordered by name. Ids missing from
/// `by_id` are skipped.
pub fn with_ingredients(food: Food, by_id: &HashMap<Uuid, Ingredient>) -> FoodDetail {
    let mut ingredients: Vec<Ingredient> = food
        .ingredient_ids
        .iter()
        .filter_map(|id| by_id.get(id).cloned())
        .collect();
    ingredients.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    FoodDetail { food, ingredients }
}

async fn detail(pool: &PgPool, food: Food) -> Result<FoodDetail, CatalogError> {
    let by_id: HashMap<Uuid, Ingredient> =
        ingredients::list_ingredients_for_foods(pool, &[food.id])
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();
    Ok(with_ingredients(food, &by_id))
}

async fn check_ingredients_exist(pool: &PgPool, ids: &[Uuid]) -> Result<(), CatalogError> {
    let missing = ingredients::missing_ingredient_ids(pool, ids).await?;
    if !missing.is_empty() {
        return Err(CatalogError::UnknownIngredients(missing));
    }
    Ok(())
}

pub async fn create_food(pool: &PgPool, input: &FoodInput) -> Result<FoodDetail, CatalogError> {
    let valid = validate_food_input(input)?;
    check_ingredients_exist(pool, &valid.ingredient_ids).await?;
    if foods::food_name_taken(pool, &valid.name, None).await? {
        return Err(CatalogError::DuplicateName(valid.name));
    }

    let food = foods::insert_food(pool, &valid.as_new()).await?;
    info!(id = %food.id, name = %food.name, kinds = %food.allowed_meal_kinds, "created food");
    detail(pool, food).await
}

/// Replace a food's name, meal kinds and ingredient set.
pub async fn update_food(
    pool: &PgPool,
    id: Uuid,
    input: &FoodInput,
) -> Result<FoodDetail, CatalogError> {
    let valid = validate_food_input(input)?;
    if foods::get_food(pool, id).await?.is_none() {
        return Err(CatalogError::FoodNotFound(id));
    }
    check_ingredients_exist(pool, &valid.ingredient_ids).await?;
    if foods::food_name_taken(pool, &valid.name, Some(id)).await? {
        return Err(CatalogError::DuplicateName(valid.name));
    }

    let food = foods::update_food(pool, id, &valid.as_new())
        .await?
        .ok_or(CatalogError::FoodNotFound(id))?;
    info!(%id, name = %food.name, "updated food");
    detail(pool, food).await
}

pub async fn delete_food(pool: &PgPool, id: Uuid) -> Result<(), CatalogError> {
    if foods::get_food(pool, id).await?.is_none() {
        return Err(CatalogError::FoodNotFound(id));
    }
    if foods::food_in_use(pool, id).await? {
        return Err(CatalogError::FoodInUse(id));
    }
    if !foods::delete_food(pool, id).await? {
        return Err(CatalogError::FoodNotFound(id));
    }
    info!(%id, "deleted food");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn input(name: &str, kinds: &[MealKind], ingredients: &[Uuid]) -> FoodInput {
        FoodInput {
            name: name.to_owned(),
            allowed_meal_kinds: kinds.to_vec(),
            ingredient_ids: ingredients.to_vec(),
        }
    }

    #[test]
    fn normalize_trims_and_rejects_blank() {
        assert_eq!(normalize_name("  oats ").unwrap(), "oats");
        assert!(matches!(
            normalize_name("   "),
            Err(CatalogError::NameRequired)
        ));
    }

    #[test]
    fn valid_food_collapses_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let valid = validate_food_input(&input(
            " Porridge ",
            &[MealKind::Breakfast, MealKind::Breakfast],
            &[a, b, a],
        ))
        .unwrap();

        assert_eq!(valid.name, "Porridge");
        assert_eq!(valid.allowed_meal_kinds.len(), 1);
        assert_eq!(valid.ingredient_ids, vec![a, b]);
    }

    #[test]
    fn food_without_meal_kinds_is_rejected() {
        let err = validate_food_input(&input("Soup", &[], &[Uuid::new_v4()])).unwrap_err();
        assert!(matches!(err, CatalogError::NoMealKinds));
    }

    #[test]
    fn food_without_ingredients_is_rejected() {
        let err = validate_food_input(&input("Soup", &[MealKind::Lunch], &[])).unwrap_err();
        assert!(matches!(err, CatalogError::NoIngredients));
    }

    #[test]
    fn food_input_deserializes_meal_kinds() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"name":"Stew","allowed_meal_kinds":["lunch","dinner"],"ingredient_ids":["{id}"]}}"#
        );
        let parsed: FoodInput = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.allowed_meal_kinds,
            vec![MealKind::Lunch, MealKind::Dinner]
        );
        assert_eq!(parsed.ingredient_ids, vec![id]);
    }

    #[test]
    fn with_ingredients_orders_by_name_and_skips_unknown() {
        let now = Utc::now();
        let salt = Ingredient {
            id: Uuid::new_v4(),
            name: "salt".into(),
            created_at: now,
        };
        let beans = Ingredient {
            id: Uuid::new_v4(),
            name: "Beans".into(),
            created_at: now,
        };
        let food = Food {
            id: Uuid::new_v4(),
            name: "Chili".into(),
            allowed_meal_kinds: MealKindSet::from([MealKind::Dinner]),
            ingredient_ids: vec![salt.id, Uuid::new_v4(), beans.id],
            created_at: now,
        };
        let by_id = HashMap::from([(salt.id, salt.clone()), (beans.id, beans.clone())]);

        let detail = with_ingredients(food, &by_id);
        let names: Vec<&str> = detail.ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Beans", "salt"]);
    }

    #[test]
    fn unknown_ingredients_lists_ids() {
        let id = Uuid::nil();
        let err = CatalogError::UnknownIngredients(vec![id]);
        assert_eq!(err.to_string(), format!("unknown ingredient ids: {id}"));
    }
}
