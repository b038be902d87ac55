//! Database query functions for the `foods` and `food_ingredients` tables.

use anyhow::{Context, Result};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{Food, MealKindSet};

/// Food columns plus the aggregated ingredient IDs. Callers append
/// `WHERE` / `GROUP BY` / `ORDER BY`.
const FOOD_SELECT: &str = "SELECT f.id, f.name, f.allowed_meal_kinds, f.created_at, \
         COALESCE( \
             array_agg(fi.ingredient_id ORDER BY fi.ingredient_id) \
                 FILTER (WHERE fi.ingredient_id IS NOT NULL), \
             '{}'::uuid[] \
         ) AS ingredient_ids \
     FROM foods f \
     LEFT JOIN food_ingredients fi ON fi.food_id = f.id";

/// Fields for inserting or replacing a food.
#[derive(Debug, Clone, Copy)]
pub struct NewFood<'a> {
    pub name: &'a str,
    pub allowed_meal_kinds: &'a MealKindSet,
    pub ingredient_ids: &'a [Uuid],
}

/// Insert a food and its ingredient links in one transaction.
pub async fn insert_food(pool: &PgPool, food: &NewFood<'_>) -> Result<Food> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO foods (name, allowed_meal_kinds) VALUES ($1, $2) RETURNING id",
    )
    .bind(food.name)
    .bind(food.allowed_meal_kinds.to_db_values())
    .fetch_one(&mut *tx)
    .await
    .context("failed to insert food")?;

    link_ingredients(&mut tx, id, food.ingredient_ids).await?;
    let inserted = fetch_food(&mut tx, id)
        .await?
        .context("inserted food vanished before commit")?;

    tx.commit().await.context("failed to commit transaction")?;
    Ok(inserted)
}

/// Replace a food's name, meal kinds and ingredient set.
///
/// Returns `None` (and changes nothing) if the food does not exist.
pub async fn update_food(pool: &PgPool, id: Uuid, food: &NewFood<'_>) -> Result<Option<Food>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let result = sqlx::query("UPDATE foods SET name = $1, allowed_meal_kinds = $2 WHERE id = $3")
        .bind(food.name)
        .bind(food.allowed_meal_kinds.to_db_values())
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("failed to update food")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    sqlx::query("DELETE FROM food_ingredients WHERE food_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("failed to clear food ingredients")?;
    link_ingredients(&mut tx, id, food.ingredient_ids).await?;

    let updated = fetch_food(&mut tx, id).await?;
    tx.commit().await.context("failed to commit transaction")?;
    Ok(updated)
}

async fn link_ingredients(conn: &mut PgConnection, food_id: Uuid, ingredient_ids: &[Uuid]) -> Result<()> {
    sqlx::query(
        "INSERT INTO food_ingredients (food_id, ingredient_id) \
         SELECT $1, unnest($2::uuid[]) \
         ON CONFLICT DO NOTHING",
    )
    .bind(food_id)
    .bind(ingredient_ids)
    .execute(conn)
    .await
    .context("failed to link food ingredients")?;

    Ok(())
}

async fn fetch_food(conn: &mut PgConnection, id: Uuid) -> Result<Option<Food>> {
    let query = format!("{FOOD_SELECT} WHERE f.id = $1 GROUP BY f.id");
    let food = sqlx::query_as::<_, Food>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch food")?;

    Ok(food)
}

/// Fetch a food by its ID.
pub async fn get_food(pool: &PgPool, id: Uuid) -> Result<Option<Food>> {
    let mut conn = pool.acquire().await.context("failed to acquire connection")?;
    fetch_food(&mut conn, id).await
}

/// List all foods with their ingredient IDs, ordered by name.
pub async fn list_foods(pool: &PgPool) -> Result<Vec<Food>> {
    let query = format!("{FOOD_SELECT} GROUP BY f.id ORDER BY lower(f.name), f.id");
    let foods = sqlx::query_as::<_, Food>(&query)
        .fetch_all(pool)
        .await
        .context("failed to list foods")?;

    Ok(foods)
}

/// Delete a food. Returns `false` if no row matched.
pub async fn delete_food(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM foods WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete food")?;

    Ok(result.rows_affected() > 0)
}

/// Whether another food already uses `name` (case-insensitive).
pub async fn food_name_taken(pool: &PgPool, name: &str, exclude: Option<Uuid>) -> Result<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS( \
             SELECT 1 FROM foods \
             WHERE lower(name) = lower($1) AND ($2::uuid IS NULL OR id <> $2) \
         )",
    )
    .bind(name)
    .bind(exclude)
    .fetch_one(pool)
    .await
    .context("failed to check food name")?;

    Ok(taken)
}

/// Whether any meal slot references this food as its current, base or
/// manual choice.
pub async fn food_in_use(pool: &PgPool, id: Uuid) -> Result<bool> {
    let in_use: bool = sqlx::query_scalar(
        "SELECT EXISTS( \
             SELECT 1 FROM meal_slots \
             WHERE food_id = $1 OR base_food_id = $1 OR manual_food_id = $1 \
         )",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .context("failed to check food usage")?;

    Ok(in_use)
}
