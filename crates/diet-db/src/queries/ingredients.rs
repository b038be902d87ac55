//! Database query functions for the `ingredients` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Ingredient;

/// Insert a new ingredient. The name is stored as given; callers trim it.
pub async fn insert_ingredient(pool: &PgPool, name: &str) -> Result<Ingredient> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        "INSERT INTO ingredients (name) VALUES ($1) RETURNING *",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .context("failed to insert ingredient")?;

    Ok(ingredient)
}

/// Fetch an ingredient by its ID.
pub async fn get_ingredient(pool: &PgPool, id: Uuid) -> Result<Option<Ingredient>> {
    let ingredient = sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch ingredient")?;

    Ok(ingredient)
}

/// List all ingredients, ordered by name.
pub async fn list_ingredients(pool: &PgPool) -> Result<Vec<Ingredient>> {
    let ingredients =
        sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients ORDER BY lower(name), id")
            .fetch_all(pool)
            .await
            .context("failed to list ingredients")?;

    Ok(ingredients)
}

/// Rename an ingredient. Returns `None` if it does not exist.
pub async fn rename_ingredient(pool: &PgPool, id: Uuid, name: &str) -> Result<Option<Ingredient>> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        "UPDATE ingredients SET name = $1 WHERE id = $2 RETURNING *",
    )
    .bind(name)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to rename ingredient")?;

    Ok(ingredient)
}

/// Delete an ingredient. Returns `false` if no row matched.
pub async fn delete_ingredient(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete ingredient")?;

    Ok(result.rows_affected() > 0)
}

/// Whether another ingredient already uses `name` (case-insensitive).
///
/// `exclude` skips the ingredient being renamed.
pub async fn ingredient_name_taken(
    pool: &PgPool,
    name: &str,
    exclude: Option<Uuid>,
) -> Result<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS( \
             SELECT 1 FROM ingredients \
             WHERE lower(name) = lower($1) AND ($2::uuid IS NULL OR id <> $2) \
         )",
    )
    .bind(name)
    .bind(exclude)
    .fetch_one(pool)
    .await
    .context("failed to check ingredient name")?;

    Ok(taken)
}

/// Whether any food lists this ingredient.
pub async fn ingredient_in_use(pool: &PgPool, id: Uuid) -> Result<bool> {
    let in_use: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM food_ingredients WHERE ingredient_id = $1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .context("failed to check ingredient usage")?;

    Ok(in_use)
}

/// Return the subset of `ids` that do not name an existing ingredient.
pub async fn missing_ingredient_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT wanted.id FROM unnest($1::uuid[]) AS wanted(id) \
         WHERE NOT EXISTS (SELECT 1 FROM ingredients i WHERE i.id = wanted.id) \
         ORDER BY wanted.id",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
    .context("failed to check ingredient ids")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// The distinct ingredients used by any of `food_ids`, ordered by name.
pub async fn list_ingredients_for_foods(pool: &PgPool, food_ids: &[Uuid]) -> Result<Vec<Ingredient>> {
    let ingredients = sqlx::query_as::<_, Ingredient>(
        "SELECT DISTINCT i.id, i.name, i.created_at \
         FROM ingredients i \
         JOIN food_ingredients fi ON fi.ingredient_id = i.id \
         WHERE fi.food_id = ANY($1) \
         ORDER BY i.name, i.id",
    )
    .bind(food_ids)
    .fetch_all(pool)
    .await
    .context("failed to list ingredients for foods")?;

    Ok(ingredients)
}
