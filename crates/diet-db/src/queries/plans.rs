//! Database query functions for the `week_plans` and `meal_slots` tables.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{MealKind, MealSlot, WeekPlan};

const SLOT_SELECT: &str = "SELECT s.id, s.plan_id, s.day_of_week, s.meal_kind, s.food_id, \
            f.name AS food_name, s.base_food_id, s.manual_food_id, \
            s.is_leftover, s.leftover_source_id \
     FROM meal_slots s \
     JOIN foods f ON f.id = s.food_id";

/// A slot chosen by the generator. The food becomes both the current and
/// the base food; manual and leftover fields start empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMealSlot {
    pub day_of_week: i32,
    pub meal_kind: MealKind,
    pub food_id: Uuid,
}

/// A complete plan ready to be stored.
#[derive(Debug, Clone)]
pub struct NewWeekPlan {
    pub year: i32,
    pub week_number: i32,
    pub slots: Vec<NewMealSlot>,
}

/// Insert a plan and all of its slots in one transaction.
///
/// Returns `None` when a plan for the same (year, week) already exists; the
/// unique constraint decides, so concurrent generators cannot both win.
pub async fn insert_week_plan(pool: &PgPool, plan: &NewWeekPlan) -> Result<Option<WeekPlan>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let inserted = sqlx::query_as::<_, WeekPlan>(
        "INSERT INTO week_plans (year, week_number) VALUES ($1, $2) \
         ON CONFLICT (year, week_number) DO NOTHING \
         RETURNING *",
    )
    .bind(plan.year)
    .bind(plan.week_number)
    .fetch_optional(&mut *tx)
    .await
    .context("failed to insert week plan")?;

    let Some(mut week_plan) = inserted else {
        // Rolls back on drop.
        return Ok(None);
    };

    let days: Vec<i32> = plan.slots.iter().map(|s| s.day_of_week).collect();
    let kinds: Vec<String> = plan
        .slots
        .iter()
        .map(|s| s.meal_kind.as_str().to_owned())
        .collect();
    let food_ids: Vec<Uuid> = plan.slots.iter().map(|s| s.food_id).collect();

    sqlx::query(
        "INSERT INTO meal_slots (plan_id, day_of_week, meal_kind, food_id, base_food_id) \
         SELECT $1, t.day, t.kind, t.food, t.food \
         FROM unnest($2::int[], $3::text[], $4::uuid[]) AS t(day, kind, food)",
    )
    .bind(week_plan.id)
    .bind(&days)
    .bind(&kinds)
    .bind(&food_ids)
    .execute(&mut *tx)
    .await
    .with_context(|| {
        format!(
            "failed to insert slots for week plan {}-W{:02}",
            plan.year, plan.week_number
        )
    })?;

    tx.commit().await.context("failed to commit transaction")?;

    week_plan.slots = list_slots_for_plan(pool, week_plan.id).await?;
    Ok(Some(week_plan))
}

/// Fetch the plan for (year, week) together with its slots.
pub async fn get_week_plan(pool: &PgPool, year: i32, week_number: i32) -> Result<Option<WeekPlan>> {
    let plan = sqlx::query_as::<_, WeekPlan>(
        "SELECT * FROM week_plans WHERE year = $1 AND week_number = $2",
    )
    .bind(year)
    .bind(week_number)
    .fetch_optional(pool)
    .await
    .context("failed to fetch week plan")?;

    match plan {
        Some(mut plan) => {
            plan.slots = list_slots_for_plan(pool, plan.id).await?;
            Ok(Some(plan))
        }
        None => Ok(None),
    }
}

/// Whether a plan exists for (year, week).
pub async fn week_plan_exists(pool: &PgPool, year: i32, week_number: i32) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM week_plans WHERE year = $1 AND week_number = $2)",
    )
    .bind(year)
    .bind(week_number)
    .fetch_one(pool)
    .await
    .context("failed to check week plan existence")?;

    Ok(exists)
}

/// List all plans (without slots), newest week first.
pub async fn list_week_plans(pool: &PgPool) -> Result<Vec<WeekPlan>> {
    let plans = sqlx::query_as::<_, WeekPlan>(
        "SELECT * FROM week_plans ORDER BY year DESC, week_number DESC",
    )
    .fetch_all(pool)
    .await
    .context("failed to list week plans")?;

    Ok(plans)
}

/// List a plan's slots ordered by day, then breakfast, lunch, dinner.
pub async fn list_slots_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<Vec<MealSlot>> {
    let query = format!("{SLOT_SELECT} WHERE s.plan_id = $1");
    let mut slots = sqlx::query_as::<_, MealSlot>(&query)
        .bind(plan_id)
        .fetch_all(pool)
        .await
        .context("failed to list meal slots")?;

    slots.sort_by_key(|s| (s.day_of_week, s.meal_kind));
    Ok(slots)
}

/// Fetch a single slot by ID.
pub async fn get_meal_slot(pool: &PgPool, id: Uuid) -> Result<Option<MealSlot>> {
    let query = format!("{SLOT_SELECT} WHERE s.id = $1");
    let slot = sqlx::query_as::<_, MealSlot>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch meal slot")?;

    Ok(slot)
}

/// Persist the mutable fields of a slot: current food, manual food and the
/// leftover link. `base_food_id` is never rewritten.
pub async fn update_meal_slot(pool: &PgPool, slot: &MealSlot) -> Result<()> {
    let result = sqlx::query(
        "UPDATE meal_slots \
         SET food_id = $1, manual_food_id = $2, is_leftover = $3, leftover_source_id = $4 \
         WHERE id = $5",
    )
    .bind(slot.food_id)
    .bind(slot.manual_food_id)
    .bind(slot.is_leftover)
    .bind(slot.leftover_source_id)
    .bind(slot.id)
    .execute(pool)
    .await
    .context("failed to update meal slot")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("meal slot {} not found", slot.id);
    }

    Ok(())
}
