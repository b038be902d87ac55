//! PostgreSQL-backed stores.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use diet_db::models::{Food, Ingredient, MealSlot, WeekPlan};
use diet_db::queries::plans::NewWeekPlan;
use diet_db::queries::{foods, ingredients, plans};

use super::{CatalogStore, PlanStore};
use crate::calendar::WeekId;

/// Catalog and plan store over a connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_foods(&self) -> Result<Vec<Food>> {
        foods::list_foods(&self.pool).await
    }

    async fn get_food(&self, id: Uuid) -> Result<Option<Food>> {
        foods::get_food(&self.pool, id).await
    }

    async fn ingredients_for_foods(&self, food_ids: &[Uuid]) -> Result<Vec<Ingredient>> {
        ingredients::list_ingredients_for_foods(&self.pool, food_ids).await
    }
}

#[async_trait]
impl PlanStore for PgStore {
    async fn get_plan(&self, week: WeekId) -> Result<Option<WeekPlan>> {
        plans::get_week_plan(&self.pool, week.year(), week.week() as i32).await
    }

    async fn plan_exists(&self, week: WeekId) -> Result<bool> {
        plans::week_plan_exists(&self.pool, week.year(), week.week() as i32).await
    }

    async fn create_plan(&self, plan: &NewWeekPlan) -> Result<Option<WeekPlan>> {
        plans::insert_week_plan(&self.pool, plan).await
    }

    async fn save_slot(&self, slot: &MealSlot) -> Result<()> {
        plans::update_meal_slot(&self.pool, slot).await
    }
}
