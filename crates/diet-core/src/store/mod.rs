//! Storage contracts the engine runs against.
//!
//! [`CatalogStore`] supplies foods and ingredients, [`PlanStore`] keeps week
//! plans. Both are object-safe so a service can hold them as
//! `Arc<dyn ...>`; [`PgStore`] backs them with PostgreSQL and
//! [`MemoryStore`] with in-process maps.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use diet_db::models::{Food, Ingredient, MealSlot, WeekPlan};
use diet_db::queries::plans::NewWeekPlan;

use crate::calendar::WeekId;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Read access to the food catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every food, in a stable order (by name).
    async fn list_foods(&self) -> Result<Vec<Food>>;

    async fn get_food(&self, id: Uuid) -> Result<Option<Food>>;

    /// Distinct ingredients of the given foods, ordered by name.
    async fn ingredients_for_foods(&self, food_ids: &[Uuid]) -> Result<Vec<Ingredient>>;
}

/// Durable storage of week plans and their slots.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// The plan for `week` with its slots (ordered by day, then meal kind)
    /// and their food names.
    async fn get_plan(&self, week: WeekId) -> Result<Option<WeekPlan>>;

    async fn plan_exists(&self, week: WeekId) -> Result<bool>;

    /// Store a plan with all of its slots atomically.
    ///
    /// Returns `None`, writing nothing, when a plan for the same week is
    /// already stored.
    async fn create_plan(&self, plan: &NewWeekPlan) -> Result<Option<WeekPlan>>;

    /// Persist a slot's current food, manual food and leftover link.
    async fn save_slot(&self, slot: &MealSlot) -> Result<()>;
}
