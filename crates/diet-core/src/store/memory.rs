//! In-process stores for tests and database-free runs.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use diet_db::models::{Food, Ingredient, MealKindSet, MealSlot, WeekPlan};
use diet_db::queries::plans::NewWeekPlan;

use super::{CatalogStore, PlanStore};
use crate::calendar::WeekId;

#[derive(Debug, Default)]
struct State {
    ingredients: HashMap<Uuid, Ingredient>,
    foods: HashMap<Uuid, Food>,
    plans: HashMap<(i32, i32), WeekPlan>,
}

impl State {
    fn food_name(&self, id: Uuid) -> Result<String> {
        self.foods
            .get(&id)
            .map(|f| f.name.clone())
            .with_context(|| format!("food {id} does not exist"))
    }
}

/// Catalog and plan store held in memory behind a lock.
///
/// Mirrors the PostgreSQL behaviour the engine relies on: one plan per
/// week, all-or-nothing plan creation, and joined food names on slots.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_ingredient(&self, name: &str) -> Ingredient {
        let ingredient = Ingredient {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .ingredients
            .insert(ingredient.id, ingredient.clone());
        ingredient
    }

    pub async fn add_food(
        &self,
        name: &str,
        allowed_meal_kinds: impl Into<MealKindSet>,
        ingredient_ids: Vec<Uuid>,
    ) -> Food {
        let food = Food {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            allowed_meal_kinds: allowed_meal_kinds.into(),
            ingredient_ids,
            created_at: Utc::now(),
        };
        self.state.write().await.foods.insert(food.id, food.clone());
        food
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_foods(&self) -> Result<Vec<Food>> {
        let state = self.state.read().await;
        let mut foods: Vec<Food> = state.foods.values().cloned().collect();
        foods.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        Ok(foods)
    }

    async fn get_food(&self, id: Uuid) -> Result<Option<Food>> {
        Ok(self.state.read().await.foods.get(&id).cloned())
    }

    async fn ingredients_for_foods(&self, food_ids: &[Uuid]) -> Result<Vec<Ingredient>> {
        let state = self.state.read().await;
        let mut found: HashMap<Uuid, Ingredient> = HashMap::new();
        for food in food_ids.iter().filter_map(|id| state.foods.get(id)) {
            for id in &food.ingredient_ids {
                if let Some(ingredient) = state.ingredients.get(id) {
                    found.insert(*id, ingredient.clone());
                }
            }
        }
        let mut list: Vec<Ingredient> = found.into_values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(list)
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn get_plan(&self, week: WeekId) -> Result<Option<WeekPlan>> {
        let key = (week.year(), week.week() as i32);
        Ok(self.state.read().await.plans.get(&key).cloned())
    }

    async fn plan_exists(&self, week: WeekId) -> Result<bool> {
        let key = (week.year(), week.week() as i32);
        Ok(self.state.read().await.plans.contains_key(&key))
    }

    async fn create_plan(&self, plan: &NewWeekPlan) -> Result<Option<WeekPlan>> {
        let mut state = self.state.write().await;
        let key = (plan.year, plan.week_number);
        if state.plans.contains_key(&key) {
            return Ok(None);
        }

        let plan_id = Uuid::new_v4();
        let mut slots = Vec::with_capacity(plan.slots.len());
        for new_slot in &plan.slots {
            slots.push(MealSlot {
                id: Uuid::new_v4(),
                plan_id,
                day_of_week: new_slot.day_of_week,
                meal_kind: new_slot.meal_kind,
                food_id: new_slot.food_id,
                food_name: state.food_name(new_slot.food_id)?,
                base_food_id: Some(new_slot.food_id),
                manual_food_id: None,
                is_leftover: false,
                leftover_source_id: None,
            });
        }
        slots.sort_by_key(|s| (s.day_of_week, s.meal_kind));

        let week_plan = WeekPlan {
            id: plan_id,
            year: plan.year,
            week_number: plan.week_number,
            created_at: Utc::now(),
            slots,
        };
        state.plans.insert(key, week_plan.clone());
        Ok(Some(week_plan))
    }

    async fn save_slot(&self, slot: &MealSlot) -> Result<()> {
        let mut state = self.state.write().await;
        let food_name = state.food_name(slot.food_id)?;

        let Some(stored) = state
            .plans
            .values_mut()
            .flat_map(|p| p.slots.iter_mut())
            .find(|s| s.id == slot.id)
        else {
            bail!("meal slot {} not found", slot.id);
        };

        stored.food_id = slot.food_id;
        stored.food_name = food_name;
        stored.manual_food_id = slot.manual_food_id;
        stored.is_leftover = slot.is_leftover;
        stored.leftover_source_id = slot.leftover_source_id;
        Ok(())
    }
}
