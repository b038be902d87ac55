//! Plan service layer.
//!
//! Ties the generator and the slot edits to the stores: every operation
//! loads what it needs, validates it, and only then writes. A refused call
//! leaves stored plans exactly as they were.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};
use uuid::Uuid;

use diet_db::models::{Ingredient, MealKind, MealSlot, WeekPlan};
use diet_db::queries::plans::NewWeekPlan;

use super::generate::{build_week, plan_seed};
use super::mutate::{apply_replacement, link_leftover, unlink_leftover};
use crate::calendar::{self, Clock, WeekId};
use crate::error::PlanError;
use crate::store::{CatalogStore, PlanStore};

/// Weekly plan operations over a catalog, a plan store and a clock.
#[derive(Clone)]
pub struct PlanService {
    catalog: Arc<dyn CatalogStore>,
    plans: Arc<dyn PlanStore>,
    clock: Arc<dyn Clock>,
}

impl PlanService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        plans: Arc<dyn PlanStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            plans,
            clock,
        }
    }

    /// The ISO week containing today.
    pub fn current_week(&self) -> WeekId {
        calendar::current_week(self.clock.today())
    }

    /// The ISO week after the current one.
    pub fn upcoming_week(&self) -> WeekId {
        calendar::upcoming_week(self.clock.today())
    }

    /// Generate and store the plan for `week`.
    ///
    /// The random source is seeded from the week, so the same catalog
    /// always yields the same plan for a given week.
    pub async fn generate_plan(&self, week: WeekId) -> Result<WeekPlan, PlanError> {
        if self.plans.plan_exists(week).await? {
            return Err(PlanError::PlanAlreadyExists(week));
        }

        let foods = self.catalog.list_foods().await?;
        let mut rng = StdRng::seed_from_u64(plan_seed(week));
        let slots = build_week(&foods, &mut rng)?;

        let new_plan = NewWeekPlan {
            year: week.year(),
            week_number: week.week() as i32,
            slots,
        };
        let plan = self
            .plans
            .create_plan(&new_plan)
            .await?
            .ok_or(PlanError::PlanAlreadyExists(week))?;

        info!(%week, plan_id = %plan.id, slots = plan.slots.len(), "generated week plan");
        Ok(plan)
    }

    /// The stored plan for `week`.
    pub async fn get_plan(&self, week: WeekId) -> Result<WeekPlan, PlanError> {
        self.plans
            .get_plan(week)
            .await?
            .ok_or(PlanError::PlanNotFound(week))
    }

    /// The stored plan for `week`, if any.
    pub async fn find_plan(&self, week: WeekId) -> Result<Option<WeekPlan>, PlanError> {
        Ok(self.plans.get_plan(week).await?)
    }

    /// Put `food_id` in the (day, kind) slot of `week` by hand.
    ///
    /// Any leftover link on the slot is dropped. Links that point at this
    /// slot are not followed: a next-day slot serving its leftovers keeps
    /// the old food and its `leftover_source_id`, so it no longer matches
    /// its source until the link is toggled again.
    pub async fn replace_meal_slot(
        &self,
        week: WeekId,
        day: i32,
        kind: MealKind,
        food_id: Uuid,
    ) -> Result<MealSlot, PlanError> {
        let plan = self.get_plan(week).await?;
        let mut slot = plan
            .slot(day, kind)
            .cloned()
            .ok_or(PlanError::SlotNotFound { week, day, kind })?;

        let food = self
            .catalog
            .get_food(food_id)
            .await?
            .ok_or(PlanError::FoodNotFound(food_id))?;
        if !food.allows(kind) {
            return Err(PlanError::MealKindMismatch {
                food: food.name,
                kind,
            });
        }

        apply_replacement(&mut slot, &food);
        self.plans.save_slot(&slot).await?;

        info!(%week, day, %kind, food = %food.name, "replaced meal");
        Ok(slot)
    }

    /// Mark (or unmark) the meal on the day after (day, kind) as leftovers
    /// of this slot.
    ///
    /// Only the current week may be edited this way. The target is the same
    /// meal kind on the next day; from Sunday that is Monday of the next
    /// week, whose plan must already exist. Disabling only removes a link
    /// that points at this slot. Returns the target slot as it now stands.
    pub async fn toggle_leftover(
        &self,
        week: WeekId,
        day: i32,
        kind: MealKind,
        enable: bool,
    ) -> Result<MealSlot, PlanError> {
        let current = self.current_week();
        if week != current {
            return Err(PlanError::NotCurrentWeek {
                requested: week,
                current,
            });
        }

        let plan = self.get_plan(week).await?;
        let source = plan
            .slot(day, kind)
            .cloned()
            .ok_or(PlanError::SlotNotFound { week, day, kind })?;

        let (target_week, target_day) = calendar::day_after(week, day)
            .ok_or(PlanError::SlotNotFound { week, day, kind })?;

        let target_plan = if target_week == week {
            plan
        } else {
            self.plans
                .get_plan(target_week)
                .await?
                .ok_or(PlanError::TargetPlanNotFound(target_week))?
        };
        let mut target = target_plan
            .slot(target_day, kind)
            .cloned()
            .ok_or(PlanError::TargetSlotNotFound {
                week: target_week,
                day: target_day,
                kind,
            })?;

        let changed = if enable {
            link_leftover(&mut target, &source);
            true
        } else {
            unlink_leftover(&mut target, &source)
        };

        if !changed {
            debug!(%week, day, %kind, "leftover link not present, nothing to remove");
            return Ok(target);
        }

        self.plans.save_slot(&target).await?;
        info!(
            %week, day, %kind, %target_week, target_day, enable,
            "updated leftover link"
        );

        // Re-read so the food name matches the restored food.
        let saved = self
            .plans
            .get_plan(target_week)
            .await?
            .and_then(|p| p.slot(target_day, kind).cloned())
            .unwrap_or(target);
        Ok(saved)
    }

    /// Ingredients needed for `week`: the distinct ingredients of every food
    /// the plan currently serves, ordered by name.
    pub async fn grocery_list(&self, week: WeekId) -> Result<Vec<Ingredient>, PlanError> {
        let plan = self.get_plan(week).await?;
        let food_ids: Vec<Uuid> = plan
            .slots
            .iter()
            .map(|s| s.food_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Ok(self.catalog.ingredients_for_foods(&food_ids).await?)
    }
}
