//! Errors reported by the plan engine.

use thiserror::Error;
use uuid::Uuid;

use diet_db::models::MealKind;

use crate::calendar::WeekId;

/// Why a plan operation was refused.
///
/// Every variant except [`PlanError::Store`] is detected before anything is
/// written, so a failed call leaves stored plans untouched.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan for {0} already exists")]
    PlanAlreadyExists(WeekId),

    #[error("no plan exists for {0}")]
    PlanNotFound(WeekId),

    #[error("plan {week} has no {kind} slot on day {day}")]
    SlotNotFound {
        week: WeekId,
        day: i32,
        kind: MealKind,
    },

    #[error("no plan exists for {0}, the week the leftover would land in; generate it first")]
    TargetPlanNotFound(WeekId),

    #[error("plan {week} has no {kind} slot on day {day} to receive the leftover")]
    TargetSlotNotFound {
        week: WeekId,
        day: i32,
        kind: MealKind,
    },

    #[error("food {0} not found")]
    FoodNotFound(Uuid),

    #[error("food {food:?} cannot be served for {kind}")]
    MealKindMismatch { food: String, kind: MealKind },

    #[error("no foods available to generate a plan")]
    NoFoodsAvailable,

    #[error("no foods are allowed for {0}; add at least one {0} option")]
    NoFoodsForMealKind(MealKind),

    #[error("leftovers can only be set on the current week ({current}), not {requested}")]
    NotCurrentWeek { requested: WeekId, current: WeekId },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl PlanError {
    /// Whether the request named something that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PlanNotFound(_) | Self::SlotNotFound { .. } | Self::FoodNotFound(_)
        )
    }
}
