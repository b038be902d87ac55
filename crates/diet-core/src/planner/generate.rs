//! Week generation: fill 21 slots with a fair rotation of foods.
//!
//! Pure logic; the caller supplies the catalog and the random source.
//! For each day and each meal kind the candidates allowed for that kind are
//! shuffled, the first one not yet used for that kind this week wins, and
//! once every candidate has been used the least-used ones are tied and one
//! is drawn at random. Usage is counted per meal kind, so breakfast choices
//! never push lunch or dinner around.
//!
//! Counters start from zero on every call: fairness holds within a week,
//! not across successive weeks.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use diet_db::models::{Food, MealKind};
use diet_db::queries::plans::NewMealSlot;

use crate::calendar::{DAYS_PER_WEEK, WeekId};
use crate::error::PlanError;

/// Seed for a week's random source. Stable per week, so regenerating the
/// same week from the same catalog reproduces the same plan.
pub fn plan_seed(week: WeekId) -> u64 {
    (i64::from(week.year()) * 100 + i64::from(week.week())) as u64
}

/// Usage counts for one meal kind, keyed by food.
type Usage = HashMap<Uuid, u32>;

/// Check the catalog can cover every meal kind.
pub fn check_catalog(foods: &[Food]) -> Result<(), PlanError> {
    if foods.is_empty() {
        return Err(PlanError::NoFoodsAvailable);
    }
    for kind in MealKind::ALL {
        if !foods.iter().any(|f| f.allows(kind)) {
            return Err(PlanError::NoFoodsForMealKind(kind));
        }
    }
    Ok(())
}

/// Choose a food for every (day, meal kind) of a week.
///
/// Slots come out ordered by day, then breakfast, lunch, dinner.
pub fn build_week<R: Rng>(
    foods: &[Food],
    rng: &mut R,
) -> Result<Vec<NewMealSlot>, PlanError> {
    check_catalog(foods)?;

    let mut usage: HashMap<MealKind, Usage> = MealKind::ALL
        .into_iter()
        .map(|kind| (kind, foods.iter().map(|f| (f.id, 0)).collect()))
        .collect();

    let mut slots = Vec::with_capacity(DAYS_PER_WEEK as usize * MealKind::ALL.len());
    for day in 1..=DAYS_PER_WEEK {
        for kind in MealKind::ALL {
            let mut candidates: Vec<&Food> = foods.iter().filter(|f| f.allows(kind)).collect();
            let counts = usage.entry(kind).or_default();
            let chosen = select_food(&mut candidates, counts, rng)
                .ok_or(PlanError::NoFoodsForMealKind(kind))?;

            slots.push(NewMealSlot {
                day_of_week: day,
                meal_kind: kind,
                food_id: chosen.id,
            });
        }
    }

    Ok(slots)
}

/// Pick one candidate and count the pick.
///
/// `candidates` is shuffled in place. Returns `None` only when it is empty.
pub fn select_food<'a, R: Rng>(
    candidates: &mut [&'a Food],
    usage: &mut Usage,
    rng: &mut R,
) -> Option<&'a Food> {
    candidates.shuffle(rng);
    let count = |food: &Food| usage.get(&food.id).copied().unwrap_or(0);

    let chosen = match candidates.iter().find(|f| count(**f) == 0) {
        Some(unused) => *unused,
        None => {
            let least = candidates.iter().map(|f| count(*f)).min()?;
            let tied: Vec<&'a Food> = candidates
                .iter()
                .copied()
                .filter(|f| count(*f) == least)
                .collect();
            tied[rng.random_range(0..tied.len())]
        }
    };

    *usage.entry(chosen.id).or_insert(0) += 1;
    Some(chosen)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
