//! In-place slot edits: manual replacement and leftover links.
//!
//! These functions only touch the slot values handed to them; loading,
//! validation against the catalog and persistence happen in
//! [`super::service`].

use uuid::Uuid;

use diet_db::models::{Food, MealSlot};

/// The food a slot falls back to when its leftover link is removed:
/// the manual choice, else the generator's choice, else whatever it holds.
pub fn restored_food_id(slot: &MealSlot) -> Uuid {
    slot.manual_food_id
        .or(slot.base_food_id)
        .unwrap_or(slot.food_id)
}

/// Drop any leftover link and restore the slot's own food.
///
/// `food_name` is left as is; stores resolve it again on save.
pub fn reset_leftover(slot: &mut MealSlot) {
    slot.is_leftover = false;
    slot.leftover_source_id = None;
    slot.food_id = restored_food_id(slot);
}

/// Assign `food` by hand. Supersedes any leftover link; `base_food_id`
/// keeps the generator's original choice.
pub fn apply_replacement(slot: &mut MealSlot, food: &Food) {
    slot.food_id = food.id;
    slot.food_name = food.name.clone();
    slot.manual_food_id = Some(food.id);
    slot.is_leftover = false;
    slot.leftover_source_id = None;
}

/// Make `target` serve what `source` serves.
pub fn link_leftover(target: &mut MealSlot, source: &MealSlot) {
    reset_leftover(target);
    target.is_leftover = true;
    target.leftover_source_id = Some(source.id);
    target.food_id = source.food_id;
    target.food_name = source.food_name.clone();
}

/// Remove `target`'s leftover link, but only if it points at `source`.
///
/// Returns whether the slot changed.
pub fn unlink_leftover(target: &mut MealSlot, source: &MealSlot) -> bool {
    if target.leftover_source_id != Some(source.id) {
        return false;
    }
    reset_leftover(target);
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
