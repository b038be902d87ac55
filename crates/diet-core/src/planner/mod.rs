//! Week plans: generation, manual edits and leftovers.

pub mod generate;
pub mod mutate;
pub mod service;

pub use generate::{build_week, check_catalog, plan_seed, select_food};
pub use mutate::{
    apply_replacement, link_leftover, reset_leftover, restored_food_id, unlink_leftover,
};
pub use service::PlanService;
