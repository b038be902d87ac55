//! Weekly meal plan engine.
//!
//! [`calendar`] names ISO weeks, [`planner`] generates and edits plans,
//! [`catalog`] validates food and ingredient edits, and [`store`] holds the
//! storage contracts with their PostgreSQL and in-memory backends.

pub mod calendar;
pub mod catalog;
pub mod error;
pub mod planner;
pub mod store;

pub use calendar::{Clock, FixedClock, SystemClock, WeekId};
pub use error::PlanError;
pub use planner::PlanService;
