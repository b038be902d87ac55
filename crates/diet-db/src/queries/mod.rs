//! Query functions, one module per table group.

pub mod foods;
pub mod ingredients;
pub mod plans;
