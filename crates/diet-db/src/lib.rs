//! PostgreSQL persistence for the weekly diet planner.
//!
//! Row models live in [`models`], connection handling in [`config`] and
//! [`pool`], and one module per table group under [`queries`].

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
