//! # Meal Patch
//!
//! Recipe patching and grocery consolidation for meal plans. Free-text edit
//! requests become validated patch operations, patched recipes are stored per
//! meal slot, and the plan's grocery list follows every change while keeping
//! track of which recipe asked for what.

pub mod applicator;
pub mod config;
pub mod db;
pub mod errors;
pub mod grocery;
pub mod interpreter;
pub mod patch;
pub mod plan;
pub mod quantity;
pub mod recipe;
pub mod snapshot;
pub mod unit;
pub mod variant_store;
