//! # Grocery Consolidation
//!
//! Builds a shopping list out of the effective recipes of a plan. Every item
//! remembers which recipe (or manual entry) asked for how much, so recipes can
//! be removed or swapped later without any arithmetic on the merged totals.

pub mod category;
pub mod item;
pub mod list;

pub use category::{categorize, StoreCategory};
pub use item::{Contribution, ContributionSource, GroceryItem};
pub use list::GroceryList;
