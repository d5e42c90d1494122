//! # Variant Store
//!
//! Per-slot storage of modified recipes. A slot holds at most one
//! [`RecipeVariant`]; creating a new one overwrites the old and no history is
//! kept. Every consumer reads recipes through
//! [`VariantStore::get_effective_recipe`], which falls back to the unmodified
//! base recipe when a slot has no variant.

use crate::applicator::apply;
use crate::errors::ApplyError;
use crate::patch::{PatchSet, ValidatedPatchSet};
use crate::recipe::{EffectiveRecipe, Recipe};
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Meal of the day a slot is planned for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl Meal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Meal::Breakfast => "breakfast",
            Meal::Lunch => "lunch",
            Meal::Dinner => "dinner",
            Meal::Snack => "snack",
        }
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Meal {
    type Err = SlotKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(Meal::Breakfast),
            "lunch" => Ok(Meal::Lunch),
            "dinner" => Ok(Meal::Dinner),
            "snack" => Ok(Meal::Snack),
            other => Err(SlotKeyError::UnknownMeal(other.to_string())),
        }
    }
}

/// Errors raised when reading a slot key from text
#[derive(Debug, Clone, PartialEq)]
pub enum SlotKeyError {
    /// Not of the form `scope/YYYY-MM-DD/meal`
    Format(String),
    InvalidDate(String),
    UnknownMeal(String),
}

impl fmt::Display for SlotKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKeyError::Format(key) => {
                write!(f, "Slot key '{}' is not of the form scope/YYYY-MM-DD/meal", key)
            }
            SlotKeyError::InvalidDate(date) => write!(f, "Invalid slot date: {}", date),
            SlotKeyError::UnknownMeal(meal) => write!(f, "Unknown meal: {}", meal),
        }
    }
}

impl std::error::Error for SlotKeyError {}

/// Identifies one meal slot of a plan: `"{scope}/{YYYY-MM-DD}/{meal}"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SlotKey {
    /// Plan or household the slot belongs to
    pub scope: String,
    pub date: NaiveDate,
    pub meal: Meal,
}

impl SlotKey {
    pub fn new(scope: &str, date: NaiveDate, meal: Meal) -> Self {
        Self {
            scope: scope.to_string(),
            date,
            meal,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.scope, self.date.format("%Y-%m-%d"), self.meal)
    }
}

impl FromStr for SlotKey {
    type Err = SlotKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The scope may itself contain '/', so split from the right.
        let mut parts = s.trim().rsplitn(3, '/');
        let (Some(meal), Some(date), Some(scope)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(SlotKeyError::Format(s.to_string()));
        };
        if scope.is_empty() {
            return Err(SlotKeyError::Format(s.to_string()));
        }

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| SlotKeyError::InvalidDate(date.to_string()))?;

        Ok(Self {
            scope: scope.to_string(),
            date,
            meal: meal.parse()?,
        })
    }
}

impl From<SlotKey> for String {
    fn from(key: SlotKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for SlotKey {
    type Error = SlotKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A modified recipe stored for one slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeVariant {
    pub slot: SlotKey,
    /// The recipe the patch set was validated against
    pub base_snapshot: Recipe,
    pub patch: PatchSet,
    /// Cached result of applying `patch` to `base_snapshot`
    pub effective: EffectiveRecipe,
    pub created_at: DateTime<Utc>,
}

/// Slot-keyed map of recipe variants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantStore {
    variants: HashMap<SlotKey, RecipeVariant>,
}

impl VariantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously persisted variants
    pub fn restore(variants: impl IntoIterator<Item = RecipeVariant>) -> Self {
        Self {
            variants: variants
                .into_iter()
                .map(|variant| (variant.slot.clone(), variant))
                .collect(),
        }
    }

    /// Compile and store a variant for `slot`, overwriting any existing one
    ///
    /// Nothing is stored if the patch set does not belong to `base_snapshot`.
    pub fn create_variant(
        &mut self,
        slot: SlotKey,
        base_snapshot: Recipe,
        validated: ValidatedPatchSet,
    ) -> Result<&RecipeVariant, ApplyError> {
        let effective = apply(&base_snapshot, &validated)?;
        let variant = RecipeVariant {
            slot: slot.clone(),
            base_snapshot,
            patch: validated.into_patch_set(),
            effective,
            created_at: Utc::now(),
        };

        if self.variants.contains_key(&slot) {
            debug!("Overwriting variant for slot {}", slot);
        } else {
            debug!("Creating variant for slot {}", slot);
        }

        self.variants.insert(slot.clone(), variant);
        self.variants
            .get(&slot)
            .ok_or(ApplyError::TargetNotFound(slot.to_string()))
    }

    /// The compiled recipe for `slot`, or `fallback_base` unmodified
    pub fn get_effective_recipe(&self, slot: &SlotKey, fallback_base: &Recipe) -> EffectiveRecipe {
        match self.variants.get(slot) {
            Some(variant) => variant.effective.clone(),
            None => EffectiveRecipe::unpatched(fallback_base.clone()),
        }
    }

    pub fn get_variant(&self, slot: &SlotKey) -> Option<&RecipeVariant> {
        self.variants.get(slot)
    }

    /// Remove and return the variant for `slot`, if any
    pub fn clear_variant(&mut self, slot: &SlotKey) -> Option<RecipeVariant> {
        let removed = self.variants.remove(slot);
        if removed.is_some() {
            debug!("Cleared variant for slot {}", slot);
        }
        removed
    }

    /// All stored variants, ordered by slot key
    pub fn variants(&self) -> Vec<&RecipeVariant> {
        let mut variants: Vec<&RecipeVariant> = self.variants.values().collect();
        variants.sort_by(|a, b| a.slot.cmp(&b.slot));
        variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
