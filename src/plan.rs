//! # Plan Engine
//!
//! [`PlanState`] ties the variant store and the grocery list of one plan scope
//! together. Every method takes the current state by reference and returns the
//! next one, so a rejected edit leaves the caller holding exactly what it had.
//!
//! Recipe edits are cumulative: a new modification is validated against the
//! slot's current effective recipe, which becomes the snapshot stored with the
//! new variant. Reverting always goes back to the catalogue recipe.

use crate::errors::EngineError;
use crate::grocery::{GroceryList, StoreCategory};
use crate::patch::{validate, CoverageHint, PatchSet};
use crate::recipe::{EffectiveRecipe, Recipe};
use crate::variant_store::{SlotKey, VariantStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A catalogue recipe planned for one slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSlot {
    pub slot: SlotKey,
    pub recipe: Recipe,
}

/// The recipes planned for one scope, as read from a plan file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub scope: String,
    pub slots: Vec<PlannedSlot>,
}

impl MealPlan {
    /// Catalogue recipe planned for `slot`
    pub fn base_recipe(&self, slot: &SlotKey) -> Option<&Recipe> {
        self.slots
            .iter()
            .find(|planned| &planned.slot == slot)
            .map(|planned| &planned.recipe)
    }
}

/// Variants and grocery list of one plan scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanState {
    pub scope: String,
    #[serde(default)]
    pub variants: VariantStore,
    /// `None` until the plan is first consolidated
    #[serde(default)]
    pub grocery: Option<GroceryList>,
}

impl PlanState {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            variants: VariantStore::new(),
            grocery: None,
        }
    }

    fn check_scope(&self, slot: &SlotKey) -> Result<(), EngineError> {
        if slot.scope == self.scope {
            Ok(())
        } else {
            Err(EngineError::ScopeMismatch {
                expected: self.scope.clone(),
                found: slot.scope.clone(),
            })
        }
    }

    /// The recipe every consumer should show or shop for in `slot`
    pub fn effective_recipe(&self, slot: &SlotKey, base: &Recipe) -> EffectiveRecipe {
        self.variants.get_effective_recipe(slot, base)
    }

    /// Rebuild the recipe side of the grocery list from the effective recipe
    /// of every slot; manual items are carried over
    pub fn consolidate(&self, slots: &[PlannedSlot]) -> Result<PlanState, EngineError> {
        let mut list = self
            .grocery
            .clone()
            .unwrap_or_else(|| GroceryList::new(&self.scope));
        list.clear_recipe_ingredients();
        for planned in slots {
            self.check_scope(&planned.slot)?;
            list.add_recipe_ingredients(&self.effective_recipe(&planned.slot, &planned.recipe));
        }

        info!(
            scope = %self.scope,
            slots = slots.len(),
            items = list.len(),
            "Consolidated grocery list"
        );

        let mut next = self.clone();
        next.grocery = Some(list);
        Ok(next)
    }

    /// Validate and apply a candidate edit to a slot, then move the grocery
    /// contributions of the slot over to the new effective recipe
    pub fn modify_slot(
        &self,
        slot: &SlotKey,
        base: &Recipe,
        candidate: PatchSet,
        hints: &[CoverageHint],
    ) -> Result<PlanState, EngineError> {
        self.check_scope(slot)?;

        let current = self.effective_recipe(slot, base);
        let snapshot = current.as_recipe().clone();

        let validated = match validate(&snapshot, candidate, hints) {
            Ok(validated) => validated,
            Err(e) => {
                warn!(slot = %slot, error = %e, "Rejected recipe modification");
                return Err(e.into());
            }
        };

        let mut next = self.clone();
        let effective = next
            .variants
            .create_variant(slot.clone(), snapshot, validated)?
            .effective
            .clone();

        if let Some(grocery) = next.grocery.as_mut() {
            grocery.swap_recipe_ingredients(&current.name, &effective);
        }

        info!(
            slot = %slot,
            recipe = %effective.name,
            servings = effective.servings,
            "Stored recipe modification"
        );
        Ok(next)
    }

    /// Drop the slot's modification and shop for the catalogue recipe again
    pub fn revert_slot(&self, slot: &SlotKey, base: &Recipe) -> Result<PlanState, EngineError> {
        self.check_scope(slot)?;

        let mut next = self.clone();
        let Some(variant) = next.variants.clear_variant(slot) else {
            debug!(slot = %slot, "No modification to revert");
            return Ok(next);
        };

        if let Some(grocery) = next.grocery.as_mut() {
            grocery.swap_recipe_ingredients(
                &variant.effective.name,
                &EffectiveRecipe::unpatched(base.clone()),
            );
        }

        info!(slot = %slot, recipe = %base.name, "Reverted recipe modification");
        Ok(next)
    }

    /// Plan a different recipe for a slot; any modification of the old one is
    /// discarded
    pub fn replace_slot_recipe(
        &self,
        slot: &SlotKey,
        old_base: &Recipe,
        new_base: &Recipe,
    ) -> Result<PlanState, EngineError> {
        self.check_scope(slot)?;

        let old_effective = self.effective_recipe(slot, old_base);
        let mut next = self.clone();
        next.variants.clear_variant(slot);

        if let Some(grocery) = next.grocery.as_mut() {
            grocery.swap_recipe_ingredients(
                &old_effective.name,
                &EffectiveRecipe::unpatched(new_base.clone()),
            );
        }

        info!(
            slot = %slot,
            old_recipe = %old_effective.name,
            new_recipe = %new_base.name,
            "Replaced slot recipe"
        );
        Ok(next)
    }

    /// Plan a recipe for a previously empty slot
    pub fn add_slot_recipe(&self, slot: &SlotKey, base: &Recipe) -> Result<PlanState, EngineError> {
        self.check_scope(slot)?;

        let mut next = self.clone();
        let effective = next.effective_recipe(slot, base);
        if let Some(grocery) = next.grocery.as_mut() {
            grocery.add_recipe_ingredients(&effective);
        }

        info!(slot = %slot, recipe = %base.name, "Added recipe to plan");
        Ok(next)
    }

    /// Take a recipe out of the plan along with its modification and its
    /// grocery contributions
    pub fn remove_slot_recipe(&self, slot: &SlotKey, base: &Recipe) -> Result<PlanState, EngineError> {
        self.check_scope(slot)?;

        let effective = self.effective_recipe(slot, base);
        let mut next = self.clone();
        next.variants.clear_variant(slot);
        if let Some(grocery) = next.grocery.as_mut() {
            grocery.remove_recipe_ingredients(&effective.name);
        }

        info!(slot = %slot, recipe = %effective.name, "Removed recipe from plan");
        Ok(next)
    }

    /// Add a hand-entered grocery item, creating the list if needed
    pub fn add_manual_item(&self, name: &str, quantity: &str, category: Option<StoreCategory>) -> PlanState {
        let mut next = self.clone();
        next.grocery
            .get_or_insert_with(|| GroceryList::new(&self.scope))
            .add_manual_item(name, quantity, category);
        next
    }

    /// Remove a hand-entered grocery item
    pub fn remove_manual_item(&self, name: &str) -> PlanState {
        let mut next = self.clone();
        if let Some(grocery) = next.grocery.as_mut() {
            grocery.remove_manual_item(name);
        }
        next
    }
}
