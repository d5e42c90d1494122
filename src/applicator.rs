//! # Patch Applicator
//!
//! Compiles a base recipe and a validated patch set into an effective recipe.
//!
//! Operations are applied in a fixed phase order no matter how the upstream
//! interpretation step ordered them:
//!
//! 1. **Scale**: all factors are multiplied together and applied once to every
//!    scalable quantity and to the serving count.
//! 2. **Replace**: names are matched against the scaled recipe. A supplied
//!    quantity is taken literally and is not scaled again.
//! 3. **Remove**: names are matched after replacement, so removing a replaced
//!    ingredient uses its new name.
//! 4. **Add**: new lines are appended and marked as patch-originated.

use crate::errors::ApplyError;
use crate::patch::{PatchOperation, ValidatedPatchSet};
use crate::quantity::parse_quantity;
use crate::recipe::{EffectiveRecipe, IngredientLine, Recipe};
use log::{debug, trace};

/// Apply a validated patch set to the snapshot it was validated against
pub fn apply(base: &Recipe, validated: &ValidatedPatchSet) -> Result<EffectiveRecipe, ApplyError> {
    if !validated.is_for(base) {
        return Err(ApplyError::SnapshotMismatch {
            validated_for: validated.base_recipe_id().to_string(),
            offered: base.id.clone(),
        });
    }

    let operations = validated.operations();
    let mut recipe = base.clone();

    let factor = composed_scale_factor(operations);
    // A unit factor must leave every quantity string byte-for-byte intact.
    if factor != 1.0 {
        scale_recipe(&mut recipe, factor);
    }

    for op in operations {
        if let PatchOperation::ReplaceIngredient {
            target_name,
            new_name,
            new_quantity,
        } = op
        {
            let index = recipe
                .find_ingredient(target_name)
                .ok_or_else(|| ApplyError::TargetNotFound(target_name.clone()))?;
            let line = &mut recipe.ingredients[index];
            trace!("Replacing '{}' with '{}'", line.name, new_name);
            line.name = new_name.trim().to_string();
            line.category = None;
            if let Some(quantity) = new_quantity {
                line.set_quantity(quantity);
            }
        }
    }

    for op in operations {
        if let PatchOperation::RemoveIngredient { target_name } = op {
            let index = recipe
                .find_ingredient(target_name)
                .ok_or_else(|| ApplyError::TargetNotFound(target_name.clone()))?;
            trace!("Removing '{}'", recipe.ingredients[index].name);
            recipe.ingredients.remove(index);
        }
    }

    for op in operations {
        if let PatchOperation::AddIngredient {
            name,
            quantity,
            category,
        } = op
        {
            let mut line = IngredientLine::new(name, quantity).added_by_patch();
            if let Some(category) = category {
                line = line.with_category(*category);
            }
            trace!("Adding '{}'", line);
            recipe.ingredients.push(line);
        }
    }

    debug!(
        "Compiled recipe '{}' from {} operation(s): {} ingredient(s), {} serving(s)",
        recipe.name,
        operations.len(),
        recipe.ingredients.len(),
        recipe.servings
    );

    Ok(EffectiveRecipe::compiled(recipe))
}

/// Product of every scale factor, in the order given
pub fn composed_scale_factor(operations: &[PatchOperation]) -> f64 {
    operations
        .iter()
        .filter_map(|op| match op {
            PatchOperation::ScaleServings { factor } => Some(*factor),
            _ => None,
        })
        .product()
}

fn scale_recipe(recipe: &mut Recipe, factor: f64) {
    recipe.servings *= factor;
    for line in &mut recipe.ingredients {
        let parsed = parse_quantity(&line.quantity);
        if parsed.is_scalable() {
            let scaled = parsed.render_scaled(factor);
            line.set_quantity(&scaled);
        }
    }
}
