//! # Patch Operation Model and Validator
//!
//! Structured edit operations on a recipe, the patch set that carries them and
//! the validator that decides whether a candidate patch set may be applied to a
//! given recipe snapshot.
//!
//! Candidate operations come from an untrusted interpretation step, so
//! validation checks three things and rejects the whole set on any failure:
//!
//! - **Schema**: scale factors are finite and positive, names and quantities
//!   are not empty.
//! - **Targets**: replace/remove targets name an ingredient of the recipe
//!   exactly (ignoring case). There is no fuzzy or plural-aware matching.
//! - **Coverage**: every interpretation hint is represented by exactly one
//!   operation and every operation by one hint.
//!
//! ## Wire format
//!
//! ```json
//! {"op": "scale_servings", "factor": 2.0}
//! {"op": "replace_ingredient", "target_name": "milk", "new_name": "oat milk"}
//! {"op": "add_ingredient", "name": "spinach", "quantity": "2 cups"}
//! {"op": "remove_ingredient", "target_name": "butter"}
//! ```

use crate::errors::{ValidationError, ValidationIssue};
use crate::grocery::StoreCategory;
use crate::recipe::{names_match, Recipe};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single structured edit to a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOperation {
    /// Multiply every scalable amount and the serving count
    ScaleServings { factor: f64 },
    /// Rename an ingredient, optionally with a new literal quantity
    ReplaceIngredient {
        target_name: String,
        new_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_quantity: Option<String>,
    },
    /// Append a new ingredient line
    AddIngredient {
        name: String,
        quantity: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<StoreCategory>,
    },
    /// Delete an ingredient line
    RemoveIngredient { target_name: String },
}

/// The kind of edit an operation or hint performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    #[serde(alias = "scale")]
    ScaleServings,
    #[serde(alias = "replace", alias = "substitute")]
    ReplaceIngredient,
    #[serde(alias = "add")]
    AddIngredient,
    #[serde(alias = "remove")]
    RemoveIngredient,
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EditAction::ScaleServings => "scale_servings",
            EditAction::ReplaceIngredient => "replace_ingredient",
            EditAction::AddIngredient => "add_ingredient",
            EditAction::RemoveIngredient => "remove_ingredient",
        };
        f.write_str(name)
    }
}

impl PatchOperation {
    pub fn action(&self) -> EditAction {
        match self {
            PatchOperation::ScaleServings { .. } => EditAction::ScaleServings,
            PatchOperation::ReplaceIngredient { .. } => EditAction::ReplaceIngredient,
            PatchOperation::AddIngredient { .. } => EditAction::AddIngredient,
            PatchOperation::RemoveIngredient { .. } => EditAction::RemoveIngredient,
        }
    }

    /// The ingredient name this operation is about, if any
    ///
    /// For `AddIngredient` this is the name being added.
    pub fn target(&self) -> Option<&str> {
        match self {
            PatchOperation::ScaleServings { .. } => None,
            PatchOperation::ReplaceIngredient { target_name, .. }
            | PatchOperation::RemoveIngredient { target_name } => Some(target_name),
            PatchOperation::AddIngredient { name, .. } => Some(name),
        }
    }

    /// Decode one operation from its wire representation
    pub fn from_wire(value: serde_json::Value) -> Result<Self, String> {
        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    /// Structural checks that do not depend on the recipe
    fn schema_issues(&self, index: usize) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        match self {
            PatchOperation::ScaleServings { factor } => {
                if !factor.is_finite() || *factor <= 0.0 {
                    issues.push(ValidationIssue::NonPositiveFactor {
                        index,
                        factor: *factor,
                    });
                }
            }
            PatchOperation::ReplaceIngredient {
                target_name,
                new_name,
                new_quantity,
            } => {
                require_text(&mut issues, index, target_name, "target_name");
                require_text(&mut issues, index, new_name, "new_name");
                if let Some(quantity) = new_quantity {
                    require_text(&mut issues, index, quantity, "new_quantity");
                }
            }
            PatchOperation::AddIngredient { name, quantity, .. } => {
                require_text(&mut issues, index, name, "name");
                require_text(&mut issues, index, quantity, "quantity");
            }
            PatchOperation::RemoveIngredient { target_name } => {
                require_text(&mut issues, index, target_name, "target_name");
            }
        }

        issues
    }
}

fn require_text(issues: &mut Vec<ValidationIssue>, index: usize, value: &str, field: &'static str) {
    if value.trim().is_empty() {
        issues.push(ValidationIssue::EmptyField { index, field });
    }
}

/// Decode a list of wire operations, reporting every malformed entry
pub fn decode_operations(values: Vec<serde_json::Value>) -> Result<Vec<PatchOperation>, ValidationError> {
    let mut operations = Vec::with_capacity(values.len());
    let mut issues = Vec::new();

    for (index, value) in values.into_iter().enumerate() {
        match PatchOperation::from_wire(value) {
            Ok(op) => operations.push(op),
            Err(reason) => issues.push(ValidationIssue::Malformed { index, reason }),
        }
    }

    if issues.is_empty() {
        Ok(operations)
    } else {
        Err(ValidationError::new(issues))
    }
}

/// Decode a JSON array of wire operations
pub fn decode_operations_json(json: &str) -> Result<Vec<PatchOperation>, ValidationError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json).map_err(|e| {
        ValidationError::single(ValidationIssue::Malformed {
            index: 0,
            reason: format!("expected a JSON array of operations: {e}"),
        })
    })?;
    decode_operations(values)
}

/// An intended edit reported by the interpretation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageHint {
    pub action: EditAction,
    /// Ingredient the edit is about; `None` matches any operation of the action
    #[serde(default)]
    pub target: Option<String>,
}

impl CoverageHint {
    pub fn new(action: EditAction, target: Option<&str>) -> Self {
        Self {
            action,
            target: target.map(str::to_string),
        }
    }

    /// The hint that exactly describes an operation
    ///
    /// Useful for structured edits that did not go through interpretation.
    pub fn from_operation(op: &PatchOperation) -> Self {
        Self::new(op.action(), op.target())
    }

    fn covers(&self, op: &PatchOperation) -> bool {
        if self.action != op.action() {
            return false;
        }
        match (&self.target, op.target()) {
            (None, _) => true,
            (Some(_), None) => self.action == EditAction::ScaleServings,
            (Some(hint_target), Some(op_target)) => names_match(hint_target, op_target),
        }
    }
}

/// An ordered set of operations with the request that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchSet {
    pub operations: Vec<PatchOperation>,
    /// The free-text request, e.g. "make it dairy-free"
    pub source_text: String,
    pub created_at: DateTime<Utc>,
}

impl PatchSet {
    pub fn new(operations: Vec<PatchOperation>, source_text: &str) -> Self {
        Self {
            operations,
            source_text: source_text.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// A patch set that passed validation against one specific recipe snapshot
///
/// Only [`validate`] constructs this type, and the applicator refuses to use it
/// with any other snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPatchSet {
    patch: PatchSet,
    base_recipe_id: String,
    base_fingerprint: u64,
}

impl ValidatedPatchSet {
    pub fn operations(&self) -> &[PatchOperation] {
        &self.patch.operations
    }

    pub fn patch_set(&self) -> &PatchSet {
        &self.patch
    }

    pub fn into_patch_set(self) -> PatchSet {
        self.patch
    }

    /// Identity of the recipe this set was validated against
    pub fn base_recipe_id(&self) -> &str {
        &self.base_recipe_id
    }

    /// Whether this set was validated against exactly `recipe`
    pub fn is_for(&self, recipe: &Recipe) -> bool {
        self.base_recipe_id == recipe.id && self.base_fingerprint == recipe.fingerprint()
    }
}

/// Validate a candidate patch set against a recipe snapshot
///
/// Every issue found is reported; nothing partial is ever returned.
pub fn validate(
    base: &Recipe,
    candidate: PatchSet,
    hints: &[CoverageHint],
) -> Result<ValidatedPatchSet, ValidationError> {
    debug!(
        "Validating {} operation(s) against recipe '{}' with {} hint(s)",
        candidate.operations.len(),
        base.name,
        hints.len()
    );

    if candidate.operations.is_empty() {
        return Err(ValidationError::single(ValidationIssue::EmptyPatchSet));
    }

    let mut issues: Vec<ValidationIssue> = candidate
        .operations
        .iter()
        .enumerate()
        .flat_map(|(index, op)| op.schema_issues(index))
        .collect();

    issues.extend(target_issues(base, &candidate.operations));
    issues.extend(coverage_issues(&candidate.operations, hints));

    if !issues.is_empty() {
        info!(
            "Rejected patch set for recipe '{}' with {} issue(s)",
            base.name,
            issues.len()
        );
        return Err(ValidationError::new(issues));
    }

    Ok(ValidatedPatchSet {
        base_recipe_id: base.id.clone(),
        base_fingerprint: base.fingerprint(),
        patch: candidate,
    })
}

/// Check targets against the names each phase of the applicator will see:
/// replaces against the base names, removes against the names after replacing
fn target_issues(base: &Recipe, operations: &[PatchOperation]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut names = base.ingredient_names();

    for (index, op) in operations.iter().enumerate() {
        if let PatchOperation::ReplaceIngredient {
            target_name,
            new_name,
            ..
        } = op
        {
            if target_name.trim().is_empty() {
                continue;
            }
            match names.iter().position(|name| names_match(name, target_name)) {
                Some(position) => names[position] = new_name.clone(),
                None => issues.push(ValidationIssue::UnknownTarget {
                    index,
                    target: target_name.clone(),
                }),
            }
        }
    }

    for (index, op) in operations.iter().enumerate() {
        if let PatchOperation::RemoveIngredient { target_name } = op {
            if target_name.trim().is_empty() {
                continue;
            }
            match names.iter().position(|name| names_match(name, target_name)) {
                Some(position) => {
                    names.remove(position);
                }
                None => issues.push(ValidationIssue::UnknownTarget {
                    index,
                    target: target_name.clone(),
                }),
            }
        }
    }

    issues
}

/// Pair hints and operations one-to-one; report leftovers on either side
fn coverage_issues(operations: &[PatchOperation], hints: &[CoverageHint]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut claimed = vec![false; operations.len()];

    // Targeted hints first so a target-less hint cannot take their operation.
    let mut hint_order: Vec<usize> = (0..hints.len()).collect();
    hint_order.sort_by_key(|&i| hints[i].target.is_none());

    for hint_index in hint_order {
        let hint = &hints[hint_index];
        let matched = operations
            .iter()
            .enumerate()
            .find(|(i, op)| !claimed[*i] && hint.covers(op))
            .map(|(i, _)| i);

        match matched {
            Some(i) => claimed[i] = true,
            None => issues.push(ValidationIssue::UncoveredHint {
                hint_index,
                action: hint.action,
                target: hint.target.clone(),
            }),
        }
    }

    issues.extend(
        operations
            .iter()
            .enumerate()
            .filter(|(i, _)| !claimed[*i])
            .map(|(index, op)| ValidationIssue::UnrequestedOperation {
                index,
                action: op.action(),
            }),
    );

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pasta() -> Recipe {
        Recipe::new("pasta-01", "Pasta", 2.0)
            .with_ingredient("pasta", "200g")
            .with_ingredient("marinara", "2 cups")
            .with_ingredient("olive oil", "1 tbsp")
    }

    fn hints_for(ops: &[PatchOperation]) -> Vec<CoverageHint> {
        ops.iter().map(CoverageHint::from_operation).collect()
    }

    fn replace(target: &str, new_name: &str) -> PatchOperation {
        PatchOperation::ReplaceIngredient {
            target_name: target.to_string(),
            new_name: new_name.to_string(),
            new_quantity: None,
        }
    }

    fn remove(target: &str) -> PatchOperation {
        PatchOperation::RemoveIngredient {
            target_name: target.to_string(),
        }
    }

    #[test]
    fn test_wire_format_round_trips_tag() {
        let op: PatchOperation =
            serde_json::from_str(r#"{"op": "scale_servings", "factor": 2.0}"#).unwrap();
        assert_eq!(op, PatchOperation::ScaleServings { factor: 2.0 });

        let json = serde_json::to_value(remove("butter")).unwrap();
        assert_eq!(json["op"], "remove_ingredient");
        assert_eq!(json["target_name"], "butter");
    }

    #[test]
    fn test_decode_reports_malformed_index() {
        let err = decode_operations_json(
            r#"[{"op": "scale_servings", "factor": 2}, {"op": "explode"}, {"op": "add_ingredient", "name": "kale"}]"#,
        )
        .unwrap_err();

        assert_eq!(err.issues.len(), 2);
        assert!(matches!(err.issues[0], ValidationIssue::Malformed { index: 1, .. }));
        assert!(matches!(err.issues[1], ValidationIssue::Malformed { index: 2, .. }));
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let err = decode_operations_json(r#"{"op": "scale_servings"}"#).unwrap_err();
        assert!(matches!(err.issues[0], ValidationIssue::Malformed { .. }));
    }

    #[test]
    fn test_valid_patch_set() {
        let ops = vec![
            PatchOperation::ScaleServings { factor: 2.0 },
            replace("Marinara", "pesto"),
        ];
        let hints = hints_for(&ops);
        let validated = validate(&pasta(), PatchSet::new(ops, "double it, pesto"), &hints).unwrap();

        assert_eq!(validated.operations().len(), 2);
        assert_eq!(validated.base_recipe_id(), "pasta-01");
        assert!(validated.is_for(&pasta()));
    }

    #[test]
    fn test_empty_patch_set_rejected() {
        let err = validate(&pasta(), PatchSet::new(vec![], ""), &[]).unwrap_err();
        assert_eq!(err.issues, vec![ValidationIssue::EmptyPatchSet]);
    }

    #[test]
    fn test_non_positive_factor_rejected() {
        for factor in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let ops = vec![PatchOperation::ScaleServings { factor }];
            let hints = hints_for(&ops);
            let err = validate(&pasta(), PatchSet::new(ops, ""), &hints).unwrap_err();
            assert!(err.has_issue(|i| matches!(i, ValidationIssue::NonPositiveFactor { index: 0, .. })));
        }
    }

    #[test]
    fn test_empty_fields_rejected() {
        let ops = vec![PatchOperation::AddIngredient {
            name: "spinach".to_string(),
            quantity: "  ".to_string(),
            category: None,
        }];
        let hints = hints_for(&ops);
        let err = validate(&pasta(), PatchSet::new(ops, ""), &hints).unwrap_err();
        assert_eq!(
            err.issues,
            vec![ValidationIssue::EmptyField {
                index: 0,
                field: "quantity"
            }]
        );
    }

    #[test]
    fn test_unknown_replace_target_rejected() {
        let ops = vec![replace("cream", "oat cream")];
        let hints = hints_for(&ops);
        let err = validate(&pasta(), PatchSet::new(ops, ""), &hints).unwrap_err();
        assert_eq!(
            err.issues,
            vec![ValidationIssue::UnknownTarget {
                index: 0,
                target: "cream".to_string()
            }]
        );
    }

    #[test]
    fn test_no_plural_or_fuzzy_matching() {
        for target in ["olive oils", "olive", "marinara sauce"] {
            let ops = vec![remove(target)];
            let hints = hints_for(&ops);
            assert!(validate(&pasta(), PatchSet::new(ops, ""), &hints).is_err());
        }
    }

    #[test]
    fn test_remove_after_replace_uses_new_name() {
        let ops = vec![remove("pesto"), replace("marinara", "pesto")];
        let hints = hints_for(&ops);
        assert!(validate(&pasta(), PatchSet::new(ops, ""), &hints).is_ok());

        let ops = vec![replace("marinara", "pesto"), remove("marinara")];
        let hints = hints_for(&ops);
        let err = validate(&pasta(), PatchSet::new(ops, ""), &hints).unwrap_err();
        assert!(err.has_issue(|i| matches!(i, ValidationIssue::UnknownTarget { index: 1, .. })));
    }

    #[test]
    fn test_removing_same_target_twice_rejected() {
        let ops = vec![remove("pasta"), remove("pasta")];
        let hints = hints_for(&ops);
        let err = validate(&pasta(), PatchSet::new(ops, ""), &hints).unwrap_err();
        assert!(err.has_issue(|i| matches!(i, ValidationIssue::UnknownTarget { index: 1, .. })));
    }

    #[test]
    fn test_uncovered_hint_rejected() {
        let ops = vec![remove("olive oil")];
        let hints = vec![
            CoverageHint::new(EditAction::RemoveIngredient, Some("olive oil")),
            CoverageHint::new(EditAction::ReplaceIngredient, Some("marinara")),
        ];
        let err = validate(&pasta(), PatchSet::new(ops, ""), &hints).unwrap_err();
        assert_eq!(
            err.issues,
            vec![ValidationIssue::UncoveredHint {
                hint_index: 1,
                action: EditAction::ReplaceIngredient,
                target: Some("marinara".to_string())
            }]
        );
    }

    #[test]
    fn test_unrequested_operation_rejected() {
        let ops = vec![
            remove("olive oil"),
            PatchOperation::ScaleServings { factor: 3.0 },
        ];
        let hints = vec![CoverageHint::new(EditAction::RemoveIngredient, Some("Olive Oil"))];
        let err = validate(&pasta(), PatchSet::new(ops, ""), &hints).unwrap_err();
        assert_eq!(
            err.issues,
            vec![ValidationIssue::UnrequestedOperation {
                index: 1,
                action: EditAction::ScaleServings
            }]
        );
    }

    #[test]
    fn test_one_hint_cannot_cover_two_operations() {
        let ops = vec![
            PatchOperation::ScaleServings { factor: 2.0 },
            PatchOperation::ScaleServings { factor: 2.0 },
        ];
        let hints = vec![CoverageHint::new(EditAction::ScaleServings, None)];
        let err = validate(&pasta(), PatchSet::new(ops, ""), &hints).unwrap_err();
        assert!(err.has_issue(|i| matches!(i, ValidationIssue::UnrequestedOperation { index: 1, .. })));
    }

    #[test]
    fn test_targeted_hints_claim_first() {
        let ops = vec![remove("pasta"), remove("olive oil")];
        let hints = vec![
            CoverageHint::new(EditAction::RemoveIngredient, None),
            CoverageHint::new(EditAction::RemoveIngredient, Some("pasta")),
        ];
        assert!(validate(&pasta(), PatchSet::new(ops, ""), &hints).is_ok());
    }

    #[test]
    fn test_all_issues_reported_together() {
        let ops = vec![
            PatchOperation::ScaleServings { factor: -1.0 },
            remove("anchovies"),
        ];
        let err = validate(&pasta(), PatchSet::new(ops, ""), &[]).unwrap_err();
        assert!(err.has_issue(|i| matches!(i, ValidationIssue::NonPositiveFactor { .. })));
        assert!(err.has_issue(|i| matches!(i, ValidationIssue::UnknownTarget { .. })));
        assert!(err.has_issue(|i| matches!(i, ValidationIssue::UnrequestedOperation { index: 0, .. })));
        assert!(err.has_issue(|i| matches!(i, ValidationIssue::UnrequestedOperation { index: 1, .. })));
    }

    #[test]
    fn test_hint_action_aliases() {
        let hint: CoverageHint =
            serde_json::from_str(r#"{"action": "substitute", "target": "milk"}"#).unwrap();
        assert_eq!(hint.action, EditAction::ReplaceIngredient);
        let hint: CoverageHint = serde_json::from_str(r#"{"action": "scale"}"#).unwrap();
        assert_eq!(hint.action, EditAction::ScaleServings);
        assert_eq!(hint.target, None);
    }
}
