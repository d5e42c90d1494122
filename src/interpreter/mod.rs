//! # Interpretation Boundary
//!
//! Free-text edit requests ("make it dairy-free, double it") are turned into
//! structured edits by an external collaborator. Its answer is untrusted: this
//! module only reshapes it into a candidate [`PatchSet`] plus coverage hints,
//! and the patch validator decides whether anything gets applied.
//!
//! The collaborator may answer with ready-made operations in the patch wire
//! format, or with hints only. Hints are translated here:
//!
//! | action  | target              | value           | quantity      |
//! |---------|---------------------|-----------------|---------------|
//! | scale   | -                   | factor (`2`, `double`, `2x`, `1/2`) | - |
//! | replace | ingredient to swap  | new name        | optional      |
//! | add     | ingredient to add   | -               | required      |
//! | remove  | ingredient to drop  | -               | -             |

pub mod circuit_breaker;
pub mod client;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use client::{InterpreterClient, InterpreterError};

use crate::errors::{ValidationError, ValidationIssue};
use crate::patch::{decode_operations, CoverageHint, EditAction, PatchOperation, PatchSet};
use crate::quantity::try_parse_quantity;
use crate::recipe::Recipe;
use log::debug;
use serde::{Deserialize, Serialize};

/// One intended edit as reported by the collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditHint {
    pub action: EditAction,
    #[serde(default)]
    pub target: Option<String>,
    /// Proposed value: a scale factor or a replacement name
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
}

impl EditHint {
    pub fn new(action: EditAction, target: Option<&str>) -> Self {
        Self {
            action,
            target: target.map(str::to_string),
            value: None,
            quantity: None,
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_quantity(mut self, quantity: &str) -> Self {
        self.quantity = Some(quantity.to_string());
        self
    }

    /// The coverage requirement this hint puts on a candidate patch set
    pub fn coverage(&self) -> CoverageHint {
        let target = match self.action {
            EditAction::ScaleServings => None,
            _ => non_blank(&self.target),
        };
        CoverageHint::new(self.action, target)
    }
}

/// What the collaborator is asked to interpret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpretationRequest {
    /// The free-text edit request
    pub text: String,
    /// Current ingredient names of the recipe being edited
    pub ingredients: Vec<String>,
}

impl InterpretationRequest {
    pub fn for_recipe(text: &str, recipe: &Recipe) -> Self {
        Self {
            text: text.to_string(),
            ingredients: recipe.ingredient_names(),
        }
    }
}

/// The collaborator's answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterpretationResponse {
    #[serde(default)]
    pub hints: Vec<EditHint>,
    /// Ready-made operations in the patch wire format
    #[serde(default)]
    pub operations: Option<Vec<serde_json::Value>>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Read a scale factor from words like "double", "half", "2x" or "1/2"
pub fn parse_scale_factor(text: &str) -> Option<f64> {
    let text = text.trim().to_lowercase();
    match text.as_str() {
        "double" | "twice" => return Some(2.0),
        "triple" => return Some(3.0),
        "quadruple" => return Some(4.0),
        "half" | "halve" => return Some(0.5),
        _ => {}
    }

    let number = text
        .strip_suffix('x')
        .or_else(|| text.strip_prefix('x'))
        .unwrap_or(&text)
        .trim();

    let parsed = try_parse_quantity(number).ok()?;
    if parsed.unit.is_some() || !parsed.note.is_empty() {
        return None;
    }
    parsed.amount
}

fn translate_hint(hint_index: usize, hint: &EditHint) -> Result<PatchOperation, ValidationIssue> {
    let untranslatable = |reason: &str| ValidationIssue::UntranslatableHint {
        hint_index,
        reason: reason.to_string(),
    };

    match hint.action {
        EditAction::ScaleServings => {
            let value = non_blank(&hint.value).ok_or_else(|| untranslatable("scale hint has no factor"))?;
            let factor = parse_scale_factor(value)
                .ok_or_else(|| untranslatable(&format!("'{}' is not a scale factor", value)))?;
            Ok(PatchOperation::ScaleServings { factor })
        }
        EditAction::ReplaceIngredient => {
            let target = non_blank(&hint.target).ok_or_else(|| untranslatable("replace hint has no target"))?;
            let new_name = non_blank(&hint.value)
                .ok_or_else(|| untranslatable("replace hint has no replacement name"))?;
            Ok(PatchOperation::ReplaceIngredient {
                target_name: target.to_string(),
                new_name: new_name.to_string(),
                new_quantity: non_blank(&hint.quantity).map(str::to_string),
            })
        }
        EditAction::AddIngredient => {
            let name = non_blank(&hint.target).ok_or_else(|| untranslatable("add hint has no ingredient"))?;
            let quantity =
                non_blank(&hint.quantity).ok_or_else(|| untranslatable("add hint has no quantity"))?;
            Ok(PatchOperation::AddIngredient {
                name: name.to_string(),
                quantity: quantity.to_string(),
                category: None,
            })
        }
        EditAction::RemoveIngredient => {
            let target = non_blank(&hint.target).ok_or_else(|| untranslatable("remove hint has no target"))?;
            Ok(PatchOperation::RemoveIngredient {
                target_name: target.to_string(),
            })
        }
    }
}

/// Turn hints into candidate operations and the matching coverage hints
///
/// Every hint that cannot be translated is reported.
pub fn translate_hints(hints: &[EditHint]) -> Result<(Vec<PatchOperation>, Vec<CoverageHint>), ValidationError> {
    let mut operations = Vec::with_capacity(hints.len());
    let mut issues = Vec::new();

    for (index, hint) in hints.iter().enumerate() {
        match translate_hint(index, hint) {
            Ok(op) => operations.push(op),
            Err(issue) => issues.push(issue),
        }
    }

    if !issues.is_empty() {
        return Err(ValidationError::new(issues));
    }

    let coverage = hints.iter().map(EditHint::coverage).collect();
    Ok((operations, coverage))
}

/// Build the candidate patch set and coverage hints from a collaborator answer
///
/// Ready-made operations take precedence over hint translation; either way
/// the result still has to pass the patch validator.
pub fn candidate_edits(
    response: InterpretationResponse,
    source_text: &str,
) -> Result<(PatchSet, Vec<CoverageHint>), ValidationError> {
    match response.operations {
        Some(values) if !values.is_empty() => {
            debug!(
                "Using {} ready-made operation(s) with {} hint(s)",
                values.len(),
                response.hints.len()
            );
            let operations = decode_operations(values)?;
            let coverage = response.hints.iter().map(EditHint::coverage).collect();
            Ok((PatchSet::new(operations, source_text), coverage))
        }
        _ => {
            debug!("Translating {} hint(s)", response.hints.len());
            let (operations, coverage) = translate_hints(&response.hints)?;
            Ok((PatchSet::new(operations, source_text), coverage))
        }
    }
}

/// Build the candidate patch set from an edits file written by the requester
///
/// Unlike a collaborator answer, ready-made operations without hints describe
/// exactly what was asked for, so each one covers itself. Hints, when given,
/// are still enforced.
pub fn authored_edits(
    response: InterpretationResponse,
    source_text: &str,
) -> Result<(PatchSet, Vec<CoverageHint>), ValidationError> {
    let hinted = !response.hints.is_empty();
    let (patch, coverage) = candidate_edits(response, source_text)?;
    if hinted {
        return Ok((patch, coverage));
    }
    let coverage = patch.operations.iter().map(CoverageHint::from_operation).collect();
    Ok((patch, coverage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::validate;

    fn pasta() -> Recipe {
        Recipe::new("pasta-01", "Pasta", 2.0)
            .with_ingredient("pasta", "200g")
            .with_ingredient("marinara", "2 cups")
            .with_ingredient("parmesan", "30g")
    }

    #[test]
    fn test_parse_scale_factor() {
        assert_eq!(parse_scale_factor("double"), Some(2.0));
        assert_eq!(parse_scale_factor("Half"), Some(0.5));
        assert_eq!(parse_scale_factor("triple"), Some(3.0));
        assert_eq!(parse_scale_factor("2x"), Some(2.0));
        assert_eq!(parse_scale_factor("x3"), Some(3.0));
        assert_eq!(parse_scale_factor("1.5"), Some(1.5));
        assert_eq!(parse_scale_factor("1/2"), Some(0.5));
        assert_eq!(parse_scale_factor("lots"), None);
        assert_eq!(parse_scale_factor("2 cups"), None);
    }

    #[test]
    fn test_translate_hints() {
        let hints = vec![
            EditHint::new(EditAction::ScaleServings, None).with_value("double"),
            EditHint::new(EditAction::ReplaceIngredient, Some("parmesan")).with_value("nutritional yeast"),
            EditHint::new(EditAction::AddIngredient, Some("spinach")).with_quantity("2 cups"),
        ];
        let (ops, coverage) = translate_hints(&hints).unwrap();

        assert_eq!(ops[0], PatchOperation::ScaleServings { factor: 2.0 });
        assert_eq!(
            ops[1],
            PatchOperation::ReplaceIngredient {
                target_name: "parmesan".to_string(),
                new_name: "nutritional yeast".to_string(),
                new_quantity: None,
            }
        );
        assert_eq!(coverage[0], CoverageHint::new(EditAction::ScaleServings, None));
        assert_eq!(coverage[2], CoverageHint::new(EditAction::AddIngredient, Some("spinach")));

        let validated = validate(&pasta(), PatchSet::new(ops, "vegan, double"), &coverage);
        assert!(validated.is_ok());
    }

    #[test]
    fn test_untranslatable_hints_all_reported() {
        let hints = vec![
            EditHint::new(EditAction::ScaleServings, None).with_value("a lot"),
            EditHint::new(EditAction::RemoveIngredient, Some("marinara")),
            EditHint::new(EditAction::AddIngredient, Some("spinach")),
        ];
        let err = translate_hints(&hints).unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert!(matches!(err.issues[0], ValidationIssue::UntranslatableHint { hint_index: 0, .. }));
        assert!(matches!(err.issues[1], ValidationIssue::UntranslatableHint { hint_index: 2, .. }));
    }

    #[test]
    fn test_ready_made_operations_are_coverage_checked() {
        let response: InterpretationResponse = serde_json::from_str(
            r#"{
                "hints": [{"action": "remove", "target": "parmesan"}],
                "operations": [
                    {"op": "remove_ingredient", "target_name": "parmesan"},
                    {"op": "remove_ingredient", "target_name": "pasta"}
                ]
            }"#,
        )
        .unwrap();

        let (patch, coverage) = candidate_edits(response, "no cheese").unwrap();
        assert_eq!(patch.operations.len(), 2);
        assert_eq!(patch.source_text, "no cheese");

        let err = validate(&pasta(), patch, &coverage).unwrap_err();
        assert!(err.has_issue(|i| matches!(i, ValidationIssue::UnrequestedOperation { index: 1, .. })));
    }

    #[test]
    fn test_hints_translated_without_operations() {
        let response: InterpretationResponse = serde_json::from_str(
            r#"{"hints": [{"action": "scale", "value": "2x"}], "operations": []}"#,
        )
        .unwrap();
        let (patch, coverage) = candidate_edits(response, "double it").unwrap();
        assert_eq!(patch.operations, vec![PatchOperation::ScaleServings { factor: 2.0 }]);
        assert!(validate(&pasta(), patch, &coverage).is_ok());
    }

    #[test]
    fn test_malformed_operations_rejected() {
        let response: InterpretationResponse =
            serde_json::from_str(r#"{"operations": [{"op": "scale_servings"}]}"#).unwrap();
        assert!(candidate_edits(response, "").is_err());
    }

    #[test]
    fn test_request_lists_current_ingredients() {
        let request = InterpretationRequest::for_recipe("no cheese", &pasta());
        assert_eq!(request.ingredients, vec!["pasta", "marinara", "parmesan"]);
    }

    #[test]
    fn test_collaborator_operations_without_hints_are_unrequested() {
        let response: InterpretationResponse = serde_json::from_str(
            r#"{"operations": [{"op": "remove_ingredient", "target_name": "parmesan"}]}"#,
        )
        .unwrap();
        let (patch, coverage) = candidate_edits(response, "double it").unwrap();
        assert!(coverage.is_empty());

        let err = validate(&pasta(), patch, &coverage).unwrap_err();
        assert_eq!(
            err.issues,
            vec![ValidationIssue::UnrequestedOperation {
                index: 0,
                action: EditAction::RemoveIngredient,
            }]
        );
    }

    #[test]
    fn test_authored_operations_cover_themselves() {
        let response: InterpretationResponse = serde_json::from_str(
            r#"{"operations": [{"op": "remove_ingredient", "target_name": "parmesan"}]}"#,
        )
        .unwrap();
        let (patch, coverage) = authored_edits(response, "no cheese").unwrap();
        assert_eq!(coverage, vec![CoverageHint::new(EditAction::RemoveIngredient, Some("parmesan"))]);
        assert!(validate(&pasta(), patch, &coverage).is_ok());

        // Hints in an edits file are still enforced
        let response: InterpretationResponse = serde_json::from_str(
            r#"{
                "hints": [{"action": "scale", "value": "double"}],
                "operations": [{"op": "remove_ingredient", "target_name": "parmesan"}]
            }"#,
        )
        .unwrap();
        let (patch, coverage) = authored_edits(response, "double it").unwrap();
        assert!(validate(&pasta(), patch, &coverage).is_err());
    }
}
