use chrono::NaiveDate;
use meal_patch::applicator::apply;
use meal_patch::errors::{EngineError, ValidationIssue};
use meal_patch::interpreter::{candidate_edits, InterpretationResponse};
use meal_patch::patch::{decode_operations_json, validate, CoverageHint, EditAction, PatchOperation, PatchSet};
use meal_patch::plan::{PlanState, PlannedSlot};
use meal_patch::recipe::Recipe;
use meal_patch::variant_store::{Meal, SlotKey};

fn pasta() -> Recipe {
    Recipe::new("pasta-01", "Pasta", 2.0)
        .with_ingredient("pasta", "200g")
        .with_ingredient("marinara", "2 cups")
        .with_ingredient("olive oil", "1 tbsp")
        .with_step("Boil the pasta")
        .with_step("Warm the sauce")
}

fn dinner() -> SlotKey {
    SlotKey::new("household-7", NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), Meal::Dinner)
}

fn exact_hints(ops: &[PatchOperation]) -> Vec<CoverageHint> {
    ops.iter().map(CoverageHint::from_operation).collect()
}

fn lines(recipe: &Recipe) -> Vec<String> {
    recipe.ingredients.iter().map(|line| line.to_string()).collect()
}

#[test]
fn test_pasta_scenario_from_wire_format() {
    let base = pasta();

    let ops = decode_operations_json(r#"[{"op": "scale_servings", "factor": 2}]"#).unwrap();
    let hints = exact_hints(&ops);
    let validated = validate(&base, PatchSet::new(ops, "double it"), &hints).unwrap();
    let doubled = apply(&base, &validated).unwrap();

    assert_eq!(doubled.servings, 4.0);
    assert_eq!(lines(&doubled), vec!["400g pasta", "4 cups marinara", "2 tbsp olive oil"]);
    assert_eq!(doubled.steps, base.steps);

    let ops = decode_operations_json(
        r#"[{"op": "replace_ingredient", "target_name": "marinara", "new_name": "pesto", "new_quantity": "3 cups"}]"#,
    )
    .unwrap();
    let hints = exact_hints(&ops);
    let validated = validate(&doubled, PatchSet::new(ops, "use pesto"), &hints).unwrap();
    let pesto = apply(&doubled, &validated).unwrap();

    assert_eq!(lines(&pesto), vec!["400g pasta", "3 cups pesto", "2 tbsp olive oil"]);
}

#[test]
fn test_replace_of_absent_ingredient_is_rejected() {
    let ops = vec![PatchOperation::ReplaceIngredient {
        target_name: "cream".to_string(),
        new_name: "oat cream".to_string(),
        new_quantity: None,
    }];
    let hints = exact_hints(&ops);
    let err = validate(&pasta(), PatchSet::new(ops, "dairy-free"), &hints).unwrap_err();

    assert!(err.has_issue(|issue| matches!(issue, ValidationIssue::UnknownTarget { .. })));
    assert!(err.to_string().contains("cream"));
}

#[test]
fn test_engine_state_unchanged_after_rejection() {
    let slots = vec![PlannedSlot {
        slot: dinner(),
        recipe: pasta(),
    }];
    let state = PlanState::new("household-7").consolidate(&slots).unwrap();

    // The collaborator dropped the requested scale and invented a removal.
    let response: InterpretationResponse = serde_json::from_str(
        r#"{
            "hints": [{"action": "scale", "value": "double"}],
            "operations": [{"op": "remove_ingredient", "target_name": "olive oil"}]
        }"#,
    )
    .unwrap();
    let (patch, coverage) = candidate_edits(response, "double it").unwrap();

    let err = state.modify_slot(&dinner(), &pasta(), patch, &coverage).unwrap_err();
    let EngineError::Validation(err) = err else {
        panic!("expected a validation error");
    };
    assert!(err.has_issue(|issue| matches!(
        issue,
        ValidationIssue::UncoveredHint {
            action: EditAction::ScaleServings,
            ..
        }
    )));
    assert!(err.has_issue(|issue| matches!(issue, ValidationIssue::UnrequestedOperation { index: 0, .. })));

    assert!(state.variants.is_empty());
    assert_eq!(
        state.grocery.as_ref().unwrap().item("olive oil").unwrap().display_quantity(),
        "1 tbsp"
    );
}

#[test]
fn test_translated_hints_flow_through_the_plan() {
    let slots = vec![PlannedSlot {
        slot: dinner(),
        recipe: pasta(),
    }];
    let state = PlanState::new("household-7").consolidate(&slots).unwrap();

    let response: InterpretationResponse = serde_json::from_str(
        r#"{"hints": [
            {"action": "scale", "value": "half"},
            {"action": "add", "target": "basil", "quantity": "1 bunch"}
        ]}"#,
    )
    .unwrap();
    let (patch, coverage) = candidate_edits(response, "half, add basil").unwrap();
    let next = state.modify_slot(&dinner(), &pasta(), patch, &coverage).unwrap();

    let effective = next.effective_recipe(&dinner(), &pasta());
    assert_eq!(effective.servings, 1.0);
    assert_eq!(
        lines(&effective),
        vec!["100g pasta", "1 cups marinara", "0.5 tbsp olive oil", "1 bunch basil"]
    );

    let variant = next.variants.get_variant(&dinner()).unwrap();
    assert_eq!(variant.patch.source_text, "half, add basil");
    assert_eq!(variant.base_snapshot, pasta());
}

#[test]
fn test_scale_identity_properties() {
    let base = pasta().with_ingredient("salt", "to taste");

    for factors in [vec![1.0], vec![2.0, 0.5], vec![4.0, 0.25]] {
        let ops: Vec<PatchOperation> = factors
            .iter()
            .map(|factor| PatchOperation::ScaleServings { factor: *factor })
            .collect();
        let hints = exact_hints(&ops);
        let validated = validate(&base, PatchSet::new(ops, ""), &hints).unwrap();
        let effective = apply(&base, &validated).unwrap();
        assert_eq!(effective.as_recipe(), &base, "factors {:?}", factors);
    }
}

#[test]
fn test_unhinted_collaborator_operations_never_reach_the_plan() {
    let slots = vec![PlannedSlot {
        slot: dinner(),
        recipe: pasta(),
    }];
    let state = PlanState::new("household-7").consolidate(&slots).unwrap();

    let response: InterpretationResponse = serde_json::from_str(
        r#"{"operations": [{"op": "remove_ingredient", "target_name": "olive oil"}]}"#,
    )
    .unwrap();
    let (patch, coverage) = candidate_edits(response, "double it").unwrap();

    let err = state.modify_slot(&dinner(), &pasta(), patch, &coverage).unwrap_err();
    let EngineError::Validation(err) = err else {
        panic!("expected a validation error");
    };
    assert!(err.has_issue(|issue| matches!(issue, ValidationIssue::UnrequestedOperation { index: 0, .. })));
    assert!(state.variants.is_empty());
}
