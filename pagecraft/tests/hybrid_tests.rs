//! Tests for requests that combine patches and actions.

use facet_testhelpers::test;
use pagecraft::{Action, ActionType, DocumentStore, EngineConfig, HybridStatus, Orchestrator, Patch};

fn data(json: &str) -> facet_value::Value {
    facet_json::from_str(json).unwrap()
}

#[test]
fn test_patches_then_actions() {
    let config = EngineConfig::default();
    let mut store = DocumentStore::with_default_template(&config);
    let outcome = Orchestrator::new(config).run(
        &mut store,
        &[
            Patch::new("JasonCom", "Christmas Sale"),
            Patch::new("--primary-color: #4EA699;", "--primary-color: #e53e3e;"),
        ],
        &[Action::new(
            ActionType::BulkUpdatePricing,
            data(r#"{"plans": [{"name": "A"}, {"name": "B"}, {"name": "C"}]}"#),
        )],
    );
    assert_eq!(outcome.status, HybridStatus::Success, "{}", outcome.message);
    assert!(outcome.error.is_none());
    assert!(store.current().contains("Christmas Sale"));
    assert!(store.current().contains("#e53e3e"));
    assert_eq!(store.current().matches("data-plan=\"plan-").count(), 3);
    assert_eq!(store.history_len(), 2);
}

#[test]
fn test_actions_only() {
    let config = EngineConfig::default();
    let mut store = DocumentStore::with_default_template(&config);
    let outcome = Orchestrator::new(config).run(
        &mut store,
        &[],
        &[Action::new(ActionType::ClearExpiration, data("{}"))],
    );
    assert!(outcome.is_success());
    assert!(outcome.patch_outcome.is_none());
    assert!(outcome.action_outcome.unwrap().results[0].not_implemented);
}

#[test]
fn test_undo_after_hybrid_request_steps_back_one_stage() {
    let config = EngineConfig::default();
    let mut store = DocumentStore::with_default_template(&config);
    let original = store.current().to_string();
    Orchestrator::new(config).run(
        &mut store,
        &[Patch::new("JasonCom", "Spring Sale")],
        &[Action::new(ActionType::DeletePlan, data(r#"{"index": 0}"#))],
    );
    store.undo();
    assert!(store.current().contains("Spring Sale"));
    assert!(store.current().contains("data-plan=\"free\""));
    store.undo();
    assert_eq!(store.current(), original);
}

#[test]
fn test_both_stages_failing_report_joined_errors() {
    let config = EngineConfig::default();
    let mut store = DocumentStore::with_default_template(&config);
    let original = store.current().to_string();
    let outcome = Orchestrator::new(config).run(
        &mut store,
        &[Patch::new("<h1>Nowhere</h1>", "<h1>Somewhere</h1>")],
        &[Action::new(ActionType::DeletePlan, data(r#"{"index": 42}"#))],
    );
    assert_eq!(outcome.status, HybridStatus::Failure);
    assert!(outcome.action_outcome.as_ref().unwrap().is_failure());

    let (patches, actions) = outcome
        .message
        .split_once("; ")
        .expect("two stage messages");
    assert!(patches.starts_with("patches: search text of patch 1 not found"), "{patches}");
    assert!(actions.starts_with("actions: action 1 (DELETE_PLAN)"), "{actions}");
    assert!(matches!(
        outcome.error,
        Some(pagecraft::EditError::PatchNotFound { index: 1, .. })
    ));
    assert_eq!(store.current(), original);
    assert_eq!(store.history_len(), 0);
}

#[test]
fn test_patch_failure_discards_successful_actions() {
    let config = EngineConfig::default();
    let mut store = DocumentStore::with_default_template(&config);
    let original = store.current().to_string();
    let outcome = Orchestrator::new(config).run(
        &mut store,
        &[Patch::new("<h1>Nowhere</h1>", "<h1>Somewhere</h1>")],
        &[Action::new(ActionType::DeletePlan, data(r#"{"index": 0}"#))],
    );
    assert!(outcome.is_failure());
    assert_eq!(outcome.action_outcome.as_ref().unwrap().executed_count, 1);
    assert!(outcome.message.contains("executed 1 of 1 actions"));
    assert_eq!(store.current(), original);
}
