//! Runs the patch stage then the action stage for one request.

use facet::Facet;

use crate::actions::{Action, ActionBatchOutcome, ActionExecutor};
use crate::config::EngineConfig;
use crate::error::EditError;
use crate::patch::{self, Patch, PatchOutcome};
use crate::store::DocumentStore;
use crate::{debug, info, warn};

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HybridStatus {
    Success,
    PartialSuccess,
    Failure,
}

/// Combined result of both stages. A stage that was not attempted is `None`.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct HybridOutcome {
    pub status: HybridStatus,
    pub patch_outcome: Option<PatchOutcome>,
    pub action_outcome: Option<ActionBatchOutcome>,
    pub message: String,
    /// The error that decides how the failure is reported
    pub error: Option<EditError>,
}

impl HybridOutcome {
    pub fn is_success(&self) -> bool {
        self.status == HybridStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status == HybridStatus::Failure
    }

    /// Candidate document the patch stage rejected as invalid, if that is why the request failed.
    pub fn rejected_html(&self) -> Option<&str> {
        self.patch_outcome
            .as_ref()
            .and_then(|p| p.rejected_html.as_deref())
    }

    fn failure(error: EditError) -> Self {
        Self {
            status: HybridStatus::Failure,
            patch_outcome: None,
            action_outcome: None,
            message: error.to_string(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Default)]
pub struct Orchestrator {
    executor: ActionExecutor,
}

impl Orchestrator {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            executor: ActionExecutor::new(config),
        }
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    /// Apply `patches` atomically, then `actions` one by one.
    ///
    /// Both stages run whenever they have work. If either fails outright the
    /// store is put back exactly as it was before the call, including any
    /// commit from the other stage, and the stage errors are joined with `; `.
    pub fn run(
        &self,
        store: &mut DocumentStore,
        patches: &[Patch],
        actions: &[Action],
    ) -> HybridOutcome {
        if patches.is_empty() && actions.is_empty() {
            return HybridOutcome::failure(EditError::validation(
                "the request has no operations or actions",
            ));
        }

        let snapshot = store.snapshot();
        let mut messages = Vec::new();
        let mut error = None;

        let patch_outcome = (!patches.is_empty()).then(|| {
            let outcome = patch::apply(store, patches);
            if outcome.success {
                debug!(applied = outcome.applied_count, "patch stage done");
                messages.push(format!("applied {} patches", outcome.applied_count));
            } else {
                let err = outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| EditError::validation("patch stage failed"));
                warn!(error = %err, "patch stage failed");
                messages.push(format!("patches: {err}"));
                error = Some(err);
            }
            outcome
        });

        let action_outcome = (!actions.is_empty()).then(|| {
            let outcome = self.executor.execute(store, actions);
            if outcome.is_failure() {
                let summary = outcome.error_summary();
                warn!(errors = %summary, "action stage failed");
                messages.push(format!("actions: {summary}"));
                if error.is_none() {
                    error = outcome.errors.first().map(|f| f.error.clone());
                }
            } else {
                messages.push(format!(
                    "executed {} of {} actions",
                    outcome.executed_count,
                    actions.len()
                ));
                if outcome.partial_success {
                    messages.push(format!("actions: {}", outcome.error_summary()));
                }
            }
            outcome
        });

        let action_failed = action_outcome.as_ref().is_some_and(|a| a.is_failure());
        let failed = error.is_some() || action_failed;
        if failed {
            store.restore(snapshot);
            warn!("request rolled back");
        }

        let status = if failed {
            HybridStatus::Failure
        } else if action_outcome.as_ref().is_some_and(|a| a.partial_success) {
            HybridStatus::PartialSuccess
        } else {
            HybridStatus::Success
        };
        info!(?status, "request finished");

        HybridOutcome {
            status,
            patch_outcome,
            action_outcome,
            message: messages.join("; "),
            error: if failed {
                error.or_else(|| Some(EditError::validation("action stage failed")))
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(json: &str) -> facet_value::Value {
        facet_json::from_str(json).unwrap()
    }

    fn store() -> DocumentStore {
        DocumentStore::with_default_template(&EngineConfig::default())
    }

    #[test]
    fn empty_request_is_rejected() {
        let mut store = store();
        let outcome = Orchestrator::default().run(&mut store, &[], &[]);
        assert!(outcome.is_failure());
        assert!(matches!(outcome.error, Some(EditError::Validation { .. })));
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn patch_failure_still_runs_actions_then_rolls_back() {
        let mut store = store();
        let before = store.current().to_string();
        let outcome = Orchestrator::default().run(
            &mut store,
            &[Patch::new("not on the page", "x")],
            &[Action::new(
                crate::actions::ActionType::DeletePlan,
                data(r#"{"index": 0}"#),
            )],
        );
        assert!(outcome.is_failure());
        assert!(outcome.action_outcome.as_ref().unwrap().success);
        assert!(matches!(outcome.error, Some(EditError::PatchNotFound { index: 1, .. })));
        assert_eq!(store.current(), before);
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn failed_actions_roll_back_patches() {
        let mut store = store();
        let before = store.current().to_string();
        let outcome = Orchestrator::default().run(
            &mut store,
            &[Patch::new("JasonCom", "Winter Sale")],
            &[Action::new(
                crate::actions::ActionType::DeletePlan,
                data(r#"{"index": 9}"#),
            )],
        );
        assert!(outcome.is_failure());
        assert!(outcome.patch_outcome.as_ref().unwrap().success);
        assert!(outcome.message.contains("action 1 (DELETE_PLAN)"));
        assert_eq!(store.current(), before);
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn partial_actions_are_partial_success() {
        let mut store = store();
        let outcome = Orchestrator::default().run(
            &mut store,
            &[Patch::new("JasonCom", "Winter Sale")],
            &[
                Action::new(crate::actions::ActionType::DeletePlan, data(r#"{"index": 9}"#)),
                Action::new(crate::actions::ActionType::DeletePlan, data(r#"{"index": 0}"#)),
            ],
        );
        assert_eq!(outcome.status, HybridStatus::PartialSuccess);
        assert!(store.current().contains("Winter Sale"));
        assert_eq!(store.history_len(), 2);
    }
}
