//! The edit plan returned by the generator, and its shape checks.

use facet::Facet;

use crate::actions::{Action, ActionType};
use crate::error::{EditError, ServiceError};
use crate::patch::Patch;

/// Conversational part of a plan, shown to the person editing.
#[derive(Facet, Debug, Clone, Default, PartialEq)]
pub struct PlanResponse {
    #[facet(default)]
    pub summary: Option<String>,
    #[facet(default)]
    pub details: Vec<String>,
    #[facet(default)]
    pub suggestions: Vec<String>,
    /// Question asked back when the request is too vague to act on
    #[facet(default)]
    pub clarification: Option<String>,
}

impl PlanResponse {
    pub fn summary(&self) -> &str {
        self.summary.as_deref().unwrap_or_default()
    }

    pub fn clarification(&self) -> Option<&str> {
        self.clarification
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Patches plus structural actions, as produced for one request.
#[derive(Facet, Debug, Clone, Default, PartialEq)]
pub struct EditPlan {
    #[facet(default)]
    pub operations: Vec<Patch>,
    #[facet(default)]
    pub actions: Vec<Action>,
    #[facet(default)]
    pub response: Option<PlanResponse>,
}

impl EditPlan {
    /// Decode the generator's JSON. Shape problems are left to [`validate_plan`].
    pub fn from_json(raw: &str) -> Result<Self, ServiceError> {
        facet_json::from_str(raw).map_err(|e| ServiceError::malformed(e.to_string()))
    }

    pub fn response(&self) -> Option<&PlanResponse> {
        self.response.as_ref()
    }

    /// Nothing to apply, only a question for the user.
    pub fn is_clarification_only(&self) -> bool {
        self.operations.is_empty()
            && self.actions.is_empty()
            && self
                .response
                .as_ref()
                .and_then(PlanResponse::clarification)
                .is_some()
    }
}

/// Every shape problem in `plan`, in order. Positions are 1-based.
pub fn plan_errors(plan: &EditPlan) -> Vec<String> {
    let Some(response) = &plan.response else {
        return vec!["a response object is required".to_string()];
    };

    let mut errors = Vec::new();
    if response.summary().trim().is_empty() {
        errors.push("response.summary is required".to_string());
    }
    if plan.operations.is_empty() && plan.actions.is_empty() && response.clarification().is_none() {
        errors.push(
            "at least one operation or action is required unless a clarification is given"
                .to_string(),
        );
    }
    for (i, patch) in plan.operations.iter().enumerate() {
        if patch.search.is_empty() {
            errors.push(format!("operation {} has no search text", i + 1));
        }
    }
    for (i, action) in plan.actions.iter().enumerate() {
        if action.kind.is_empty() {
            errors.push(format!("action {} has no type", i + 1));
        } else if action.kind.parse::<ActionType>().is_err() {
            errors.push(format!("action {} has unknown type '{}'", i + 1, action.kind));
        }
        if !action.data.as_ref().is_some_and(|d| d.as_object().is_some()) {
            errors.push(format!("action {} has no data object", i + 1));
        }
    }
    errors
}

/// Reject a malformed plan before anything touches the document.
pub fn validate_plan(plan: &EditPlan) -> Result<(), EditError> {
    let errors = plan_errors(plan);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EditError::validation(errors.join("; ")))
    }
}
