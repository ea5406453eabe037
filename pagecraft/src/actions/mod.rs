//! Named structural edits (pricing-card CRUD and friends).
//!
//! Each action is decoded into a typed [`ActionKind`], run against a freshly
//! parsed copy of the current document, and committed through the store on
//! its own. Failures are collected per action; they never stop the batch.

mod params;
mod pricing;

use facet::Facet;
use facet_value::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::EngineConfig;
use crate::dom::{self, Document};
use crate::error::EditError;
use crate::store::DocumentStore;
use crate::{debug, warn};

use params::Params;
pub use params::Price;

/// Action as it arrives on the wire.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct Action {
    #[facet(rename = "type")]
    pub kind: String,
    #[facet(default)]
    pub data: Option<Value>,
    #[facet(default)]
    pub description: Option<String>,
}

impl Action {
    pub fn new(kind: ActionType, data: Value) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            data: Some(data),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    AddPlan,
    DeletePlan,
    UpdatePlan,
    ReorderPlans,
    BulkUpdatePricing,
    SetExpiration,
    ClearExpiration,
    AddBulletPoint,
    RemoveBulletPoint,
    SetHighlight,
}

impl ActionType {
    pub const ALL: [ActionType; 10] = [
        ActionType::AddPlan,
        ActionType::DeletePlan,
        ActionType::UpdatePlan,
        ActionType::ReorderPlans,
        ActionType::BulkUpdatePricing,
        ActionType::SetExpiration,
        ActionType::ClearExpiration,
        ActionType::AddBulletPoint,
        ActionType::RemoveBulletPoint,
        ActionType::SetHighlight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::AddPlan => "ADD_PLAN",
            ActionType::DeletePlan => "DELETE_PLAN",
            ActionType::UpdatePlan => "UPDATE_PLAN",
            ActionType::ReorderPlans => "REORDER_PLANS",
            ActionType::BulkUpdatePricing => "BULK_UPDATE_PRICING",
            ActionType::SetExpiration => "SET_EXPIRATION",
            ActionType::ClearExpiration => "CLEAR_EXPIRATION",
            ActionType::AddBulletPoint => "ADD_BULLET_POINT",
            ActionType::RemoveBulletPoint => "REMOVE_BULLET_POINT",
            ActionType::SetHighlight => "SET_HIGHLIGHT",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EditError::validation(format!("unsupported action type '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanType {
    Free,
    Paid,
}

impl PlanType {
    fn parse(raw: Option<String>) -> Option<Self> {
        raw.map(|t| {
            if t.eq_ignore_ascii_case("free") {
                PlanType::Free
            } else {
                PlanType::Paid
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlan {
    pub title: String,
    pub price: Price,
    pub features: Vec<String>,
    pub recommended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanUpdate {
    pub index: usize,
    pub name: Option<String>,
    pub price: Option<Price>,
    pub plan_type: Option<PlanType>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSpec {
    pub name: String,
    pub price: Price,
    pub plan_type: PlanType,
    pub description: String,
}

/// A decoded action with typed parameters and defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    AddPlan(NewPlan),
    DeletePlan { index: usize },
    UpdatePlan(PlanUpdate),
    ReorderPlans { order: Vec<usize> },
    BulkUpdatePricing { plans: Vec<PlanSpec> },
    SetExpiration { date: String, message: String },
    ClearExpiration,
    AddBulletPoint { plan_index: usize, bullet_point: String },
    RemoveBulletPoint { plan_index: usize, bullet_index: usize },
    SetHighlight { plan_index: usize, highlighted: bool },
}

impl ActionKind {
    /// Validate the wire form and apply parameter defaults.
    pub fn decode(action: &Action) -> Result<Self, EditError> {
        let action_type: ActionType = action.kind.parse()?;
        let obj = action
            .data
            .as_ref()
            .and_then(|d| d.as_object())
            .ok_or_else(|| EditError::validation(format!("{action_type} needs a `data` object")))?;
        let p = Params::new(obj);

        Ok(match action_type {
            ActionType::AddPlan => {
                let (title, price, features, recommended) = match p.object("planData")? {
                    Some(plan) => (
                        plan.text("title")?,
                        plan.price("price")?,
                        plan.text_list("features")?,
                        plan.flag("isRecommended")?,
                    ),
                    None => (None, None, None, None),
                };
                ActionKind::AddPlan(NewPlan {
                    title: title.unwrap_or_else(|| "New Plan".to_string()),
                    price: price.unwrap_or_else(|| Price::Display("$0".to_string())),
                    features: features.unwrap_or_else(|| vec!["Basic feature".to_string()]),
                    recommended: recommended.unwrap_or(false),
                })
            }
            ActionType::DeletePlan => ActionKind::DeletePlan {
                index: p.index("index")?,
            },
            ActionType::UpdatePlan => ActionKind::UpdatePlan(PlanUpdate {
                index: p.index("index")?,
                name: p.text("name")?,
                price: p.price("price")?,
                plan_type: PlanType::parse(p.text("type")?),
                description: p.text("description")?,
            }),
            ActionType::ReorderPlans => ActionKind::ReorderPlans {
                order: p.index_list("order")?,
            },
            ActionType::BulkUpdatePricing => {
                let list = p
                    .list("plans")?
                    .filter(|l| !l.is_empty())
                    .ok_or_else(|| EditError::validation("`plans` must be a non-empty array"))?;
                let plans = list
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let obj = value.as_object().ok_or_else(|| {
                            EditError::validation(format!("plans[{i}] must be an object"))
                        })?;
                        let plan = Params::new(obj);
                        Ok(PlanSpec {
                            name: plan.text("name")?.unwrap_or_else(|| format!("Plan {}", i + 1)),
                            price: plan
                                .price("price")?
                                .unwrap_or_else(|| Price::Amount("0".to_string())),
                            plan_type: PlanType::parse(plan.text("type")?).unwrap_or(PlanType::Paid),
                            description: plan
                                .text("description")?
                                .unwrap_or_else(|| "Plan description".to_string()),
                        })
                    })
                    .collect::<Result<Vec<_>, EditError>>()?;
                ActionKind::BulkUpdatePricing { plans }
            }
            ActionType::SetExpiration => ActionKind::SetExpiration {
                date: p.required_text("date")?,
                message: p
                    .text("message")?
                    .unwrap_or_else(|| "Limited time offer!".to_string()),
            },
            ActionType::ClearExpiration => ActionKind::ClearExpiration,
            ActionType::AddBulletPoint => ActionKind::AddBulletPoint {
                plan_index: p.index("planIndex")?,
                bullet_point: p.required_text("bulletPoint")?,
            },
            ActionType::RemoveBulletPoint => ActionKind::RemoveBulletPoint {
                plan_index: p.index("planIndex")?,
                bullet_index: p.index("bulletIndex")?,
            },
            ActionType::SetHighlight => ActionKind::SetHighlight {
                plan_index: p.index("planIndex")?,
                highlighted: p.flag("highlighted")?.unwrap_or(true),
            },
        })
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::AddPlan(_) => ActionType::AddPlan,
            ActionKind::DeletePlan { .. } => ActionType::DeletePlan,
            ActionKind::UpdatePlan(_) => ActionType::UpdatePlan,
            ActionKind::ReorderPlans { .. } => ActionType::ReorderPlans,
            ActionKind::BulkUpdatePricing { .. } => ActionType::BulkUpdatePricing,
            ActionKind::SetExpiration { .. } => ActionType::SetExpiration,
            ActionKind::ClearExpiration => ActionType::ClearExpiration,
            ActionKind::AddBulletPoint { .. } => ActionType::AddBulletPoint,
            ActionKind::RemoveBulletPoint { .. } => ActionType::RemoveBulletPoint,
            ActionKind::SetHighlight { .. } => ActionType::SetHighlight,
        }
    }
}

/// Outcome of one successful action. Positions are 1-based.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub index: usize,
    pub action: String,
    pub description: String,
    /// Parameters were valid but the action does not touch the document yet
    pub not_implemented: bool,
}

#[derive(Facet, Debug, Clone, PartialEq)]
pub struct ActionFailure {
    pub index: usize,
    pub action: String,
    pub error: EditError,
}

/// Aggregate of a batch: all, some or none of the actions succeeded.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct ActionBatchOutcome {
    pub success: bool,
    pub partial_success: bool,
    pub results: Vec<ActionResult>,
    pub errors: Vec<ActionFailure>,
    pub executed_count: usize,
}

impl ActionBatchOutcome {
    fn from_parts(results: Vec<ActionResult>, errors: Vec<ActionFailure>) -> Self {
        Self {
            success: errors.is_empty(),
            partial_success: !errors.is_empty() && !results.is_empty(),
            executed_count: results.len(),
            results,
            errors,
        }
    }

    /// `true` when every action failed (an empty batch is not a failure).
    pub fn is_failure(&self) -> bool {
        !self.success && !self.partial_success
    }

    /// One line per failed action.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|f| format!("action {} ({}): {}", f.index, f.action, f.error))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Runs actions against a [`DocumentStore`].
#[derive(Debug)]
pub struct ActionExecutor {
    config: EngineConfig,
    last_plan_stamp: AtomicU64,
}

impl ActionExecutor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            last_plan_stamp: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Millisecond timestamp for `data-plan` ids, strictly increasing per executor.
    fn plan_stamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let mut last = self.last_plan_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_plan_stamp.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    /// Run `actions` in order; each one commits independently.
    pub fn execute(&self, store: &mut DocumentStore, actions: &[Action]) -> ActionBatchOutcome {
        let mut results = Vec::new();
        let mut errors = Vec::new();

        for (i, action) in actions.iter().enumerate() {
            let index = i + 1;
            match self.execute_one(store, action) {
                Ok((description, not_implemented)) => {
                    debug!(index, action = %action.kind, not_implemented, "action succeeded");
                    results.push(ActionResult {
                        index,
                        action: action.kind.clone(),
                        description: action.description.clone().unwrap_or(description),
                        not_implemented,
                    });
                }
                Err(error) => {
                    warn!(index, action = %action.kind, %error, "action failed");
                    errors.push(ActionFailure {
                        index,
                        action: action.kind.clone(),
                        error,
                    });
                }
            }
        }

        ActionBatchOutcome::from_parts(results, errors)
    }

    fn execute_one(
        &self,
        store: &mut DocumentStore,
        action: &Action,
    ) -> Result<(String, bool), EditError> {
        let config = &self.config;
        match ActionKind::decode(action)? {
            ActionKind::AddPlan(plan) => {
                let id = format!("plan-{}", self.plan_stamp());
                edit_document(store, |doc| pricing::add_plan(doc, config, &plan, &id))
            }
            ActionKind::DeletePlan { index } => {
                edit_document(store, |doc| pricing::delete_plan(doc, config, index))
            }
            ActionKind::UpdatePlan(update) => {
                edit_document(store, |doc| pricing::update_plan(doc, config, &update))
            }
            ActionKind::ReorderPlans { order } => {
                edit_document(store, |doc| pricing::reorder_plans(doc, config, &order))
            }
            ActionKind::BulkUpdatePricing { plans } => {
                let id_base = format!("plan-{}", self.plan_stamp());
                edit_document(store, |doc| pricing::bulk_update(doc, config, &plans, &id_base))
            }
            kind @ (ActionKind::SetExpiration { .. }
            | ActionKind::ClearExpiration
            | ActionKind::AddBulletPoint { .. }
            | ActionKind::RemoveBulletPoint { .. }
            | ActionKind::SetHighlight { .. }) => Ok((placeholder_description(&kind), true)),
        }
    }
}

/// Parse the current document, let `mutate` change it, and commit the result.
fn edit_document(
    store: &mut DocumentStore,
    mutate: impl FnOnce(&mut Document) -> Result<String, EditError>,
) -> Result<(String, bool), EditError> {
    let mut doc = dom::parse(store.current());
    let description = mutate(&mut doc)?;
    let html = if doc.doctype.is_some() {
        doc.to_html()
    } else {
        format!("<!DOCTYPE html>\n{}", doc.to_html())
    };
    store.commit(html)?;
    Ok((description, false))
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn placeholder_description(kind: &ActionKind) -> String {
    match kind {
        ActionKind::SetExpiration { date, .. } => format!("Expiration set to {date}"),
        ActionKind::ClearExpiration => "Expiration cleared".to_string(),
        ActionKind::AddBulletPoint { plan_index, .. } => {
            format!("Added a feature to plan #{}", plan_index + 1)
        }
        ActionKind::RemoveBulletPoint { plan_index, .. } => {
            format!("Removed a feature from plan #{}", plan_index + 1)
        }
        ActionKind::SetHighlight {
            plan_index,
            highlighted,
        } => format!(
            "Highlight {} for plan #{}",
            if *highlighted { "enabled" } else { "disabled" },
            plan_index + 1
        ),
        other => other.action_type().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(kind: &str, data: &str) -> Action {
        Action {
            kind: kind.to_string(),
            data: Some(facet_json::from_str(data).unwrap()),
            description: None,
        }
    }

    #[test]
    fn parses_every_action_type() {
        for t in ActionType::ALL {
            assert_eq!(t.as_str().parse::<ActionType>().unwrap(), t);
        }
        assert!("EXPLODE".parse::<ActionType>().is_err());
    }

    #[test]
    fn decodes_add_plan_defaults() {
        let kind = ActionKind::decode(&action("ADD_PLAN", "{}")).unwrap();
        assert_eq!(
            kind,
            ActionKind::AddPlan(NewPlan {
                title: "New Plan".to_string(),
                price: Price::Display("$0".to_string()),
                features: vec!["Basic feature".to_string()],
                recommended: false,
            })
        );
    }

    #[test]
    fn decodes_bulk_defaults() {
        let kind =
            ActionKind::decode(&action("BULK_UPDATE_PRICING", r#"{"plans": [{}, {"type": "free"}]}"#))
                .unwrap();
        let ActionKind::BulkUpdatePricing { plans } = kind else {
            panic!("wrong kind");
        };
        assert_eq!(plans[0].name, "Plan 1");
        assert_eq!(plans[0].plan_type, PlanType::Paid);
        assert_eq!(plans[0].price, Price::Amount("0".to_string()));
        assert_eq!(plans[1].name, "Plan 2");
        assert_eq!(plans[1].plan_type, PlanType::Free);
        assert_eq!(plans[1].description, "Plan description");
    }

    #[test]
    fn rejects_missing_data_and_bad_params() {
        let no_data = Action {
            kind: "DELETE_PLAN".to_string(),
            data: None,
            description: None,
        };
        assert!(matches!(ActionKind::decode(&no_data), Err(EditError::Validation { .. })));
        assert!(ActionKind::decode(&action("BULK_UPDATE_PRICING", r#"{"plans": []}"#)).is_err());
        assert!(ActionKind::decode(&action("SET_EXPIRATION", r#"{"message": "soon"}"#)).is_err());
        assert!(ActionKind::decode(&action("DELETE_PLAN", r#"{"index": "one"}"#)).is_err());
    }

    #[test]
    fn placeholders_leave_document_alone() {
        let mut store = DocumentStore::with_default_template(&EngineConfig::default());
        let before = store.current().to_string();
        let outcome = ActionExecutor::default().execute(
            &mut store,
            &[
                action("SET_EXPIRATION", r#"{"date": "2026-12-25"}"#),
                action("CLEAR_EXPIRATION", "{}"),
                action("SET_HIGHLIGHT", r#"{"planIndex": 1}"#),
            ],
        );
        assert!(outcome.success);
        assert!(outcome.results.iter().all(|r| r.not_implemented));
        assert_eq!(outcome.results[2].description, "Highlight enabled for plan #2");
        assert_eq!(store.current(), before);
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn plan_stamps_strictly_increase() {
        let executor = ActionExecutor::default();
        let a = executor.plan_stamp();
        let b = executor.plan_stamp();
        assert!(b > a);
    }
}
