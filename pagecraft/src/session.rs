//! One editing session: a document, a generator, and a request at a time.

use facet::Facet;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::EngineConfig;
use crate::error::{EditError, ErrorCategory};
use crate::instructions::{self, EditPlan, PlanResponse};
use crate::orchestrator::{HybridOutcome, HybridStatus, Orchestrator};
use crate::repair::{self, RepairFallback};
use crate::schema;
use crate::service::{GenerationRequest, Purpose, StructuredGenerator};
use crate::store::{DebugInfo, DocumentStore, UndoOutcome};
use crate::{debug, info, warn};

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyKind {
    Success,
    Partial,
    Clarification,
    Error,
    Info,
}

/// What the chat surface shows after a request.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub message: String,
    /// The document changed and the preview should refresh
    pub updated: bool,
    pub summary: Option<String>,
    pub details: Vec<String>,
    pub suggestions: Vec<String>,
    pub category: Option<ErrorCategory>,
}

impl Reply {
    fn new(kind: ReplyKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            updated: false,
            summary: None,
            details: Vec::new(),
            suggestions: Vec::new(),
            category: None,
        }
    }

    pub fn error(err: &EditError) -> Self {
        Self {
            category: Some(err.category()),
            details: vec![err.to_string()],
            ..Self::new(ReplyKind::Error, err.user_message())
        }
    }

    fn from_plan(kind: ReplyKind, message: String, response: PlanResponse) -> Self {
        Self {
            updated: matches!(kind, ReplyKind::Success | ReplyKind::Partial),
            summary: response.summary,
            details: response.details,
            suggestions: response.suggestions,
            ..Self::new(kind, message)
        }
    }
}

#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct SessionDebugInfo {
    pub document: DebugInfo,
    pub is_processing: bool,
}

/// Holds the busy flag for the lifetime of one request.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct EditSession {
    store: Mutex<DocumentStore>,
    orchestrator: Orchestrator,
    generator: Arc<dyn StructuredGenerator>,
    repair: RepairFallback,
    config: EngineConfig,
    busy: AtomicBool,
}

impl EditSession {
    pub fn new(
        store: DocumentStore,
        generator: Arc<dyn StructuredGenerator>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            orchestrator: Orchestrator::new(config.clone()),
            repair: RepairFallback::new(generator.clone(), config.service_timeout),
            generator,
            config,
            busy: AtomicBool::new(false),
        }
    }

    /// Session over the built-in starter page.
    pub fn with_default_template(
        generator: Arc<dyn StructuredGenerator>,
        config: EngineConfig,
    ) -> Self {
        let store = DocumentStore::with_default_template(&config);
        Self::new(store, generator, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_processing(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Turn a natural-language request into edits and apply them.
    pub async fn handle(&self, message: &str) -> Reply {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!("rejecting request: already processing");
            return Reply::error(&EditError::Busy);
        };

        match self.process(message).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "request failed");
                Reply::error(&err)
            }
        }
    }

    async fn process(&self, message: &str) -> Result<Reply, EditError> {
        let prompt = schema::edit_prompt(self.store.lock().current(), message);
        let request = GenerationRequest {
            prompt,
            schema: schema::EDIT_PLAN_SCHEMA,
            purpose: Purpose::Edit,
        };
        let raw = repair::with_timeout(self.config.service_timeout, self.generator.generate(request))
            .await?;

        let plan = EditPlan::from_json(&raw)?;
        instructions::validate_plan(&plan)?;
        let response = plan.response.clone().unwrap_or_default();

        if plan.is_clarification_only() {
            let question = response.clarification().unwrap_or_default().to_string();
            return Ok(Reply::from_plan(ReplyKind::Clarification, question, response));
        }

        let outcome = {
            let mut store = self.store.lock();
            self.orchestrator
                .run(&mut store, &plan.operations, &plan.actions)
        };

        match outcome.status {
            HybridStatus::Success => {
                info!(message = %outcome.message, "request succeeded");
                let text = summary_or(&response, || outcome.message.clone());
                Ok(Reply::from_plan(ReplyKind::Success, text, response))
            }
            HybridStatus::PartialSuccess => {
                let failures = outcome
                    .action_outcome
                    .as_ref()
                    .map(|a| a.error_summary())
                    .unwrap_or_default();
                let text = format!(
                    "{} Some changes could not be applied: {failures}",
                    summary_or(&response, || "Applied part of the request.".to_string())
                );
                Ok(Reply::from_plan(ReplyKind::Partial, text, response))
            }
            HybridStatus::Failure => self.recover(message, &plan, outcome, response).await,
        }
    }

    /// Escalate an invalid-document failure to the repair fallback; anything else is final.
    ///
    /// A repaired document only stands in for the patch stage, so the plan's
    /// actions are run again on top of it and any that fail are reported.
    async fn recover(
        &self,
        message: &str,
        plan: &EditPlan,
        outcome: HybridOutcome,
        response: PlanResponse,
    ) -> Result<Reply, EditError> {
        let error = outcome
            .error
            .clone()
            .unwrap_or_else(|| EditError::validation(outcome.message.clone()));

        let candidate = match (&error, outcome.rejected_html()) {
            (EditError::StructuralIntegrity { .. }, Some(candidate)) => candidate.to_string(),
            _ => return Err(error),
        };

        info!("escalating to repair");
        let repaired = self
            .repair
            .repair(&self.store, message, &error.to_string(), &candidate)
            .await;
        if !repaired.success {
            return Err(repaired.error.unwrap_or(error));
        }

        let lead = format!(
            "{} The generated HTML needed repair: {}",
            summary_or(&response, || "Applied the request.".to_string()),
            repaired.description
        );
        if plan.actions.is_empty() {
            return Ok(Reply::from_plan(ReplyKind::Success, lead, response));
        }

        let followup = {
            let mut store = self.store.lock();
            self.orchestrator.run(&mut store, &[], &plan.actions)
        };
        match followup.status {
            HybridStatus::Success => Ok(Reply::from_plan(ReplyKind::Success, lead, response)),
            HybridStatus::PartialSuccess | HybridStatus::Failure => {
                let failures = followup
                    .action_outcome
                    .as_ref()
                    .map(|a| a.error_summary())
                    .unwrap_or(followup.message);
                warn!(%failures, "actions failed after repair");
                let text = format!("{lead} Some changes could not be applied: {failures}");
                Ok(Reply::from_plan(ReplyKind::Partial, text, response))
            }
        }
    }

    /// Step back to the previous document.
    pub fn undo(&self) -> Reply {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            return Reply::error(&EditError::Busy);
        };
        match self.store.lock().undo() {
            UndoOutcome::Restored { .. } => Reply {
                updated: true,
                ..Reply::new(ReplyKind::Success, "Restored the previous version.")
            },
            UndoOutcome::NothingToUndo => Reply::new(ReplyKind::Info, "Nothing to undo."),
        }
    }

    /// Install a fresh baseline (e.g. a reloaded template), dropping history.
    pub fn replace_baseline(&self, html: &str) -> Result<(), EditError> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            return Err(EditError::Busy);
        };
        self.store.lock().replace_baseline(html)
    }

    pub fn current_html(&self) -> String {
        self.store.lock().current().to_string()
    }

    pub fn export_html(&self) -> String {
        self.store.lock().export_html()
    }

    pub fn debug_info(&self) -> SessionDebugInfo {
        SessionDebugInfo {
            document: self.store.lock().debug_info(),
            is_processing: self.is_processing(),
        }
    }
}

fn summary_or(response: &PlanResponse, fallback: impl FnOnce() -> String) -> String {
    match response.summary().trim() {
        "" => fallback(),
        summary => summary.to_string(),
    }
}
