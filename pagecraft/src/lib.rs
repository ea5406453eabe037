//! Text patching and structural editing for generated promotion pages.
//!
//! pagecraft keeps one HTML document and changes it in two ways:
//! - **Patches**: literal search/replace with whitespace-tolerant fallbacks,
//!   applied all-or-nothing and validated before they are committed
//! - **Actions**: named structural edits on the pricing cards, run on an
//!   html5ever-parsed tree and serialized back
//!
//! Every commit goes through [`DocumentStore`], which refuses invalid HTML and
//! keeps a bounded undo history. [`EditSession`] ties this to a
//! [`StructuredGenerator`] that turns requests into an [`EditPlan`].
//!
//! # Example
//!
//! ```rust
//! use pagecraft::{DocumentStore, EngineConfig, Orchestrator, Patch};
//!
//! let config = EngineConfig::default();
//! let mut store = DocumentStore::with_default_template(&config);
//! let outcome = Orchestrator::new(config).run(
//!     &mut store,
//!     &[Patch::new("JasonCom", "Winter Sale")],
//!     &[],
//! );
//! assert!(outcome.is_success());
//! assert!(store.current().contains("Winter Sale"));
//! ```

mod tracing_macros;
pub(crate) use tracing_macros::{debug, info, trace, warn};

pub mod actions;
pub mod config;
pub mod dom;
pub mod error;
pub mod instructions;
pub mod orchestrator;
pub mod patch;
pub mod repair;
pub mod schema;
pub mod serialize;
pub mod service;
pub mod session;
pub mod store;
pub mod validate;

pub use actions::{Action, ActionBatchOutcome, ActionExecutor, ActionType};
pub use config::EngineConfig;
pub use dom::{Document, parse};
pub use error::{EditError, ErrorCategory, ServiceError};
pub use instructions::{EditPlan, PlanResponse, validate_plan};
pub use orchestrator::{HybridOutcome, HybridStatus, Orchestrator};
pub use patch::{MatchTier, Patch, PatchOutcome};
pub use repair::{RepairFallback, RepairOutcome};
pub use serialize::SerializeOptions;
pub use service::{GenerationRequest, Purpose, StructuredGenerator};
pub use session::{EditSession, Reply, ReplyKind};
pub use store::{DEFAULT_TEMPLATE, DocumentStore, UndoOutcome};
pub use validate::{StructureError, auto_fix, check, is_valid};
