use facet::Facet;
use facet_error as error;

use crate::validate::StructureError;

/// Coarse classification surfaced to callers alongside every failure.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCategory {
    NotFound,
    Validation,
    StructuralIntegrity,
    Concurrency,
    ExternalService,
}

/// Errors produced while editing a document.
#[derive(Facet, Debug, Clone, PartialEq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum EditError {
    /// search text of patch {index} not found: {search}
    PatchNotFound { index: usize, search: String },
    /// {what} not found
    TargetNotFound { what: String },
    /// invalid request: {reason}
    Validation { reason: String },
    /// document failed validation: {reason}
    StructuralIntegrity { reason: String },
    /// another request is already being processed
    Busy,
    /// {0}
    ExternalService(#[facet(error::from)] ServiceError),
}

impl EditError {
    pub fn validation(reason: impl Into<String>) -> Self {
        EditError::Validation {
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        EditError::TargetNotFound { what: what.into() }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EditError::PatchNotFound { .. } | EditError::TargetNotFound { .. } => {
                ErrorCategory::NotFound
            }
            EditError::Validation { .. } => ErrorCategory::Validation,
            EditError::StructuralIntegrity { .. } => ErrorCategory::StructuralIntegrity,
            EditError::Busy => ErrorCategory::Concurrency,
            EditError::ExternalService(_) => ErrorCategory::ExternalService,
        }
    }

    /// Message suitable for showing to the person who made the request.
    pub fn user_message(&self) -> String {
        match self {
            EditError::PatchNotFound { .. } => {
                "I couldn't find the part of the page you asked about. Could you describe it differently?"
                    .to_string()
            }
            EditError::TargetNotFound { what } => {
                format!("I couldn't find {what} on the page. Could you describe it differently?")
            }
            EditError::Validation { reason } => {
                format!("That change couldn't be applied: {reason}")
            }
            EditError::StructuralIntegrity { .. } => {
                "The change was cancelled because it would have produced invalid HTML. Please try again."
                    .to_string()
            }
            EditError::Busy => {
                "Another request is already being processed. Please wait a moment and try again."
                    .to_string()
            }
            EditError::ExternalService(err) => err.user_message().to_string(),
        }
    }
}

impl From<StructureError> for EditError {
    fn from(err: StructureError) -> Self {
        EditError::StructuralIntegrity {
            reason: err.to_string(),
        }
    }
}

/// Failures talking to the structured-output generator.
#[derive(Facet, Debug, Clone, PartialEq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum ServiceError {
    /// credentials rejected: {detail}
    Credentials { detail: String },
    /// rate limited: {detail}
    RateLimited { detail: String },
    /// network error: {detail}
    Network { detail: String },
    /// no response after {elapsed_ms} ms
    Timeout { elapsed_ms: u64 },
    /// malformed response: {detail}
    MalformedResponse { detail: String },
    /// generator declined: {detail}
    Declined { detail: String },
}

impl ServiceError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        ServiceError::MalformedResponse {
            detail: detail.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ServiceError::Credentials { .. } => {
                "The AI service rejected the API key. Check the key configuration and try again."
            }
            ServiceError::RateLimited { .. } => {
                "Too many requests right now. Please wait a moment and try again."
            }
            ServiceError::Network { .. } => {
                "Couldn't reach the AI service. Check the network connection and try again."
            }
            ServiceError::Timeout { .. } => {
                "The AI service took too long to answer. Please try again."
            }
            ServiceError::MalformedResponse { .. } => {
                "The AI answer couldn't be understood. Could you phrase the request more specifically?"
            }
            ServiceError::Declined { .. } => {
                "The AI couldn't complete this request. Try describing the change differently."
            }
        }
    }
}
