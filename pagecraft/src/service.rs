//! The structured-output generator seam.

use async_trait::async_trait;

use crate::error::ServiceError;

/// What a generation call is for. Backends may log or route on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Edit,
    Repair,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// JSON schema the answer must follow
    pub schema: &'static str,
    pub purpose: Purpose,
}

/// A model that answers a prompt with JSON text matching a schema.
///
/// The returned text is untrusted: callers decode and validate it.
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ServiceError>;
}
