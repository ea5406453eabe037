//! Last-resort fix of an invalid document by the generator.

use facet::Facet;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{EditError, ServiceError};
use crate::schema;
use crate::service::{GenerationRequest, Purpose, StructuredGenerator};
use crate::store::DocumentStore;
use crate::validate;
use crate::{info, warn};

/// Generator answer to a repair prompt.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct RepairResponse {
    #[facet(rename = "fixedHTML")]
    pub fixed_html: String,
    #[facet(default, rename = "fixDescription")]
    pub fix_description: String,
    pub success: bool,
}

#[derive(Facet, Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub success: bool,
    /// The committed document
    pub fixed_document: Option<String>,
    pub description: String,
    pub error: Option<EditError>,
}

impl RepairOutcome {
    fn failed(error: EditError) -> Self {
        Self {
            success: false,
            fixed_document: None,
            description: String::new(),
            error: Some(error),
        }
    }
}

/// Awaits `fut` for at most `limit`, mapping expiry to [`ServiceError::Timeout`].
pub(crate) async fn with_timeout<F>(limit: Duration, fut: F) -> Result<String, ServiceError>
where
    F: Future<Output = Result<String, ServiceError>>,
{
    let started = Instant::now();
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
        }),
    }
}

pub struct RepairFallback {
    generator: Arc<dyn StructuredGenerator>,
    timeout: Duration,
}

impl RepairFallback {
    pub fn new(generator: Arc<dyn StructuredGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Ask for a corrected version of `candidate` and commit it if it validates.
    ///
    /// The answer is checked as-is: no auto-fix pass runs on repaired output.
    /// The store lock is only taken for the final commit.
    pub async fn repair(
        &self,
        store: &Mutex<DocumentStore>,
        context: &str,
        error: &str,
        candidate: &str,
    ) -> RepairOutcome {
        let request = GenerationRequest {
            prompt: schema::repair_prompt(candidate, error, context),
            schema: schema::REPAIR_SCHEMA,
            purpose: Purpose::Repair,
        };
        let raw = match with_timeout(self.timeout, self.generator.generate(request)).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "repair request failed");
                return RepairOutcome::failed(err.into());
            }
        };

        let response: RepairResponse = match facet_json::from_str(&raw) {
            Ok(response) => response,
            Err(err) => return RepairOutcome::failed(ServiceError::malformed(err.to_string()).into()),
        };

        if !response.success {
            return RepairOutcome::failed(
                ServiceError::Declined {
                    detail: response.fix_description,
                }
                .into(),
            );
        }

        if let Err(err) = validate::check(&response.fixed_html) {
            warn!(error = %err, "repaired document is still invalid");
            return RepairOutcome::failed(err.into());
        }

        if let Err(err) = store.lock().commit(response.fixed_html.as_str()) {
            return RepairOutcome::failed(err);
        }
        info!(description = %response.fix_description, "repair committed");

        RepairOutcome {
            success: true,
            fixed_document: Some(response.fixed_html),
            description: response.fix_description,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_renamed_fields() {
        let response: RepairResponse = facet_json::from_str(
            r#"{"fixedHTML": "<html></html>", "fixDescription": "closed div", "success": true}"#,
        )
        .unwrap();
        assert_eq!(response.fixed_html, "<html></html>");
        assert_eq!(response.fix_description, "closed div");
        assert!(response.success);
    }
}
