use async_trait::async_trait;
use facet::Facet;
use facet_value::Value;
use std::time::Instant;

use pagecraft::{GenerationRequest, ServiceError, StructuredGenerator};

use crate::config::{ConfigError, GeminiConfig};
use crate::{debug, warn};

#[derive(Facet, Debug)]
struct Part {
    text: String,
}

#[derive(Facet, Debug)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Facet, Debug)]
struct GenerationConfig {
    #[facet(rename = "responseMimeType")]
    response_mime_type: String,
    #[facet(rename = "responseSchema")]
    response_schema: Value,
}

#[derive(Facet, Debug)]
struct GenerateContentBody {
    contents: Vec<Content>,
    #[facet(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

/// Body for a structured-output `generateContent` call.
fn request_body(request: &GenerationRequest) -> Result<String, ServiceError> {
    let schema: Value = facet_json::from_str(request.schema)
        .map_err(|e| ServiceError::malformed(format!("response schema: {e}")))?;
    let body = GenerateContentBody {
        contents: vec![Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: request.prompt.clone(),
            }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: schema,
        },
    };
    facet_json::to_string(&body).map_err(|e| ServiceError::malformed(e.to_string()))
}

fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.as_object()?.get(key)
}

fn first<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    field(value, key)?.as_array()?.iter().next()
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
pub(crate) fn extract_text(body: &str) -> Result<String, ServiceError> {
    let value: Value =
        facet_json::from_str(body).map_err(|e| ServiceError::malformed(e.to_string()))?;

    let Some(candidate) = first(&value, "candidates") else {
        let reason = field(&value, "promptFeedback")
            .and_then(|f| field(f, "blockReason"))
            .and_then(|r| r.as_string())
            .map(|r| r.as_str().to_string());
        return Err(match reason {
            Some(reason) => ServiceError::Declined {
                detail: format!("prompt blocked: {reason}"),
            },
            None => ServiceError::malformed("response has no candidates"),
        });
    };

    field(candidate, "content")
        .and_then(|c| first(c, "parts"))
        .and_then(|p| field(p, "text"))
        .and_then(|t| t.as_string())
        .map(|t| t.as_str().to_string())
        .ok_or_else(|| ServiceError::malformed("candidate has no text part"))
}

/// Map a non-success HTTP status to a service error.
///
/// A rejected key comes back as a 400 whose body names `API_KEY_INVALID`.
pub(crate) fn classify_status(status: u16, body: &str) -> ServiceError {
    let detail = format!("HTTP {status}: {}", body.chars().take(200).collect::<String>());
    match status {
        401 | 403 => ServiceError::Credentials { detail },
        400..=499 if body.contains("API_KEY") => ServiceError::Credentials { detail },
        429 => ServiceError::RateLimited { detail },
        500..=599 => ServiceError::Network { detail },
        _ => ServiceError::Declined { detail },
    }
}

/// [`StructuredGenerator`] backed by the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::Client {
                detail: e.to_string(),
            })?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl StructuredGenerator for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ServiceError> {
        let body = request_body(&request)?;
        let started = Instant::now();
        debug!(model = %self.config.model, purpose = ?request.purpose, "generateContent");

        let response = self
            .http
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error(e, started))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(e, started))?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "generateContent failed");
            return Err(classify_status(status.as_u16(), &text));
        }

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = text.len(),
            "generateContent answered"
        );
        extract_text(&text)
    }
}

fn transport_error(err: reqwest::Error, started: Instant) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    } else {
        ServiceError::Network {
            detail: err.to_string(),
        }
    }
}
