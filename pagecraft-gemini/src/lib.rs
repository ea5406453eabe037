//! Gemini backend for pagecraft.
//!
//! Implements [`pagecraft::StructuredGenerator`] over the `generateContent`
//! REST endpoint with JSON-schema constrained output.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pagecraft::{EditSession, EngineConfig};
//! use pagecraft_gemini::GeminiClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::from_env()?;
//! let session = EditSession::with_default_template(Arc::new(client), EngineConfig::default());
//! let reply = session.handle("Rename the page to Winter Sale").await;
//! println!("{}", reply.message);
//! # Ok(())
//! # }
//! ```

mod tracing_macros;
pub(crate) use tracing_macros::{debug, warn};

mod client;
mod config;

pub use client::GeminiClient;
pub use config::{ConfigError, DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiConfig};
