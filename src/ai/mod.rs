//! Generative-model integration: food image analysis, the nutrition coach and
//! the provider connectivity probe.

mod coach;
mod diagnostics;
pub mod error;
pub mod gemini;
pub mod normalizer;
pub mod provider;
pub mod types;
mod vision;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::Arc;

pub use diagnostics::{classify_error_text, ConnectivityProbeResult, ProbeStatus};
pub use error::{AnalysisError, ProviderError};
pub use provider::{GenerateRequest, GenerativeModel, Part};
pub use types::{FoodItem, NutritionEstimate};

use crate::config::GeminiConfig;

/// Provider credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank input so an empty env var counts as "not configured".
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Entry point used by request handlers. Holds the process-wide credential
/// (if any) and passes it explicitly on every provider call.
#[derive(Clone)]
pub struct AiService {
    model: Arc<dyn GenerativeModel>,
    api_key: Option<ApiKey>,
    vision_model: String,
    chat_model: String,
}

impl AiService {
    pub fn new(model: Arc<dyn GenerativeModel>, cfg: &GeminiConfig) -> Self {
        Self {
            model,
            api_key: cfg.api_key.clone(),
            vision_model: cfg.vision_model.clone(),
            chat_model: cfg.chat_model.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
