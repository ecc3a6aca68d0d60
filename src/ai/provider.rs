use async_trait::async_trait;
use bytes::Bytes;

use super::{ApiKey, ProviderError};

/// One piece of a multimodal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineImage { mime_type: String, data: Bytes },
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<Part>,
}

impl GenerateRequest {
    pub fn text(model: &str, prompt: impl Into<String>) -> Self {
        Self {
            model: model.to_string(),
            parts: vec![Part::Text(prompt.into())],
        }
    }
}

/// A hosted text/vision model. The credential is a per-call argument so no
/// caller ever has to swap shared provider state.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(
        &self,
        api_key: &ApiKey,
        request: GenerateRequest,
    ) -> Result<String, ProviderError>;
}
