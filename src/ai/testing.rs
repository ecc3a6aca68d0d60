use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{AiService, ApiKey, GenerateRequest, GenerativeModel, ProviderError};
use crate::config::{GeminiConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub api_key: String,
    pub request: GenerateRequest,
}

/// Replays queued replies in order and records every call it receives.
#[derive(Default)]
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, reply: Result<String, ProviderError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(
        &self,
        api_key: &ApiKey,
        request: GenerateRequest,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(RecordedCall {
            api_key: api_key.expose().to_string(),
            request,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::transport("no scripted reply")))
    }
}

pub(crate) fn service(model: Arc<ScriptedModel>, api_key: Option<&str>) -> AiService {
    let cfg = GeminiConfig {
        api_key: api_key.and_then(ApiKey::new),
        base_url: DEFAULT_GEMINI_BASE_URL.into(),
        vision_model: DEFAULT_GEMINI_MODEL.into(),
        chat_model: DEFAULT_GEMINI_MODEL.into(),
    };
    AiService::new(model, &cfg)
}
