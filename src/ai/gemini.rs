use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{ApiKey, GenerateRequest, GenerativeModel, Part, ProviderError};

/// Google Generative Language REST client (`models/{model}:generateContent`).
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    status: Option<String>,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn to_wire(parts: Vec<Part>) -> Vec<RequestPart> {
        parts
            .into_iter()
            .map(|p| match p {
                Part::Text(text) => RequestPart::Text { text },
                Part::InlineImage { mime_type, data } => RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type,
                        data: general_purpose::STANDARD.encode(&data),
                    },
                },
            })
            .collect()
    }

    /// "<code> <STATUS>: <message>" from the provider's error body, or the raw body.
    fn describe_failure(code: u16, body: &str) -> String {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope { error }) => match error.status {
                Some(status) => format!("{code} {status}: {}", error.message),
                None => format!("{code}: {}", error.message),
            },
            Err(_) => format!("{code}: {}", body.trim()),
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(
        &self,
        api_key: &ApiKey,
        request: GenerateRequest,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let body = GeminiRequest {
            contents: vec![Content {
                parts: Self::to_wire(request.parts),
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "gemini request failed");
                ProviderError::transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = Self::describe_failure(status.as_u16(), &text);
            error!(%status, %message, "gemini returned error");
            return Err(ProviderError::http(status.as_u16(), message));
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| {
            error!(error = %e, "failed to decode gemini response");
            ProviderError::transport(format!("Failed to decode provider response: {e}"))
        })?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::transport("No candidates in provider response"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
            return Err(ProviderError::transport(format!(
                "Provider returned no text (finish reason: {reason})"
            )));
        }
        debug!(len = text.len(), "gemini response received");
        Ok(text)
    }
}
