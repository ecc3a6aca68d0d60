use serde::{Serialize, Serializer};
use tracing::{info, instrument, warn};

use super::{AiService, ApiKey, GenerateRequest, ProviderError};

const PROBE_PROMPT: &str = "Say 'Connection Successful'";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Unauthorized,
    Forbidden,
    RateLimited,
}

impl ProbeStatus {
    pub fn code(self) -> u16 {
        match self {
            ProbeStatus::Unauthorized => 401,
            ProbeStatus::Forbidden => 403,
            ProbeStatus::RateLimited => 429,
        }
    }

    fn from_code(code: u16) -> Option<Self> {
        match code {
            401 => Some(ProbeStatus::Unauthorized),
            403 => Some(ProbeStatus::Forbidden),
            429 => Some(ProbeStatus::RateLimited),
            _ => None,
        }
    }
}

impl Serialize for ProbeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

/// Outcome of a single diagnostic round trip. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityProbeResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status_code: Option<ProbeStatus>,
}

impl ConnectivityProbeResult {
    fn ok(response: String) -> Self {
        Self {
            success: true,
            response: Some(response),
            error: None,
            status_code: None,
        }
    }

    fn failed(error: String, status_code: Option<ProbeStatus>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error),
            status_code,
        }
    }
}

/// Best-effort status from free error text. Order matters: quota wins over
/// permission, which wins over credential problems.
pub fn classify_error_text(text: &str) -> Option<ProbeStatus> {
    let lower = text.to_lowercase();
    if text.contains("429") || text.contains("Quota exceeded") || text.contains("ResourceExhausted")
    {
        Some(ProbeStatus::RateLimited)
    } else if text.contains("403") || lower.contains("permission") {
        Some(ProbeStatus::Forbidden)
    } else if text.contains("401") || lower.contains("invalid") {
        Some(ProbeStatus::Unauthorized)
    } else {
        None
    }
}

fn classify(err: &ProviderError) -> Option<ProbeStatus> {
    err.status
        .and_then(ProbeStatus::from_code)
        .or_else(|| classify_error_text(&err.message))
}

impl AiService {
    /// Tries one minimal chat round trip with `credential`, falling back to the
    /// configured key. The override only lives for this call.
    #[instrument(skip(self, credential), fields(override_key = credential.is_some()))]
    pub async fn probe_connectivity(&self, credential: Option<&str>) -> ConnectivityProbeResult {
        let override_key = credential.and_then(ApiKey::new);
        let Some(key) = override_key.as_ref().or(self.api_key.as_ref()) else {
            return ConnectivityProbeResult::failed("API Key missing".into(), None);
        };

        let request = GenerateRequest::text(&self.chat_model, PROBE_PROMPT);
        match self.model.generate(key, request).await {
            Ok(text) => {
                info!("provider connectivity ok");
                ConnectivityProbeResult::ok(text)
            }
            Err(e) => {
                let status = classify(&e);
                warn!(error = %e, status = ?status, "provider connectivity failed");
                ConnectivityProbeResult::failed(e.message, status)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{service, ScriptedModel};

    #[test]
    fn classifies_error_text() {
        let cases = [
            ("429 Too Many Requests", Some(ProbeStatus::RateLimited)),
            ("Quota exceeded for metric", Some(ProbeStatus::RateLimited)),
            ("google.api_core.exceptions.ResourceExhausted", Some(ProbeStatus::RateLimited)),
            ("403 Forbidden", Some(ProbeStatus::Forbidden)),
            ("Caller does not have Permission", Some(ProbeStatus::Forbidden)),
            ("401 Unauthorized", Some(ProbeStatus::Unauthorized)),
            ("API key INVALID", Some(ProbeStatus::Unauthorized)),
            ("connection reset by peer", None),
        ];
        for (text, expected) in cases {
            assert_eq!(classify_error_text(text), expected, "{text}");
        }
    }

    #[test]
    fn quota_beats_permission_and_invalid() {
        assert_eq!(
            classify_error_text("429 permission invalid"),
            Some(ProbeStatus::RateLimited)
        );
        assert_eq!(
            classify_error_text("permission: invalid key"),
            Some(ProbeStatus::Forbidden)
        );
    }

    #[test]
    fn structured_status_is_preferred() {
        let err = ProviderError::http(403, "key is invalid");
        assert_eq!(classify(&err), Some(ProbeStatus::Forbidden));

        let err = ProviderError::http(400, "400 INVALID_ARGUMENT: API key not valid");
        assert_eq!(classify(&err), Some(ProbeStatus::Unauthorized));
    }

    #[test]
    fn serializes_status_as_number() {
        let r = ConnectivityProbeResult::failed("nope".into(), Some(ProbeStatus::RateLimited));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["status_code"], 429);
        assert_eq!(json["error"], "nope");
        assert!(json.get("response").is_none());
    }

    #[tokio::test]
    async fn missing_key_fails_without_io() {
        let model = ScriptedModel::new();
        let ai = service(model.clone(), None);

        let r = ai.probe_connectivity(None).await;
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("API Key missing"));
        assert_eq!(r.status_code, None);
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn success_returns_reply() {
        let model = ScriptedModel::new();
        model.push(Ok("Connection Successful".into()));
        let ai = service(model.clone(), Some("configured"));

        let r = ai.probe_connectivity(None).await;
        assert!(r.success);
        assert_eq!(r.response.as_deref(), Some("Connection Successful"));
        assert_eq!(model.calls()[0].api_key, "configured");
    }

    #[tokio::test]
    async fn override_does_not_leak_into_later_calls() {
        let model = ScriptedModel::new();
        model.push(Ok("Connection Successful".into()));
        model.push(Err(ProviderError::http(429, "429 RESOURCE_EXHAUSTED: Quota exceeded")));
        model.push(Ok("coach says hi".into()));
        let ai = service(model.clone(), Some("configured"));

        assert!(ai.probe_connectivity(Some("override-1")).await.success);
        let failed = ai.probe_connectivity(Some("override-2")).await;
        assert!(!failed.success);
        assert_eq!(failed.status_code, Some(ProbeStatus::RateLimited));
        ai.coach_reply("hi", None).await.unwrap();

        let keys: Vec<_> = model.calls().into_iter().map(|c| c.api_key).collect();
        assert_eq!(keys, vec!["override-1", "override-2", "configured"]);
    }

    #[tokio::test]
    async fn override_works_without_configured_key() {
        let model = ScriptedModel::new();
        model.push(Err(ProviderError::transport("dns error")));
        let ai = service(model.clone(), None);

        let r = ai.probe_connectivity(Some("candidate")).await;
        assert!(!r.success);
        assert_eq!(r.status_code, None);
        assert_eq!(model.calls()[0].api_key, "candidate");
        assert!(!ai.is_configured());
    }
}
