use serde::Deserialize;

/// Optional credential to probe instead of the configured one.
#[derive(Debug, Default, Deserialize)]
pub struct CheckAiRequest {
    #[serde(default)]
    pub api_key: Option<String>,
}
