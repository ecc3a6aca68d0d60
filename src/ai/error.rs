use thiserror::Error;

/// Failed provider round trip. `status` is the HTTP status when the provider
/// answered at all; transport failures carry `None`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The model answered but the text is not a usable nutrition object.
    #[error("AI Analysis failed: {reason}")]
    Parse { raw_text: String, reason: String },

    #[error("AI Analysis failed: {0}")]
    Provider(#[from] ProviderError),
}

impl AnalysisError {
    /// Raw model output, kept for diagnostics. Absent when the provider never answered.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            AnalysisError::Parse { raw_text, .. } => Some(raw_text),
            AnalysisError::Provider(_) => None,
        }
    }
}
