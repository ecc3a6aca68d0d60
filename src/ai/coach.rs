use tracing::{debug, error, instrument, warn};

use super::{AiService, GenerateRequest, ProviderError};

pub(crate) const OFFLINE_REPLY: &str =
    "I am currently in offline mode. Please configure the Gemini API Key to talk to the AI Coach.";

const PERSONA: &str = "You are a friendly Nutrition Coach for the app 'Find Your Food'.";

/// Builds the single-turn coach prompt. `context` is appended as the user's goal.
pub(crate) fn coach_prompt(message: &str, context: Option<&str>) -> String {
    let mut prompt = format!("{PERSONA} User says: {message}");
    if let Some(goal) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\nUser Goal: ");
        prompt.push_str(goal);
    }
    prompt
}

impl AiService {
    /// Free-text coach answer. No memory between calls; the reply is returned as-is.
    #[instrument(skip(self, message, context))]
    pub async fn coach_reply(
        &self,
        message: &str,
        context: Option<&str>,
    ) -> Result<String, ProviderError> {
        let Some(key) = &self.api_key else {
            warn!("GEMINI_API_KEY not configured; coach in offline mode");
            return Ok(OFFLINE_REPLY.to_string());
        };

        let request = GenerateRequest::text(&self.chat_model, coach_prompt(message, context));
        let reply = self.model.generate(key, request).await.map_err(|e| {
            error!(error = %e, status = ?e.status, "coach request failed");
            e
        })?;
        debug!(len = reply.len(), "coach replied");
        Ok(reply)
    }
}
