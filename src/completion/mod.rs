pub mod fallback;
pub mod gemini;

pub use fallback::{FallbackClient, ModelSelection, RetryPolicy};
pub use gemini::GeminiClient;

use crate::error::CompletionError;
use crate::store::Sender;
use std::future::Future;
use std::pin::Pin;

/// One prior turn carried into the prompt context.
#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub role: Sender,
    pub text: String,
}

/// Assembled request: system instructions + bounded recent history + the
/// current user turn.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub history: Vec<HistoryMessage>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
}

pub type CompletionResult = Result<CompletionResponse, CompletionError>;

/// A backend that can run one completion against a named model.
pub trait ModelBackend: Send + Sync {
    fn name(&self) -> &str;

    fn generate<'a>(
        &'a self,
        model: &'a str,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = CompletionResult> + Send + 'a>>;
}

/// A client with model selection already resolved (candidates, retries and
/// fallback live behind this seam).
pub trait CompletionClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = CompletionResult> + Send + 'a>>;
}

/// Friendly, classified message shown to the user when the primary
/// completion path is exhausted. The turn still completes normally.
#[must_use]
pub fn user_facing_message(err: &CompletionError, persona_name: &str) -> String {
    match err {
        CompletionError::Auth { .. } => "⚠️ **Service disabled**: the completion API rejected \
our credentials. Enable the generative language API for this project and check the API key."
            .into(),
        CompletionError::QuotaExceeded { .. } => "💳 **Billing required**: the provider reports \
a zero quota for this account. Attach a verified billing account to restore service."
            .into(),
        CompletionError::RateLimited { .. } => {
            "⏳ **Overloaded**: I have been thinking too much today. Try again in a moment.".into()
        }
        CompletionError::ModelUnavailable { model } => format!(
            "⚠️ **Model unavailable**: none of the configured models responded (last tried: \
{model}). Check the model candidate list."
        ),
        CompletionError::Transport(detail) | CompletionError::Unknown(detail) => format!(
            "(Offline mode) {persona_name}: I could not reach my brain right now. \
(Technical detail: {detail})"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_message_mentions_credentials() {
        let msg = user_facing_message(&CompletionError::Auth { model: "m".into() }, "Dexter");
        assert!(msg.contains("credentials") || msg.contains("API key"));
    }

    #[test]
    fn quota_message_mentions_billing() {
        let msg =
            user_facing_message(&CompletionError::QuotaExceeded { model: "m".into() }, "Nova");
        assert!(msg.contains("Billing"));
    }

    #[test]
    fn unknown_message_names_the_persona() {
        let msg = user_facing_message(&CompletionError::Unknown("boom".into()), "Hunter");
        assert!(msg.contains("Hunter"));
        assert!(msg.contains("boom"));
    }
}
