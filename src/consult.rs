//! Persona-to-persona consultation.
//!
//! A single-hop, synchronous nested query within the same turn: the target
//! persona answers briefly in isolation, then the original prompt is
//! re-issued with that answer appended so the primary persona can produce one
//! finalized, tag-free reply. Any nested failure is swallowed and the
//! pre-consultation text kept.

use crate::completion::{CompletionClient, CompletionRequest};
use crate::directive;
use crate::error::{HiveError, ToolError};
use crate::persona::PersonaTable;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Nested results are never re-parsed for further directives, so one hop is
/// the whole protocol. Anything deeper is a cycle.
pub const MAX_CONSULT_DEPTH: u8 = 1;

pub trait ConsultPort: Send + Sync {
    /// `Ok(Some(text))` replaces the display text; `Ok(None)` leaves it
    /// unchanged (unmatched persona or swallowed nested failure).
    fn consult<'a>(
        &'a self,
        agent: &'a str,
        query: &'a str,
        depth: u8,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, HiveError>> + Send + 'a>>;
}

/// Consultation bound to one turn's original prompt.
pub struct Consultation {
    client: Arc<dyn CompletionClient>,
    table: Arc<PersonaTable>,
    /// The turn's original assembled request, re-issued with the colleague's
    /// answer appended.
    base: CompletionRequest,
}

impl Consultation {
    #[must_use]
    pub fn new(
        client: Arc<dyn CompletionClient>,
        table: Arc<PersonaTable>,
        base: CompletionRequest,
    ) -> Self {
        Self {
            client,
            table,
            base,
        }
    }
}

impl ConsultPort for Consultation {
    fn consult<'a>(
        &'a self,
        agent: &'a str,
        query: &'a str,
        depth: u8,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, HiveError>> + Send + 'a>> {
        Box::pin(async move {
            if depth >= MAX_CONSULT_DEPTH {
                return Err(ToolError::ConsultDepthExceeded { depth }.into());
            }

            let Some(persona) = self.table.resolve_fuzzy(agent) else {
                tracing::debug!(agent, "Consultation target did not resolve");
                return Ok(None);
            };

            // Isolated brief answer: no shared history.
            let brief = CompletionRequest {
                system_prompt: Some(format!(
                    "You are {} ({}). A colleague asks you a question. Answer \
briefly and concretely with your expertise.",
                    persona.name, persona.role
                )),
                history: Vec::new(),
                message: query.to_string(),
            };
            let answer = match self.client.complete(&brief).await {
                Ok(response) => response.text,
                Err(err) => {
                    tracing::warn!(agent = persona.name, error = %err, "Consultation answer failed");
                    return Ok(None);
                }
            };

            // Re-issue the original prompt with the colleague's answer.
            let mut follow_up = self.base.clone();
            follow_up.message = format!(
                "{}\n\n(ANSWER FROM {}: \"{}\")\n\nINSTRUCTION: {} has now \
answered. Use their answer to give one final, complete reply to the user. Do \
not emit any action tags.",
                self.base.message,
                persona.name,
                answer.trim(),
                persona.name
            );

            match self.client.complete(&follow_up).await {
                Ok(response) => {
                    let finalized = directive::parse(&response.text).display_text;
                    Ok(Some(format!(
                        "{finalized}\n\n*(🤝 consulted {} on this)*",
                        persona.name
                    )))
                }
                Err(err) => {
                    tracing::warn!(agent = persona.name, error = %err, "Consultation finalize failed");
                    Ok(None)
                }
            }
        })
    }
}
