//! Post-hoc supervision.
//!
//! Runs once after directive dispatch, gated by persona domain. At most one
//! corrective completion; a corrective failure keeps the uncorrected text.

use crate::completion::{CompletionClient, CompletionRequest};
use crate::directive;
use crate::persona::{Persona, PersonaDomain};
use rand::Rng;
use std::sync::Arc;

const BOOKING_VOCAB: &[&str] = &["boka", "bokning", "booking", "book ", "möte", "meeting"];

const STYLE_DIRECTIVES: &[&str] = &[
    "minimalist flat illustration",
    "bold neo-brutalist poster",
    "soft glassmorphism concept",
    "cinematic photorealistic render",
    "retro vaporwave palette",
];

#[derive(Debug)]
pub struct SupervisionOutcome {
    pub text: String,
    /// Response text to cache into Task Memory's last result, when the
    /// lead-generation policy saw delivered evidence.
    pub cache: Option<String>,
}

pub struct Supervisor {
    client: Arc<dyn CompletionClient>,
}

impl Supervisor {
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub async fn review(
        &self,
        persona: &Persona,
        text: String,
        base: &CompletionRequest,
    ) -> SupervisionOutcome {
        match persona.domain {
            PersonaDomain::Leads => self.review_leads(persona, text, base).await,
            PersonaDomain::Creative => self.review_creative(persona, text, base).await,
            _ => SupervisionOutcome { text, cache: None },
        }
    }

    /// Lead-generation policy: never talk booking before results exist.
    async fn review_leads(
        &self,
        persona: &Persona,
        text: String,
        base: &CompletionRequest,
    ) -> SupervisionOutcome {
        if !mentions_booking(&text) {
            return SupervisionOutcome { text, cache: None };
        }
        if has_delivery_evidence(&text) {
            let cache = Some(text.clone());
            return SupervisionOutcome { text, cache };
        }

        tracing::info!(persona = persona.name, "Supervision: booking before results, correcting");
        let instruction = format!(
            "Your previous reply was:\n\"{text}\"\n\nIt proposes booking a \
meeting without delivering results first. Write a corrected reply that \
presents the concrete results (a list with names and links) before any \
booking talk. Do not emit any action tags."
        );
        self.corrective(text, base, instruction).await
    }

    /// Creative policy: a reply that only asks questions is a stalled
    /// clarification loop; force a concrete deliverable.
    async fn review_creative(
        &self,
        persona: &Persona,
        text: String,
        base: &CompletionRequest,
    ) -> SupervisionOutcome {
        if !text.contains('?') || has_markup(&text) {
            return SupervisionOutcome { text, cache: None };
        }

        let style = STYLE_DIRECTIVES[rand::rng().random_range(0..STYLE_DIRECTIVES.len())];
        tracing::info!(
            persona = persona.name,
            style,
            "Supervision: stalled clarification loop, forcing a deliverable"
        );
        let instruction = format!(
            "Your previous reply was:\n\"{text}\"\n\nYou are stuck asking \
questions. Produce a concrete deliverable now, in this style: {style}. \
Describe the finished piece; do not ask further questions and do not emit \
any action tags."
        );
        self.corrective(text, base, instruction).await
    }

    async fn corrective(
        &self,
        original: String,
        base: &CompletionRequest,
        instruction: String,
    ) -> SupervisionOutcome {
        let mut request = base.clone();
        request.message = instruction;

        match self.client.complete(&request).await {
            Ok(response) => SupervisionOutcome {
                text: directive::parse(&response.text).display_text,
                cache: None,
            },
            Err(err) => {
                tracing::warn!(error = %err, "Corrective completion failed, keeping original");
                SupervisionOutcome {
                    text: original,
                    cache: None,
                }
            }
        }
    }
}

fn mentions_booking(text: &str) -> bool {
    let lower = text.to_lowercase();
    BOOKING_VOCAB.iter().any(|word| lower.contains(word))
}

/// Delivered-results evidence: links or list markers.
fn has_delivery_evidence(text: &str) -> bool {
    if text.contains("http://") || text.contains("https://") {
        return true;
    }
    text.lines().any(is_list_line)
}

fn is_list_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("• ") {
        return true;
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && trimmed[digits..].starts_with('.')
}

fn has_markup(text: &str) -> bool {
    text.contains("```") || text.contains('<') || text.contains("[[")
}
