//! Conversation state machine.
//!
//! Transitions are evaluated top-down, first match wins, and are total: every
//! (state, message, memory) combination resolves to a definite next state.
//! The vocabularies are keyword lists carried over from the product (mixed
//! Swedish/Norwegian/English); paraphrase misfires are a documented
//! limitation of the baseline behavior.

use crate::persona::Persona;
use crate::store::{Sender, Turn};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    Identify,
    Execute,
    Verify,
}

impl Default for ConversationState {
    /// New (user, persona) pairs start out identifying the task.
    fn default() -> Self {
        Self::Identify
    }
}

const RESET_VOCAB: &[&str] = &[
    "stop",
    "stopp",
    "cancel",
    "avbryt",
    "ny uppgift",
    "new task",
    "glöm det",
];

const AFFIRMATIVES: &[&str] = &[
    "ja",
    "ja tack",
    "tack ja",
    "yes",
    "yep",
    "japp",
    "ok",
    "okej",
    "sure",
    "kör",
    "kör på",
    "gör det",
    "stemmer",
];

/// Confirmation phrasings meaning "keep it" — the result is already rendered
/// in a side channel, so the model must not repeat it inline.
const SUPPRESS_CONFIRMATIONS: &[&str] = &[
    "spara",
    "spara den",
    "importera",
    "save",
    "save it",
    "import",
];

/// How the active task in Task Memory should change this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskUpdate {
    Keep,
    Clear,
    Set(String),
}

#[derive(Debug, Clone)]
pub struct StateDecision {
    pub next_state: ConversationState,
    /// Extra instruction block injected into the system prompt, if any.
    pub injection: Option<String>,
    pub task: TaskUpdate,
}

/// Evaluate the transition rules for one incoming message.
///
/// `last_agent_question` is the persona's most recent prior question from the
/// Turn Store, used to resolve what a bare affirmative refers to.
#[must_use]
pub fn evaluate(
    persona: &Persona,
    current: ConversationState,
    message: &str,
    last_agent_question: Option<&str>,
) -> StateDecision {
    let normalized = normalize(message);

    // 1. Reset vocabulary wins over everything.
    if RESET_VOCAB.iter().any(|w| normalized.contains(w)) {
        return StateDecision {
            next_state: ConversationState::Idle,
            injection: None,
            task: TaskUpdate::Clear,
        };
    }

    // 2. Persona direct-intent vocabulary forces execution.
    if persona.matches_direct_intent(message) {
        return StateDecision {
            next_state: ConversationState::Execute,
            injection: Some(
                "OVERRIDE: the user's request is actionable as-is. Skip all \
clarification, act on the best available inference and invoke your tools now."
                    .into(),
            ),
            task: TaskUpdate::Set(message.trim().to_string()),
        };
    }

    // 3. Short affirmative tokens. The suppression sub-case is checked first:
    //    those confirmations mean a side channel already rendered the result.
    if SUPPRESS_CONFIRMATIONS.contains(&normalized.as_str()) {
        return StateDecision {
            next_state: ConversationState::Execute,
            injection: Some(
                "The user confirmed. The results are already rendered in a side \
channel — acknowledge briefly and do not re-print them inline."
                    .into(),
            ),
            task: TaskUpdate::Keep,
        };
    }
    if AFFIRMATIVES.contains(&normalized.as_str()) {
        let (injection, task) = match last_agent_question {
            Some(question) => (
                format!(
                    "The user agreed to: \"{}\" — act on it now and invoke your \
tools. Do not ask again.",
                    question.trim()
                ),
                TaskUpdate::Set(question.trim().to_string()),
            ),
            None => (
                "The user agreed. Act on the pending task now and invoke your \
tools. Do not ask again."
                    .to_string(),
                TaskUpdate::Keep,
            ),
        };
        return StateDecision {
            next_state: ConversationState::Execute,
            injection: Some(injection),
            task,
        };
    }

    // 4. Any non-trivial message wakes an idle conversation.
    if current == ConversationState::Idle && normalized.chars().count() > 2 {
        return StateDecision {
            next_state: ConversationState::Identify,
            injection: None,
            task: TaskUpdate::Keep,
        };
    }

    // 5. Otherwise unchanged.
    StateDecision {
        next_state: current,
        injection: None,
        task: TaskUpdate::Keep,
    }
}

/// Per-state instruction injected into every prompt.
#[must_use]
pub fn state_instruction(
    state: ConversationState,
    persona: &Persona,
    active_task: Option<&str>,
) -> String {
    match state {
        ConversationState::Idle => {
            "IDLE MODE: remain passive and await a new task from the user.".into()
        }
        ConversationState::Identify => {
            "IDENTIFY MODE: ask targeted clarifying questions until the task is \
unambiguous. Never guess."
                .into()
        }
        ConversationState::Execute => {
            let task_line = active_task
                .map(|t| format!(" Active task: {t}."))
                .unwrap_or_default();
            format!(
                "EXECUTE MODE: stop asking questions. Invoke your tools and \
deliver the result now.{task_line} {}",
                persona.execution_hint
            )
        }
        ConversationState::Verify => {
            "VERIFY MODE: a result has been delivered. Ask the user for explicit \
approval before doing anything else."
                .into()
        }
    }
}

/// Post-turn progression: an executing conversation that actually delivered
/// something moves on to verification.
#[must_use]
pub const fn post_turn_state(decided: ConversationState, delivered: bool) -> ConversationState {
    match (decided, delivered) {
        (ConversationState::Execute, true) => ConversationState::Verify,
        (state, _) => state,
    }
}

/// The persona's most recent prior question, scanned from chronological
/// turns. Falls back to the most recent agent turn when none contains a
/// question mark.
#[must_use]
pub fn last_agent_question(turns: &[Turn]) -> Option<String> {
    let mut latest_agent: Option<&Turn> = None;
    for turn in turns.iter().rev() {
        if turn.sender != Sender::Agent {
            continue;
        }
        if turn.text.contains('?') {
            return Some(turn.text.clone());
        }
        if latest_agent.is_none() {
            latest_agent = Some(turn);
        }
    }
    latest_agent.map(|t| t.text.clone())
}

fn normalize(message: &str) -> String {
    message
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_lowercase()
}
