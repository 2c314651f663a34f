//! Prompt assembly.
//!
//! The system prompt is the persona template plus shared conduct guidelines,
//! the knowledge-base block, tool authorization status, the current state
//! mode and any transition injection. Rendered with a one-off tera template.

use crate::error::PromptError;
use crate::persona::Persona;
use crate::state::{self, ConversationState};
use tera::{Context, Tera};

const SYSTEM_TEMPLATE: &str = "\
{{ persona_prompt }}

{{ common }}
{% if tools_known %}CALENDAR/MAIL STATUS: {{ tools_status }}
{% endif %}\
{% if knowledge != \"\" %}Documents available in the knowledge base:
{{ knowledge }}

Use the documents above when they are relevant to the user's question.
{% endif %}\
CURRENT MODE: {{ mode }}
{% if injection != \"\" %}
{{ injection }}
{% endif %}";

const COMMON_GUIDELINES: &str = "\
CONDUCT:
1. Warm and human — you are a teammate, not a robot. Avoid phrases like \"As an AI\".
2. Short and readable: short paragraphs and bullet lists, never walls of text.
3. Always end with a clear next step or a question that moves the task forward.
4. Act as a consultant: challenge and suggest improvements when you see them.
5. Detect the user's language and always answer in it.

MULTITASKING: you can perform several actions in one reply — emit one action \
tag per action.

IMAGE GENERATION (available to everyone): \
[[ACTION:GENERATE_IMAGE|prompt:Description in English]] — the description \
must be in English to work well.

COLLABORATION: when a task needs a colleague's expertise, ask them with \
[[ACTION:CONSULT|agent:Name|query:Your question]]. The system fetches their \
answer so you can fold it into your reply.

BACKGROUND WORK: booking meetings and sending mail counts as work performed \
in the background — always confirm that it has been scheduled or sent.";

/// Build the full system prompt for one turn.
pub fn build_system_prompt(
    persona: &Persona,
    conversation_state: ConversationState,
    active_task: Option<&str>,
    injection: Option<&str>,
    knowledge_docs: &[String],
    authorized: bool,
) -> Result<String, PromptError> {
    let mut ctx = Context::new();
    ctx.insert("persona_prompt", persona.prompt);
    ctx.insert("common", COMMON_GUIDELINES);
    ctx.insert("tools_known", &persona.permissions.calendar_mail);
    ctx.insert(
        "tools_status",
        if authorized {
            "✅ CONNECTED & READY"
        } else {
            "❌ NOT CONNECTED (you can only simulate)"
        },
    );
    ctx.insert(
        "knowledge",
        &if persona.permissions.knowledge_base {
            knowledge_docs
                .iter()
                .map(|doc| format!("- {doc}"))
                .collect::<Vec<String>>()
                .join("\n")
        } else {
            String::new()
        },
    );
    ctx.insert(
        "mode",
        &state::state_instruction(conversation_state, persona, active_task),
    );
    ctx.insert("injection", injection.unwrap_or_default());

    Tera::one_off(SYSTEM_TEMPLATE, &ctx, false)
        .map(|rendered| rendered.trim_end().to_string())
        .map_err(|e| PromptError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::PersonaTable;

    #[test]
    fn renders_persona_mode_and_guidelines() {
        let table = PersonaTable::builtin();
        let hunter = table.get("Hunter").unwrap();
        let prompt = build_system_prompt(
            hunter,
            ConversationState::Identify,
            None,
            None,
            &[],
            false,
        )
        .unwrap();

        assert!(prompt.contains("You are Hunter"));
        assert!(prompt.contains("CURRENT MODE: IDENTIFY MODE"));
        assert!(prompt.contains("CONDUCT:"));
        // Hunter has no calendar/mail permission, so no status line.
        assert!(!prompt.contains("CALENDAR/MAIL STATUS"));
    }

    #[test]
    fn admin_persona_sees_authorization_status() {
        let table = PersonaTable::builtin();
        let dexter = table.get("Dexter").unwrap();

        let connected = build_system_prompt(
            dexter,
            ConversationState::Execute,
            Some("book the demo"),
            None,
            &[],
            true,
        )
        .unwrap();
        assert!(connected.contains("CALENDAR/MAIL STATUS: ✅ CONNECTED & READY"));
        assert!(connected.contains("Active task: book the demo"));

        let disconnected = build_system_prompt(
            dexter,
            ConversationState::Execute,
            None,
            None,
            &[],
            false,
        )
        .unwrap();
        assert!(disconnected.contains("only simulate"));
    }

    #[test]
    fn knowledge_block_lists_documents() {
        let table = PersonaTable::builtin();
        let brainy = table.get("Brainy").unwrap();
        let docs = vec!["Q3-report.pdf (pdf)".to_string(), "manual.docx (docx)".to_string()];

        let prompt = build_system_prompt(
            brainy,
            ConversationState::Identify,
            None,
            None,
            &docs,
            false,
        )
        .unwrap();

        assert!(prompt.contains("Documents available in the knowledge base:"));
        assert!(prompt.contains("- Q3-report.pdf (pdf)"));
    }

    #[test]
    fn injection_is_appended_after_mode() {
        let table = PersonaTable::builtin();
        let hunter = table.get("Hunter").unwrap();

        let prompt = build_system_prompt(
            hunter,
            ConversationState::Execute,
            None,
            Some("OVERRIDE: act now."),
            &[],
            false,
        )
        .unwrap();

        let mode_at = prompt.find("CURRENT MODE").unwrap();
        let injection_at = prompt.find("OVERRIDE: act now.").unwrap();
        assert!(injection_at > mode_at);
    }
}
