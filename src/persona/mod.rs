mod catalog;

use serde::Serialize;

/// Agent role domains, mirroring the product's team lineup. Supervision and
/// direct-intent behavior key off the domain, not the display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PersonaDomain {
    Orchestrator,
    Strategy,
    WebDev,
    Finance,
    Social,
    Leads,
    Support,
    Research,
    Admin,
    Creative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolPermissions {
    /// Gates CALENDAR_BOOK and GMAIL_SEND (together with turn authorization).
    pub calendar_mail: bool,
    /// Gates the knowledge-base context block in the prompt.
    pub knowledge_base: bool,
}

/// A named conversational persona. Immutable at runtime.
#[derive(Debug, Clone, Serialize)]
pub struct Persona {
    pub name: &'static str,
    pub domain: PersonaDomain,
    pub role: &'static str,
    /// Routing vocabulary; mixed Swedish/English, kept verbatim from the
    /// product as the baseline matching behavior.
    pub keywords: &'static [&'static str],
    /// Direct-intent triggers that force EXECUTE without clarification.
    pub direct_intent: &'static [&'static str],
    /// Extra guidance injected while in EXECUTE mode.
    pub execution_hint: &'static str,
    /// Persona system-prompt body.
    pub prompt: &'static str,
    pub permissions: ToolPermissions,
}

impl Persona {
    #[must_use]
    pub fn matches_keyword(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k))
    }

    #[must_use]
    pub fn matches_direct_intent(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        self.direct_intent.iter().any(|k| lower.contains(k))
    }
}

/// Static registry of the built-in personas.
pub struct PersonaTable {
    personas: Vec<Persona>,
}

impl PersonaTable {
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            personas: catalog::builtin_personas(),
        }
    }

    #[must_use]
    pub fn all(&self) -> &[Persona] {
        &self.personas
    }

    /// Exact lookup by name, case-insensitive.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Case-insensitive substring match, used by the consultation protocol
    /// ("Soshie", "soshie the social manager" and "@Soshie" all resolve).
    #[must_use]
    pub fn resolve_fuzzy(&self, needle: &str) -> Option<&Persona> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.personas.iter().find(|p| {
            let name = p.name.to_lowercase();
            name.contains(&needle) || needle.contains(&name)
        })
    }
}

impl Default for PersonaTable {
    fn default() -> Self {
        Self::builtin()
    }
}
