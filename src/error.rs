use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `MotherHive`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum HiveError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Completion client ───────────────────────────────────────────────
    #[error("completion: {0}")]
    Completion(#[from] CompletionError),

    // ── Persistence ─────────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Directive dispatch ──────────────────────────────────────────────
    #[error("tool: {0}")]
    Tool(#[from] ToolError),

    // ── Prompt / Template ───────────────────────────────────────────────
    #[error("prompt: {0}")]
    Prompt(#[from] PromptError),

    #[error("unknown persona: {0}")]
    PersonaNotFound(String),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Completion errors ──────────────────────────────────────────────────────

/// Classified completion failures. The fallback client surfaces the most
/// severe classification observed once every candidate is exhausted.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("authentication failed for model {model}")]
    Auth { model: String },

    #[error("quota exhausted on model {model}")]
    QuotaExceeded { model: String },

    #[error("model {model} rate-limited")]
    RateLimited { model: String },

    #[error("model {model} not available")]
    ModelUnavailable { model: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("completion failed: {0}")]
    Unknown(String),
}

impl CompletionError {
    /// True for the rate-limit class, the only class retried against the
    /// same candidate. Every other class moves to the next candidate.
    #[must_use]
    pub const fn retries_same_candidate(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Severity rank used to pick the error reported after exhausting all
    /// candidates. Higher wins.
    #[must_use]
    pub const fn severity(&self) -> u8 {
        match self {
            Self::Auth { .. } => 5,
            Self::QuotaExceeded { .. } => 4,
            Self::RateLimited { .. } => 3,
            Self::ModelUnavailable { .. } => 2,
            Self::Transport(_) => 1,
            Self::Unknown(_) => 0,
        }
    }
}

// ─── Store errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
}

// ─── Tool / dispatch errors ─────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool {name} execution failed: {message}")]
    Execution { name: String, message: String },

    #[error("consultation nesting depth {depth} exceeds the maximum of 1")]
    ConsultDepthExceeded { depth: u8 },
}

// ─── Prompt / Template errors ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template render failed: {0}")]
    Render(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, HiveError>;
