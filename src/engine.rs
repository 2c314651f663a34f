//! The turn pipeline: one shared orchestrator serving both the HTTP gateway
//! and the CLI.
//!
//! Each turn runs as a single sequential async chain: memory + history →
//! state decision → prompt assembly → completion (fallback/retry) →
//! directive parse → dispatch (at most one consultation round) → supervision
//! (at most one corrective round) → persistence. Nested failures are caught
//! at the smallest scope; only an unreachable store at turn entry surfaces
//! as a service error.

use crate::completion::{
    self, CompletionClient, CompletionRequest, FallbackClient, GeminiClient, HistoryMessage,
    ModelBackend, ModelSelection, RetryPolicy,
};
use crate::config::Config;
use crate::consult::Consultation;
use crate::directive;
use crate::dispatch::{
    DispatchContext, Dispatcher, SimulatedCalendar, SimulatedMail, StaticLinkDocuments,
};
use crate::error::{HiveError, Result, StoreError};
use crate::persona::PersonaTable;
use crate::prompt;
use crate::state::{self, ConversationState, TaskUpdate};
use crate::store::{
    self, Sender, SqliteTaskLog, SqliteTaskMemoryStore, SqliteTurnStore, TaskLog, TaskMemoryPatch,
    TaskMemoryStore, Turn, TurnStore,
};
use crate::supervise::Supervisor;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Knowledge-base listing hook. Indexing itself is out of scope; the prompt
/// only needs the document titles.
pub trait KnowledgePort: Send + Sync {
    fn list_documents<'a>(
        &'a self,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Vec<String>> + Send + 'a>>;
}

/// Default: no knowledge base wired up.
pub struct NoKnowledge;

impl KnowledgePort for NoKnowledge {
    fn list_documents<'a>(
        &'a self,
        _user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Vec<String>> + Send + 'a>> {
        Box::pin(async move { Vec::new() })
    }
}

#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user: String,
    pub persona: String,
    pub message: String,
    /// External (calendar/mail) authorization is active for this user.
    pub authorized: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub state: ConversationState,
    pub persona: String,
}

pub struct ChatEngine {
    table: Arc<PersonaTable>,
    turns: Arc<dyn TurnStore>,
    memory: Arc<dyn TaskMemoryStore>,
    knowledge: Arc<dyn KnowledgePort>,
    client: Arc<dyn CompletionClient>,
    dispatcher: Dispatcher,
    supervisor: Supervisor,
    history_window: usize,
}

impl ChatEngine {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        table: Arc<PersonaTable>,
        turns: Arc<dyn TurnStore>,
        memory: Arc<dyn TaskMemoryStore>,
        knowledge: Arc<dyn KnowledgePort>,
        client: Arc<dyn CompletionClient>,
        dispatcher: Dispatcher,
        history_window: usize,
    ) -> Self {
        let supervisor = Supervisor::new(Arc::clone(&client));
        Self {
            table,
            turns,
            memory,
            knowledge,
            client,
            dispatcher,
            supervisor,
            history_window,
        }
    }

    /// Wire up the default engine: SQLite stores, Gemini backend behind the
    /// fallback client, simulated calendar/mail, static document links.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let max_connections = if config.storage.db_path.is_some() { 5 } else { 1 };
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&config.database_url())
            .await
            .map_err(StoreError::from)?;
        store::ensure_schema(&pool).await?;

        let backend: Arc<dyn ModelBackend> = Arc::new(GeminiClient::new(
            &config.api.base_url,
            config.api.api_key.as_deref().unwrap_or_default(),
        ));
        let selection = Arc::new(ModelSelection::new(config.api.volatile_markers.clone()));
        let client: Arc<dyn CompletionClient> = Arc::new(FallbackClient::new(
            backend,
            config.api.model_candidates.clone(),
            RetryPolicy::new(
                config.reliability.max_retries,
                config.reliability.base_delay_ms,
                config.reliability.multiplier,
            ),
            selection,
        ));

        let tasks: Arc<dyn TaskLog> = Arc::new(SqliteTaskLog::new(pool.clone()));
        let dispatcher = Dispatcher::new(
            Arc::new(SimulatedCalendar),
            Arc::new(SimulatedMail),
            Arc::new(StaticLinkDocuments::new(&config.storage.generated_base_url)),
            tasks,
            &config.image.base_url,
        );

        Ok(Self::new(
            Arc::new(PersonaTable::builtin()),
            Arc::new(SqliteTurnStore::new(pool.clone())),
            Arc::new(SqliteTaskMemoryStore::new(pool)),
            Arc::new(NoKnowledge),
            client,
            dispatcher,
            config.history.window,
        ))
    }

    #[must_use]
    pub fn personas(&self) -> &PersonaTable {
        &self.table
    }

    /// Chronological history for one (user, persona) pair.
    pub async fn history(&self, user: &str, persona: &str, n: usize) -> Result<Vec<Turn>> {
        let persona = self
            .table
            .get(persona)
            .ok_or_else(|| HiveError::PersonaNotFound(persona.to_string()))?;
        let mut turns = self.turns.read_recent(user, persona.name, n).await?;
        turns.reverse();
        Ok(turns)
    }

    /// Process one user message end to end.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnOutcome> {
        let persona = self
            .table
            .get(&request.persona)
            .ok_or_else(|| HiveError::PersonaNotFound(request.persona.clone()))?;

        // Store reads at turn entry are the one infra failure allowed to
        // surface as a service error.
        let memory = self
            .memory
            .read(&request.user, persona.name)
            .await?
            .unwrap_or_default();
        let mut recent = self
            .turns
            .read_recent(&request.user, persona.name, self.history_window)
            .await?;
        recent.reverse();

        let prior_question = state::last_agent_question(&recent);
        let decision = state::evaluate(
            persona,
            memory.state,
            &request.message,
            prior_question.as_deref(),
        );
        tracing::debug!(
            persona = persona.name,
            from = %memory.state,
            to = %decision.next_state,
            "State transition"
        );

        if let Err(err) = self
            .turns
            .append_turn(&request.user, persona.name, Sender::User, &request.message)
            .await
        {
            tracing::warn!(error = %err, "User turn persistence failed, continuing");
        }

        let active_task = match &decision.task {
            TaskUpdate::Set(task) => Some(task.clone()),
            TaskUpdate::Keep => memory.active_task.clone(),
            TaskUpdate::Clear => None,
        };

        let knowledge_docs = if persona.permissions.knowledge_base {
            self.knowledge.list_documents(&request.user).await
        } else {
            Vec::new()
        };

        let system_prompt = prompt::build_system_prompt(
            persona,
            decision.next_state,
            active_task.as_deref(),
            decision.injection.as_deref(),
            &knowledge_docs,
            request.authorized,
        )?;

        let completion_request = CompletionRequest {
            system_prompt: Some(system_prompt),
            history: recent
                .iter()
                .map(|turn| HistoryMessage {
                    role: turn.sender,
                    text: turn.text.clone(),
                })
                .collect(),
            message: request.message.clone(),
        };

        let mut delivered = false;
        let mut result_cache = None;

        let reply = match self.client.complete(&completion_request).await {
            Ok(response) => {
                let parsed = directive::parse(&response.text);
                let consultation = Consultation::new(
                    Arc::clone(&self.client),
                    Arc::clone(&self.table),
                    completion_request.clone(),
                );
                let ctx = DispatchContext {
                    user: &request.user,
                    persona,
                    raw_display: &parsed.display_text,
                    authorized: request.authorized,
                    depth: 0,
                };
                let dispatched = self
                    .dispatcher
                    .dispatch(
                        &parsed.directives,
                        parsed.display_text.clone(),
                        &consultation,
                        &ctx,
                    )
                    .await?;
                delivered = dispatched.completed > 0;

                let supervised = self
                    .supervisor
                    .review(persona, dispatched.text, &completion_request)
                    .await;
                if supervised.cache.is_some() {
                    delivered = true;
                }
                result_cache = supervised.cache;
                supervised.text
            }
            Err(err) => {
                // The primary path is exhausted: reply with a friendly,
                // classified message and complete the turn normally.
                tracing::warn!(
                    persona = persona.name,
                    error = %err,
                    "Primary completion path exhausted"
                );
                completion::user_facing_message(&err, persona.name)
            }
        };

        if let Err(err) = self
            .turns
            .append_turn(&request.user, persona.name, Sender::Agent, &reply)
            .await
        {
            tracing::warn!(error = %err, "Agent turn persistence failed, continuing");
        }

        let final_state = state::post_turn_state(decision.next_state, delivered);
        let patch = TaskMemoryPatch {
            state: Some(final_state),
            active_task: match decision.task {
                TaskUpdate::Keep => None,
                TaskUpdate::Clear => Some(None),
                TaskUpdate::Set(task) => Some(Some(task)),
            },
            last_result_cache: result_cache,
        };
        if let Err(err) = self
            .memory
            .merge_write(&request.user, persona.name, patch)
            .await
        {
            tracing::warn!(error = %err, "Task memory merge failed, continuing without it");
        }

        Ok(TurnOutcome {
            reply,
            state: final_state,
            persona: persona.name.to_string(),
        })
    }
}
