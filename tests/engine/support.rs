use motherhive::completion::{
    CompletionClient, CompletionRequest, CompletionResponse, CompletionResult,
};
use motherhive::dispatch::{Dispatcher, SimulatedCalendar, SimulatedMail, StaticLinkDocuments};
use motherhive::engine::{ChatEngine, NoKnowledge};
use motherhive::error::CompletionError;
use motherhive::persona::PersonaTable;
use motherhive::store::{self, SqliteTaskLog, SqliteTaskMemoryStore, SqliteTurnStore};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// Completion client scripted with a queue of responses; captures every
/// request it sees.
pub struct ScriptedClient {
    responses: Mutex<VecDeque<CompletionResult>>,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<CompletionResult>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::from(responses)),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(text: &str) -> CompletionResult {
        Ok(CompletionResponse { text: text.into() })
    }

    pub fn seen(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl CompletionClient for ScriptedClient {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = CompletionResult> + Send + 'a>> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CompletionError::Unknown("script exhausted".into())))
        })
    }
}

/// Engine over an in-memory database; the pool is returned for direct store
/// seeding and inspection.
pub async fn engine_with(client: Arc<ScriptedClient>) -> (ChatEngine, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    store::ensure_schema(&pool).await.unwrap();

    let dispatcher = Dispatcher::new(
        Arc::new(SimulatedCalendar),
        Arc::new(SimulatedMail),
        Arc::new(StaticLinkDocuments::new("http://files/generated")),
        Arc::new(SqliteTaskLog::new(pool.clone())),
        "https://image.pollinations.ai/prompt",
    );

    let engine = ChatEngine::new(
        Arc::new(PersonaTable::builtin()),
        Arc::new(SqliteTurnStore::new(pool.clone())),
        Arc::new(SqliteTaskMemoryStore::new(pool.clone())),
        Arc::new(NoKnowledge),
        client,
        dispatcher,
        10,
    );

    (engine, pool)
}
