use crate::support::{ScriptedClient, engine_with};
use motherhive::engine::TurnRequest;
use motherhive::error::{CompletionError, HiveError};
use motherhive::store::{Sender, SqliteTurnStore, TurnStore};

fn request(persona: &str, message: &str) -> TurnRequest {
    TurnRequest {
        user: "u1".into(),
        persona: persona.into(),
        message: message.into(),
        authorized: false,
    }
}

#[tokio::test]
async fn exhausted_completion_path_yields_friendly_reply_and_completes_turn() {
    let client = ScriptedClient::new(vec![Err(CompletionError::RateLimited {
        model: "gemini-2.0-flash".into(),
    })]);
    let (engine, pool) = engine_with(client).await;

    let outcome = engine
        .handle_turn(request("dexter", "boka ett möte"))
        .await
        .unwrap();

    assert!(outcome.reply.contains("Overloaded"));

    // The turn still completed: both turns were persisted.
    let turns = SqliteTurnStore::new(pool);
    let recent = turns.read_recent("u1", "Dexter", 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].sender, Sender::Agent);
    assert!(recent[0].text.contains("Overloaded"));
}

#[tokio::test]
async fn auth_failure_reply_is_user_actionable() {
    let client = ScriptedClient::new(vec![Err(CompletionError::Auth {
        model: "gemini-2.0-flash".into(),
    })]);
    let (engine, _pool) = engine_with(client).await;

    let outcome = engine
        .handle_turn(request("nova", "hjälp mig"))
        .await
        .unwrap();

    assert!(outcome.reply.contains("API key") || outcome.reply.contains("credentials"));
}

#[tokio::test]
async fn unknown_persona_is_a_service_error() {
    let client = ScriptedClient::new(vec![]);
    let (engine, _pool) = engine_with(client).await;

    let err = engine
        .handle_turn(request("zalgo", "hej"))
        .await
        .unwrap_err();

    assert!(matches!(err, HiveError::PersonaNotFound(_)));
}

#[tokio::test]
async fn consultation_failure_keeps_pre_consultation_text() {
    let client = ScriptedClient::new(vec![
        ScriptedClient::ok(
            "Jag kollar med Brainy. [[ACTION:CONSULT|agent:Brainy|query:fakta?]]",
        ),
        Err(CompletionError::Unknown("backend down".into())),
    ]);
    let (engine, _pool) = engine_with(client).await;

    let outcome = engine
        .handle_turn(request("nova", "vad gäller?"))
        .await
        .unwrap();

    // The nested failure is swallowed; the tag-stripped primary text stands.
    assert_eq!(outcome.reply, "Jag kollar med Brainy.");
}
