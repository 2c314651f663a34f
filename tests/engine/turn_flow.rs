use crate::support::{ScriptedClient, engine_with};
use motherhive::engine::TurnRequest;
use motherhive::state::ConversationState;
use motherhive::store::{
    Sender, SqliteTaskLog, SqliteTaskMemoryStore, SqliteTurnStore, TaskLog, TaskMemoryStore,
    TurnStore,
};

fn request(persona: &str, message: &str, authorized: bool) -> TurnRequest {
    TurnRequest {
        user: "u1".into(),
        persona: persona.into(),
        message: message.into(),
        authorized,
    }
}

#[tokio::test]
async fn plain_reply_turn_persists_both_turns_and_memory() {
    let client = ScriptedClient::new(vec![ScriptedClient::ok(
        "Hej! Vilken bransch riktar vi oss mot?",
    )]);
    let (engine, pool) = engine_with(client.clone()).await;

    let outcome = engine
        .handle_turn(request("hunter", "jag behöver nya kunder", false))
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Hej! Vilken bransch riktar vi oss mot?");
    assert_eq!(outcome.persona, "Hunter");

    let turns = SqliteTurnStore::new(pool.clone());
    let recent = turns.read_recent("u1", "Hunter", 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].sender, Sender::Agent);
    assert_eq!(recent[1].sender, Sender::User);
    assert_eq!(recent[1].text, "jag behöver nya kunder");

    let memory = SqliteTaskMemoryStore::new(pool)
        .read("u1", "Hunter")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(memory.state, ConversationState::Identify);
}

#[tokio::test]
async fn calendar_directive_appends_note_and_logs_task() {
    let client = ScriptedClient::new(vec![ScriptedClient::ok(
        "Jag har bokat det! 📅 [[ACTION:CALENDAR_BOOK|title:Demo med Lisa|time:2025-03-01T10:00:00]]",
    )]);
    let (engine, pool) = engine_with(client).await;

    let outcome = engine
        .handle_turn(request("dexter", "boka en demo med Lisa imorgon kl 10", true))
        .await
        .unwrap();

    assert!(outcome.reply.starts_with("Jag har bokat det! 📅"));
    assert!(outcome.reply.contains("✅ **Calendar**: booked \"Demo med Lisa\""));
    assert!(!outcome.reply.contains("[[ACTION:"));

    let log = SqliteTaskLog::new(pool);
    let tasks = log.recent("u1", "Dexter", 10).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Booked \"Demo med Lisa\"");
}

#[tokio::test]
async fn unauthorized_calendar_directive_becomes_hint() {
    let client = ScriptedClient::new(vec![ScriptedClient::ok(
        "Klart! [[ACTION:CALENDAR_BOOK|title:Demo|time:2025-03-01T10:00:00]]",
    )]);
    let (engine, pool) = engine_with(client).await;

    let outcome = engine
        .handle_turn(request("dexter", "boka demo", false))
        .await
        .unwrap();

    assert!(outcome.reply.contains("💡 (Tip: enable calendar"));
    let log = SqliteTaskLog::new(pool);
    assert!(log.recent("u1", "Dexter", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn affirmative_after_agent_question_forces_execute_with_augmented_prompt() {
    let client = ScriptedClient::new(vec![ScriptedClient::ok(
        "Här är de:\n- Oslo Marketing AS (oslomarketing.no)\n- Digital Vekst (digitalvekst.no)",
    )]);
    let (engine, pool) = engine_with(client.clone()).await;

    // Seed the prior agent question the affirmative refers to.
    let turns = SqliteTurnStore::new(pool.clone());
    turns
        .append_turn("u1", "Hunter", Sender::Agent, "Ska jag söka leads i Oslo?")
        .await
        .unwrap();

    let outcome = engine
        .handle_turn(request("hunter", "ja tack", false))
        .await
        .unwrap();

    assert!(outcome.reply.contains("Oslo Marketing AS"));
    assert_eq!(outcome.state, ConversationState::Execute);

    // The augmented system prompt carries the forcing instruction and the
    // agreed question.
    let seen = client.seen();
    assert_eq!(seen.len(), 1);
    let system = seen[0].system_prompt.clone().unwrap();
    assert!(system.contains("EXECUTE MODE"));
    assert!(system.contains("leads i Oslo"));
    assert!(system.contains("Do not ask again"));

    let memory = SqliteTaskMemoryStore::new(pool)
        .read("u1", "Hunter")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(memory.active_task.as_deref(), Some("Ska jag söka leads i Oslo?"));
}

#[tokio::test]
async fn consultation_round_replaces_reply_and_appends_attribution() {
    let client = ScriptedClient::new(vec![
        ScriptedClient::ok(
            "Låt mig kolla med vår specialist. \
[[ACTION:CONSULT|agent:Brainy|query:Vad säger manualen om exportfunktionen?]]",
        ),
        ScriptedClient::ok("Manualen säger: exporten finns under Inställningar."),
        ScriptedClient::ok("Exporten hittar du under Inställningar → Export. Säg till om du behöver mer hjälp!"),
    ]);
    let (engine, _pool) = engine_with(client.clone()).await;

    let outcome = engine
        .handle_turn(request("nova", "var hittar jag exportfunktionen?", false))
        .await
        .unwrap();

    assert!(outcome.reply.starts_with("Exporten hittar du under Inställningar"));
    assert!(outcome.reply.contains("*(🤝 consulted Brainy on this)*"));
    assert_eq!(client.seen().len(), 3);
}

#[tokio::test]
async fn consult_naming_unknown_persona_keeps_reply_unchanged() {
    let client = ScriptedClient::new(vec![ScriptedClient::ok(
        "Jag frågar runt. [[ACTION:CONSULT|agent:Zalgo|query:hjälp?]]",
    )]);
    let (engine, _pool) = engine_with(client.clone()).await;

    let outcome = engine
        .handle_turn(request("nova", "vem kan hjälpa mig?", false))
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Jag frågar runt.");
    assert!(!outcome.reply.contains("consulted"));
    // Only the primary completion ran.
    assert_eq!(client.seen().len(), 1);
}

#[tokio::test]
async fn lead_supervision_corrects_booking_before_results() {
    let client = ScriptedClient::new(vec![
        ScriptedClient::ok("Låter bra! Ska jag boka ett möte med dem direkt?"),
        ScriptedClient::ok("Här är resultaten:\n- TechNova (technova.se)\n- GreenFuture (greenfuture.se)"),
    ]);
    let (engine, _pool) = engine_with(client.clone()).await;

    let outcome = engine
        .handle_turn(request("hunter", "hur går det med listan?", false))
        .await
        .unwrap();

    assert!(outcome.reply.starts_with("Här är resultaten:"));
    assert_eq!(client.seen().len(), 2);
}

#[tokio::test]
async fn lead_supervision_caches_delivered_results() {
    let delivered = "Jag hittade dessa:\n- Oslo Marketing AS\n- Digital Vekst\nSka jag boka ett möte?";
    let client = ScriptedClient::new(vec![ScriptedClient::ok(delivered)]);
    let (engine, pool) = engine_with(client.clone()).await;

    engine
        .handle_turn(request("hunter", "visa resultaten", false))
        .await
        .unwrap();

    // No corrective call, and the response text is cached.
    assert_eq!(client.seen().len(), 1);
    let memory = SqliteTaskMemoryStore::new(pool)
        .read("u1", "Hunter")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(memory.last_result_cache.as_deref(), Some(delivered));
    assert!(memory.last_result_at.is_some());
}

#[tokio::test]
async fn reset_message_clears_task_and_idles_then_next_message_identifies() {
    let client = ScriptedClient::new(vec![
        ScriptedClient::ok("Okej, jag släpper det."),
        ScriptedClient::ok("Vad vill du att jag tittar på?"),
    ]);
    let (engine, pool) = engine_with(client).await;

    let first = engine
        .handle_turn(request("brainy", "stop, glöm det", false))
        .await
        .unwrap();
    assert_eq!(first.state, ConversationState::Idle);

    let memory_store = SqliteTaskMemoryStore::new(pool.clone());
    let memory = memory_store.read("u1", "Brainy").await.unwrap().unwrap();
    assert!(memory.active_task.is_none());

    let second = engine
        .handle_turn(request("brainy", "analysera kvartalsrapporten", false))
        .await
        .unwrap();
    assert_eq!(second.state, ConversationState::Identify);
}

#[tokio::test]
async fn history_endpoint_returns_chronological_turns() {
    let client = ScriptedClient::new(vec![
        ScriptedClient::ok("Svar ett."),
        ScriptedClient::ok("Svar två."),
    ]);
    let (engine, _pool) = engine_with(client).await;

    engine
        .handle_turn(request("mother", "första frågan", false))
        .await
        .unwrap();
    engine
        .handle_turn(request("mother", "andra frågan", false))
        .await
        .unwrap();

    let history = engine.history("u1", "mother", 10).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].text, "första frågan");
    assert_eq!(history[3].text, "Svar två.");
}
