use crate::support::{ScriptedClient, engine_with};
use motherhive::engine::ChatEngine;
use motherhive::gateway::run_gateway_with_listener;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

struct GatewayTestServer {
    port: u16,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl GatewayTestServer {
    async fn start(engine: ChatEngine) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let port = listener
            .local_addr()
            .expect("ephemeral gateway listener should expose local address")
            .port();

        let handle =
            tokio::spawn(async move { run_gateway_with_listener(listener, Arc::new(engine)).await });

        wait_until_gateway_ready(port).await;

        Self { port, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }
}

impl Drop for GatewayTestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wait_until_gateway_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..80 {
        let health = client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await;
        if matches!(health, Ok(resp) if resp.status() == StatusCode::OK) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("gateway did not become ready on port {port}");
}

#[tokio::test]
async fn chat_route_runs_a_full_turn_and_reports_state() {
    let client = ScriptedClient::new(vec![ScriptedClient::ok(
        "Hej! Vilken bransch riktar vi oss mot?",
    )]);
    let (engine, _pool) = engine_with(client.clone()).await;
    let server = GatewayTestServer::start(engine).await;

    let response = reqwest::Client::new()
        .post(server.url("/api/chat/hunter"))
        .json(&serde_json::json!({"user": "u1", "message": "jag behöver nya kunder"}))
        .send()
        .await
        .expect("chat request should complete");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("chat reply should be json");
    assert_eq!(
        body.get("response").and_then(Value::as_str),
        Some("Hej! Vilken bransch riktar vi oss mot?")
    );
    assert_eq!(body.get("state").and_then(Value::as_str), Some("identify"));
    assert_eq!(client.seen().len(), 1);
}

#[tokio::test]
async fn unknown_persona_maps_to_not_found() {
    let client = ScriptedClient::new(vec![]);
    let (engine, _pool) = engine_with(client).await;
    let server = GatewayTestServer::start(engine).await;

    let response = reqwest::Client::new()
        .post(server.url("/api/chat/zalgo"))
        .json(&serde_json::json!({"user": "u1", "message": "hej"}))
        .send()
        .await
        .expect("chat request should complete");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_route_returns_chronological_turns() {
    let client = ScriptedClient::new(vec![
        ScriptedClient::ok("Svar ett."),
        ScriptedClient::ok("Svar två."),
    ]);
    let (engine, _pool) = engine_with(client).await;
    let server = GatewayTestServer::start(engine).await;

    let http = reqwest::Client::new();
    for message in ["första frågan", "andra frågan"] {
        let response = http
            .post(server.url("/api/chat/mother"))
            .json(&serde_json::json!({"user": "u1", "message": message}))
            .send()
            .await
            .expect("chat request should complete");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = http
        .get(server.url("/api/chat/mother/history"))
        .query(&[("user", "u1")])
        .send()
        .await
        .expect("history request should complete");
    assert_eq!(response.status(), StatusCode::OK);

    let turns: Value = response.json().await.expect("history should be json");
    let turns = turns.as_array().expect("history should be an array");
    assert_eq!(turns.len(), 4);
    assert_eq!(
        turns[0].get("text").and_then(Value::as_str),
        Some("första frågan")
    );
    assert_eq!(
        turns[3].get("text").and_then(Value::as_str),
        Some("Svar två.")
    );
}

#[tokio::test]
async fn oversized_body_is_rejected_at_the_router_layer() {
    let client = ScriptedClient::new(vec![]);
    let (engine, _pool) = engine_with(client.clone()).await;
    let server = GatewayTestServer::start(engine).await;

    let huge = "x".repeat(motherhive::gateway::MAX_BODY_SIZE + 1);
    let response = reqwest::Client::new()
        .post(server.url("/api/chat/dexter"))
        .json(&serde_json::json!({"user": "u1", "message": huge}))
        .send()
        .await
        .expect("oversized request should complete");

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(client.seen().is_empty());
}
