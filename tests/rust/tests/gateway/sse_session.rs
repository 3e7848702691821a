//! SSE sessions driven through the MCP handshake

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tests::{SseEvents, TestGateway};
use toolgate_core::SessionId;

use super::{authority, ready_gateway};

struct Client {
    http: reqwest::Client,
    events: SseEvents,
    session_id: String,
    post_url: String,
}

impl Client {
    async fn connect(gateway: &TestGateway) -> Self {
        let http = reqwest::Client::new();
        let response = http.get(gateway.url("/mcp")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .starts_with("text/event-stream"));
        let session_id = response
            .headers()
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
            .expect("session id header")
            .to_string();

        let mut events = SseEvents::new(response);
        let endpoint = events.next_event().await.expect("endpoint event");
        assert_eq!(endpoint.event, "endpoint");
        assert_eq!(endpoint.data, format!("/mcp?sessionId={}", session_id));

        Self {
            http,
            events,
            session_id,
            post_url: gateway.url(&endpoint.data),
        }
    }

    async fn post(&self, message: Value) -> reqwest::Response {
        self.http
            .post(&self.post_url)
            .header("content-type", "application/json")
            .body(message.to_string())
            .send()
            .await
            .unwrap()
    }

    async fn request(&mut self, id: u64, method: &str, params: Value) -> Value {
        let response = self
            .post(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "Accepted");

        let reply = self.events.next_message().await;
        assert_eq!(reply["id"], json!(id));
        reply
    }

    async fn initialize(&mut self) -> Value {
        let reply = self
            .request(
                1,
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "integration-test", "version": "0.0.1"}
                }),
            )
            .await;
        let response = self
            .post(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        reply
    }
}

async fn wait_until_empty(gateway: &TestGateway) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !gateway.registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("session was never removed");
}

#[tokio::test]
async fn test_handshake_and_tool_call_over_sse() {
    let authority = authority().await;
    let gateway = ready_gateway(&authority).await;
    let mut client = Client::connect(&gateway).await;
    assert_eq!(gateway.registry.len(), 1);

    let init = client.initialize().await;
    assert_eq!(init["result"]["serverInfo"]["name"], "toolgate");
    assert!(init["result"]["capabilities"]["tools"].is_object());

    let tools = client.request(2, "tools/list", json!({})).await;
    let names: Vec<&str> = tools["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, vec!["session_info"]);

    let call = client
        .request(3, "tools/call", json!({"name": "session_info", "arguments": {}}))
        .await;
    assert_eq!(call["result"]["isError"], json!(false));
    let text = call["result"]["content"][0]["text"].as_str().unwrap();
    let info: Value = serde_json::from_str(text).unwrap();
    assert_eq!(info["sessionId"], client.session_id.as_str());
    assert_eq!(info["transport"], "sse");
    assert_eq!(info["trustModel"], "service");

    let call = client
        .request(4, "tools/call", json!({"name": "no_such_tool", "arguments": {}}))
        .await;
    assert_eq!(call["result"]["isError"], json!(true));

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_invalid_json_is_rejected() {
    let authority = authority().await;
    let gateway = ready_gateway(&authority).await;
    let client = Client::connect(&gateway).await;

    let response = client
        .http
        .post(&client.post_url)
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(gateway.registry.len(), 1);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let authority = authority().await;
    let gateway = ready_gateway(&authority).await;
    let mut first = Client::connect(&gateway).await;
    let mut second = Client::connect(&gateway).await;
    assert_ne!(first.session_id, second.session_id);
    assert_eq!(gateway.registry.len(), 2);

    first.initialize().await;
    second.initialize().await;

    for client in [&mut first, &mut second] {
        let call = client
            .request(7, "tools/call", json!({"name": "session_info", "arguments": {}}))
            .await;
        let text = call["result"]["content"][0]["text"].as_str().unwrap();
        let info: Value = serde_json::from_str(text).unwrap();
        assert_eq!(info["sessionId"], client.session_id.as_str());
    }

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_server_side_close_ends_stream_and_unregisters() {
    let authority = authority().await;
    let gateway = ready_gateway(&authority).await;
    let mut client = Client::connect(&gateway).await;

    let session = gateway
        .registry
        .lookup(&SessionId::from(client.session_id.as_str()))
        .unwrap();
    assert!(session.close());
    assert!(!session.close());

    assert_eq!(client.events.next_event().await, None);
    assert!(gateway.registry.is_empty());

    let response = client
        .post(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_client_disconnect_unregisters() {
    let authority = authority().await;
    let gateway = ready_gateway(&authority).await;
    let client = Client::connect(&gateway).await;
    assert_eq!(gateway.registry.len(), 1);

    client.events.disconnect();
    wait_until_empty(&gateway).await;

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_open_streams() {
    let authority = authority().await;
    let gateway = ready_gateway(&authority).await;
    let mut client = Client::connect(&gateway).await;

    let registry = gateway.registry.clone();
    gateway.stop().await.unwrap();

    assert!(registry.is_empty());
    assert_eq!(client.events.next_event().await, None);
}
