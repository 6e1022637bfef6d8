//! Refinement channel integration tests
//!
//! Connects real WebSocket clients with tokio-tungstenite.

mod common;

use std::time::Duration;

use common::TestServer;
use futures_util::{SinkExt, StreamExt};
use persona_spark::generation::GenerationKind;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect(server: &TestServer, client_id: &str, persona_id: &str) -> Client {
    let url = server.ws_url(&format!("/ws/refine/{}/{}", client_id, persona_id));
    let (socket, _) = connect_async(url).await.unwrap();
    socket
}

/// Next JSON text frame, or None once the server closed the socket.
async fn next_json(socket: &mut Client) -> Option<Value> {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for a frame");
        match frame {
            Some(Ok(Message::Text(text))) => return Some(serde_json::from_str(&text).unwrap()),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

async fn send_text(socket: &mut Client, text: &str) {
    socket.send(Message::Text(text.to_string())).await.unwrap();
}

#[tokio::test]
async fn test_unknown_persona_is_rejected() {
    let server = TestServer::start().await;
    let mut socket = connect(&server, "c1", "missing").await;

    assert_eq!(next_json(&mut socket).await, Some(json!({ "error": "not found" })));
    assert_eq!(next_json(&mut socket).await, None);
    assert_eq!(server.mock.total_calls(), 0);
}

#[tokio::test]
async fn test_refine_pushes_progress_then_changes() {
    let server = TestServer::start().await;
    let original = server.seed("p1");
    server.mock.push_reply(r#"{"age": 42}"#);

    let mut socket = connect(&server, "c1", "p1").await;
    send_text(&mut socket, "Make them 42 years old").await;

    assert_eq!(next_json(&mut socket).await, Some(json!({ "status": "refining" })));
    assert_eq!(
        next_json(&mut socket).await,
        Some(json!({ "status": "success", "data": { "age": 42 } }))
    );

    let stored = server.state.store.get("p1").unwrap();
    assert_eq!(stored.age, 42);
    assert_eq!(stored.name, original.name);
    assert_eq!(stored.pain_points, original.pain_points);

    socket.close(None).await.unwrap();
}

#[tokio::test]
async fn test_failure_keeps_channel_open() {
    let server = TestServer::start().await;
    server.seed("p1");
    server.mock.push_reply("not json at all");
    server.mock.push_reply(r#"{"location": "Lisbon, Portugal"}"#);

    let mut socket = connect(&server, "c1", "p1").await;

    send_text(&mut socket, "Move them somewhere sunny").await;
    assert_eq!(next_json(&mut socket).await, Some(json!({ "status": "refining" })));
    let failure = next_json(&mut socket).await.unwrap();
    assert!(failure["error"].is_string());
    assert_eq!(server.state.store.get("p1").unwrap().location, "Mumbai, India");

    send_text(&mut socket, "Move them to Lisbon").await;
    assert_eq!(next_json(&mut socket).await, Some(json!({ "status": "refining" })));
    assert_eq!(
        next_json(&mut socket).await,
        Some(json!({ "status": "success", "data": { "location": "Lisbon, Portugal" } }))
    );
    assert_eq!(server.mock.call_count(GenerationKind::RefinePersona), 2);

    socket.close(None).await.unwrap();
}

#[tokio::test]
async fn test_backend_outage_keeps_channel_open() {
    let server = TestServer::start().await;
    let original = server.seed("p1");
    server.mock.push_failure("upstream unavailable");
    server.mock.push_reply(r#"{"age": 50}"#);

    let mut socket = connect(&server, "c1", "p1").await;

    send_text(&mut socket, "Make them 50").await;
    assert_eq!(next_json(&mut socket).await, Some(json!({ "status": "refining" })));
    let failure = next_json(&mut socket).await.unwrap();
    assert!(failure["error"].as_str().unwrap().contains("upstream unavailable"));
    assert_eq!(server.state.store.get("p1").unwrap(), original);

    send_text(&mut socket, "Make them 50").await;
    assert_eq!(next_json(&mut socket).await, Some(json!({ "status": "refining" })));
    assert_eq!(
        next_json(&mut socket).await,
        Some(json!({ "status": "success", "data": { "age": 50 } }))
    );
    assert_eq!(server.state.store.get("p1").unwrap().age, 50);

    socket.close(None).await.unwrap();
}

#[tokio::test]
async fn test_refinement_sees_direct_updates() {
    let server = TestServer::start().await;
    server.seed("p1");

    let mut socket = connect(&server, "c1", "p1").await;

    // Update through HTTP while the channel is open
    reqwest::Client::new()
        .put(server.url("/api/personas/p1/refine"))
        .json(&json!({ "name": "Maya Patel" }))
        .send()
        .await
        .unwrap();

    server.mock.push_reply(r#"{"quote": "Fewer meetings, please."}"#);
    send_text(&mut socket, "Give them a sharper quote").await;
    assert_eq!(next_json(&mut socket).await, Some(json!({ "status": "refining" })));
    assert!(next_json(&mut socket).await.unwrap()["status"] == "success");

    let stored = server.state.store.get("p1").unwrap();
    assert_eq!(stored.name, "Maya Patel");
    assert_eq!(stored.quote, "Fewer meetings, please.");

    socket.close(None).await.unwrap();
}

#[tokio::test]
async fn test_reconnect_supersedes_previous_connection() {
    let server = TestServer::start().await;
    server.seed("p1");

    let mut first = connect(&server, "c1", "p1").await;
    // A blank instruction round-trips without a generation call and
    // proves the connection is registered
    send_text(&mut first, "   ").await;
    assert_eq!(next_json(&mut first).await, Some(json!({ "error": "empty instruction" })));

    let mut second = connect(&server, "c1", "p1").await;
    send_text(&mut second, "   ").await;
    assert_eq!(next_json(&mut second).await, Some(json!({ "error": "empty instruction" })));

    // The older socket is closed by the server
    assert_eq!(next_json(&mut first).await, None);
    assert_eq!(server.state.channels.connection_count(), 1);
    assert!(server.state.channels.is_connected("c1"));

    second.close(None).await.unwrap();
}

#[tokio::test]
async fn test_disconnect_unregisters_client() {
    let server = TestServer::start().await;
    server.seed("p1");

    let mut socket = connect(&server, "c9", "p1").await;
    send_text(&mut socket, "").await;
    assert_eq!(next_json(&mut socket).await, Some(json!({ "error": "empty instruction" })));
    assert!(server.state.channels.is_connected("c9"));

    socket.close(None).await.unwrap();

    let mut waited = Duration::ZERO;
    while server.state.channels.is_connected("c9") && waited < RECV_TIMEOUT {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
    assert!(!server.state.channels.is_connected("c9"));
}
