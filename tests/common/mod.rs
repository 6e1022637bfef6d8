//! Common test utilities and fixtures
//!
//! Spins up the real router on an ephemeral port, backed by a scriptable
//! mock generation backend.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use persona_spark::api::{self, AppState};
use persona_spark::generation::MockBackend;
use persona_spark::persona::PersonaRecord;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A running service instance
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub mock: Arc<MockBackend>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a server with an empty store
    pub async fn start() -> Self {
        let mock = Arc::new(MockBackend::new());
        let state = AppState::with_backend(mock.clone(), 3, 3);
        let app = api::router(state.clone(), &["*".to_string()]);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            mock,
            shutdown: Some(tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Insert a known persona directly into the store
    pub fn seed(&self, id: &str) -> PersonaRecord {
        let record = sample_persona(id);
        self.state.store.put(record.clone());
        record
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Persona fields as a generation backend would return them
pub fn persona_json(name: &str) -> Value {
    json!({
        "heading": "The Pragmatic Professional",
        "name": name,
        "age": 34,
        "gender": "Female",
        "occupation": "Project Manager",
        "location": "Mumbai, India",
        "background": "Manages a team at a fast-growing startup.",
        "quote": "I need reliable tools that just work.",
        "goal": "Improve team productivity.",
        "channel": "LinkedIn, industry newsletters",
        "behaviour_traits": ["Reads reviews before buying", "Values time savings"],
        "pain_points": ["Information overload", "Long onboarding"],
        "recommended_messaging": "Lead with time saved per week."
    })
}

/// A `{"personas": [...]}` reply with one entry per name
pub fn personas_reply(names: &[&str]) -> String {
    let personas: Vec<Value> = names.iter().map(|name| persona_json(name)).collect();
    json!({ "personas": personas }).to_string()
}

/// A complete stored record
pub fn sample_persona(id: &str) -> PersonaRecord {
    let mut value = persona_json("Priya Sharma");
    value["id"] = json!(id);
    value["photo_url"] = Value::Null;
    serde_json::from_value(value).unwrap()
}
