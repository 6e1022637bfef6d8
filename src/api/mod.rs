//! HTTP surface
//!
//! Router, shared state and server startup. Handlers live in
//! [`routes`]; the WebSocket refinement channel lives in [`channel`].

pub mod channel;
pub mod routes;

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::generation::{create_backend, GenerationBackend, GenerationGateway};
use crate::persona::{InMemoryPersonaStore, PersonaStore};

pub use channel::{ChannelMessage, ChannelRegistry, Inbound, SessionOutcome};

/// Upload cap for the persona creation form
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

// ─────────────────────────────────────────────────────────────────
// Shared State
// ─────────────────────────────────────────────────────────────────

/// Handles shared by every request and channel session
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PersonaStore>,
    pub gateway: Arc<GenerationGateway>,
    pub channels: Arc<ChannelRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn PersonaStore>, gateway: Arc<GenerationGateway>) -> Self {
        Self {
            store,
            gateway,
            channels: Arc::new(ChannelRegistry::new()),
        }
    }

    /// Empty in-memory store in front of the given backend
    pub fn with_backend(
        backend: Arc<dyn GenerationBackend>,
        persona_count: usize,
        campaign_count: usize,
    ) -> Self {
        let gateway = GenerationGateway::new(backend, persona_count, campaign_count);
        Self::new(Arc::new(InMemoryPersonaStore::new()), Arc::new(gateway))
    }

    /// Build state from configuration
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let backend = create_backend(&config.generation)?;
        Ok(Self::with_backend(
            backend,
            config.personas.persona_count,
            config.personas.campaign_count,
        ))
    }
}

// ─────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────

/// Create the service router
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route(
            "/api/generate-personas",
            post(routes::create_personas).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/personas", get(routes::list_personas))
        .route("/api/personas/{id}", get(routes::get_persona))
        .route("/api/personas/{id}/refine", put(routes::refine_persona))
        .route(
            "/api/personas/{id}/generate-campaigns",
            get(routes::generate_campaigns),
        )
        .route("/ws/refine/{client_id}/{persona_id}", get(routes::refine_stream))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

// ─────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn serve<F>(config: &ServiceConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::from_config(config)?;
    let app = router(state, &config.server.cors_allow_origins);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::ServerBind {
            addr: addr.clone(),
            source: e,
        })?;

    let local = listener.local_addr().map_err(Error::Io)?;
    info!(addr = %local, backend = %config.generation.backend, "Persona Spark listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Server(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::generation::MockBackend;

    /// State backed by a scriptable mock, plus a handle to that mock
    pub(crate) fn test_state() -> (AppState, Arc<MockBackend>) {
        let mock = Arc::new(MockBackend::new());
        (AppState::with_backend(mock.clone(), 3, 3), mock)
    }

    #[test]
    fn test_state_starts_empty() {
        let (state, _) = test_state();
        assert!(state.store.is_empty());
        assert_eq!(state.channels.connection_count(), 0);
        assert_eq!(state.gateway.backend_name(), "mock");
    }

    #[test]
    fn test_from_config_uses_configured_backend() {
        let mut config = ServiceConfig::default();
        config.generation.backend = "mock".to_string();
        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.gateway.backend_name(), "mock");
    }
}
