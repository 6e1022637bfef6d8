//! Generation module
//!
//! Prompt templating, the validating gateway, and the pluggable backends
//! that talk to a hosted text-generation service.

mod backend;
mod gateway;
mod gemini;
mod mock;
mod openai;
pub mod prompt;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::GenerationSettings;
use crate::error::{Error, Result};

pub use backend::{BackendKind, GenerationBackend, GenerationKind, GenerationRequest};
pub use gateway::{avatar_url, extract_json_payload, GenerationGateway};
pub use gemini::{GeminiBackend, GeminiConfig};
pub use mock::{MockBackend, MockConfig};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use prompt::PersonaInputs;

/// Build the configured generation backend.
///
/// A missing API key only logs a warning; the provider's rejection then
/// surfaces per request as `GenerationUnavailable`.
pub fn create_backend(settings: &GenerationSettings) -> Result<Arc<dyn GenerationBackend>> {
    let kind = BackendKind::parse(&settings.backend).ok_or_else(|| {
        Error::config_field_invalid(
            "generation.backend",
            format!("unknown backend '{}'", settings.backend),
        )
    })?;

    if kind != BackendKind::Mock && settings.api_key.is_empty() {
        warn!(
            backend = kind.name(),
            env = kind.api_key_env().unwrap_or_default(),
            "No API key configured; generation requests will likely be rejected"
        );
    }

    let backend: Arc<dyn GenerationBackend> = match kind {
        BackendKind::Gemini => {
            let defaults = GeminiConfig::default();
            Arc::new(GeminiBackend::new(GeminiConfig {
                base_url: settings.base_url.clone().unwrap_or(defaults.base_url),
                api_key: settings.api_key.clone(),
                model: settings.model.clone().unwrap_or(defaults.model),
                timeout_secs: settings.timeout_secs,
                temperature: settings.temperature,
            })?)
        }
        BackendKind::OpenAi => {
            let defaults = OpenAiConfig::default();
            Arc::new(OpenAiBackend::new(OpenAiConfig {
                base_url: settings.base_url.clone().unwrap_or(defaults.base_url),
                api_key: settings.api_key.clone(),
                model: settings.model.clone().unwrap_or(defaults.model),
                timeout_secs: settings.timeout_secs,
                temperature: settings.temperature,
            })?)
        }
        BackendKind::Mock => Arc::new(MockBackend::with_config(MockConfig {
            latency_ms: settings.mock.latency_ms,
            seed: settings.mock.seed,
        })),
    };

    info!(backend = backend.name(), "Generation backend ready");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_backend_by_name() {
        for (name, expected) in [("gemini", "gemini"), ("openai", "openai"), ("mock", "mock")] {
            let settings = GenerationSettings {
                backend: name.to_string(),
                ..Default::default()
            };
            assert_eq!(create_backend(&settings).unwrap().name(), expected);
        }
    }

    #[test]
    fn test_create_backend_unknown() {
        let settings = GenerationSettings {
            backend: "llama".to_string(),
            ..Default::default()
        };
        let err = create_backend(&settings).err().unwrap();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }
}
