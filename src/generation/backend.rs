//! Generation backend trait definitions
//!
//! A backend is a single request/response call to a text-generation
//! service. It returns the raw reply text; parsing and schema checks live
//! in the gateway so every backend is held to the same rules.

use async_trait::async_trait;

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Backend Kind
// ─────────────────────────────────────────────────────────────────

/// Supported generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Google Generative Language API
    Gemini,
    /// Any OpenAI-compatible chat completions endpoint
    OpenAi,
    /// Offline generator (for tests and demos)
    Mock,
}

impl BackendKind {
    /// Get all backend kinds
    pub fn all() -> &'static [BackendKind] {
        &[BackendKind::Gemini, BackendKind::OpenAi, BackendKind::Mock]
    }

    /// Get the backend name
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Gemini => "gemini",
            BackendKind::OpenAi => "openai",
            BackendKind::Mock => "mock",
        }
    }

    /// Parse from a configuration string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(BackendKind::Gemini),
            "openai" | "openai-compatible" => Some(BackendKind::OpenAi),
            "mock" => Some(BackendKind::Mock),
            _ => None,
        }
    }

    /// Environment variable conventionally holding this provider's key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            BackendKind::Gemini => Some("GOOGLE_API_KEY"),
            BackendKind::OpenAi => Some("OPENAI_API_KEY"),
            BackendKind::Mock => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Generation Request
// ─────────────────────────────────────────────────────────────────

/// The logical operation a generation call serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationKind {
    CreatePersonas,
    RefinePersona,
    GenerateCampaigns,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::CreatePersonas => "create_personas",
            GenerationKind::RefinePersona => "refine_persona",
            GenerationKind::GenerateCampaigns => "generate_campaigns",
        }
    }
}

/// One call to the generation service
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Which operation this call serves
    pub kind: GenerationKind,

    /// Full instruction text sent to the model
    pub prompt: String,

    /// Structured inputs the prompt was built from. Remote providers
    /// ignore it; the mock backend reads it to shape its reply.
    pub context: serde_json::Value,
}

impl GenerationRequest {
    pub fn new(kind: GenerationKind, prompt: String, context: serde_json::Value) -> Self {
        Self {
            kind,
            prompt,
            context,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// GenerationBackend Trait
// ─────────────────────────────────────────────────────────────────

/// Core trait for generation backends
///
/// Implementations make exactly one call per request and never retry.
/// Transport failures, non-success statuses, timeouts and unreadable
/// provider envelopes are all reported as `GenerationUnavailable`.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Get the backend name (e.g., "gemini", "openai", "mock")
    fn name(&self) -> &'static str;

    /// Send the request and return the model's reply text
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(BackendKind::parse("gemini"), Some(BackendKind::Gemini));
        assert_eq!(BackendKind::parse(" OpenAI "), Some(BackendKind::OpenAi));
        assert_eq!(BackendKind::parse("mock"), Some(BackendKind::Mock));
        assert_eq!(BackendKind::parse("llama"), None);
    }

    #[test]
    fn test_backend_kind_names_round_trip() {
        for kind in BackendKind::all() {
            assert_eq!(BackendKind::parse(kind.name()), Some(*kind));
        }
    }

    #[test]
    fn test_api_key_env() {
        assert_eq!(BackendKind::Gemini.api_key_env(), Some("GOOGLE_API_KEY"));
        assert_eq!(BackendKind::OpenAi.api_key_env(), Some("OPENAI_API_KEY"));
        assert_eq!(BackendKind::Mock.api_key_env(), None);
    }
}
