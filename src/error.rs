//! Error types for Persona Spark
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - HTTP status mapping for the API surface
//! - User-friendly messages with suggestions
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Persona lookup errors (3xx)
    PersonaNotFound = 300,

    // Request errors (4xx)
    BadRequest = 400,
    UploadMalformed = 401,

    // Generation errors (5xx)
    GenerationUnavailable = 500,
    GenerationFormat = 501,

    // Server errors (6xx)
    ServerBind = 600,
    ServerFailed = 601,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E300")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Persona lookup errors
            400..=499 => 40, // Request errors
            500..=599 => 50, // Generation errors
            600..=699 => 60, // Server errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the service
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Persona / Request Errors
    // ─────────────────────────────────────────────────────────────

    /// Unknown persona id
    #[error("Persona not found: {id}")]
    PersonaNotFound { id: String },

    /// Empty or invalid update payload
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Multipart upload could not be read
    #[error("Malformed upload: {message}")]
    UploadMalformed { message: String },

    // ─────────────────────────────────────────────────────────────
    // Generation Errors
    // ─────────────────────────────────────────────────────────────

    /// The external generation call itself failed (transport, status, timeout)
    #[error("Generation service unavailable ({backend}): {message}")]
    GenerationUnavailable { backend: String, message: String },

    /// The generation call succeeded but its content was unusable
    #[error("Generation returned an invalid reply: {message}")]
    GenerationFormat { message: String },

    // ─────────────────────────────────────────────────────────────
    // Server Errors
    // ─────────────────────────────────────────────────────────────

    /// Could not bind the listen address
    #[error("Failed to bind {addr}")]
    ServerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server loop terminated with an error
    #[error("Server error: {0}")]
    Server(String),

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::PersonaNotFound { .. } => ErrorCode::PersonaNotFound,
            Error::BadRequest { .. } => ErrorCode::BadRequest,
            Error::UploadMalformed { .. } => ErrorCode::UploadMalformed,

            Error::GenerationUnavailable { .. } => ErrorCode::GenerationUnavailable,
            Error::GenerationFormat { .. } => ErrorCode::GenerationFormat,

            Error::ServerBind { .. } => ErrorCode::ServerBind,
            Error::Server(_) => ErrorCode::ServerFailed,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// HTTP status used when this error terminates an API request
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::PersonaNotFound { .. } => StatusCode::NOT_FOUND,
            Error::BadRequest { .. } | Error::UploadMalformed { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the failure came from the external generation service
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            Error::GenerationUnavailable { .. } | Error::GenerationFormat { .. }
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'persona-spark config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'persona-spark config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::GenerationUnavailable { .. } => Some(
                "Check the generation backend URL and API key (GOOGLE_API_KEY or OPENAI_API_KEY)."
            ),
            Error::ServerBind { .. } => Some(
                "Another process may already be using this port. Try '--port' with a different value."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a persona not found error
    pub fn persona_not_found(id: impl Into<String>) -> Self {
        Error::PersonaNotFound { id: id.into() }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    /// Create a generation transport error
    pub fn generation_unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::GenerationUnavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a generation content error
    pub fn generation_format(message: impl Into<String>) -> Self {
        Error::GenerationFormat {
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// HTTP Mapping
// ─────────────────────────────────────────────────────────────────

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.format_for_log(), "Request failed");
        } else {
            tracing::debug!(error = %self.format_for_log(), "Request rejected");
        }

        let body = serde_json::json!({
            "detail": self.to_string(),
            "code": self.code().as_str(),
        });
        (status, Json(body)).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::PersonaNotFound.as_str(), "E300");
        assert_eq!(ErrorCode::GenerationFormat.as_str(), "E501");
        assert_eq!(ErrorCode::InternalError.as_str(), "E900");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::ConfigNotFound.exit_code(), 10);
        assert_eq!(ErrorCode::IoRead.exit_code(), 20);
        assert_eq!(ErrorCode::PersonaNotFound.exit_code(), 30);
        assert_eq!(ErrorCode::GenerationUnavailable.exit_code(), 50);
        assert_eq!(ErrorCode::ServerBind.exit_code(), 60);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::persona_not_found("p1").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::bad_request("empty").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::generation_format("not json").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::generation_unavailable("gemini", "timeout").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_generation_failure_classification() {
        assert!(Error::generation_format("x").is_generation_failure());
        assert!(Error::generation_unavailable("mock", "x").is_generation_failure());
        assert!(!Error::persona_not_found("x").is_generation_failure());
        assert!(!Error::bad_request("x").is_generation_failure());
    }

    #[test]
    fn test_error_display() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/path/to/config.toml"),
            source: None,
        };
        assert!(err.to_string().contains("/path/to/config.toml"));

        let err = Error::generation_unavailable("openai", "connection refused");
        assert!(err.to_string().contains("openai"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_suggestions() {
        let err = Error::config_not_found("/test");
        assert!(err.suggestion().unwrap().contains("config init"));

        let err = Error::generation_unavailable("gemini", "401");
        assert!(err.suggestion().unwrap().contains("GOOGLE_API_KEY"));

        assert!(Error::persona_not_found("p").suggestion().is_none());
    }

    #[test]
    fn test_format_for_terminal() {
        let err = Error::config_not_found("/test/config.toml");
        let formatted = err.format_for_terminal();

        assert!(formatted.contains("E100"));
        assert!(formatted.contains("\x1b[31m"));
        assert!(formatted.contains("Hint"));
    }

    #[test]
    fn test_format_for_log() {
        let err = Error::persona_not_found("persona-1");
        let formatted = err.format_for_log();

        assert!(formatted.contains("[E300]"));
        assert!(!formatted.contains("\x1b["));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        assert_eq!(err.code(), ErrorCode::IoNotFound);
    }
}
