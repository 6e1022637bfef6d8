//! Configuration system for Persona Spark
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (PERSONA_SPARK_* prefix, plus provider key fallbacks)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::generation::BackendKind;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP listener settings
    pub server: ServerSettings,

    /// Generation provider settings
    pub generation: GenerationSettings,

    /// Persona batch settings
    pub personas: PersonaSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Origins allowed by CORS ("*" = any)
    pub cors_allow_origins: Vec<String>,
}

/// Generation provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Backend: gemini, openai, mock
    pub backend: String,

    /// API base URL (provider default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key (falls back to GOOGLE_API_KEY / OPENAI_API_KEY)
    pub api_key: String,

    /// Model identifier (provider default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature (provider default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Offline mock backend settings
    pub mock: MockSettings,
}

/// Mock backend settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MockSettings {
    /// Simulated latency per call in milliseconds
    pub latency_ms: u64,

    /// Fixed RNG seed for reproducible output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Persona batch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaSettings {
    /// Personas requested per creation call
    pub persona_count: usize,

    /// Campaign ideas requested per persona
    pub campaign_count: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allow_origins: vec!["*".to_string()],
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            backend: "gemini".to_string(),
            base_url: None,
            api_key: String::new(),
            model: None,
            timeout_secs: 120,
            temperature: None,
            mock: MockSettings::default(),
        }
    }
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            persona_count: 3,
            campaign_count: 3,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            config = Self::from_file(&path)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        // Search in standard locations
        let search_paths = [
            // Current directory
            PathBuf::from("persona-spark.toml"),
            PathBuf::from("config.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("persona-spark").join("config.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".persona-spark").join("config.toml"))
                .unwrap_or_default(),
            // System config (Linux)
            PathBuf::from("/etc/persona-spark/config.toml"),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server settings
        if let Some(val) = lookup("PERSONA_SPARK_HOST") {
            self.server.host = val;
        }
        if let Some(n) = lookup("PERSONA_SPARK_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = n;
        }
        if let Some(val) = lookup("PERSONA_SPARK_CORS_ORIGINS") {
            self.server.cors_allow_origins = val
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }

        // Generation settings
        if let Some(val) = lookup("PERSONA_SPARK_BACKEND") {
            self.generation.backend = val;
        }
        if let Some(val) = lookup("PERSONA_SPARK_BASE_URL") {
            self.generation.base_url = Some(val);
        }
        if let Some(val) = lookup("PERSONA_SPARK_API_KEY") {
            self.generation.api_key = val;
        }
        if let Some(val) = lookup("PERSONA_SPARK_MODEL") {
            self.generation.model = Some(val);
        }
        if let Some(n) = lookup("PERSONA_SPARK_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.generation.timeout_secs = n;
        }
        if let Some(t) = lookup("PERSONA_SPARK_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.generation.temperature = Some(t);
        }
        if let Some(n) = lookup("PERSONA_SPARK_MOCK_LATENCY_MS").and_then(|v| v.parse().ok()) {
            self.generation.mock.latency_ms = n;
        }
        if let Some(n) = lookup("PERSONA_SPARK_MOCK_SEED").and_then(|v| v.parse().ok()) {
            self.generation.mock.seed = Some(n);
        }

        // Provider key fallback
        if self.generation.api_key.is_empty() {
            let provider_var = BackendKind::parse(&self.generation.backend)
                .and_then(|kind| kind.api_key_env());
            if let Some(key) = provider_var.and_then(|var| lookup(var)) {
                self.generation.api_key = key;
            }
        }

        // Persona settings
        if let Some(n) = lookup("PERSONA_SPARK_PERSONA_COUNT").and_then(|v| v.parse().ok()) {
            self.personas.persona_count = n;
        }
        if let Some(n) = lookup("PERSONA_SPARK_CAMPAIGN_COUNT").and_then(|v| v.parse().ok()) {
            self.personas.campaign_count = n;
        }

        // Logging settings
        if let Some(val) = lookup("PERSONA_SPARK_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("PERSONA_SPARK_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = lookup("PERSONA_SPARK_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::config_field_invalid("server.host", "host cannot be empty"));
        }

        if BackendKind::parse(&self.generation.backend).is_none() {
            let names: Vec<_> = BackendKind::all().iter().map(|k| k.name()).collect();
            return Err(Error::config_field_invalid(
                "generation.backend",
                format!(
                    "Invalid backend '{}'. Must be one of: {}",
                    self.generation.backend,
                    names.join(", ")
                ),
            ));
        }

        if let Some(ref base_url) = self.generation.base_url {
            let parsed = url::Url::parse(base_url).map_err(|e| {
                Error::config_field_invalid(
                    "generation.base_url",
                    format!("Invalid base URL '{}': {}", base_url, e),
                )
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(Error::config_field_invalid(
                    "generation.base_url",
                    "base URL must start with http:// or https://",
                ));
            }
        }

        if self.generation.timeout_secs == 0 {
            return Err(Error::config_field_invalid(
                "generation.timeout_secs",
                "timeout_secs must be greater than 0",
            ));
        }

        if !(1..=10).contains(&self.personas.persona_count) {
            return Err(Error::config_field_invalid(
                "personas.persona_count",
                "persona_count must be between 1 and 10",
            ));
        }
        if !(1..=10).contains(&self.personas.campaign_count) {
            return Err(Error::config_field_invalid(
                "personas.campaign_count",
                "campaign_count must be between 1 and 10",
            ));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Listen address as "host:port"
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Copy safe to print: the API key is masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.generation.api_key.is_empty() {
            copy.generation.api_key = "********".to_string();
        }
        copy
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location used by `config init`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".persona-spark")
        .join("config.toml")
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    // Check if file exists
    if config_path.exists() && !force {
        return Err(Error::ConfigValidation {
            message: format!(
                "Configuration file already exists: {}. Use --force to overwrite.",
                config_path.display()
            ),
            field: None,
        });
    }

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# Persona Spark Configuration

[server]
# Bind address
host = "127.0.0.1"

# Listen port
port = 8000

# Origins allowed by CORS ("*" = any)
cors_allow_origins = ["*"]

[generation]
# Backend: gemini, openai, mock
backend = "gemini"

# API base URL (comment out for the provider default)
# base_url = "https://generativelanguage.googleapis.com/v1beta"

# API key (leave empty to use GOOGLE_API_KEY or OPENAI_API_KEY)
api_key = ""

# Model identifier (comment out for the provider default)
# model = "gemini-1.5-flash-latest"

# Request timeout in seconds
timeout_secs = 120

# Sampling temperature (comment out for the provider default)
# temperature = 0.9

[generation.mock]
# Simulated latency per call in milliseconds
latency_ms = 0

# Fixed RNG seed for reproducible output
# seed = 42

[personas]
# Personas requested per creation call (1-10)
persona_count = 3

# Campaign ideas requested per persona (1-10)
campaign_count = 3

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.persona-spark/logs/persona-spark.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
