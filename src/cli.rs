//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the Persona Spark service.

use clap::{Parser, Subcommand};

/// Persona Spark - AI marketing persona service
///
/// Generates marketing personas and campaign ideas from survey data,
/// customer reviews and a product positioning statement, and lets clients
/// refine personas live over a WebSocket channel.
#[derive(Parser, Debug)]
#[command(name = "persona-spark")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP and WebSocket server
    Serve {
        /// Path to configuration file
        #[arg(short, long, env = "PERSONA_SPARK_CONFIG")]
        config: Option<String>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,

        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the generation backend (gemini, openai, mock)
        #[arg(short, long)]
        backend: Option<String>,
    },

    /// Display version information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration (API key masked)
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // Verifies that the CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::parse_from(["persona-spark", "serve"]);
        match cli.command {
            Commands::Serve {
                config,
                host,
                port,
                backend,
            } => {
                assert!(config.is_none());
                assert!(host.is_none());
                assert!(port.is_none());
                assert!(backend.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_serve_with_overrides() {
        let cli = Cli::parse_from([
            "persona-spark",
            "serve",
            "--config",
            "/path/to/config.toml",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--backend",
            "mock",
        ]);
        match cli.command {
            Commands::Serve {
                config,
                host,
                port,
                backend,
            } => {
                assert_eq!(config, Some("/path/to/config.toml".to_string()));
                assert_eq!(host, Some("0.0.0.0".to_string()));
                assert_eq!(port, Some(9000));
                assert_eq!(backend, Some("mock".to_string()));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = Cli::try_parse_from(["persona-spark", "serve", "--port", "99999"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["persona-spark", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["persona-spark", "--quiet", "version"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_show() {
        let cli = Cli::parse_from(["persona-spark", "config", "show"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Show { config },
            } => {
                assert!(config.is_none());
            }
            _ => panic!("Expected Config Show command"),
        }
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["persona-spark", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
