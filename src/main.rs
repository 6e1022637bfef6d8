//! Persona Spark - AI marketing persona service
//!
//! Main entry point for the `persona-spark` binary.

use clap::Parser;
use tracing::{info, warn};

use persona_spark::api;
use persona_spark::cli::{Cli, Commands, ConfigSubcommand};
use persona_spark::config::{self, ServiceConfig};
use persona_spark::error::{Error, Result};
use persona_spark::logging;

fn main() {
    if let Err(e) = run() {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    // .env before parsing so it can supply PERSONA_SPARK_CONFIG; a missing file is normal
    let dotenv = dotenvy::dotenv();

    // Parse CLI arguments before logging, so we know verbosity
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("persona-spark {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Config { subcommand } => handle_config_command(subcommand),
        Commands::Serve {
            config,
            host,
            port,
            backend,
        } => {
            let mut config = ServiceConfig::load(config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(backend) = backend {
                config.generation.backend = backend;
            }
            config.validate()?;

            // The guards must be kept alive for the lifetime of the program
            let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

            match dotenv {
                Ok(path) => info!(path = %path.display(), "Loaded environment file"),
                Err(e) if e.not_found() => {}
                Err(e) => warn!(error = %e, "Failed to read environment file"),
            }

            info!(version = env!("CARGO_PKG_VERSION"), "Starting Persona Spark");
            run_server(config)
        }
    }
}

/// Run the server on a multi-threaded runtime until Ctrl+C
fn run_server(config: ServiceConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("persona-spark")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async move {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        };
        api::serve(&config, shutdown).await
    })
}

fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = ServiceConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg.redacted())?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration file created: {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            ServiceConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
