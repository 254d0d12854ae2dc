//! `qrboard` - CLI and web server for a dynamic QR code
//!
//! Serves the admin and visitor pages, and manages the stored content and the
//! QR image from the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use qrboard::cli::{Cli, Command, ConfigCommand, ContentCommand, QrCommand, ServeCommand};
use qrboard::{init_logging, open_store, AppState, Config, QrEncoder, StoreBackend};
use tracing::warn;

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(load_config(cli.config)?, &serve_cmd),
        Command::Content(content_cmd) => handle_content(&load_config(cli.config)?, content_cmd),
        Command::Qr(qr_cmd) => handle_qr(&load_config(cli.config)?, qr_cmd),
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    Config::load_from(path).context("failed to load configuration")
}

fn handle_serve(mut config: Config, cmd: &ServeCommand) -> Result<()> {
    cmd.apply(&mut config);
    config.validate().context("invalid server overrides")?;

    let store = open_store(&config).context("failed to open content store")?;
    let state = Arc::new(AppState::new(config, store)?);

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(qrboard::server::serve(state))?;
    Ok(())
}

fn handle_content(config: &Config, cmd: ContentCommand) -> Result<()> {
    let store = open_store(config).context("failed to open content store")?;
    if store.backend() == StoreBackend::Ephemeral && !matches!(cmd, ContentCommand::Show { .. }) {
        warn!("The ephemeral store is discarded when this command exits");
    }

    match cmd {
        ContentCommand::Show { json } => {
            let record = store.read();
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("Title:    {}", record.title);
                println!("Message:  {}", record.message);
                if let Some(updated_at) = record.updated_at {
                    println!("Updated:  {}", updated_at.to_rfc3339());
                }
                println!("Storage:  {}", store.backend());
            }
        }
        ContentCommand::Set { title, message } => {
            let record = store.write(&title, &message)?;
            println!("Content updated: {}", record.title);
        }
        ContentCommand::Reset => {
            let record = store.reset()?;
            println!("Content reset to defaults: {}", record.title);
        }
    }
    Ok(())
}

fn handle_qr(config: &Config, cmd: QrCommand) -> Result<()> {
    let encoder = QrEncoder::from_config(config)?;

    match cmd {
        QrCommand::Url => println!("{}", encoder.target_url()),
        QrCommand::Export { output } => {
            let png = encoder.png()?;
            std::fs::write(&output, &png)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!(
                "Wrote QR code for {} to {}",
                encoder.target_url(),
                output.display()
            );
        }
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Listen address:     {}:{}", config.server.host, config.server.port);
                println!("  Base URL:           {}", config.server.base_url);
                println!("  Request timeout:    {}s", config.server.request_timeout_secs);
                println!("  Max body size:      {} bytes", config.server.max_body_size);
                println!();
                println!("[Storage]");
                println!("  Backend:            {}", config.storage.backend);
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Content]");
                println!("  Default title:      {}", config.content.default_title);
                println!("  Default message:    {}", config.content.default_message);
                println!();
                println!("[QR]");
                println!("  Module size:        {}px", config.qr.module_size);
                println!("  Minimum version:    {}", config.qr.min_version);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
