//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::Config;
use crate::qr::DOWNLOAD_FILE_NAME;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Interface to bind (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    /// Apply command-line overrides to a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

/// Content commands.
#[derive(Debug, Subcommand)]
pub enum ContentCommand {
    /// Show the current record
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Replace the current record
    Set {
        /// New title
        #[arg(short, long)]
        title: String,

        /// New message
        #[arg(short, long)]
        message: String,
    },

    /// Restore the configured default record
    Reset,
}

/// QR code commands.
#[derive(Debug, Subcommand)]
pub enum QrCommand {
    /// Print the URL encoded into the QR code
    Url,

    /// Write the QR code as a PNG file
    Export {
        /// Output file
        #[arg(short, long, default_value = DOWNLOAD_FILE_NAME)]
        output: PathBuf,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
