//! Command-line interface for qrboard.
//!
//! This module provides the CLI structure for the `qrboard` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, ContentCommand, QrCommand, ServeCommand};

/// qrboard - One printed QR code, content you can change any time
///
/// Serves an admin page for editing a title and message, and a mobile page
/// that shows them to anyone who scans the QR code.
#[derive(Debug, Parser)]
#[command(name = "qrboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web server
    Serve(ServeCommand),

    /// Read or change the stored content
    #[command(subcommand)]
    Content(ContentCommand),

    /// Inspect or export the QR code
    #[command(subcommand)]
    Qr(QrCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "qrboard");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["qrboard", "-q", "qr", "url"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["qrboard", "qr", "url"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["qrboard", "-v", "qr", "url"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["qrboard", "-vv", "qr", "url"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_serve() {
        let cli = parse(&["qrboard", "serve", "--host", "0.0.0.0", "--port", "9000"]);
        match cli.command {
            Command::Serve(cmd) => {
                assert_eq!(cmd.host.as_deref(), Some("0.0.0.0"));
                assert_eq!(cmd.port, Some(9000));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_content_set() {
        let cli = parse(&[
            "qrboard", "content", "set", "--title", "Sale", "--message", "50% off today",
        ]);
        match cli.command {
            Command::Content(ContentCommand::Set { title, message }) => {
                assert_eq!(title, "Sale");
                assert_eq!(message, "50% off today");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_content_set_requires_both_fields() {
        assert!(Cli::try_parse_from(["qrboard", "content", "set", "--title", "Sale"]).is_err());
    }

    #[test]
    fn test_parse_content_show_json() {
        let cli = parse(&["qrboard", "content", "show", "--json"]);
        assert!(matches!(
            cli.command,
            Command::Content(ContentCommand::Show { json: true })
        ));
    }

    #[test]
    fn test_parse_qr_export_default_output() {
        let cli = parse(&["qrboard", "qr", "export"]);
        match cli.command {
            Command::Qr(QrCommand::Export { output }) => {
                assert_eq!(output, PathBuf::from("qr_code.png"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_validate_file() {
        let cli = parse(&["qrboard", "config", "validate", "--file", "/tmp/q.toml"]);
        match cli.command {
            Command::Config(ConfigCommand::Validate { file }) => {
                assert_eq!(file, Some(PathBuf::from("/tmp/q.toml")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["qrboard", "-c", "/custom/config.toml", "config", "path"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
