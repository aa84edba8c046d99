//! CLI argument parsing and command routing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// TalkForge: streaming chat client
#[derive(Debug, Parser)]
#[command(name = "talkforge")]
#[command(about = "Streaming chat client for a TalkForge server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "TALKFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server base URL (overrides config and environment)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Submit content to a session and stream the reply
    Submit {
        /// Session to submit to
        session_id: String,

        /// The content to submit
        content: String,

        /// Print parsed deltas as JSON lines instead of the message
        #[arg(long)]
        raw: bool,

        /// Fetch the server-processed message after the stream ends
        #[arg(long)]
        post_process: bool,
    },

    /// Show configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,

        /// Print the config file path
        #[arg(long)]
        path: bool,
    },

    /// Show version information
    Version,
}

impl Cli {
    /// Parse CLI arguments from environment
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit() {
        let cli = Cli::parse_from(["talkforge", "-v", "submit", "s-1", "hello there", "--raw"]);
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Submit {
                session_id,
                content,
                raw,
                post_process,
            }) => {
                assert_eq!(session_id, "s-1");
                assert_eq!(content, "hello there");
                assert!(raw);
                assert!(!post_process);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_base_url_after_subcommand() {
        let cli = Cli::parse_from(["talkforge", "config", "--show", "--base-url", "http://h:1"]);
        assert_eq!(cli.base_url.as_deref(), Some("http://h:1"));
        assert!(matches!(
            cli.command,
            Some(Commands::Config { show: true, path: false })
        ));
    }

    #[test]
    fn test_command_is_optional() {
        let cli = Cli::parse_from(["talkforge"]);
        assert!(cli.command.is_none());
    }
}
