use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::clipboard::ClipboardBackend;

#[derive(Parser)]
#[command(name = "sockclip", about = "Shared WebSocket connection and clipboard helpers")]
pub struct Cli {
    /// Settings file (default: $XDG_CONFIG_HOME/sockclip/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Open the shared WebSocket connection and report its state
    Connect {
        /// Full WebSocket address, used as given
        #[arg(long, conflicts_with = "host")]
        url: Option<String>,

        /// Host for ws://<host>:9123/ws
        #[arg(long)]
        host: Option<String>,

        /// Text frame to send once connected (repeatable)
        #[arg(long = "send", value_name = "TEXT")]
        send: Vec<String>,

        /// Keep the connection open until the peer closes it or a signal arrives
        #[arg(long)]
        hold: bool,
    },

    /// Copy text to the clipboard
    Copy {
        /// Text to copy; read from stdin when omitted
        text: Option<String>,

        /// Clipboard provider
        #[arg(long, value_enum)]
        backend: Option<ClipboardBackend>,
    },

    /// Print the clipboard contents
    Paste {
        /// Clipboard provider
        #[arg(long, value_enum)]
        backend: Option<ClipboardBackend>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_defaults() {
        let cli = Cli::try_parse_from(["sockclip", "connect"]).unwrap();
        assert!(cli.config.is_none());
        match cli.command {
            Command::Connect {
                url,
                host,
                send,
                hold,
            } => {
                assert!(url.is_none());
                assert!(host.is_none());
                assert!(send.is_empty());
                assert!(!hold);
            }
            _ => panic!("expected connect"),
        }
    }

    #[test]
    fn send_is_repeatable() {
        let cli = Cli::try_parse_from([
            "sockclip", "connect", "--send", "a", "--send", "b", "--hold",
        ])
        .unwrap();
        match cli.command {
            Command::Connect { send, hold, .. } => {
                assert_eq!(send, ["a", "b"]);
                assert!(hold);
            }
            _ => panic!("expected connect"),
        }
    }

    #[test]
    fn url_and_host_conflict() {
        let result = Cli::try_parse_from([
            "sockclip", "connect", "--url", "ws://a/ws", "--host", "b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn copy_accepts_empty_text_and_backend() {
        let cli =
            Cli::try_parse_from(["sockclip", "copy", "", "--backend", "command"]).unwrap();
        match cli.command {
            Command::Copy { text, backend } => {
                assert_eq!(text.as_deref(), Some(""));
                assert_eq!(backend, Some(ClipboardBackend::Command));
            }
            _ => panic!("expected copy"),
        }
    }

    #[test]
    fn global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["sockclip", "paste", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
