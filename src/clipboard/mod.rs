//! Clipboard access — copy text through a transient platform resource.
//!
//! Every provider acquires something short-lived for each call (an
//! arboard handle, an `xclip` child process), writes the payload and
//! releases it before returning, on success and on failure alike.
//! Failures are reported to the caller; nothing is swallowed.

mod command;
mod system;

use std::fmt;

use serde::Deserialize;

pub use command::CommandClipboard;
pub use system::SystemClipboard;

/// Errors returned by clipboard providers.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// The platform clipboard could not be opened.
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to write clipboard: {0}")]
    Write(String),

    /// The helper process ran but reported failure.
    #[error("{program} exited with {status}")]
    Exit { program: String, status: String },

    #[error("failed to read clipboard: {0}")]
    Read(String),
}

/// Reads and writes the system clipboard.
///
/// `Send + Sync` so a provider can be moved onto a blocking task.
pub trait ClipboardProvider: Send + Sync {
    /// Replace the clipboard content with `text`.
    fn write(&self, text: &str) -> Result<(), ClipboardError>;

    /// Read the current clipboard content as text.
    fn read(&self) -> Result<String, ClipboardError>;
}

/// Which provider the CLI should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardBackend {
    /// Native clipboard API (arboard).
    #[default]
    System,
    /// External helper process (`xclip` unless configured otherwise).
    Command,
}

impl fmt::Display for ClipboardBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Command => f.write_str("command"),
        }
    }
}

/// Copy `text` to the clipboard.
///
/// The empty string is a valid payload and clears the clipboard text.
pub fn copy_to_clipboard(provider: &dyn ClipboardProvider, text: &str) -> Result<(), ClipboardError> {
    match provider.write(text) {
        Ok(()) => {
            tracing::debug!(bytes = text.len(), "copied to clipboard");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(error = %e, "clipboard copy failed");
            Err(e)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{ClipboardError, ClipboardProvider};

    /// In-process clipboard; `failing` rejects every write.
    #[derive(Default)]
    pub struct MemoryClipboard {
        pub content: Mutex<Option<String>>,
        pub failing: bool,
    }

    impl ClipboardProvider for MemoryClipboard {
        fn write(&self, text: &str) -> Result<(), ClipboardError> {
            if self.failing {
                return Err(ClipboardError::Write("rejected".into()));
            }
            *self.content.lock().unwrap() = Some(text.to_string());
            Ok(())
        }

        fn read(&self) -> Result<String, ClipboardError> {
            self.content
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ClipboardError::Read("empty".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryClipboard;
    use super::*;

    #[test]
    fn copy_then_read_returns_exact_text() {
        let clipboard = MemoryClipboard::default();
        copy_to_clipboard(&clipboard, "hello").unwrap();
        assert_eq!(clipboard.read().unwrap(), "hello");
    }

    #[test]
    fn empty_string_is_copied() {
        let clipboard = MemoryClipboard::default();
        copy_to_clipboard(&clipboard, "").unwrap();
        assert_eq!(clipboard.read().unwrap(), "");
    }

    #[test]
    fn later_copy_replaces_earlier() {
        let clipboard = MemoryClipboard::default();
        copy_to_clipboard(&clipboard, "first").unwrap();
        copy_to_clipboard(&clipboard, "second").unwrap();
        assert_eq!(clipboard.read().unwrap(), "second");
    }

    #[test]
    fn failure_is_reported() {
        let clipboard = MemoryClipboard {
            failing: true,
            ..Default::default()
        };
        let err = copy_to_clipboard(&clipboard, "hello").unwrap_err();
        assert!(matches!(err, ClipboardError::Write(_)));
    }

    #[test]
    fn backend_display_matches_config_names() {
        assert_eq!(ClipboardBackend::System.to_string(), "system");
        assert_eq!(ClipboardBackend::Command.to_string(), "command");
    }
}
