//! Settings file and command-line overrides.
//!
//! Settings live in `$XDG_CONFIG_HOME/sockclip/config.toml` unless
//! `--config` names another file. A missing default file means
//! built-in defaults; a missing `--config` file is an error.
//!
//! ```toml
//! websocket_url = "ws://game.example.org:9123/ws"  # wins over `host`
//! host = "game.example.org"
//! clipboard = "command"
//!
//! [clipboard_command]
//! program = "xclip"
//! write_args = ["-selection", "clipboard"]
//! read_args = ["-selection", "clipboard", "-o"]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::clipboard::{ClipboardBackend, ClipboardProvider, CommandClipboard, SystemClipboard};
use crate::connection::ConnectionTarget;

/// Host used for the derived target when nothing else is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Contents of the settings file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Full WebSocket address; when set, `host` is ignored.
    pub websocket_url: Option<String>,
    /// Host for the derived `ws://<host>:9123/ws` target.
    pub host: Option<String>,
    pub clipboard: ClipboardBackend,
    pub clipboard_command: CommandClipboard,
}

impl Settings {
    /// Load settings from `explicit`, or from the default location.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::from_file(path)
            }
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Pick the connection target.
    ///
    /// Precedence: `url` flag, `host` flag, `websocket_url` setting,
    /// `host` setting, then [`DEFAULT_HOST`].
    pub fn target(&self, url: Option<&str>, host: Option<&str>) -> ConnectionTarget {
        if let Some(url) = url {
            return ConnectionTarget::explicit(url);
        }
        if let Some(host) = host {
            return ConnectionTarget::host(host);
        }
        if let Some(url) = &self.websocket_url {
            return ConnectionTarget::explicit(url.as_str());
        }
        ConnectionTarget::host(self.host.as_deref().unwrap_or(DEFAULT_HOST))
    }

    /// Build the clipboard provider, `backend` overriding the setting.
    pub fn clipboard_provider(
        &self,
        backend: Option<ClipboardBackend>,
    ) -> Arc<dyn ClipboardProvider> {
        match backend.unwrap_or(self.clipboard) {
            ClipboardBackend::System => Arc::new(SystemClipboard::new()),
            ClipboardBackend::Command => Arc::new(self.clipboard_command.clone()),
        }
    }
}

/// `$XDG_CONFIG_HOME/sockclip/config.toml` (or the platform equivalent).
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sockclip").join("config.toml"))
}
