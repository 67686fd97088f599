//! Connection targets — where a [`Connection`](super::Connection) points.
//!
//! A target is either derived from a host name (fixed port and path) or
//! given as a full URL. Both resolve to a `ws://` or `wss://`
//! [`Url`] before any socket is opened.

use std::fmt;

use url::Url;

use super::ConnectionError;

/// Port used when the target is derived from a host name.
pub const DEFAULT_PORT: u16 = 9123;

/// Path used when the target is derived from a host name.
pub const DEFAULT_PATH: &str = "/ws";

/// Address of the remote WebSocket endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// `ws://<host>:9123/ws`.
    Default { host: String },

    /// A full address. It goes through URL parsing, so the resolved form
    /// is normalized: the host is lowercased and a port equal to the
    /// scheme default is dropped (`ws://Host:80/ws` becomes `ws://host/ws`).
    Explicit(String),
}

impl ConnectionTarget {
    /// Target derived from a host name.
    pub fn host(host: impl Into<String>) -> Self {
        Self::Default { host: host.into() }
    }

    /// Target taken from a full URL; see [`ConnectionTarget::Explicit`].
    pub fn explicit(url: impl Into<String>) -> Self {
        Self::Explicit(url.into())
    }

    /// Resolve the target to a WebSocket URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Url`] if the address does not parse or
    /// [`ConnectionError::Scheme`] if it is not `ws`/`wss`.
    pub fn resolve(&self) -> Result<Url, ConnectionError> {
        let url = match self {
            Self::Default { host } => default_url(host)?,
            Self::Explicit(raw) => {
                Url::parse(raw).map_err(|e| ConnectionError::Url(format!("{raw}: {e}")))?
            }
        };

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(ConnectionError::Scheme(other.to_string())),
        }
    }
}

/// `ws://<host>:9123/ws`, with `host` parsed as a host only. Anything that
/// would spill into the userinfo, path, query or fragment is rejected.
fn default_url(host: &str) -> Result<Url, ConnectionError> {
    if host.is_empty() {
        return Err(ConnectionError::Url("empty host".into()));
    }
    let mut url = Url::parse(&format!("ws://localhost:{DEFAULT_PORT}{DEFAULT_PATH}"))
        .map_err(|e| ConnectionError::Url(e.to_string()))?;
    url.set_host(Some(host))
        .map_err(|e| ConnectionError::Url(format!("host {host:?}: {e}")))?;
    Ok(url)
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default { host } => write!(f, "ws://{host}:{DEFAULT_PORT}{DEFAULT_PATH}"),
            Self::Explicit(raw) => f.write_str(raw),
        }
    }
}
