//! Lazily-opened shared connection.
//!
//! A `ConnectionSlot` holds at most one [`Connection`]. The first
//! [`get_or_connect`](ConnectionSlot::get_or_connect) opens it; later
//! calls hand out the same `Arc` without looking at their target.
//!
//! The first target wins. A later call naming a different target still
//! gets the existing handle; the mismatch is logged and the held target
//! stays visible through [`target`](ConnectionSlot::target). A handle the
//! peer has closed is also returned as-is: only an explicit
//! [`close`](ConnectionSlot::close) empties the slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::{Connection, ConnectionError, ConnectionTarget, HANDSHAKE_TIMEOUT};

struct Held {
    target: ConnectionTarget,
    connection: Arc<Connection>,
}

/// Owner-scoped holder for one shared connection.
pub struct ConnectionSlot {
    inner: Mutex<Option<Held>>,
    handshake_timeout: Duration,
}

impl Default for ConnectionSlot {
    fn default() -> Self {
        Self::with_handshake_timeout(HANDSHAKE_TIMEOUT)
    }
}

impl ConnectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot whose first open gives up after `timeout`.
    pub fn with_handshake_timeout(timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(None),
            handshake_timeout: timeout,
        }
    }

    /// Return the held connection, opening one to `target` if the slot is
    /// empty.
    ///
    /// The lock is held across the handshake, so concurrent first callers
    /// share one connection and queries wait for it. The handshake is
    /// bounded by the slot's timeout. A failed or timed-out open leaves the
    /// slot empty and the next call tries again.
    pub async fn get_or_connect(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Arc<Connection>, ConnectionError> {
        let mut inner = self.inner.lock().await;

        if let Some(held) = inner.as_ref() {
            if held.target != *target {
                tracing::warn!(
                    held = %held.target,
                    requested = %target,
                    "slot already holds a connection to another target, returning it"
                );
            }
            return Ok(Arc::clone(&held.connection));
        }

        let connection =
            Arc::new(Connection::connect_within(target, self.handshake_timeout).await?);
        *inner = Some(Held {
            target: target.clone(),
            connection: Arc::clone(&connection),
        });
        Ok(connection)
    }

    /// Target of the held connection, if any.
    pub async fn target(&self) -> Option<ConnectionTarget> {
        self.inner.lock().await.as_ref().map(|h| h.target.clone())
    }

    /// True if the slot holds a connection that is still open.
    pub async fn is_connected(&self) -> bool {
        self.inner
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| h.connection.is_connected())
    }

    /// Close the held connection and empty the slot.
    ///
    /// Outstanding `Arc`s stay valid but observe the closed state.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        let held = self.inner.lock().await.take();
        match held {
            Some(held) => held.connection.close().await,
            None => Ok(()),
        }
    }
}
