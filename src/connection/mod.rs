//! WebSocket connection handle and shared accessor.
//!
//! [`Connection`] wraps one live WebSocket. Opening it is an explicit
//! async step that resolves only after the handshake, so callers see
//! refused or unreachable targets as errors instead of holding a handle
//! that never opens. After that, a background reader task drives the
//! lifecycle state and fans incoming frames out to subscribers.
//!
//! [`ConnectionSlot`] is the lazily-initialized shared accessor: the
//! first call opens the connection, every later call returns the same
//! handle.

mod slot;
mod target;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

pub use slot::ConnectionSlot;
pub use target::ConnectionTarget;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

/// How long [`Connection::connect`] waits for the upgrade to complete.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long [`Connection::close`] waits for the peer's close reply.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("invalid target: {0}")]
    Url(String),
    #[error("unsupported scheme: {0} (expected ws or wss)")]
    Scheme(String),
    #[error("handshake with {url} failed: {source}")]
    Handshake {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
    #[error("handshake with {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
    #[error("transport: {0}")]
    Transport(#[source] tungstenite::Error),
    #[error("connection closed")]
    Closed,
}

/// Lifecycle of an opened connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    /// A close frame was sent or received; waiting for the socket to end.
    Closing,
    Closed,
}

/// Notification delivered to [`Connection::subscribe`] receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Text(String),
    Binary(Vec<u8>),
    /// The socket ended. `code` and `reason` come from the peer's close
    /// frame when there was one.
    Closed {
        code: Option<u16>,
        reason: String,
    },
    /// The transport failed; a `Closed` event follows.
    Error(String),
}

/// A live WebSocket connection.
pub struct Connection {
    url: Url,
    sink: Mutex<WsSink>,
    state: Arc<watch::Sender<ConnectionState>>,
    events: broadcast::Sender<ConnectionEvent>,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Open a connection and wait for the handshake to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Url`] or [`ConnectionError::Scheme`] for
    /// a bad target, [`ConnectionError::Handshake`] if the remote end
    /// is unreachable or refuses the upgrade, and [`ConnectionError::Timeout`]
    /// if the upgrade does not finish within [`HANDSHAKE_TIMEOUT`].
    pub async fn connect(target: &ConnectionTarget) -> Result<Self, ConnectionError> {
        Self::connect_within(target, HANDSHAKE_TIMEOUT).await
    }

    /// [`connect`](Self::connect) with a caller-chosen handshake deadline.
    pub async fn connect_within(
        target: &ConnectionTarget,
        deadline: Duration,
    ) -> Result<Self, ConnectionError> {
        let url = target.resolve()?;
        tracing::debug!(%url, "opening websocket");

        let (stream, _response) = tokio::time::timeout(deadline, connect_async(url.as_str()))
            .await
            .map_err(|_| ConnectionError::Timeout {
                url: url.to_string(),
                after: deadline,
            })?
            .map_err(|e| ConnectionError::Handshake {
                url: url.to_string(),
                source: e,
            })?;
        let (sink, source) = stream.split();

        let (state_tx, _) = watch::channel(ConnectionState::Open);
        let state = Arc::new(state_tx);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let reader = tokio::spawn(read_loop(source, Arc::clone(&state), events.clone()));

        tracing::info!(%url, "websocket open");
        Ok(Self {
            url,
            sink: Mutex::new(sink),
            state,
            events,
            reader,
        })
    }

    /// The resolved address this connection was opened against.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// True while the connection is open and not closing.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Observe lifecycle transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Receive incoming frames and close/error notifications from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Send one text frame.
    pub async fn send_text(&self, text: &str) -> Result<(), ConnectionError> {
        if !self.is_connected() {
            return Err(ConnectionError::Closed);
        }
        self.sink
            .lock()
            .await
            .send(Message::text(text.to_owned()))
            .await
            .map_err(ConnectionError::Transport)
    }

    /// Start the closing handshake and wait for the socket to end.
    ///
    /// Calling this on an already closed connection is a no-op. If the
    /// peer does not answer within two seconds the reader is stopped and
    /// the connection is marked closed anyway.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        let was_open = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Open {
                *state = ConnectionState::Closing;
                true
            } else {
                false
            }
        });
        if !was_open && self.state() == ConnectionState::Closed {
            return Ok(());
        }

        match self.sink.lock().await.close().await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => {}
            Err(e) => return Err(ConnectionError::Transport(e)),
        }

        let mut rx = self.state.subscribe();
        let ended = tokio::time::timeout(
            CLOSE_TIMEOUT,
            rx.wait_for(|s| *s == ConnectionState::Closed),
        )
        .await
        .is_ok_and(|r| r.is_ok());

        if !ended {
            tracing::warn!(url = %self.url, "peer did not complete close handshake");
            self.reader.abort();
            // The reader may have finished on its own in the meantime; it
            // has then already announced the close.
            let previous = self.state.send_replace(ConnectionState::Closed);
            if previous != ConnectionState::Closed {
                let _ = self.events.send(ConnectionEvent::Closed {
                    code: None,
                    reason: "close timed out".into(),
                });
            }
        }

        tracing::debug!(url = %self.url, "websocket closed");
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url.as_str())
            .field("state", &self.state())
            .finish()
    }
}

/// Pump incoming frames until the socket ends.
///
/// Ping/pong is answered inside tungstenite; only data and close frames
/// reach subscribers. The state always ends at `Closed`.
async fn read_loop(
    mut source: WsSource,
    state: Arc<watch::Sender<ConnectionState>>,
    events: broadcast::Sender<ConnectionEvent>,
) {
    let mut close_code = None;
    let mut close_reason = String::new();

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let _ = events.send(ConnectionEvent::Text(text.as_str().to_owned()));
            }
            Ok(Message::Binary(data)) => {
                let _ = events.send(ConnectionEvent::Binary(data.to_vec()));
            }
            Ok(Message::Close(frame)) => {
                if let Some(frame) = frame {
                    close_code = Some(u16::from(frame.code));
                    close_reason = frame.reason.as_str().to_owned();
                }
                state.send_if_modified(|s| {
                    if *s == ConnectionState::Open {
                        *s = ConnectionState::Closing;
                        true
                    } else {
                        false
                    }
                });
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "websocket read failed");
                let _ = events.send(ConnectionEvent::Error(e.to_string()));
                break;
            }
        }
    }

    state.send_replace(ConnectionState::Closed);
    let _ = events.send(ConnectionEvent::Closed {
        code: close_code,
        reason: close_reason,
    });
}

#[cfg(test)]
pub(crate) mod testing {
    //! Local WebSocket peer for connection tests.

    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    /// Echo server: text and binary frames come back unchanged, the text
    /// `"bye"` makes the server close with code 1000 and reason `"bye"`.
    pub struct EchoServer {
        pub addr: SocketAddr,
        accepted: Arc<AtomicUsize>,
        task: JoinHandle<()>,
    }

    impl EchoServer {
        pub async fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let accepted = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&accepted);

            let task = tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        return;
                    };
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        let Ok(mut ws) = accept_async(stream).await else {
                            return;
                        };
                        while let Some(Ok(msg)) = ws.next().await {
                            match msg {
                                Message::Text(ref text) if text.as_str() == "bye" => {
                                    let _ = ws
                                        .close(Some(CloseFrame {
                                            code: CloseCode::Normal,
                                            reason: String::from("bye").into(),
                                        }))
                                        .await;
                                }
                                Message::Text(_) | Message::Binary(_) => {
                                    if ws.send(msg).await.is_err() {
                                        return;
                                    }
                                }
                                _ => {}
                            }
                        }
                    });
                }
            });

            Self {
                addr,
                accepted,
                task,
            }
        }

        pub fn url(&self) -> String {
            format!("ws://{}/ws", self.addr)
        }

        pub fn accepted(&self) -> usize {
            self.accepted.load(Ordering::SeqCst)
        }
    }

    impl Drop for EchoServer {
        fn drop(&mut self) {
            self.task.abort();
        }
    }

    /// A peer that goes quiet. With `upgrade` false it accepts TCP and never
    /// answers the handshake; with `upgrade` true it completes the handshake
    /// and then never reads again, so close frames go unanswered.
    pub struct StalledServer {
        pub addr: SocketAddr,
        task: JoinHandle<()>,
    }

    impl StalledServer {
        pub async fn start(upgrade: bool) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            let task = tokio::spawn(async move {
                let mut tcp = Vec::new();
                let mut upgraded = Vec::new();
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        return;
                    };
                    if upgrade {
                        if let Ok(ws) = accept_async(stream).await {
                            upgraded.push(ws);
                        }
                    } else {
                        tcp.push(stream);
                    }
                }
            });

            Self { addr, task }
        }

        pub fn url(&self) -> String {
            format!("ws://{}/ws", self.addr)
        }
    }

    impl Drop for StalledServer {
        fn drop(&mut self) {
            self.task.abort();
        }
    }

    /// An address nothing listens on.
    pub async fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("ws://{addr}/ws")
    }
}
