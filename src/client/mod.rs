//! Command runners for the CLI.
//!
//! Each command loads settings, performs one operation and prints the
//! result. Called from `main.rs`.

mod format;

use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::broadcast::error::RecvError;

use crate::cli::Command;
use crate::clipboard::{ClipboardError, ClipboardProvider, copy_to_clipboard};
use crate::config::{ConfigError, Settings};
use crate::connection::{
    Connection, ConnectionError, ConnectionEvent, ConnectionSlot, ConnectionState,
    ConnectionTarget,
};

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("connection: {0}")]
    Connection(#[from] ConnectionError),
    #[error("clipboard: {0}")]
    Clipboard(#[from] ClipboardError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("clipboard task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Run one CLI command.
pub async fn run(command: Command, config: Option<&Path>) -> Result<(), ClientError> {
    let settings = Settings::load(config)?;

    match command {
        Command::Connect {
            url,
            host,
            send,
            hold,
        } => {
            let target = settings.target(url.as_deref(), host.as_deref());
            let slot = ConnectionSlot::new();
            connect(&slot, &target, &send, hold).await
        }
        Command::Copy { text, backend } => {
            let text = match text {
                Some(text) => text,
                None => read_stdin().await?,
            };
            let len = text.len();
            let backend = backend.unwrap_or(settings.clipboard);
            copy(settings.clipboard_provider(Some(backend)), text).await?;
            format::print_copied(len, backend);
            Ok(())
        }
        Command::Paste { backend } => {
            let text = paste(settings.clipboard_provider(backend)).await?;
            format::print_paste(&text)?;
            Ok(())
        }
    }
}

/// Open the shared connection, send `frames`, optionally wait, then
/// close it.
async fn connect(
    slot: &ConnectionSlot,
    target: &ConnectionTarget,
    frames: &[String],
    hold: bool,
) -> Result<(), ClientError> {
    let conn = slot.get_or_connect(target).await?;
    if let Some(held) = slot.target().await {
        format::print_target(&held);
    }
    format::print_connected(&conn);

    for frame in frames {
        conn.send_text(frame).await?;
    }

    if hold {
        hold_open(&conn).await?;
    }

    slot.close().await?;
    format::print_closed(&conn);
    Ok(())
}

/// Print incoming frames until the peer closes or SIGINT/SIGTERM arrives.
async fn hold_open(conn: &Connection) -> Result<(), ClientError> {
    let mut events = conn.subscribe();
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // Closed before we subscribed: the event is already gone.
    if *conn.watch_state().borrow() == ConnectionState::Closed {
        return Ok(());
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ConnectionEvent::Text(text)) => format::print_text_frame(&text),
                Ok(ConnectionEvent::Binary(data)) => format::print_binary_frame(data.len()),
                Ok(ConnectionEvent::Error(e)) => {
                    tracing::warn!(error = %e, "connection error");
                }
                Ok(ConnectionEvent::Closed { code, reason }) => {
                    format::print_peer_closed(code, &reason);
                    return Ok(());
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "dropped incoming frames");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, closing connection");
                return Ok(());
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, closing connection");
                return Ok(());
            }
        }
    }
}

/// Copy on a blocking thread; providers may spawn processes or wait
/// for a clipboard manager.
async fn copy(provider: Arc<dyn ClipboardProvider>, text: String) -> Result<(), ClientError> {
    tokio::task::spawn_blocking(move || copy_to_clipboard(provider.as_ref(), &text)).await??;
    Ok(())
}

async fn paste(provider: Arc<dyn ClipboardProvider>) -> Result<String, ClientError> {
    let text = tokio::task::spawn_blocking(move || provider.read()).await??;
    Ok(text)
}

async fn read_stdin() -> Result<String, std::io::Error> {
    let mut text = String::new();
    tokio::io::stdin().read_to_string(&mut text).await?;
    Ok(text)
}
