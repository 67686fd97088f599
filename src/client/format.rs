//! Output formatting for CLI commands.
//!
//! Status lines go to stderr so that stdout carries only payload:
//! clipboard contents for `paste`, incoming text frames for
//! `connect --hold`.

use std::io::{self, Write};

use crate::clipboard::ClipboardBackend;
use crate::connection::{Connection, ConnectionState, ConnectionTarget};

pub fn print_target(target: &ConnectionTarget) {
    eprintln!("Target:    {target}");
}

pub fn print_connected(conn: &Connection) {
    eprintln!("Connected: {}", conn.url());
    eprintln!("State:     {}", state_label(conn.state()));
}

pub fn print_closed(conn: &Connection) {
    eprintln!("State:     {}", state_label(conn.state()));
}

/// Report a close initiated by the peer.
pub fn print_peer_closed(code: Option<u16>, reason: &str) {
    match code {
        Some(code) if reason.is_empty() => eprintln!("Peer closed: code {code}"),
        Some(code) => eprintln!("Peer closed: code {code} ({reason})"),
        None => eprintln!("Peer closed"),
    }
}

pub fn print_text_frame(text: &str) {
    println!("{text}");
}

pub fn print_binary_frame(len: usize) {
    eprintln!("[binary frame, {len} bytes]");
}

pub fn print_copied(len: usize, backend: ClipboardBackend) {
    eprintln!("{}", copied_line(len, backend));
}

fn copied_line(len: usize, backend: ClipboardBackend) -> String {
    format!("Copied {len} bytes to clipboard ({backend})")
}

/// Write clipboard contents to stdout exactly, without a trailing newline.
pub fn print_paste(text: &str) -> Result<(), io::Error> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

pub fn state_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Open => "open",
        ConnectionState::Closing => "closing",
        ConnectionState::Closed => "closed",
    }
}
