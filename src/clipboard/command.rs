//! Helper-process clipboard provider, `xclip` by default.
//!
//! Writes pipe the payload into the helper's stdin; reads capture its
//! stdout. The child is always reaped before returning. If feeding
//! stdin fails it is killed first, so no helper outlives the call.

use std::io::Write;
use std::process::{Child, Command, Stdio};

use serde::Deserialize;

use super::{ClipboardError, ClipboardProvider};

/// Clipboard through an external program.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandClipboard {
    pub program: String,
    /// Arguments for a write; the payload arrives on stdin.
    #[serde(default)]
    pub write_args: Vec<String>,
    /// Arguments for a read; the content is taken from stdout.
    #[serde(default)]
    pub read_args: Vec<String>,
}

impl Default for CommandClipboard {
    fn default() -> Self {
        Self::xclip()
    }
}

impl CommandClipboard {
    /// `xclip -selection clipboard` for writes, with `-o` for reads.
    pub fn xclip() -> Self {
        Self {
            program: "xclip".into(),
            write_args: vec!["-selection".into(), "clipboard".into()],
            read_args: vec!["-selection".into(), "clipboard".into(), "-o".into()],
        }
    }

    fn spawn_err(&self, source: std::io::Error) -> ClipboardError {
        ClipboardError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

/// Kill and reap a child whose input could not be delivered.
fn abandon(mut child: Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl ClipboardProvider for CommandClipboard {
    fn write(&self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(&self.program)
            .args(&self.write_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.spawn_err(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                drop(stdin);
                abandon(child);
                return Err(ClipboardError::Write(format!(
                    "failed to write to {}: {e}",
                    self.program
                )));
            }
            // Dropping stdin closes the pipe so the helper can finish.
        }

        let status = child
            .wait()
            .map_err(|e| ClipboardError::Write(format!("failed to wait for {}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::Exit {
                program: self.program.clone(),
                status: status.to_string(),
            })
        }
    }

    fn read(&self) -> Result<String, ClipboardError> {
        let output = Command::new(&self.program)
            .args(&self.read_args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| self.spawn_err(e))?;

        if !output.status.success() {
            return Err(ClipboardError::Exit {
                program: self.program.clone(),
                status: output.status.to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ClipboardError::Read(e.to_string()))
    }
}
