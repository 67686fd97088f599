//! Native clipboard provider backed by arboard.

use super::{ClipboardError, ClipboardProvider};

/// How long a Linux write waits for a clipboard manager to take over
/// the selection before the handle is dropped.
#[cfg(target_os = "linux")]
const HANDOFF_WAIT: std::time::Duration = std::time::Duration::from_millis(250);

/// System clipboard through the platform's native API.
///
/// Opens a fresh `arboard::Clipboard` per call and drops it before
/// returning.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

fn open() -> Result<arboard::Clipboard, ClipboardError> {
    arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))
}

impl ClipboardProvider for SystemClipboard {
    fn write(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = open()?;

        #[cfg(target_os = "linux")]
        {
            use arboard::SetExtLinux;

            clipboard
                .set()
                .wait_until(std::time::Instant::now() + HANDOFF_WAIT)
                .text(text.to_owned())
                .map_err(|e| ClipboardError::Write(e.to_string()))
        }

        #[cfg(not(target_os = "linux"))]
        {
            clipboard
                .set_text(text)
                .map_err(|e| ClipboardError::Write(e.to_string()))
        }
    }

    fn read(&self) -> Result<String, ClipboardError> {
        open()?
            .get_text()
            .map_err(|e| ClipboardError::Read(e.to_string()))
    }
}
