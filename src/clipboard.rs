//! Clipboard targets for the snippet viewer's copy action.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Mutex;

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> io::Result<()>;
}

/// Copies through the terminal using the OSC 52 escape sequence.
///
/// Works over SSH and inside tmux (with `set-clipboard on`) because the
/// terminal emulator, not this process, owns the system clipboard. The
/// sequence goes to the controlling terminal, falling back to stderr when
/// that is a TTY, and never to stdout. Without a terminal the copy fails.
pub struct Osc52Clipboard;

impl Osc52Clipboard {
    pub fn sequence(text: &str) -> String {
        format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
    }
}

impl Clipboard for Osc52Clipboard {
    fn write_text(&self, text: &str) -> io::Result<()> {
        let sequence = Self::sequence(text);
        match OpenOptions::new().write(true).open("/dev/tty") {
            Ok(mut tty) => {
                tty.write_all(sequence.as_bytes())?;
                tty.flush()
            }
            Err(_) if atty::is(atty::Stream::Stderr) => {
                let mut err = io::stderr().lock();
                err.write_all(sequence.as_bytes())?;
                err.flush()
            }
            Err(e) => Err(io::Error::new(
                e.kind(),
                format!("no terminal to copy through: {}", e),
            )),
        }
    }
}

/// Keeps the last copied text in memory.
#[derive(Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until something has been copied.
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> io::Result<()> {
        *self
            .contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(text.to_string());
        Ok(())
    }
}
