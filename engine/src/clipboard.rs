//! Clipboard writes for the copy tool.
//!
//! [`FallbackClipboard`] tries the system clipboard first and falls back to the
//! platform's command-line tool. Only when both fail does the caller see an error.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("{program} failed: {reason}")]
    Command { program: String, reason: String },
}

pub trait ClipboardWriter: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Native clipboard through `arboard`.
///
/// The handle is opened on first write and kept for the life of the writer. On
/// X11 and Wayland the clipboard contents are served by the owning handle, so
/// dropping it after `set_text` would lose the copy when no clipboard manager
/// is running.
#[derive(Default)]
pub struct SystemClipboard {
    handle: Mutex<Option<arboard::Clipboard>>,
}

impl std::fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemClipboard")
            .field("open", &self.is_open())
            .finish()
    }
}

impl SystemClipboard {
    /// Whether a native handle is currently held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl ClipboardWriter for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(
                arboard::Clipboard::new()
                    .map_err(|e| ClipboardError::Unavailable(e.to_string()))?,
            );
        }
        let Some(clipboard) = slot.as_mut() else {
            return Err(ClipboardError::Unavailable("no clipboard handle".into()));
        };
        clipboard.set_text(text).map_err(|e| {
            *slot = None;
            ClipboardError::Unavailable(e.to_string())
        })
    }
}

/// Pipe the text into an external program's stdin.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `pbcopy` on macOS, `clip` on Windows, `xclip` elsewhere.
    #[must_use]
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("pbcopy", Vec::<String>::new())
        } else if cfg!(windows) {
            Self::new("clip", Vec::<String>::new())
        } else {
            Self::new("xclip", ["-selection", "clipboard"])
        }
    }

    fn failure(&self, reason: impl ToString) -> ClipboardError {
        ClipboardError::Command {
            program: self.program.clone(),
            reason: reason.to_string(),
        }
    }
}

impl ClipboardWriter for CommandClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.failure(e))?;

        // stdin is dropped at the end of this block so the program sees EOF.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        if let Err(e) = written {
            if let Err(kill) = child.kill() {
                tracing::debug!(program = %self.program, "Failed to kill clipboard tool: {kill}");
            }
            if let Err(wait) = child.wait() {
                tracing::debug!(program = %self.program, "Failed to reap clipboard tool: {wait}");
            }
            return Err(self.failure(e));
        }

        let status = child.wait().map_err(|e| self.failure(e))?;
        if status.success() {
            Ok(())
        } else {
            Err(self.failure(format!("exited with {status}")))
        }
    }
}

pub struct FallbackClipboard {
    primary: Box<dyn ClipboardWriter>,
    legacy: Box<dyn ClipboardWriter>,
}

impl FallbackClipboard {
    pub fn new(primary: Box<dyn ClipboardWriter>, legacy: Box<dyn ClipboardWriter>) -> Self {
        Self { primary, legacy }
    }

    #[must_use]
    pub fn platform_default() -> Self {
        Self::new(
            Box::new(SystemClipboard::default()),
            Box::new(CommandClipboard::platform_default()),
        )
    }
}

impl ClipboardWriter for FallbackClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        match self.primary.write_text(text) {
            Ok(()) => Ok(()),
            Err(primary) => {
                tracing::debug!("Primary clipboard failed, trying fallback: {primary}");
                self.legacy.write_text(text).inspect_err(|legacy| {
                    tracing::warn!("Clipboard write failed: {primary}; fallback: {legacy}");
                })
            }
        }
    }
}
