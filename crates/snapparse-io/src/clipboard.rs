use std::io::Write;
use std::process::{Command, Stdio};

use arboard::Clipboard;
use snapparse_host::{ClipboardError, ClipboardSink, FallbackClipboard};

/// Native clipboard through `arboard`
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

/// Legacy path: pipe the text into the platform copy utility
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: &'static str,
    args: &'static [&'static str],
}

impl CommandClipboard {
    pub fn new(program: &'static str, args: &'static [&'static str]) -> Self {
        Self { program, args }
    }

    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("pbcopy", &[])
        } else if cfg!(windows) {
            Self::new("clip", &[])
        } else {
            Self::new("xclip", &["-selection", "clipboard"])
        }
    }
}

impl ClipboardSink for CommandClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(self.program)
            .args(self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(ClipboardError::Unavailable(format!(
                "{} exited with {status}",
                self.program
            )));
        }
        Ok(())
    }
}

/// `arboard` first, platform copy utility second
pub fn system_clipboard() -> FallbackClipboard {
    FallbackClipboard::new(
        Box::new(SystemClipboard),
        Box::new(CommandClipboard::platform_default()),
    )
}
