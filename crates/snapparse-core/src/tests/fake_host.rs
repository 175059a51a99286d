use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use snapparse_config::Settings;
use snapparse_host::{ClipboardError, ClipboardSink, Command, Host, HostError};
use snapparse_types::LogicalRect;

pub const PREVIEW_IMAGE: &str = "data:image/png;base64,AAAA";

/// Records every command and answers from per-command scripts
///
/// Unscripted commands get a default answer: captures echo the requested
/// region, streams get `gen-1`, `gen-2`, ..., settings are the defaults and
/// everything else is `null`.
#[derive(Default)]
pub struct FakeHost {
    calls: Mutex<Vec<Command>>,
    replies: Mutex<HashMap<&'static str, VecDeque<Result<Value, HostError>>>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    streams: AtomicU64,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue one answer for the next call of `command`
    pub fn reply(&self, command: &'static str, result: Result<Value, HostError>) {
        self.replies
            .lock()
            .unwrap()
            .entry(command)
            .or_default()
            .push_back(result);
    }

    pub fn reject(&self, command: &'static str, message: &str) {
        self.reply(
            command,
            Err(HostError::Rejected {
                command,
                message: message.to_string(),
            }),
        );
    }

    /// Hold every call of `command` for `delay` before answering
    pub fn delay(&self, command: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(command, delay);
    }

    pub fn calls(&self) -> Vec<Command> {
        self.calls.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.calls().iter().map(Command::name).collect()
    }

    pub fn count(&self, command: &str) -> usize {
        self.names().iter().filter(|name| **name == command).count()
    }

    pub fn position(&self, command: &str) -> Option<usize> {
        self.names().iter().position(|name| *name == command)
    }

    fn default_reply(&self, command: &Command) -> Value {
        match command {
            Command::CaptureScreenshotPreview { request } => {
                let rect = request
                    .region
                    .map(|region| region.logical_rect())
                    .unwrap_or_else(|| LogicalRect::new(0.0, 0.0, 1920.0, 1080.0));
                json!({ "imageData": PREVIEW_IMAGE, "logicalRect": rect })
            }
            Command::StreamProcessText { .. } => {
                let n = self.streams.fetch_add(1, Ordering::SeqCst) + 1;
                json!(format!("gen-{n}"))
            }
            Command::GetSettings => serde_json::to_value(Settings::default()).unwrap(),
            _ => Value::Null,
        }
    }
}

#[async_trait]
impl Host for FakeHost {
    async fn invoke(&self, command: Command) -> Result<Value, HostError> {
        let name = command.name();
        self.calls.lock().unwrap().push(command.clone());

        let delay = self.delays.lock().unwrap().get(name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .replies
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(result) => result,
            None => Ok(self.default_reply(&command)),
        }
    }
}

#[derive(Default)]
pub struct RecordingClipboard {
    pub writes: Mutex<Vec<String>>,
}

impl ClipboardSink for RecordingClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
