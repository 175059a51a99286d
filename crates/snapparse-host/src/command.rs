use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use snapparse_config::Settings;
use snapparse_types::{
    CapturePoint, CaptureRegion, CapturedPreview, ChangeTextPayload, LogicalRect,
    ScreenshotRequest, StreamId, TaskKind, WindowKind,
};

#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    #[error("host rejected {command}: {message}")]
    Rejected {
        command: &'static str,
        message: String,
    },

    #[error("{0} is not supported by this host")]
    Unsupported(&'static str),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response to {command}: {message}")]
    Decode {
        command: &'static str,
        message: String,
    },

    #[error("host connection closed")]
    Closed,
}

impl HostError {
    /// Text fit for showing to the user; rejections carry the host's own message
    pub fn user_message(&self) -> String {
        match self {
            HostError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Request half of the host boundary
///
/// Serializes to `{"command": "<snake_case name>", "args": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum Command {
    OpenWindow {
        kind: WindowKind,
    },
    CloseWindow {
        kind: WindowKind,
    },
    ResizeWindow {
        kind: WindowKind,
        width: f64,
        height: f64,
    },
    MoveWindow {
        kind: WindowKind,
        x: f64,
        y: f64,
    },
    CaptureScreenshotPreview {
        request: ScreenshotRequest,
    },
    ResolveWindowCaptureHint {
        point: CapturePoint,
    },
    RunOcrCapture {
        region: CaptureRegion,
    },
    #[serde(rename_all = "camelCase")]
    CopyScreenshotPreview {
        image_data: String,
    },
    #[serde(rename_all = "camelCase")]
    SaveScreenshotPreview {
        image_data: String,
    },
    #[serde(rename_all = "camelCase")]
    StreamProcessText {
        task_kind: TaskKind,
        text: String,
        options: Value,
    },
    SetPendingOptimizeRequest {
        payload: ChangeTextPayload,
    },
    TakePendingOptimizeRequest,
    GetSettings,
    SaveSettings {
        settings: Settings,
    },
    OpenExternalUrl {
        url: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::OpenWindow { .. } => "open_window",
            Command::CloseWindow { .. } => "close_window",
            Command::ResizeWindow { .. } => "resize_window",
            Command::MoveWindow { .. } => "move_window",
            Command::CaptureScreenshotPreview { .. } => "capture_screenshot_preview",
            Command::ResolveWindowCaptureHint { .. } => "resolve_window_capture_hint",
            Command::RunOcrCapture { .. } => "run_ocr_capture",
            Command::CopyScreenshotPreview { .. } => "copy_screenshot_preview",
            Command::SaveScreenshotPreview { .. } => "save_screenshot_preview",
            Command::StreamProcessText { .. } => "stream_process_text",
            Command::SetPendingOptimizeRequest { .. } => "set_pending_optimize_request",
            Command::TakePendingOptimizeRequest => "take_pending_optimize_request",
            Command::GetSettings => "get_settings",
            Command::SaveSettings { .. } => "save_settings",
            Command::OpenExternalUrl { .. } => "open_external_url",
        }
    }
}

/// Native host reached through request/response commands
///
/// Transports implement `invoke`; callers use the typed helpers on
/// [`HostCommands`].
#[async_trait]
pub trait Host: Send + Sync {
    async fn invoke(&self, command: Command) -> Result<Value, HostError>;
}

fn decode<T: DeserializeOwned>(command: &'static str, value: Value) -> Result<T, HostError> {
    serde_json::from_value(value).map_err(|e| HostError::Decode {
        command,
        message: e.to_string(),
    })
}

/// Typed command helpers available on every [`Host`]
#[async_trait]
pub trait HostCommands: Host {
    async fn open_window(&self, kind: WindowKind) -> Result<(), HostError> {
        self.invoke(Command::OpenWindow { kind }).await.map(drop)
    }

    async fn close_window(&self, kind: WindowKind) -> Result<(), HostError> {
        self.invoke(Command::CloseWindow { kind }).await.map(drop)
    }

    async fn resize_window(
        &self,
        kind: WindowKind,
        width: f64,
        height: f64,
    ) -> Result<(), HostError> {
        self.invoke(Command::ResizeWindow {
            kind,
            width,
            height,
        })
        .await
        .map(drop)
    }

    async fn move_window(&self, kind: WindowKind, x: f64, y: f64) -> Result<(), HostError> {
        self.invoke(Command::MoveWindow { kind, x, y })
            .await
            .map(drop)
    }

    async fn capture_screenshot_preview(
        &self,
        request: ScreenshotRequest,
    ) -> Result<CapturedPreview, HostError> {
        let value = self
            .invoke(Command::CaptureScreenshotPreview { request })
            .await?;
        decode("capture_screenshot_preview", value)
    }

    async fn resolve_window_capture_hint(
        &self,
        point: CapturePoint,
    ) -> Result<Option<LogicalRect>, HostError> {
        let value = self
            .invoke(Command::ResolveWindowCaptureHint { point })
            .await?;
        decode("resolve_window_capture_hint", value)
    }

    async fn run_ocr_capture(&self, region: CaptureRegion) -> Result<(), HostError> {
        self.invoke(Command::RunOcrCapture { region })
            .await
            .map(drop)
    }

    async fn copy_screenshot_preview(&self, image_data: String) -> Result<(), HostError> {
        self.invoke(Command::CopyScreenshotPreview { image_data })
            .await
            .map(drop)
    }

    async fn save_screenshot_preview(&self, image_data: String) -> Result<(), HostError> {
        self.invoke(Command::SaveScreenshotPreview { image_data })
            .await
            .map(drop)
    }

    /// Start a stream; resolves with the generation id of the new stream
    async fn stream_process_text(
        &self,
        task_kind: TaskKind,
        text: String,
        options: Value,
    ) -> Result<StreamId, HostError> {
        let value = self
            .invoke(Command::StreamProcessText {
                task_kind,
                text,
                options,
            })
            .await?;
        match value {
            Value::Number(n) => Ok(n.to_string()),
            other => decode("stream_process_text", other),
        }
    }

    async fn set_pending_optimize_request(
        &self,
        payload: ChangeTextPayload,
    ) -> Result<(), HostError> {
        self.invoke(Command::SetPendingOptimizeRequest { payload })
            .await
            .map(drop)
    }

    async fn take_pending_optimize_request(&self) -> Result<Option<ChangeTextPayload>, HostError> {
        let value = self.invoke(Command::TakePendingOptimizeRequest).await?;
        decode("take_pending_optimize_request", value)
    }

    /// Raw settings document; validation is the caller's concern
    async fn get_settings(&self) -> Result<Value, HostError> {
        self.invoke(Command::GetSettings).await
    }

    async fn save_settings(&self, settings: Settings) -> Result<(), HostError> {
        self.invoke(Command::SaveSettings { settings })
            .await
            .map(drop)
    }

    async fn open_external_url(&self, url: String) -> Result<(), HostError> {
        self.invoke(Command::OpenExternalUrl { url })
            .await
            .map(drop)
    }
}

impl<T: Host + ?Sized> HostCommands for T {}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use snapparse_types::CaptureMode;

    use super::*;

    struct Scripted {
        reply: Value,
        seen: Mutex<Vec<Command>>,
    }

    #[async_trait]
    impl Host for Scripted {
        async fn invoke(&self, command: Command) -> Result<Value, HostError> {
            self.seen.lock().unwrap().push(command);
            Ok(self.reply.clone())
        }
    }

    fn scripted(reply: Value) -> Scripted {
        Scripted {
            reply,
            seen: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn command_wire_shape() {
        let command = Command::CaptureScreenshotPreview {
            request: ScreenshotRequest {
                mode: CaptureMode::Region,
                region: Some(LogicalRect::new(10.0, 10.0, 110.0, 80.0).with_scale(2.0)),
                point: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({
                "command": "capture_screenshot_preview",
                "args": {
                    "request": {
                        "mode": "region",
                        "region": { "x": 10.0, "y": 10.0, "width": 110.0, "height": 80.0, "scaleFactor": 2.0 }
                    }
                }
            })
        );

        let command = Command::StreamProcessText {
            task_kind: TaskKind::Translate,
            text: "hi".into(),
            options: json!({}),
        };
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["args"]["taskKind"], "translate");
        assert_eq!(command.name(), "stream_process_text");
    }

    #[tokio::test]
    async fn numeric_stream_ids_are_stringified() {
        let host = scripted(json!(42));
        let id = host
            .stream_process_text(TaskKind::Explain, "x".into(), json!({}))
            .await
            .unwrap();
        assert_eq!(id, "42");

        let host = scripted(json!("gen-7"));
        let id = host
            .stream_process_text(TaskKind::Explain, "x".into(), json!({}))
            .await
            .unwrap();
        assert_eq!(id, "gen-7");
    }

    #[tokio::test]
    async fn null_hint_decodes_to_none() {
        let host = scripted(Value::Null);
        let hint = host
            .resolve_window_capture_hint(CapturePoint {
                x: 1.0,
                y: 2.0,
                scale_factor: 1.0,
            })
            .await
            .unwrap();
        assert_eq!(hint, None);
        assert_eq!(host.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_preview_is_a_decode_error() {
        let host = scripted(json!({ "nope": true }));
        let err = host
            .capture_screenshot_preview(ScreenshotRequest {
                mode: CaptureMode::Fullscreen,
                region: None,
                point: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HostError::Decode {
                command: "capture_screenshot_preview",
                ..
            }
        ));
    }
}
