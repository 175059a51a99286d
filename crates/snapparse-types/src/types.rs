use serde::{Deserialize, Deserializer, Serialize};

/// Generation tag assigned by the host when a stream starts
pub type StreamId = String;

/// Hosts send generation ids either as strings or as plain numbers
pub fn deserialize_stream_id<'de, D>(deserializer: D) -> Result<StreamId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(id) => id,
        Raw::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    #[default]
    Region,
    Fullscreen,
    Window,
}

impl CaptureMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureMode::Region => "region",
            CaptureMode::Fullscreen => "fullscreen",
            CaptureMode::Window => "window",
        }
    }
}

/// Pointer position in window-local logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LogicalRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LogicalRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized rectangle spanned by two corners, in any drag direction
    pub fn from_points(start: Point, end: Point) -> Self {
        Self {
            x: start.x.min(end.x),
            y: start.y.min(end.y),
            width: (start.x - end.x).abs(),
            height: (start.y - end.y).abs(),
        }
    }

    /// True when both sides reach `min`
    pub fn fits(&self, min: f64) -> bool {
        self.width >= min && self.height >= min
    }

    pub fn with_scale(self, scale_factor: f64) -> CaptureRegion {
        CaptureRegion {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            scale_factor,
        }
    }
}

/// Logical rectangle plus the device pixel ratio sampled at confirm time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scale_factor: f64,
}

impl CaptureRegion {
    pub fn logical_rect(&self) -> LogicalRect {
        LogicalRect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePoint {
    pub x: f64,
    pub y: f64,
    pub scale_factor: f64,
}

impl CapturePoint {
    pub fn at(point: Point, scale_factor: f64) -> Self {
        Self {
            x: point.x,
            y: point.y,
            scale_factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRequest {
    pub mode: CaptureMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<CaptureRegion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<CapturePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedPreview {
    #[serde(alias = "dataUrl")]
    pub image_data: String,
    pub logical_rect: LogicalRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowKind {
    Main,
    ActionBar,
    Translate,
    Summary,
    Explain,
    Optimize,
    Settings,
    OcrCapture,
}

impl WindowKind {
    pub fn label(self) -> &'static str {
        match self {
            WindowKind::Main => "main",
            WindowKind::ActionBar => "action-bar",
            WindowKind::Translate => "translate",
            WindowKind::Summary => "summary",
            WindowKind::Explain => "explain",
            WindowKind::Optimize => "optimize",
            WindowKind::Settings => "settings",
            WindowKind::OcrCapture => "ocr-capture",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WindowKind::Main => "SnapParse",
            WindowKind::ActionBar => "SnapParse Action Bar",
            WindowKind::Translate => "翻译",
            WindowKind::Summary => "总结",
            WindowKind::Explain => "解释",
            WindowKind::Optimize => "优化",
            WindowKind::Settings => "设置",
            WindowKind::OcrCapture => "截图",
        }
    }

    /// Streaming task a feature window runs, `None` for everything else
    pub fn task_kind(self) -> Option<TaskKind> {
        match self {
            WindowKind::Translate => Some(TaskKind::Translate),
            WindowKind::Summary => Some(TaskKind::Summarize),
            WindowKind::Explain => Some(TaskKind::Explain),
            WindowKind::Optimize => Some(TaskKind::Optimize),
            _ => None,
        }
    }

    /// Prefix used for user-facing stream errors
    pub fn error_label(self) -> &'static str {
        match self {
            WindowKind::Translate => "翻译失败",
            WindowKind::Summary => "总结失败",
            WindowKind::Explain => "解释失败",
            WindowKind::Optimize => "优化失败",
            _ => "处理失败",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Translate,
    Summarize,
    Explain,
    Optimize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinActionId {
    Translate,
    Explain,
    Summarize,
    Optimize,
    Search,
    Copy,
}

impl BuiltinActionId {
    pub fn as_str(self) -> &'static str {
        match self {
            BuiltinActionId::Translate => "translate",
            BuiltinActionId::Explain => "explain",
            BuiltinActionId::Summarize => "summarize",
            BuiltinActionId::Optimize => "optimize",
            BuiltinActionId::Search => "search",
            BuiltinActionId::Copy => "copy",
        }
    }
}

/// A resolved, orderable toolbar entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBarAction {
    pub id: String,
    pub label: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builtin_id: Option<BuiltinActionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_window: Option<WindowKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Cross-window message that seeds a feature window with work
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeTextPayload {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<WindowKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionTextPayload {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_action_id: Option<String>,
}

impl SelectionTextPayload {
    pub fn is_from_ocr(&self) -> bool {
        self.source.as_deref() == Some("ocr")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureEntryKind {
    Screenshot,
    Ocr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrCaptureOpened {
    pub entry_kind: CaptureEntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_mode: Option<CaptureMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizePendingUpdated {
    #[serde(default)]
    pub request_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunk {
    #[serde(deserialize_with = "deserialize_stream_id")]
    pub stream_id: StreamId,
    pub chunk: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDone {
    #[serde(deserialize_with = "deserialize_stream_id")]
    pub stream_id: StreamId,
    pub full_text: String,
    #[serde(default)]
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamError {
    #[serde(deserialize_with = "deserialize_stream_id")]
    pub stream_id: StreamId,
    pub error: String,
}
