use serde::{Deserialize, Serialize};
use snapparse_types::CaptureMode;

fn default_capture_hotkey() -> String {
    "Ctrl+Shift+X".to_string()
}

fn default_quick_ocr_hotkey() -> String {
    "Ctrl+Shift+O".to_string()
}

fn default_show_shortcut_hints() -> bool {
    true
}

fn default_post_action_id() -> String {
    "translate".to_string()
}

fn default_region_hotkey() -> String {
    "Ctrl+Shift+X".to_string()
}

fn default_fullscreen_hotkey() -> String {
    "Ctrl+Shift+A".to_string()
}

fn default_window_hotkey() -> String {
    "Ctrl+Shift+M".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OcrSettings {
    pub enabled: bool,
    #[serde(default = "default_capture_hotkey")]
    pub capture_hotkey: String,
    #[serde(default = "default_quick_ocr_hotkey")]
    pub quick_ocr_hotkey: String,
    pub capture_default_mode: CaptureMode,
    #[serde(default = "default_show_shortcut_hints")]
    pub show_shortcut_hints: bool,
    pub mode_hotkeys: ModeHotkeys,
    /// Action the host attaches to OCR results so the bar can run it without a click
    #[serde(default = "default_post_action_id")]
    pub post_action_id: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            capture_hotkey: default_capture_hotkey(),
            quick_ocr_hotkey: default_quick_ocr_hotkey(),
            capture_default_mode: CaptureMode::default(),
            show_shortcut_hints: default_show_shortcut_hints(),
            mode_hotkeys: ModeHotkeys::default(),
            post_action_id: default_post_action_id(),
        }
    }
}

/// In-overlay chords that switch the capture mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModeHotkeys {
    #[serde(default = "default_region_hotkey")]
    pub region: String,
    #[serde(default = "default_fullscreen_hotkey")]
    pub fullscreen: String,
    #[serde(default = "default_window_hotkey")]
    pub window: String,
}

impl ModeHotkeys {
    pub fn chord_for(&self, mode: CaptureMode) -> &str {
        match mode {
            CaptureMode::Region => &self.region,
            CaptureMode::Fullscreen => &self.fullscreen,
            CaptureMode::Window => &self.window,
        }
    }
}

impl Default for ModeHotkeys {
    fn default() -> Self {
        Self {
            region: default_region_hotkey(),
            fullscreen: default_fullscreen_hotkey(),
            window: default_window_hotkey(),
        }
    }
}
