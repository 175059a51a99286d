use serde::{Deserialize, Serialize};

fn default_font_size() -> u32 {
    14
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowSizePreset {
    #[default]
    Large,
    Medium,
    Small,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

impl WindowSizePreset {
    pub fn size(self) -> WindowSize {
        let (width, height) = match self {
            WindowSizePreset::Large => (680.0, 520.0),
            WindowSizePreset::Medium => (560.0, 440.0),
            WindowSizePreset::Small => (440.0, 360.0),
        };
        WindowSize { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WindowSettings {
    pub window_size: WindowSizePreset,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            window_size: WindowSizePreset::default(),
            font_size: default_font_size(),
        }
    }
}
