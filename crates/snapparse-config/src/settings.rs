use serde::{Deserialize, Serialize};
use snapparse_hotkey::{Chord, ChordParseError};

use self::api::ApiSettings;
use self::features::FeaturesSettings;
use self::ocr::OcrSettings;
use self::toolbar::ToolbarSettings;
use self::window::WindowSettings;

pub mod api;
pub mod features;
pub mod ocr;
pub mod toolbar;
pub mod window;

/// User settings as served by the host's `get_settings`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api: ApiSettings,
    pub ocr: OcrSettings,
    pub toolbar: ToolbarSettings,
    pub window: WindowSettings,
    pub features: FeaturesSettings,
    pub advanced: AdvancedSettings,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedSettings {
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// `EnvFilter` directive for this level
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("malformed settings: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{field} must be in range [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("api.model must not be empty")]
    EmptyModel,

    #[error("toolbar.actions must contain at least one action")]
    EmptyActions,

    #[error("invalid hotkey in {field}: {source}")]
    InvalidHotkey {
        field: &'static str,
        #[source]
        source: ChordParseError,
    },
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), SettingsError> {
    if value.is_nan() || value < min || value > max {
        return Err(SettingsError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn check_hotkey(field: &'static str, chord: &str) -> Result<(), SettingsError> {
    chord
        .parse::<Chord>()
        .map(|_| ())
        .map_err(|source| SettingsError::InvalidHotkey { field, source })
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.api.model.trim().is_empty() {
            return Err(SettingsError::EmptyModel);
        }
        check_range("api.timeoutMs", self.api.timeout_ms as f64, 1000.0, 120_000.0)?;
        check_range("api.temperature", f64::from(self.api.temperature), 0.0, 2.0)?;
        check_range("window.fontSize", f64::from(self.window.font_size), 10.0, 24.0)?;

        if self.toolbar.actions.is_empty() {
            return Err(SettingsError::EmptyActions);
        }

        check_hotkey("toolbar.triggerHotkey", &self.toolbar.trigger_hotkey)?;
        check_hotkey("ocr.captureHotkey", &self.ocr.capture_hotkey)?;
        check_hotkey("ocr.quickOcrHotkey", &self.ocr.quick_ocr_hotkey)?;
        check_hotkey("ocr.modeHotkeys.region", &self.ocr.mode_hotkeys.region)?;
        check_hotkey("ocr.modeHotkeys.fullscreen", &self.ocr.mode_hotkeys.fullscreen)?;
        check_hotkey("ocr.modeHotkeys.window", &self.ocr.mode_hotkeys.window)?;

        Ok(())
    }

    /// Decode and validate a raw settings document
    pub fn from_value(value: serde_json::Value) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_value(value)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Malformed settings never fail a window; they are replaced by defaults
    pub fn from_value_or_default(value: serde_json::Value) -> Self {
        Self::from_value(value).unwrap_or_else(|e| {
            tracing::warn!("[SETTINGS] {e}, falling back to defaults");
            Settings::default()
        })
    }

    /// Typed counterpart of `from_value_or_default`
    pub fn validated_or_default(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(e) => {
                tracing::warn!("[SETTINGS] {e}, falling back to defaults");
                Settings::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use snapparse_types::{BuiltinActionId, CaptureMode};

    use super::window::WindowSizePreset;
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn partial_documents_merge_with_defaults() {
        let settings = Settings::from_value(json!({
            "ocr": { "captureDefaultMode": "window" },
            "window": { "windowSize": "small" }
        }))
        .unwrap();

        assert_eq!(settings.ocr.capture_default_mode, CaptureMode::Window);
        assert_eq!(settings.ocr.mode_hotkeys.fullscreen, "Ctrl+Shift+A");
        assert_eq!(settings.window.window_size, WindowSizePreset::Small);
        assert_eq!(settings.window.font_size, 14);
        assert_eq!(settings.toolbar.actions.len(), 6);
        assert_eq!(settings.toolbar.actions[0].id, BuiltinActionId::Translate);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = Settings::from_value(json!({ "api": { "timeoutMs": 10 } })).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::OutOfRange {
                field: "api.timeoutMs",
                ..
            }
        ));
    }

    #[test]
    fn modifier_only_hotkey_is_rejected() {
        let err = Settings::from_value(json!({
            "ocr": { "modeHotkeys": { "window": "Ctrl+Shift" } }
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidHotkey {
                field: "ocr.modeHotkeys.window",
                source: ChordParseError::MissingKey
            }
        ));
    }

    #[test]
    fn malformed_settings_recover_to_defaults() {
        let recovered = Settings::from_value_or_default(json!({ "toolbar": { "actions": [] } }));
        assert_eq!(recovered, Settings::default());

        let recovered = Settings::from_value_or_default(json!({ "window": { "fontSize": "huge" } }));
        assert_eq!(recovered, Settings::default());
    }
}
