//! Raw UI input forwarded by the renderer to the window controllers

use serde::{Deserialize, Serialize};

use crate::types::{LogicalRect, Point};

/// Physical key event, DOM-style key name plus modifier flags
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl KeyEvent {
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminalAction {
    Ocr,
    Copy,
    Save,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OverlayInput {
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
    KeyDown(KeyEvent),
    Action { action: TerminalAction },
    Cancel,
}

impl OverlayInput {
    pub fn point(&self) -> Option<Point> {
        match *self {
            OverlayInput::PointerDown { x, y }
            | OverlayInput::PointerMove { x, y }
            | OverlayInput::PointerUp { x, y } => Some(Point::new(x, y)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionBarInput {
    #[serde(rename_all = "camelCase")]
    Click { action_id: String },
    /// Bar bounds in screen logical pixels, reported after layout
    Geometry { bounds: LogicalRect },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FeatureInput {
    /// Source text edited by hand
    Submit { text: String },
    Languages { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "window", content = "input", rename_all = "kebab-case")]
pub enum WindowInput {
    ActionBar(ActionBarInput),
    OcrCapture(OverlayInput),
    Translate(FeatureInput),
    Summary(FeatureInput),
    Explain(FeatureInput),
    Optimize(FeatureInput),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_input_wire_shape() {
        let json = r#"{"window":"ocr-capture","input":{"type":"pointer-down","x":10,"y":12}}"#;
        let input: WindowInput = serde_json::from_str(json).unwrap();
        assert_eq!(
            input,
            WindowInput::OcrCapture(OverlayInput::PointerDown { x: 10.0, y: 12.0 })
        );

        let json = r#"{"window":"action-bar","input":{"type":"click","actionId":"translate"}}"#;
        let input: WindowInput = serde_json::from_str(json).unwrap();
        assert_eq!(
            input,
            WindowInput::ActionBar(ActionBarInput::Click {
                action_id: "translate".into()
            })
        );
    }

    #[test]
    fn key_event_modifiers_default_to_false() {
        let json = r#"{"window":"ocr-capture","input":{"type":"key-down","key":"Escape"}}"#;
        let input: WindowInput = serde_json::from_str(json).unwrap();
        assert_eq!(
            input,
            WindowInput::OcrCapture(OverlayInput::KeyDown(KeyEvent::plain("Escape")))
        );
    }
}
