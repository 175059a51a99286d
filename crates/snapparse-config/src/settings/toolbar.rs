use serde::{Deserialize, Serialize};
use snapparse_types::BuiltinActionId;

fn default_trigger_hotkey() -> String {
    "Ctrl+Shift+Space".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    #[default]
    Selection,
    Ctrl,
    Hotkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolbarSettings {
    pub trigger_mode: TriggerMode,
    #[serde(default = "default_trigger_hotkey")]
    pub trigger_hotkey: String,
    pub theme_mode: ThemeMode,
    pub actions: Vec<ToolbarAction>,
}

impl Default for ToolbarSettings {
    fn default() -> Self {
        Self {
            trigger_mode: TriggerMode::default(),
            trigger_hotkey: default_trigger_hotkey(),
            theme_mode: ThemeMode::default(),
            actions: vec![
                ToolbarAction::new(BuiltinActionId::Translate, "翻译", 0),
                ToolbarAction::new(BuiltinActionId::Explain, "解释", 1),
                ToolbarAction::new(BuiltinActionId::Summarize, "总结", 2),
                ToolbarAction::new(BuiltinActionId::Optimize, "优化", 3),
                ToolbarAction::new(BuiltinActionId::Search, "搜索", 4),
                ToolbarAction::new(BuiltinActionId::Copy, "复制", 5),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarAction {
    pub id: BuiltinActionId,
    #[serde(default)]
    pub label: String,
    pub enabled: bool,
    pub order: u16,
}

impl ToolbarAction {
    pub fn new(id: BuiltinActionId, label: &str, order: u16) -> Self {
        Self {
            id,
            label: label.to_string(),
            enabled: true,
            order,
        }
    }
}
