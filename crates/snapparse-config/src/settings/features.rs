use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeaturesSettings {
    /// Gates adding new custom actions in the settings UI only; already
    /// enabled custom actions stay on the bar whatever this says
    pub custom_actions_enabled: bool,
    pub custom_actions: Vec<CustomAction>,
}

/// User-authored action that always runs in the optimize window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAction {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub prompt: String,
    #[serde(default)]
    pub model: String,
    pub enabled: bool,
    #[serde(default)]
    pub order: u16,
}
