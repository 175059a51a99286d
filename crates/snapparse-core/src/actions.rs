use snapparse_config::Settings;
use snapparse_types::{ActionBarAction, BuiltinActionId, WindowKind};

const CUSTOM_ACTION_ICON: &str = "sparkles";

struct BuiltinMeta {
    label: &'static str,
    icon: &'static str,
    window: Option<WindowKind>,
}

fn builtin_meta(id: BuiltinActionId) -> BuiltinMeta {
    let (label, icon, window) = match id {
        BuiltinActionId::Translate => ("翻译", "translate", Some(WindowKind::Translate)),
        BuiltinActionId::Explain => ("解释", "explain", Some(WindowKind::Explain)),
        BuiltinActionId::Summarize => ("总结", "summarize", Some(WindowKind::Summary)),
        BuiltinActionId::Optimize => ("优化", "optimize", Some(WindowKind::Optimize)),
        BuiltinActionId::Search => ("搜索", "search", None),
        BuiltinActionId::Copy => ("复制", "copy", None),
    };
    BuiltinMeta {
        label,
        icon,
        window,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Ordered, enabled toolbar entries for a settings snapshot
///
/// Built-ins come first in their configured order, then enabled custom
/// actions in theirs. `features.custom_actions_enabled` is deliberately not
/// consulted here: it only gates creating new custom actions.
pub fn resolve_actions(settings: &Settings) -> Vec<ActionBarAction> {
    let mut builtins: Vec<_> = settings
        .toolbar
        .actions
        .iter()
        .filter(|action| action.enabled)
        .collect();
    builtins.sort_by_key(|action| action.order);

    let mut customs: Vec<_> = settings
        .features
        .custom_actions
        .iter()
        .filter(|action| action.enabled)
        .collect();
    customs.sort_by_key(|action| action.order);

    let builtins = builtins.into_iter().map(|action| {
        let meta = builtin_meta(action.id);
        ActionBarAction {
            id: action.id.as_str().to_string(),
            label: meta.label.to_string(),
            icon: meta.icon.to_string(),
            builtin_id: Some(action.id),
            command_window: meta.window,
            prompt: None,
            model: None,
        }
    });

    let customs = customs.into_iter().map(|action| ActionBarAction {
        id: action.id.clone(),
        label: action.name.clone(),
        icon: non_empty(&action.icon).unwrap_or_else(|| CUSTOM_ACTION_ICON.to_string()),
        builtin_id: None,
        command_window: Some(WindowKind::Optimize),
        prompt: non_empty(&action.prompt),
        model: non_empty(&action.model),
    });

    builtins.chain(customs).collect()
}

#[cfg(test)]
mod tests {
    use snapparse_config::settings::features::CustomAction;

    use super::*;

    fn custom(id: &str, name: &str, enabled: bool, order: u16) -> CustomAction {
        CustomAction {
            id: id.to_string(),
            name: name.to_string(),
            icon: String::new(),
            prompt: "  polish this  ".to_string(),
            model: String::new(),
            enabled,
            order,
        }
    }

    #[test]
    fn defaults_resolve_in_configured_order() {
        let ids: Vec<_> = resolve_actions(&Settings::default())
            .into_iter()
            .map(|action| action.id)
            .collect();
        assert_eq!(
            ids,
            ["translate", "explain", "summarize", "optimize", "search", "copy"]
        );
    }

    #[test]
    fn builtins_sort_by_order_and_map_to_fixed_windows() {
        let mut settings = Settings::default();
        for action in &mut settings.toolbar.actions {
            action.order = match action.id {
                BuiltinActionId::Summarize => 0,
                BuiltinActionId::Translate => 9,
                _ => action.order + 1,
            };
        }
        let actions = resolve_actions(&settings);
        assert_eq!(actions[0].id, "summarize");
        assert_eq!(actions[0].command_window, Some(WindowKind::Summary));
        assert_eq!(actions.last().unwrap().id, "translate");

        let search = actions.iter().find(|a| a.id == "search").unwrap();
        assert_eq!(search.command_window, None);
    }

    #[test]
    fn disabled_copy_and_enabled_custom_action_with_toggle_off() {
        let mut settings = Settings::default();
        for action in &mut settings.toolbar.actions {
            if action.id == BuiltinActionId::Copy {
                action.enabled = false;
            }
        }
        settings.features.custom_actions_enabled = false;
        settings.features.custom_actions = vec![
            custom("c-2", "商务润色", true, 2),
            custom("c-1", "disabled one", false, 1),
        ];

        let actions = resolve_actions(&settings);
        assert!(actions.iter().all(|a| a.id != "copy"));

        let polish = actions.last().unwrap();
        assert_eq!(polish.label, "商务润色");
        assert_eq!(polish.command_window, Some(WindowKind::Optimize));
        assert_eq!(polish.builtin_id, None);
        assert_eq!(polish.prompt.as_deref(), Some("polish this"));
        assert_eq!(polish.model, None);
        assert_eq!(polish.icon, CUSTOM_ACTION_ICON);
        assert!(actions.iter().all(|a| a.label != "disabled one"));
    }

    #[test]
    fn custom_actions_follow_their_own_order() {
        let mut settings = Settings::default();
        settings.features.custom_actions = vec![
            custom("late", "Late", true, 5),
            custom("early", "Early", true, 0),
        ];
        let ids: Vec<_> = resolve_actions(&settings)
            .into_iter()
            .skip(6)
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, ["early", "late"]);
    }
}
