//! Maps element events inside the page to dashboard [`Input`]s.

use gymdash::config_sync::CONFIG_SELECT_ID;
use gymdash::environment::{CHARACTERS_ID, GAME_SELECT_ID};
use gymdash::form::{FieldName, ToggleGroup};
use gymdash::session::{FieldRef, Input};
use gymdash::shaders::SHADER_KEYS;
use gymdash::ui_model::Page;

use crate::scan::{
    CALLBACK_CHECKBOX, FILTER_KEY_CHECKBOX, SELECT_ALL_KEYS_ID, WRAPPER_CHECKBOX,
};

pub const SHADER_ALL_ID: &str = "shader-all-toggle";
pub const TOKEN_FORM_ID: &str = "update-token-form";
pub const TOKEN_INPUT_ID: &str = "token";
pub const TOOLTIP_ICON: &str = "tooltip-icon";

/// Element id of the switch for one shader effect.
pub fn shader_id(key: &str) -> String {
    format!("shader-{}", key.replace('_', "-"))
}

fn shader_key(id: &str) -> Option<&'static str> {
    let suffix = id.strip_prefix("shader-")?;
    SHADER_KEYS
        .into_iter()
        .find(|key| key.replace('_', "-") == suffix)
}

/// The parts of an event target the dashboard cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub id: Option<String>,
    pub name: Option<String>,
    pub classes: Vec<String>,
    pub value: String,
    pub checkbox: bool,
    pub checked: bool,
    /// `data-tooltip-key`.
    pub tooltip_key: Option<String>,
}

impl Target {
    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn field_ref(&self) -> Option<FieldRef> {
        if let Some(name) = self.name.as_deref().and_then(|n| n.parse::<FieldName>().ok()) {
            return Some(FieldRef::Name(name));
        }
        self.id.clone().map(FieldRef::Id)
    }
}

/// A `change` on a control of the mounted page.
pub fn on_change(target: &Target) -> Option<Input> {
    let id = target.id.as_deref().unwrap_or_default();
    match id {
        CONFIG_SELECT_ID => return Some(Input::SelectConfig(target.value.clone())),
        GAME_SELECT_ID => return Some(Input::GameChanged(target.value.clone())),
        SELECT_ALL_KEYS_ID => return Some(Input::FilterKeysAll(target.checked)),
        SHADER_ALL_ID => return Some(Input::ToggleAllShaders(target.checked)),
        _ => {}
    }
    if let Some(key) = shader_key(id) {
        return Some(Input::ToggleShader {
            key: key.to_string(),
            enabled: target.checked,
        });
    }

    if target.has_class(FILTER_KEY_CHECKBOX) {
        return Some(Input::FilterKey {
            key: target.value.clone(),
            checked: target.checked,
        });
    }
    for (class, group) in [
        (WRAPPER_CHECKBOX, ToggleGroup::Wrappers),
        (CALLBACK_CHECKBOX, ToggleGroup::Callbacks),
    ] {
        if target.has_class(class) {
            return Some(Input::SetToggle {
                group,
                value: target.value.clone(),
                checked: target.checked,
            });
        }
    }

    let field = target.field_ref()?;
    Some(if target.checkbox {
        Input::SetChecked {
            field,
            checked: target.checked,
        }
    } else {
        Input::SetField {
            field,
            value: target.value.clone(),
        }
    })
}

/// What a click inside the page asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Click {
    Input(Input),
    /// Save the active config; the host asks for a name when a new one is
    /// needed.
    Save,
}

pub fn on_click(target: &Target) -> Option<Click> {
    if target.has_class(TOOLTIP_ICON) {
        return target
            .tooltip_key
            .clone()
            .map(|key| Click::Input(Input::OpenTooltip(key)));
    }
    let input = match target.id.as_deref()? {
        "start-training" => Input::StartTraining,
        "stop-training" => Input::StopTraining,
        "load-config" => Input::LoadConfig,
        "save-changes" => return Some(Click::Save),
        "delete-config" => Input::DeleteConfig,
        "open-checkpoints" => Input::OpenCheckpoints,
        "open-logs" => Input::OpenLogs,
        CHARACTERS_ID => Input::OpenCharacterModal,
        id => {
            let page = Page::all().iter().find(|p| p.link_id() == id)?;
            Input::Navigate(*page)
        }
    };
    Some(Click::Input(input))
}

/// Whether a scrolled log pane is at its bottom edge.
pub fn at_bottom(scroll_height: i32, scroll_top: i32, client_height: i32) -> bool {
    scroll_height - scroll_top - client_height <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_id(id: &str) -> Target {
        Target {
            id: Some(id.to_string()),
            ..Target::default()
        }
    }

    #[test]
    fn selector_and_game_changes_route_by_id() {
        let mut target = by_id(CONFIG_SELECT_ID);
        target.value = "alpha".into();
        assert_eq!(on_change(&target), Some(Input::SelectConfig("alpha".into())));

        let mut target = by_id(GAME_SELECT_ID);
        target.name = Some("env_settings[game_id]".into());
        target.value = "kof98umh".into();
        assert_eq!(on_change(&target), Some(Input::GameChanged("kof98umh".into())));
    }

    #[test]
    fn shader_switches_map_to_their_keys() {
        let mut target = by_id("shader-rolling-lines");
        target.checkbox = true;
        target.checked = true;
        assert_eq!(
            on_change(&target),
            Some(Input::ToggleShader {
                key: "rolling_lines".into(),
                enabled: true
            })
        );
        assert_eq!(shader_id("gamma_correction"), "shader-gamma-correction");
        assert_eq!(on_change(&by_id("shader-bloom")), Some(Input::SetField {
            field: FieldRef::Id("shader-bloom".into()),
            value: String::new(),
        }));
    }

    #[test]
    fn named_controls_prefer_the_typed_binding() {
        let target = Target {
            id: Some("n-steps".into()),
            name: Some("hyperparameters[n_steps]".into()),
            value: "512".into(),
            ..Target::default()
        };
        assert_eq!(
            on_change(&target),
            Some(Input::SetField {
                field: FieldName::hyper("n_steps").into(),
                value: "512".into()
            })
        );

        let target = Target {
            name: Some("hyperparameters[normalize_advantage]".into()),
            checkbox: true,
            checked: false,
            ..Target::default()
        };
        assert!(matches!(
            on_change(&target),
            Some(Input::SetChecked { checked: false, .. })
        ));
        assert_eq!(on_change(&Target::default()), None);
    }

    #[test]
    fn checkbox_groups() {
        let target = Target {
            classes: vec![FILTER_KEY_CHECKBOX.into()],
            value: "timer".into(),
            checkbox: true,
            ..Target::default()
        };
        assert_eq!(
            on_change(&target),
            Some(Input::FilterKey {
                key: "timer".into(),
                checked: false
            })
        );

        let target = Target {
            classes: vec!["form-check-input".into(), CALLBACK_CHECKBOX.into()],
            value: "checkpoint".into(),
            checkbox: true,
            checked: true,
            ..Target::default()
        };
        assert_eq!(
            on_change(&target),
            Some(Input::SetToggle {
                group: ToggleGroup::Callbacks,
                value: "checkpoint".into(),
                checked: true
            })
        );
    }

    #[test]
    fn clicks() {
        assert_eq!(on_click(&by_id("save-changes")), Some(Click::Save));
        assert_eq!(
            on_click(&by_id(CHARACTERS_ID)),
            Some(Click::Input(Input::OpenCharacterModal))
        );
        assert_eq!(
            on_click(&by_id("settings-link")),
            Some(Click::Input(Input::Navigate(Page::Settings)))
        );
        let icon = Target {
            classes: vec![TOOLTIP_ICON.into()],
            tooltip_key: Some("learning_rate".into()),
            ..Target::default()
        };
        assert_eq!(
            on_click(&icon),
            Some(Click::Input(Input::OpenTooltip("learning_rate".into())))
        );
        assert_eq!(on_click(&by_id("unrelated")), None);
        assert_eq!(on_click(&Target::default()), None);
    }

    #[test]
    fn bottom_detection_tolerates_subpixel_rounding() {
        assert!(at_bottom(1000, 600, 400));
        assert!(at_bottom(1000, 599, 400));
        assert!(!at_bottom(1000, 500, 400));
    }
}
