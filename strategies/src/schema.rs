//! Typed projection of the strategy config schema tree (§6): a tree of controls a host can
//! render into an editing form. This crate only defines the tree and its JSON shape — no
//! renderer lives here.

use serde::{Deserialize, Serialize};

/// Visibility rule for a control: referencing another control by name. At most one of
/// `show_if`/`hide_if` is expected to be set; both are allowed to be absent (always visible).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    /// Name of a boolean-ish control that must be truthy for this control to be shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_if: Option<String>,
    /// Name of a boolean-ish control that, if truthy, hides this control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_if: Option<String>,
}

/// One entry in a [`Select`](Control::Select) control's option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// A single control in the config schema tree, tagged by `type` in its JSON projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Control {
    /// A named collection of child controls, rendered together.
    Group {
        name: String,
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
        children: Vec<Control>,
    },
    /// A visual grouping lighter than [`Group`](Self::Group) — no independent identity.
    Section {
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
        children: Vec<Control>,
    },
    /// Several controls laid out as one logical unit (e.g. a price + a unit selector).
    Compound {
        name: String,
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
        children: Vec<Control>,
    },
    /// Read-only label text, no value.
    Text {
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
    },
    /// A single-line text value.
    TextInput {
        name: String,
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
        #[serde(skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    /// A multi-line text value.
    TextArea {
        name: String,
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
        #[serde(skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    /// A numeric value with optional bounds.
    Number {
        name: String,
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        default: Option<f64>,
    },
    /// A numeric value constrained to `[min, max]`, rendered as a slider.
    Slider {
        name: String,
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
        min: f64,
        max: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        default: Option<f64>,
    },
    /// A boolean toggle.
    Checkbox {
        name: String,
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
        #[serde(default)]
        default: bool,
    },
    /// A single choice among [`SelectOption`]s.
    Select {
        name: String,
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
        options: Vec<SelectOption>,
        #[serde(skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    /// A calendar date value (no time component).
    Date {
        name: String,
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
    },
    /// A time-of-day value (no date component).
    Time {
        name: String,
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
    },
    /// A timezone picker.
    TimezoneSelect {
        name: String,
        label: String,
        #[serde(default, flatten)]
        visibility: Visibility,
    },
}

/// The root of a strategy's config schema: an ordered list of top-level controls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub controls: Vec<Control>,
}

impl ConfigSchema {
    pub fn new(controls: Vec<Control>) -> Self {
        Self { controls }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_schema_serializes_to_empty_array() {
        let schema = ConfigSchema::default();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json, serde_json::json!({"controls": []}));
    }

    #[test]
    fn checkbox_gates_visibility_of_a_sibling() {
        let schema = ConfigSchema::new(vec![
            Control::Checkbox {
                name: "use_stop".into(),
                label: "Use stop loss".into(),
                visibility: Visibility::default(),
                default: false,
            },
            Control::Number {
                name: "stop_distance".into(),
                label: "Stop distance".into(),
                visibility: Visibility {
                    show_if: Some("use_stop".into()),
                    hide_if: None,
                },
                min: Some(0.0),
                max: None,
                default: None,
            },
        ]);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["controls"][1]["show_if"], "use_stop");
    }

    #[test]
    fn round_trips_through_json() {
        let schema = ConfigSchema::new(vec![Control::Select {
            name: "mode".into(),
            label: "Mode".into(),
            visibility: Visibility::default(),
            options: vec![SelectOption {
                value: "aggressive".into(),
                label: "Aggressive".into(),
            }],
            default: Some("aggressive".into()),
        }]);
        let json = serde_json::to_string(&schema).unwrap();
        let back: ConfigSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
