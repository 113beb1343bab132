//! Closed widget-kind dispatch.
//!
//! The server names a control's widget type with a free-form string. It is
//! resolved once into [`WidgetKind`]; strings nobody recognizes land in
//! [`WidgetKind::Unknown`] instead of failing.

use std::fmt;

/// Widget catalog known to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Button,
    Switch,
    Slider,
    Numeric,
    TextInput,
    Dropdown,
    DatePicker,
    ColourPicker,
    Text,
    Gauge,
    Chart,
    Form,
    Template,
    Audio,
    Link,
    Spacer,
    /// Unrecognized type string, kept verbatim for diagnostics.
    Unknown(String),
}

impl WidgetKind {
    /// Resolve a raw type string.
    ///
    /// Case-insensitive; a `ui_`/`ui-` prefix is ignored and `_` is treated as `-`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase().replace('_', "-");
        let name = lowered.strip_prefix("ui-").unwrap_or(&lowered);
        match name {
            "button" => Self::Button,
            "switch" | "toggle" => Self::Switch,
            "slider" => Self::Slider,
            "numeric" | "number" => Self::Numeric,
            "text-input" | "textinput" | "text-input-cm" => Self::TextInput,
            "dropdown" | "select" => Self::Dropdown,
            "date-picker" | "datepicker" => Self::DatePicker,
            "colour-picker" | "color-picker" | "colourpicker" | "colorpicker" => {
                Self::ColourPicker
            }
            "text" => Self::Text,
            "gauge" => Self::Gauge,
            "chart" => Self::Chart,
            "form" => Self::Form,
            "template" => Self::Template,
            "audio" => Self::Audio,
            "link" => Self::Link,
            "spacer" => Self::Spacer,
            _ => Self::Unknown(raw.to_owned()),
        }
    }

    /// Widgets whose user input arrives continuously (drag, typing) and whose
    /// outbound emits are debounced.
    #[must_use]
    pub const fn is_high_frequency(&self) -> bool {
        matches!(
            self,
            Self::Slider | Self::Numeric | Self::TextInput | Self::ColourPicker
        )
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Button => "button",
            Self::Switch => "switch",
            Self::Slider => "slider",
            Self::Numeric => "numeric",
            Self::TextInput => "text-input",
            Self::Dropdown => "dropdown",
            Self::DatePicker => "date-picker",
            Self::ColourPicker => "colour-picker",
            Self::Text => "text",
            Self::Gauge => "gauge",
            Self::Chart => "chart",
            Self::Form => "form",
            Self::Template => "template",
            Self::Audio => "audio",
            Self::Link => "link",
            Self::Spacer => "spacer",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
