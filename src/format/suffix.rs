//! Suffix composition: amount + period/per-capita markers wrapped in the
//! template selected by the display style.

use crate::format::amount::{format_value, parse_amount};
use crate::preferences::{DisplayStyle, Preferences};

/// Appended when amounts are shown per month
pub const PER_MONTH_MARKER: &str = "/mois";

/// Appended when amounts are shown per inhabitant
pub const PER_PERSON_MARKER: &str = "/hab.";

/// Scaling switches applied before rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatFlags {
    pub per_month: bool,
    pub per_person: bool,
    pub population: f64,
}

impl FormatFlags {
    pub fn from_preferences(prefs: &Preferences, population: f64) -> Self {
        Self {
            per_month: prefs.show_per_month,
            per_person: prefs.show_per_person,
            population,
        }
    }
}

/// Wrap an already formatted amount in the style's template
pub fn render_template(style: DisplayStyle, amount: &str) -> String {
    match style {
        DisplayStyle::Brackets => format!(" [{} public]", amount),
        DisplayStyle::Visual => format!(" (💰 {})", amount),
        DisplayStyle::Minimalist => format!(" ({})", amount),
        DisplayStyle::Full => format!(" ({} d’argent public en 2024)", amount),
        DisplayStyle::Concise => format!(" ({} public '23)", amount),
    }
}

/// Formatted amount with its markers, without the template
pub fn formatted_amount(raw: &str, flags: FormatFlags) -> String {
    let mut value = parse_amount(raw);
    if flags.per_person {
        value /= flags.population;
    }
    if flags.per_month {
        value /= 12.0;
    }

    let mut amount = format_value(value, flags.per_person);
    if flags.per_month {
        amount.push_str(PER_MONTH_MARKER);
    }
    if flags.per_person {
        amount.push_str(PER_PERSON_MARKER);
    }
    amount
}

/// Full suffix for a raw amount
pub fn formatted_suffix(raw: &str, style: DisplayStyle, flags: FormatFlags) -> String {
    render_template(style, &formatted_amount(raw, flags))
}

/// Suffix renderer bound to one preference snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuffixFormatter {
    style: DisplayStyle,
    flags: FormatFlags,
}

impl SuffixFormatter {
    pub fn new(prefs: &Preferences, population: f64) -> Self {
        Self {
            style: prefs.display_style,
            flags: FormatFlags::from_preferences(prefs, population),
        }
    }

    pub fn style(&self) -> DisplayStyle {
        self.style
    }

    pub fn flags(&self) -> FormatFlags {
        self.flags
    }

    pub fn suffix(&self, raw: &str) -> String {
        formatted_suffix(raw, self.style, self.flags)
    }
}
