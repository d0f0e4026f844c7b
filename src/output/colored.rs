//! Colored formatter implementation with terminal color support

use super::formatter::{FormattingOptions, LineRole, ReportFormatter};
use colored::*;

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub separator: Color,
    pub header: Color,
    pub counters: Color,
    pub active: Color,
    pub potential: Color,
    pub inactive: Color,
    pub notice: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            separator: Color::BrightBlack,
            header: Color::Blue,
            counters: Color::Cyan,
            active: Color::Green,
            potential: Color::Yellow,
            inactive: Color::BrightBlack,
            notice: Color::Magenta,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    pub fn with_color_scheme(mut self, color_scheme: ColorScheme) -> Self {
        self.color_scheme = color_scheme;
        self
    }
}

impl ReportFormatter for ColoredFormatter {
    fn options(&self) -> &FormattingOptions {
        &self.options
    }

    fn paint(&self, role: LineRole, text: &str) -> String {
        if !self.options.enable_color {
            return text.to_string();
        }
        let scheme = &self.color_scheme;
        match role {
            LineRole::Separator => text.color(scheme.separator).to_string(),
            LineRole::Heading => text.color(scheme.header).bold().to_string(),
            LineRole::Counters => text.color(scheme.counters).to_string(),
            LineRole::Active => text.color(scheme.active).to_string(),
            LineRole::Potential => text.color(scheme.potential).to_string(),
            LineRole::Inactive => text.color(scheme.inactive).to_string(),
            LineRole::Notice => text.color(scheme.notice).to_string(),
            LineRole::Warning => text.color(scheme.warning).bold().to_string(),
            LineRole::Error => text.color(scheme.error).bold().to_string(),
        }
    }
}
