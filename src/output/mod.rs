//! Output formatting and display system
//!
//! Formatters turn reports into text; presenters decide where the text goes.

mod colored;
mod formatter;

pub use self::colored::{ColorScheme, ColoredFormatter};
pub use self::formatter::{FormattingOptions, LineRole, PlainFormatter, ReportFormatter};

use crate::stats::{ClientReport, StatisticsReport};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool) -> Box<dyn ReportFormatter> {
        let options = FormattingOptions {
            enable_color,
            ..FormattingOptions::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn ReportFormatter> {
        Self::create_formatter(false)
    }
}

/// Where the orchestrator sends the disclaimer and the final report
pub trait Presenter: Send + Sync {
    fn show_disclaimer(&self, test_name: &str);
    fn print_statistics(&self, report: &StatisticsReport);
    fn print_client_statistics(&self, report: &ClientReport);
}

/// Presenter writing to standard output
pub struct ConsolePresenter {
    formatter: Box<dyn ReportFormatter>,
    json: bool,
}

impl ConsolePresenter {
    pub fn new(formatter: Box<dyn ReportFormatter>) -> Self {
        Self {
            formatter,
            json: false,
        }
    }

    /// Presenter for the given color preference
    pub fn with_color(enable_color: bool) -> Self {
        Self::new(OutputFormatterFactory::create_formatter(enable_color))
    }

    /// Also print the report as JSON
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn formatter(&self) -> &dyn ReportFormatter {
        self.formatter.as_ref()
    }
}

impl Default for ConsolePresenter {
    fn default() -> Self {
        Self::with_color(crate::defaults::DEFAULT_ENABLE_COLOR)
    }
}

impl Presenter for ConsolePresenter {
    fn show_disclaimer(&self, test_name: &str) {
        println!("{}", self.formatter.format_disclaimer(test_name));
    }

    fn print_statistics(&self, report: &StatisticsReport) {
        println!("{}", self.formatter.format_statistics(report));
        if self.json {
            match report.export_json() {
                Ok(json) => println!("{}", json),
                Err(error) => eprintln!("{}", self.formatter.format_error(&error.to_string())),
            }
        }
    }

    fn print_client_statistics(&self, report: &ClientReport) {
        println!("{}", self.formatter.format_client_statistics(report));
        if self.json {
            match report.export_json() {
                Ok(json) => println!("{}", json),
                Err(error) => eprintln!("{}", self.formatter.format_error(&error.to_string())),
            }
        }
    }
}
