//! Core formatting traits and the plain text implementation

use crate::stats::{ClientReport, ProtocolEndpoints, StatisticsReport};
use std::fmt::Write as _;

/// Semantic role of a rendered line, used for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    Separator,
    Heading,
    Counters,
    Active,
    Potential,
    Inactive,
    Notice,
    Warning,
    Error,
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Width of the `=` separator lines
    pub separator_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            separator_width: crate::defaults::SEPARATOR_LINE_SIZE,
        }
    }
}

/// Renders reports and notices as text
///
/// Implementors usually only decide how a line of a given role looks;
/// the layout lives in the provided methods.
pub trait ReportFormatter: Send + Sync {
    fn options(&self) -> &FormattingOptions;

    /// Style one line
    fn paint(&self, role: LineRole, text: &str) -> String;

    fn format_disclaimer(&self, test_name: &str) -> String {
        let separator = self.separator();
        let mut out = String::new();
        let _ = writeln!(out, "{}", separator);
        let _ = writeln!(out, "{}", self.paint(LineRole::Heading, &format!("{}: legal notice", test_name)));
        let _ = writeln!(
            out,
            "{}",
            self.paint(
                LineRole::Notice,
                "Only probe networks and devices you own or are explicitly authorised to test."
            )
        );
        let _ = writeln!(
            out,
            "{}",
            self.paint(
                LineRole::Notice,
                "Probing third-party systems without permission may be illegal in your jurisdiction."
            )
        );
        let _ = write!(out, "{}", separator);
        out
    }

    fn format_statistics(&self, report: &StatisticsReport) -> String {
        let mut lines = vec![
            self.separator(),
            self.paint(LineRole::Heading, "Test statistics:"),
            self.paint(
                LineRole::Counters,
                &format!(
                    "Messages sent: {}, responses received: {}, {:.0}% message loss, test time: {} ms",
                    report.packets_sent,
                    report.packets_received,
                    report.message_loss_percent,
                    report.test_time_ms
                ),
            ),
        ];

        if let Some(rtt) = &report.rtt {
            lines.push(self.paint(
                LineRole::Counters,
                &format!(
                    "Round-Trip Time (min/avg/max): {} / {:.0} / {} ms",
                    rtt.min_ms, rtt.avg_ms, rtt.max_ms
                ),
            ));
        }

        if let Some(classification) = &report.classification {
            lines.push(self.separator());
            lines.push(self.paint(LineRole::Heading, "Test results:"));

            lines.push(self.paint(LineRole::Active, &format!("{}:", classification.positive_label)));
            lines.extend(protocol_lines(&classification.active).map(|l| self.paint(LineRole::Active, &l)));
            lines.push(self.paint(
                LineRole::Active,
                &format!(
                    "Total number of {}: {}",
                    classification.positive_label.to_lowercase(),
                    classification.total_active
                ),
            ));

            if !classification.potential.is_empty() {
                lines.push(self.paint(LineRole::Potential, &format!("{}:", classification.potential_label)));
                lines.extend(
                    protocol_lines(&classification.potential).map(|l| self.paint(LineRole::Potential, &l)),
                );
                lines.push(self.paint(
                    LineRole::Potential,
                    &format!(
                        "Total number of {}: {}",
                        classification.potential_label.to_lowercase(),
                        classification.total_potential
                    ),
                ));
            }

            lines.push(self.paint(
                LineRole::Inactive,
                &format!("{}: {}", classification.negative_label, classification.total_inactive),
            ));
        }

        lines.join("\n")
    }

    fn format_client_statistics(&self, report: &ClientReport) -> String {
        [
            self.separator(),
            self.paint(LineRole::Heading, "Test statistics:"),
            self.paint(
                LineRole::Counters,
                &format!(
                    "Requests received: {}, payloads sent: {}, test time: {} ms",
                    report.requests_received, report.payloads_sent, report.test_time_ms
                ),
            ),
        ]
        .join("\n")
    }

    fn format_warning(&self, warning: &str) -> String {
        self.paint(LineRole::Warning, &format!("Warning: {}", warning))
    }

    fn format_error(&self, error: &str) -> String {
        self.paint(LineRole::Error, &format!("Error: {}", error))
    }

    fn separator(&self) -> String {
        self.paint(LineRole::Separator, &"=".repeat(self.options().separator_width))
    }
}

fn protocol_lines(entries: &[ProtocolEndpoints]) -> impl Iterator<Item = String> + '_ {
    entries
        .iter()
        .map(|entry| format!("    For {}: [{}]", entry.protocol, entry.endpoints.join(", ")))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }
}

impl ReportFormatter for PlainFormatter {
    fn options(&self) -> &FormattingOptions {
        &self.options
    }

    fn paint(&self, _role: LineRole, text: &str) -> String {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultLabels;
    use crate::stats::TestStatistics;
    use crate::types::Protocol;

    fn formatter() -> PlainFormatter {
        PlainFormatter::new(FormattingOptions {
            enable_color: false,
            ..FormattingOptions::default()
        })
    }

    #[test]
    fn test_statistics_without_responses() {
        let mut stats = TestStatistics::new();
        stats.packets_sent = 1;
        stats.add_inactive(Protocol::Coap, "192.0.2.1:5683".to_string());

        let text = formatter().format_statistics(&stats.report("t", &ResultLabels::default()));

        assert!(text.starts_with(&"=".repeat(80)));
        assert!(text.contains("Messages sent: 1, responses received: 0, 100% message loss"));
        assert!(!text.contains("Round-Trip Time"));
        assert!(text.contains("Total number of active endpoints: 0"));
        assert!(text.contains("Inactive endpoints: 1"));
        assert!(!text.contains("tested manually"));
    }

    #[test]
    fn test_statistics_with_results() {
        let mut stats = TestStatistics::new();
        stats.packets_sent = 2;
        stats.packets_received = 2;
        stats.packets_rtt = vec![3, 5];
        stats.add_active(Protocol::Mqtt, "127.0.0.1:1883".to_string());
        stats.add_potential(Protocol::Rtsp, "127.0.0.1:554".to_string());

        let text = formatter().format_statistics(&stats.report("t", &ResultLabels::default()));

        assert!(text.contains("Round-Trip Time (min/avg/max): 3 / 4 / 5 ms"));
        assert!(text.contains("    For MQTT: [127.0.0.1:1883]"));
        assert!(text.contains("Results that needs to be tested manually:"));
        assert!(text.contains("    For RTSP: [127.0.0.1:554]"));
        assert!(text.contains("Total number of results that needs to be tested manually: 1"));
    }

    #[test]
    fn test_no_positive_label_skips_results() {
        let stats = TestStatistics::new();
        let labels = ResultLabels {
            positive: None,
            ..ResultLabels::default()
        };
        let text = formatter().format_statistics(&stats.report("t", &labels));
        assert!(!text.contains("Test results:"));
    }

    #[test]
    fn test_client_statistics() {
        let mut stats = TestStatistics::new();
        stats.packets_received = 4;
        stats.packets_sent = 4;

        let text = formatter().format_client_statistics(&stats.client_report("server"));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "Test statistics:");
        assert!(lines[2].starts_with("Requests received: 4, payloads sent: 4, test time: "));
        assert!(lines[2].ends_with(" ms"));
    }

    #[test]
    fn test_disclaimer_and_notices() {
        let f = formatter();
        assert!(f.format_disclaimer("CoAP sweep").contains("CoAP sweep: legal notice"));
        assert_eq!(f.format_warning("w"), "Warning: w");
        assert_eq!(f.format_error("e"), "Error: e");
    }
}
