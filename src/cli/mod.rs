//! Command-line interface

use crate::config::EnvManager;
use crate::types::Protocol;
use clap::Parser;
use std::path::PathBuf;

/// Multi-protocol network probe: sends protocol probes to every address and
/// port of a target space and reports which endpoints answered
#[derive(Parser, Debug, Clone)]
#[command(name = "nprobe")]
#[command(version, about, long_about = None)]
#[command(disable_version_flag = true)]
#[command(after_long_help = EnvManager::display_env_help())]
pub struct Cli {
    /// Destination addresses and CIDR blocks, comma separated (e.g. 10.0.0.1,10.0.0.0/30)
    #[arg(value_name = "DEST_IP", required_unless_present = "serve")]
    pub dest_ip: Option<String>,

    /// Destination ports and ranges, comma separated (e.g. 80,443,8000-8010);
    /// defaults to the protocol's well-known port
    #[arg(value_name = "DEST_PORT")]
    pub dest_port: Option<String>,

    /// Protocol to probe [default: all]
    #[arg(short = 'P', long, value_enum, ignore_case = true)]
    pub protocol: Option<Protocol>,

    /// File holding the probe payload
    #[arg(long, value_name = "FILE")]
    pub payload: Option<PathBuf>,

    /// Retransmissions after the first attempt [default: 0]
    #[arg(short = 'R', long)]
    pub retries: Option<u32>,

    /// Per-attempt timeout in seconds [default: 1]
    #[arg(short = 'T', long, value_parser = parse_timeout)]
    pub timeout: Option<f64>,

    /// Enable verbose output
    #[arg(short = 'V', long, visible_alias = "debug", visible_short_alias = 'D')]
    pub verbose: bool,

    /// Skip the legal disclaimer
    #[arg(long)]
    pub hide_disclaimer: bool,

    /// Source address for outgoing probes
    #[arg(long, value_name = "ADDRESS")]
    pub src_ip: Option<String>,

    /// Source port for outgoing probes
    #[arg(long, value_name = "PORT")]
    pub src_port: Option<u16>,

    /// Probe even when the destination does not answer pings
    #[arg(long)]
    pub ignore_ping_check: bool,

    /// Run DTLS probes inside a DTLS session
    #[arg(long)]
    pub secure: bool,

    /// Print each payload before it is sent
    #[arg(long)]
    pub display: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Also print the final report as JSON
    #[arg(long)]
    pub json: bool,

    /// Test clients instead of probing: listen and answer every request with the payload
    #[arg(long, conflicts_with_all = ["dest_ip", "dest_port"])]
    pub serve: bool,

    /// Address the client-test server listens on [default: 0.0.0.0]
    #[arg(long, value_name = "ADDRESS", requires = "serve")]
    pub server_ip: Option<String>,

    /// Port the client-test server listens on [default: protocol port]
    #[arg(long, value_name = "PORT", requires = "serve")]
    pub server_port: Option<u32>,

    /// Stop the client-test server after this many requests
    #[arg(long, value_name = "COUNT", requires = "serve")]
    pub max_requests: Option<u64>,
}

impl Cli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Command line:\n");
        if let Some(ref dest_ip) = self.dest_ip {
            summary.push_str(&format!("  Destination: {}\n", dest_ip));
        }
        if self.serve {
            summary.push_str(&format!(
                "  Client test on: {}:{}\n",
                self.server_ip.as_deref().unwrap_or(crate::defaults::DEFAULT_SERVER_IP),
                self.server_port
                    .map(|port| port.to_string())
                    .unwrap_or_else(|| "(protocol default)".to_string())
            ));
        }
        if let Some(ref ports) = self.dest_port {
            summary.push_str(&format!("  Ports: {}\n", ports));
        }
        if let Some(protocol) = self.protocol {
            summary.push_str(&format!("  Protocol: {}\n", protocol));
        }
        if let Some(ref payload) = self.payload {
            summary.push_str(&format!("  Payload file: {}\n", payload.display()));
        }
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));

        summary
    }
}

/// Parse a non-negative timeout in seconds
fn parse_timeout(s: &str) -> Result<f64, String> {
    let secs = s
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Invalid timeout: {}", s))?;

    if !secs.is_finite() || secs < 0.0 {
        Err(format!("Timeout must be a non-negative number of seconds: {}", s))
    } else if secs > crate::defaults::MAX_TIMEOUT_SECONDS {
        Err(format!(
            "Timeout cannot exceed {} seconds",
            crate::defaults::MAX_TIMEOUT_SECONDS
        ))
    } else {
        Ok(secs)
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    true
}
