//! Configuration validation utilities and rules
//!
//! [`Config::validate`] rejects configurations that cannot run at all; the
//! checks here flag settings that run but probably do not do what the
//! operator expects.

use crate::{error::Result, models::Config, targets::TargetSpace, types::{Protocol, TransportKind}};
use colored::Colorize;
use std::net::{IpAddr, UdpSocket};

/// Configuration validator with advisory rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration and collect non-fatal warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;
        if config.client_test {
            return Self::validate_server(config);
        }
        let targets = config.target_space()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_source(config));
        warnings.extend(Self::validate_protocol_targets(config.protocol, &targets));
        warnings.extend(Self::validate_target_size(&targets));
        warnings.extend(Self::validate_timing(config));

        Ok(warnings)
    }

    /// A source address that cannot be bound locally is spoofed
    fn validate_source(config: &Config) -> Vec<ValidationWarning> {
        match config.source_address() {
            Some(address) if !Self::is_local_address(address) => vec![ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Source address {} is not assigned to this host; replies will not be received",
                    address
                ),
            )],
            _ => Vec::new(),
        }
    }

    fn validate_server(config: &Config) -> Result<Vec<ValidationWarning>> {
        let endpoint = config.server_endpoint()?;
        let mut warnings = Vec::new();

        if endpoint.port < 1024 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Listening on port {} may need elevated privileges", endpoint.port),
            ));
        }
        if config.retries > 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Retries do not apply to client tests".to_string(),
            ));
        }

        Ok(warnings)
    }

    fn validate_protocol_targets(protocol: Protocol, targets: &TargetSpace) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if targets.has_ipv6() && matches!(protocol, Protocol::Ssdp | Protocol::All) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "SSDP queries are IPv4 only; IPv6 targets will not be probed over SSDP".to_string(),
            ));
        }

        warnings
    }

    fn validate_target_size(targets: &TargetSpace) -> Vec<ValidationWarning> {
        let pairs = targets.len();
        if pairs > crate::defaults::LARGE_TARGET_SPACE {
            vec![ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Target space has {} address/port pairs and may take a long time", pairs),
            )]
        } else {
            Vec::new()
        }
    }

    fn validate_timing(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.timeout_seconds == 0.0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Timeout of 0s leaves no time for replies".to_string(),
            ));
        }

        let connection_bound = matches!(
            config.protocol.transport(),
            Some(TransportKind::ConnectionOriented | TransportKind::MulticastQuery)
        );
        if config.retries > 0 && connection_bound {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Retries only apply to connectionless probes, not {}", config.protocol),
            ));
        }

        warnings
    }

    fn is_local_address(address: IpAddr) -> bool {
        address.is_unspecified()
            || address.is_loopback()
            || UdpSocket::bind((address, 0)).is_ok()
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if !use_color {
            return format!("{} {}", tag, self.message);
        }
        let tag = match self.level {
            ValidationLevel::Info => tag.blue(),
            ValidationLevel::Warning => tag.yellow(),
            ValidationLevel::Error => tag.red(),
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
