//! Configuration data model and validation

use crate::models::Endpoint;
use crate::targets::TargetSpace;
use crate::types::{AppError, Protocol, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Destination address descriptor (addresses and CIDR blocks, comma separated)
    #[serde(default)]
    pub target_addresses: String,

    /// Destination port descriptor; the protocol's default port when absent
    #[serde(default)]
    pub target_ports: Option<String>,

    /// Protocol selector
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,

    /// File holding the probe payload
    #[serde(default)]
    pub payload_file: Option<PathBuf>,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: f64,

    /// Retransmissions after the first attempt (connectionless probes)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Source address override
    #[serde(default)]
    pub source_ip: Option<String>,

    /// Source port override
    #[serde(default)]
    pub source_port: Option<u16>,

    /// Show the legal disclaimer before probing
    #[serde(default = "default_show_disclaimer")]
    pub show_disclaimer: bool,

    #[serde(default)]
    pub ignore_ping_check: bool,

    /// Run DTLS probes inside a DTLS session
    #[serde(default)]
    pub wrap_secure_layer: bool,

    /// Print payloads as they are sent
    #[serde(default)]
    pub display_payload: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Also print the report as JSON
    #[serde(default)]
    pub json_report: bool,

    /// Act as a server answering clients instead of probing targets
    #[serde(default)]
    pub client_test: bool,

    /// Address the client-test server listens on
    #[serde(default = "default_server_ip")]
    pub server_ip: String,

    /// Port the client-test server listens on; the protocol's default port when absent
    #[serde(default)]
    pub server_port: Option<u32>,

    /// Stop the client-test server after this many requests
    #[serde(default)]
    pub max_requests: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_addresses: String::new(),
            target_ports: None,
            protocol: default_protocol(),
            payload_file: None,
            timeout_seconds: default_timeout_secs(),
            retries: default_retries(),
            source_ip: None,
            source_port: None,
            show_disclaimer: default_show_disclaimer(),
            ignore_ping_check: false,
            wrap_secure_layer: false,
            display_payload: false,
            enable_color: default_enable_color(),
            verbose: false,
            json_report: false,
            client_test: false,
            server_ip: default_server_ip(),
            server_port: None,
            max_requests: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        if self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0 {
            Duration::from_secs_f64(self.timeout_seconds)
        } else {
            Duration::ZERO
        }
    }

    /// Parsed source address override, if any
    pub fn source_address(&self) -> Option<IpAddr> {
        self.source_ip.as_deref().and_then(|s| s.trim().parse().ok())
    }

    /// Port descriptor to expand: explicit ports, else the protocol's default port
    pub fn effective_port_spec(&self) -> Result<String> {
        match &self.target_ports {
            Some(ports) if !ports.trim().is_empty() => Ok(ports.clone()),
            _ => self
                .protocol
                .default_port()
                .map(|port| port.to_string())
                .ok_or_else(|| {
                    AppError::config(format!(
                        "Destination port is required for protocol {}",
                        self.protocol
                    ))
                }),
        }
    }

    /// Endpoint the client-test server listens on
    pub fn server_endpoint(&self) -> Result<Endpoint> {
        let address: IpAddr = self.server_ip.trim().parse().map_err(|_| {
            AppError::invalid_address(format!("Invalid server address: {}", self.server_ip))
        })?;

        let port = match self.server_port {
            Some(port) => u16::try_from(port).map_err(|_| {
                AppError::invalid_port(format!(
                    "Server port must be in range (0, {}), got {}",
                    crate::defaults::NET_MAX_PORT,
                    port
                ))
            })?,
            None => self.protocol.default_port().ok_or_else(|| {
                AppError::config(format!(
                    "Server port is required for protocol {}",
                    self.protocol
                ))
            })?,
        };

        Ok(Endpoint::remote(address, port))
    }

    /// Expand the destination descriptors into a target space
    pub fn target_space(&self) -> Result<TargetSpace> {
        if self.target_addresses.trim().is_empty() {
            return Err(AppError::config("Destination address is required"));
        }
        TargetSpace::parse(&self.target_addresses, &self.effective_port_spec()?)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.client_test {
            if self.protocol.transport().is_none() {
                return Err(AppError::config(format!(
                    "Client test needs a single protocol, got {}",
                    self.protocol
                )));
            }
            self.server_endpoint()?;
        } else {
            self.target_space()?;
        }

        if !self.timeout_seconds.is_finite() || self.timeout_seconds < 0.0 {
            return Err(AppError::config(format!(
                "Timeout must be a non-negative number of seconds, got {}",
                self.timeout_seconds
            )));
        }

        if self.timeout_seconds > crate::defaults::MAX_TIMEOUT_SECONDS {
            return Err(AppError::config(format!(
                "Timeout cannot exceed {} seconds",
                crate::defaults::MAX_TIMEOUT_SECONDS
            )));
        }

        if self.retries > crate::defaults::MAX_RETRIES {
            return Err(AppError::config(format!(
                "Retries cannot exceed {}",
                crate::defaults::MAX_RETRIES
            )));
        }

        if let Some(source_ip) = &self.source_ip {
            source_ip.trim().parse::<IpAddr>().map_err(|_| {
                AppError::invalid_address(format!("Invalid source address: {}", source_ip))
            })?;
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(timeout) = std::env::var("TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid TIMEOUT_SECONDS value '{}': {}", timeout, e))
            })?;
        }

        if let Ok(retries) = std::env::var("RETRIES") {
            self.retries = retries.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid RETRIES value '{}': {}", retries, e))
            })?;
        }

        if let Ok(protocol) = std::env::var("PROTOCOL") {
            self.protocol = protocol.parse()?;
        }

        if let Ok(show) = std::env::var("SHOW_DISCLAIMER") {
            self.show_disclaimer = show.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid SHOW_DISCLAIMER value '{}': {}", show, e))
            })?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e))
            })?;
        }

        if let Ok(source_ip) = std::env::var("SOURCE_IP") {
            if !source_ip.trim().is_empty() {
                self.source_ip = Some(source_ip.trim().to_string());
            }
        }

        if let Ok(source_port) = std::env::var("SOURCE_PORT") {
            if !source_port.trim().is_empty() {
                self.source_port = Some(source_port.trim().parse().map_err(|e| {
                    AppError::invalid_port(format!(
                        "Invalid SOURCE_PORT value '{}': {}",
                        source_port, e
                    ))
                })?);
            }
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_protocol() -> Protocol {
    Protocol::All
}

fn default_timeout_secs() -> f64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs_f64()
}

fn default_retries() -> u32 {
    crate::defaults::DEFAULT_RETRIES
}

fn default_show_disclaimer() -> bool {
    crate::defaults::DEFAULT_SHOW_DISCLAIMER
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

fn default_server_ip() -> String {
    crate::defaults::DEFAULT_SERVER_IP.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            target_addresses: "192.0.2.1".to_string(),
            protocol: Protocol::Coap,
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config_needs_a_destination() {
        let err = Config::default().validate().unwrap_err();
        assert_eq!(err.category(), "CONFIG");
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_default_port_fallback() {
        let config = valid();
        assert_eq!(config.effective_port_spec().unwrap(), "5683");

        let space = config.target_space().unwrap();
        assert_eq!(space.ports, vec![5683]);
    }

    #[test]
    fn test_selector_protocol_needs_explicit_port() {
        let config = Config {
            protocol: Protocol::Udp,
            ..valid()
        };
        assert!(config.validate().is_err());

        let config = Config {
            target_ports: Some("53".to_string()),
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = valid();
        config.timeout_seconds = -1.0;
        assert!(config.validate().is_err());

        config.timeout_seconds = f64::NAN;
        assert!(config.validate().is_err());

        config.timeout_seconds = 301.0;
        assert!(config.validate().is_err());

        config.timeout_seconds = 0.0;
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::ZERO);

        config.timeout_seconds = 0.25;
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_retry_limit() {
        let mut config = valid();
        config.retries = 101;
        assert!(config.validate().is_err());
        config.retries = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_target_specs_are_reported_by_kind() {
        let mut config = valid();
        config.target_addresses = "10.0.0.300".to_string();
        assert_eq!(config.validate().unwrap_err().category(), "ADDRESS");

        let mut config = valid();
        config.target_ports = Some("70000".to_string());
        assert_eq!(config.validate().unwrap_err().category(), "PORT");
    }

    #[test]
    fn test_out_of_range_source_port_from_env_is_fatal() {
        let _guard = crate::config::ENV_LOCK.lock().unwrap();
        for value in ["70000", "-1", "high"] {
            std::env::set_var("SOURCE_PORT", value);
            let mut config = valid();
            let err = config.merge_from_env().unwrap_err();
            assert_eq!(err.category(), "PORT");
            assert_eq!(err.exit_code(), 1);
            assert!(config.source_port.is_none());
        }

        std::env::set_var("SOURCE_PORT", "50000");
        let mut config = valid();
        config.merge_from_env().unwrap();
        assert_eq!(config.source_port, Some(50000));
        std::env::remove_var("SOURCE_PORT");
    }

    #[test]
    fn test_invalid_source_address() {
        let mut config = valid();
        config.source_ip = Some("not-an-ip".to_string());
        assert_eq!(config.validate().unwrap_err().category(), "ADDRESS");
        assert!(config.source_address().is_none());
    }

    fn client_test(protocol: Protocol) -> Config {
        Config {
            protocol,
            client_test: true,
            ..Config::default()
        }
    }

    #[test]
    fn test_server_endpoint_defaults_to_protocol_port() {
        let config = client_test(Protocol::Coap);
        assert!(config.validate().is_ok());

        let endpoint = config.server_endpoint().unwrap();
        assert_eq!(endpoint.address.to_string(), "0.0.0.0");
        assert_eq!(endpoint.port, 5683);
    }

    #[test]
    fn test_server_port_out_of_range_is_fatal() {
        let mut config = client_test(Protocol::Mqtt);
        config.server_port = Some(70000);
        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), "PORT");
        assert_eq!(err.exit_code(), 1);

        config.server_port = Some(65535);
        assert_eq!(config.server_endpoint().unwrap().port, 65535);
    }

    #[test]
    fn test_client_test_needs_concrete_protocol() {
        assert!(client_test(Protocol::Udp).validate().is_err());
        assert!(client_test(Protocol::All).validate().is_err());

        let mut config = client_test(Protocol::Rtsp);
        config.server_ip = "::1".to_string();
        assert_eq!(config.server_endpoint().unwrap().socket_addr().to_string(), "[::1]:554");

        config.server_ip = "localhost".to_string();
        assert_eq!(config.validate().unwrap_err().category(), "ADDRESS");
    }

    #[test]
    fn test_serde_defaults() {
        let config: Config = serde_json::from_str(r#"{"target_addresses": "10.0.0.1"}"#).unwrap();
        assert_eq!(config.protocol, Protocol::All);
        assert_eq!(config.timeout_seconds, 1.0);
        assert!(config.show_disclaimer);
        assert!(config.enable_color);
    }
}
