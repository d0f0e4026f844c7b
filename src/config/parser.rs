//! Configuration parsing from CLI arguments and environment variables

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.verbose)?;
        EnvManager::validate_current_env()?;
        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config);

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(ref dest_ip) = cli.dest_ip {
            config.target_addresses = dest_ip.clone();
        }
        if let Some(ref ports) = cli.dest_port {
            config.target_ports = Some(ports.clone());
        }
        if let Some(protocol) = cli.protocol {
            config.protocol = protocol;
        }
        if let Some(ref payload) = cli.payload {
            config.payload_file = Some(payload.clone());
        }
        if let Some(retries) = cli.retries {
            config.retries = retries;
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(ref src_ip) = cli.src_ip {
            config.source_ip = Some(src_ip.clone());
        }
        if let Some(src_port) = cli.src_port {
            config.source_port = Some(src_port);
        }

        if cli.hide_disclaimer {
            config.show_disclaimer = false;
        }
        if cli.no_color {
            config.enable_color = false;
        }

        // CLI-only switches
        config.ignore_ping_check = cli.ignore_ping_check;
        config.wrap_secure_layer = cli.secure;
        config.display_payload = cli.display;
        config.verbose = cli.verbose;
        config.json_report = cli.json;

        config.client_test = cli.serve;
        if let Some(ref server_ip) = cli.server_ip {
            config.server_ip = server_ip.clone();
        }
        config.server_port = cli.server_port;
        config.max_requests = cli.max_requests;

        if config.verbose {
            println!("Applied CLI overrides to configuration");
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for verbose output
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    if config.client_test {
        match config.server_endpoint() {
            Ok(endpoint) => summary.push(format!("Client test server: {}", endpoint)),
            Err(error) => summary.push(format!("Client test server: {}", error)),
        }
        if let Some(max_requests) = config.max_requests {
            summary.push(format!("Max requests: {}", max_requests));
        }
    } else {
        summary.push(format!("Destination: {}", config.target_addresses));
        summary.push(format!(
            "Ports: {}",
            config.target_ports.as_deref().unwrap_or("(protocol default)")
        ));
    }
    summary.push(format!("Protocol: {}", config.protocol));
    summary.push(format!(
        "Payload file: {}",
        config
            .payload_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    ));
    summary.push(format!("Timeout: {}s", config.timeout_seconds));
    summary.push(format!("Retries: {}", config.retries));
    if let Some(ref source_ip) = config.source_ip {
        summary.push(format!("Source address: {}", source_ip));
    }
    if let Some(source_port) = config.source_port {
        summary.push(format!("Source port: {}", source_port));
    }
    summary.push(format!("Secure layer: {}", config.wrap_secure_layer));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Protocol;
    use clap::Parser;
    use crate::config::ENV_LOCK;
    use std::env;

    fn clear_env() {
        for (name, _, _) in EnvManager::get_supported_env_vars() {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_cli_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let cli = Cli::parse_from([
            "nprobe",
            "10.0.0.1",
            "5683",
            "-P",
            "coap",
            "-T",
            "0.5",
            "-R",
            "3",
            "--no-color",
            "--hide-disclaimer",
            "--secure",
        ]);
        let config = ConfigParser::new(cli).parse().unwrap();

        assert_eq!(config.target_addresses, "10.0.0.1");
        assert_eq!(config.target_ports.as_deref(), Some("5683"));
        assert_eq!(config.protocol, Protocol::Coap);
        assert_eq!(config.timeout_seconds, 0.5);
        assert_eq!(config.retries, 3);
        assert!(!config.enable_color);
        assert!(!config.show_disclaimer);
        assert!(config.wrap_secure_layer);
    }

    #[test]
    fn test_cli_overrides_env_vars() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("RETRIES", "8");
        env::set_var("TIMEOUT_SECONDS", "2");

        let cli = Cli::parse_from(["nprobe", "10.0.0.1", "-P", "coap", "-R", "1"]);
        let config = ConfigParser::new(cli).parse().unwrap();

        assert_eq!(config.retries, 1);
        assert_eq!(config.timeout_seconds, 2.0);

        clear_env();
    }

    #[test]
    fn test_env_protocol_used_without_cli_flag() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("PROTOCOL", "mqtt");

        let cli = Cli::parse_from(["nprobe", "10.0.0.1"]);
        let config = ConfigParser::new(cli).parse().unwrap();

        assert_eq!(config.protocol, Protocol::Mqtt);
        assert_eq!(config.effective_port_spec().unwrap(), "1883");

        clear_env();
    }

    #[test]
    fn test_missing_default_port_is_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let cli = Cli::parse_from(["nprobe", "10.0.0.1", "-P", "udp"]);
        let err = ConfigParser::new(cli).parse().unwrap_err();

        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_bad_env_source_port_stops_parsing() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("SOURCE_PORT", "70000");

        let cli = Cli::parse_from(["nprobe", "10.0.0.1", "-P", "coap"]);
        let err = ConfigParser::new(cli).parse().unwrap_err();

        assert_eq!(err.category(), "PORT");
        assert_eq!(err.exit_code(), 1);

        clear_env();
    }

    #[test]
    fn test_malformed_destination_is_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let cli = Cli::parse_from(["nprobe", "10.0.0.999", "80"]);
        let err = load_config(cli).unwrap_err();

        assert_eq!(err.category(), "ADDRESS");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_serve_flags_reach_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let cli = Cli::parse_from([
            "nprobe", "--serve", "-P", "mqtt", "--server-ip", "127.0.0.1", "--max-requests", "2",
        ]);
        let config = ConfigParser::new(cli).parse().unwrap();

        assert!(config.client_test);
        assert_eq!(config.server_endpoint().unwrap().to_string(), "127.0.0.1:1883");
        assert_eq!(config.max_requests, Some(2));
        assert!(display_config_summary(&config).contains("Client test server: 127.0.0.1:1883"));
    }

    #[test]
    fn test_out_of_range_server_port_is_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let cli = Cli::parse_from(["nprobe", "--serve", "-P", "coap", "--server-port", "65536"]);
        let err = ConfigParser::new(cli).parse().unwrap_err();

        assert_eq!(err.category(), "PORT");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_config_summary() {
        let config = Config {
            target_addresses: "10.0.0.1".to_string(),
            source_ip: Some("10.0.0.2".to_string()),
            ..Config::default()
        };
        let summary = display_config_summary(&config);

        assert!(summary.contains("Destination: 10.0.0.1"));
        assert!(summary.contains("Ports: (protocol default)"));
        assert!(summary.contains("Protocol: ALL"));
        assert!(summary.contains("Source address: 10.0.0.2"));
    }
}
