//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::types::Protocol;
use std::net::IpAddr;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(verbose: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), verbose)
    }

    /// Load the given env file if it exists
    pub fn load_env_file_from(path: &Path, verbose: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if verbose {
                println!("Loaded configuration from {}", path.display());
            }
        } else if verbose {
            println!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "PROTOCOL" => {
                value.parse::<Protocol>()?;
            }
            "TIMEOUT_SECONDS" => {
                let timeout: f64 = value.parse().map_err(|e| {
                    AppError::config(format!("Invalid TIMEOUT_SECONDS value '{}': {}", value, e))
                })?;
                if !timeout.is_finite()
                    || !(0.0..=crate::defaults::MAX_TIMEOUT_SECONDS).contains(&timeout)
                {
                    return Err(AppError::config(format!(
                        "TIMEOUT_SECONDS must be between 0 and {}, got: {}",
                        crate::defaults::MAX_TIMEOUT_SECONDS,
                        value
                    )));
                }
            }
            "RETRIES" => {
                let retries: u32 = value.parse().map_err(|e| {
                    AppError::config(format!("Invalid RETRIES value '{}': {}", value, e))
                })?;
                if retries > crate::defaults::MAX_RETRIES {
                    return Err(AppError::config(format!(
                        "RETRIES must be at most {}, got: {}",
                        crate::defaults::MAX_RETRIES,
                        retries
                    )));
                }
            }
            "SHOW_DISCLAIMER" | "ENABLE_COLOR" => {
                value.parse::<bool>().map_err(|e| {
                    AppError::config(format!("Invalid {} value '{}': {}", key, value, e))
                })?;
            }
            "SOURCE_IP" if !value.is_empty() => {
                value.parse::<IpAddr>().map_err(|e| {
                    AppError::invalid_address(format!("Invalid SOURCE_IP value '{}': {}", value, e))
                })?;
            }
            "SOURCE_PORT" if !value.is_empty() => {
                value.parse::<u16>().map_err(|e| {
                    AppError::invalid_port(format!("Invalid SOURCE_PORT value '{}': {}", value, e))
                })?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("PROTOCOL", "Protocol selector", "coap"),
            ("TIMEOUT_SECONDS", "Per-attempt timeout in seconds (0-300)", "1.5"),
            ("RETRIES", "Retransmissions for connectionless probes (0-100)", "2"),
            ("SHOW_DISCLAIMER", "Show the legal disclaimer", "true"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
            ("SOURCE_IP", "Source address for outgoing probes", "192.0.2.10"),
            ("SOURCE_PORT", "Source port for outgoing probes", "50000"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<18} {}\n", var, description));
            help.push_str(&format!("  {:<18} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate every supported variable currently set; the first bad one is fatal
    pub fn validate_current_env() -> Result<()> {
        for (name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(name) {
                Self::validate_env_var(name, &value)?;
            }
        }
        Ok(())
    }
}
