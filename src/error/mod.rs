//! Error handling for the probing engine
//!
//! Only configuration-level and run-level failures are represented here.
//! Per-probe network failures never become an [`AppError`]; transports
//! report them as [`crate::transport::ProbeOutcome`] values instead.

use thiserror::Error;

/// Custom error types for the probing engine
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed address or CIDR block in a target descriptor
    #[error("Cannot parse IP address: {0}")]
    InvalidAddress(String),

    /// Malformed port, port range or out-of-range port value
    #[error("Cannot parse port: {0}")]
    InvalidPort(String),

    /// Network errors outside of a single probe (e.g. socket setup for a run)
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Requested feature or transport shape is not available
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O errors (payload files, .env files)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Test function errors surfaced by the orchestrator
    #[error("Test execution error: {0}")]
    TestExecution(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new invalid address error
    pub fn invalid_address<S: Into<String>>(message: S) -> Self {
        Self::InvalidAddress(message.into())
    }

    /// Create a new invalid port error
    pub fn invalid_port<S: Into<String>>(message: S) -> Self {
        Self::InvalidPort(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new unsupported-feature error
    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new test execution error
    pub fn test_execution<S: Into<String>>(message: S) -> Self {
        Self::TestExecution(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::InvalidAddress(_) => "ADDRESS",
            Self::InvalidPort(_) => "PORT",
            Self::Network(_) => "NETWORK",
            Self::Timeout(_) => "TIMEOUT",
            Self::Unsupported(_) => "UNSUPPORTED",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::TestExecution(_) => "TEST",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the error belongs to the fatal configuration family
    /// (reported once, before any probing begins)
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidAddress(_) | Self::InvalidPort(_) | Self::Parse(_)
        )
    }

    /// Check if error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Config(_) | Self::InvalidAddress(_) | Self::InvalidPort(_) | Self::Parse(_) => false,
            Self::Unsupported(_) | Self::Io(_) | Self::TestExecution(_) | Self::Internal(_) => false,
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::InvalidAddress(_) | Self::InvalidPort(_) | Self::Parse(_) => 1,
            Self::Network(_) => 2,
            Self::Timeout(_) => 3,
            Self::Unsupported(_) => 4,
            Self::Io(_) => 5,
            Self::TestExecution(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            if self.is_configuration() {
                return format!("[{}] {}", category.red().bold(), message.red());
            }
            match self {
                Self::Network(_) => format!("[{}] {}", category.yellow().bold(), message.yellow()),
                Self::Timeout(_) => format!("[{}] {}", category.blue().bold(), message.blue()),
                Self::Unsupported(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
                _ => format!("[{}] {}", category.cyan().bold(), message.cyan()),
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::invalid_address(error.to_string())
    }
}

// Anyhow integration (collaborator hooks such as payload decoders use anyhow)
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let original_error = e.into();
            let context = f();
            match original_error {
                AppError::Io(msg) => AppError::io(format!("{}: {}", context, msg)),
                other => AppError::internal(format!("{}: {}", context, other)),
            }
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

/// Error reporter for user feedback on fatal errors
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Render an error as the one-line cause shown before exiting
    pub fn format_error(&self, error: &AppError) -> String {
        error.format_for_console(self.use_color)
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.format_error(error));

        if self.verbose && error.is_recoverable() {
            if self.use_color {
                use colored::Colorize;
                eprintln!("{}", "This error might be temporary. You can try running the command again.".green());
            } else {
                eprintln!("This error might be temporary. You can try running the command again.");
            }
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("Invalid configuration");
        assert_eq!(config_error.category(), "CONFIG");
        assert!(!config_error.is_recoverable());
        assert_eq!(config_error.exit_code(), 1);

        let network_error = AppError::network("Socket setup failed");
        assert_eq!(network_error.category(), "NETWORK");
        assert!(network_error.is_recoverable());
        assert_eq!(network_error.exit_code(), 2);
    }

    #[test]
    fn test_target_spec_errors_are_configuration_errors() {
        let address = AppError::invalid_address("10.0.0.300");
        let port = AppError::invalid_port("99999");

        assert!(address.is_configuration());
        assert!(port.is_configuration());
        assert_eq!(address.exit_code(), 1);
        assert_eq!(port.exit_code(), 1);
        assert!(address.to_string().starts_with("Cannot parse IP address"));
        assert!(port.to_string().starts_with("Cannot parse port"));
        assert!(!AppError::network("x").is_configuration());
    }

    #[test]
    fn test_error_categories() {
        let errors = [
            AppError::config("config"),
            AppError::invalid_address("address"),
            AppError::invalid_port("port"),
            AppError::network("network"),
            AppError::timeout("timeout"),
            AppError::unsupported("unsupported"),
            AppError::io("io"),
            AppError::parse("parse"),
            AppError::test_execution("test"),
            AppError::internal("internal"),
        ];

        let expected_categories = [
            "CONFIG", "ADDRESS", "PORT", "NETWORK", "TIMEOUT",
            "UNSUPPORTED", "IO", "PARSE", "TEST", "INTERNAL",
        ];

        for (error, expected) in errors.iter().zip(expected_categories.iter()) {
            assert_eq!(error.category(), *expected);
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("test").exit_code(), 1);
        assert_eq!(AppError::network("test").exit_code(), 2);
        assert_eq!(AppError::timeout("test").exit_code(), 3);
        assert_eq!(AppError::unsupported("test").exit_code(), 4);
        assert_eq!(AppError::io("test").exit_code(), 5);
        assert_eq!(AppError::test_execution("test").exit_code(), 6);
        assert_eq!(AppError::internal("test").exit_code(), 99);
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let parse_error = "not_a_number".parse::<i32>().unwrap_err();
        let app_error: AppError = parse_error.into();
        assert_eq!(app_error.category(), "PARSE");

        let addr_error = "not-an-ip".parse::<std::net::IpAddr>().unwrap_err();
        let app_error: AppError = addr_error.into();
        assert_eq!(app_error.category(), "ADDRESS");
    }

    #[test]
    fn test_dotenv_error_conversion() {
        let dotenv_error = dotenv::Error::LineParse(".env".to_string(), 1);
        let app_error: AppError = dotenv_error.into();
        assert_eq!(app_error.category(), "CONFIG");
        assert!(app_error.to_string().contains("Environment file error"));
    }

    #[test]
    fn test_anyhow_integration() {
        let anyhow_error = anyhow::anyhow!("decoder exploded");
        let app_error: AppError = anyhow_error.into();
        assert_eq!(app_error.category(), "INTERNAL");
    }

    #[test]
    fn test_error_context_keeps_io_category() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "No such file",
        ));

        let error = result
            .with_context(|| "Reading payload file probe.bin".to_string())
            .unwrap_err();
        assert_eq!(error.category(), "IO");
        assert!(error.to_string().contains("Reading payload file probe.bin"));
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::invalid_port("70000");
        let plain = error.format_for_console(false);
        let colored = error.format_for_console(true);

        assert_eq!(plain, "[PORT] Cannot parse port: 70000");
        assert!(colored.contains("PORT"));
        assert!(colored.contains("70000"));
    }

    #[test]
    fn test_error_reporter_default() {
        let reporter = ErrorReporter::default();
        assert!(reporter.use_color);
        assert!(!reporter.verbose);
        reporter.report_error(&AppError::timeout("test"));
    }
}
