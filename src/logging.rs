//! Structured logging system for the probing engine
//!
//! This module provides:
//! - Structured logging with multiple levels and contexts
//! - Correlation IDs for grouping the probes of one run
//! - JSON structured output (selected by `--json`) for log aggregators
//! - A probe-diagnostics logger used by transports and the dispatcher
//!
//! Logging is synchronous so it can be called from blocking socket code
//! running inside `spawn_blocking`.

use crate::error::{AppError, Result};
use crate::models::{Config, Endpoint};
use crate::types::Protocol;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - verbose probe diagnostics
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
    /// Fatal level - severe error events that cause application termination
    Fatal = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",    // White
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
            LogLevel::Fatal => "\x1b[35m",    // Magenta
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
    /// Thread name if available
    pub thread_id: Option<String>,
    /// File and line information
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
}

/// Shared logging context for correlation and session tracking
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    current_correlation_id: Option<String>,
    context_fields: HashMap<String, serde_json::Value>,
}

/// Logger implementation with multiple output formats
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_location: false,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger with specific configuration
    ///
    /// A JSON report also switches the log lines to JSON.
    pub fn with_config(name: String, config: &Config) -> Self {
        let mut logger = Self::with_verbosity(name, config.verbose, config.enable_color);
        if config.json_report {
            logger.format = LogFormat::Json;
        }
        logger
    }

    /// Create a logger whose level follows the verbose flag alone
    pub fn with_verbosity(name: String, verbose: bool, use_color: bool) -> Self {
        Self {
            min_level: if verbose { LogLevel::Debug } else { LogLevel::Warn },
            use_color,
            include_location: verbose,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Set session correlation ID
    pub fn set_session_id(&self, session_id: String) {
        if let Ok(mut context) = self.context.write() {
            context.session_id = Some(session_id);
        }
    }

    /// Add context field for all subsequent log entries
    pub fn add_context_field<T: Serialize>(&self, key: String, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            if let Ok(mut context) = self.context.write() {
                context.context_fields.insert(key, json_value);
            }
        }
    }

    /// Start a correlated operation
    pub fn start_operation(&self, operation_name: &str) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        if let Ok(mut context) = self.context.write() {
            context.current_correlation_id = Some(correlation_id.clone());
        }

        self.debug(&format!("Started operation: {}", operation_name))
            .correlation_id(&correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "start")
            .log();

        correlation_id
    }

    /// End a correlated operation
    pub fn end_operation(&self, correlation_id: &str, operation_name: &str, success: bool) {
        self.debug(&format!("Completed operation: {} (success: {})", operation_name, success))
            .correlation_id(correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "end")
            .field("success", success)
            .log();

        if let Ok(mut context) = self.context.write() {
            if context.current_correlation_id.as_deref() == Some(correlation_id) {
                context.current_correlation_id = None;
            }
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    /// Convenience methods for different log levels
    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        if let Ok(context) = self.context.read() {
            if let Some(session_id) = &context.session_id {
                entry
                    .fields
                    .insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
            }
            if entry.correlation_id.is_none() {
                entry.correlation_id = context.current_correlation_id.clone();
            }
            for (key, value) in &context.context_fields {
                entry.fields.insert(key.clone(), value.clone());
            }
        }

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
        };

        // Write to stderr for errors/warnings, stdout for others
        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields_str: Vec<String> =
                entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            fields_str.sort();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}",
                entry.message
            ),
        }
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
                thread_id: std::thread::current().name().map(String::from),
                location: None,
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Add the probe target as structured fields
    pub fn target(self, protocol: Protocol, endpoint: &Endpoint) -> Self {
        self.field("protocol", protocol.name())
            .field("address", endpoint.address.to_string())
            .field("port", endpoint.port)
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub fn log(self) {
        self.logger.write_entry(self.entry);
    }
}

/// Specialized logger for probe diagnostics
///
/// Every method here logs at debug level unless noted, so output only
/// appears in verbose mode.
#[derive(Clone)]
pub struct ProbeLogger {
    logger: Logger,
}

impl ProbeLogger {
    pub fn new(verbose: bool) -> Self {
        Self {
            logger: Logger::with_verbosity("PROBE".to_string(), verbose, true),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("PROBE".to_string(), config),
        }
    }

    /// Underlying logger, for ad-hoc entries
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Log one transmission attempt
    pub fn log_probe_sent(&self, protocol: Protocol, target: &Endpoint, bytes: usize, attempt: u32) {
        if !self.logger.would_log(LogLevel::Debug) {
            return;
        }
        self.logger
            .debug(&format!("Sent {} bytes to {} (attempt {})", bytes, target, attempt))
            .target(protocol, target)
            .field("bytes", bytes)
            .field("attempt", attempt)
            .log();
    }

    /// Log a probe that ended without a response
    pub fn log_probe_failure(&self, protocol: Protocol, target: &Endpoint, reason: &str) {
        self.logger
            .debug(&format!("No response from {}: {}", target, reason))
            .target(protocol, target)
            .field("reason", reason)
            .log();
    }

    /// Log a response matched to the probe
    pub fn log_response(&self, protocol: Protocol, target: &Endpoint, bytes: usize, rtt_ms: u64) {
        self.logger
            .debug(&format!("Received {} bytes from {} in {} ms", bytes, target, rtt_ms))
            .target(protocol, target)
            .field("bytes", bytes)
            .field("rtt_ms", rtt_ms)
            .log();
    }

    /// Log a reply that came from somewhere other than the destination
    pub fn log_foreign_reply(&self, from: SocketAddr, expected: &Endpoint) {
        self.logger
            .debug(&format!("Ignoring reply from {} (waiting for {})", from, expected))
            .field("from", from.to_string())
            .field("expected", expected.to_string())
            .log();
    }

    /// Log a protocol/transport combination that cannot be probed
    pub fn log_unsupported(&self, protocol: Protocol, detail: &str) {
        self.logger
            .debug(&format!("{} probe not supported: {}", protocol, detail))
            .field("protocol", protocol.name())
            .field("detail", detail)
            .log();
    }

    /// Log a payload that could not be rendered for display
    pub fn log_decode_failure(&self, protocol: Protocol, error: &str) {
        self.logger
            .debug(&format!("Cannot display {} payload: {}", protocol, error))
            .field("protocol", protocol.name())
            .field("error", error)
            .log();
    }

    /// Log the switch from raw sockets to kernel-framed UDP (warn level)
    pub fn log_raw_socket_fallback(&self, error: &str) {
        self.logger
            .warn(&format!(
                "Raw sockets unavailable ({}), falling back to kernel UDP sockets; source address spoofing is disabled",
                error
            ))
            .field("error", error)
            .log();
    }

    /// Log a request received by the client-test server
    pub fn log_client_request(&self, protocol: Protocol, peer: SocketAddr, bytes: usize) {
        self.logger
            .debug(&format!("Received {} byte {} request from {}", bytes, protocol, peer))
            .field("protocol", protocol.name())
            .field("peer", peer.to_string())
            .field("bytes", bytes)
            .log();
    }

    /// Log a client exchange that failed on the server side
    pub fn log_client_error(&self, peer: Option<SocketAddr>, error: &str) {
        let peer = peer.map(|p| p.to_string()).unwrap_or_else(|| "unknown peer".to_string());
        self.logger
            .debug(&format!("Client exchange with {} failed: {}", peer, error))
            .field("peer", peer)
            .field("error", error)
            .log();
    }

    /// Log an unparseable port value that was ignored (warn level)
    pub fn log_invalid_port(&self, input: &str) {
        self.logger
            .warn(&format!("Ignoring invalid port value: {}", input))
            .field("input", input)
            .log();
    }
}

/// Global logger factory and management
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone());
        logger
    }

    /// Create a probe diagnostics logger
    pub fn create_probe_logger(&self) -> ProbeLogger {
        let probe = ProbeLogger::from_config(&self.config);
        probe.logger.set_session_id(self.session_id.clone());
        probe
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Convenience macros for logging with location information
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn test_logger_creation() {
        let logger = Logger::new("TEST".to_string());
        assert_eq!(logger.name, "TEST");
        assert_eq!(logger.min_level, LogLevel::Info);
        assert!(logger.use_color);
    }

    #[test]
    fn test_level_follows_verbose_flag() {
        let config = Config {
            verbose: true,
            enable_color: false,
            ..Default::default()
        };
        let logger = Logger::with_config("TEST".to_string(), &config);
        assert_eq!(logger.min_level, LogLevel::Debug);
        assert!(!logger.use_color);
        assert!(logger.include_location);

        let quiet = Logger::with_config("TEST".to_string(), &Config::default());
        assert_eq!(quiet.min_level, LogLevel::Warn);
        assert!(!quiet.would_log(LogLevel::Debug));
        assert!(quiet.would_log(LogLevel::Warn));
    }

    #[test]
    fn test_json_report_selects_json_lines() {
        let config = Config {
            json_report: true,
            ..Default::default()
        };
        assert_eq!(Logger::with_config("TEST".to_string(), &config).format, LogFormat::Json);
        assert_eq!(
            Logger::with_config("TEST".to_string(), &Config::default()).format,
            LogFormat::Console
        );
    }

    #[test]
    fn test_error_info_fields() {
        let logger = Logger::new("TEST".to_string());
        let entry = logger
            .error("failed")
            .error_info(&AppError::invalid_port("70000"))
            .entry;

        assert_eq!(entry.fields["error_category"], "PORT");
        assert_eq!(entry.fields["error_exit_code"], 1);
    }

    #[test]
    fn test_session_id_management() {
        let logger = Logger::new("TEST".to_string());
        logger.set_session_id("test-session".to_string());

        let context = logger.context.read().unwrap();
        assert_eq!(context.session_id.as_deref(), Some("test-session"));
    }

    #[test]
    fn test_context_fields() {
        let logger = Logger::new("TEST".to_string());
        logger.add_context_field("run".to_string(), "coap-sweep");

        let context = logger.context.read().unwrap();
        assert!(context.context_fields.contains_key("run"));
    }

    #[test]
    fn test_operation_correlation() {
        let logger = Logger::new("TEST".to_string());
        let correlation_id = logger.start_operation("sweep");
        assert!(!correlation_id.is_empty());
        assert_eq!(
            logger.context.read().unwrap().current_correlation_id.as_deref(),
            Some(correlation_id.as_str())
        );

        logger.end_operation(&correlation_id, "sweep", true);
        assert!(logger.context.read().unwrap().current_correlation_id.is_none());
    }

    #[test]
    fn test_log_formats() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "Test message".to_string(),
            logger: "TEST".to_string(),
            correlation_id: Some("test-id-123456".to_string()),
            fields: {
                let mut map = HashMap::new();
                map.insert("key".to_string(), serde_json::Value::String("value".to_string()));
                map
            },
            thread_id: None,
            location: None,
        };

        let logger = Logger::new("TEST".to_string());

        let console_output = logger.format_console(&entry);
        assert!(console_output.contains("INFO"));
        assert!(console_output.contains("Test message"));
        assert!(console_output.contains("test-id-"));

        let json_output = logger.format_json(&entry);
        assert!(json_output.starts_with('{'));
        assert!(json_output.ends_with('}'));

    }

    #[test]
    fn test_short_correlation_id_does_not_panic() {
        let logger = Logger::new("TEST".to_string());
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Warn,
            message: "m".to_string(),
            logger: "TEST".to_string(),
            correlation_id: Some("abc".to_string()),
            fields: HashMap::new(),
            thread_id: None,
            location: None,
        };
        assert!(logger.format_console(&entry).contains("[abc]"));
    }

    #[test]
    fn test_probe_logger_calls() {
        let probe = ProbeLogger::new(false);
        let target = Endpoint::remote("192.0.2.1".parse().unwrap(), 5683);

        probe.log_probe_sent(Protocol::Coap, &target, 12, 1);
        probe.log_probe_failure(Protocol::Coap, &target, "timed out");
        probe.log_response(Protocol::Coap, &target, 12, 3);
        probe.log_foreign_reply("192.0.2.9:1900".parse().unwrap(), &target);
        probe.log_unsupported(Protocol::Ssdp, "IPv6 destination");
        probe.log_decode_failure(Protocol::Mqtt, "bad frame");
        probe.log_client_request(Protocol::Coap, "127.0.0.1:40000".parse().unwrap(), 4);
        probe.log_client_error(None, "reset");
        assert_eq!(probe.logger().name, "PROBE");
    }

    #[test]
    fn test_logger_factory() {
        let factory = LoggerFactory::new(Config::default());

        let logger = factory.create_logger("TEST");
        assert_eq!(logger.name, "TEST");
        assert!(!factory.session_id().is_empty());

        let probe = factory.create_probe_logger();
        let context = probe.logger().context.read().unwrap();
        assert_eq!(context.session_id.as_deref(), Some(factory.session_id()));
    }

    #[test]
    fn test_log_entry_serialization() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "Test".to_string(),
            logger: "TEST".to_string(),
            correlation_id: None,
            fields: HashMap::new(),
            thread_id: None,
            location: None,
        };

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: LogEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.level, LogLevel::Info);
        assert_eq!(deserialized.message, "Test");
        assert_eq!(deserialized.logger, "TEST");
    }

    #[test]
    fn test_macros_record_location() {
        let logger = Logger::new("TEST".to_string());
        log_debug!(logger, "value is {}", 3);
        log_warn!(logger, "careful");

        let entry = logger.warn("here").location(file!(), 7, Some(module_path!())).entry;
        let location = entry.location.unwrap();
        assert!(location.file.ends_with("logging.rs"));
        assert_eq!(location.line, 7);
    }
}
