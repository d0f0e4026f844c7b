//! Network Probe Engine
//!
//! Multi-protocol probing engine: expands address and port descriptors into
//! a target space, sends protocol-appropriate probes over UDP, TCP or SSDP
//! multicast, and aggregates responses into classified endpoint sets with
//! round-trip-time and loss statistics.

pub mod app;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod server;
pub mod stats;
pub mod targets;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Config, Endpoint, ResultLabels, SentToken, TestParameters};
pub use stats::{ClientReport, StatisticsReport, TestStatistics};
pub use targets::TargetSpace;
pub use types::{protocol_enabled, IpVersion, Protocol, TransportKind};
pub use transport::{NoResponseReason, ProbeOutcome, ProbeTransport};
pub use dispatcher::{PayloadDecoder, ProbeDispatcher, TextPreviewDecoder};
pub use executor::{Orchestrator, ProbeTest, RunState, RunSummary};
pub use server::ClientTester;
pub use output::{ColoredFormatter, ConsolePresenter, OutputFormatterFactory, PlainFormatter, Presenter, ReportFormatter};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata set by build.rs
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const BUILD_TARGET: &str = env!("TARGET_TRIPLE");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::net::{Ipv4Addr, SocketAddrV4};
    use std::time::Duration;

    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
    pub const DEFAULT_RETRIES: u32 = 0;
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    pub const DEFAULT_SHOW_DISCLAIMER: bool = true;

    /// Upper bounds accepted by configuration validation
    pub const MAX_TIMEOUT_SECONDS: f64 = 300.0;
    pub const MAX_RETRIES: u32 = 100;

    /// Shortest per-attempt timeout a socket is ever given
    pub const MIN_TIMEOUT: Duration = Duration::from_micros(100);

    /// Size of the single bounded read on stream sockets
    pub const INPUT_BUFFER_SIZE: usize = 10_000;

    /// Ephemeral range used for local endpoints without an explicit port
    pub const NET_MIN_HIGH_PORT: u16 = 49152;
    pub const NET_MAX_PORT: u16 = 65535;

    /// Listening address of the client-test server
    pub const DEFAULT_SERVER_IP: &str = "0.0.0.0";

    /// How often the client-test server looks at its stop conditions
    pub const SERVER_POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Well-known SSDP multicast group
    pub const SSDP_MULTICAST_GROUP: SocketAddrV4 =
        SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900);

    /// Pause after the disclaimer before probing starts
    pub const DISCLAIMER_DELAY: Duration = Duration::from_secs(1);

    /// Largest address count a single CIDR block may expand to
    pub const MAX_EXPANDED_ADDRESSES: u128 = 65_536;

    /// Target spaces above this size produce a validation warning
    pub const LARGE_TARGET_SPACE: usize = 4_096;

    pub const SEPARATOR_LINE_SIZE: usize = 80;

    pub const DEFAULT_POSITIVE_LABEL: &str = "Active endpoints";
    pub const DEFAULT_POTENTIAL_LABEL: &str = "Results that needs to be tested manually";
    pub const DEFAULT_NEGATIVE_LABEL: &str = "Inactive endpoints";
}
