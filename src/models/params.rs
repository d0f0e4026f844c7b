//! Per-run test parameters threaded through every probe

use crate::defaults;
use crate::models::{Config, Endpoint};
use crate::stats::TestStatistics;
use crate::types::{IpVersion, Protocol, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

/// Labels of the three classification sections
///
/// Without a positive label the classification section is not reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultLabels {
    pub positive: Option<String>,
    pub potential: String,
    pub negative: String,
}

impl Default for ResultLabels {
    fn default() -> Self {
        Self {
            positive: Some(defaults::DEFAULT_POSITIVE_LABEL.to_string()),
            potential: defaults::DEFAULT_POTENTIAL_LABEL.to_string(),
            negative: defaults::DEFAULT_NEGATIVE_LABEL.to_string(),
        }
    }
}

/// Proof that a probe was counted as sent; redeemed when its response arrives
#[derive(Debug)]
#[must_use = "a sent token is needed to record the response"]
pub struct SentToken {
    sent_at: Instant,
}

impl SentToken {
    pub fn elapsed(&self) -> Duration {
        self.sent_at.elapsed()
    }
}

/// Context for one run: endpoints, policy, flags and statistics
#[derive(Debug, Clone)]
pub struct TestParameters {
    pub test_name: String,
    pub src_endpoint: Endpoint,
    dst_endpoint: Endpoint,
    ip_version: IpVersion,
    pub protocol: Protocol,
    pub timeout: Duration,
    pub nr_retries: u32,
    pub verbose: bool,
    pub ignore_ping_check: bool,
    pub wrap_secure_layer: bool,
    pub show_disclaimer: bool,
    pub labels: ResultLabels,
    pub statistics: TestStatistics,
}

impl TestParameters {
    /// Parameters with default policy and an unspecified destination
    pub fn new<S: Into<String>>(test_name: S, src_endpoint: Endpoint) -> Self {
        let dst_endpoint = Endpoint::remote(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
        Self {
            test_name: test_name.into(),
            src_endpoint,
            ip_version: IpVersion::of(&dst_endpoint.address),
            dst_endpoint,
            protocol: Protocol::All,
            timeout: defaults::DEFAULT_TIMEOUT,
            nr_retries: defaults::DEFAULT_RETRIES,
            verbose: false,
            ignore_ping_check: false,
            wrap_secure_layer: false,
            show_disclaimer: defaults::DEFAULT_SHOW_DISCLAIMER,
            labels: ResultLabels::default(),
            statistics: TestStatistics::new(),
        }
    }

    /// Parameters resolved from a validated configuration
    pub fn from_config<S: Into<String>>(test_name: S, config: &Config) -> Self {
        let source = Endpoint::local(config.source_address(), config.source_port);
        let mut params = Self::new(test_name, source);
        params.protocol = config.protocol;
        params.timeout = config.timeout();
        params.nr_retries = config.retries;
        params.verbose = config.verbose;
        params.ignore_ping_check = config.ignore_ping_check;
        params.wrap_secure_layer = config.wrap_secure_layer;
        params.show_disclaimer = config.show_disclaimer;
        params
    }

    /// Parameters for a client test: the source endpoint is where the server listens
    pub fn for_client_tester<S: Into<String>>(test_name: S, config: &Config) -> Result<Self> {
        let mut params = Self::new(test_name, config.server_endpoint()?);
        params.protocol = config.protocol;
        params.timeout = config.timeout();
        params.verbose = config.verbose;
        params.show_disclaimer = config.show_disclaimer;
        Ok(params)
    }

    pub fn dst_endpoint(&self) -> &Endpoint {
        &self.dst_endpoint
    }

    pub fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    /// Point the parameters at a new target, keeping `ip_version` in step
    pub fn set_destination(&mut self, address: IpAddr, port: u16) {
        self.dst_endpoint = Endpoint::remote(address, port);
        self.ip_version = IpVersion::of(&address);
    }

    /// Count a probe as sent; call before transmitting
    pub fn report_sent_packet(&mut self) -> SentToken {
        self.statistics.packets_sent += 1;
        SentToken {
            sent_at: Instant::now(),
        }
    }

    /// Count a matched response and record its RTT; returns the RTT in ms
    pub fn report_received_packet(&mut self, token: SentToken) -> u64 {
        let rtt_ms = token.elapsed().as_millis() as u64;
        self.statistics.packets_received += 1;
        self.statistics.packets_rtt.push(rtt_ms);
        rtt_ms
    }

    pub fn mark_active<S: Into<String>>(&mut self, protocol: Protocol, endpoint: S) {
        self.statistics.add_active(protocol, endpoint.into());
    }

    pub fn mark_potential<S: Into<String>>(&mut self, protocol: Protocol, endpoint: S) {
        self.statistics.add_potential(protocol, endpoint.into());
    }

    pub fn mark_inactive<S: Into<String>>(&mut self, protocol: Protocol, endpoint: S) {
        self.statistics.add_inactive(protocol, endpoint.into());
    }
}
