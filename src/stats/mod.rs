//! Probe statistics and endpoint classification
//!
//! [`TestStatistics`] is the mutable per-run accumulator. At report time it is
//! turned into an immutable, serialisable [`StatisticsReport`].

use crate::error::Result;
use crate::models::ResultLabels;
use crate::types::Protocol;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Message loss in percent
///
/// Zero when nothing was sent or when more responses than probes arrived
/// (multicast and retries can produce that).
pub fn message_loss(sent: u64, received: u64) -> f64 {
    if sent > 0 && received <= sent {
        100.0 * (sent - received) as f64 / sent as f64
    } else {
        0.0
    }
}

/// Amplification factor in percent: how much larger the output is than the input
pub fn amplification_factor(input_size: usize, output_size: usize) -> f64 {
    if input_size == 0 {
        return 0.0;
    }
    100.0 * output_size as f64 / input_size as f64 - 100.0
}

type ClassificationTable = [Vec<String>; Protocol::COUNT];

fn empty_table() -> ClassificationTable {
    std::array::from_fn(|_| Vec::new())
}

/// Counters, RTT samples and classification tables for one run
#[derive(Debug, Clone)]
pub struct TestStatistics {
    pub packets_sent: u64,
    pub packets_received: u64,
    /// One sample per matched response, in milliseconds
    pub packets_rtt: Vec<u64>,
    test_start: Instant,
    started_at: DateTime<Utc>,
    active: ClassificationTable,
    potential: ClassificationTable,
    inactive: ClassificationTable,
}

impl Default for TestStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStatistics {
    pub fn new() -> Self {
        Self {
            packets_sent: 0,
            packets_received: 0,
            packets_rtt: Vec::new(),
            test_start: Instant::now(),
            started_at: Utc::now(),
            active: empty_table(),
            potential: empty_table(),
            inactive: empty_table(),
        }
    }

    /// Wall time since the statistics were created
    pub fn test_time(&self) -> Duration {
        self.test_start.elapsed()
    }

    pub fn message_loss(&self) -> f64 {
        message_loss(self.packets_sent, self.packets_received)
    }

    pub fn rtt_summary(&self) -> Option<RttSummary> {
        RttSummary::from_samples(&self.packets_rtt)
    }

    pub fn add_active(&mut self, protocol: Protocol, endpoint: String) {
        self.active[protocol.index()].push(endpoint);
    }

    pub fn add_potential(&mut self, protocol: Protocol, endpoint: String) {
        self.potential[protocol.index()].push(endpoint);
    }

    pub fn add_inactive(&mut self, protocol: Protocol, endpoint: String) {
        self.inactive[protocol.index()].push(endpoint);
    }

    pub fn active(&self, protocol: Protocol) -> &[String] {
        &self.active[protocol.index()]
    }

    pub fn potential(&self, protocol: Protocol) -> &[String] {
        &self.potential[protocol.index()]
    }

    pub fn inactive(&self, protocol: Protocol) -> &[String] {
        &self.inactive[protocol.index()]
    }

    /// Freeze the current state into a report
    pub fn report(&self, test_name: &str, labels: &ResultLabels) -> StatisticsReport {
        let classification = labels
            .positive
            .as_ref()
            .map(|positive| self.classification(positive, labels));

        StatisticsReport {
            test_name: test_name.to_string(),
            packets_sent: self.packets_sent,
            packets_received: self.packets_received,
            message_loss_percent: self.message_loss(),
            test_time_ms: self.test_time().as_millis() as u64,
            rtt: self.rtt_summary(),
            classification,
            started_at: self.started_at,
            generated_at: Utc::now(),
        }
    }

    /// Freeze the counters of a client test into a report
    ///
    /// A client test counts incoming requests as received packets and the
    /// payloads answered to them as sent packets.
    pub fn client_report(&self, test_name: &str) -> ClientReport {
        ClientReport {
            test_name: test_name.to_string(),
            requests_received: self.packets_received,
            payloads_sent: self.packets_sent,
            test_time_ms: self.test_time().as_millis() as u64,
            started_at: self.started_at,
            generated_at: Utc::now(),
        }
    }

    fn classification(&self, positive: &str, labels: &ResultLabels) -> ClassificationReport {
        let active_set = unique(&self.active);
        let mut potential_set = unique(&self.potential);
        let mut inactive_set = unique(&self.inactive);

        for endpoint in &active_set {
            potential_set.remove(endpoint);
            inactive_set.remove(endpoint);
        }
        for endpoint in &potential_set {
            inactive_set.remove(endpoint);
        }

        ClassificationReport {
            positive_label: positive.to_string(),
            potential_label: labels.potential.clone(),
            negative_label: labels.negative.clone(),
            active: per_protocol(&self.active),
            potential: per_protocol(&self.potential),
            total_active: active_set.len(),
            total_potential: potential_set.len(),
            total_inactive: inactive_set.len(),
        }
    }
}

fn unique(table: &ClassificationTable) -> BTreeSet<String> {
    table.iter().flatten().cloned().collect()
}

fn per_protocol(table: &ClassificationTable) -> Vec<ProtocolEndpoints> {
    Protocol::ALL_VARIANTS
        .iter()
        .filter(|p| !table[p.index()].is_empty())
        .map(|p| ProtocolEndpoints {
            protocol: *p,
            endpoints: table[p.index()].clone(),
        })
        .collect()
}

/// Round-trip time summary over all matched responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RttSummary {
    pub min_ms: u64,
    pub avg_ms: f64,
    pub max_ms: u64,
    pub samples: usize,
}

impl RttSummary {
    /// `None` when there are no samples
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        let min_ms = *samples.iter().min()?;
        let max_ms = *samples.iter().max()?;
        let sum: u64 = samples.iter().sum();
        Some(Self {
            min_ms,
            avg_ms: sum as f64 / samples.len() as f64,
            max_ms,
            samples: samples.len(),
        })
    }
}

/// Endpoints recorded for one protocol, in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolEndpoints {
    pub protocol: Protocol,
    pub endpoints: Vec<String>,
}

/// Classification section of the report
///
/// Totals are deduplicated across protocols: potential excludes anything
/// active, inactive excludes both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub positive_label: String,
    pub potential_label: String,
    pub negative_label: String,
    pub active: Vec<ProtocolEndpoints>,
    pub potential: Vec<ProtocolEndpoints>,
    pub total_active: usize,
    pub total_potential: usize,
    pub total_inactive: usize,
}

/// Final report for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub test_name: String,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub message_loss_percent: f64,
    pub test_time_ms: u64,
    pub rtt: Option<RttSummary>,
    pub classification: Option<ClassificationReport>,
    pub started_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

impl StatisticsReport {
    /// Export the report as pretty-printed JSON
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Final report of a client test, where the engine plays the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientReport {
    pub test_name: String,
    pub requests_received: u64,
    pub payloads_sent: u64,
    pub test_time_ms: u64,
    pub started_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

impl ClientReport {
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
