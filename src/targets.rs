//! Target-space expansion
//!
//! Turns textual address and port descriptors into concrete, deduplicated
//! and ordered sets.
//!
//! - addresses: `"10.0.0.1,10.0.0.0/30,2001:db8::/126"`
//! - ports: `"80,443,8000-8010"`

use crate::defaults::MAX_EXPANDED_ADDRESSES;
use crate::error::{AppError, Result};
use crate::logging::ProbeLogger;
use ipnet::{IpNet, Ipv4AddrRange, Ipv6AddrRange};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;

/// Expand a comma separated list of addresses and CIDR blocks
///
/// CIDR blocks include their network and broadcast addresses. The result is
/// deduplicated and sorted by textual form, so `10.0.0.10` sorts before
/// `10.0.0.2`.
pub fn expand_addresses(spec: &str) -> Result<Vec<IpAddr>> {
    let mut unique = HashSet::new();

    for item in spec.split(',') {
        let item = item.trim();
        if item.is_empty() {
            return Err(AppError::invalid_address(format!("empty item in '{}'", spec)));
        }

        if item.contains('/') {
            expand_block(item, &mut unique)?;
        } else {
            let address = IpAddr::from_str(item)
                .map_err(|_| AppError::invalid_address(item.to_string()))?;
            unique.insert(address);
        }
    }

    let mut addresses: Vec<IpAddr> = unique.into_iter().collect();
    addresses.sort_by_cached_key(|address| address.to_string());
    Ok(addresses)
}

fn expand_block(item: &str, into: &mut HashSet<IpAddr>) -> Result<()> {
    let net = IpNet::from_str(item)
        .map_err(|_| AppError::invalid_address(item.to_string()))?
        .trunc();

    let host_bits = u32::from(net.max_prefix_len() - net.prefix_len());
    let size = 1u128
        .checked_shl(host_bits)
        .filter(|size| *size <= MAX_EXPANDED_ADDRESSES);
    if size.is_none() {
        return Err(AppError::invalid_address(format!(
            "{} expands to more than {} addresses",
            item, MAX_EXPANDED_ADDRESSES
        )));
    }

    match net {
        IpNet::V4(net) => {
            into.extend(Ipv4AddrRange::new(net.network(), net.broadcast()).map(IpAddr::V4));
        }
        IpNet::V6(net) => {
            into.extend(Ipv6AddrRange::new(net.network(), net.broadcast()).map(IpAddr::V6));
        }
    }
    Ok(())
}

/// Expand a comma separated list of ports and inclusive `low-high` ranges
pub fn expand_ports(spec: &str) -> Result<Vec<u16>> {
    let mut ports = BTreeSet::new();

    for item in spec.split(',') {
        let item = item.trim();
        match item.split_once('-') {
            Some((low, high)) => {
                let low = parse_port(low)?;
                let high = parse_port(high)?;
                if low > high {
                    return Err(AppError::invalid_port(format!(
                        "range {} starts above its end",
                        item
                    )));
                }
                ports.extend(low..=high);
            }
            None => {
                ports.insert(parse_port(item)?);
            }
        }
    }

    Ok(ports.into_iter().collect())
}

fn parse_port(text: &str) -> Result<u16> {
    let text = text.trim();
    let value: u32 = text
        .parse()
        .map_err(|_| AppError::invalid_port(format!("'{}' is not a number", text)))?;
    u16::try_from(value)
        .map_err(|_| AppError::invalid_port(format!("{} is out of range", value)))
}

/// Parse an optional single port
///
/// Absent or blank input means "unset". Anything else that is not a port is
/// reported and also treated as unset.
pub fn parse_single_port(input: Option<&str>) -> Option<u16> {
    let text = input?.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<u16>() {
        Ok(port) => Some(port),
        Err(_) => {
            ProbeLogger::new(false).log_invalid_port(text);
            None
        }
    }
}

/// Load a name list (URLs, service names) from a file
///
/// One name per line, trimmed. Blank lines are skipped; the result is
/// deduplicated and sorted.
pub fn load_names(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Cannot load names from {}: {}", path.display(), e)))?;

    let names: BTreeSet<String> = content
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();

    Ok(names.into_iter().collect())
}

/// Expanded destination addresses and ports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpace {
    pub addresses: Vec<IpAddr>,
    pub ports: Vec<u16>,
}

impl TargetSpace {
    pub fn parse(address_spec: &str, port_spec: &str) -> Result<Self> {
        Ok(Self {
            addresses: expand_addresses(address_spec)?,
            ports: expand_ports(port_spec)?,
        })
    }

    /// Number of (address, port) pairs
    pub fn len(&self) -> usize {
        self.addresses.len() * self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate pairs, addresses outer and ports inner
    pub fn pairs(&self) -> impl Iterator<Item = (IpAddr, u16)> + '_ {
        self.addresses
            .iter()
            .flat_map(move |address| self.ports.iter().map(move |port| (*address, *port)))
    }

    /// Whether any destination is IPv6
    pub fn has_ipv6(&self) -> bool {
        self.addresses.iter().any(IpAddr::is_ipv6)
    }
}
