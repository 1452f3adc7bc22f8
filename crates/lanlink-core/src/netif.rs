//! Local address resolution.
//!
//! A node announces itself by address, so it has to know which address it
//! owns before anything else can start. The reference behavior — first
//! non-loopback IPv4 in whatever order the platform enumerates interfaces —
//! is non-deterministic on multi-homed hosts, so the selection policy is
//! explicit: `first` keeps the platform order, `cidr:<net>` pins the
//! choice to a subnet.

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use ipnetwork::Ipv4Network;

/// How to pick one address when the host has several.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPolicy {
    /// First non-loopback IPv4 in platform enumeration order.
    First,
    /// First non-loopback IPv4 inside the given network.
    Cidr(Ipv4Network),
}

impl FromStr for AddressPolicy {
    type Err = NetifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "first" {
            return Ok(AddressPolicy::First);
        }
        if let Some(net) = s.strip_prefix("cidr:") {
            let net = net
                .parse()
                .map_err(|_| NetifError::BadPolicy(s.to_string()))?;
            return Ok(AddressPolicy::Cidr(net));
        }
        Err(NetifError::BadPolicy(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NetifError {
    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[from] local_ip_address::Error),
    #[error("no non-loopback IPv4 address matches the policy")]
    NoAddress,
    #[error("invalid address policy '{0}' (expected 'first' or 'cidr:<net>')")]
    BadPolicy(String),
}

/// Resolve this host's IPv4 address under the given policy.
///
/// Failure here is fatal to the daemon: a node that does not know its own
/// address cannot announce itself or filter its own announcements.
pub fn resolve_local_ipv4(policy: AddressPolicy) -> Result<Ipv4Addr, NetifError> {
    let interfaces = local_ip_address::list_afinet_netifas()?;
    let candidates = interfaces.into_iter().filter_map(|(name, addr)| {
        tracing::trace!(interface = %name, addr = %addr, "interface candidate");
        match addr {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        }
    });
    select_address(candidates, policy).ok_or(NetifError::NoAddress)
}

/// Pure selection over a candidate list, separated from the OS
/// enumeration so the policy is testable.
fn select_address(
    candidates: impl IntoIterator<Item = Ipv4Addr>,
    policy: AddressPolicy,
) -> Option<Ipv4Addr> {
    let mut non_loopback = candidates.into_iter().filter(|a| !a.is_loopback());
    match policy {
        AddressPolicy::First => non_loopback.next(),
        AddressPolicy::Cidr(net) => non_loopback.find(|a| net.contains(*a)),
    }
}
