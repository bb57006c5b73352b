//! Address family and prefix helpers used by off-subnet analysis.

use std::net::IpAddr;

/// Parsed `addr/len` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    addr: IpAddr,
    len: u8,
}

impl Prefix {
    /// Parses `10.1.1.1/24` or `2001:db8::1/64`. A bare address is a host
    /// prefix.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (addr, len) = match raw.split_once('/') {
            Some((a, l)) => (a, Some(l)),
            None => (raw, None),
        };
        let addr: IpAddr = addr.parse().ok()?;
        let max = max_len(&addr);
        let len = match len {
            Some(l) => l.parse::<u8>().ok().filter(|l| *l <= max)?,
            None => max,
        };
        Some(Self { addr, len })
    }

    pub fn is_ipv4(&self) -> bool {
        self.addr.is_ipv4()
    }

    pub fn contains(
        &self,
        ip: &IpAddr,
    ) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = mask_u32(self.len);
                u32::from(net) & mask == u32::from(*ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = mask_u128(self.len);
                u128::from(net) & mask == u128::from(*ip) & mask
            }
            _ => false,
        }
    }
}

fn max_len(addr: &IpAddr) -> u8 {
    if addr.is_ipv4() {
        32
    } else {
        128
    }
}

fn mask_u32(len: u8) -> u32 {
    if len == 0 {
        0
    } else {
        u32::MAX << (32 - len as u32)
    }
}

fn mask_u128(len: u8) -> u128 {
    if len == 0 {
        0
    } else {
        u128::MAX << (128 - len as u32)
    }
}

/// `Some(true)` when `addr` falls outside every prefix of its own family,
/// `None` when no prefix of that family is configured or `addr` is not an ip.
pub fn outside_all(
    addr: &str,
    prefixes: &[String],
) -> Option<bool> {
    let ip: IpAddr = addr.parse().ok()?;
    let same_family: Vec<Prefix> = prefixes
        .iter()
        .filter_map(|p| Prefix::parse(p))
        .filter(|p| p.is_ipv4() == ip.is_ipv4())
        .collect();
    if same_family.is_empty() {
        return None;
    }
    Some(!same_family.iter().any(|p| p.contains(&ip)))
}
