use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::KEY_SEPARATOR;

/// Address family of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddrType {
    Mac,
    Ipv4,
    Ipv6,
}

impl AddrType {
    /// Classifies an ip address string by family.
    pub fn of_ip(addr: &str) -> Self {
        if addr.contains(':') {
            AddrType::Ipv6
        } else {
            AddrType::Ipv4
        }
    }

    pub fn is_ip(&self) -> bool {
        !matches!(self, AddrType::Mac)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AddrType::Mac => "mac",
            AddrType::Ipv4 => "ipv4",
            AddrType::Ipv6 => "ipv6",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "mac" => Some(AddrType::Mac),
            "ipv4" => Some(AddrType::Ipv4),
            "ipv6" => Some(AddrType::Ipv6),
            _ => None,
        }
    }
}

impl fmt::Display for AddrType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an endpoint within a fabric.
///
/// `vnid` is the routing context: the BD vnid for mac endpoints and the VRF
/// vnid for ip endpoints. The key is the unit of history, de-duplication and
/// worker affinity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointKey {
    pub fabric: String,
    pub addr_type: AddrType,
    pub addr: String,
    pub vnid: u32,
}

impl EndpointKey {
    pub fn mac(
        fabric: &str,
        addr: &str,
        bd_vnid: u32,
    ) -> Self {
        Self {
            fabric: fabric.to_string(),
            addr_type: AddrType::Mac,
            addr: normalize_mac(addr),
            vnid: bd_vnid,
        }
    }

    pub fn ip(
        fabric: &str,
        addr: &str,
        vrf_vnid: u32,
    ) -> Self {
        Self {
            fabric: fabric.to_string(),
            addr_type: AddrType::of_ip(addr),
            addr: addr.to_lowercase(),
            vnid: vrf_vnid,
        }
    }

    pub fn is_ip(&self) -> bool {
        self.addr_type.is_ip()
    }

    /// Persisted form: components joined by a NUL separator so that every key
    /// of a fabric shares a common byte prefix.
    pub fn storage_key(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.fabric,
            self.addr_type.as_str(),
            self.vnid,
            self.addr,
            sep = KEY_SEPARATOR
        )
    }

    /// Inverse of [`EndpointKey::storage_key`].
    pub fn from_storage_key(raw: &str) -> Option<Self> {
        let mut parts = raw.split(KEY_SEPARATOR);
        let fabric = parts.next()?;
        let addr_type = AddrType::from_str(parts.next()?)?;
        let vnid = parts.next()?.parse().ok()?;
        let addr = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            fabric: fabric.to_string(),
            addr_type,
            addr: addr.to_string(),
            vnid,
        })
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}:{}[{}]", self.fabric, self.vnid, self.addr, self.addr_type)
    }
}

/// Canonical uppercase, colon separated mac.
pub fn normalize_mac(addr: &str) -> String {
    let hex: String = addr.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if hex.len() != 12 {
        return addr.to_uppercase();
    }
    hex.as_bytes()
        .chunks(2)
        .map(|c| String::from_utf8_lossy(c).to_uppercase())
        .collect::<Vec<_>>()
        .join(":")
}

// -
// vpc-domain identities
//
// A vpc pair presents as a single logical node whose id packs both member ids:
// (lower << 16) | higher. Physical node ids always fit in 16 bits.

pub fn vpc_node_id(
    a: u32,
    b: u32,
) -> u32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (lo << 16) | hi
}

pub fn split_vpc_node_id(id: u32) -> Option<(u32, u32)> {
    if id > 0xffff {
        Some((id >> 16, id & 0xffff))
    } else {
        None
    }
}

/// Physical nodes behind a (possibly vpc) node identity.
pub fn physical_nodes(id: u32) -> Vec<u32> {
    match split_vpc_node_id(id) {
        Some((a, b)) => vec![a, b],
        None => vec![id],
    }
}

/// Human readable node identity, `(101,102)` for a vpc pair.
pub fn node_label(id: u32) -> String {
    match split_vpc_node_id(id) {
        Some((a, b)) => format!("({a},{b})"),
        None => id.to_string(),
    }
}
