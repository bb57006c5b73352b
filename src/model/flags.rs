use std::fmt;
use std::ops::BitOr;
use std::ops::BitOrAssign;

use serde::Deserialize;
use serde::Serialize;

/// Endpoint flag set reported by the switch (`"local,mac,vpc-attached"`).
///
/// Parsed once by the event parser; every later stage tests named bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointFlags(u16);

impl EndpointFlags {
    pub const LOCAL: Self = Self(1 << 0);
    pub const REMOTE: Self = Self(1 << 1);
    pub const VPC_ATTACHED: Self = Self(1 << 2);
    pub const PEER_ATTACHED: Self = Self(1 << 3);
    pub const MAC: Self = Self(1 << 4);
    pub const IP: Self = Self(1 << 5);
    pub const BOUNCE_TO_PROXY: Self = Self(1 << 6);
    pub const CACHED: Self = Self(1 << 7);
    pub const SVI: Self = Self(1 << 8);
    pub const LOOPBACK: Self = Self(1 << 9);
    pub const STATIC: Self = Self(1 << 10);
    pub const PEER_AGED: Self = Self(1 << 11);

    const TOKENS: [(&'static str, EndpointFlags); 12] = [
        ("local", Self::LOCAL),
        ("remote", Self::REMOTE),
        ("vpc-attached", Self::VPC_ATTACHED),
        ("peer-attached", Self::PEER_ATTACHED),
        ("mac", Self::MAC),
        ("ip", Self::IP),
        ("bounce-to-proxy", Self::BOUNCE_TO_PROXY),
        ("cached", Self::CACHED),
        ("svi", Self::SVI),
        ("loopback", Self::LOOPBACK),
        ("static", Self::STATIC),
        ("peer-aged", Self::PEER_AGED),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(
        &self,
        other: Self,
    ) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(
        &self,
        other: Self,
    ) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(
        &mut self,
        other: Self,
    ) {
        self.0 |= other.0;
    }

    pub fn remove(
        &mut self,
        other: Self,
    ) {
        self.0 &= !other.0;
    }

    /// Parses a comma separated token list. Unknown tokens are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut flags = Self::empty();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if let Some((_, f)) = Self::TOKENS.iter().find(|(name, _)| *name == token) {
                flags.insert(*f);
            } else {
                tracing::trace!("ignoring unknown endpoint flag {:?}", token);
            }
        }
        flags
    }
}

impl BitOr for EndpointFlags {
    type Output = Self;

    fn bitor(
        self,
        rhs: Self,
    ) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EndpointFlags {
    fn bitor_assign(
        &mut self,
        rhs: Self,
    ) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for EndpointFlags {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let names: Vec<&str> = Self::TOKENS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect();
        f.write_str(&names.join(","))
    }
}

impl fmt::Debug for EndpointFlags {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "EndpointFlags({self})")
    }
}
