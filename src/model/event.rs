//! Canonical endpoint event.
//!
//! Events produced by the parser may be partial: for `modified` records an
//! empty string (or zero vnid, or empty flag set) means the attribute was
//! omitted by the switch and is filled from the prior event during merge.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::EndpointFlags;
use super::EndpointKey;
use crate::constants::CLASS_IP_EP;
use crate::constants::CLASS_MAC_EP;
use crate::constants::CLASS_RS_IP_EP;
use crate::constants::UNSPECIFIED_INTERFACE;
use crate::node_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    Created,
    Modified,
    Deleted,
}

impl EventStatus {
    /// Missing status defaults to `Created`: refresh-sourced records carry none.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") | Some("created") => Some(EventStatus::Created),
            Some("modified") => Some(EventStatus::Modified),
            Some("deleted") => Some(EventStatus::Deleted),
            Some(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Created => "created",
            EventStatus::Modified => "modified",
            EventStatus::Deleted => "deleted",
        }
    }
}

/// Record shape an event was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceClass {
    /// Plain mac endpoint
    MacEp,
    /// Plain ip endpoint
    IpEp,
    /// mac to ip rewrite-association
    RsIpEp,
}

impl SourceClass {
    pub fn from_class(class: &str) -> Option<Self> {
        match class {
            CLASS_MAC_EP => Some(SourceClass::MacEp),
            CLASS_IP_EP => Some(SourceClass::IpEp),
            CLASS_RS_IP_EP => Some(SourceClass::RsIpEp),
            _ => None,
        }
    }

    pub fn as_class(&self) -> &'static str {
        match self {
            SourceClass::MacEp => CLASS_MAC_EP,
            SourceClass::IpEp => CLASS_IP_EP,
            SourceClass::RsIpEp => CLASS_RS_IP_EP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub key: EndpointKey,
    pub node: u32,
    pub ts: f64,
    pub status: EventStatus,
    pub class: SourceClass,
    pub dn: String,
    pub vrf: u32,
    pub bd: u32,
    /// Interface as reported (`eth1/1`, `po2`, `tunnel5`)
    pub intf_id: String,
    /// Resolved interface (`vpc-384` for a vpc port-channel)
    pub intf_name: String,
    pub pc_tag: String,
    pub encap: String,
    pub flags: EndpointFlags,
    /// Resolved remote node (or vpc identity) for XR entries
    pub remote: u32,
    pub rw_mac: String,
    pub rw_bd: u32,
    pub epg_name: String,
    pub vnid_name: String,
}

impl Event {
    /// Bare event carrying only identity fields.
    pub fn new(
        key: EndpointKey,
        node: u32,
        ts: f64,
        status: EventStatus,
        class: SourceClass,
    ) -> Self {
        Self {
            key,
            node,
            ts,
            status,
            class,
            dn: String::new(),
            vrf: 0,
            bd: 0,
            intf_id: String::new(),
            intf_name: String::new(),
            pc_tag: String::new(),
            encap: String::new(),
            flags: EndpointFlags::empty(),
            remote: 0,
            rw_mac: String::new(),
            rw_bd: 0,
            epg_name: String::new(),
            vnid_name: String::new(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == EventStatus::Deleted
    }

    pub fn is_local(&self) -> bool {
        self.flags.contains(EndpointFlags::LOCAL)
    }

    /// XR entry: known on this node only through a forwarding pointer.
    pub fn is_remote(&self) -> bool {
        !self.is_deleted() && !self.is_local()
    }

    /// Whether the entry says where the endpoint is: local, through an
    /// interface, or via a remote pointer. A rewrite-association merged
    /// before its base record has none of these.
    pub fn has_placement(&self) -> bool {
        self.is_local() || !self.intf_id.is_empty() || self.remote != 0
    }

    pub fn has_rewrite(&self) -> bool {
        !self.rw_mac.is_empty()
    }

    pub fn is_bounce(&self) -> bool {
        self.flags.contains(EndpointFlags::BOUNCE_TO_PROXY)
    }

    /// Local ip placement still waiting for its rewrite-association.
    pub fn is_provisional(&self) -> bool {
        self.key.is_ip() && self.is_local() && !self.has_rewrite()
    }

    /// Cached entries and entries without a concrete interface carry no
    /// placement information.
    pub fn is_cached_or_unspecified(&self) -> bool {
        self.flags.contains(EndpointFlags::CACHED)
            || self.intf_id.is_empty()
            || self.intf_id == UNSPECIFIED_INTERFACE
    }

    /// Compares the change-field set used to decide whether an update is new.
    /// Only deletion matters of the status: a re-learn reported as `created`
    /// matches a prior `modified` entry with the same placement.
    pub fn placement_differs(
        &self,
        other: &Event,
    ) -> bool {
        self.is_deleted() != other.is_deleted()
            || self.flags != other.flags
            || self.intf_id != other.intf_id
            || self.pc_tag != other.pc_tag
            || self.encap != other.encap
            || self.remote != other.remote
            || self.rw_mac != other.rw_mac
            || self.rw_bd != other.rw_bd
    }

    /// Same as [`Event::placement_differs`] but ignoring the rewrite mac.
    pub fn differs_beyond_rewrite_mac(
        &self,
        other: &Event,
    ) -> bool {
        let mut masked = other.clone();
        masked.rw_mac = self.rw_mac.clone();
        self.placement_differs(&masked)
    }

    /// Human readable placement used in notifications.
    pub fn describe(&self) -> String {
        if self.is_deleted() {
            return format!("deleted on node {}", node_label(self.node));
        }
        let mut s = if self.is_local() {
            format!(
                "local on node {}, interface {}, encap {}",
                node_label(self.node),
                self.intf_name,
                self.encap
            )
        } else {
            format!(
                "remote on node {} pointing to {}",
                node_label(self.node),
                node_label(self.remote)
            )
        };
        if !self.pc_tag.is_empty() {
            s.push_str(&format!(", pcTag {}", self.pc_tag));
        }
        if !self.epg_name.is_empty() {
            s.push_str(&format!(", epg {}", self.epg_name));
        }
        if self.has_rewrite() {
            s.push_str(&format!(", mac {} (bd {})", self.rw_mac, self.rw_bd));
        }
        s
    }
}

impl fmt::Display for Event {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{} node-{} {} {} @{:.3} [{}]",
            self.key,
            self.node,
            self.class.as_class(),
            self.status.as_str(),
            self.ts,
            self.describe()
        )
    }
}
