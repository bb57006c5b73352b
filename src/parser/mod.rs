//! Normalizes raw transport records into canonical [`Event`]s and
//! [`ConfigObject`]s.
//!
//! Endpoint records are identified by their dn, a path-like identifier
//! whose fixed-shape segments carry the node, vrf, bridge-domain, encap and
//! address:
//!
//! ```text
//! topology/pod-1/node-101/sys/ctx-[vxlan-2490368]/bd-[vxlan-15007730]/vlan-[vlan-110]/db-ep/mac-00:50:56:AA:BB:CC
//! topology/pod-1/node-101/sys/ctx-[vxlan-2490368]/db-ep/ip-[10.1.1.101]
//! <mac dn>/rsmacEpToIpEpAtt-[sys/ctx-[vxlan-2490368]/bd-[vxlan-15007730]/vlan-[vlan-110]/db-ep/ip-[10.1.1.101]]
//! ```
//!
//! A record that matches no shape is rejected with a [`ParseError`]; the
//! caller drops and logs it.

mod dn;
mod endpoint;
mod record;

pub use dn::*;
pub use endpoint::*;
pub use record::*;
