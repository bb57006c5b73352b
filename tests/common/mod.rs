#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ept_engine::parse_config;
use ept_engine::parse_event;
use ept_engine::ClearRequest;
use ept_engine::ConfigClass;
use ept_engine::DependencyGraph;
use ept_engine::EndpointKey;
use ept_engine::Event;
use ept_engine::EventTransport;
use ept_engine::FabricCache;
use ept_engine::Notification;
use ept_engine::NotificationKind;
use ept_engine::NotificationSink;
use ept_engine::RawRecord;
use ept_engine::RemediationExecutor;
use ept_engine::RemediationOutcome;
use ept_engine::Result;
use ept_engine::Stores;
use ept_engine::TransportError;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio::time::timeout;

pub const FABRIC: &str = "fab1";
pub const OVERLAY: u32 = 16777199;
pub const VRF: u32 = 2490368;
pub const BD: u32 = 15007730;
pub const MAC: &str = "00:50:56:AA:BB:CC";
pub const IP: &str = "10.1.1.101";
pub const EPG_DN: &str = "uni/tn-t1/ap-a1/epg-e1";
pub const BD_DN: &str = "uni/tn-t1/BD-bd1";
pub const SUBNET_DN: &str = "uni/tn-t1/ap-a1/epg-e1/subnet-[10.1.1.1/24]";

pub fn mac_key() -> EndpointKey {
    EndpointKey::mac(FABRIC, MAC, BD)
}

pub fn ip_key() -> EndpointKey {
    EndpointKey::ip(FABRIC, IP, VRF)
}

// -
// records

pub fn config(
    class: ConfigClass,
    dn: &str,
    attrs: &[(&str, &str)],
) -> RawRecord {
    attrs
        .iter()
        .fold(RawRecord::new(class.as_class(), 1.0).with_attr("dn", dn), |r, (k, v)| {
            r.with_attr(*k, *v)
        })
}

/// Two vpc domains, (101,102) and (103,104), one tenant with a single EPG
/// bound to a bd carrying 10.1.1.0/24, and a tunnel from 103 to 104.
pub fn fabric_config() -> Vec<RawRecord> {
    let mut records = Vec::new();
    for id in 101..=104u32 {
        let (id_s, name, address) = (id.to_string(), format!("leaf{id}"), format!("10.0.0.{id}"));
        records.push(config(
            ConfigClass::FabricNode,
            &format!("topology/pod-1/node-{id}"),
            &[
                ("id", id_s.as_str()),
                ("name", name.as_str()),
                ("address", address.as_str()),
                ("fabricSt", "active"),
            ],
        ));
    }
    for (domain, vip, members) in [("a", "10.0.1.1/32", [101u32, 102]), ("b", "10.0.1.2/32", [103, 104])] {
        let group = format!("uni/fabric/protpol/expgep-vpc-{domain}");
        records.push(config(ConfigClass::FabricExplicitGEp, &group, &[("virtualIp", vip)]));
        for m in members {
            let id = m.to_string();
            records.push(config(
                ConfigClass::FabricNodePEp,
                &format!("{group}/nodepep-{m}"),
                &[("id", id.as_str())],
            ));
        }
    }
    for node in 101..=104u32 {
        records.push(config(
            ConfigClass::VpcRsVpcConf,
            &format!("topology/pod-1/node-{node}/sys/vpc/inst/dom-1/if-384/rsvpcConf"),
            &[("tSKey", "po2")],
        ));
    }
    records.push(config(
        ConfigClass::TunnelIf,
        "topology/pod-1/node-103/sys/tunnel-[tunnel7]",
        &[("id", "tunnel7"), ("dest", "10.0.0.104/32")],
    ));
    records.push(config(ConfigClass::FvCtx, "uni/tn-t1/ctx-v1", &[("scope", "2490368")]));
    records.push(config(ConfigClass::FvBD, BD_DN, &[("seg", "15007730")]));
    records.push(config(
        ConfigClass::FvAEPg,
        EPG_DN,
        &[("pcTag", "32770"), ("scope", "2490368")],
    ));
    records.push(config(
        ConfigClass::FvRsBd,
        &format!("{EPG_DN}/rsbd"),
        &[("tnFvBDName", "bd1")],
    ));
    records.push(config(ConfigClass::FvSubnet, SUBNET_DN, &[("ip", "10.1.1.1/24")]));
    records
}

fn mac_dn(node: u32) -> String {
    format!(
        "topology/pod-1/node-{node}/sys/ctx-[vxlan-{VRF}]/bd-[vxlan-{BD}]/vlan-[vlan-110]/db-ep/mac-{}",
        MAC.to_lowercase()
    )
}

fn ip_dn(node: u32) -> String {
    format!("topology/pod-1/node-{node}/sys/ctx-[vxlan-{VRF}]/db-ep/ip-[{IP}]")
}

/// Local MAC learned on the vpc port-channel `po2`.
pub fn vpc_mac(
    node: u32,
    ts: f64,
) -> RawRecord {
    RawRecord::new("epmMacEp", ts)
        .with_attr("dn", mac_dn(node))
        .with_attr("status", "created")
        .with_attr("flags", "local,mac,vpc-attached")
        .with_attr("ifId", "po2")
        .with_attr("pcTag", "32770")
}

/// Local IP without its rewrite association.
pub fn local_ip(
    node: u32,
    ts: f64,
) -> RawRecord {
    RawRecord::new("epmIpEp", ts)
        .with_attr("dn", ip_dn(node))
        .with_attr("status", "created")
        .with_attr("flags", "local,ip")
        .with_attr("ifId", "eth1/1")
        .with_attr("pcTag", "32770")
}

pub fn rewrite(
    node: u32,
    ts: f64,
) -> RawRecord {
    RawRecord::new("epmRsMacEpToIpEpAtt", ts)
        .with_attr(
            "dn",
            format!(
                "{}/rsmacEpToIpEpAtt-[sys/ctx-[vxlan-{VRF}]/bd-[vxlan-{BD}]/vlan-[vlan-110]/db-ep/ip-[{IP}]]",
                mac_dn(node)
            ),
        )
        .with_attr("status", "created")
}

/// Remote IP learned through `tunnel`.
pub fn remote_ip(
    node: u32,
    tunnel: &str,
    ts: f64,
) -> RawRecord {
    RawRecord::new("epmIpEp", ts)
        .with_attr("dn", ip_dn(node))
        .with_attr("status", "created")
        .with_attr("flags", "ip")
        .with_attr("ifId", tunnel)
}

// -
// components

/// Mirrors every configuration record into the object tables.
pub fn build_topology(
    stores: &Stores,
    records: &[RawRecord],
) -> DependencyGraph {
    let graph = DependencyGraph::new(stores.objects.clone());
    for record in records {
        let object = parse_config(record).expect("config record");
        graph.sync(FABRIC, &object).expect("sync");
    }
    graph
}

pub fn cache(stores: &Stores) -> FabricCache {
    FabricCache::new(FABRIC, stores.objects.clone(), 64)
}

pub fn resolved(
    cache: &mut FabricCache,
    record: &RawRecord,
) -> Event {
    let mut event = parse_event(record, FABRIC, OVERLAY).expect("endpoint record");
    cache.resolve_event(&mut event).expect("resolve");
    event
}

// -
// fakes

/// Serves a fixed configuration and hands the test the subscription feed.
pub struct ChannelTransport {
    classes: BTreeMap<String, Vec<RawRecord>>,
    feed: Mutex<Option<mpsc::Receiver<RawRecord>>>,
}

impl ChannelTransport {
    pub fn new(config: Vec<RawRecord>) -> (Self, mpsc::Sender<RawRecord>) {
        let mut classes: BTreeMap<String, Vec<RawRecord>> = BTreeMap::new();
        for record in config {
            classes.entry(record.class.clone()).or_default().push(record);
        }
        let (tx, rx) = mpsc::channel(64);
        (
            Self {
                classes,
                feed: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl EventTransport for ChannelTransport {
    async fn subscribe(&self) -> Result<mpsc::Receiver<RawRecord>> {
        self.feed
            .lock()
            .take()
            .ok_or_else(|| TransportError::SubscriptionClosed.into())
    }

    async fn fetch_class(
        &self,
        class: &str,
    ) -> Result<Vec<RawRecord>> {
        Ok(self.classes.get(class).cloned().unwrap_or_default())
    }

    async fn fetch_endpoint(
        &self,
        _key: &EndpointKey,
    ) -> Result<Vec<RawRecord>> {
        Ok(vec![])
    }
}

#[derive(Clone, Default)]
pub struct CollectingSink {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl CollectingSink {
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.seen.lock().iter().map(|n| n.kind).collect()
    }
}

impl NotificationSink for CollectingSink {
    fn notify(
        &self,
        notification: Notification,
    ) {
        self.seen.lock().push(notification);
    }
}

#[derive(Clone, Default)]
pub struct CountingRemediation {
    pub requests: Arc<Mutex<Vec<ClearRequest>>>,
}

#[async_trait]
impl RemediationExecutor for CountingRemediation {
    async fn clear(
        &self,
        request: ClearRequest,
    ) -> Result<RemediationOutcome> {
        self.requests.lock().push(request);
        Ok(RemediationOutcome {
            success: true,
            detail: "cleared".to_string(),
        })
    }
}

pub async fn eventually<F: Fn() -> bool>(check: F) {
    timeout(Duration::from_secs(10), async {
        while !check() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
