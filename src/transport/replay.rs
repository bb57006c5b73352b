//! File-backed transport used by the binary.
//!
//! One record per line, tab separated:
//!
//! ```text
//! epmMacEp	dn=topology/pod-1/node-101/sys/...	status=created	flags=local,mac	ifId=eth1/1	_ts=1700000000.5
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. `_ts` is the
//! observation time (epoch seconds or RFC3339); the load time is used when
//! absent. Fetches answer from the state built by the records delivered so
//! far.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::EventTransport;
use crate::parse_event;
use crate::time::now_ts;
use crate::time::parse_ts;
use crate::EndpointKey;
use crate::EventStatus;
use crate::RawRecord;
use crate::Result;
use crate::TransportError;

const TS_ATTR: &str = "_ts";
const SUBSCRIPTION_BUFFER: usize = 1024;

pub struct ReplayTransport {
    path: PathBuf,
    fabric: String,
    overlay_vnid: u32,
    records: Arc<Vec<RawRecord>>,
    /// Delivered state keyed by dn
    state: Arc<RwLock<BTreeMap<String, RawRecord>>>,
}

impl ReplayTransport {
    pub async fn open(
        path: impl AsRef<Path>,
        fabric: &str,
        overlay_vnid: u32,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| TransportError::Fetch(format!("{}: {e}", path.display())))?;
        let records = parse_lines(&raw);
        info!("loaded {} replay records from {}", records.len(), path.display());
        Ok(Self {
            path,
            fabric: fabric.to_string(),
            overlay_vnid,
            records: Arc::new(records),
            state: Arc::new(RwLock::new(BTreeMap::new())),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parses the replay format, skipping malformed lines.
pub fn parse_lines(raw: &str) -> Vec<RawRecord> {
    let loaded_at = now_ts();
    raw.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .filter_map(|(n, line)| {
            let mut fields = line.split('\t');
            let class = fields.next()?.trim();
            let mut record = RawRecord::new(class, loaded_at);
            for field in fields {
                let Some((k, v)) = field.split_once('=') else {
                    warn!("replay line {}: ignoring field {:?}", n + 1, field);
                    continue;
                };
                if k == TS_ATTR {
                    match parse_ts(v) {
                        Some(ts) => record.ts = ts,
                        None => warn!("replay line {}: bad timestamp {:?}", n + 1, v),
                    }
                } else {
                    record.attrs.insert(k.to_string(), v.to_string());
                }
            }
            Some(record)
        })
        .collect()
}

/// Folds one delivered record into the fetchable state.
fn apply(
    state: &mut BTreeMap<String, RawRecord>,
    record: &RawRecord,
) {
    let Some(dn) = record.attr("dn").map(str::to_string) else {
        return;
    };
    match EventStatus::parse(record.attr("status")) {
        Some(EventStatus::Deleted) => {
            state.remove(&dn);
        }
        Some(EventStatus::Modified) => {
            let entry = state.entry(dn).or_insert_with(|| record.clone());
            entry.attrs.extend(record.attrs.clone());
            entry.ts = record.ts;
        }
        _ => {
            state.insert(dn, record.clone());
        }
    }
}

/// Fetch results carry no transport status.
fn snapshot(record: &RawRecord) -> RawRecord {
    let mut r = record.clone();
    r.attrs.remove("status");
    r
}

#[async_trait]
impl EventTransport for ReplayTransport {
    async fn subscribe(&self) -> Result<mpsc::Receiver<RawRecord>> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let records = self.records.clone();
        let state = self.state.clone();
        let path = self.path.clone();
        tokio::spawn(async move {
            for record in records.iter() {
                apply(&mut state.write(), record);
                if tx.send(record.clone()).await.is_err() {
                    debug!("replay subscriber went away");
                    return;
                }
            }
            info!("replay of {} complete", path.display());
            // keep the subscription open until the consumer drops it
            tx.closed().await;
        });
        Ok(rx)
    }

    async fn fetch_class(
        &self,
        class: &str,
    ) -> Result<Vec<RawRecord>> {
        Ok(self
            .state
            .read()
            .values()
            .filter(|r| r.class == class)
            .map(snapshot)
            .collect())
    }

    async fn fetch_endpoint(
        &self,
        key: &EndpointKey,
    ) -> Result<Vec<RawRecord>> {
        Ok(self
            .state
            .read()
            .values()
            .map(snapshot)
            .filter(|r| {
                parse_event(r, &self.fabric, self.overlay_vnid)
                    .map(|e| &e.key == key)
                    .unwrap_or(false)
            })
            .collect())
    }
}
