use std::collections::BTreeMap;

use dashmap::DashMap;
use tracing::trace;
use tracing::warn;

use super::HistoryStore;
use super::ObjectStore;
use crate::AnomalyEvent;
use crate::AnomalyKind;
use crate::AnomalyRecord;
use crate::EndpointKey;
use crate::EndpointRecord;
use crate::Event;
use crate::FabricObject;
use crate::HistoryLedger;
use crate::LedgerFlag;
use crate::ObjectTable;
use crate::Result;

type AnomalyId = (EndpointKey, AnomalyKind, u32);

/// In-process store. Each record sits behind a `DashMap` shard lock, which
/// makes every read-modify-write atomic per key.
#[derive(Debug, Default)]
pub struct MemStore {
    history: DashMap<EndpointKey, BTreeMap<u32, HistoryLedger>>,
    anomalies: DashMap<AnomalyId, AnomalyRecord>,
    endpoints: DashMap<EndpointKey, EndpointRecord>,
    objects: DashMap<(String, ObjectTable), BTreeMap<String, FabricObject>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemStore {
    fn append_event(
        &self,
        event: &Event,
        capacity: usize,
    ) -> Result<HistoryLedger> {
        let mut ledgers = self.history.entry(event.key.clone()).or_default();
        let ledger = ledgers
            .entry(event.node)
            .or_insert_with(|| HistoryLedger::new(event.key.clone(), event.node));
        ledger.push(event.clone(), capacity);
        trace!(key = %event.key, node = event.node, count = ledger.count, "appended");
        Ok(ledger.clone())
    }

    fn read_latest(
        &self,
        key: &EndpointKey,
        node: Option<u32>,
        slice: usize,
    ) -> Result<Vec<HistoryLedger>> {
        let Some(ledgers) = self.history.get(key) else {
            return Ok(Vec::new());
        };
        Ok(ledgers
            .iter()
            .filter(|(n, _)| node.map_or(true, |want| want == **n))
            .map(|(_, l)| l.sliced(slice))
            .collect())
    }

    fn set_flag(
        &self,
        key: &EndpointKey,
        node: u32,
        flag: LedgerFlag,
        value: bool,
    ) -> Result<bool> {
        let Some(mut ledgers) = self.history.get_mut(key) else {
            return Ok(false);
        };
        match ledgers.get_mut(&node) {
            Some(l) => {
                l.set_flag(flag, value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_endpoint(
        &self,
        key: &EndpointKey,
    ) -> Result<usize> {
        let mut removed = self.history.remove(key).map(|(_, l)| l.len()).unwrap_or(0);
        let before = self.anomalies.len();
        self.anomalies.retain(|(k, _, _), _| k != key);
        removed += before - self.anomalies.len();
        removed += self.endpoints.remove(key).map(|_| 1).unwrap_or(0);
        Ok(removed)
    }

    fn keys_on_node(
        &self,
        fabric: &str,
        node: u32,
    ) -> Result<Vec<EndpointKey>> {
        let mut keys: Vec<EndpointKey> = self
            .history
            .iter()
            .filter(|e| e.key().fabric == fabric && e.value().contains_key(&node))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn push_anomaly(
        &self,
        key: &EndpointKey,
        event: AnomalyEvent,
        capacity: usize,
    ) -> Result<u64> {
        let id = (key.clone(), event.kind(), event.node());
        let mut record = self
            .anomalies
            .entry(id)
            .or_insert_with(|| AnomalyRecord::new(key.clone(), event.node(), event.kind()));
        record.push(event, capacity);
        Ok(record.count)
    }

    fn read_anomaly(
        &self,
        key: &EndpointKey,
        kind: AnomalyKind,
        node: u32,
    ) -> Result<Option<AnomalyRecord>> {
        Ok(self.anomalies.get(&(key.clone(), kind, node)).map(|r| r.clone()))
    }

    fn push_endpoint_event(
        &self,
        key: &EndpointKey,
        event: Event,
        capacity: usize,
    ) -> Result<u64> {
        let mut record = self
            .endpoints
            .entry(key.clone())
            .or_insert_with(|| EndpointRecord::new(key.clone()));
        record.push(event, capacity);
        Ok(record.count)
    }

    fn read_endpoint(
        &self,
        key: &EndpointKey,
    ) -> Result<Option<EndpointRecord>> {
        Ok(self.endpoints.get(key).map(|r| r.clone()))
    }
}

impl ObjectStore for MemStore {
    fn get_object(
        &self,
        fabric: &str,
        table: ObjectTable,
        name: &str,
    ) -> Result<Option<FabricObject>> {
        Ok(self
            .objects
            .get(&(fabric.to_string(), table))
            .and_then(|t| t.get(name).cloned()))
    }

    fn list_objects(
        &self,
        fabric: &str,
        table: ObjectTable,
    ) -> Result<Vec<FabricObject>> {
        Ok(self
            .objects
            .get(&(fabric.to_string(), table))
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    fn bulk_upsert(
        &self,
        fabric: &str,
        table: ObjectTable,
        objects: Vec<FabricObject>,
    ) -> Result<()> {
        let mut t = self.objects.entry((fabric.to_string(), table)).or_default();
        for object in objects {
            if object.table() != table {
                warn!("skipping {} object upserted into table {}", object.table(), table);
                continue;
            }
            t.insert(object.name(), object);
        }
        Ok(())
    }

    fn delete_objects(
        &self,
        fabric: &str,
        table: ObjectTable,
        names: &[String],
    ) -> Result<usize> {
        let Some(mut t) = self.objects.get_mut(&(fabric.to_string(), table)) else {
            return Ok(0);
        };
        Ok(names.iter().filter(|n| t.remove(n.as_str()).is_some()).count())
    }
}
