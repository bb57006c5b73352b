use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Batch;
use sled::Tree;
use tracing::debug;
use tracing::warn;

use super::HistoryStore;
use super::ObjectStore;
use crate::constants::ANOMALY_TREE;
use crate::constants::ENDPOINT_TREE;
use crate::constants::HISTORY_TREE;
use crate::constants::KEY_SEPARATOR;
use crate::constants::OBJECT_TREE;
use crate::AnomalyEvent;
use crate::AnomalyKind;
use crate::AnomalyRecord;
use crate::EndpointKey;
use crate::EndpointRecord;
use crate::Error;
use crate::Event;
use crate::FabricObject;
use crate::HistoryLedger;
use crate::LedgerFlag;
use crate::ObjectTable;
use crate::Result;
use crate::StorageError;

/// Embedded sled store: one tree per record family, bincode values.
pub struct SledStore {
    db: sled::Db,
    pub(super) history: Tree,
    pub(super) anomalies: Tree,
    pub(super) endpoints: Tree,
    pub(super) objects: Tree,
}

impl std::fmt::Debug for SledStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledStore").field("history", &self.history.len()).finish()
    }
}

/// Opens (or creates) the database under `db_root_dir`.
pub fn init_sled_db(db_root_dir: impl AsRef<Path> + std::fmt::Debug) -> Result<sled::Db> {
    debug!("init_sled_db from path: {:?}", &db_root_dir);

    let path = db_root_dir.as_ref().join("ept");
    sled::Config::default()
        .path(&path)
        .cache_capacity(64 * 1024 * 1024) //64MB
        .flush_every_ms(Some(100))
        .use_compression(true)
        .compression_factor(1)
        .mode(sled::Mode::HighThroughput)
        .open()
        .map_err(|e| {
            warn!("Try to open DB at this location: {:?} and failed: {:?}", path, e);
            e.into()
        })
}

impl SledStore {
    pub fn open(db_root_dir: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        Self::from_db(init_sled_db(db_root_dir)?)
    }

    pub fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            history: db.open_tree(HISTORY_TREE)?,
            anomalies: db.open_tree(ANOMALY_TREE)?,
            endpoints: db.open_tree(ENDPOINT_TREE)?,
            objects: db.open_tree(OBJECT_TREE)?,
            db,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Atomic read-modify-write of one bincode record.
    ///
    /// `update` receives the decoded current value (or `None`) and returns the
    /// new value; sled may call it more than once under contention.
    fn update_record<T, R, F>(
        tree: &Tree,
        key: &[u8],
        mut update: F,
    ) -> Result<Option<R>>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Option<T>) -> Option<(T, R)>,
    {
        let mut failure: Option<Error> = None;
        let mut outcome: Option<R> = None;
        tree.fetch_and_update(key, |old| {
            failure = None;
            let current = match old.map(decode::<T>).transpose() {
                Ok(v) => v,
                Err(e) => {
                    failure = Some(e);
                    return old.map(|b| b.to_vec());
                }
            };
            match update(current) {
                Some((value, r)) => match bincode::serialize(&value) {
                    Ok(bytes) => {
                        outcome = Some(r);
                        Some(bytes)
                    }
                    Err(e) => {
                        failure = Some(e.into());
                        old.map(|b| b.to_vec())
                    }
                },
                None => {
                    outcome = None;
                    old.map(|b| b.to_vec())
                }
            }
        })?;
        match failure {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }

    fn scan<T: DeserializeOwned>(
        tree: &Tree,
        prefix: &[u8],
    ) -> Result<Vec<(sled::IVec, T)>> {
        tree.scan_prefix(prefix)
            .map(|item| {
                let (k, v) = item?;
                Ok((k, decode(&v)?))
            })
            .collect()
    }

    fn remove_prefix(
        tree: &Tree,
        prefix: &[u8],
    ) -> Result<usize> {
        let mut batch = Batch::default();
        let mut count = 0;
        for item in tree.scan_prefix(prefix) {
            let (k, _) = item?;
            batch.remove(k);
            count += 1;
        }
        tree.apply_batch(batch)?;
        Ok(count)
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| {
        warn!("failed to decode record: {:?}", e);
        StorageError::DataCorruption {
            location: format!("{} bytes record", bytes.len()),
        }
        .into()
    })
}

/// `<key>\0` prefix of every per-node record of a key.
fn key_prefix(key: &EndpointKey) -> Vec<u8> {
    format!("{}{}", key.storage_key(), KEY_SEPARATOR).into_bytes()
}

/// Node ids are zero padded so a prefix scan returns ledgers in node order.
fn ledger_id(
    key: &EndpointKey,
    node: u32,
) -> Vec<u8> {
    let mut id = key_prefix(key);
    id.extend_from_slice(format!("{node:010}").as_bytes());
    id
}

fn anomaly_id(
    key: &EndpointKey,
    kind: AnomalyKind,
    node: u32,
) -> Vec<u8> {
    let mut id = key_prefix(key);
    id.extend_from_slice(format!("{}{}{node:010}", kind.as_str(), KEY_SEPARATOR).as_bytes());
    id
}

fn table_prefix(
    fabric: &str,
    table: ObjectTable,
) -> Vec<u8> {
    format!("{fabric}{sep}{}{sep}", table.name(), sep = KEY_SEPARATOR).into_bytes()
}

impl HistoryStore for SledStore {
    fn append_event(
        &self,
        event: &Event,
        capacity: usize,
    ) -> Result<HistoryLedger> {
        let id = ledger_id(&event.key, event.node);
        let ledger = Self::update_record(&self.history, &id, |old: Option<HistoryLedger>| {
            let mut ledger =
                old.unwrap_or_else(|| HistoryLedger::new(event.key.clone(), event.node));
            ledger.push(event.clone(), capacity);
            let r = ledger.clone();
            Some((ledger, r))
        })?;
        ledger.ok_or_else(|| Error::Fatal(format!("append to {} produced no ledger", event.key)))
    }

    fn read_latest(
        &self,
        key: &EndpointKey,
        node: Option<u32>,
        slice: usize,
    ) -> Result<Vec<HistoryLedger>> {
        let ledgers: Vec<HistoryLedger> = match node {
            Some(n) => match self.history.get(ledger_id(key, n))? {
                Some(v) => vec![decode(&v)?],
                None => Vec::new(),
            },
            None => Self::scan::<HistoryLedger>(&self.history, &key_prefix(key))?
                .into_iter()
                .map(|(_, l)| l)
                .collect(),
        };
        Ok(ledgers.into_iter().map(|l| l.sliced(slice)).collect())
    }

    fn set_flag(
        &self,
        key: &EndpointKey,
        node: u32,
        flag: LedgerFlag,
        value: bool,
    ) -> Result<bool> {
        let id = ledger_id(key, node);
        let found = Self::update_record(&self.history, &id, |old: Option<HistoryLedger>| {
            let mut ledger = old?;
            ledger.set_flag(flag, value);
            Some((ledger, ()))
        })?;
        Ok(found.is_some())
    }

    fn delete_endpoint(
        &self,
        key: &EndpointKey,
    ) -> Result<usize> {
        let prefix = key_prefix(key);
        let mut removed = Self::remove_prefix(&self.history, &prefix)?;
        removed += Self::remove_prefix(&self.anomalies, &prefix)?;
        if self.endpoints.remove(key.storage_key().as_bytes())?.is_some() {
            removed += 1;
        }
        Ok(removed)
    }

    fn keys_on_node(
        &self,
        fabric: &str,
        node: u32,
    ) -> Result<Vec<EndpointKey>> {
        let prefix = format!("{fabric}{KEY_SEPARATOR}");
        let suffix = format!("{KEY_SEPARATOR}{node:010}");
        let mut keys = Vec::new();
        for item in self.history.scan_prefix(prefix.as_bytes()) {
            let (k, _) = item?;
            let raw = String::from_utf8_lossy(&k);
            if let Some(storage_key) = raw.strip_suffix(&suffix) {
                match EndpointKey::from_storage_key(storage_key) {
                    Some(key) => keys.push(key),
                    None => warn!("skipping malformed ledger id {:?}", raw),
                }
            }
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn push_anomaly(
        &self,
        key: &EndpointKey,
        event: AnomalyEvent,
        capacity: usize,
    ) -> Result<u64> {
        let (kind, node) = (event.kind(), event.node());
        let id = anomaly_id(key, kind, node);
        let count = Self::update_record(&self.anomalies, &id, |old: Option<AnomalyRecord>| {
            let mut record = old.unwrap_or_else(|| AnomalyRecord::new(key.clone(), node, kind));
            record.push(event.clone(), capacity);
            let count = record.count;
            Some((record, count))
        })?;
        Ok(count.unwrap_or_default())
    }

    fn read_anomaly(
        &self,
        key: &EndpointKey,
        kind: AnomalyKind,
        node: u32,
    ) -> Result<Option<AnomalyRecord>> {
        self.anomalies
            .get(anomaly_id(key, kind, node))?
            .map(|v| decode(&v))
            .transpose()
    }

    fn push_endpoint_event(
        &self,
        key: &EndpointKey,
        event: Event,
        capacity: usize,
    ) -> Result<u64> {
        let id = key.storage_key();
        let count = Self::update_record(
            &self.endpoints,
            id.as_bytes(),
            |old: Option<EndpointRecord>| {
                let mut record = old.unwrap_or_else(|| EndpointRecord::new(key.clone()));
                record.push(event.clone(), capacity);
                let count = record.count;
                Some((record, count))
            },
        )?;
        Ok(count.unwrap_or_default())
    }

    fn read_endpoint(
        &self,
        key: &EndpointKey,
    ) -> Result<Option<EndpointRecord>> {
        self.endpoints.get(key.storage_key().as_bytes())?.map(|v| decode(&v)).transpose()
    }
}

impl ObjectStore for SledStore {
    fn get_object(
        &self,
        fabric: &str,
        table: ObjectTable,
        name: &str,
    ) -> Result<Option<FabricObject>> {
        let mut id = table_prefix(fabric, table);
        id.extend_from_slice(name.as_bytes());
        self.objects.get(id)?.map(|v| decode(&v)).transpose()
    }

    fn list_objects(
        &self,
        fabric: &str,
        table: ObjectTable,
    ) -> Result<Vec<FabricObject>> {
        Ok(Self::scan::<FabricObject>(&self.objects, &table_prefix(fabric, table))?
            .into_iter()
            .map(|(_, o)| o)
            .collect())
    }

    fn bulk_upsert(
        &self,
        fabric: &str,
        table: ObjectTable,
        objects: Vec<FabricObject>,
    ) -> Result<()> {
        let prefix = table_prefix(fabric, table);
        let mut batch = Batch::default();
        for object in objects {
            if object.table() != table {
                warn!("skipping {} object upserted into table {}", object.table(), table);
                continue;
            }
            let mut id = prefix.clone();
            id.extend_from_slice(object.name().as_bytes());
            batch.insert(id, bincode::serialize(&object)?);
        }
        self.objects.apply_batch(batch)?;
        Ok(())
    }

    fn delete_objects(
        &self,
        fabric: &str,
        table: ObjectTable,
        names: &[String],
    ) -> Result<usize> {
        let prefix = table_prefix(fabric, table);
        let mut removed = 0;
        for name in names {
            let mut id = prefix.clone();
            id.extend_from_slice(name.as_bytes());
            if self.objects.remove(id)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
