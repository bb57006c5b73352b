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

/// Per-key event history with rotation, plus anomaly and summary records.
pub trait HistoryStore: Send + Sync + 'static {
    /// Appends `event` to the ledger of `(event.key, event.node)`, creating
    /// it on first use, dropping entries past `capacity` and bumping the
    /// ledger counter. Returns the updated ledger.
    fn append_event(
        &self,
        event: &Event,
        capacity: usize,
    ) -> Result<HistoryLedger>;

    /// Ledgers of `key`, restricted to `node` when given, each limited to its
    /// `slice` most recent events. Ordered by node id.
    fn read_latest(
        &self,
        key: &EndpointKey,
        node: Option<u32>,
        slice: usize,
    ) -> Result<Vec<HistoryLedger>>;

    /// Sets a derived ledger flag. Returns false when no ledger exists.
    fn set_flag(
        &self,
        key: &EndpointKey,
        node: u32,
        flag: LedgerFlag,
        value: bool,
    ) -> Result<bool>;

    /// Removes every ledger, anomaly record and summary of `key`.
    fn delete_endpoint(
        &self,
        key: &EndpointKey,
    ) -> Result<usize>;

    /// Keys with a ledger on `node`.
    fn keys_on_node(
        &self,
        fabric: &str,
        node: u32,
    ) -> Result<Vec<EndpointKey>>;

    /// Appends a confirmed anomaly. Returns the record's occurrence counter.
    fn push_anomaly(
        &self,
        key: &EndpointKey,
        event: AnomalyEvent,
        capacity: usize,
    ) -> Result<u64>;

    fn read_anomaly(
        &self,
        key: &EndpointKey,
        kind: AnomalyKind,
        node: u32,
    ) -> Result<Option<AnomalyRecord>>;

    fn latest_anomaly(
        &self,
        key: &EndpointKey,
        kind: AnomalyKind,
        node: u32,
    ) -> Result<Option<AnomalyEvent>> {
        Ok(self
            .read_anomaly(key, kind, node)?
            .and_then(|r| r.events.into_iter().next()))
    }

    /// Appends to the per-key endpoint summary. Returns its counter.
    fn push_endpoint_event(
        &self,
        key: &EndpointKey,
        event: Event,
        capacity: usize,
    ) -> Result<u64>;

    fn read_endpoint(
        &self,
        key: &EndpointKey,
    ) -> Result<Option<EndpointRecord>>;
}

/// Configuration mirrors and derived lookup tables, one namespace per fabric.
pub trait ObjectStore: Send + Sync + 'static {
    fn get_object(
        &self,
        fabric: &str,
        table: ObjectTable,
        name: &str,
    ) -> Result<Option<FabricObject>>;

    fn list_objects(
        &self,
        fabric: &str,
        table: ObjectTable,
    ) -> Result<Vec<FabricObject>>;

    /// Inserts or replaces every object, keyed by [`FabricObject::name`].
    fn bulk_upsert(
        &self,
        fabric: &str,
        table: ObjectTable,
        objects: Vec<FabricObject>,
    ) -> Result<()>;

    /// Returns how many objects existed.
    fn delete_objects(
        &self,
        fabric: &str,
        table: ObjectTable,
        names: &[String],
    ) -> Result<usize>;
}
