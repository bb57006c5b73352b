// -
// Database namespaces

/// Sled database tree namespaces
pub(crate) const HISTORY_TREE: &str = "_ept_history";
pub(crate) const ANOMALY_TREE: &str = "_ept_anomaly";
pub(crate) const ENDPOINT_TREE: &str = "_ept_endpoint";
pub(crate) const OBJECT_TREE: &str = "_ept_objects";

/// Separator between the components of a persisted key
pub(crate) const KEY_SEPARATOR: char = '\u{0}';

// -
// Sentinels

/// Derived vnid/node reference whose target does not exist (yet)
pub const UNRESOLVED: u32 = 0;

/// Expected-remote identity used by stale analysis when no node is local
pub const NO_LOCAL_NODE: u32 = 0;

/// Policy tag that does not identify a concrete EPG
pub(crate) const PC_TAG_ANY: &str = "any";

/// Interface id reported for entries without a concrete attachment
pub(crate) const UNSPECIFIED_INTERFACE: &str = "unspecified";

// -
// Endpoint record classes

pub const CLASS_MAC_EP: &str = "epmMacEp";
pub const CLASS_IP_EP: &str = "epmIpEp";
pub const CLASS_RS_IP_EP: &str = "epmRsMacEpToIpEpAtt";

// -
// Queues

/// Requests buffered by a [`FabricHandle`](crate::FabricHandle)
pub(crate) const HANDLE_QUEUE_CAPACITY: usize = 1024;

/// Upper bound of the ingestion queue in front of the dispatcher
pub(crate) const JOB_QUEUE_CAPACITY: usize = 4096;
