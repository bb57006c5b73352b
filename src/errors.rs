//! Endpoint Tracker Error Hierarchy
//!
//! Defines the error types of the reconciliation engine, categorized by
//! pipeline stage and by whether the failure is local to one endpoint key
//! or fatal to the whole fabric task.

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

use crate::EndpointKey;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (storage, transport, serialization)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed transport record
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Merge/refresh failures scoped to a single key
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Analysis pass skipped for a key
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Per-key or pool-wide backlog exhaustion
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// Heartbeat miss on a worker, the priority channel or the watcher
    #[error(transparent)]
    Liveness(#[from] LivenessError),

    /// Remediation executor failure or timeout
    #[error(transparent)]
    Remediation(#[from] RemediationError),

    /// Unrecoverable failures requiring a fabric task restart
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Error {
    /// Errors which tear down every worker and restart the fabric task.
    ///
    /// Everything else is swallowed and logged by the stage that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Fatal(_)
                | Error::Liveness(_)
                | Error::Capacity(CapacityError::GlobalBacklog { .. })
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    // Storage layer
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    // Controller subscription / fetch
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    //Serialization
    #[error("Serialization error")]
    Serialization(#[from] SerializationError),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("{0}")]
    SignalSendFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures while opening the database
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),

    /// Persisted value could not be decoded
    #[error("Data corruption detected at {location}")]
    DataCorruption { location: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Bincode serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Out-of-band fetch exceeded its deadline
    #[error("Transport request timeout after {0:?}")]
    Timeout(Duration),

    /// Out-of-band fetch failed
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Push subscription ended
    #[error("Subscription closed")]
    SubscriptionClosed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    /// Record class is not an endpoint class
    #[error("Unsupported record class: {0}")]
    UnsupportedClass(String),

    /// Identifier did not match any known endpoint shape
    #[error("Unrecognized endpoint dn: {0}")]
    UnrecognizedDn(String),

    /// Identifier matched a shape but a required field is missing
    #[error("Missing field {field} in {dn}")]
    MissingField { field: &'static str, dn: String },

    /// Attribute present but malformed
    #[error("Invalid {field} value {value:?}")]
    InvalidValue { field: &'static str, value: String },

    /// Endpoint learned in the fabric overlay routing context
    #[error("Endpoint {dn} belongs to the overlay vrf")]
    OverlayEndpoint { dn: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Refresh job is older than the oldest known history for the key
    #[error("Stale refresh trigger for {key}: trigger {trigger_ts} older than history {oldest_ts}")]
    StaleTrigger {
        key: EndpointKey,
        trigger_ts: f64,
        oldest_ts: f64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// vpc members disagree whether the endpoint is local
    #[error("Indeterminate topology for {key}: vpc members {node} and {peer} disagree on local placement")]
    IndeterminateTopology {
        key: EndpointKey,
        node: u32,
        peer: u32,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CapacityError {
    /// Outstanding jobs for one key hit `max_key_count`
    #[error("Key {key} backlog {outstanding} exceeds limit")]
    KeyBacklog { key: EndpointKey, outstanding: usize },

    /// Outstanding jobs for the whole pool hit `max_jobs`
    #[error("Global backlog {outstanding} reached limit {limit}")]
    GlobalBacklog { outstanding: usize, limit: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum LivenessError {
    #[error("{entity} missed hello for {elapsed:?}")]
    Timeout { entity: String, elapsed: Duration },
}

#[derive(Debug, thiserror::Error)]
pub enum RemediationError {
    #[error("Remediation on node {node} timed out after {timeout:?}")]
    Timeout { node: u32, timeout: Duration },

    #[error("Remediation on node {node} failed: {detail}")]
    Failed { node: u32, detail: String },
}

// ============== Conversion Implementations ============== //
impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::System(SystemError::Transport(e))
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::System(SystemError::Serialization(SerializationError::Bincode(e)))
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string()).into()
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        SystemError::TaskFailed(err).into()
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        TransportError::Fetch("deadline elapsed".to_string()).into()
    }
}
