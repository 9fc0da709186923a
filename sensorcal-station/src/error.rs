//! Station errors
//!
//! Core errors are wrapped as-is; everything the hosted runtime adds (files,
//! JSON, the async runtime) gets its own variant with the offending path.

use std::io;
use std::path::PathBuf;

use sensorcal_core::{
    hal::EdgeTableError, ConfigError, EngineError, PersistenceError, SnapshotError,
};
use thiserror::Error;

/// Result alias for the station
pub type StationResult<T> = Result<T, StationError>;

/// Hosted runtime errors
#[derive(Debug, Error)]
pub enum StationError {
    /// Channel or calibration operation failed
    #[error("engine: {0}")]
    Engine(EngineError),

    /// Configuration rejected
    #[error("configuration rejected: {0}")]
    Config(ConfigError),

    /// Consumer read failed
    #[error("snapshot: {0}")]
    Snapshot(SnapshotError),

    /// Calibration store failed outside an engine operation
    #[error("calibration store: {0}")]
    Store(PersistenceError),

    /// Pulse listener could not be registered
    #[error("edge registration: {0}")]
    Edge(EdgeTableError),

    /// File access failed
    #[error("{path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// File is not valid JSON for the expected shape
    #[error("{path}: invalid JSON: {source}")]
    Json {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Drivers need a Tokio runtime and none is running
    #[error("no Tokio runtime on this thread")]
    NoRuntime,

    /// A periodic driver task panicked or was cancelled
    #[error("driver {name} did not stop cleanly")]
    DriverFailed {
        /// Driver name
        name: &'static str,
    },
}

impl From<EngineError> for StationError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<ConfigError> for StationError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<SnapshotError> for StationError {
    fn from(err: SnapshotError) -> Self {
        Self::Snapshot(err)
    }
}

impl From<PersistenceError> for StationError {
    fn from(err: PersistenceError) -> Self {
        Self::Store(err)
    }
}

impl From<EdgeTableError> for StationError {
    fn from(err: EdgeTableError) -> Self {
        Self::Edge(err)
    }
}
