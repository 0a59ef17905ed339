//! Shared domain types and configuration for the nearstore workspace.
//!
//! Everything here is free of network and database dependencies: the
//! geocoding/routing clients live in `nearstore-geo`, persistence in
//! `nearstore-db`.

pub mod app_config;
pub mod config;
pub mod geo;
pub mod normalize;
pub mod query_log;
pub mod selection;
pub mod stores;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, parse_utc_offset};
pub use geo::{Coordinate, CoordinateError, RouteResult};
pub use normalize::normalize_address;
pub use query_log::{
    LogEntry, LogStatus, MemoryQueryLog, NoopQueryLog, QueryLog, QueryLogError,
};
pub use selection::{CandidateFailure, ResolvedCandidate, SelectionOutcome};
pub use stores::{load_stores, Candidate, StoresFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read stores file {path}: {source}")]
    StoresFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stores file: {0}")]
    StoresFileParse(#[from] serde_yaml::Error),

    #[error("stores validation error: {0}")]
    Validation(String),
}
