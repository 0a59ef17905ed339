//! Append-only record of selection attempts.
//!
//! The selector reports every per-call failure and every request-level
//! outcome through [`QueryLog`]. Stores implement the trait; `nearstore-db`
//! provides the Postgres one.

use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome tag stored with each log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    InvalidInput,
    PostalCodeNotFound,
    PostalCodeError,
    GeocodeNotFound,
    GeocodeServiceError,
    GeocodeUnexpectedError,
    NoCandidates,
    RouteNoRoute,
    RouteMissingFields,
    RouteHttpError,
    RouteConnectionError,
    RouteTimeout,
    RouteUnexpectedError,
    NoRouteFound,
}

impl LogStatus {
    pub const ALL: [LogStatus; 15] = [
        LogStatus::Success,
        LogStatus::InvalidInput,
        LogStatus::PostalCodeNotFound,
        LogStatus::PostalCodeError,
        LogStatus::GeocodeNotFound,
        LogStatus::GeocodeServiceError,
        LogStatus::GeocodeUnexpectedError,
        LogStatus::NoCandidates,
        LogStatus::RouteNoRoute,
        LogStatus::RouteMissingFields,
        LogStatus::RouteHttpError,
        LogStatus::RouteConnectionError,
        LogStatus::RouteTimeout,
        LogStatus::RouteUnexpectedError,
        LogStatus::NoRouteFound,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogStatus::Success => "success",
            LogStatus::InvalidInput => "invalid_input",
            LogStatus::PostalCodeNotFound => "postal_code_not_found",
            LogStatus::PostalCodeError => "postal_code_error",
            LogStatus::GeocodeNotFound => "geocode_not_found",
            LogStatus::GeocodeServiceError => "geocode_service_error",
            LogStatus::GeocodeUnexpectedError => "geocode_unexpected_error",
            LogStatus::NoCandidates => "no_candidates",
            LogStatus::RouteNoRoute => "route_no_route",
            LogStatus::RouteMissingFields => "route_missing_fields",
            LogStatus::RouteHttpError => "route_http_error",
            LogStatus::RouteConnectionError => "route_connection_error",
            LogStatus::RouteTimeout => "route_timeout",
            LogStatus::RouteUnexpectedError => "route_unexpected_error",
            LogStatus::NoRouteFound => "no_route_found",
        }
    }

    #[must_use]
    pub fn is_failure(self) -> bool {
        self != LogStatus::Success
    }
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogStatus {
    type Err = QueryLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| QueryLogError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub logged_at: DateTime<FixedOffset>,
    pub query: String,
    pub status: LogStatus,
    pub message: String,
}

impl LogEntry {
    /// Stamps a new entry with the current time at `offset`.
    #[must_use]
    pub fn now(
        offset: FixedOffset,
        query: impl Into<String>,
        status: LogStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            logged_at: Utc::now().with_timezone(&offset),
            query: query.into(),
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryLogError {
    #[error("query log store failed: {0}")]
    Store(String),

    #[error("unknown log status: {0}")]
    UnknownStatus(String),
}

/// Append-only sink for [`LogEntry`] values.
pub trait QueryLog: Send + Sync {
    fn append(&self, entry: LogEntry)
        -> impl Future<Output = Result<(), QueryLogError>> + Send;
}

impl<T: QueryLog> QueryLog for Arc<T> {
    fn append(
        &self,
        entry: LogEntry,
    ) -> impl Future<Output = Result<(), QueryLogError>> + Send {
        (**self).append(entry)
    }
}

/// An absent store accepts and drops every entry.
impl<T: QueryLog> QueryLog for Option<T> {
    async fn append(&self, entry: LogEntry) -> Result<(), QueryLogError> {
        match self {
            Some(log) => log.append(entry).await,
            None => Ok(()),
        }
    }
}

/// Discards entries; the selector still emits tracing events for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopQueryLog;

impl QueryLog for NoopQueryLog {
    async fn append(&self, _entry: LogEntry) -> Result<(), QueryLogError> {
        Ok(())
    }
}

/// In-process store, mainly for tests and the CLI's dry runs.
#[derive(Debug, Default)]
pub struct MemoryQueryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryQueryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<LogStatus> {
        self.entries().into_iter().map(|e| e.status).collect()
    }
}

impl QueryLog for MemoryQueryLog {
    async fn append(&self, entry: LogEntry) -> Result<(), QueryLogError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in LogStatus::ALL {
            assert_eq!(status.as_str().parse::<LogStatus>().unwrap(), status);
        }
    }

    #[test]
    fn status_serde_matches_as_str() {
        let json = serde_json::to_string(&LogStatus::RouteMissingFields).unwrap();
        assert_eq!(json, "\"route_missing_fields\"");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "exploded".parse::<LogStatus>().unwrap_err();
        assert!(matches!(err, QueryLogError::UnknownStatus(ref s) if s == "exploded"));
    }

    #[test]
    fn only_success_is_not_a_failure() {
        assert!(!LogStatus::Success.is_failure());
        assert!(LogStatus::NoRouteFound.is_failure());
        assert!(LogStatus::GeocodeNotFound.is_failure());
    }

    #[test]
    fn entry_uses_configured_offset() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let entry = LogEntry::now(offset, "Rua A 1", LogStatus::Success, "ok");
        assert_eq!(entry.logged_at.offset().local_minus_utc(), -3 * 3600);
    }

    #[tokio::test]
    async fn optional_log_forwards_or_drops() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let present = Some(MemoryQueryLog::new());
        present
            .append(LogEntry::now(offset, "q", LogStatus::Success, "ok"))
            .await
            .unwrap();
        assert_eq!(present.as_ref().map(MemoryQueryLog::statuses), Some(vec![LogStatus::Success]));

        let absent: Option<MemoryQueryLog> = None;
        assert!(absent
            .append(LogEntry::now(offset, "q", LogStatus::Success, "ok"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn memory_log_keeps_order() {
        let log = Arc::new(MemoryQueryLog::new());
        let offset = FixedOffset::east_opt(0).unwrap();
        log.append(LogEntry::now(offset, "a", LogStatus::InvalidInput, "short"))
            .await
            .unwrap();
        log.append(LogEntry::now(offset, "b", LogStatus::Success, "done"))
            .await
            .unwrap();
        assert_eq!(
            log.statuses(),
            vec![LogStatus::InvalidInput, LogStatus::Success]
        );
    }
}
