//! Nearest-candidate-by-road-distance selection.
//!
//! A run geocodes the query, then every candidate in configuration order,
//! then routes from the query to each resolved candidate. External calls are
//! strictly sequential and separated by a configurable pause. Candidates that
//! fail at either stage are recorded and skipped; only the query itself is
//! fatal. Every failure and the final result go to the [`QueryLog`].

use std::collections::HashMap;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use nearstore_core::{
    normalize_address, AppConfig, Candidate, CandidateFailure, Coordinate, LogEntry, LogStatus,
    QueryLog, ResolvedCandidate, RouteResult, SelectionOutcome,
};
use thiserror::Error;

use crate::error::{GeocodeError, PostalError};
use crate::geocode::Geocoder;
use crate::postal::PostalCodeLookup;
use crate::route::{RouteOutcome, RouteProvider};

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("query address must have at least {min_chars} characters")]
    InvalidInput { min_chars: usize },

    #[error("could not geocode query address '{address}'")]
    GeocodingFailed {
        address: String,
        #[source]
        source: Option<GeocodeError>,
    },

    #[error("none of the {} candidate stores could be geocoded", unresolved.len())]
    NoCandidatesAvailable { unresolved: Vec<CandidateFailure> },

    #[error("no route found to any candidate store")]
    NoRouteFound {
        unresolved: Vec<CandidateFailure>,
        unroutable: Vec<CandidateFailure>,
    },
}

/// Failure to turn a postal code into a query address.
#[derive(Debug, Error)]
pub enum PostalQueryError {
    #[error("postal code '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Lookup(#[from] PostalError),
}

#[derive(Debug, Clone)]
pub struct SelectorSettings {
    /// Minimum length of the trimmed query, in characters.
    pub min_query_chars: usize,
    /// Pause between consecutive external calls within one run.
    pub inter_call_delay: Duration,
    /// Offset used to timestamp log entries.
    pub log_offset: FixedOffset,
}

impl SelectorSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            min_query_chars: config.min_query_chars,
            inter_call_delay: Duration::from_millis(config.inter_call_delay_ms),
            log_offset: config.log_utc_offset,
        }
    }
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            min_query_chars: 10,
            inter_call_delay: Duration::from_secs(1),
            log_offset: FixedOffset::west_opt(3 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

/// Per-run geocoding answer, shared by every use of the same normalized address.
#[derive(Debug, Clone)]
enum Resolution {
    Found(Coordinate),
    NotFound,
    Failed { status: LogStatus, reason: String },
}

/// Enforces the pause between consecutive external calls.
struct Pacer {
    delay: Duration,
    calls: usize,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self { delay, calls: 0 }
    }

    async fn before_call(&mut self) {
        if self.calls > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls += 1;
    }
}

pub struct Selector<G, R, L> {
    geocoder: G,
    router: R,
    log: L,
    settings: SelectorSettings,
}

impl<G, R, L> Selector<G, R, L>
where
    G: Geocoder,
    R: RouteProvider,
    L: QueryLog,
{
    pub fn new(geocoder: G, router: R, log: L, settings: SelectorSettings) -> Self {
        Self {
            geocoder,
            router,
            log,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SelectorSettings {
        &self.settings
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// Finds the candidate with the shortest road distance from `query_address`.
    ///
    /// # Errors
    ///
    /// - [`SelectionError::InvalidInput`] if the trimmed query is shorter than
    ///   `min_query_chars`; nothing is called.
    /// - [`SelectionError::GeocodingFailed`] if the query cannot be geocoded;
    ///   no routing is attempted.
    /// - [`SelectionError::NoCandidatesAvailable`] if no candidate geocodes.
    /// - [`SelectionError::NoRouteFound`] if no resolved candidate has a route.
    pub async fn select_nearest(
        &self,
        query_address: &str,
        candidates: &[Candidate],
    ) -> Result<SelectionOutcome, SelectionError> {
        let query = query_address.trim();
        let min_chars = self.settings.min_query_chars;
        if query.chars().count() < min_chars {
            self.record(
                query,
                LogStatus::InvalidInput,
                format!("query must have at least {min_chars} characters"),
            )
            .await;
            return Err(SelectionError::InvalidInput { min_chars });
        }

        let mut pacer = Pacer::new(self.settings.inter_call_delay);
        let mut snapshot: HashMap<String, Resolution> = HashMap::new();

        pacer.before_call().await;
        let query_coordinate = match self.geocoder.geocode(query).await {
            Ok(Some(coordinate)) => {
                snapshot.insert(normalize_address(query), Resolution::Found(coordinate));
                coordinate
            }
            Ok(None) => {
                self.record(
                    query,
                    LogStatus::GeocodeNotFound,
                    format!("query address '{query}' could not be geocoded"),
                )
                .await;
                return Err(SelectionError::GeocodingFailed {
                    address: query.to_string(),
                    source: None,
                });
            }
            Err(err) => {
                self.record(
                    query,
                    err.log_status(),
                    format!("geocoding query address '{query}' failed: {}", error_chain(&err)),
                )
                .await;
                return Err(SelectionError::GeocodingFailed {
                    address: query.to_string(),
                    source: Some(err),
                });
            }
        };

        let mut resolved: Vec<(&Candidate, Coordinate)> = Vec::with_capacity(candidates.len());
        let mut unresolved = Vec::new();
        for candidate in candidates {
            match self
                .resolve_candidate(&mut pacer, &mut snapshot, candidate)
                .await
            {
                Resolution::Found(coordinate) => resolved.push((candidate, coordinate)),
                Resolution::NotFound => {
                    let reason = format!("address '{}' could not be geocoded", candidate.address);
                    let message = candidate_message(candidate, &reason);
                    self.record(query, LogStatus::GeocodeNotFound, message).await;
                    unresolved.push(failure(candidate, reason));
                }
                Resolution::Failed { status, reason } => {
                    self.record(query, status, candidate_message(candidate, &reason))
                        .await;
                    unresolved.push(failure(candidate, reason));
                }
            }
        }

        if resolved.is_empty() {
            self.record(
                query,
                LogStatus::NoCandidates,
                format!("none of {} candidate stores could be geocoded", candidates.len()),
            )
            .await;
            return Err(SelectionError::NoCandidatesAvailable { unresolved });
        }

        let mut best: Option<(&Candidate, Coordinate, RouteResult)> = None;
        let mut unroutable = Vec::new();
        for (candidate, coordinate) in resolved {
            pacer.before_call().await;
            let (status, reason) = match self.router.route(query_coordinate, coordinate).await {
                Ok(RouteOutcome::Found(route)) => {
                    tracing::debug!(
                        store = %candidate.name,
                        distance_km = route.distance_km,
                        "route computed"
                    );
                    let shorter = best
                        .as_ref()
                        .is_none_or(|(_, _, current)| route.distance_km < current.distance_km);
                    if shorter {
                        best = Some((candidate, coordinate, route));
                    }
                    continue;
                }
                Ok(RouteOutcome::NoRoute(reason)) => (reason.log_status(), reason.to_string()),
                Err(err) => (err.log_status(), format!("routing failed: {}", error_chain(&err))),
            };
            self.record(query, status, candidate_message(candidate, &reason))
                .await;
            unroutable.push(failure(candidate, reason));
        }

        let Some((winner, winner_coordinate, route)) = best else {
            self.record(
                query,
                LogStatus::NoRouteFound,
                format!(
                    "no route found to any of {} resolved candidate stores",
                    unroutable.len()
                ),
            )
            .await;
            return Err(SelectionError::NoRouteFound {
                unresolved,
                unroutable,
            });
        };

        self.record(
            query,
            LogStatus::Success,
            format!(
                "nearest store '{}' at {:.2} km",
                winner.name, route.distance_km
            ),
        )
        .await;

        Ok(SelectionOutcome {
            query_address: query.to_string(),
            query_coordinate,
            winner: ResolvedCandidate {
                name: winner.name.clone(),
                address: winner.address.clone(),
                coordinate: winner_coordinate,
            },
            route,
            unresolved,
            unroutable,
        })
    }

    /// Resolves `postal_code` to a query address, logging failures like a selection would.
    ///
    /// # Errors
    ///
    /// Returns [`PostalQueryError::NotFound`] for unknown codes (or codes whose
    /// record carries no address) and [`PostalQueryError::Lookup`] for
    /// malformed codes and service failures.
    pub async fn address_for_postal_code<P: PostalCodeLookup>(
        &self,
        lookup: &P,
        postal_code: &str,
    ) -> Result<String, PostalQueryError> {
        match lookup.lookup(postal_code).await {
            Ok(Some(address)) => {
                let query = address.to_query_string();
                if query.is_empty() {
                    self.record(
                        postal_code,
                        LogStatus::PostalCodeNotFound,
                        format!("postal code '{postal_code}' has no street address"),
                    )
                    .await;
                    return Err(PostalQueryError::NotFound(postal_code.to_string()));
                }
                Ok(query)
            }
            Ok(None) => {
                self.record(
                    postal_code,
                    LogStatus::PostalCodeNotFound,
                    format!("postal code '{postal_code}' not found"),
                )
                .await;
                Err(PostalQueryError::NotFound(postal_code.to_string()))
            }
            Err(err) => {
                self.record(
                    postal_code,
                    err.log_status(),
                    format!("postal code lookup failed: {}", error_chain(&err)),
                )
                .await;
                Err(PostalQueryError::Lookup(err))
            }
        }
    }

    async fn resolve_candidate(
        &self,
        pacer: &mut Pacer,
        snapshot: &mut HashMap<String, Resolution>,
        candidate: &Candidate,
    ) -> Resolution {
        let key = normalize_address(&candidate.address);
        if let Some(known) = snapshot.get(&key) {
            return known.clone();
        }

        pacer.before_call().await;
        let resolution = match self.geocoder.geocode(&candidate.address).await {
            Ok(Some(coordinate)) => Resolution::Found(coordinate),
            Ok(None) => Resolution::NotFound,
            Err(err) => Resolution::Failed {
                status: err.log_status(),
                reason: format!("geocoding failed: {}", error_chain(&err)),
            },
        };
        snapshot.insert(key, resolution.clone());
        resolution
    }

    /// Emits a tracing event and appends to the query log; a failing log store is only warned about.
    async fn record(&self, query: &str, status: LogStatus, message: String) {
        if status.is_failure() {
            tracing::warn!(status = %status, query, message = %message, "selection event");
        } else {
            tracing::info!(status = %status, query, message = %message, "selection event");
        }

        let entry = LogEntry::now(self.settings.log_offset, query, status, message);
        if let Err(err) = self.log.append(entry).await {
            tracing::warn!(error = %err, "failed to append query log entry");
        }
    }
}

fn candidate_message(candidate: &Candidate, reason: &str) -> String {
    format!("store '{}': {reason}", candidate.name)
}

/// `err` followed by each source not already part of the text before it.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

fn failure(candidate: &Candidate, reason: String) -> CandidateFailure {
    CandidateFailure {
        name: candidate.name.clone(),
        reason,
    }
}

#[cfg(test)]
#[path = "selector_test.rs"]
mod tests;
