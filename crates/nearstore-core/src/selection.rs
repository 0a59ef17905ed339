use serde::Serialize;

use crate::geo::{Coordinate, RouteResult};

/// The store chosen by a selection run, with the coordinate it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedCandidate {
    pub name: String,
    pub address: String,
    pub coordinate: Coordinate,
}

/// A candidate dropped from a run and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFailure {
    pub name: String,
    pub reason: String,
}

/// Result of a successful nearest-store selection.
///
/// `winner` holds the minimum road distance among every candidate that could
/// be routed; ties keep the first one in configuration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionOutcome {
    pub query_address: String,
    pub query_coordinate: Coordinate,
    pub winner: ResolvedCandidate,
    pub route: RouteResult,
    /// Candidates whose address could not be geocoded.
    pub unresolved: Vec<CandidateFailure>,
    /// Candidates that geocoded but had no usable route.
    pub unroutable: Vec<CandidateFailure>,
}

impl SelectionOutcome {
    /// Whether every configured candidate took part in the comparison.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.unroutable.is_empty()
    }
}
