use nearstore_core::{CoordinateError, LogStatus};
use thiserror::Error;

/// Failure to construct one of the HTTP clients.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// The geocoding service could not answer. A plain "no match" is `Ok(None)`.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("geocoder returned an invalid coordinate for {context}: {source}")]
    InvalidCoordinate {
        context: String,
        #[source]
        source: CoordinateError,
    },
}

impl GeocodeError {
    #[must_use]
    pub fn log_status(&self) -> LogStatus {
        match self {
            GeocodeError::Transport(_) | GeocodeError::Status { .. } => {
                LogStatus::GeocodeServiceError
            }
            GeocodeError::Deserialize { .. } | GeocodeError::InvalidCoordinate { .. } => {
                LogStatus::GeocodeUnexpectedError
            }
        }
    }
}

/// The routing service could not answer. A missing route is
/// [`crate::route::RouteOutcome::NoRoute`], not an error.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("connection to routing service failed: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("routing request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("routing exchange failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RouteError {
    #[must_use]
    pub fn log_status(&self) -> LogStatus {
        match self {
            RouteError::Status { .. } => LogStatus::RouteHttpError,
            RouteError::Connect(_) => LogStatus::RouteConnectionError,
            RouteError::Timeout(_) => LogStatus::RouteTimeout,
            RouteError::Transport(_) | RouteError::Deserialize { .. } => {
                LogStatus::RouteUnexpectedError
            }
        }
    }
}

impl From<reqwest::Error> for RouteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RouteError::Timeout(err)
        } else if err.is_connect() {
            RouteError::Connect(err)
        } else {
            RouteError::Transport(err)
        }
    }
}

/// Postal-code lookup failures. An unknown but well-formed code is `Ok(None)`.
#[derive(Debug, Error)]
pub enum PostalError {
    #[error("invalid postal code '{0}': expected 8 digits")]
    InvalidCode(String),

    #[error("postal lookup request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PostalError {
    #[must_use]
    pub fn log_status(&self) -> LogStatus {
        match self {
            PostalError::InvalidCode(_) => LogStatus::InvalidInput,
            PostalError::Transport(_)
            | PostalError::Status { .. }
            | PostalError::Deserialize { .. } => LogStatus::PostalCodeError,
        }
    }
}
