//! Address → coordinate resolution against a Nominatim-compatible search API.

use std::future::Future;

use nearstore_core::{normalize_address, Coordinate};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ClientBuildError, GeocodeError};
use crate::http::{build_client, normalize_base_url};

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Resolves a free-text address to a coordinate.
///
/// `Ok(None)` means the service answered but had no match.
pub trait Geocoder: Send + Sync {
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coordinate>, GeocodeError>> + Send;
}

/// Client for Nominatim's `/search` endpoint.
///
/// Queries are sent in normalized form and limited to the single best match.
pub struct NominatimClient {
    client: Client,
    base_url: String,
    country_codes: Option<String>,
}

impl NominatimClient {
    /// Creates a client pointed at the public Nominatim instance.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ClientBuildError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout_secs, user_agent, None)
    }

    /// Creates a client with a custom base URL and optional `countrycodes` filter.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the `reqwest::Client` cannot be built
    /// or `base_url` is not a valid base URL.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        country_codes: Option<&str>,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            base_url: normalize_base_url(base_url)?,
            country_codes: country_codes.map(str::to_owned),
        })
    }

    fn search_params<'a>(&'a self, normalized: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("q", normalized), ("format", "json"), ("limit", "1")];
        if let Some(codes) = self.country_codes.as_deref() {
            params.push(("countrycodes", codes));
        }
        params
    }
}

impl Geocoder for NominatimClient {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let normalized = normalize_address(address);
        if normalized.is_empty() {
            return Ok(None);
        }

        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&self.search_params(&normalized))
            .send()
            .await
            .map_err(GeocodeError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await.map_err(GeocodeError::Transport)?;
        let places: Vec<NominatimPlace> =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
                context: format!("search(q={address})"),
                source: e,
            })?;

        let Some(place) = places.into_iter().next() else {
            tracing::debug!(address, "geocoder returned no match");
            return Ok(None);
        };

        let coordinate = Coordinate::new(place.lat.value(), place.lon.value()).map_err(|e| {
            GeocodeError::InvalidCoordinate {
                context: format!("search(q={address})"),
                source: e,
            }
        })?;
        Ok(Some(coordinate))
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: Degrees,
    lon: Degrees,
}

/// Nominatim serializes degrees as strings; some compatible servers use numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Degrees {
    Number(f64),
    Text(String),
}

impl Degrees {
    /// Unparseable text becomes NaN, which `Coordinate::new` rejects.
    fn value(&self) -> f64 {
        match self {
            Degrees::Number(n) => *n,
            Degrees::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }
}
