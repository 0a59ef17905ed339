//! Driving routes from an OSRM-compatible `route` service.

use std::future::Future;

use nearstore_core::{Coordinate, LogStatus, RouteResult};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ClientBuildError, RouteError};
use crate::http::{build_client, normalize_base_url};

const DEFAULT_BASE_URL: &str = "https://router.project-osrm.org";

/// Why a routing call produced no usable route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoRouteReason {
    /// The service answered with an empty route list.
    NoRoutes,
    /// The first route lacked the named field or carried an invalid value.
    MissingField(&'static str),
    /// Origin or destination was not supplied.
    MissingEndpoint,
}

impl NoRouteReason {
    #[must_use]
    pub fn log_status(self) -> LogStatus {
        match self {
            NoRouteReason::NoRoutes | NoRouteReason::MissingEndpoint => LogStatus::RouteNoRoute,
            NoRouteReason::MissingField(_) => LogStatus::RouteMissingFields,
        }
    }
}

impl std::fmt::Display for NoRouteReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoRouteReason::NoRoutes => write!(f, "routing service found no route"),
            NoRouteReason::MissingField(field) => {
                write!(f, "route response missing or invalid field '{field}'")
            }
            NoRouteReason::MissingEndpoint => write!(f, "origin or destination missing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Found(RouteResult),
    NoRoute(NoRouteReason),
}

/// Computes a road route between two coordinates.
pub trait RouteProvider: Send + Sync {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = Result<RouteOutcome, RouteError>> + Send;

    /// Like [`RouteProvider::route`], but an absent endpoint short-circuits to
    /// `NoRoute(MissingEndpoint)` without contacting the service.
    fn route_between(
        &self,
        origin: Option<Coordinate>,
        destination: Option<Coordinate>,
    ) -> impl Future<Output = Result<RouteOutcome, RouteError>> + Send {
        async move {
            match (origin, destination) {
                (Some(origin), Some(destination)) => self.route(origin, destination).await,
                _ => Ok(RouteOutcome::NoRoute(NoRouteReason::MissingEndpoint)),
            }
        }
    }
}

/// Client for OSRM's `/route/v1/driving` endpoint.
pub struct OsrmClient {
    client: Client,
    base_url: String,
}

impl OsrmClient {
    /// Creates a client pointed at the public OSRM demo server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ClientBuildError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout_secs, user_agent)
    }

    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the `reqwest::Client` cannot be built
    /// or `base_url` is not a valid base URL.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            base_url: normalize_base_url(base_url)?,
        })
    }

    /// OSRM takes `lon,lat` pairs separated by `;`.
    fn route_url(&self, origin: Coordinate, destination: Coordinate) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.base_url,
            origin.longitude(),
            origin.latitude(),
            destination.longitude(),
            destination.latitude()
        )
    }
}

impl RouteProvider for OsrmClient {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteOutcome, RouteError> {
        let url = self.route_url(origin, destination);
        let response = self
            .client
            .get(&url)
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // OSRM reports "no route between these points" as a 400 with code NoRoute.
            if is_no_route_body(&body) {
                return Ok(RouteOutcome::NoRoute(NoRouteReason::NoRoutes));
            }
            return Err(RouteError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let parsed: OsrmResponse =
            serde_json::from_str(&body).map_err(|e| RouteError::Deserialize {
                context: format!("route({origin} -> {destination})"),
                source: e,
            })?;

        Ok(route_outcome(parsed))
    }
}

fn is_no_route_body(body: &str) -> bool {
    serde_json::from_str::<OsrmResponse>(body)
        .ok()
        .and_then(|r| r.code)
        .is_some_and(|code| code == "NoRoute")
}

fn route_outcome(response: OsrmResponse) -> RouteOutcome {
    let Some(first) = response.routes.into_iter().next() else {
        return RouteOutcome::NoRoute(NoRouteReason::NoRoutes);
    };

    let Some(distance_m) = first.distance.filter(|d| d.is_finite() && *d >= 0.0) else {
        return RouteOutcome::NoRoute(NoRouteReason::MissingField("distance"));
    };
    let Some(duration_secs) = first.duration.filter(|d| d.is_finite() && *d >= 0.0) else {
        return RouteOutcome::NoRoute(NoRouteReason::MissingField("duration"));
    };
    let Some(path) = first.geometry.and_then(|g| g.coordinates) else {
        return RouteOutcome::NoRoute(NoRouteReason::MissingField("geometry"));
    };

    RouteOutcome::Found(RouteResult {
        distance_km: distance_m / 1000.0,
        duration_secs,
        path,
    })
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: Option<f64>,
    duration: Option<f64>,
    geometry: Option<OsrmGeometry>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Option<Vec<[f64; 2]>>,
}
