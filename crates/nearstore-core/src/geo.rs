//! Coordinates and route geometry shared by the clients and the presentation layers.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("coordinate component is not finite")]
    NotFinite,

    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// A WGS84 point, always held latitude-first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// # Errors
    ///
    /// Returns [`CoordinateError`] when either component is NaN/infinite or
    /// outside the valid degree range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Builds a coordinate from a `[lon, lat]` pair as emitted by routing services.
    ///
    /// # Errors
    ///
    /// Same as [`Coordinate::new`].
    pub fn from_lon_lat(pair: [f64; 2]) -> Result<Self, CoordinateError> {
        Self::new(pair[1], pair[0])
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[must_use]
    pub fn to_lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// A drivable route between two coordinates.
///
/// `path` keeps the routing service's `[lon, lat]` axis order; use
/// [`RouteResult::display_path`] for map layers that expect `[lat, lon]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    pub distance_km: f64,
    pub duration_secs: f64,
    pub path: Vec<[f64; 2]>,
}

impl RouteResult {
    #[must_use]
    pub fn display_path(&self) -> Vec<[f64; 2]> {
        self.path.iter().map(|[lon, lat]| [*lat, *lon]).collect()
    }
}
