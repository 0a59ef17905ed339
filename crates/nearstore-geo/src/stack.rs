//! Wiring of the live HTTP clients from [`AppConfig`].

use std::num::NonZeroUsize;
use std::time::Duration;

use nearstore_core::{AppConfig, QueryLog};

use crate::cache::{CachedGeocoder, CachedRouteProvider};
use crate::error::ClientBuildError;
use crate::geocode::NominatimClient;
use crate::postal::ViaCepClient;
use crate::route::OsrmClient;
use crate::selector::{Selector, SelectorSettings};

/// Selector over the cached Nominatim and OSRM clients.
pub type LiveSelector<L> =
    Selector<CachedGeocoder<NominatimClient>, CachedRouteProvider<OsrmClient>, L>;

/// Builds the cached geocoding/routing stack and a selector logging to `log`.
///
/// # Errors
///
/// Returns [`ClientBuildError`] if a client cannot be constructed or a
/// configured base URL is invalid.
pub fn selector_from_config<L: QueryLog>(
    config: &AppConfig,
    log: L,
) -> Result<LiveSelector<L>, ClientBuildError> {
    let ttl = Duration::from_secs(config.cache_ttl_secs);
    let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);

    let geocoder = NominatimClient::with_base_url(
        &config.geocoder_url,
        config.http_timeout_secs,
        &config.user_agent,
        config.geocoder_country_codes.as_deref(),
    )?;
    let router = OsrmClient::with_base_url(
        &config.router_url,
        config.http_timeout_secs,
        &config.user_agent,
    )?;

    Ok(Selector::new(
        CachedGeocoder::new(geocoder, ttl, capacity),
        CachedRouteProvider::new(router, ttl, capacity),
        log,
        SelectorSettings::from_app_config(config),
    ))
}

/// # Errors
///
/// Returns [`ClientBuildError`] if the client cannot be constructed.
pub fn postal_from_config(config: &AppConfig) -> Result<ViaCepClient, ClientBuildError> {
    ViaCepClient::with_base_url(
        &config.postal_url,
        config.http_timeout_secs,
        &config.user_agent,
    )
}
