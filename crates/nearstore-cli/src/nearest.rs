//! `nearest` command: runs one selection and renders the outcome.

use std::path::Path;

use nearstore_core::{AppConfig, SelectionOutcome};
use nearstore_db::PgQueryLog;
use serde_json::{json, Value};

/// What the user searched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QueryInput {
    Address(String),
    PostalCode(String),
}

/// Runs a selection against the configured stores.
///
/// Query-log entries go to Postgres when `DATABASE_URL` is set; otherwise
/// they are only emitted as tracing events.
///
/// # Errors
///
/// Returns an error if the stores file cannot be loaded, a client cannot be
/// built, the postal code cannot be resolved, or no store can be selected.
pub(crate) async fn run_nearest(
    config: &AppConfig,
    input: QueryInput,
    as_json: bool,
    geojson: Option<&Path>,
) -> anyhow::Result<()> {
    let stores = nearstore_core::load_stores(&config.stores_path)?.stores;

    let log = if config.database_url.is_some() {
        match nearstore_db::connect_pool_from_config(config).await {
            Ok(pool) => Some(PgQueryLog::new(pool)),
            Err(e) => {
                tracing::warn!(error = %e, "query log database unavailable; continuing without it");
                None
            }
        }
    } else {
        None
    };

    let selector = nearstore_geo::selector_from_config(config, log)?;

    let address = match input {
        QueryInput::Address(address) => address,
        QueryInput::PostalCode(code) => {
            let postal = nearstore_geo::postal_from_config(config)?;
            let address = selector.address_for_postal_code(&postal, &code).await?;
            if !as_json {
                println!("Postal code {code} resolves to: {address}");
            }
            address
        }
    };

    let outcome = selector.select_nearest(&address, &stores).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", format_outcome(&outcome));
    }

    if let Some(path) = geojson {
        let document = serde_json::to_string_pretty(&route_geojson(&outcome))?;
        std::fs::write(path, document)
            .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote route GeoJSON");
    }

    Ok(())
}

fn format_outcome(outcome: &SelectionOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Nearest store: {} ({})\n",
        outcome.winner.name, outcome.winner.address
    ));
    out.push_str(&format!(
        "Road distance: {:.2} km, about {} min by car\n",
        outcome.route.distance_km,
        minutes(outcome.route.duration_secs)
    ));
    out.push_str(&format!(
        "From: {} ({})\n",
        outcome.query_address, outcome.query_coordinate
    ));
    for failure in outcome.unresolved.iter().chain(&outcome.unroutable) {
        out.push_str(&format!("Skipped {}: {}\n", failure.name, failure.reason));
    }
    out
}

#[allow(clippy::cast_possible_truncation)]
fn minutes(duration_secs: f64) -> i64 {
    (duration_secs / 60.0).round() as i64
}

/// `FeatureCollection` with the route line and both endpoints, in GeoJSON's
/// `[lon, lat]` axis order.
fn route_geojson(outcome: &SelectionOutcome) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {
                    "kind": "route",
                    "distance_km": outcome.route.distance_km,
                    "duration_secs": outcome.route.duration_secs,
                },
                "geometry": {
                    "type": "LineString",
                    "coordinates": outcome.route.path,
                },
            },
            {
                "type": "Feature",
                "properties": { "kind": "query", "address": outcome.query_address },
                "geometry": {
                    "type": "Point",
                    "coordinates": outcome.query_coordinate.to_lon_lat(),
                },
            },
            {
                "type": "Feature",
                "properties": {
                    "kind": "store",
                    "name": outcome.winner.name,
                    "address": outcome.winner.address,
                },
                "geometry": {
                    "type": "Point",
                    "coordinates": outcome.winner.coordinate.to_lon_lat(),
                },
            },
        ],
    })
}
