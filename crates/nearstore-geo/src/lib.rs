pub mod cache;
pub mod error;
pub mod geocode;
mod http;
pub mod postal;
pub mod route;
pub mod selector;
pub mod stack;

pub use cache::{CachedGeocoder, CachedRouteProvider, TtlCache};
pub use error::{ClientBuildError, GeocodeError, PostalError, RouteError};
pub use geocode::{Geocoder, NominatimClient};
pub use postal::{normalize_postal_code, PostalAddress, PostalCodeLookup, ViaCepClient};
pub use route::{NoRouteReason, OsrmClient, RouteOutcome, RouteProvider};
pub use selector::{PostalQueryError, SelectionError, Selector, SelectorSettings};
pub use stack::{postal_from_config, selector_from_config, LiveSelector};
