//! Explicit TTL caches wrapped around the geocoding and routing clients.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use nearstore_core::{normalize_address, Coordinate};

use crate::error::{GeocodeError, RouteError};
use crate::geocode::Geocoder;
use crate::route::{RouteOutcome, RouteProvider};

/// Bounded LRU map whose entries expire `ttl` after insertion.
///
/// Holds at most `capacity` entries. Expired entries are dropped on lookup,
/// and every insert first sweeps expired entries off the least-recently-used end.
#[derive(Debug)]
pub struct TtlCache<K: Eq + Hash, V> {
    ttl: Duration,
    entries: Mutex<LruCache<K, (Instant, V)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    #[must_use]
    pub fn new(ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn capacity(&self) -> NonZeroUsize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cap()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get(key) {
            Some((inserted, value)) if inserted.elapsed() < self.ttl => return Some(value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        while entries
            .peek_lru()
            .is_some_and(|(_, (inserted, _))| inserted.elapsed() >= self.ttl)
        {
            entries.pop_lru();
        }
        entries.put(key, (Instant::now(), value));
    }

    /// Removes `key`; returns whether an entry (expired or not) was present.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop(key)
            .is_some()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of live (unexpired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, (inserted, _))| inserted.elapsed() < self.ttl)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries currently held, expired ones included.
    #[cfg(test)]
    fn stored(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Caches geocoding answers by normalized address.
///
/// Both hits and "no match" answers are cached; service errors are not.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: TtlCache<String, Option<Coordinate>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    #[must_use]
    pub fn new(inner: G, ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl, capacity),
        }
    }

    /// Drops the cached answer for `address`, whatever its spelling.
    pub fn invalidate(&self, address: &str) -> bool {
        self.cache.invalidate(&normalize_address(address))
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn cache(&self) -> &TtlCache<String, Option<Coordinate>> {
        &self.cache
    }
}

impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let key = normalize_address(address);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(address = %key, "geocode cache hit");
            return Ok(hit);
        }

        let answer = self.inner.geocode(address).await?;
        self.cache.insert(key, answer);
        Ok(answer)
    }
}

type RouteKey = (u64, u64, u64, u64);

fn route_key(origin: Coordinate, destination: Coordinate) -> RouteKey {
    (
        origin.latitude().to_bits(),
        origin.longitude().to_bits(),
        destination.latitude().to_bits(),
        destination.longitude().to_bits(),
    )
}

/// Caches routing outcomes per exact (origin, destination) pair.
pub struct CachedRouteProvider<R> {
    inner: R,
    cache: TtlCache<RouteKey, RouteOutcome>,
}

impl<R: RouteProvider> CachedRouteProvider<R> {
    #[must_use]
    pub fn new(inner: R, ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl, capacity),
        }
    }

    pub fn invalidate(&self, origin: Coordinate, destination: Coordinate) -> bool {
        self.cache.invalidate(&route_key(origin, destination))
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<R: RouteProvider> RouteProvider for CachedRouteProvider<R> {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteOutcome, RouteError> {
        let key = route_key(origin, destination);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(%origin, %destination, "route cache hit");
            return Ok(hit);
        }

        let outcome = self.inner.route(origin, destination).await?;
        self.cache.insert(key, outcome.clone());
        Ok(outcome)
    }
}
