//! Travel-time oracle: an injectable abstraction over an external
//! driving-distance estimator, with a TTL cache, a negative-result cache,
//! a bounded semaphore for outstanding calls, and a straight-line fallback.
//!
//! This is the only component in the core permitted to perform external
//! I/O; every other module receives estimates through the [`TravelTimeOracle`]
//! trait rather than reaching for a network client directly.

use crate::config::{GeometryConfig, OracleConfig};
use crate::error::OracleError;
use crate::geometry::{fallback_travel_minutes, round_for_cache_key, LatLng};
use fleet_heuristics::Float;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Result of a single travel-time query.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TravelEstimate {
    pub minutes: Float,
    pub from_cache: bool,
    pub from_fallback: bool,
    pub distance_km: Option<Float>,
}

/// Injectable provider of real-world travel-time estimates between two
/// geo-points, keeping the optimization core independent of any specific
/// routing engine.
/// Coordinates per axis kept in one OSRM `table` request (40 sources +
/// 40 destinations stays comfortably under OSRM's default 100-coordinate
/// request limit), matching `get_travel_time_matrix`'s `CHUNK_SIZE`.
const OSRM_TABLE_CHUNK: usize = 40;

#[async_trait::async_trait]
pub trait TravelTimeProvider: Send + Sync {
    /// Returns minutes between `from` and `to`, or `None` if the underlying
    /// service could not answer for this pair (caller falls through to the
    /// straight-line estimate).
    async fn travel_minutes(&self, from: LatLng, to: LatLng) -> Option<Float>;

    /// Batched sources x destinations query via a routing engine's table
    /// endpoint, for providers that support one. `None` tells the caller to
    /// fall back to pairwise `travel_minutes` calls.
    async fn table_minutes(&self, _sources: &[LatLng], _destinations: &[LatLng]) -> Option<Vec<Vec<Option<Float>>>> {
        None
    }
}

/// A provider backed by an OSRM-compatible HTTP routing service, using the
/// `route` endpoint (`{ code, routes: [{ duration, distance }] }`) for
/// single pairs and the `table` endpoint (`{ code, durations }`), chunked
/// at [`OSRM_TABLE_CHUNK`] coordinates per axis, for batched matrices.
pub struct OsrmProvider {
    client: reqwest::Client,
    route_url: String,
    table_url: String,
}

impl OsrmProvider {
    /// `base_url` is the OSRM deployment root (e.g.
    /// `https://router.project-osrm.org`); the `route`/`table` profile
    /// paths are appended internally.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base = base_url.into();
        Self {
            client: reqwest::Client::builder().timeout(timeout).build().unwrap_or_default(),
            route_url: format!("{base}/route/v1/driving"),
            table_url: format!("{base}/table/v1/driving"),
        }
    }

    async fn table_chunk(&self, sources: &[LatLng], destinations: &[LatLng]) -> Option<Vec<Vec<Option<Float>>>> {
        let mut coords = Vec::with_capacity(sources.len() + destinations.len());
        coords.extend(sources.iter().map(|c| format!("{},{}", c.lng, c.lat)));
        coords.extend(destinations.iter().map(|c| format!("{},{}", c.lng, c.lat)));
        let source_idx: Vec<String> = (0..sources.len()).map(|i| i.to_string()).collect();
        let dest_idx: Vec<String> = (sources.len()..sources.len() + destinations.len()).map(|i| i.to_string()).collect();

        let url = format!(
            "{}/{}?sources={}&destinations={}&annotations=duration",
            self.table_url,
            coords.join(";"),
            source_idx.join(";"),
            dest_idx.join(";"),
        );

        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body: OsrmTableResponse = response.json().await.ok()?;
        if body.code != "Ok" {
            return None;
        }
        Some(body.durations.into_iter().map(|row| row.into_iter().map(|d| d.map(|secs| secs / 60.0)).collect()).collect())
    }
}

#[derive(Deserialize)]
struct OsrmRouteResponse {
    code: String,
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    duration: Float,
}

#[derive(Deserialize)]
struct OsrmTableResponse {
    code: String,
    durations: Vec<Vec<Option<Float>>>,
}

#[async_trait::async_trait]
impl TravelTimeProvider for OsrmProvider {
    async fn travel_minutes(&self, from: LatLng, to: LatLng) -> Option<Float> {
        let url = format!(
            "{}/{},{};{},{}?overview=false",
            self.route_url, from.lng, from.lat, to.lng, to.lat
        );
        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body: OsrmRouteResponse = response.json().await.ok()?;
        if body.code != "Ok" {
            return None;
        }
        body.routes.first().map(|r| r.duration / 60.0)
    }

    async fn table_minutes(&self, sources: &[LatLng], destinations: &[LatLng]) -> Option<Vec<Vec<Option<Float>>>> {
        if sources.is_empty() || destinations.is_empty() {
            return Some(vec![vec![None; destinations.len()]; sources.len()]);
        }

        let mut out = vec![vec![None; destinations.len()]; sources.len()];
        let mut any_ok = false;
        for (i, src_chunk) in sources.chunks(OSRM_TABLE_CHUNK).enumerate() {
            let src_offset = i * OSRM_TABLE_CHUNK;
            for (j, dest_chunk) in destinations.chunks(OSRM_TABLE_CHUNK).enumerate() {
                let dest_offset = j * OSRM_TABLE_CHUNK;
                if let Some(chunk) = self.table_chunk(src_chunk, dest_chunk).await {
                    any_ok = true;
                    for (r, row) in chunk.into_iter().enumerate() {
                        for (c, minutes) in row.into_iter().enumerate() {
                            out[src_offset + r][dest_offset + c] = minutes;
                        }
                    }
                }
            }
        }
        any_ok.then_some(out)
    }
}

#[derive(Clone, Copy, Debug)]
struct CacheEntry {
    minutes: Float,
    inserted_at: Instant,
}

type CacheKey = (i64, i64, i64, i64);

fn cache_key(from: LatLng, to: LatLng) -> CacheKey {
    let scale = |v: Float| (round_for_cache_key(v) * 100_000.0).round() as i64;
    (scale(from.lat), scale(from.lng), scale(to.lat), scale(to.lng))
}

/// A persisted cache snapshot entry, keyed by `"lat1,lon1,lat2,lon2"`:
/// `{ minutes, distance_km?, timestamp }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheSnapshotEntry {
    pub minutes: Float,
    pub distance_km: Option<Float>,
    pub timestamp_unix_secs: u64,
}

/// The process-wide travel-time oracle. Owns its own cache and semaphore;
/// never installed as a global static.
pub struct TravelTimeOracle {
    provider: Option<Box<dyn TravelTimeProvider>>,
    geometry: GeometryConfig,
    config: OracleConfig,
    positive_cache: Mutex<HashMap<CacheKey, CacheEntry>>,
    negative_cache: Mutex<HashMap<CacheKey, Instant>>,
    permits: Semaphore,
}

impl TravelTimeOracle {
    pub fn new(provider: Option<Box<dyn TravelTimeProvider>>, geometry: GeometryConfig, config: OracleConfig) -> Self {
        let permits = Semaphore::new(config.max_concurrent_calls.max(1));
        Self {
            provider,
            geometry,
            config,
            positive_cache: Mutex::new(HashMap::new()),
            negative_cache: Mutex::new(HashMap::new()),
            permits,
        }
    }

    /// Restores previously persisted positive entries. Call
    /// once at startup, before the pipeline begins issuing calls.
    pub fn load_snapshot(&self, entries: HashMap<String, CacheSnapshotEntry>) {
        let mut cache = self.positive_cache.lock().expect("oracle cache poisoned");
        let now = Instant::now();
        for (key, entry) in entries {
            if let Some(parsed) = parse_snapshot_key(&key) {
                cache.insert(parsed, CacheEntry { minutes: entry.minutes, inserted_at: now });
            }
        }
    }

    /// Snapshots every still-live positive cache entry, keyed the same way
    /// `load_snapshot` expects. Entries are timestamped as unix seconds so a
    /// later process can re-derive remaining TTL relative to its own clock.
    pub fn snapshot(&self) -> HashMap<String, CacheSnapshotEntry> {
        let cache = self.positive_cache.lock().expect("oracle cache poisoned");
        let now_unix = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        cache
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() <= Duration::from_secs(self.config.cache_ttl_secs))
            .map(|(key, entry)| {
                (
                    snapshot_key(*key),
                    CacheSnapshotEntry { minutes: entry.minutes, distance_km: None, timestamp_unix_secs: now_unix },
                )
            })
            .collect()
    }

    /// Writes the current cache snapshot to `path` atomically: serialized to
    /// a sibling temp file, then renamed into place, so a crash mid-write
    /// never leaves a truncated snapshot on disk.
    pub fn save_snapshot_to_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        let entries = self.snapshot();
        let body = serde_json::to_vec_pretty(&entries)?;
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, body)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Loads a previously saved snapshot file, if present. Returns `Ok(())`
    /// for a missing file since an absent snapshot is a cold start, not a
    /// failure.
    pub fn load_snapshot_from_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        let body = match std::fs::read(path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        let entries: HashMap<String, CacheSnapshotEntry> = serde_json::from_slice(&body)?;
        self.load_snapshot(entries);
        Ok(())
    }

    /// Returns the minutes between two points, consulting the cache first,
    /// then the provider (if one is configured), falling back to the
    /// straight-line estimate on any provider failure, cache miss and
    /// negative-cache miss. Only returns `Err` when the provider failed (or
    /// is absent) *and* fallback is disabled.
    pub async fn travel(&self, from: LatLng, to: LatLng) -> Result<TravelEstimate, OracleError> {
        let key = cache_key(from, to);

        if let Some(entry) = self.cached_positive(key) {
            return Ok(TravelEstimate { minutes: entry.minutes, from_cache: true, from_fallback: false, distance_km: None });
        }
        if self.cached_negative(key) {
            return self.resolve_fallback(from, to);
        }

        let Some(provider) = self.provider.as_ref() else {
            return self.resolve_fallback(from, to);
        };

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| OracleError::Transport("semaphore closed".into()))?;

        let mut attempt = 0;
        loop {
            let call = tokio::time::timeout(
                Duration::from_millis(self.config.per_call_timeout_ms),
                provider.travel_minutes(from, to),
            )
            .await;

            match call {
                Ok(Some(minutes)) => {
                    self.store_positive(key, minutes);
                    return Ok(TravelEstimate { minutes, from_cache: false, from_fallback: false, distance_km: None });
                }
                Ok(None) | Err(_) => {
                    if attempt >= self.config.max_retries {
                        self.store_negative(key);
                        return self.resolve_fallback(from, to);
                    }
                    attempt += 1;
                    let backoff = self.config.base_backoff_ms * 2u64.saturating_pow(attempt - 1);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
            }
        }
    }

    /// Computes a full sources x destinations matrix; entries are `None`
    /// where the provider (and fallback, if disabled) could not answer.
    ///
    /// Cache hits are served directly. Remaining cells are fetched in one
    /// batched `table_minutes` call (chunked internally by the provider,
    /// e.g. at [`OSRM_TABLE_CHUNK`] coordinates per axis for
    /// [`OsrmProvider`]) when the provider supports it; any cell that call
    /// still leaves empty falls back to the pairwise `travel` path (cache,
    /// retries, straight-line fallback).
    pub async fn matrix(&self, sources: &[LatLng], destinations: &[LatLng]) -> Vec<Vec<Option<Float>>> {
        let mut out = vec![vec![None; destinations.len()]; sources.len()];
        let mut pending = vec![vec![true; destinations.len()]; sources.len()];

        for (i, s) in sources.iter().enumerate() {
            for (j, d) in destinations.iter().enumerate() {
                if let Some(entry) = self.cached_positive(cache_key(*s, *d)) {
                    out[i][j] = Some(entry.minutes);
                    pending[i][j] = false;
                }
            }
        }

        if let Some(provider) = self.provider.as_ref() {
            if let Some(batched) = provider.table_minutes(sources, destinations).await {
                for (i, row) in batched.into_iter().enumerate() {
                    for (j, minutes) in row.into_iter().enumerate() {
                        if let Some(minutes) = minutes {
                            out[i][j] = Some(minutes);
                            pending[i][j] = false;
                            self.store_positive(cache_key(sources[i], destinations[j]), minutes);
                        }
                    }
                }
            }
        }

        for (i, s) in sources.iter().enumerate() {
            for (j, d) in destinations.iter().enumerate() {
                if pending[i][j] {
                    out[i][j] = self.travel(*s, *d).await.ok().map(|e| e.minutes);
                }
            }
        }
        out
    }

    fn resolve_fallback(&self, from: LatLng, to: LatLng) -> Result<TravelEstimate, OracleError> {
        if !self.config.fallback_enabled {
            return Err(OracleError::Unavailable);
        }
        let minutes = fallback_travel_minutes(&from, &to, &self.geometry);
        Ok(TravelEstimate { minutes, from_cache: false, from_fallback: true, distance_km: Some(from.haversine_km(&to)) })
    }

    fn cached_positive(&self, key: CacheKey) -> Option<CacheEntry> {
        let cache = self.positive_cache.lock().expect("oracle cache poisoned");
        let entry = cache.get(&key)?;
        if entry.inserted_at.elapsed() > Duration::from_secs(self.config.cache_ttl_secs) {
            return None;
        }
        Some(*entry)
    }

    fn cached_negative(&self, key: CacheKey) -> bool {
        let cache = self.negative_cache.lock().expect("oracle negative cache poisoned");
        match cache.get(&key) {
            Some(at) => at.elapsed() <= Duration::from_secs(self.config.negative_cache_ttl_secs),
            None => false,
        }
    }

    fn store_positive(&self, key: CacheKey, minutes: Float) {
        let mut cache = self.positive_cache.lock().expect("oracle cache poisoned");
        if cache.len() > 50_000 {
            cache.clear();
        }
        cache.insert(key, CacheEntry { minutes, inserted_at: Instant::now() });
    }

    fn store_negative(&self, key: CacheKey) {
        let mut cache = self.negative_cache.lock().expect("oracle negative cache poisoned");
        if cache.len() > 50_000 {
            cache.clear();
        }
        cache.insert(key, Instant::now());
    }
}

fn snapshot_key(key: CacheKey) -> String {
    let unscale = |v: i64| v as Float / 100_000.0;
    format!("{},{},{},{}", unscale(key.0), unscale(key.1), unscale(key.2), unscale(key.3))
}

fn parse_snapshot_key(key: &str) -> Option<CacheKey> {
    let mut parts = key.split(',');
    let lat1: Float = parts.next()?.parse().ok()?;
    let lon1: Float = parts.next()?.parse().ok()?;
    let lat2: Float = parts.next()?.parse().ok()?;
    let lon2: Float = parts.next()?.parse().ok()?;
    Some(cache_key(LatLng::new(lat1, lon1), LatLng::new(lat2, lon2)))
}

#[cfg(test)]
#[path = "../tests/unit/oracle_test.rs"]
mod oracle_test;
