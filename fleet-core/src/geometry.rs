//! Geographic primitives and the straight-line travel-time fallback.

use crate::config::GeometryConfig;
use fleet_heuristics::Float;
use serde::{Deserialize, Serialize};

/// A WGS84 coordinate pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: Float,
    pub lng: Float,
}

impl LatLng {
    pub fn new(lat: Float, lng: Float) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in kilometers, via the haversine formula.
    pub fn haversine_km(&self, other: &LatLng) -> Float {
        const EARTH_RADIUS_KM: Float = 6371.0;

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_KM * c
    }
}

/// A straight-line travel-time estimate, used whenever the routing oracle is
/// unavailable or disabled.
///
/// `minutes = haversine_km * tortuosity_factor / average_speed_kmh * 60`,
/// floored at `fallback_floor_min`.
pub fn fallback_travel_minutes(from: &LatLng, to: &LatLng, cfg: &GeometryConfig) -> Float {
    let km = from.haversine_km(to);
    let minutes = km * cfg.tortuosity_factor / cfg.average_speed_kmh * 60.0;
    minutes.max(cfg.fallback_floor_min)
}

/// Rounds a coordinate to 5 decimal places (~1.1m precision), the cache-key
/// granularity the oracle uses so that near-duplicate stop coordinates share
/// a cache entry.
pub fn round_for_cache_key(value: Float) -> Float {
    (value * 100_000.0).round() / 100_000.0
}

#[cfg(test)]
#[path = "../tests/unit/geometry_test.rs"]
mod geometry_test;
