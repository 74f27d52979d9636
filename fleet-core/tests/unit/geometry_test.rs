use super::*;

#[test]
fn haversine_zero_distance_is_zero() {
    let p = LatLng::new(40.0, -75.0);
    assert!((p.haversine_km(&p)).abs() < 1e-9);
}

#[test]
fn haversine_matches_known_city_pair_roughly() {
    let nyc = LatLng::new(40.7128, -74.0060);
    let philly = LatLng::new(39.9526, -75.1652);
    let km = nyc.haversine_km(&philly);
    assert!((120.0..150.0).contains(&km), "got {km}");
}

#[test]
fn fallback_travel_minutes_respects_floor() {
    let cfg = GeometryConfig::default();
    let a = LatLng::new(40.0, -75.0);
    let b = LatLng::new(40.0001, -75.0001);
    let minutes = fallback_travel_minutes(&a, &b, &cfg);
    assert_eq!(minutes, cfg.fallback_floor_min);
}

#[test]
fn fallback_travel_minutes_scales_with_distance() {
    let cfg = GeometryConfig::default();
    let a = LatLng::new(40.0, -75.0);
    let far = LatLng::new(41.0, -76.0);
    let minutes = fallback_travel_minutes(&a, &far, &cfg);
    let km = a.haversine_km(&far);
    let expected = (km * cfg.tortuosity_factor / cfg.average_speed_kmh * 60.0).max(cfg.fallback_floor_min);
    assert!((minutes - expected).abs() < 1e-9);
}

#[test]
fn round_for_cache_key_collapses_near_duplicates() {
    assert_eq!(round_for_cache_key(40.712_801), round_for_cache_key(40.712_799));
}
