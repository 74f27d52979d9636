use super::*;
use crate::config::{GeometryConfig, OracleConfig};

struct FlakyProvider {
    fail_times: std::sync::atomic::AtomicU32,
}

#[async_trait::async_trait]
impl TravelTimeProvider for FlakyProvider {
    async fn travel_minutes(&self, _from: LatLng, _to: LatLng) -> Option<Float> {
        let remaining = self.fail_times.fetch_update(
            std::sync::atomic::Ordering::SeqCst,
            std::sync::atomic::Ordering::SeqCst,
            |n| if n > 0 { Some(n - 1) } else { None },
        );
        if remaining.is_ok() {
            None
        } else {
            Some(12.0)
        }
    }
}

fn no_provider_oracle() -> TravelTimeOracle {
    TravelTimeOracle::new(None, GeometryConfig::default(), OracleConfig::default())
}

#[tokio::test]
async fn falls_back_to_straight_line_without_provider() {
    let oracle = no_provider_oracle();
    let a = LatLng::new(40.0, -75.0);
    let b = LatLng::new(41.0, -76.0);
    let estimate = oracle.travel(a, b).await.unwrap();
    assert!(estimate.from_fallback);
    assert!(!estimate.from_cache);
    assert!(estimate.minutes > 0.0);
}

#[tokio::test]
async fn fallback_disabled_returns_unavailable() {
    let mut cfg = OracleConfig::default();
    cfg.fallback_enabled = false;
    let oracle = TravelTimeOracle::new(None, GeometryConfig::default(), cfg);
    let err = oracle.travel(LatLng::new(1.0, 1.0), LatLng::new(2.0, 2.0)).await.unwrap_err();
    assert!(matches!(err, OracleError::Unavailable));
}

#[tokio::test]
async fn second_call_for_same_pair_hits_cache() {
    let provider = Box::new(FlakyProvider { fail_times: std::sync::atomic::AtomicU32::new(0) });
    let oracle = TravelTimeOracle::new(Some(provider), GeometryConfig::default(), OracleConfig::default());
    let a = LatLng::new(10.0, 10.0);
    let b = LatLng::new(10.1, 10.1);

    let first = oracle.travel(a, b).await.unwrap();
    assert!(!first.from_cache);

    let second = oracle.travel(a, b).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.minutes, first.minutes);
}

#[tokio::test]
async fn retries_then_falls_back_on_persistent_provider_failure() {
    let provider = Box::new(FlakyProvider { fail_times: std::sync::atomic::AtomicU32::new(100) });
    let mut cfg = OracleConfig::default();
    cfg.max_retries = 1;
    cfg.base_backoff_ms = 1;
    let oracle = TravelTimeOracle::new(Some(provider), GeometryConfig::default(), cfg);
    let estimate = oracle.travel(LatLng::new(5.0, 5.0), LatLng::new(6.0, 6.0)).await.unwrap();
    assert!(estimate.from_fallback);
}

#[test]
fn cache_key_is_stable_across_5th_decimal_noise() {
    let a1 = LatLng::new(40.712_801, -74.006_001);
    let a2 = LatLng::new(40.712_799, -74.005_999);
    let b = LatLng::new(41.0, -75.0);
    assert_eq!(cache_key(a1, b), cache_key(a2, b));
}
