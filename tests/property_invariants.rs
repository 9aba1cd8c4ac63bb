//! Property-based tests for value-type and entity invariants

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rstest::rstest;
use saa_manifold::domain::{
    ConfidenceLevel, FluxIntensity, FluxUnits, GeographicCoordinates, SaaAnomaly, SpatialBounds,
    ValidationError,
};
use saa_manifold::geomagnetic::DipoleTransformer;

pub mod generators {
    use super::*;

    pub fn coordinates() -> impl Strategy<Value = GeographicCoordinates> {
        (-180.0..=180.0f64, -90.0..=90.0f64, 0.0..2000.0f64)
            .prop_map(|(lon, lat, alt)| GeographicCoordinates::new(lon, lat, alt).unwrap())
    }

    pub fn flux() -> impl Strategy<Value = FluxIntensity> {
        (0.0..1e6f64, 0.0..1e4f64, 0.5..=1.0f64).prop_map(|(value, uncertainty, confidence)| {
            FluxIntensity::with_details(
                value,
                uncertainty,
                ConfidenceLevel::parse(confidence).unwrap(),
                FluxUnits::default(),
            )
            .unwrap()
        })
    }

    pub fn extent() -> impl Strategy<Value = SpatialBounds> {
        (0.01..10.0f64, 0.01..10.0f64, 1.0..500.0f64, 11.0..1000.0f64).prop_map(
            |(lon, lat, alt, length)| SpatialBounds::new(lon, lat, alt, length).unwrap(),
        )
    }

    pub fn anomaly_at(lon: f64, lat: f64) -> impl Strategy<Value = SaaAnomaly> {
        (flux(), extent(), 0.9..=1.0f64).prop_map(move |(intensity, extent, confidence)| {
            SaaAnomaly::new(
                GeographicCoordinates::new(lon, lat, 500.0).unwrap(),
                intensity,
                extent,
                ConfidenceLevel::parse(confidence).unwrap(),
            )
        })
    }
}

proptest! {
    #[test]
    fn prop_distance_to_self_is_zero(point in generators::coordinates()) {
        prop_assert_eq!(point.distance_to(&point), 0.0);
    }

    #[test]
    fn prop_distance_is_symmetric(a in generators::coordinates(), b in generators::coordinates()) {
        let forward = a.distance_to(&b);
        let backward = b.distance_to(&a);
        prop_assert!((forward - backward).abs() < 1e-6);
        prop_assert!(forward >= 0.0);
    }

    #[test]
    fn prop_flux_addition_is_commutative_with_quadrature_uncertainty(
        a in generators::flux(),
        b in generators::flux(),
    ) {
        let ab = a.checked_add(&b).unwrap();
        let ba = b.checked_add(&a).unwrap();

        prop_assert_eq!(ab.value(), ba.value());
        prop_assert!((ab.value() - (a.value() + b.value())).abs() < 1e-6);
        let expected = a.uncertainty().hypot(b.uncertainty());
        prop_assert!((ab.uncertainty() - expected).abs() <= 1e-9 * expected.max(1.0));
        prop_assert_eq!(ab.confidence_level(), a.confidence_level().min(b.confidence_level()));
    }

    #[test]
    fn prop_flux_addition_rejects_mismatched_units(value in 0.0..1e6f64) {
        let a = FluxIntensity::new(value, 1.0).unwrap();
        let b = FluxIntensity::with_details(
            value,
            1.0,
            ConfidenceLevel::ninety_five_percent(),
            FluxUnits::ParticlesPerM2PerSecond,
        )
        .unwrap();

        let rejected = matches!(a.checked_add(&b), Err(ValidationError::UnitMismatch { .. }));
        prop_assert!(rejected);
    }

    #[test]
    fn prop_merging_co_located_anomalies(
        a in generators::anomaly_at(-45.0, -20.0),
        b in generators::anomaly_at(-45.0, -20.0),
    ) {
        prop_assume!(a.intensity_peak().value() + b.intensity_peak().value() > 0.0);

        let merged = a.merge_with(&b).unwrap();

        let expected = a.intensity_peak().checked_add(b.intensity_peak()).unwrap();
        prop_assert_eq!(merged.intensity_peak(), &expected);
        let longest = a
            .spatial_extent()
            .characteristic_length()
            .max(b.spatial_extent().characteristic_length());
        prop_assert!(merged.spatial_extent().characteristic_length() >= longest);
        let confidence = merged.confidence_level().into_inner();
        prop_assert!(confidence > 0.0 && confidence <= 1.0);
    }

    #[test]
    fn prop_merging_distant_anomalies_fails(
        a in generators::anomaly_at(-45.0, -20.0),
        b in generators::anomaly_at(45.0, 20.0),
    ) {
        // roughly 10,000 km apart, far beyond 10% of any generated extent
        prop_assert!(!a.overlaps_with(&b));
        prop_assert_eq!(a.merge_with(&b).err(), Some(ValidationError::NonOverlapping));
    }

    #[test]
    fn prop_geomagnetic_round_trip(lon in -179.0..179.0f64, lat in -60.0..60.0f64) {
        let transformer = DipoleTransformer::new();
        let epoch = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        let point = GeographicCoordinates::new(lon, lat, 500.0).unwrap();

        let magnetic = transformer.to_geomagnetic(&point, epoch).unwrap();
        let recovered = transformer.to_geographic(&magnetic, epoch).unwrap();

        prop_assert!((recovered.longitude() - lon).abs() < 1e-8);
        prop_assert!((recovered.latitude() - lat).abs() < 1e-8);
        prop_assert!(magnetic.l_shell() >= 1.0);
        prop_assert!((0.0..24.0).contains(&magnetic.magnetic_local_time()));
    }
}

#[rstest]
#[case(1899, false)]
#[case(1900, true)]
#[case(2020, true)]
#[case(2030, true)]
#[case(2031, false)]
fn test_epoch_validity(#[case] year: i32, #[case] valid: bool) {
    let epoch = Utc.with_ymd_and_hms(year, 7, 1, 0, 0, 0).unwrap();
    assert_eq!(DipoleTransformer::new().is_valid_epoch(epoch), valid);
}
