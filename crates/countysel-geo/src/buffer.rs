//! Geometry normalization: align a drawing with the reference frame, then
//! buffer it.

use countysel_core::error::{Result, SelectorError};
use countysel_core::models::convert_distance;
use geo::Buffer;
use tracing::debug;

use crate::models::{to_geo_geometry, BufferSpec, BufferedGeometry, Crs, Drawing};
use crate::transform::{check_crs_mismatch, Reprojector};
use crate::validation::ensure_valid;

/// Buffer the current drawing in `reference_crs`.
///
/// Checks run in this order:
/// 1. no drawing: `NoGeometry`
/// 2. no positive distance: `NoBuffer`
/// 3. malformed drawing: `InvalidGeometry`
/// 4. `spec.target_crs` is not `reference_crs`: `CrsMismatch`
/// 5. `reference_crs` is angular: `UnprojectedCrs`
///
/// The drawing is reprojected into `reference_crs` before buffering, and the
/// distance is converted into that frame's linear unit. Nothing is mutated.
pub fn normalize_and_buffer(
    drawing: &Drawing,
    spec: &BufferSpec,
    reference_crs: &Crs,
) -> Result<BufferedGeometry> {
    let Drawing::Present(user_geometry) = drawing else {
        return Err(SelectorError::NoGeometry);
    };

    if !spec.is_requested() {
        return Err(SelectorError::NoBuffer);
    }

    ensure_valid(user_geometry)?;
    check_crs_mismatch(&spec.target_crs, reference_crs)?;

    let crs_unit = reference_crs
        .units
        .linear_unit()
        .ok_or_else(|| SelectorError::UnprojectedCrs { crs: reference_crs.to_string() })?;

    let source = to_geo_geometry(user_geometry);
    let projected =
        Reprojector::new(&user_geometry.crs, reference_crs)?.reproject_geometry(&source)?;

    let radius = convert_distance(spec.distance, spec.unit, crs_unit);
    debug!(
        "Buffering {} by {} {} ({} {} in {})",
        user_geometry.kind, spec.distance, spec.unit, radius, crs_unit, reference_crs
    );

    let polygon = projected.buffer(radius);
    if polygon.0.is_empty() {
        return Err(SelectorError::invalid_geometry(format!(
            "buffering the {} produced an empty polygon",
            user_geometry.kind
        )));
    }

    Ok(BufferedGeometry {
        polygon,
        crs: reference_crs.clone(),
        radius,
        source_kind: user_geometry.kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistanceUnit, UserGeometry};
    use geo::{Area, Contains, Point};
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn albers() -> Crs {
        Crs::conus_albers()
    }

    fn line() -> Drawing {
        UserGeometry::line(vec![[0.0, 0.0], [10_000.0, 0.0]], albers()).into()
    }

    #[test]
    fn test_absent_drawing_is_no_geometry() {
        let spec = BufferSpec::new(1.0, DistanceUnit::Miles, albers());
        let err = normalize_and_buffer(&Drawing::Absent, &spec, &albers()).unwrap_err();
        assert!(matches!(err, SelectorError::NoGeometry));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_zero_distance_is_no_buffer() {
        for distance in [0.0, -1.0, f64::NAN] {
            let spec = BufferSpec::new(distance, DistanceUnit::Miles, albers());
            let err = normalize_and_buffer(&line(), &spec, &albers()).unwrap_err();
            assert!(matches!(err, SelectorError::NoBuffer));
        }
    }

    #[test]
    fn test_single_coordinate_line_is_invalid() {
        let drawing: Drawing = UserGeometry::line(vec![[0.0, 0.0]], albers()).into();
        let spec = BufferSpec::new(1.0, DistanceUnit::Miles, albers());
        let err = normalize_and_buffer(&drawing, &spec, &albers()).unwrap_err();
        assert!(matches!(err, SelectorError::InvalidGeometry { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_bowtie_is_refused_before_buffering() {
        let drawing: Drawing = UserGeometry::polygon(
            vec![[0.0, 0.0], [1000.0, 1000.0], [1000.0, 0.0], [0.0, 1000.0]],
            albers(),
        )
        .into();
        let spec = BufferSpec::new(10.0, DistanceUnit::Meters, albers());
        let err = normalize_and_buffer(&drawing, &spec, &albers()).unwrap_err();
        assert!(matches!(err, SelectorError::InvalidGeometry { .. }));
        assert!(err.to_string().contains("crosses itself"), "{}", err);
    }

    #[test]
    fn test_target_crs_must_match_reference() {
        let spec = BufferSpec::new(1.0, DistanceUnit::Miles, Crs::web_mercator());
        let err = normalize_and_buffer(&line(), &spec, &albers()).unwrap_err();
        assert!(matches!(err, SelectorError::CrsMismatch { .. }));
    }

    #[test]
    fn test_geographic_reference_frame_is_refused() {
        let drawing: Drawing =
            UserGeometry::line(vec![[-74.0, 40.7], [-73.9, 40.8]], Crs::wgs84()).into();
        let spec = BufferSpec::new(1.0, DistanceUnit::Miles, Crs::wgs84());
        let err = normalize_and_buffer(&drawing, &spec, &Crs::wgs84()).unwrap_err();
        assert!(matches!(err, SelectorError::UnprojectedCrs { .. }));
    }

    #[test]
    fn test_one_mile_is_1609_344_meters() {
        let spec = BufferSpec::new(1.0, DistanceUnit::Miles, albers());
        let buffered = normalize_and_buffer(&line(), &spec, &albers()).unwrap();

        assert_eq!(buffered.radius, 1609.344);
        assert_eq!(buffered.crs, albers());

        let rect = buffered.bounding_rect().unwrap();
        assert!((rect.min().y + 1609.344).abs() < 25.0);
        assert!((rect.max().x - 11_609.344).abs() < 25.0);
    }

    #[test]
    fn test_feet_frame_gets_feet_radius() {
        let state_plane = Crs::from_epsg(2263).unwrap();
        let drawing: Drawing =
            UserGeometry::point(1_000_000.0, 200_000.0, state_plane.clone()).into();
        let spec = BufferSpec::new(1.0, DistanceUnit::Kilometers, state_plane.clone());

        let buffered = normalize_and_buffer(&drawing, &spec, &state_plane).unwrap();
        assert!((buffered.radius - 3280.833_333).abs() < 1e-3);
    }

    #[test]
    fn test_point_buffer_is_a_disc() {
        let drawing: Drawing = UserGeometry::point(500.0, 500.0, albers()).into();
        let spec = BufferSpec::new(100.0, DistanceUnit::Meters, albers());

        let buffered = normalize_and_buffer(&drawing, &spec, &albers()).unwrap();
        let expected = PI * 100.0 * 100.0;
        assert!((buffered.area() - expected).abs() / expected < 0.02);
        assert!(buffered.polygon.contains(&Point::new(560.0, 560.0)));
        assert!(!buffered.polygon.contains(&Point::new(575.0, 575.0)));
    }

    #[test]
    fn test_polygon_buffer_grows_the_area() {
        let drawing: Drawing = UserGeometry::polygon(
            vec![[0.0, 0.0], [1000.0, 0.0], [1000.0, 1000.0], [0.0, 1000.0]],
            albers(),
        )
        .into();
        let spec = BufferSpec::new(10.0, DistanceUnit::Meters, albers());

        let buffered = normalize_and_buffer(&drawing, &spec, &albers()).unwrap();
        assert!(buffered.polygon.unsigned_area() > 1_000_000.0);
        assert!(buffered.polygon.contains(&Point::new(-5.0, 500.0)));
    }

    proptest! {
        #[test]
        fn prop_area_is_monotonic_in_distance(
            small in 1.0f64..5_000.0,
            factor in 1.05f64..3.0,
            dx in 100.0f64..20_000.0,
            dy in -20_000.0f64..20_000.0,
        ) {
            let large = small * factor;
            let drawing: Drawing =
                UserGeometry::line(vec![[0.0, 0.0], [dx, dy]], albers()).into();

            let small_area = normalize_and_buffer(
                &drawing,
                &BufferSpec::new(small, DistanceUnit::Meters, albers()),
                &albers(),
            )
            .unwrap()
            .area();
            let large_area = normalize_and_buffer(
                &drawing,
                &BufferSpec::new(large, DistanceUnit::Meters, albers()),
                &albers(),
            )
            .unwrap()
            .area();

            prop_assert!(large_area >= small_area);
        }
    }
}
