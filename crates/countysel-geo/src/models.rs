//! Geometry models for countysel-geo.
//!
//! Re-exports the canonical types from `countysel-core` and converts user
//! drawings into `geo` crate geometries.

use geo::{Coord, Geometry as GeoGeometry, LineString, Point, Polygon};

pub use countysel_core::models::{
    BufferSpec, BufferedGeometry, Crs, CrsUnits, DistanceUnit, Drawing, MatchResult,
    MatchedFeature, ReferenceFeature, ReferenceLayer, ShapeKind, UserGeometry,
};

/// Convert a user drawing to a `geo` geometry in the drawing's own frame.
///
/// Polygon rings are closed if the drawing tool left them open.
pub fn to_geo_geometry(geometry: &UserGeometry) -> GeoGeometry<f64> {
    let coords = || geometry.coordinates.iter().map(|[x, y]| Coord { x: *x, y: *y });

    match geometry.kind {
        ShapeKind::Point => {
            let [x, y] = geometry.coordinates.first().copied().unwrap_or([f64::NAN, f64::NAN]);
            GeoGeometry::Point(Point::new(x, y))
        }
        ShapeKind::Line => GeoGeometry::LineString(LineString::new(coords().collect())),
        ShapeKind::Polygon => {
            let mut ring: Vec<Coord<f64>> = coords().collect();
            if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
                if first != last {
                    ring.push(first);
                }
            }
            GeoGeometry::Polygon(Polygon::new(LineString::new(ring), vec![]))
        }
    }
}
