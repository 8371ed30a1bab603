//! CRS transformation and normalization

use crate::models::{Crs, ReferenceFeature, ReferenceLayer};
use countysel_core::error::{Result, SelectorError};
use geo::{Coord, Geometry, MapCoords, MultiPolygon};
use proj::Proj;

/// Check if two CRS are the same
pub fn crs_match(crs1: &Crs, crs2: &Crs) -> bool {
    crs1.epsg == crs2.epsg
}

/// Detect CRS mismatch and return error if they don't match
pub fn check_crs_mismatch(found: &Crs, expected: &Crs) -> Result<()> {
    if !crs_match(found, expected) {
        return Err(SelectorError::CrsMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

/// A coordinate transformation between two frames.
///
/// Built once and reused for every coordinate of a geometry or layer. When
/// both frames are the same no PROJ pipeline is created and coordinates
/// pass through untouched.
pub struct Reprojector {
    from: Crs,
    to: Crs,
    proj: Option<Proj>,
}

impl Reprojector {
    pub fn new(from: &Crs, to: &Crs) -> Result<Self> {
        let proj = if crs_match(from, to) {
            None
        } else {
            let from_def = format!("EPSG:{}", from.epsg);
            let to_def = format!("EPSG:{}", to.epsg);
            let proj = Proj::new_known_crs(&from_def, &to_def, None)
                .map_err(|e| projection_error(from, to, e))?;
            Some(proj)
        };

        Ok(Self { from: from.clone(), to: to.clone(), proj })
    }

    pub fn is_identity(&self) -> bool {
        self.proj.is_none()
    }

    fn convert(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let Some(proj) = &self.proj else {
            return Ok(coord);
        };
        let (x, y) = proj
            .convert((coord.x, coord.y))
            .map_err(|e| projection_error(&self.from, &self.to, e))?;
        if !x.is_finite() || !y.is_finite() {
            return Err(SelectorError::Projection {
                from: self.from.to_string(),
                to: self.to.to_string(),
                reason: format!("({}, {}) has no finite image", coord.x, coord.y),
            });
        }
        Ok(Coord { x, y })
    }

    /// Reproject any geometry
    pub fn reproject_geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|coord| self.convert(coord))
    }

    /// Reproject an areal geometry
    pub fn reproject_multi_polygon(
        &self,
        geometry: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|coord| self.convert(coord))
    }
}

fn projection_error(from: &Crs, to: &Crs, error: impl std::fmt::Display) -> SelectorError {
    SelectorError::Projection {
        from: from.to_string(),
        to: to.to_string(),
        reason: error.to_string(),
    }
}

/// Reproject a geometry from one CRS to another
pub fn reproject_geometry(
    geometry: &Geometry<f64>,
    from_crs: &Crs,
    to_crs: &Crs,
) -> Result<Geometry<f64>> {
    Reprojector::new(from_crs, to_crs)?.reproject_geometry(geometry)
}

/// Whole-value reprojection into another frame, producing a new value.
pub trait Reproject: Sized {
    fn reproject_to(&self, crs: &Crs) -> Result<Self>;
}

impl Reproject for ReferenceLayer {
    /// A copy of the layer in `crs`, same feature order. The layer itself is
    /// never modified.
    fn reproject_to(&self, crs: &Crs) -> Result<Self> {
        let reprojector = Reprojector::new(self.crs(), crs)?;

        let features = self
            .features()
            .iter()
            .map(|feature| {
                let geometry = reprojector.reproject_multi_polygon(&feature.geometry)?;
                Ok(ReferenceFeature::new(&feature.id, &feature.name, geometry, crs.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        if !reprojector.is_identity() {
            tracing::info!(
                "Reprojected {} features of {} from {} to {}",
                features.len(),
                self.name(),
                self.crs(),
                crs
            );
        }

        ReferenceLayer::new(self.name(), crs.clone(), features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Point};

    fn square_layer(crs: Crs) -> ReferenceLayer {
        let square =
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let geometry = MultiPolygon::new(vec![square]);
        let feature = ReferenceFeature::new("36061", "New York", geometry, crs.clone());
        ReferenceLayer::new("counties", crs, vec![feature]).unwrap()
    }

    #[test]
    fn test_crs_match_is_by_code() {
        let named = Crs::new(5070, "Albers", countysel_core::models::CrsUnits::Meters);
        assert!(crs_match(&named, &Crs::conus_albers()));
        assert!(!crs_match(&Crs::wgs84(), &Crs::nad83()));
    }

    #[test]
    fn test_check_crs_mismatch() {
        assert!(check_crs_mismatch(&Crs::conus_albers(), &Crs::conus_albers()).is_ok());

        let err = check_crs_mismatch(&Crs::wgs84(), &Crs::conus_albers()).unwrap_err();
        match err {
            SelectorError::CrsMismatch { expected, found } => {
                assert!(expected.contains("5070"));
                assert!(found.contains("4326"));
            }
            other => panic!("expected CrsMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_same_frame_is_identity() {
        let reprojector = Reprojector::new(&Crs::conus_albers(), &Crs::conus_albers()).unwrap();
        assert!(reprojector.is_identity());

        let point = Geometry::Point(Point::new(12.5, -3.0));
        assert_eq!(reprojector.reproject_geometry(&point).unwrap(), point);
    }

    #[test]
    fn test_same_frame_layer_is_copied() {
        let layer = square_layer(Crs::conus_albers());
        let copy = layer.reproject_to(&Crs::conus_albers()).unwrap();
        assert_eq!(copy.features(), layer.features());
        assert_eq!(copy.crs(), layer.crs());
    }

    #[test]
    fn test_wgs84_to_web_mercator() {
        let point = Geometry::Point(Point::new(180.0, 0.0));
        let projected = reproject_geometry(&point, &Crs::wgs84(), &Crs::web_mercator()).unwrap();

        match projected {
            Geometry::Point(p) => {
                assert!((p.x() - 20_037_508.342_789_244).abs() < 1e-3);
                assert!(p.y().abs() < 1e-6);
            }
            other => panic!("expected Point, got {:?}", other),
        }
    }

    #[test]
    fn test_layer_reprojection_keeps_original() {
        let layer = square_layer(Crs::wgs84());
        let projected = layer.reproject_to(&Crs::web_mercator()).unwrap();

        assert_eq!(projected.crs().epsg, 3857);
        assert_eq!(projected.features()[0].crs.epsg, 3857);
        assert_eq!(projected.features()[0].id, "36061");
        assert_eq!(layer.crs().epsg, 4326);
        assert!(projected.bounds().unwrap().max().x > 100_000.0);
    }
}
