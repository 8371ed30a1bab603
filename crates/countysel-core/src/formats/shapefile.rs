//! Shapefile format reader implementation
//!
//! Reads polygon ESRI Shapefiles such as the Census cartographic boundary
//! files. The `.shp`, `.shx` and `.dbf` components must all be present; the
//! `.prj` is optional and defaults the CRS to EPSG:4326 when missing.

use async_trait::async_trait;
use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use shapefile::dbase::FieldValue as DbaseFieldValue;
use shapefile::{PolygonRing, Shape};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SelectorError};
use crate::formats::validation::FormatValidator;
use crate::formats::{FormatDataset, FormatFeature, FormatReader, FormatValidation};

const FORMAT: &str = "Shapefile";

/// ESRI WKT names that carry no AUTHORITY clause, mapped to EPSG codes
const ESRI_NAMES: &[(&str, u32)] = &[
    ("GCS_North_American_1983", 4269),
    ("GCS_WGS_1984", 4326),
    ("WGS_1984_Web_Mercator_Auxiliary_Sphere", 3857),
    ("USA_Contiguous_Albers_Equal_Area_Conic_USGS_version", 5070),
];

/// Shapefile format reader
pub struct ShapefileFormatReader;

#[async_trait]
impl FormatReader for ShapefileFormatReader {
    async fn read(&self, path: &Path) -> Result<FormatDataset> {
        self.verify_components(path)?;

        let crs = self.extract_crs(path)?;
        let features = self.read_features(path)?;

        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed").to_string();

        Ok(FormatDataset { name, format_name: FORMAT.to_string(), crs, features })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["shp"]
    }

    fn format_name(&self) -> &str {
        FORMAT
    }

    async fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let mut validation = FormatValidator::require_file(path);
        if !validation.is_valid() {
            return Ok(validation);
        }

        let base = match self.get_shapefile_base(path) {
            Ok(b) => b,
            Err(e) => {
                validation.errors.push(format!("Invalid Shapefile path: {}", e));
                return Ok(validation);
            }
        };

        let components =
            FormatValidator::require_components(&base, &["shp", "shx", "dbf"], &["prj"]);

        Ok(FormatValidator::merge([validation, components]))
    }
}

impl ShapefileFormatReader {
    /// Get the base path for a Shapefile (without extension)
    fn get_shapefile_base(&self, path: &Path) -> Result<PathBuf> {
        let is_shp = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("shp"))
            .unwrap_or(false);

        if !is_shp {
            return Err(format_error(format!("{} is not a .shp file", path.display())));
        }

        Ok(path.with_extension(""))
    }

    /// Verify that all required Shapefile component files exist
    fn verify_components(&self, path: &Path) -> Result<()> {
        let base = self.get_shapefile_base(path)?;
        let missing: Vec<String> = ["shp", "shx", "dbf"]
            .iter()
            .filter(|ext| !base.with_extension(ext).exists())
            .map(|ext| format!(".{}", ext))
            .collect();

        if !missing.is_empty() {
            return Err(format_error(format!(
                "Missing required component files: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }

    /// Extract CRS from the Shapefile .prj file
    fn extract_crs(&self, path: &Path) -> Result<u32> {
        let prj_path = self.get_shapefile_base(path)?.with_extension("prj");

        if !prj_path.exists() {
            tracing::warn!("No .prj next to {}, assuming EPSG:4326", path.display());
            return Ok(4326);
        }

        let prj_content = fs::read_to_string(&prj_path)
            .map_err(|e| format_error(format!("Failed to read .prj file: {}", e)))?;

        match parse_epsg_from_wkt(&prj_content) {
            Some(epsg) => Ok(epsg),
            None => {
                tracing::warn!(
                    "Could not identify the CRS in {}, assuming EPSG:4326",
                    prj_path.display()
                );
                Ok(4326)
            }
        }
    }

    /// Read features from the Shapefile
    fn read_features(&self, path: &Path) -> Result<Vec<FormatFeature>> {
        let mut reader = shapefile::Reader::from_path(path)
            .map_err(|e| format_error(format!("Failed to open Shapefile: {}", e)))?;

        let mut features = Vec::new();
        for (record_number, result) in reader.iter_shapes_and_records().enumerate() {
            let (shape, record) =
                result.map_err(|e| format_error(format!("Failed to read feature: {}", e)))?;

            let properties = record
                .into_iter()
                .map(|(name, value)| (name, convert_dbase_value(&value)))
                .collect::<HashMap<_, _>>();

            features.push(FormatFeature {
                id: record_number.to_string(),
                geometry: convert_shape(&shape)?,
                properties,
            });
        }

        Ok(features)
    }
}

fn format_error(message: String) -> SelectorError {
    SelectorError::FormatError { format: FORMAT.to_string(), message }
}

/// Parse an EPSG code from projection WKT.
///
/// Tries, in order: an `AUTHORITY["EPSG","code"]` clause (the last one names
/// the whole CRS), an `EPSG:code` reference, then known ESRI names.
fn parse_epsg_from_wkt(wkt: &str) -> Option<u32> {
    const AUTHORITY: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(start) = wkt.rfind(AUTHORITY) {
        let code_start = start + AUTHORITY.len();
        if let Some(end) = wkt[code_start..].find('"') {
            if let Ok(code) = wkt[code_start..code_start + end].parse::<u32>() {
                return Some(code);
            }
        }
    }

    if let Some(start) = wkt.find("EPSG:") {
        let code: String =
            wkt[start + 5..].chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(code) = code.parse::<u32>() {
            return Some(code);
        }
    }

    // PROJCS names come before their GEOGCS, so the first hit wins
    ESRI_NAMES
        .iter()
        .filter_map(|(name, code)| wkt.find(name).map(|at| (at, *code)))
        .min_by_key(|(at, _)| *at)
        .map(|(_, code)| code)
}

/// Convert a shapefile shape to a geo geometry. Null shapes become `None`.
fn convert_shape(shape: &Shape) -> Result<Option<Geometry<f64>>> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Polygon(polygon) => {
            rings_to_geometry(polygon.rings().iter().map(|r| ring_coords(r, |p| (p.x, p.y))))
        }
        Shape::PolygonM(polygon) => {
            rings_to_geometry(polygon.rings().iter().map(|r| ring_coords(r, |p| (p.x, p.y))))
        }
        Shape::PolygonZ(polygon) => {
            rings_to_geometry(polygon.rings().iter().map(|r| ring_coords(r, |p| (p.x, p.y))))
        }
        Shape::Point(point) => Geometry::Point(geo::Point::new(point.x, point.y)),
        Shape::Polyline(polyline) => Geometry::MultiLineString(geo::MultiLineString::new(
            polyline
                .parts()
                .iter()
                .map(|part| part.iter().map(|p| Coord { x: p.x, y: p.y }).collect())
                .collect(),
        )),
        other => {
            return Err(format_error(format!(
                "{:?} geometry is not supported",
                other.shapetype()
            )))
        }
    };
    Ok(Some(geometry))
}

/// Ring coordinates tagged with whether the ring is an outer boundary
fn ring_coords<P>(ring: &PolygonRing<P>, xy: impl Fn(&P) -> (f64, f64)) -> (bool, Vec<Coord<f64>>) {
    let is_outer = matches!(ring, PolygonRing::Outer(_));
    let coords = ring
        .points()
        .iter()
        .map(|p| {
            let (x, y) = xy(p);
            Coord { x, y }
        })
        .collect();
    (is_outer, coords)
}

/// Group rings into polygons: each outer ring starts a polygon and the inner
/// rings that follow it are its holes.
fn rings_to_geometry(rings: impl Iterator<Item = (bool, Vec<Coord<f64>>)>) -> Geometry<f64> {
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    for (is_outer, coords) in rings {
        match polygons.last_mut() {
            Some((_, holes)) if !is_outer => holes.push(LineString::new(coords)),
            _ => polygons.push((LineString::new(coords), Vec::new())),
        }
    }

    let mut polygons: Vec<Polygon<f64>> =
        polygons.into_iter().map(|(exterior, holes)| Polygon::new(exterior, holes)).collect();

    if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(MultiPolygon::new(polygons))
    }
}

/// Convert dBase field value to JSON value
fn convert_dbase_value(value: &DbaseFieldValue) -> serde_json::Value {
    let number = |n: f64| {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    };
    match value {
        DbaseFieldValue::Character(Some(s)) => serde_json::Value::String(s.trim().to_string()),
        DbaseFieldValue::Numeric(Some(n)) => number(*n),
        DbaseFieldValue::Float(Some(f)) => number(*f as f64),
        DbaseFieldValue::Double(d) => number(*d),
        DbaseFieldValue::Integer(i) => serde_json::Value::Number((*i).into()),
        DbaseFieldValue::Logical(Some(b)) => serde_json::Value::Bool(*b),
        DbaseFieldValue::Memo(s) => serde_json::Value::String(s.clone()),
        _ => serde_json::Value::Null,
    }
}
