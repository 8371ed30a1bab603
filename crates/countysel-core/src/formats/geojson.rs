//! GeoJSON reader for reference layers and drawing exports

use async_trait::async_trait;
use geo::Geometry;
use std::path::Path;

use crate::error::{Result, SelectorError};
use crate::formats::validation::FormatValidator;
use crate::formats::{resolve_crs, FormatDataset, FormatFeature, FormatReader, FormatValidation};
use crate::models::{ShapeKind, UserGeometry};

const FORMAT: &str = "GeoJSON";

/// GeoJSON format reader
pub struct GeoJsonReader;

#[async_trait]
impl FormatReader for GeoJsonReader {
    async fn read(&self, path: &Path) -> Result<FormatDataset> {
        let content = tokio::fs::read_to_string(path).await?;
        let geojson = parse_geojson(&content)?;

        let (features, crs) = extract_features_and_crs(&geojson)?;

        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed").to_string();

        Ok(FormatDataset { name, format_name: FORMAT.to_string(), crs, features })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json", "geojson"]
    }

    fn format_name(&self) -> &str {
        FORMAT
    }

    async fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let validation = FormatValidator::require_file(path);
        if !validation.is_valid() {
            return Ok(validation);
        }

        let document = FormatValidator::check_geojson_document(path);
        Ok(FormatValidator::merge([validation, document]))
    }
}

fn parse_geojson(content: &str) -> Result<geojson::GeoJson> {
    content.parse().map_err(|e| SelectorError::FormatError {
        format: FORMAT.to_string(),
        message: format!("Failed to parse GeoJSON: {}", e),
    })
}

/// Extract features and CRS from GeoJSON
fn extract_features_and_crs(geojson: &geojson::GeoJson) -> Result<(Vec<FormatFeature>, u32)> {
    match geojson {
        geojson::GeoJson::FeatureCollection(fc) => {
            let features = fc
                .features
                .iter()
                .enumerate()
                .map(|(idx, feature)| convert_feature(feature, idx))
                .collect::<Result<Vec<_>>>()?;

            Ok((features, collection_crs(fc)))
        }
        geojson::GeoJson::Feature(feature) => Ok((vec![convert_feature(feature, 0)?], 4326)),
        geojson::GeoJson::Geometry(geom) => {
            let feature = FormatFeature {
                id: "0".to_string(),
                geometry: Some(convert_geometry(geom)?),
                properties: Default::default(),
            };
            Ok((vec![feature], 4326))
        }
    }
}

/// CRS of a collection (legacy `crs` member), WGS 84 when absent
fn collection_crs(fc: &geojson::FeatureCollection) -> u32 {
    fc.foreign_members
        .as_ref()
        .and_then(|fm| fm.get("crs"))
        .and_then(extract_epsg_from_crs)
        .unwrap_or(4326)
}

/// Convert a GeoJSON feature to FormatFeature
fn convert_feature(feature: &geojson::Feature, idx: usize) -> Result<FormatFeature> {
    let id = feature
        .id
        .as_ref()
        .map(|id| match id {
            geojson::feature::Id::String(s) => s.clone(),
            geojson::feature::Id::Number(n) => n.to_string(),
        })
        .unwrap_or_else(|| idx.to_string());

    let geometry = feature.geometry.as_ref().map(convert_geometry).transpose()?;

    let properties = feature
        .properties
        .as_ref()
        .map(|props| props.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    Ok(FormatFeature { id, geometry, properties })
}

fn convert_geometry(geometry: &geojson::Geometry) -> Result<Geometry<f64>> {
    Geometry::<f64>::try_from(geometry.clone()).map_err(|e| SelectorError::FormatError {
        format: FORMAT.to_string(),
        message: format!("Unsupported geometry: {}", e),
    })
}

/// Extract EPSG code from CRS object
fn extract_epsg_from_crs(crs: &serde_json::Value) -> Option<u32> {
    // "EPSG:4326", "urn:ogc:def:crs:EPSG::4326", or "urn:ogc:def:crs:OGC:1.3:CRS84"
    let name = crs.get("properties")?.get("name")?.as_str()?;
    if name.ends_with("CRS84") {
        return Some(4326);
    }
    name.rsplit(':').next()?.parse().ok()
}

/// Parse every shape in a drawing export, in order.
///
/// Drawing tools export a FeatureCollection where the last feature is the
/// most recent shape; a lone Feature or bare Geometry is also accepted.
pub fn parse_drawings(content: &str) -> Result<Vec<UserGeometry>> {
    let geojson = parse_geojson(content)?;

    let (geometries, epsg): (Vec<&geojson::Geometry>, u32) = match &geojson {
        geojson::GeoJson::FeatureCollection(fc) => {
            (fc.features.iter().filter_map(|f| f.geometry.as_ref()).collect(), collection_crs(fc))
        }
        geojson::GeoJson::Feature(feature) => (feature.geometry.iter().collect(), 4326),
        geojson::GeoJson::Geometry(geom) => (vec![geom], 4326),
    };
    let crs = resolve_crs(epsg)?;

    geometries.into_iter().map(|geom| user_geometry(geom, &crs)).collect()
}

fn user_geometry(geometry: &geojson::Geometry, crs: &crate::models::Crs) -> Result<UserGeometry> {
    let (kind, positions): (ShapeKind, Vec<&geojson::Position>) = match &geometry.value {
        geojson::Value::Point(position) => (ShapeKind::Point, vec![position]),
        geojson::Value::LineString(positions) => (ShapeKind::Line, positions.iter().collect()),
        geojson::Value::Polygon(rings) => {
            let exterior = rings.first().map(|ring| ring.iter().collect()).unwrap_or_default();
            (ShapeKind::Polygon, exterior)
        }
        other => {
            return Err(SelectorError::invalid_geometry(format!(
                "drawings must be a point, line, or polygon, found {}",
                value_type(other)
            )))
        }
    };

    let coordinates = positions
        .into_iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok([*x, *y]),
            _ => Err(SelectorError::invalid_geometry("position with fewer than two ordinates")),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(UserGeometry::new(kind, coordinates, crs.clone()))
}

fn value_type(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}
