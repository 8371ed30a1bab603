//! Format abstraction layer for the loading collaborators
//!
//! Each vector format implements the `FormatReader` trait, and the
//! `FormatRegistry` dispatches on file extension. Readers produce a neutral
//! `FormatDataset`; [`build_reference_layer`] turns that into a
//! [`ReferenceLayer`] using the configured identifier and name fields.

use async_trait::async_trait;
use geo::{Geometry, MultiPolygon};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, SelectorError};
use crate::models::{Crs, KeyFormat, ReferenceFeature, ReferenceLayer};

pub mod csv;
pub mod geojson;
pub mod shapefile;
pub mod validation;

/// Format reader trait that all format implementations must implement
#[async_trait]
pub trait FormatReader: Send + Sync {
    /// Read a dataset from the given path
    async fn read(&self, path: &Path) -> Result<FormatDataset>;

    /// Get supported file extensions (e.g., ["shp", "geojson"])
    fn supported_extensions(&self) -> &[&str];

    /// Get human-readable format name (e.g., "Shapefile", "GeoJSON")
    fn format_name(&self) -> &str;

    /// Validate file structure without full read (optional)
    async fn validate(&self, _path: &Path) -> Result<FormatValidation> {
        Ok(FormatValidation::default())
    }
}

/// Result of format validation
#[derive(Debug, Clone, Default)]
pub struct FormatValidation {
    /// Validation errors that prevent reading
    pub errors: Vec<String>,

    /// Warnings that don't prevent reading but indicate potential issues
    pub warnings: Vec<String>,
}

impl FormatValidation {
    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Dataset representation returned by format readers
#[derive(Debug, Clone)]
pub struct FormatDataset {
    /// Dataset name (file stem)
    pub name: String,

    /// Format name (e.g., "Shapefile", "GeoJSON")
    pub format_name: String,

    /// CRS EPSG code
    pub crs: u32,

    /// Features in file order
    pub features: Vec<FormatFeature>,
}

/// Feature extracted from a format
#[derive(Debug, Clone)]
pub struct FormatFeature {
    /// Record identifier (feature id or record number)
    pub id: String,

    /// Geometry, None for null shapes
    pub geometry: Option<Geometry<f64>>,

    /// Feature properties
    pub properties: HashMap<String, serde_json::Value>,
}

impl FormatFeature {
    /// Property rendered as text. Integral numbers render without a
    /// fractional part so numeric identifiers survive.
    pub fn property_text(&self, field: &str) -> Option<String> {
        match self.properties.get(field)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(match n.as_i64() {
                Some(i) => i.to_string(),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                    _ => n.to_string(),
                },
            }),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Which properties of a dataset identify and name a reference feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerFields {
    pub id_field: String,
    pub name_field: String,
}

impl Default for LayerFields {
    fn default() -> Self {
        Self { id_field: "GEOID".to_string(), name_field: "NAME".to_string() }
    }
}

/// Resolve an EPSG code to a [`Crs`] with known linear units.
pub fn resolve_crs(epsg: u32) -> Result<Crs> {
    Crs::from_epsg(epsg).ok_or(SelectorError::UnknownCrs { epsg })
}

/// Areal part of a geometry as a multipolygon
pub fn areal_geometry(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => Some(multi),
        Geometry::Rect(rect) => Some(MultiPolygon::new(vec![rect.to_polygon()])),
        Geometry::Triangle(triangle) => Some(MultiPolygon::new(vec![triangle.to_polygon()])),
        Geometry::GeometryCollection(collection) => {
            let polygons: Vec<_> = collection
                .into_iter()
                .filter_map(areal_geometry)
                .flat_map(|multi| multi.0)
                .collect();
            (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

/// Build a reference layer from a dataset read by any format reader.
///
/// Features without geometry are skipped with a warning; non-areal
/// geometries and missing identifier fields are errors. Identifiers are
/// checked against `key_format` so a layer whose ids cannot join is rejected
/// at load rather than at query time.
pub fn build_reference_layer(
    dataset: FormatDataset,
    fields: &LayerFields,
    key_format: &KeyFormat,
) -> Result<ReferenceLayer> {
    let crs = resolve_crs(dataset.crs)?;
    let mut features = Vec::with_capacity(dataset.features.len());

    for feature in dataset.features {
        let id = feature.property_text(&fields.id_field).ok_or_else(|| {
            SelectorError::FormatError {
                format: dataset.format_name.clone(),
                message: format!(
                    "feature {} has no '{}' property",
                    feature.id, fields.id_field
                ),
            }
        })?;
        key_format.normalize(&id)?;

        let name = feature.property_text(&fields.name_field).unwrap_or_default();

        let Some(geometry) = feature.geometry else {
            tracing::warn!("Skipping feature {} ({}): no geometry", feature.id, id);
            continue;
        };
        let geometry = areal_geometry(geometry).ok_or_else(|| {
            SelectorError::invalid_geometry(format!(
                "feature {} ({}) is not a polygon or multipolygon",
                feature.id, id
            ))
        })?;

        features.push(ReferenceFeature::new(id, name, geometry, crs.clone()));
    }

    tracing::info!(
        "Loaded {} reference features from {} ({}) in {}",
        features.len(),
        dataset.name,
        dataset.format_name,
        crs
    );

    ReferenceLayer::new(dataset.name, crs, features)
}

/// Central registry for format readers
pub struct FormatRegistry {
    readers: Vec<Box<dyn FormatReader>>,
}

impl FormatRegistry {
    /// Create a new empty format registry
    pub fn new() -> Self {
        Self { readers: Vec::new() }
    }

    /// Registry with the GeoJSON and Shapefile readers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(geojson::GeoJsonReader));
        registry.register(Box::new(shapefile::ShapefileFormatReader));
        registry
    }

    /// Register a format reader
    pub fn register(&mut self, reader: Box<dyn FormatReader>) {
        self.readers.push(reader);
    }

    /// Detect format and return appropriate reader
    pub fn detect_format(&self, path: &Path) -> Result<&dyn FormatReader> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if extension == "zip" {
            return Err(SelectorError::FormatError {
                format: "zip".to_string(),
                message: "zipped shapefile bundles are not read directly; extract the archive \
                          and pass its .shp file"
                    .to_string(),
            });
        }

        self.readers
            .iter()
            .find(|r| r.supported_extensions().contains(&extension.as_str()))
            .map(|r| r.as_ref())
            .ok_or_else(|| SelectorError::FormatError {
                format: if extension.is_empty() { "none".to_string() } else { extension.clone() },
                message: format!(
                    "unsupported file type; supported: {}",
                    self.supported_formats().join(", ")
                ),
            })
    }

    /// Read any supported file
    pub async fn read(&self, path: &Path) -> Result<FormatDataset> {
        let reader = self.detect_format(path)?;
        let validation = reader.validate(path).await?;
        for warning in &validation.warnings {
            tracing::warn!("{}", warning);
        }
        validation::FormatValidator::validation_to_result(&validation, reader.format_name())?;
        reader.read(path).await
    }

    /// Get list of all supported format extensions
    pub fn supported_formats(&self) -> Vec<String> {
        self.readers
            .iter()
            .flat_map(|r| r.supported_extensions())
            .map(|s| s.to_string())
            .collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon};

    // Mock format reader for testing
    struct MockReader {
        extensions: Vec<&'static str>,
        name: &'static str,
    }

    #[async_trait]
    impl FormatReader for MockReader {
        async fn read(&self, _path: &Path) -> Result<FormatDataset> {
            Ok(FormatDataset {
                name: "test".to_string(),
                format_name: self.name.to_string(),
                crs: 4326,
                features: vec![],
            })
        }

        fn supported_extensions(&self) -> &[&str] {
            &self.extensions
        }

        fn format_name(&self) -> &str {
            self.name
        }
    }

    fn feature(
        id: &str,
        geometry: Option<Geometry<f64>>,
        props: &[(&str, serde_json::Value)],
    ) -> FormatFeature {
        FormatFeature {
            id: id.to_string(),
            geometry,
            properties: props.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    fn unit_square() -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ])
    }

    #[test]
    fn test_format_detection() {
        let mut registry = FormatRegistry::new();
        registry.register(Box::new(MockReader {
            extensions: vec!["json", "geojson"],
            name: "GeoJSON",
        }));
        registry.register(Box::new(MockReader { extensions: vec!["shp"], name: "Shapefile" }));

        let reader = registry.detect_format(Path::new("counties.geojson")).unwrap();
        assert_eq!(reader.format_name(), "GeoJSON");

        let reader = registry.detect_format(Path::new("cb_2018_us_county_20m.SHP")).unwrap();
        assert_eq!(reader.format_name(), "Shapefile");
    }

    #[test]
    fn test_unsupported_format() {
        let registry = FormatRegistry::with_defaults();
        assert!(registry.detect_format(Path::new("counties.xyz")).is_err());
        assert!(registry.detect_format(Path::new("counties")).is_err());
    }

    #[test]
    fn test_property_text_keeps_integer_ids() {
        let f = feature(
            "0",
            None,
            &[
                ("GEOID", serde_json::json!(6037)),
                ("FLOAT", serde_json::json!(6037.0)),
                ("NAME", serde_json::json!("Los Angeles")),
            ],
        );
        assert_eq!(f.property_text("GEOID").as_deref(), Some("6037"));
        assert_eq!(f.property_text("FLOAT").as_deref(), Some("6037"));
        assert_eq!(f.property_text("NAME").as_deref(), Some("Los Angeles"));
        assert_eq!(f.property_text("MISSING"), None);
    }

    #[test]
    fn test_build_reference_layer() {
        let dataset = FormatDataset {
            name: "counties".to_string(),
            format_name: "GeoJSON".to_string(),
            crs: 4269,
            features: vec![
                feature(
                    "0",
                    Some(unit_square()),
                    &[
                        ("GEOID", serde_json::json!("36061")),
                        ("NAME", serde_json::json!("New York")),
                    ],
                ),
                feature("1", None, &[("GEOID", serde_json::json!("36005"))]),
            ],
        };

        let fields = LayerFields::default();
        let layer = build_reference_layer(dataset, &fields, &KeyFormat::county_fips()).unwrap();
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.crs(), &Crs::nad83());
        assert_eq!(layer.features()[0].name, "New York");
    }

    #[test]
    fn test_build_reference_layer_rejects_lines() {
        let dataset = FormatDataset {
            name: "roads".to_string(),
            format_name: "GeoJSON".to_string(),
            crs: 4326,
            features: vec![feature(
                "0",
                Some(Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)])),
                &[("GEOID", serde_json::json!("36061"))],
            )],
        };

        let err = build_reference_layer(dataset, &LayerFields::default(), &KeyFormat::county_fips())
            .unwrap_err();
        assert!(matches!(err, SelectorError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_build_reference_layer_requires_id_field() {
        let dataset = FormatDataset {
            name: "counties".to_string(),
            format_name: "GeoJSON".to_string(),
            crs: 4326,
            features: vec![feature(
                "0",
                Some(unit_square()),
                &[("NAME", serde_json::json!("Bronx"))],
            )],
        };

        let err = build_reference_layer(dataset, &LayerFields::default(), &KeyFormat::county_fips())
            .unwrap_err();
        assert!(matches!(err, SelectorError::FormatError { .. }));
    }

    #[test]
    fn test_unknown_crs_is_rejected() {
        assert!(matches!(resolve_crs(123_456), Err(SelectorError::UnknownCrs { epsg: 123_456 })));
    }
}
