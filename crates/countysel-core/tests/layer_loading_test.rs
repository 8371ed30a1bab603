//! Integration tests for loading reference layers and attribute tables
//!
//! This test suite verifies that:
//! - GeoJSON layers carry their declared CRS, or EPSG:4326 when none is given
//! - Identifier and name fields come from the configured properties
//! - Null geometries are skipped, non-areal geometries are rejected
//! - Shapefiles resolve ESRI `.prj` names and keep polygon holes
//! - CSV tables load with case-sensitive headers and exports write back out

use countysel_core::config::LayeredConfig;
use countysel_core::formats::csv::read_attribute_table_path;
use countysel_core::formats::*;
use countysel_core::models::{CrsUnits, ExportRecord};
use countysel_core::SelectorError;
use ::shapefile::dbase::{FieldValue, Record, TableWriterBuilder};
use ::shapefile::{Point, Polygon, PolygonRing};
use std::fs;
use tempfile::TempDir;

const NAD83_PRJ: &str = concat!(
    r#"GEOGCS["GCS_North_American_1983","#,
    r#"DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],"#,
    r#"PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#
);

const COUNTIES_5070: &str = r#"{
    "type": "FeatureCollection",
    "crs": { "type": "name", "properties": { "name": "EPSG:5070" } },
    "features": [
        {
            "type": "Feature",
            "geometry": { "type": "Polygon",
                "coordinates": [[[0, 0], [1000, 0], [1000, 1000], [0, 1000], [0, 0]]] },
            "properties": { "GEOID": "36061", "NAME": "New York" }
        },
        {
            "type": "Feature",
            "geometry": null,
            "properties": { "GEOID": "36047", "NAME": "Kings" }
        },
        {
            "type": "Feature",
            "geometry": { "type": "MultiPolygon",
                "coordinates": [[[[1000, 0], [2000, 0], [2000, 1000], [1000, 1000], [1000, 0]]]] },
            "properties": { "GEOID": 36005, "NAME": "Bronx" }
        }
    ]
}"#;

async fn load(
    content: &str,
    file_name: &str,
) -> countysel_core::Result<countysel_core::models::ReferenceLayer> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(file_name);
    fs::write(&path, content).unwrap();

    let config = LayeredConfig::with_defaults();
    let dataset = FormatRegistry::with_defaults().read(&path).await?;
    build_reference_layer(dataset, &config.layer_fields(), &config.key_format())
}

#[tokio::test]
async fn test_geojson_layer_in_declared_crs() {
    let layer = load(COUNTIES_5070, "counties.geojson").await.unwrap();

    assert_eq!(layer.name(), "counties");
    assert_eq!(layer.crs().epsg, 5070);
    assert_eq!(layer.crs().units, CrsUnits::Meters);

    // Kings has no geometry and is skipped
    let ids: Vec<&str> = layer.features().iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["36061", "36005"]);
    assert_eq!(layer.features()[1].name, "Bronx");
}

#[tokio::test]
async fn test_geojson_without_crs_defaults_to_4326() {
    let content = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Polygon",
                    "coordinates": [[[-74.0, 40.7], [-73.9, 40.7], [-73.9, 40.8], [-74.0, 40.7]]] },
                "properties": { "GEOID": "36061", "NAME": "New York" }
            }
        ]
    }"#;

    let layer = load(content, "counties.json").await.unwrap();
    assert_eq!(layer.crs().epsg, 4326);
    assert!(layer.crs().is_geographic());
}

#[tokio::test]
async fn test_point_reference_features_are_rejected() {
    let content = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": [0, 0] },
              "properties": { "GEOID": "36061", "NAME": "New York" } }
        ]
    }"#;

    let err = load(content, "points.geojson").await.unwrap_err();
    assert!(matches!(err, SelectorError::InvalidGeometry { .. }));
}

#[tokio::test]
async fn test_missing_id_field_is_a_format_error() {
    let content = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "geometry": null, "properties": { "NAME": "New York" } }
        ]
    }"#;

    let err = load(content, "counties.geojson").await.unwrap_err();
    assert!(err.to_string().contains("GEOID"));
}

#[tokio::test]
async fn test_unjoinable_ids_are_rejected_at_load() {
    let content = COUNTIES_5070.replace("\"36061\"", "\"NY-061\"");
    let err = load(&content, "counties.geojson").await.unwrap_err();
    assert!(matches!(err, SelectorError::KeyFormat { .. }));
}

fn ring(points: &[(f64, f64)]) -> Vec<Point> {
    points.iter().map(|(x, y)| Point::new(*x, *y)).collect()
}

fn county_record(geoid: &str, name: &str) -> Record {
    let mut record = Record::default();
    record.insert("GEOID".to_string(), FieldValue::Character(Some(geoid.to_string())));
    record.insert("NAME".to_string(), FieldValue::Character(Some(name.to_string())));
    record
}

#[tokio::test]
async fn test_shapefile_layer_with_esri_prj_and_hole() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cb_counties.shp");

    let shapes = vec![
        Polygon::with_rings(vec![
            PolygonRing::Outer(ring(&[
                (-74.0, 40.0),
                (-74.0, 41.0),
                (-73.0, 41.0),
                (-73.0, 40.0),
                (-74.0, 40.0),
            ])),
            PolygonRing::Inner(ring(&[
                (-73.8, 40.2),
                (-73.2, 40.2),
                (-73.2, 40.8),
                (-73.8, 40.8),
                (-73.8, 40.2),
            ])),
        ]),
        Polygon::new(PolygonRing::Outer(ring(&[
            (-73.0, 40.0),
            (-73.0, 41.0),
            (-72.0, 41.0),
            (-72.0, 40.0),
            (-73.0, 40.0),
        ]))),
    ];
    let records = vec![county_record("36061", "New York"), county_record("36005", "Bronx")];

    let table = TableWriterBuilder::new()
        .add_character_field("GEOID".try_into().unwrap(), 5)
        .add_character_field("NAME".try_into().unwrap(), 40);
    let writer = ::shapefile::Writer::from_path(&path, table).unwrap();
    writer.write_shapes_and_records(shapes.iter().zip(records.iter())).unwrap();
    fs::write(path.with_extension("prj"), NAD83_PRJ).unwrap();

    let config = LayeredConfig::with_defaults();
    let dataset = FormatRegistry::with_defaults().read(&path).await.unwrap();
    assert_eq!(dataset.format_name, "Shapefile");
    let layer =
        build_reference_layer(dataset, &config.layer_fields(), &config.key_format()).unwrap();

    assert_eq!(layer.name(), "cb_counties");
    assert_eq!(layer.crs().epsg, 4269);
    assert!(layer.crs().is_geographic());

    let ids: Vec<&str> = layer.features().iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["36061", "36005"]);
    let names: Vec<&str> = layer.features().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["New York", "Bronx"]);

    let new_york = &layer.features()[0].geometry;
    assert_eq!(new_york.0.len(), 1);
    assert_eq!(new_york.0[0].interiors().len(), 1);
    assert!(layer.features()[1].geometry.0[0].interiors().is_empty());
}

#[tokio::test]
async fn test_zipped_shapefile_must_be_extracted() {
    let err = load("PK", "cb_2018_us_county_500k.zip").await.unwrap_err();
    assert!(matches!(err, SelectorError::FormatError { .. }));
    assert!(err.to_string().contains("extract the archive"), "{}", err);
}

#[tokio::test]
async fn test_unsupported_extension() {
    let err = load("<kml/>", "counties.kml").await.unwrap_err();
    assert!(err.to_string().contains("unsupported file type"));
}

#[tokio::test]
async fn test_invalid_json_fails_validation() {
    let err = load("{ not json", "counties.geojson").await.unwrap_err();
    assert!(matches!(err, SelectorError::FormatError { .. }));
}

#[test]
fn test_csv_table_round_trip_through_export() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("population.csv");
    fs::write(&path, "FIPS,Population\n6037,10014009\n06059,3186989\n").unwrap();

    let table = read_attribute_table_path(&path).unwrap();
    assert_eq!(table.column_index("Population").unwrap(), 1);
    assert!(table.column_index("population").is_err());

    let export = ExportRecord {
        columns: vec!["FIPS".to_string(), "Population".to_string()],
        rows: table.rows().to_vec(),
    };
    assert_eq!(export.to_csv().unwrap(), "FIPS,Population\n6037,10014009\n06059,3186989\n");
}
