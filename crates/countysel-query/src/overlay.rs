//! Session overlays: the buffers and match sets drawn on top of the map

use chrono::{DateTime, Utc};
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use serde::Serialize;

use countysel_core::models::{BufferedGeometry, Crs, DistanceUnit};

/// One reference feature inside a match overlay
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFeature {
    pub id: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// What an overlay shows
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayKind {
    /// The buffered drawing, with the distance as the user entered it
    Buffer { buffer: BufferedGeometry, distance: f64, unit: DistanceUnit },
    /// The reference features a buffer matched
    Matches { features: Vec<OverlayFeature> },
}

/// A derived artifact appended by one query
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub kind: OverlayKind,
    pub crs: Crs,
    pub added_at: DateTime<Utc>,
}

impl Overlay {
    pub fn buffer(buffer: BufferedGeometry, distance: f64, unit: DistanceUnit) -> Self {
        let crs = buffer.crs.clone();
        Self { kind: OverlayKind::Buffer { buffer, distance, unit }, crs, added_at: Utc::now() }
    }

    pub fn matches(features: Vec<OverlayFeature>, crs: Crs) -> Self {
        Self { kind: OverlayKind::Matches { features }, crs, added_at: Utc::now() }
    }

    /// Short label for listings: `buffer` or `matches`
    pub fn label(&self) -> &'static str {
        match self.kind {
            OverlayKind::Buffer { .. } => "buffer",
            OverlayKind::Matches { .. } => "matches",
        }
    }
}

/// Summary row of an overlay for display
#[derive(Debug, Clone, Serialize)]
pub struct OverlaySummary {
    pub order: usize,
    pub kind: String,
    pub detail: String,
    pub added_at: DateTime<Utc>,
}

/// Append-only, ordered overlays of a session.
///
/// Insertion order is draw order. Entries are never deduplicated: running
/// the same query twice appends its overlays twice. Only [`reset`] removes
/// anything.
///
/// [`reset`]: OverlayLayer::reset
#[derive(Debug, Clone, Default)]
pub struct OverlayLayer {
    overlays: Vec<Overlay>,
}

impl OverlayLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, overlay: Overlay) {
        self.overlays.push(overlay);
    }

    /// Append several overlays as one step
    pub fn extend(&mut self, overlays: impl IntoIterator<Item = Overlay>) {
        self.overlays.extend(overlays);
    }

    pub fn reset(&mut self) {
        tracing::debug!("Clearing {} overlays", self.overlays.len());
        self.overlays.clear();
    }

    /// Copy of the overlays in draw order
    pub fn snapshot(&self) -> Vec<Overlay> {
        self.overlays.clone()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn summaries(&self) -> Vec<OverlaySummary> {
        self.overlays
            .iter()
            .enumerate()
            .map(|(order, overlay)| {
                let detail = match &overlay.kind {
                    OverlayKind::Buffer { buffer, distance, unit } => {
                        format!("{} {} around {}", distance, unit, buffer.source_kind)
                    }
                    OverlayKind::Matches { features } => {
                        let ids: Vec<&str> = features.iter().map(|f| f.id.as_str()).collect();
                        format!("{} features: {}", features.len(), ids.join(", "))
                    }
                };
                OverlaySummary {
                    order,
                    kind: overlay.label().to_string(),
                    detail,
                    added_at: overlay.added_at,
                }
            })
            .collect()
    }

    /// Render every overlay as GeoJSON, in draw order.
    ///
    /// A buffer is one feature; a match set is one feature per matched
    /// reference polygon. Each feature carries its overlay's `order`. The
    /// collection declares the CRS of the first overlay.
    pub fn to_geojson(&self) -> FeatureCollection {
        let mut features = Vec::new();

        for (order, overlay) in self.overlays.iter().enumerate() {
            let mut base = JsonObject::new();
            base.insert("overlay".to_string(), JsonValue::from(overlay.label()));
            base.insert("order".to_string(), JsonValue::from(order));
            base.insert("added_at".to_string(), JsonValue::from(overlay.added_at.to_rfc3339()));

            match &overlay.kind {
                OverlayKind::Buffer { buffer, distance, unit } => {
                    let mut properties = base;
                    properties.insert("distance".to_string(), JsonValue::from(*distance));
                    properties.insert("unit".to_string(), JsonValue::from(unit.to_string()));
                    properties.insert("radius".to_string(), JsonValue::from(buffer.radius));
                    properties.insert(
                        "source".to_string(),
                        JsonValue::from(buffer.source_kind.to_string()),
                    );
                    features.push(polygon_feature(&buffer.polygon, properties));
                }
                OverlayKind::Matches { features: matched } => {
                    for feature in matched {
                        let mut properties = base.clone();
                        properties
                            .insert("id".to_string(), JsonValue::from(feature.id.clone()));
                        properties
                            .insert("name".to_string(), JsonValue::from(feature.name.clone()));
                        features.push(polygon_feature(&feature.geometry, properties));
                    }
                }
            }
        }

        let foreign_members = self.overlays.first().map(|overlay| {
            let mut members = JsonObject::new();
            members.insert(
                "crs".to_string(),
                serde_json::json!({
                    "type": "name",
                    "properties": { "name": format!("EPSG:{}", overlay.crs.epsg) }
                }),
            );
            members
        });

        FeatureCollection { bbox: None, features, foreign_members }
    }
}

fn polygon_feature(geometry: &MultiPolygon<f64>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use countysel_core::models::ShapeKind;
    use geo::{coord, Rect};

    fn square(x: f64) -> MultiPolygon<f64> {
        let rect = Rect::new(coord! { x: x, y: 0.0 }, coord! { x: x + 1.0, y: 1.0 });
        MultiPolygon::new(vec![rect.to_polygon()])
    }

    fn buffer_overlay() -> Overlay {
        let buffer = BufferedGeometry {
            polygon: square(0.0),
            crs: Crs::conus_albers(),
            radius: 1609.344,
            source_kind: ShapeKind::Line,
        };
        Overlay::buffer(buffer, 1.0, DistanceUnit::Miles)
    }

    fn match_overlay() -> Overlay {
        Overlay::matches(
            vec![
                OverlayFeature {
                    id: "36061".to_string(),
                    name: "New York".to_string(),
                    geometry: square(0.0),
                },
                OverlayFeature {
                    id: "36005".to_string(),
                    name: "Bronx".to_string(),
                    geometry: square(1.0),
                },
            ],
            Crs::conus_albers(),
        )
    }

    #[test]
    fn test_append_preserves_order_without_dedup() {
        let mut layer = OverlayLayer::new();
        layer.append(buffer_overlay());
        layer.append(match_overlay());
        layer.append(buffer_overlay());

        let labels: Vec<&str> = layer.snapshot().iter().map(|o| o.label()).collect();
        assert_eq!(labels, vec!["buffer", "matches", "buffer"]);
    }

    #[test]
    fn test_reset_empties_snapshot() {
        let mut layer = OverlayLayer::new();
        layer.extend([buffer_overlay(), match_overlay()]);
        assert_eq!(layer.len(), 2);

        layer.reset();
        assert!(layer.snapshot().is_empty());
        assert!(layer.to_geojson().features.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut layer = OverlayLayer::new();
        layer.append(buffer_overlay());
        let snapshot = layer.snapshot();
        layer.reset();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_geojson_in_draw_order() {
        let mut layer = OverlayLayer::new();
        layer.extend([buffer_overlay(), match_overlay()]);

        let collection = layer.to_geojson();
        assert_eq!(collection.features.len(), 3);

        let property = |i: usize, key: &str| {
            collection.features[i].properties.as_ref().and_then(|p| p.get(key)).cloned()
        };
        assert_eq!(property(0, "overlay"), Some(JsonValue::from("buffer")));
        assert_eq!(property(0, "unit"), Some(JsonValue::from("mi")));
        assert_eq!(property(1, "order"), Some(JsonValue::from(1)));
        assert_eq!(property(2, "id"), Some(JsonValue::from("36005")));

        let crs = collection.foreign_members.as_ref().and_then(|m| m.get("crs")).cloned();
        assert_eq!(
            crs.and_then(|c| c["properties"]["name"].as_str().map(String::from)),
            Some("EPSG:5070".to_string())
        );
    }

    #[test]
    fn test_summaries() {
        let mut layer = OverlayLayer::new();
        layer.extend([buffer_overlay(), match_overlay()]);

        let summaries = layer.summaries();
        assert_eq!(summaries[0].detail, "1 mi around line");
        assert_eq!(summaries[1].detail, "2 features: 36061, 36005");
    }
}
