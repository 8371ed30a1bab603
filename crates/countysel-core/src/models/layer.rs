use geo::{BoundingRect, MultiPolygon, Rect};
use std::collections::HashSet;

use super::geometry::Crs;
use crate::error::{Result, SelectorError};

/// A single reference polygon (for example, one county)
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceFeature {
    /// Stable identifier, e.g. a 5-digit county FIPS code
    pub id: String,

    /// Display name
    pub name: String,

    /// Areal geometry; counties with islands are multi-part
    pub geometry: MultiPolygon<f64>,

    pub crs: Crs,
}

impl ReferenceFeature {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        geometry: MultiPolygon<f64>,
        crs: Crs,
    ) -> Self {
        Self { id: id.into(), name: name.into(), geometry, crs }
    }
}

/// Ordered, read-only collection of reference polygons sharing one frame.
///
/// Feature order is significant: matches are reported in this order.
#[derive(Debug, Clone)]
pub struct ReferenceLayer {
    name: String,
    crs: Crs,
    features: Vec<ReferenceFeature>,
}

impl ReferenceLayer {
    /// Create a layer, checking that every feature is in `crs`.
    pub fn new(name: impl Into<String>, crs: Crs, features: Vec<ReferenceFeature>) -> Result<Self> {
        if let Some(stray) = features.iter().find(|f| f.crs != crs) {
            return Err(SelectorError::CrsMismatch {
                expected: crs.to_string(),
                found: format!("{} on feature {}", stray.crs, stray.id),
            });
        }
        Ok(Self { name: name.into(), crs, features })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn features(&self) -> &[ReferenceFeature] {
        &self.features
    }

    pub fn get(&self, position: usize) -> Option<&ReferenceFeature> {
        self.features.get(position)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding box of all features
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .reduce(|acc, rect| {
                let (lo, hi) = (acc.min(), acc.max());
                Rect::new(
                    geo::coord! { x: lo.x.min(rect.min().x), y: lo.y.min(rect.min().y) },
                    geo::coord! { x: hi.x.max(rect.max().x), y: hi.y.max(rect.max().y) },
                )
            })
    }

    /// Identifiers that appear on more than one feature, in first-seen order.
    ///
    /// Multi-record counties are legal; matching collapses them.
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut duplicates = Vec::new();
        for feature in &self.features {
            if !seen.insert(feature.id.as_str()) && reported.insert(feature.id.as_str()) {
                duplicates.push(feature.id.clone());
            }
        }
        duplicates
    }
}

/// One entry of a match set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFeature {
    pub id: String,
    /// Layer position of the first intersecting feature with this id
    pub position: usize,
}

/// Deduplicated reference features intersecting a buffer, in layer order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub features: Vec<MatchedFeature>,
}

impl MatchResult {
    pub fn ids(&self) -> Vec<&str> {
        self.features.iter().map(|m| m.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
