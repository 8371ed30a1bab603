//! Spatial matching of a buffered drawing against a reference layer

use geo::Intersects;
use std::collections::HashSet;
use tracing::debug;

use crate::index::LayerIndex;
use crate::models::{BufferedGeometry, MatchResult, MatchedFeature, ReferenceLayer};
use crate::transform::check_crs_mismatch;
use countysel_core::error::{Result, SelectorError};

/// Reference features that intersect `buffered`, deduplicated by id and in
/// layer order.
///
/// Boundary contact counts as intersecting. An empty result is not an error.
/// Fails with `CrsMismatch` before any geometry is compared if the buffer and
/// the layer are in different frames.
pub fn match_features(layer: &ReferenceLayer, buffered: &BufferedGeometry) -> Result<MatchResult> {
    check_crs_mismatch(&buffered.crs, layer.crs())?;
    Ok(collect_matches(layer, buffered, 0..layer.len()))
}

/// Same as [`match_features`], narrowing candidates through `index` first.
///
/// `index` must have been built from `layer`; an index over a different
/// number of features fails with `StaleIndex`.
pub fn match_features_indexed(
    layer: &ReferenceLayer,
    index: &LayerIndex,
    buffered: &BufferedGeometry,
) -> Result<MatchResult> {
    check_crs_mismatch(&buffered.crs, layer.crs())?;
    check_crs_mismatch(index.crs(), layer.crs())?;
    if index.feature_count() != layer.len() {
        return Err(SelectorError::StaleIndex {
            indexed: index.feature_count(),
            layer: layer.len(),
        });
    }

    let Some(rect) = buffered.bounding_rect() else {
        return Ok(MatchResult::default());
    };
    let candidates = index.candidates(rect);
    debug!("{} of {} features are candidates", candidates.len(), layer.len());

    Ok(collect_matches(layer, buffered, candidates))
}

/// Stable filter over `positions`, which must be ascending
fn collect_matches(
    layer: &ReferenceLayer,
    buffered: &BufferedGeometry,
    positions: impl IntoIterator<Item = usize>,
) -> MatchResult {
    let mut seen = HashSet::new();
    let mut features = Vec::new();

    for position in positions {
        let Some(feature) = layer.get(position) else {
            continue;
        };
        if seen.contains(feature.id.as_str()) {
            continue;
        }
        if feature.geometry.intersects(&buffered.polygon) {
            seen.insert(feature.id.as_str());
            features.push(MatchedFeature { id: feature.id.clone(), position });
        }
    }

    debug!("Matched {} features of {}", features.len(), layer.name());
    MatchResult { features }
}
