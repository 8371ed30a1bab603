use geo::{BoundingRect, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::models::{Crs, ReferenceLayer};

/// Envelope of one reference feature, keyed by its layer position
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedFeature {
    /// Position of the feature in the reference layer
    pub position: usize,

    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn to_envelope(rect: Rect<f64>) -> AABB<[f64; 2]> {
    let min = rect.min();
    let max = rect.max();
    AABB::from_corners([min.x, min.y], [max.x, max.y])
}

/// R-tree over the bounding boxes of a reference layer's features.
///
/// Built once per loaded layer and only read afterwards. It records the
/// layer's CRS so a query in another frame can be refused.
pub struct LayerIndex {
    tree: RTree<IndexedFeature>,
    crs: Crs,
    feature_count: usize,
}

impl LayerIndex {
    /// Build the index. Features without a bounding box (empty geometries)
    /// can never intersect anything and are left out.
    pub fn build(layer: &ReferenceLayer) -> Self {
        let indexed: Vec<IndexedFeature> = layer
            .features()
            .iter()
            .enumerate()
            .filter_map(|(position, feature)| {
                feature
                    .geometry
                    .bounding_rect()
                    .map(|rect| IndexedFeature { position, envelope: to_envelope(rect) })
            })
            .collect();

        tracing::debug!(
            "Indexed {} of {} features of {}",
            indexed.len(),
            layer.len(),
            layer.name()
        );

        Self {
            tree: RTree::bulk_load(indexed),
            crs: layer.crs().clone(),
            feature_count: layer.len(),
        }
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Number of features in the layer this index was built from
    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Layer positions whose envelope touches `rect`, in ascending order
    pub fn candidates(&self, rect: Rect<f64>) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&to_envelope(rect))
            .map(|indexed| indexed.position)
            .collect();
        positions.sort_unstable();
        positions
    }
}
