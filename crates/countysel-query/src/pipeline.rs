use std::sync::Arc;

use countysel_core::error::{Result, SelectorError};
use countysel_core::models::{
    AttributeTable, BufferSpec, Drawing, ExportRecord, KeyFormat, MatchResult, ReferenceLayer,
};
use countysel_geo::{match_features_indexed, normalize_and_buffer, LayerIndex};

use crate::join::join;
use crate::models::{QueryOutcome, QueryStatus};
use crate::overlay::{Overlay, OverlayFeature, OverlayLayer};

/// One user's session over a loaded reference layer.
///
/// The layer and its index are built once and only read afterwards. The
/// overlay layer is the session's only mutable state; each query appends its
/// buffer and match overlays together, after every step that can fail.
pub struct QuerySession {
    layer: Arc<ReferenceLayer>,
    index: LayerIndex,
    overlays: OverlayLayer,
    key_field: String,
    key_format: KeyFormat,
}

impl QuerySession {
    /// Create a session, building the spatial index for `layer`
    pub fn new(
        layer: impl Into<Arc<ReferenceLayer>>,
        key_field: impl Into<String>,
        key_format: KeyFormat,
    ) -> Self {
        let layer = layer.into();
        let index = LayerIndex::build(&layer);
        tracing::info!(
            "Session opened on {} ({} features, {})",
            layer.name(),
            layer.len(),
            layer.crs()
        );

        Self {
            layer,
            index,
            overlays: OverlayLayer::new(),
            key_field: key_field.into(),
            key_format,
        }
    }

    pub fn layer(&self) -> &ReferenceLayer {
        &self.layer
    }

    pub fn overlays(&self) -> &OverlayLayer {
        &self.overlays
    }

    /// Clear all overlays. Nothing else in the session changes.
    pub fn reset_overlays(&mut self) {
        self.overlays.reset();
    }

    /// Run one interaction: buffer, match, record overlays, join.
    ///
    /// No drawing or no buffer distance is not an error: the outcome carries
    /// `NoGeometry` / `NoBuffer`, an empty export, and the overlays are left
    /// untouched. A buffer that touches nothing is `EmptyMatch`.
    pub fn run_query(
        &mut self,
        drawing: &Drawing,
        spec: &BufferSpec,
        table: Option<&AttributeTable>,
    ) -> Result<QueryOutcome> {
        let buffered = match normalize_and_buffer(drawing, spec, self.layer.crs()) {
            Ok(buffered) => buffered,
            Err(SelectorError::NoGeometry) => return Ok(self.idle(QueryStatus::NoGeometry)),
            Err(SelectorError::NoBuffer) => return Ok(self.idle(QueryStatus::NoBuffer)),
            Err(e) => return Err(e),
        };

        let matches = match_features_indexed(&self.layer, &self.index, &buffered)?;
        let record = join(&matches, &self.layer, table, &self.key_field, &self.key_format)?;

        let matched_features = matches
            .features
            .iter()
            .filter_map(|m| self.layer.get(m.position))
            .map(|feature| OverlayFeature {
                id: feature.id.clone(),
                name: feature.name.clone(),
                geometry: feature.geometry.clone(),
            })
            .collect();

        self.overlays.extend([
            Overlay::buffer(buffered.clone(), spec.distance, spec.unit),
            Overlay::matches(matched_features, self.layer.crs().clone()),
        ]);

        let status = if matches.is_empty() {
            QueryStatus::EmptyMatch
        } else {
            QueryStatus::Matched(matches.len())
        };
        tracing::info!("{} ({} export rows)", status, record.len());

        Ok(QueryOutcome {
            status,
            buffer: Some(buffered),
            matches,
            record,
            overlays: self.overlays.snapshot(),
        })
    }

    fn idle(&self, status: QueryStatus) -> QueryOutcome {
        tracing::debug!("Nothing to query: {}", status);
        QueryOutcome {
            status,
            buffer: None,
            matches: MatchResult::default(),
            record: ExportRecord::empty(),
            overlays: self.overlays.snapshot(),
        }
    }
}
