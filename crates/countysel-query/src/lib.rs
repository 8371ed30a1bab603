//! countysel query - Joins, overlays, and query sessions
//!
//! This crate sequences one user interaction: buffer the drawing, match it
//! against the reference layer, record the overlays, and join the matches
//! with an uploaded table into an export.

pub mod join;
pub mod models;
pub mod overlay;
pub mod pipeline;

pub use join::join;
pub use models::{QueryOutcome, QueryStatus};
pub use overlay::{Overlay, OverlayFeature, OverlayKind, OverlayLayer, OverlaySummary};
pub use pipeline::QuerySession;
