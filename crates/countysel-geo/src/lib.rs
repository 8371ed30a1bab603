//! countysel geo - Geometry normalization and spatial matching
//!
//! This crate turns a user drawing plus a buffer request into a buffered
//! polygon in the reference layer's frame, and finds the reference features
//! that polygon intersects.

pub mod buffer;
pub mod index;
pub mod matcher;
pub mod models;
pub mod transform;
pub mod validation;

pub use buffer::normalize_and_buffer;
pub use index::LayerIndex;
pub use matcher::{match_features, match_features_indexed};
pub use transform::{Reproject, Reprojector};
