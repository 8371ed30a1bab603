pub mod geometry;
pub mod layer;
pub mod table;

pub use geometry::{
    convert_distance, BufferSpec, BufferedGeometry, Crs, CrsUnits, DistanceUnit, Drawing,
    ShapeKind, UserGeometry, METERS_PER_FOOT, METERS_PER_MILE, METERS_PER_US_SURVEY_FOOT,
};
pub use layer::{MatchResult, MatchedFeature, ReferenceFeature, ReferenceLayer};
pub use table::{AttributeTable, ExportRecord, JoinKey, KeyFormat, EXPORT_COLUMNS};
