//! Error types for countysel

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SelectorError {
    // Recoverable "try again" states
    #[error("No active drawing. Draw a line, area, or marker on the map first")]
    NoGeometry,

    #[error("No buffer requested. Enter a buffer distance greater than zero")]
    NoBuffer,

    // Geometry errors
    #[error("Invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    // CRS errors
    #[error("CRS mismatch: expected {expected}, found {found}")]
    CrsMismatch { expected: String, found: String },

    #[error(
        "Cannot buffer in {crs}: its coordinates are in degrees. \
         Reproject to a projected CRS first"
    )]
    UnprojectedCrs { crs: String },

    #[error("Unknown CRS EPSG:{epsg}. Declare its linear units in the configuration")]
    UnknownCrs { epsg: u32 },

    #[error("Projection from {from} to {to} failed: {reason}")]
    Projection { from: String, to: String, reason: String },

    // Index errors
    #[error("Spatial index covers {indexed} features but the layer has {layer}. Rebuild the index")]
    StaleIndex { indexed: usize, layer: usize },

    // Join errors
    #[error("Invalid join key '{key}': {reason}")]
    KeyFormat { key: String, reason: String },

    #[error("Table has no column named '{column}'")]
    MissingColumn { column: String },

    // Format errors
    #[error("{format} error: {message}")]
    FormatError { format: String, message: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SelectorError {
    /// Whether this error is a user-facing "nothing to do yet" state rather
    /// than a failure to evaluate the query.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SelectorError::NoGeometry | SelectorError::NoBuffer)
    }

    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        SelectorError::InvalidGeometry { reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, SelectorError>;
