//! Pre-read checks shared by the format readers

use crate::error::{Result, SelectorError};
use crate::formats::FormatValidation;
use std::path::Path;

pub struct FormatValidator;

impl FormatValidator {
    /// The file must exist and be a regular file
    pub fn require_file(path: &Path) -> FormatValidation {
        let mut validation = FormatValidation::default();

        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => validation.errors.push(format!("Not a file: {}", path.display())),
            Err(_) if !path.exists() => {
                validation.errors.push(format!("File not found: {}", path.display()))
            }
            Err(e) => validation.errors.push(format!("Cannot access file: {}", e)),
        }

        validation
    }

    /// Sibling files of a multi-file layer. A missing `.prj` only warns,
    /// since the reader falls back to geographic coordinates.
    pub fn require_components(
        base_path: &Path,
        required: &[&str],
        optional: &[&str],
    ) -> FormatValidation {
        let mut validation = FormatValidation::default();

        for ext in required {
            let component = base_path.with_extension(ext);
            if !component.exists() {
                validation.errors.push(format!("Missing required file: {}", component.display()));
            }
        }

        for ext in optional {
            let component = base_path.with_extension(ext);
            if !component.exists() {
                validation.warnings.push(format!(
                    "{} not found; coordinates will be read as EPSG:4326",
                    component.display()
                ));
            }
        }

        validation
    }

    /// The file must be a JSON object with a `type` member. A collection
    /// without a `crs` member or without features only warns.
    pub fn check_geojson_document(path: &Path) -> FormatValidation {
        let mut validation = FormatValidation::default();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                validation.errors.push(format!("Cannot read file: {}", e));
                return validation;
            }
        };

        let document = match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(document) => document,
            Err(e) => {
                validation.errors.push(format!("Invalid JSON structure: {}", e));
                return validation;
            }
        };

        match document.get("type").and_then(|t| t.as_str()) {
            Some("FeatureCollection") => {
                if document.get("crs").is_none() {
                    validation.warnings.push(format!(
                        "{} declares no crs; coordinates will be read as EPSG:4326",
                        path.display()
                    ));
                }
                let empty = document
                    .get("features")
                    .and_then(|f| f.as_array())
                    .map_or(true, |f| f.is_empty());
                if empty {
                    validation.warnings.push(format!("{} holds no features", path.display()));
                }
            }
            Some(_) => {}
            None => validation.errors.push("Not a GeoJSON object: missing \"type\"".to_string()),
        }

        validation
    }

    /// Fold several check results into one
    pub fn merge(validations: impl IntoIterator<Item = FormatValidation>) -> FormatValidation {
        validations.into_iter().fold(FormatValidation::default(), |mut merged, v| {
            merged.errors.extend(v.errors);
            merged.warnings.extend(v.warnings);
            merged
        })
    }

    /// Errors become a `FormatError` naming every problem
    pub fn validation_to_result(validation: &FormatValidation, format_name: &str) -> Result<()> {
        if validation.is_valid() {
            return Ok(());
        }
        Err(SelectorError::FormatError {
            format: format_name.to_string(),
            message: validation.errors.join("; "),
        })
    }
}
