use crate::models::{ShapeKind, UserGeometry};
use countysel_core::error::{Result, SelectorError};
use geo::{Coord, LineString, Polygon, Validation};
use geo::algorithm::validation::InvalidPolygon;

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    /// Convert to a `Result`, reporting the first error as `InvalidGeometry`
    pub fn into_result(self) -> Result<()> {
        match self.errors.into_iter().next() {
            None => Ok(()),
            Some(error) => Err(SelectorError::invalid_geometry(format!(
                "{}: {}",
                error.location, error.reason
            ))),
        }
    }
}

/// Validate a user drawing before it is buffered.
///
/// A point needs exactly one coordinate, a line two distinct coordinates,
/// and a polygon three distinct vertices with a boundary that does not
/// cross itself. Every ordinate must be finite.
pub fn validate_user_geometry(geometry: &UserGeometry) -> ValidationResult {
    let mut result = ValidationResult::valid();
    let location = geometry.kind.to_string();

    let mut finite = true;
    for (i, [x, y]) in geometry.coordinates.iter().enumerate() {
        if !x.is_finite() || !y.is_finite() {
            finite = false;
            result.add_error(
                format!("{}[{}]", location, i),
                "Coordinates must be finite".to_string(),
            );
        }
    }

    let count = geometry.coordinates.len();
    let distinct = distinct_count(&geometry.coordinates);

    match geometry.kind {
        ShapeKind::Point if count != 1 => {
            result.add_error(
                location,
                format!("Point must have exactly 1 coordinate, found {}", count),
            );
        }
        ShapeKind::Line if count < 2 => {
            result.add_error(
                location,
                format!("Line must have at least 2 coordinates, found {}", count),
            );
        }
        ShapeKind::Line if distinct < 2 => {
            result.add_error(
                location,
                "Line must have at least 2 distinct coordinates".to_string(),
            );
        }
        ShapeKind::Polygon if distinct < 3 => {
            result.add_error(
                location,
                format!("Polygon must have at least 3 distinct vertices, found {}", distinct),
            );
        }
        ShapeKind::Polygon if finite && ring_crosses_itself(&geometry.coordinates) => {
            result.add_error(
                location,
                "Polygon boundary crosses itself; redraw it without overlapping edges".to_string(),
            );
        }
        _ => {}
    }

    result
}

/// Validate and fail with `InvalidGeometry` on the first problem
pub fn ensure_valid(geometry: &UserGeometry) -> Result<()> {
    validate_user_geometry(geometry).into_result()
}

/// Close the ring, drop repeated consecutive vertices and ask `geo` whether
/// any two non-adjacent edges meet.
fn ring_crosses_itself(coordinates: &[[f64; 2]]) -> bool {
    let mut ring: Vec<Coord<f64>> = Vec::with_capacity(coordinates.len() + 1);
    for [x, y] in coordinates {
        let coord = Coord { x: *x, y: *y };
        if ring.last() != Some(&coord) {
            ring.push(coord);
        }
    }
    if let Some(first) = ring.first().copied() {
        if ring.last() != Some(&first) {
            ring.push(first);
        }
    }

    Polygon::new(LineString::new(ring), vec![])
        .validation_errors()
        .iter()
        .any(|error| matches!(error, InvalidPolygon::SelfIntersection(_)))
}

fn distinct_count(coordinates: &[[f64; 2]]) -> usize {
    let mut seen: Vec<[f64; 2]> = Vec::with_capacity(coordinates.len());
    for coordinate in coordinates {
        if !seen.contains(coordinate) {
            seen.push(*coordinate);
        }
    }
    seen.len()
}
