//! Canonical geometry and reference-frame types used across all countysel crates.
//!
//! Every geometry value carries the [`Crs`] it is expressed in. Binary
//! operations compare frames before touching coordinates.

use geo::{Area, BoundingRect, MultiPolygon, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metres in one international mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// Metres in one international foot.
pub const METERS_PER_FOOT: f64 = 0.3048;

/// Metres in one US survey foot (used by most US State Plane zones).
pub const METERS_PER_US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

/// Linear units of a coordinate reference system's axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrsUnits {
    /// Geographic longitude/latitude. Not usable for metric buffering.
    Degrees,
    Meters,
    Feet,
    UsSurveyFeet,
}

impl CrsUnits {
    /// The distance unit one coordinate step represents, or `None` for
    /// angular (geographic) frames.
    pub fn linear_unit(&self) -> Option<DistanceUnit> {
        match self {
            CrsUnits::Degrees => None,
            CrsUnits::Meters => Some(DistanceUnit::Meters),
            CrsUnits::Feet => Some(DistanceUnit::Feet),
            CrsUnits::UsSurveyFeet => Some(DistanceUnit::UsSurveyFeet),
        }
    }
}

/// Coordinate Reference System identified by EPSG code
///
/// Two values are the same frame when their EPSG codes match; the name is
/// informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crs {
    pub epsg: u32,
    pub name: String,
    pub units: CrsUnits,
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.epsg == other.epsg
    }
}

impl Eq for Crs {}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{} ({})", self.epsg, self.name)
    }
}

impl Crs {
    pub fn new(epsg: u32, name: impl Into<String>, units: CrsUnits) -> Self {
        Self { epsg, name: name.into(), units }
    }

    /// WGS 84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::new(4326, "WGS 84", CrsUnits::Degrees)
    }

    /// NAD83 (EPSG:4269), the frame of the Census cartographic boundary files
    pub fn nad83() -> Self {
        Self::new(4269, "NAD83", CrsUnits::Degrees)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::new(3857, "WGS 84 / Pseudo-Mercator", CrsUnits::Meters)
    }

    /// NAD83 / Conus Albers (EPSG:5070), equal-area metres over the lower 48
    pub fn conus_albers() -> Self {
        Self::new(5070, "NAD83 / Conus Albers", CrsUnits::Meters)
    }

    /// Look up a well-known EPSG code.
    pub fn from_epsg(epsg: u32) -> Option<Self> {
        let crs = match epsg {
            4326 => Self::wgs84(),
            4269 => Self::nad83(),
            4267 => Self::new(4267, "NAD27", CrsUnits::Degrees),
            3857 => Self::web_mercator(),
            5070 => Self::conus_albers(),
            2163 => Self::new(2163, "US National Atlas Equal Area", CrsUnits::Meters),
            9311 => Self::new(9311, "NAD27 / US National Atlas Equal Area", CrsUnits::Meters),
            2263 => Self::new(2263, "NAD83 / New York Long Island (ftUS)", CrsUnits::UsSurveyFeet),
            26901..=26923 => {
                Self::new(epsg, format!("NAD83 / UTM zone {}N", epsg - 26900), CrsUnits::Meters)
            }
            32601..=32660 => {
                Self::new(epsg, format!("WGS 84 / UTM zone {}N", epsg - 32600), CrsUnits::Meters)
            }
            32701..=32760 => {
                Self::new(epsg, format!("WGS 84 / UTM zone {}S", epsg - 32700), CrsUnits::Meters)
            }
            _ => return None,
        };
        Some(crs)
    }

    pub fn is_geographic(&self) -> bool {
        self.units == CrsUnits::Degrees
    }
}

/// Distance units for buffer requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    #[default]
    Miles,
    Feet,
    UsSurveyFeet,
}

impl DistanceUnit {
    /// Length of one unit in metres
    pub fn meters_per_unit(&self) -> f64 {
        match self {
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => 1000.0,
            DistanceUnit::Miles => METERS_PER_MILE,
            DistanceUnit::Feet => METERS_PER_FOOT,
            DistanceUnit::UsSurveyFeet => METERS_PER_US_SURVEY_FOOT,
        }
    }

    /// Convert a distance value to meters
    pub fn to_meters(&self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }

    /// Convert a distance value from meters to this unit
    pub fn from_meters(&self, meters: f64) -> f64 {
        meters / self.meters_per_unit()
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
            DistanceUnit::Feet => "ft",
            DistanceUnit::UsSurveyFeet => "ftUS",
        };
        f.write_str(label)
    }
}

/// Convert a distance between two units.
///
/// This is the only unit conversion path in the workspace; every buffer
/// distance goes through it.
pub fn convert_distance(value: f64, from: DistanceUnit, to: DistanceUnit) -> f64 {
    if from == to {
        return value;
    }
    to.from_meters(from.to_meters(value))
}

/// Kind of shape produced by the drawing tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Point,
    Line,
    Polygon,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShapeKind::Point => "point",
            ShapeKind::Line => "line",
            ShapeKind::Polygon => "polygon",
        };
        f.write_str(label)
    }
}

/// A user-drawn shape as `(x, y)` coordinate pairs in its declared frame.
///
/// For polygons, `coordinates` is the exterior ring; closing the ring is
/// optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGeometry {
    pub kind: ShapeKind,
    pub coordinates: Vec<[f64; 2]>,
    pub crs: Crs,
}

impl UserGeometry {
    pub fn new(kind: ShapeKind, coordinates: Vec<[f64; 2]>, crs: Crs) -> Self {
        Self { kind, coordinates, crs }
    }

    pub fn point(x: f64, y: f64, crs: Crs) -> Self {
        Self::new(ShapeKind::Point, vec![[x, y]], crs)
    }

    pub fn line(coordinates: Vec<[f64; 2]>, crs: Crs) -> Self {
        Self::new(ShapeKind::Line, coordinates, crs)
    }

    pub fn polygon(coordinates: Vec<[f64; 2]>, crs: Crs) -> Self {
        Self::new(ShapeKind::Polygon, coordinates, crs)
    }
}

/// The drawing collaborator's current state: either a most-recent shape, or
/// nothing drawn yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Drawing {
    #[default]
    Absent,
    Present(UserGeometry),
}

impl Drawing {
    pub fn is_present(&self) -> bool {
        matches!(self, Drawing::Present(_))
    }

    pub fn geometry(&self) -> Option<&UserGeometry> {
        match self {
            Drawing::Present(geometry) => Some(geometry),
            Drawing::Absent => None,
        }
    }
}

impl From<Option<UserGeometry>> for Drawing {
    fn from(value: Option<UserGeometry>) -> Self {
        match value {
            Some(geometry) => Drawing::Present(geometry),
            None => Drawing::Absent,
        }
    }
}

impl From<UserGeometry> for Drawing {
    fn from(value: UserGeometry) -> Self {
        Drawing::Present(value)
    }
}

/// A buffer request: how far to expand the drawing, and in which frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferSpec {
    pub distance: f64,
    pub unit: DistanceUnit,
    pub target_crs: Crs,
}

impl BufferSpec {
    pub fn new(distance: f64, unit: DistanceUnit, target_crs: Crs) -> Self {
        Self { distance, unit, target_crs }
    }

    /// Build a spec from optional user input. A missing distance is treated
    /// the same as zero: no buffer requested.
    pub fn from_input(distance: Option<f64>, unit: DistanceUnit, target_crs: Crs) -> Self {
        Self::new(distance.unwrap_or(0.0), unit, target_crs)
    }

    /// True when a positive, finite distance was supplied
    pub fn is_requested(&self) -> bool {
        self.distance.is_finite() && self.distance > 0.0
    }
}

/// The planar buffer of a user geometry, in the frame it was computed in.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedGeometry {
    pub polygon: MultiPolygon<f64>,
    pub crs: Crs,
    /// Buffer radius in the linear unit of `crs`
    pub radius: f64,
    pub source_kind: ShapeKind,
}

impl BufferedGeometry {
    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.polygon.bounding_rect()
    }
}
