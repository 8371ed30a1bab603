use crate::error::{Result, SelectorError};
use crate::formats::LayerFields;
use crate::models::{Crs, CrsUnits, DistanceUnit, KeyFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for the county selector
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Projected CRS the reference layer is normalized into at load
    pub working_crs: ConfigValue<u32>,
    /// Linear units for a working CRS outside the built-in table
    pub crs_units: ConfigValue<Option<CrsUnits>>,
    pub distance_unit: ConfigValue<DistanceUnit>,
    pub id_field: ConfigValue<String>,
    pub name_field: ConfigValue<String>,
    /// Identifier column in uploaded tables
    pub key_field: ConfigValue<String>,
    pub key_width: ConfigValue<usize>,
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            working_crs: ConfigValue::new(5070, ConfigSource::Default),
            crs_units: ConfigValue::new(None, ConfigSource::Default),
            distance_unit: ConfigValue::new(DistanceUnit::Miles, ConfigSource::Default),
            id_field: ConfigValue::new("GEOID".to_string(), ConfigSource::Default),
            name_field: ConfigValue::new("NAME".to_string(), ConfigSource::Default),
            key_field: ConfigValue::new("FIPS".to_string(), ConfigSource::Default),
            key_width: ConfigValue::new(5, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| SelectorError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| SelectorError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(crs) = file_config.working_crs {
            self.working_crs.update(crs, ConfigSource::File);
        }

        if let Some(units) = file_config.crs_units {
            self.crs_units.update(Some(units), ConfigSource::File);
        }

        if let Some(distance_unit) = file_config.distance_unit {
            self.distance_unit.update(distance_unit, ConfigSource::File);
        }

        if let Some(id_field) = file_config.id_field {
            self.id_field.update(non_empty("id_field", id_field)?, ConfigSource::File);
        }

        if let Some(name_field) = file_config.name_field {
            self.name_field.update(non_empty("name_field", name_field)?, ConfigSource::File);
        }

        if let Some(key_field) = file_config.key_field {
            self.key_field.update(non_empty("key_field", key_field)?, ConfigSource::File);
        }

        if let Some(key_width) = file_config.key_width {
            self.key_width.update(parse_key_width(&key_width.to_string())?, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // COUNTYSEL_CRS
        if let Ok(crs_str) = env::var("COUNTYSEL_CRS") {
            match parse_epsg(&crs_str) {
                Ok(crs) => self.working_crs.update(crs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid COUNTYSEL_CRS value '{}': expected EPSG code such as 5070",
                    crs_str
                ),
            }
        }

        // COUNTYSEL_CRS_UNITS
        if let Ok(units_str) = env::var("COUNTYSEL_CRS_UNITS") {
            match parse_crs_units(&units_str) {
                Ok(units) => self.crs_units.update(Some(units), ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid COUNTYSEL_CRS_UNITS value '{}': \
                     expected degrees, meters, feet, or ftus",
                    units_str
                ),
            }
        }

        // COUNTYSEL_DISTANCE_UNIT
        if let Ok(unit_str) = env::var("COUNTYSEL_DISTANCE_UNIT") {
            match parse_distance_unit(&unit_str) {
                Ok(unit) => self.distance_unit.update(unit, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid COUNTYSEL_DISTANCE_UNIT value '{}': \
                     expected meters, kilometers, miles, feet, or ftus",
                    unit_str
                ),
            }
        }

        for (var, field) in [
            ("COUNTYSEL_ID_FIELD", &mut self.id_field),
            ("COUNTYSEL_NAME_FIELD", &mut self.name_field),
            ("COUNTYSEL_KEY_FIELD", &mut self.key_field),
        ] {
            if let Ok(value) = env::var(var) {
                match non_empty(var, value) {
                    Ok(value) => field.update(value, ConfigSource::Environment),
                    Err(_) => tracing::warn!("Ignoring empty {}", var),
                }
            }
        }

        // COUNTYSEL_KEY_WIDTH
        if let Ok(width_str) = env::var("COUNTYSEL_KEY_WIDTH") {
            match parse_key_width(&width_str) {
                Ok(width) => self.key_width.update(width, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid COUNTYSEL_KEY_WIDTH value '{}': expected a width between 1 and 18",
                    width_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(crs) = overrides.working_crs {
            self.working_crs.update(crs, ConfigSource::Cli);
        }

        if let Some(distance_unit) = overrides.distance_unit {
            self.distance_unit.update(distance_unit, ConfigSource::Cli);
        }

        if let Some(id_field) = overrides.id_field {
            self.id_field.update(id_field, ConfigSource::Cli);
        }

        if let Some(name_field) = overrides.name_field {
            self.name_field.update(name_field, ConfigSource::Cli);
        }

        if let Some(key_field) = overrides.key_field {
            self.key_field.update(key_field, ConfigSource::Cli);
        }
    }

    /// The working CRS, resolved against the built-in table or the declared units
    pub fn working_crs(&self) -> Result<Crs> {
        let epsg = self.working_crs.value;
        match (self.crs_units.value, Crs::from_epsg(epsg)) {
            (Some(units), known) => {
                let name = known.map(|crs| crs.name).unwrap_or_else(|| format!("EPSG:{}", epsg));
                Ok(Crs::new(epsg, name, units))
            }
            (None, Some(crs)) => Ok(crs),
            (None, None) => Err(SelectorError::UnknownCrs { epsg }),
        }
    }

    /// Reference-layer property names
    pub fn layer_fields(&self) -> LayerFields {
        LayerFields {
            id_field: self.id_field.value.clone(),
            name_field: self.name_field.value.clone(),
        }
    }

    /// Join key shape; the region prefix stays two digits (the state code)
    pub fn key_format(&self) -> KeyFormat {
        KeyFormat::new(self.key_width.value, 2)
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "working_crs".to_string(),
            (format!("EPSG:{}", self.working_crs.value), self.working_crs.source),
        );

        if let Some(units) = self.crs_units.value {
            map.insert("crs_units".to_string(), (format!("{:?}", units), self.crs_units.source));
        }

        map.insert(
            "distance_unit".to_string(),
            (format!("{:?}", self.distance_unit.value), self.distance_unit.source),
        );

        for (key, field) in [
            ("id_field", &self.id_field),
            ("name_field", &self.name_field),
            ("key_field", &self.key_field),
        ] {
            map.insert(key.to_string(), (field.value.clone(), field.source));
        }

        map.insert(
            "key_width".to_string(),
            (self.key_width.value.to_string(), self.key_width.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    working_crs: Option<u32>,
    crs_units: Option<CrsUnits>,
    distance_unit: Option<DistanceUnit>,
    id_field: Option<String>,
    name_field: Option<String>,
    key_field: Option<String>,
    key_width: Option<u32>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub working_crs: Option<u32>,
    pub distance_unit: Option<DistanceUnit>,
    pub id_field: Option<String>,
    pub name_field: Option<String>,
    pub key_field: Option<String>,
}

/// Parse an EPSG code written as `5070` or `EPSG:5070`
pub fn parse_epsg(s: &str) -> Result<u32> {
    let trimmed = s.trim();
    let code = trimmed
        .strip_prefix("EPSG:")
        .or_else(|| trimmed.strip_prefix("epsg:"))
        .unwrap_or(trimmed);
    code.parse::<u32>().map_err(|_| SelectorError::ConfigInvalid {
        key: "working_crs".to_string(),
        reason: format!("Invalid EPSG code: {}", s),
    })
}

/// Parse distance unit from string
pub fn parse_distance_unit(s: &str) -> Result<DistanceUnit> {
    match s.to_lowercase().as_str() {
        "meters" | "metres" | "m" => Ok(DistanceUnit::Meters),
        "kilometers" | "kilometres" | "km" => Ok(DistanceUnit::Kilometers),
        "miles" | "mi" => Ok(DistanceUnit::Miles),
        "feet" | "ft" => Ok(DistanceUnit::Feet),
        "ussurveyfeet" | "us-ft" | "ftus" => Ok(DistanceUnit::UsSurveyFeet),
        _ => Err(SelectorError::ConfigInvalid {
            key: "distance_unit".to_string(),
            reason: format!(
                "Invalid distance unit: {}. Use meters, kilometers, miles, feet, or ftus",
                s
            ),
        }),
    }
}

/// Parse CRS linear units from string
pub fn parse_crs_units(s: &str) -> Result<CrsUnits> {
    match s.to_lowercase().as_str() {
        "degrees" | "deg" => Ok(CrsUnits::Degrees),
        "meters" | "metres" | "m" => Ok(CrsUnits::Meters),
        "feet" | "ft" => Ok(CrsUnits::Feet),
        "ussurveyfeet" | "us-ft" | "ftus" => Ok(CrsUnits::UsSurveyFeet),
        _ => Err(SelectorError::ConfigInvalid {
            key: "crs_units".to_string(),
            reason: format!("Invalid CRS units: {}. Use degrees, meters, feet, or ftus", s),
        }),
    }
}

fn parse_key_width(s: &str) -> Result<usize> {
    // u64 holds 19 digits, so keys up to 18 wide survive numeric cells
    match s.trim().parse::<usize>() {
        Ok(width) if (1..=18).contains(&width) => Ok(width),
        _ => Err(SelectorError::ConfigInvalid {
            key: "key_width".to_string(),
            reason: format!("Invalid key width: {}. Use a width between 1 and 18", s),
        }),
    }
}

fn non_empty(key: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(SelectorError::ConfigInvalid {
            key: key.to_string(),
            reason: "value must not be empty".to_string(),
        });
    }
    Ok(value)
}
