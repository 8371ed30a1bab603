use countysel_core::config::ConfigSource;
use countysel_query::{OverlaySummary, QueryStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Output for query command
#[derive(Debug, Serialize)]
pub struct QueryOutput {
    pub layer: String,
    pub working_crs: u32,
    pub distance: Option<f64>,
    pub unit: String,
    pub runs: Vec<QueryRunOutput>,
    pub overlays: Vec<OverlaySummary>,
    pub export_path: Option<String>,
    pub overlays_path: Option<String>,
}

/// One interaction of a query session
#[derive(Debug, Serialize)]
pub struct QueryRunOutput {
    pub drawing: usize,
    pub shape: Option<String>,
    pub outcome: QueryStatus,
    pub message: String,
    pub matched: Vec<MatchedItem>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct MatchedItem {
    pub id: String,
    pub name: String,
}

/// Output for inspect command
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub name: String,
    pub format: String,
    pub crs: u32,
    pub crs_name: String,
    pub working_crs: u32,
    pub feature_count: usize,
    /// `[min_x, min_y, max_x, max_y]` in the layer's own CRS
    pub bounds: Option<[f64; 4]>,
    pub duplicate_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<FeatureInfo>>,
}

#[derive(Debug, Serialize)]
pub struct FeatureInfo {
    pub position: usize,
    pub id: String,
    pub name: String,
}

/// Output for config command
#[derive(Debug, Serialize)]
pub struct InspectConfigOutput {
    pub config_file: Option<String>,
    pub values: BTreeMap<String, ConfigValue<String>>,
}

#[derive(Debug, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}
