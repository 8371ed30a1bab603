//! Config command implementation

use crate::config_loader::config_path;
use crate::output::OutputWriter;
use crate::output_types::{ConfigValue, InspectConfigOutput};
use anyhow::Result;
use countysel_core::config::LayeredConfig;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::Tabled;

pub fn execute(
    explicit: Option<&Path>,
    config: &LayeredConfig,
    output: &OutputWriter,
) -> Result<()> {
    let config_file = config_path(explicit).map(|p| p.display().to_string());
    let values: BTreeMap<String, ConfigValue<String>> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| (key, ConfigValue { value, source }))
        .collect();

    if output.is_json() {
        return output.result(InspectConfigOutput { config_file, values });
    }

    output.section("Configuration");
    output.kv("Config file", config_file.as_deref().unwrap_or("(none)"));

    #[derive(Tabled)]
    struct ConfigRow {
        #[tabled(rename = "Key")]
        key: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    let rows: Vec<ConfigRow> = values
        .into_iter()
        .map(|(key, entry)| ConfigRow {
            key,
            value: entry.value,
            source: format!("{:?}", entry.source),
        })
        .collect();
    output.table(rows);

    if let Err(e) = config.working_crs() {
        output.warning(e);
    }

    Ok(())
}
