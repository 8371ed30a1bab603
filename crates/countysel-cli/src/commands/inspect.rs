//! Inspect command implementation

use crate::cli::InspectArgs;
use crate::commands::load_layer;
use crate::output::OutputWriter;
use crate::output_types::{FeatureInfo, InspectOutput};
use anyhow::Result;
use countysel_core::config::LayeredConfig;
use tabled::Tabled;

pub async fn execute(
    args: InspectArgs,
    config: &LayeredConfig,
    output: &OutputWriter,
) -> Result<()> {
    let loaded = load_layer(&args.layer, config).await?;
    let layer = &loaded.layer;

    let summary = InspectOutput {
        name: layer.name().to_string(),
        format: loaded.format.clone(),
        crs: layer.crs().epsg,
        crs_name: layer.crs().name.clone(),
        working_crs: config.working_crs.value,
        feature_count: layer.len(),
        bounds: layer.bounds().map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]),
        duplicate_ids: layer.duplicate_ids(),
        features: args.features.then(|| {
            layer
                .features()
                .iter()
                .enumerate()
                .map(|(position, f)| FeatureInfo {
                    position,
                    id: f.id.clone(),
                    name: f.name.clone(),
                })
                .collect()
        }),
    };

    if output.is_json() {
        return output.result(summary);
    }

    output.section("Reference Layer");
    output.kv("Name", &summary.name);
    output.kv("Format", &summary.format);
    output.kv("CRS", layer.crs());
    output.kv("Features", summary.feature_count);
    if let Some([min_x, min_y, max_x, max_y]) = summary.bounds {
        output.kv("Bounds", format!("({:.3}, {:.3}) - ({:.3}, {:.3})", min_x, min_y, max_x, max_y));
    }

    if layer.crs().epsg != summary.working_crs {
        output.info(format!(
            "Queries reproject this layer to the working CRS EPSG:{}",
            summary.working_crs
        ));
    }
    if !summary.duplicate_ids.is_empty() {
        output.warning(format!(
            "Identifiers shared by several features: {}. Each matches once per query",
            summary.duplicate_ids.join(", ")
        ));
    }

    if let Some(features) = summary.features {
        output.section("Features");

        #[derive(Tabled)]
        struct FeatureRow {
            #[tabled(rename = "#")]
            position: usize,
            #[tabled(rename = "ID")]
            id: String,
            #[tabled(rename = "Name")]
            name: String,
        }

        output.table(
            features
                .into_iter()
                .map(|f| FeatureRow { position: f.position, id: f.id, name: f.name })
                .collect(),
        );
    }

    Ok(())
}
