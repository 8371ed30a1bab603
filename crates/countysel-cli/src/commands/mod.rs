//! Command implementations

mod config;
mod inspect;
mod query;

use crate::cli::{Cli, Commands, LayerArgs};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use countysel_core::config::{CliConfigOverrides, LayeredConfig};
use countysel_core::formats::{build_reference_layer, FormatRegistry};
use countysel_core::models::ReferenceLayer;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config_file = cli.config.as_deref();

    match cli.command {
        Commands::Query(args) => {
            let overrides = CliConfigOverrides {
                working_crs: args.crs,
                distance_unit: args.unit,
                id_field: args.layer.id_field.clone(),
                name_field: args.layer.name_field.clone(),
                key_field: args.key_field.clone(),
            };
            let config = load_config(config_file, overrides)?;
            query::execute(args, &config, &output).await
        }
        Commands::Inspect(args) => {
            let config = load_config(config_file, layer_overrides(&args.layer))?;
            inspect::execute(args, &config, &output).await
        }
        Commands::Config => {
            let config = load_config(config_file, CliConfigOverrides::default())?;
            config::execute(config_file, &config, &output)
        }
    }
}

fn layer_overrides(args: &LayerArgs) -> CliConfigOverrides {
    CliConfigOverrides {
        id_field: args.id_field.clone(),
        name_field: args.name_field.clone(),
        ..Default::default()
    }
}

/// A reference layer as read from disk, before any reprojection
pub struct LoadedLayer {
    pub layer: ReferenceLayer,
    pub format: String,
}

/// Read and key a reference layer with the configured fields
pub async fn load_layer(args: &LayerArgs, config: &LayeredConfig) -> Result<LoadedLayer> {
    let registry = FormatRegistry::with_defaults();
    let dataset = registry
        .read(&args.layer)
        .await
        .with_context(|| format!("Failed to read reference layer {}", args.layer.display()))?;
    let format = dataset.format_name.clone();

    let layer = build_reference_layer(dataset, &config.layer_fields(), &config.key_format())
        .with_context(|| format!("Failed to build reference layer from {}", args.layer.display()))?;

    Ok(LoadedLayer { layer, format })
}
