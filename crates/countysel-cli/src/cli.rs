use clap::{Args, Parser, Subcommand};
use countysel_core::config::{parse_distance_unit, parse_epsg};
use countysel_core::models::DistanceUnit;
use std::path::PathBuf;

/// countysel - select the counties a buffered drawing touches
#[derive(Parser, Debug)]
#[command(name = "countysel")]
#[command(
    about = "Buffer a drawn line or area and select the reference polygons it touches",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./countysel.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Buffer drawings, match reference features and join a table
    Query(QueryArgs),

    /// Summarize a reference layer
    Inspect(InspectArgs),

    /// Show the effective configuration and where each value came from
    Config,
}

/// Where the reference layer comes from and how its features are keyed
#[derive(Args, Debug, Clone)]
pub struct LayerArgs {
    /// Reference layer (GeoJSON or Shapefile)
    #[arg(long, short = 'l', value_name = "PATH")]
    pub layer: PathBuf,

    /// Property holding the feature identifier
    #[arg(long, value_name = "FIELD")]
    pub id_field: Option<String>,

    /// Property holding the feature display name
    #[arg(long, value_name = "FIELD")]
    pub name_field: Option<String>,
}

#[derive(Parser, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub layer: LayerArgs,

    /// GeoJSON drawing export; every shape runs as one interaction, in order
    #[arg(long, short = 'd', value_name = "PATH")]
    pub drawing: Option<PathBuf>,

    /// Buffer distance (absent or zero means no buffer)
    #[arg(long, value_name = "DISTANCE")]
    pub distance: Option<f64>,

    /// Unit of the buffer distance (m, km, mi, ft, ftus)
    #[arg(long, short = 'u', value_parser = parse_unit_arg)]
    pub unit: Option<DistanceUnit>,

    /// Working CRS the layer is normalized into (e.g. 5070 or EPSG:5070)
    #[arg(long, value_parser = parse_epsg_arg)]
    pub crs: Option<u32>,

    /// Attribute table (CSV) to join against the matches
    #[arg(long, short = 't', value_name = "PATH")]
    pub table: Option<PathBuf>,

    /// Identifier column in the attribute table
    #[arg(long, value_name = "COLUMN")]
    pub key_field: Option<String>,

    /// Write the export of the last interaction as CSV
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the accumulated overlays as GeoJSON
    #[arg(long, value_name = "PATH")]
    pub overlays: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub layer: LayerArgs,

    /// List every feature
    #[arg(long)]
    pub features: bool,
}

fn parse_unit_arg(s: &str) -> Result<DistanceUnit, String> {
    parse_distance_unit(s).map_err(|e| e.to_string())
}

fn parse_epsg_arg(s: &str) -> Result<u32, String> {
    parse_epsg(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_args() {
        let cli = Cli::parse_from([
            "countysel", "query", "--layer", "counties.geojson", "--distance", "1.5", "--unit",
            "km", "--crs", "EPSG:3857", "--json",
        ]);
        assert!(cli.json);
        let Commands::Query(args) = cli.command else {
            panic!("expected query");
        };
        assert_eq!(args.distance, Some(1.5));
        assert_eq!(args.unit, Some(DistanceUnit::Kilometers));
        assert_eq!(args.crs, Some(3857));
        assert!(args.drawing.is_none());
    }

    #[test]
    fn test_bad_unit_is_rejected() {
        let args = ["countysel", "query", "--layer", "a.geojson", "--unit", "parsecs"];
        let result = Cli::try_parse_from(args);
        assert!(result.is_err());
    }
}
