//! Query command implementation
//!
//! Loads the reference layer once, normalizes it into the working CRS, and
//! runs every shape of the drawing file as one interaction of a single
//! session, so overlays accumulate the way they would on a map.

use crate::cli::QueryArgs;
use crate::commands::load_layer;
use crate::output::OutputWriter;
use crate::output_types::{MatchedItem, QueryOutput, QueryRunOutput};
use anyhow::{Context, Result};
use countysel_core::config::LayeredConfig;
use countysel_core::formats::csv::{read_attribute_table_path, write_export};
use countysel_core::formats::geojson::parse_drawings;
use countysel_core::models::{BufferSpec, Drawing, ExportRecord, ReferenceLayer};
use countysel_geo::Reproject;
use countysel_query::{QueryOutcome, QuerySession, QueryStatus};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tabled::Tabled;

pub async fn execute(args: QueryArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let working_crs = config.working_crs()?;
    let loaded = load_layer(&args.layer, config).await?;
    let layer = loaded
        .layer
        .reproject_to(&working_crs)
        .with_context(|| {
            format!("Failed to normalize {} into {}", loaded.layer.name(), working_crs)
        })?;

    let drawings = match &args.drawing {
        Some(path) => read_drawings(path)?,
        None => vec![Drawing::Absent],
    };

    let table = args
        .table
        .as_deref()
        .map(|path| {
            read_attribute_table_path(path)
                .with_context(|| format!("Failed to read attribute table {}", path.display()))
        })
        .transpose()?;

    let unit = config.distance_unit.value;
    let spec = BufferSpec::from_input(args.distance, unit, working_crs.clone());
    let mut session =
        QuerySession::new(layer, config.key_field.value.clone(), config.key_format());

    let mut runs = Vec::with_capacity(drawings.len());
    let mut last_record = ExportRecord::empty();
    for (index, drawing) in drawings.iter().enumerate() {
        let outcome = session
            .run_query(drawing, &spec, table.as_ref())
            .with_context(|| format!("Query for drawing {} failed", index + 1))?;
        runs.push(run_output(index + 1, drawing, &outcome, session.layer()));
        last_record = outcome.record;
    }

    if let Some(path) = &args.output {
        write_record(path, &last_record)?;
    }
    if let Some(path) = &args.overlays {
        let collection = session.overlays().to_geojson();
        fs::write(path, serde_json::to_string_pretty(&collection)?)
            .with_context(|| format!("Failed to write overlays to {}", path.display()))?;
    }

    let result = QueryOutput {
        layer: session.layer().name().to_string(),
        working_crs: working_crs.epsg,
        distance: args.distance,
        unit: unit.to_string(),
        runs,
        overlays: session.overlays().summaries(),
        export_path: args.output.as_ref().map(|p| p.display().to_string()),
        overlays_path: args.overlays.as_ref().map(|p| p.display().to_string()),
    };

    if output.is_json() {
        return output.result(result);
    }

    output.section("Query");
    output.kv(
        "Layer",
        format!("{} ({}, {} features)", result.layer, loaded.format, session.layer().len()),
    );
    output.kv("Working CRS", &working_crs);
    match result.distance {
        Some(distance) => output.kv("Buffer", format!("{} {}", distance, result.unit)),
        None => output.kv("Buffer", "(none)"),
    }

    for run in &result.runs {
        let shape = run.shape.as_deref().unwrap_or("no drawing");
        output.section(format!("Drawing {} ({})", run.drawing, shape));
        match run.outcome {
            QueryStatus::NoGeometry | QueryStatus::NoBuffer => output.info(&run.message),
            QueryStatus::EmptyMatch => output.warning(&run.message),
            QueryStatus::Matched(_) => {
                output.success(&run.message);
                output.records(&run.columns, &run.rows);
            }
        }
    }

    if !result.overlays.is_empty() {
        output.section("Overlays");

        #[derive(Tabled)]
        struct OverlayRow {
            #[tabled(rename = "#")]
            order: usize,
            #[tabled(rename = "Kind")]
            kind: String,
            #[tabled(rename = "Detail")]
            detail: String,
        }

        output.table(
            result
                .overlays
                .iter()
                .map(|o| OverlayRow {
                    order: o.order,
                    kind: o.kind.clone(),
                    detail: o.detail.clone(),
                })
                .collect(),
        );
    }

    if let Some(path) = &result.export_path {
        output.success(format!("Wrote {} export rows to {}", last_record.len(), path));
    }
    if let Some(path) = &result.overlays_path {
        output.success(format!("Wrote {} overlays to {}", result.overlays.len(), path));
    }

    Ok(())
}

/// Every shape in a drawing export; an export with none is one empty drawing
fn read_drawings(path: &Path) -> Result<Vec<Drawing>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read drawing file {}", path.display()))?;
    let shapes = parse_drawings(&content)
        .with_context(|| format!("Failed to parse drawing file {}", path.display()))?;

    if shapes.is_empty() {
        tracing::debug!("{} holds no shapes", path.display());
        return Ok(vec![Drawing::Absent]);
    }
    Ok(shapes.into_iter().map(Drawing::from).collect())
}

fn write_record(path: &Path, record: &ExportRecord) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create export file {}", path.display()))?;
    write_export(record, BufWriter::new(file))
        .with_context(|| format!("Failed to write export to {}", path.display()))?;
    Ok(())
}

fn run_output(
    index: usize,
    drawing: &Drawing,
    outcome: &QueryOutcome,
    layer: &ReferenceLayer,
) -> QueryRunOutput {
    let matched = outcome
        .matches
        .features
        .iter()
        .filter_map(|m| layer.get(m.position))
        .map(|f| MatchedItem { id: f.id.clone(), name: f.name.clone() })
        .collect();

    QueryRunOutput {
        drawing: index,
        shape: drawing.geometry().map(|g| g.kind.to_string()),
        outcome: outcome.status,
        message: outcome.status.message(),
        matched,
        columns: outcome.record.columns.clone(),
        rows: outcome.record.rows.clone(),
    }
}
