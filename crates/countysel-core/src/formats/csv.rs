//! CSV reading of attribute tables and writing of export records

use std::io::{Read, Write};
use std::path::Path;

use crate::error::{Result, SelectorError};
use crate::models::{AttributeTable, ExportRecord};

const FORMAT: &str = "CSV";

fn csv_error(e: ::csv::Error) -> SelectorError {
    SelectorError::FormatError { format: FORMAT.to_string(), message: e.to_string() }
}

/// Read an attribute table. The first record is the header row; headers and
/// cells are kept verbatim apart from surrounding whitespace.
pub fn read_attribute_table<R: Read>(reader: R) -> Result<AttributeTable> {
    let mut reader =
        ::csv::ReaderBuilder::new().has_headers(true).trim(::csv::Trim::All).from_reader(reader);

    let columns: Vec<String> =
        reader.headers().map_err(csv_error)?.iter().map(String::from).collect();

    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(String::from).collect::<Vec<_>>()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(csv_error)?;

    let table = AttributeTable::new(columns, rows)?;
    tracing::debug!(
        "Read attribute table with {} rows and {} columns",
        table.len(),
        table.columns().len()
    );
    Ok(table)
}

/// Read an attribute table from a file
pub fn read_attribute_table_path(path: &Path) -> Result<AttributeTable> {
    let file = std::fs::File::open(path)?;
    read_attribute_table(file)
}

/// Write an export record as CSV, header first
pub fn write_export<W: Write>(record: &ExportRecord, writer: W) -> Result<()> {
    let mut writer = ::csv::Writer::from_writer(writer);
    writer.write_record(&record.columns).map_err(csv_error)?;
    for row in &record.rows {
        writer.write_record(row).map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Render an export record as a CSV string
pub fn export_to_csv(record: &ExportRecord) -> Result<String> {
    let mut buffer = Vec::new();
    write_export(record, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| SelectorError::Serialization(e.to_string()))
}
