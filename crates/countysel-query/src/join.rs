//! Attribute join between a match set and an uploaded table

use std::collections::HashMap;

use countysel_core::error::{Result, SelectorError};
use countysel_core::models::{
    AttributeTable, ExportRecord, JoinKey, KeyFormat, MatchResult, ReferenceLayer, EXPORT_COLUMNS,
};

/// Suffix for table columns whose name collides with a fixed export column
pub const COLLISION_SUFFIX: &str = "_table";

/// Project a match set into an export, optionally inner-joined with `table`.
///
/// Both the reference ids and the table's `key_field` column are normalized
/// with `key_format` before comparison, so `6037`, `06037` and `6037.0` all
/// meet. Only ids present on both sides produce rows; an id with several
/// table rows produces one export row per table row, in table order.
///
/// The export starts with `STATE CODE`, `COUNTY CODE`, `FIPS`, `COUNTY NAME`,
/// followed by every table column except the key column.
pub fn join(
    matches: &MatchResult,
    layer: &ReferenceLayer,
    table: Option<&AttributeTable>,
    key_field: &str,
    key_format: &KeyFormat,
) -> Result<ExportRecord> {
    let mut record = ExportRecord::empty();

    let matched = matches
        .features
        .iter()
        .map(|m| {
            let feature = layer.get(m.position).ok_or_else(|| SelectorError::FormatError {
                format: "Layer".to_string(),
                message: format!("match {} points past the end of {}", m.id, layer.name()),
            })?;
            Ok((key_format.normalize(&feature.id)?, feature.name.as_str()))
        })
        .collect::<Result<Vec<_>>>()?;

    let fixed = |key: &JoinKey, name: &str| -> Vec<String> {
        let (region, local) = key_format.split(key);
        vec![region.to_string(), local.to_string(), key.to_string(), name.to_string()]
    };

    let Some(table) = table else {
        record.rows = matched.iter().map(|(key, name)| fixed(key, name)).collect();
        return Ok(record);
    };

    let key_index = table.column_index(key_field)?;
    let extra: Vec<usize> = (0..table.columns().len()).filter(|i| *i != key_index).collect();

    record.columns.extend(extra.iter().map(|i| export_column_name(&table.columns()[*i])));

    let mut by_key: HashMap<JoinKey, Vec<&Vec<String>>> = HashMap::new();
    for row in table.rows() {
        by_key.entry(key_format.normalize(&row[key_index])?).or_default().push(row);
    }

    for (key, name) in &matched {
        let Some(rows) = by_key.get(key) else {
            continue;
        };
        for row in rows {
            let mut cells = fixed(key, name);
            cells.extend(extra.iter().map(|i| row[*i].clone()));
            record.rows.push(cells);
        }
    }

    tracing::debug!(
        "Joined {} matches with {} table rows into {} export rows",
        matched.len(),
        table.len(),
        record.len()
    );

    Ok(record)
}

fn export_column_name(column: &str) -> String {
    if EXPORT_COLUMNS.contains(&column) {
        format!("{}{}", column, COLLISION_SUFFIX)
    } else {
        column.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use countysel_core::models::{Crs, MatchedFeature, ReferenceFeature};
    use geo::{coord, MultiPolygon, Rect};

    fn layer() -> ReferenceLayer {
        let crs = Crs::conus_albers();
        let feature = |id: &str, name: &str, x: f64| {
            let rect = Rect::new(coord! { x: x, y: 0.0 }, coord! { x: x + 1.0, y: 1.0 });
            ReferenceFeature::new(id, name, MultiPolygon::new(vec![rect.to_polygon()]), crs.clone())
        };
        ReferenceLayer::new(
            "counties",
            crs.clone(),
            vec![feature("06037", "Los Angeles", 0.0), feature("06059", "Orange", 1.0)],
        )
        .unwrap()
    }

    fn both_matched() -> MatchResult {
        MatchResult {
            features: vec![
                MatchedFeature { id: "06037".to_string(), position: 0 },
                MatchedFeature { id: "06059".to_string(), position: 1 },
            ],
        }
    }

    fn table(columns: &[&str], rows: &[&[&str]]) -> AttributeTable {
        AttributeTable::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_unjoined_projection() {
        let record =
            join(&both_matched(), &layer(), None, "FIPS", &KeyFormat::county_fips()).unwrap();

        assert_eq!(record.columns, vec!["STATE CODE", "COUNTY CODE", "FIPS", "COUNTY NAME"]);
        assert_eq!(
            record.rows,
            vec![vec!["06", "037", "06037", "Los Angeles"], vec!["06", "059", "06059", "Orange"]]
        );
    }

    #[test]
    fn test_inner_join_drops_unmatched_ids() {
        let table = table(&["FIPS", "Population"], &[&["06037", "10014009"]]);
        let record =
            join(&both_matched(), &layer(), Some(&table), "FIPS", &KeyFormat::county_fips())
                .unwrap();

        assert_eq!(record.len(), 1);
        assert_eq!(record.columns.last().map(String::as_str), Some("Population"));
        assert_eq!(record.rows[0], vec!["06", "037", "06037", "Los Angeles", "10014009"]);
    }

    #[test]
    fn test_numeric_table_keys_match_padded_ids() {
        let table =
            table(&["Population", "FIPS"], &[&["3186989", "6059"], &["10014009", "6037.0"]]);
        let record =
            join(&both_matched(), &layer(), Some(&table), "FIPS", &KeyFormat::county_fips())
                .unwrap();

        // Match order, not table order
        assert_eq!(record.column("FIPS"), Some(vec!["06037", "06059"]));
        assert_eq!(record.column("Population"), Some(vec!["10014009", "3186989"]));
    }

    #[test]
    fn test_duplicate_table_keys_multiply_rows() {
        let table = table(&["FIPS", "Year"], &[&["06037", "2020"], &["6037", "2021"]]);
        let record =
            join(&both_matched(), &layer(), Some(&table), "FIPS", &KeyFormat::county_fips())
                .unwrap();
        assert_eq!(record.column("Year"), Some(vec!["2020", "2021"]));
    }

    #[test]
    fn test_colliding_columns_are_suffixed() {
        let table =
            table(&["GEOID", "COUNTY NAME", "FIPS"], &[&["06037", "LA County", "x"]]);
        let record =
            join(&both_matched(), &layer(), Some(&table), "GEOID", &KeyFormat::county_fips())
                .unwrap();

        assert_eq!(
            record.columns,
            vec![
                "STATE CODE",
                "COUNTY CODE",
                "FIPS",
                "COUNTY NAME",
                "COUNTY NAME_table",
                "FIPS_table"
            ]
        );
        assert_eq!(record.column("COUNTY NAME"), Some(vec!["Los Angeles"]));
        assert_eq!(record.column("COUNTY NAME_table"), Some(vec!["LA County"]));
    }

    #[test]
    fn test_missing_key_column() {
        let table = table(&["fips"], &[&["06037"]]);
        let err = join(&both_matched(), &layer(), Some(&table), "FIPS", &KeyFormat::county_fips())
            .unwrap_err();
        assert!(matches!(err, SelectorError::MissingColumn { .. }));
    }

    #[test]
    fn test_malformed_table_key() {
        let table = table(&["FIPS"], &[&["LA"]]);
        let err = join(&both_matched(), &layer(), Some(&table), "FIPS", &KeyFormat::county_fips())
            .unwrap_err();
        assert!(matches!(err, SelectorError::KeyFormat { .. }));
    }

    #[test]
    fn test_empty_match_keeps_schema() {
        let table = table(&["FIPS", "Population"], &[&["06037", "1"]]);
        let record = join(
            &MatchResult::default(),
            &layer(),
            Some(&table),
            "FIPS",
            &KeyFormat::county_fips(),
        )
        .unwrap();
        assert!(record.is_empty());
        assert_eq!(record.columns.len(), 5);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn join_rows_follow_table_multiplicity(
                picks in proptest::collection::vec(0usize..3, 0..12),
            ) {
                // 06037 and 06059 are in the layer; 06111 is not
                let keys = ["6037", "06059", "06111"];
                let rows: Vec<Vec<String>> = picks
                    .iter()
                    .enumerate()
                    .map(|(i, pick)| vec![keys[*pick].to_string(), i.to_string()])
                    .collect();
                let columns = vec!["FIPS".to_string(), "Row".to_string()];
                let table = AttributeTable::new(columns, rows).unwrap();

                let format = KeyFormat::county_fips();
                let record =
                    join(&both_matched(), &layer(), Some(&table), "FIPS", &format).unwrap();

                let expected = picks.iter().filter(|p| **p < 2).count();
                prop_assert_eq!(record.len(), expected);

                // Match order first, table order within one id
                let fips = record.column("FIPS").unwrap();
                let mut sorted = fips.clone();
                sorted.sort();
                prop_assert_eq!(fips, sorted);
            }
        }
    }
}
