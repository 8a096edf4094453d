//! CSV source reader.

use std::io::Read;
use std::path::Path;

use crate::error::{InputError, InputResult};
use crate::types::{DataSet, Schema, Value};

/// Build the CSV reader configuration used for tabular sources.
///
/// The reader is flexible: short rows are padded with nulls instead of failing the whole file.
pub fn reader_builder(delimiter: u8) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).flexible(true).delimiter(delimiter);
    builder
}

/// Read a CSV file into a text [`DataSet`] projected onto `schema`.
pub fn read_csv_from_path(
    path: impl AsRef<Path>,
    schema: &Schema,
    delimiter: u8,
) -> InputResult<DataSet> {
    let mut rdr = reader_builder(delimiter).from_path(path)?;
    read_csv_from_reader(&mut rdr, schema)
}

/// Read CSV data from an existing CSV reader.
///
/// Rules:
///
/// - CSV must have headers.
/// - Headers must contain all schema fields (case-sensitive, order can differ, extra columns are
///   ignored).
/// - Every cell is trimmed; empty cells become [`Value::Null`], everything else
///   [`Value::Utf8`].
pub fn read_csv_from_reader<R: Read>(
    rdr: &mut csv::Reader<R>,
    schema: &Schema,
) -> InputResult<DataSet> {
    let headers = rdr.headers()?.clone();

    // Map schema fields -> CSV column indexes (allows re-ordered CSV columns).
    let mut col_idxs = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        match headers.iter().position(|h| h == field.name) {
            Some(idx) => col_idxs.push(idx),
            None => {
                return Err(InputError::SchemaMismatch {
                    message: format!(
                        "missing required column '{field}'. headers={:?}",
                        headers.iter().collect::<Vec<_>>(),
                        field = field.name
                    ),
                });
            }
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row = col_idxs
            .iter()
            .map(|&csv_idx| text_value(record.get(csv_idx).unwrap_or("")))
            .collect();
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn text_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::Utf8(trimmed.to_owned())
    }
}
