//! JSON datasets: an array of flat objects.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value};

use super::{Columns, DatasetError};
use crate::models::{InputRecord, OutputRecord};

pub(super) fn read(path: &Path, columns: &Columns) -> Result<Vec<InputRecord>, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows: Vec<Map<String, Value>> = serde_json::from_reader(BufReader::new(file))?;

    rows.into_iter()
        .map(|row| {
            let fields: BTreeMap<String, String> = row
                .into_iter()
                .map(|(key, value)| (key, value_text(value)))
                .collect();
            let name = required(&fields, &columns.name, path)?;
            let location = required(&fields, &columns.location, path)?;
            Ok(InputRecord::new(name, location).with_fields(fields))
        })
        .collect()
}

pub(super) fn write(path: &Path, records: &[OutputRecord]) -> Result<(), DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}

fn required(
    fields: &BTreeMap<String, String>,
    column: &str,
    path: &Path,
) -> Result<String, DatasetError> {
    fields
        .get(column)
        .cloned()
        .ok_or_else(|| DatasetError::MissingColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        })
}

fn value_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}
