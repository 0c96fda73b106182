//! Spreadsheet datasets (calamine in, rust_xlsxwriter out).

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};

use super::{column_index, Columns, DatasetError};
use crate::models::{InputRecord, OutputRecord};

/// Output sheet name.
pub const SHEET_NAME: &str = "Results";

/// Excel rejects longer cell strings.
const MAX_CELL_CHARS: usize = 32_767;

pub(super) fn read(path: &Path, columns: &Columns) -> Result<Vec<InputRecord>, DatasetError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DatasetError::EmptyWorkbook(path.to_path_buf()))??;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| DatasetError::EmptyWorkbook(path.to_path_buf()))?
        .iter()
        .map(cell_text)
        .collect();

    let name_idx = column_index(&header, &columns.name, path)?;
    let location_idx = column_index(&header, &columns.location, path)?;

    let mut records = Vec::new();
    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        let value = |idx: usize| row.get(idx).map(cell_text).unwrap_or_default();
        let fields: BTreeMap<String, String> = header
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(|(i, h)| (h.clone(), value(i)))
            .collect();

        records.push(InputRecord::new(value(name_idx), value(location_idx)).with_fields(fields));
    }

    Ok(records)
}

pub(super) fn write(path: &Path, records: &[OutputRecord]) -> Result<(), DatasetError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, title) in OutputRecord::HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, cell) in record.cells().iter().enumerate() {
            worksheet.write_string(row, col as u16, clamp_cell(cell))?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn clamp_cell(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
