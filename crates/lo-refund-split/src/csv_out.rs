use std::path::Path;

use csv::{Writer, WriterBuilder};

use crate::error::SplitError;
use crate::model::{Row, cell_text};

fn write_rows<W: std::io::Write>(writer: &mut Writer<W>, rows: &[Row]) -> Result<(), SplitError> {
    for row in rows {
        writer.write_record(row.iter().map(cell_text))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes raw rows as CSV; absent cells become empty fields.
pub fn write_table_csv(path: &Path, rows: &[Row]) -> Result<(), SplitError> {
    let mut writer = WriterBuilder::new().flexible(true).from_path(path)?;
    write_rows(&mut writer, rows)
}

pub fn table_to_csv_string(rows: &[Row]) -> Result<String, SplitError> {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::<u8>::new());
    write_rows(&mut writer, rows)?;

    let bytes = writer
        .into_inner()
        .map_err(|error| SplitError::Csv(error.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|error| SplitError::InvalidOption(format!("invalid utf-8 csv output: {error}")))
}
