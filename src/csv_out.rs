use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::error::ExtractError;
use crate::model::Row;

/// Header names plus equal-width rows, and how to lay them out as CSV.
#[derive(Debug, Clone, Copy)]
pub struct CsvTable<'a> {
    pub headers: &'a [String],
    pub rows: &'a [Row],
    pub delimiter: u8,
    /// Columns whose non-empty values are wrapped in literal double quotes.
    pub text_columns: &'a [String],
}

impl CsvTable<'_> {
    fn quoted_positions(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, name)| self.text_columns.iter().any(|text| text == *name))
            .map(|(index, _)| index)
            .collect()
    }

    fn write_to<W: Write>(&self, sink: W) -> Result<W, ExtractError> {
        let quoted = self.quoted_positions();
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(sink);
        writer.write_record(self.headers)?;
        for row in self.rows {
            writer.write_record(row.iter().enumerate().map(|(index, value)| {
                if quoted.contains(&index) && !value.is_empty() {
                    format!("\"{value}\"")
                } else {
                    value.clone()
                }
            }))?;
        }
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|error| ExtractError::Io(error.into_error()))
    }
}

pub(crate) fn write_csv(path: &Path, table: &CsvTable<'_>) -> Result<(), ExtractError> {
    let file = std::fs::File::create(path)?;
    table.write_to(file)?;
    Ok(())
}

pub(crate) fn write_csv_to_string(table: &CsvTable<'_>) -> Result<String, ExtractError> {
    let bytes = table.write_to(Vec::<u8>::new())?;
    String::from_utf8(bytes)
        .map_err(|error| ExtractError::InvalidOption(format!("invalid utf-8 csv output: {error}")))
}
