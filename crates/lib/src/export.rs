//! # Export Writers
//!
//! Renders an `ExportDocument` into an in-memory spreadsheet. Nothing touches the
//! filesystem; the caller decides whether to stream or persist the bytes.

use crate::{
    errors::ExportError,
    types::{ExportDocument, COLUMN_HEADERS},
};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::debug;

/// Column widths for Filename, Title, Description, Keywords.
const COLUMN_WIDTHS: [f64; 4] = [28.0, 48.0, 64.0, 96.0];

/// The file formats an export can be rendered to.
///
/// Deserialization goes through `FromStr`, so `"CSV"` and `" xlsx "` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("Unsupported export format: '{other}'")),
        }
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Checks a sheet name against the xlsx rules: 1 to 31 characters, none of
/// `[]:*?/\`, and no leading or trailing apostrophe.
pub fn validate_sheet_name(name: &str) -> Result<(), ExportError> {
    Worksheet::new().set_name(name)?;
    Ok(())
}

impl ExportDocument {
    /// Renders the document in the requested format.
    pub fn render(&self, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        match format {
            ExportFormat::Xlsx => self.to_xlsx(),
            ExportFormat::Csv => self.to_csv(),
        }
    }

    /// Writes a workbook with a single sheet: a bold header row, then one row per image.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        for (col, (header, width)) in COLUMN_HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
            let col = col as u16;
            worksheet.write_string_with_format(0, col, *header, &header_format)?;
            worksheet.set_column_width(col, width)?;
        }

        for (i, row) in self.rows.iter().enumerate() {
            let row_num = (i + 1) as u32;
            for (col, cell) in row.cells().into_iter().enumerate() {
                worksheet.write_string(row_num, col as u16, cell)?;
            }
        }

        let buffer = workbook.save_to_buffer()?;
        debug!(rows = self.rows.len(), bytes = buffer.len(), "Rendered xlsx export");
        Ok(buffer)
    }

    /// Writes the same table as CSV, header row first.
    pub fn to_csv(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        // Written explicitly so an empty document still carries its header.
        writer.write_record(COLUMN_HEADERS)?;
        for row in &self.rows {
            writer.write_record(row.cells())?;
        }
        let buffer = writer
            .into_inner()
            .map_err(|e| ExportError::CsvFlush(e.to_string()))?;
        debug!(rows = self.rows.len(), bytes = buffer.len(), "Rendered csv export");
        Ok(buffer)
    }
}
