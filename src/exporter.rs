use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::FilterConfig;
use crate::flatten::{CellValue, MetricRecord};

/// Name of the single worksheet in spreadsheet exports
pub const EXPORT_SHEET_NAME: &str = "Metrics";

/// File stem used when the output is not tied to specific metrics
pub const DEFAULT_FILE_STEM: &str = "Metrics_Output";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },
}

impl ExportError {
    fn write(path: &Path, reason: impl fmt::Display) -> Self {
        ExportError::WriteError {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Tsv,
    Xlsx,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Json => "json",
        }
    }

}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "tsv" => Ok(ExportFormat::Tsv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!(
                "Invalid export format '{other}'. Valid formats: csv, tsv, xlsx, json"
            )),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Output file name for a run
///
/// Runs for specific metrics with a quarter tag get
/// `"{ids}_{quarter}.{ext}"`; everything else shares one fixed name that is
/// overwritten by the next run.
pub fn output_file_name(config: &FilterConfig, format: ExportFormat) -> String {
    let stem = match (&config.metric_ids, &config.quarter) {
        (Some(ids), Some(quarter)) if !ids.is_empty() => {
            format!("{}_{}", ids.join("_"), quarter.trim())
        }
        _ => DEFAULT_FILE_STEM.to_string(),
    };
    format!("{}.{}", sanitize_file_stem(&stem), format.extension())
}

fn sanitize_file_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// Write records to `path` in the given format, returning the written path
///
/// The file is assembled next to the target and moved into place once
/// complete, so a failed export never leaves a truncated file behind.
pub fn export(
    records: &[MetricRecord],
    format: ExportFormat,
    path: impl AsRef<Path>,
) -> Result<PathBuf, ExportError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| ExportError::write(path, e))?;
    debug!("Writing {} records to {}", records.len(), temp.path().display());

    match format {
        ExportFormat::Csv => {
            write_delimited(records, b',', temp.as_file_mut())
                .map_err(|e| ExportError::write(path, e))?;
        }
        ExportFormat::Tsv => {
            write_delimited(records, b'\t', temp.as_file_mut())
                .map_err(|e| ExportError::write(path, e))?;
        }
        ExportFormat::Xlsx => {
            let bytes = xlsx_bytes(records).map_err(|e| ExportError::write(path, e))?;
            temp.write_all(&bytes)
                .map_err(|e| ExportError::write(path, e))?;
        }
        ExportFormat::Json => {
            serde_json::to_writer_pretty(temp.as_file_mut(), records)
                .map_err(|e| ExportError::write(path, e))?;
        }
    }

    temp.persist(path)
        .map_err(|e| ExportError::write(path, e.error))?;

    info!(
        "Exported {} records as {} to {}",
        records.len(),
        format,
        path.display()
    );
    Ok(path.to_path_buf())
}

fn write_delimited<W: Write>(
    records: &[MetricRecord],
    delimiter: u8,
    out: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(out);

    writer.write_record(MetricRecord::HEADERS)?;
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer.flush()?;
    Ok(())
}

fn xlsx_bytes(records: &[MetricRecord]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME)?;

    for (col, header) in MetricRecord::HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = (idx + 1) as u32;
        for (col, text) in record.to_row().into_iter().enumerate() {
            let col = col as u16;
            if MetricRecord::HEADERS[col as usize] == "Value" {
                match &record.value {
                    CellValue::Int(i) => {
                        worksheet.write_number(row, col, *i as f64)?;
                    }
                    CellValue::Float(f) => {
                        worksheet.write_number(row, col, *f)?;
                    }
                    CellValue::Bool(b) => {
                        worksheet.write_boolean(row, col, *b)?;
                    }
                    CellValue::NotReportable => {}
                    CellValue::Text(_) | CellValue::DateTime(_) => {
                        worksheet.write_string(row, col, text)?;
                    }
                }
            } else if !text.is_empty() {
                worksheet.write_string(row, col, text)?;
            }
        }
    }

    workbook.save_to_buffer()
}
