use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("Failed to read workbook: {0}")]
    UnreadableWorkbook(String),

    #[error("Sheet '{sheet}' not found in workbook. Available sheets: {available:?}")]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("Could not parse sheet '{sheet}': {reason}")]
    SheetUnreadable { sheet: String, reason: String },

    #[error("Failed to extract team metadata from sheet '{sheet}': {reason}")]
    MetadataExtractionFailure { sheet: String, reason: String },

    #[error("Metric ID(s) {metric_ids:?} not found in sheet(s) {sheets:?}")]
    MetricNotFound {
        metric_ids: Vec<String>,
        sheets: Vec<String>,
    },

    #[error("No matching metrics found")]
    EmptyResult,
}
