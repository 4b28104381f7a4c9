pub mod config;
pub mod exporter;
pub mod flatten;
pub mod status;
pub mod utils;
pub mod workbook;
