// Metric flattening
//
// Turns an audit workbook into flat (team x metric) records:
// - metadata rows at the top of each sheet name one team per column
// - metric rows below carry an id, a label, a data-type tag and one value per team

pub mod error;
pub mod labels;
pub mod metric_flattener;
pub mod record;
pub mod teams;

pub use error::FlattenError;
pub use labels::LabelIndex;
pub use metric_flattener::{flatten, Diagnostic, Extraction, MetricRow};
pub use record::{CellValue, MetricRecord};
pub use teams::{parse_team_descriptors, TeamDescriptor};
