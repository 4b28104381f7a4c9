use calamine::Data;
use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::fmt;

use super::teams::TeamDescriptor;

/// A metric value as it appeared in the workbook
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    DateTime(NaiveDateTime),
    /// Suppressed in the source ("Too few to report", "N/A", ...)
    NotReportable,
}

impl CellValue {
    /// Convert a non-empty, non-error cell, keeping numeric and text typing
    ///
    /// Returns `None` for empty and error cells; the caller decides what those mean.
    pub fn from_cell(cell: &Data) -> Option<CellValue> {
        match cell {
            Data::Empty | Data::Error(_) => None,
            Data::Int(i) => Some(CellValue::Int(*i)),
            Data::Float(f) => Some(CellValue::Float(*f)),
            Data::Bool(b) => Some(CellValue::Bool(*b)),
            Data::String(s) => Some(CellValue::Text(s.clone())),
            Data::DateTime(dt) => Some(match dt.as_datetime() {
                Some(datetime) => CellValue::DateTime(datetime),
                None => CellValue::Float(dt.as_f64()),
            }),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Text(s) => f.write_str(s),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::NotReportable => Ok(()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::Float(f) => serializer.serialize_f64(*f),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::DateTime(_) => serializer.collect_str(self),
            CellValue::NotReportable => serializer.serialize_none(),
        }
    }
}

/// One flattened (team x metric) value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    #[serde(rename = "Team Type")]
    pub team_type: Option<String>,
    #[serde(rename = "Region")]
    pub region: Option<String>,
    #[serde(rename = "Trust")]
    pub trust: Option<String>,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "Sheet")]
    pub sheet: String,
    #[serde(rename = "Metric ID")]
    pub metric_id: String,
    #[serde(rename = "Metric Label")]
    pub metric_label: Option<String>,
    #[serde(rename = "Data Type")]
    pub data_type: Option<String>,
    #[serde(rename = "Value")]
    pub value: CellValue,
    #[serde(rename = "Quarter")]
    pub quarter: Option<String>,
}

impl MetricRecord {
    /// Column headers, in output order
    pub const HEADERS: [&'static str; 10] = [
        "Team Type",
        "Region",
        "Trust",
        "Team",
        "Sheet",
        "Metric ID",
        "Metric Label",
        "Data Type",
        "Value",
        "Quarter",
    ];

    pub(crate) fn new(
        team: &TeamDescriptor,
        sheet: &str,
        metric_id: &str,
        metric_label: Option<String>,
        data_type: Option<String>,
        value: CellValue,
        quarter: Option<String>,
    ) -> Self {
        MetricRecord {
            team_type: team.team_type.clone(),
            region: team.region.clone(),
            trust: team.trust.clone(),
            team: team.team_name.clone(),
            sheet: sheet.to_string(),
            metric_id: metric_id.to_string(),
            metric_label,
            data_type,
            value,
            quarter,
        }
    }

    /// Record as text cells in `HEADERS` order; absent fields are empty
    pub fn to_row(&self) -> Vec<String> {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            text(&self.team_type),
            text(&self.region),
            text(&self.trust),
            self.team.clone(),
            self.sheet.clone(),
            self.metric_id.clone(),
            text(&self.metric_label),
            text(&self.data_type),
            self.value.to_string(),
            text(&self.quarter),
        ]
    }
}
