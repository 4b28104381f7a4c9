use calamine::{Data, Range};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, instrument, warn};

use super::error::FlattenError;
use super::labels::LabelIndex;
use super::record::{CellValue, MetricRecord};
use super::teams::{parse_team_descriptors, TeamDescriptor};
use crate::config::{FilterConfig, LabelMode, SentinelPolicy};
use crate::utils::{cell_raw_text, cell_text};
use crate::workbook::{SheetSelector, SheetSource};

/// Something skipped or missing during a scan that did not abort it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A sheet selected by prefix/pattern could not be processed
    SheetSkipped { sheet: String, reason: String },
    /// A malformed metric row; `row` is 0-based
    RowSkipped {
        sheet: String,
        row: u32,
        reason: String,
    },
    /// A requested metric id never matched a row
    MetricNotFound { metric_id: String },
    /// The scan completed without producing a single record
    EmptyResult,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SheetSkipped { sheet, reason } => {
                write!(f, "Skipped sheet '{sheet}': {reason}")
            }
            Diagnostic::RowSkipped { sheet, row, reason } => {
                write!(f, "Skipped row {} of sheet '{sheet}': {reason}", row + 1)
            }
            Diagnostic::MetricNotFound { metric_id } => {
                write!(f, "Metric ID '{metric_id}' not found")
            }
            Diagnostic::EmptyResult => f.write_str("No matching metrics found"),
        }
    }
}

/// Output of one flatten run
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<MetricRecord>,
    pub diagnostics: Vec<Diagnostic>,
    /// Sheets that were scanned successfully, in workbook order
    pub sheets: Vec<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Treat a scan with zero records as a failure
    pub fn require_records(self) -> Result<Self, FlattenError> {
        if self.is_empty() {
            Err(FlattenError::EmptyResult)
        } else {
            Ok(self)
        }
    }
}

/// A data row identified by its metric id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRow {
    pub row: u32,
    pub metric_id: String,
    pub metric_label: Option<String>,
    pub data_type: Option<String>,
}

/// Flatten the selected sheets of a workbook into metric records
///
/// Records come out in workbook sheet order, then row order, then team
/// column order. With an explicit sheet every failure aborts the run; with
/// a prefix/pattern/all selector a failing sheet is recorded as a
/// diagnostic and the remaining sheets are still scanned.
#[instrument(skip(workbook, config))]
pub fn flatten<W: SheetSource + ?Sized>(
    workbook: &mut W,
    selector: &SheetSelector,
    config: &FilterConfig,
) -> Result<Extraction, FlattenError> {
    let available = workbook.sheet_names();
    let targets = selector.resolve(&available)?;
    info!("Scanning {} of {} sheets", targets.len(), available.len());

    let mut extraction = Extraction::default();
    let mut matched_ids: HashSet<String> = HashSet::new();

    for sheet in &targets {
        match flatten_sheet(
            workbook,
            sheet,
            config,
            &mut matched_ids,
            &mut extraction.diagnostics,
        ) {
            Ok(mut records) => {
                info!("Extracted {} records from sheet {}", records.len(), sheet);
                extraction.records.append(&mut records);
                extraction.sheets.push(sheet.clone());
            }
            Err(e) if !selector.is_explicit() => {
                warn!("Skipping sheet {}: {}", sheet, e);
                extraction.diagnostics.push(Diagnostic::SheetSkipped {
                    sheet: sheet.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(ids) = &config.metric_ids {
        let mut reported = HashSet::new();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !matched_ids.contains(id.as_str()) && reported.insert(id.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() && matched_ids.is_empty() && selector.is_explicit() {
            return Err(FlattenError::MetricNotFound {
                metric_ids: missing,
                sheets: targets,
            });
        }

        for metric_id in missing {
            warn!("Metric ID {} not found in any scanned sheet", metric_id);
            extraction
                .diagnostics
                .push(Diagnostic::MetricNotFound { metric_id });
        }
    }

    if extraction.is_empty() {
        warn!("Scan finished with no matching records");
        extraction.diagnostics.push(Diagnostic::EmptyResult);
    }

    info!(
        "Flattened {} records from {} sheets",
        extraction.records.len(),
        extraction.sheets.len()
    );
    Ok(extraction)
}

fn flatten_sheet<W: SheetSource + ?Sized>(
    workbook: &mut W,
    sheet: &str,
    config: &FilterConfig,
    matched_ids: &mut HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<MetricRecord>, FlattenError> {
    let range = workbook.sheet_range(sheet)?;
    let layout = &config.layout;

    let all_teams = parse_team_descriptors(sheet, &range, layout)?;
    let teams: Vec<&TeamDescriptor> = match &config.region {
        Some(region) => all_teams.iter().filter(|t| t.in_region(region)).collect(),
        None => all_teams.iter().collect(),
    };
    if teams.len() < all_teams.len() {
        debug!(
            "{} of {} teams in sheet {} are outside the requested region",
            all_teams.len() - teams.len(),
            all_teams.len(),
            sheet
        );
    }

    let labels = match config.label_mode {
        LabelMode::ForwardFilled { .. } => Some(LabelIndex::build(&range, layout.label_column)),
        LabelMode::SameRow => None,
    };

    let Some((end_row, _)) = range.end() else {
        return Ok(Vec::new());
    };

    let mut records = Vec::new();
    for row in layout.first_data_row()..=end_row {
        let metric = match read_metric_row(&range, row, config, labels.as_ref()) {
            Ok(Some(metric)) => metric,
            Ok(None) => continue,
            Err(reason) => {
                warn!("Skipping row {} of sheet {}: {}", row + 1, sheet, reason);
                diagnostics.push(Diagnostic::RowSkipped {
                    sheet: sheet.to_string(),
                    row,
                    reason,
                });
                continue;
            }
        };

        if !row_qualifies(&metric, config) {
            continue;
        }
        debug!(
            "Row {} of sheet {} matches metric {}",
            metric.row + 1,
            sheet,
            metric.metric_id
        );
        matched_ids.insert(metric.metric_id.clone());

        for team in &teams {
            let cell = range.get_value((row, team.source_column));
            if let Some(value) = resolve_value(cell, config) {
                records.push(MetricRecord::new(
                    team,
                    sheet,
                    &metric.metric_id,
                    metric.metric_label.clone(),
                    metric.data_type.clone(),
                    value,
                    config.quarter.clone(),
                ));
            }
        }
    }

    Ok(records)
}

/// Read the key cells of a row; `Ok(None)` when the row carries no metric id
fn read_metric_row(
    range: &Range<Data>,
    row: u32,
    config: &FilterConfig,
    labels: Option<&LabelIndex>,
) -> Result<Option<MetricRow>, String> {
    let layout = &config.layout;

    let Some(metric_id) = key_cell(range, row, layout.metric_id_column)?.and_then(cell_raw_text)
    else {
        return Ok(None);
    };
    let data_type = key_cell(range, row, layout.data_type_column)?.and_then(cell_text);
    let label_cell = key_cell(range, row, layout.label_column)?;
    let metric_label = match (config.label_mode, labels) {
        (LabelMode::ForwardFilled { row_offset }, Some(index)) => {
            index.label_for(row, row_offset).map(str::to_string)
        }
        _ => label_cell.and_then(cell_text),
    };

    Ok(Some(MetricRow {
        row,
        metric_id,
        metric_label,
        data_type,
    }))
}

/// Key cells (id, label, data type) must not hold spreadsheet errors
fn key_cell(range: &Range<Data>, row: u32, col: u32) -> Result<Option<&Data>, String> {
    match range.get_value((row, col)) {
        Some(Data::Error(e)) => Err(format!("column {} holds error value {e}", col + 1)),
        other => Ok(other),
    }
}

fn row_qualifies(metric: &MetricRow, config: &FilterConfig) -> bool {
    if let Some(ids) = &config.metric_ids {
        return ids.iter().any(|id| *id == metric.metric_id);
    }
    if config.keywords.is_empty() {
        return true;
    }
    let data_type = metric
        .data_type
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    config.keywords.iter().any(|k| data_type.contains(k.as_str()))
}

/// Decide what a value cell contributes; `None` means no record
fn resolve_value(cell: Option<&Data>, config: &FilterConfig) -> Option<CellValue> {
    let suppressed = match cell {
        None | Some(Data::Empty) => return None,
        Some(Data::Error(_)) => true,
        Some(Data::String(s)) => config.is_excluded(s),
        Some(_) => false,
    };

    if suppressed {
        return match config.sentinel_policy {
            SentinelPolicy::Omit => None,
            SentinelPolicy::NullValue => Some(CellValue::NotReportable),
        };
    }

    cell.and_then(CellValue::from_cell)
}
