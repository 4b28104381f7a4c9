use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;

use crate::exporter::ExportFormat;
use crate::utils::normalize_sentinel;

/// Label-source row for data row `r` is `r + DEFAULT_LABEL_ROW_OFFSET`.
///
/// Labels and values are both read from calamine's absolute grid, so the two
/// views share a base. Workbooks exported with a header row stripped from the
/// label view need a non-zero offset.
pub const DEFAULT_LABEL_ROW_OFFSET: i64 = 0;

/// Sheets scanned by the percentage/median extraction start with this prefix
pub const AUDIT_SHEET_PREFIX: &str = "L";

/// Sheet read by the single-metric outcome extraction
pub const OUTCOME_SHEET_NAME: &str = "L4. Outcome measures";

/// Sentinels suppressed by the percentage/median extraction
pub const PERCENT_MEDIAN_EXCLUSIONS: &[&str] =
    &["Too few to report", "Reported annually", ".", "N/A", ""];

/// Sentinels suppressed by the whole-workbook extraction
pub const ALL_SHEETS_EXCLUSIONS: &[&str] =
    &["Too few to report", "Reported annually", ".", "N/A", ""];

/// Sentinels nulled by the single-metric outcome extraction
pub const METRIC_ID_EXCLUSIONS: &[&str] = &["", "Too few to report", ".", "N/A", "nan"];

/// Process configuration read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub export_format: ExportFormat,
    pub quarter: Option<String>,
    pub region: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let export_format = match env::var("METRIC_FLATTEN_FORMAT") {
            Ok(value) => value.parse()?,
            Err(_) => ExportFormat::Csv,
        };

        Ok(Config {
            output_dir: env::var("METRIC_FLATTEN_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            export_format,
            quarter: non_blank_var("METRIC_FLATTEN_QUARTER"),
            region: non_blank_var("METRIC_FLATTEN_REGION"),
        })
    }
}

fn non_blank_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Where the metric label of a data row comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMode {
    /// Label sits on the same row as the metric id
    SameRow,
    /// Label is defined on an earlier row and carried down through blank rows
    ForwardFilled { row_offset: i64 },
}

impl LabelMode {
    pub fn forward_filled() -> Self {
        LabelMode::ForwardFilled {
            row_offset: DEFAULT_LABEL_ROW_OFFSET,
        }
    }
}

/// What happens to a cell holding a sentinel such as "Too few to report"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelPolicy {
    /// No record is emitted
    Omit,
    /// The record is kept with a not-reportable value
    NullValue,
}

/// Fixed positions of metadata rows and key columns in a sheet (0-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub team_type_row: u32,
    pub region_row: u32,
    pub trust_row: u32,
    pub team_name_row: u32,
    /// First column carrying team metadata and values
    pub metadata_start_column: u32,
    /// Last team column (inclusive); `None` runs to the end of the sheet
    pub metadata_end_column: Option<u32>,
    /// First metric row; `None` means the row after the last metadata row
    pub data_start_row: Option<u32>,
    pub label_column: u32,
    pub metric_id_column: u32,
    pub data_type_column: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        SheetLayout {
            team_type_row: 0,
            region_row: 1,
            trust_row: 2,
            team_name_row: 3,
            metadata_start_column: 5,
            metadata_end_column: None,
            data_start_row: None,
            label_column: 0,
            metric_id_column: 1,
            data_type_column: 3,
        }
    }
}

impl SheetLayout {
    /// Index of the last metadata row
    pub fn last_metadata_row(&self) -> u32 {
        self.team_type_row
            .max(self.region_row)
            .max(self.trust_row)
            .max(self.team_name_row)
    }

    pub fn first_data_row(&self) -> u32 {
        self.data_start_row
            .unwrap_or_else(|| self.last_metadata_row() + 1)
    }
}

/// Everything that decides which rows and cells become records
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Lower-case substrings matched against the data-type cell
    pub keywords: BTreeSet<String>,
    /// Exact metric ids; when set, `keywords` is ignored
    pub metric_ids: Option<Vec<String>>,
    pub label_mode: LabelMode,
    pub layout: SheetLayout,
    /// Sentinels, stored normalised (see `utils::normalize_sentinel`)
    pub exclusions: BTreeSet<String>,
    pub sentinel_policy: SentinelPolicy,
    /// Only emit teams in this region (case-insensitive)
    pub region: Option<String>,
    /// Free-text tag copied into every record
    pub quarter: Option<String>,
}

impl FilterConfig {
    /// Every "%" and "median" metric across the L sheets
    pub fn percent_median() -> Self {
        FilterConfig {
            keywords: ["%", "median"].iter().map(|k| k.to_string()).collect(),
            metric_ids: None,
            label_mode: LabelMode::SameRow,
            layout: SheetLayout::default(),
            exclusions: normalized_set(PERCENT_MEDIAN_EXCLUSIONS),
            sentinel_policy: SentinelPolicy::Omit,
            region: None,
            quarter: None,
        }
    }

    /// Every "%" and "median" metric across all sheets, teams from column 1
    ///
    /// Sheets in this layout print each metric label once above its
    /// sub-measures, so labels are forward-filled.
    pub fn all_sheets() -> Self {
        FilterConfig {
            keywords: ["%", "median"].iter().map(|k| k.to_string()).collect(),
            metric_ids: None,
            label_mode: LabelMode::forward_filled(),
            layout: SheetLayout {
                metadata_start_column: 1,
                ..SheetLayout::default()
            },
            exclusions: normalized_set(ALL_SHEETS_EXCLUSIONS),
            sentinel_policy: SentinelPolicy::Omit,
            region: None,
            quarter: None,
        }
    }

    /// Named metrics from one outcome sheet, suppressed values kept as nulls
    pub fn metric_ids(ids: Vec<String>) -> Self {
        FilterConfig {
            keywords: BTreeSet::new(),
            metric_ids: Some(ids),
            label_mode: LabelMode::SameRow,
            layout: SheetLayout {
                metadata_start_column: 4,
                ..SheetLayout::default()
            },
            exclusions: normalized_set(METRIC_ID_EXCLUSIONS),
            sentinel_policy: SentinelPolicy::NullValue,
            region: None,
            quarter: None,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclusions = exclusions
            .into_iter()
            .map(|e| normalize_sentinel(e.as_ref()))
            .collect();
        self
    }

    pub fn with_label_mode(mut self, label_mode: LabelMode) -> Self {
        self.label_mode = label_mode;
        self
    }

    pub fn with_layout(mut self, layout: SheetLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_sentinel_policy(mut self, policy: SentinelPolicy) -> Self {
        self.sentinel_policy = policy;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_quarter(mut self, quarter: impl Into<String>) -> Self {
        self.quarter = Some(quarter.into());
        self
    }

    pub fn is_excluded(&self, value: &str) -> bool {
        self.exclusions.contains(&normalize_sentinel(value))
    }
}

fn normalized_set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| normalize_sentinel(v)).collect()
}

/// Split the caller-facing comma-separated metric id list
///
/// Whitespace around each id is dropped; the ids themselves are kept verbatim.
/// Repeated ids are kept once, in first-seen order.
///
/// ```
/// use metric_flatten::config::parse_metric_ids;
///
/// assert_eq!(parse_metric_ids("L29.3, L32.3,,L29.3"), vec!["L29.3", "L32.3"]);
/// ```
pub fn parse_metric_ids(value: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect()
}
