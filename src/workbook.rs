//! Workbook access: opening spreadsheet containers, listing sheets and
//! resolving which sheets a run should scan.
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use regex::Regex;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, info};

use crate::flatten::FlattenError;

/// Read access to the named sheets of a workbook
pub trait SheetSource {
    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Load the full cell grid of one sheet
    fn sheet_range(&mut self, name: &str) -> Result<Range<Data>, FlattenError>;
}

impl<RS: Read + Seek> SheetSource for Sheets<RS> {
    fn sheet_names(&self) -> Vec<String> {
        Reader::sheet_names(self)
    }

    fn sheet_range(&mut self, name: &str) -> Result<Range<Data>, FlattenError> {
        self.worksheet_range(name)
            .map_err(|e| FlattenError::SheetUnreadable {
                sheet: name.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Open a workbook from disk; the container format is picked from the extension
pub fn open_workbook(path: impl AsRef<Path>) -> Result<Sheets<BufReader<File>>, FlattenError> {
    let path = path.as_ref();
    info!("Opening workbook: {}", path.display());
    open_workbook_auto(path).map_err(|e| FlattenError::UnreadableWorkbook(e.to_string()))
}

/// Open a workbook from an in-memory byte buffer (e.g. an upload)
pub fn open_workbook_from_bytes(
    bytes: Vec<u8>,
) -> Result<Sheets<Cursor<Vec<u8>>>, FlattenError> {
    debug!("Opening workbook from {} bytes", bytes.len());
    open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| FlattenError::UnreadableWorkbook(e.to_string()))
}

/// Sheet names in workbook order, for populating a selection control
pub fn list_sheet_names<W: SheetSource + ?Sized>(workbook: &W) -> Vec<String> {
    workbook.sheet_names()
}

/// Which sheets a flatten run scans
#[derive(Debug, Clone)]
pub enum SheetSelector {
    /// One explicit sheet; its absence is an error
    Named(String),
    /// Every sheet whose name starts with the prefix
    Prefix(String),
    /// Every sheet whose name matches the pattern
    Pattern(Regex),
    /// Every sheet
    All,
}

impl SheetSelector {
    pub fn named(name: impl Into<String>) -> Self {
        SheetSelector::Named(name.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        SheetSelector::Prefix(prefix.into())
    }

    /// Build a pattern selector, failing on an invalid regex
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(SheetSelector::Pattern)
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, SheetSelector::Named(_))
    }

    pub fn matches(&self, sheet_name: &str) -> bool {
        match self {
            SheetSelector::Named(name) => name == sheet_name,
            SheetSelector::Prefix(prefix) => sheet_name.starts_with(prefix.as_str()),
            SheetSelector::Pattern(re) => re.is_match(sheet_name),
            SheetSelector::All => true,
        }
    }

    /// Resolve the selector against the workbook's sheet names, keeping
    /// workbook order
    pub fn resolve(&self, available: &[String]) -> Result<Vec<String>, FlattenError> {
        if let SheetSelector::Named(name) = self {
            if !available.iter().any(|s| s == name) {
                return Err(FlattenError::SheetNotFound {
                    sheet: name.clone(),
                    available: available.to_vec(),
                });
            }
            return Ok(vec![name.clone()]);
        }

        Ok(available
            .iter()
            .filter(|name| self.matches(name))
            .cloned()
            .collect())
    }
}

/// A workbook held entirely in memory
///
/// Useful when the grid comes from somewhere other than a spreadsheet file,
/// and for exercising the flattener without touching disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<(String, Range<Data>)>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet from rows of cells, replacing any sheet with the same name
    pub fn with_sheet(mut self, name: impl Into<String>, rows: Vec<Vec<Data>>) -> Self {
        let name = name.into();
        let range = range_from_rows(rows);
        match self.sheets.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = range,
            None => self.sheets.push((name, range)),
        }
        self
    }
}

impl SheetSource for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn sheet_range(&mut self, name: &str) -> Result<Range<Data>, FlattenError> {
        self.sheets
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, range)| range.clone())
            .ok_or_else(|| FlattenError::SheetNotFound {
                sheet: name.to_string(),
                available: self.sheet_names(),
            })
    }
}

fn range_from_rows(rows: Vec<Vec<Data>>) -> Range<Data> {
    let height = rows.len();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if height == 0 || width == 0 {
        return Range::empty();
    }

    let mut range = Range::new((0, 0), ((height - 1) as u32, (width - 1) as u32));
    for (row_idx, row) in rows.into_iter().enumerate() {
        for (col_idx, cell) in row.into_iter().enumerate() {
            range.set_value((row_idx as u32, col_idx as u32), cell);
        }
    }
    range
}
