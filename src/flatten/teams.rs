/// Team metadata parser
///
/// The top rows of every audit sheet describe one team per column:
/// ```text
/// Row 1: Team type   (e.g. "ESD")
/// Row 2: Region      (e.g. "London")
/// Row 3: Trust       (e.g. "Barts Health")
/// Row 4: Team name   (e.g. "Royal London ESD")
/// Row 5+: metric rows, values under each team column
/// ```
/// Row indices and the first team column come from `SheetLayout`.
use calamine::{Data, Range};
use tracing::debug;

use super::error::FlattenError;
use crate::config::SheetLayout;
use crate::utils::cell_text;

/// Identity of the team whose values sit in `source_column`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamDescriptor {
    pub team_type: Option<String>,
    pub region: Option<String>,
    pub trust: Option<String>,
    pub team_name: String,
    pub source_column: u32,
}

impl TeamDescriptor {
    pub fn in_region(&self, region: &str) -> bool {
        self.region
            .as_deref()
            .is_some_and(|r| r.trim().eq_ignore_ascii_case(region.trim()))
    }
}

/// Build one descriptor per column whose team-name cell is non-blank
pub fn parse_team_descriptors(
    sheet: &str,
    range: &Range<Data>,
    layout: &SheetLayout,
) -> Result<Vec<TeamDescriptor>, FlattenError> {
    let (end_row, end_col) = range
        .end()
        .ok_or_else(|| FlattenError::MetadataExtractionFailure {
            sheet: sheet.to_string(),
            reason: "sheet is empty".to_string(),
        })?;

    if end_row < layout.last_metadata_row() {
        return Err(FlattenError::MetadataExtractionFailure {
            sheet: sheet.to_string(),
            reason: format!(
                "sheet has {} rows, metadata needs {}",
                end_row + 1,
                layout.last_metadata_row() + 1
            ),
        });
    }

    let get_text = |row: u32, col: u32| range.get_value((row, col)).and_then(cell_text);

    let last_col = layout
        .metadata_end_column
        .map_or(end_col, |c| c.min(end_col));

    let mut teams = Vec::new();
    for col in layout.metadata_start_column..=last_col {
        let Some(team_name) = get_text(layout.team_name_row, col) else {
            continue;
        };
        teams.push(TeamDescriptor {
            team_type: get_text(layout.team_type_row, col),
            region: get_text(layout.region_row, col),
            trust: get_text(layout.trust_row, col),
            team_name,
            source_column: col,
        });
    }

    if teams.is_empty() {
        return Err(FlattenError::MetadataExtractionFailure {
            sheet: sheet.to_string(),
            reason: format!(
                "no team names in row {} from column {}",
                layout.team_name_row + 1,
                layout.metadata_start_column + 1
            ),
        });
    }

    debug!("Found {} teams in sheet {}", teams.len(), sheet);
    Ok(teams)
}
