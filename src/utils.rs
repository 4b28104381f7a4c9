/// Shared cell helpers for reading audit workbooks
use calamine::Data;

/// Render a cell as trimmed text, `None` when it is empty, blank or an error
///
/// Used for metadata and label cells, where only the visible text matters.
///
/// # Examples
///
/// ```
/// use calamine::Data;
/// use metric_flatten::utils::cell_text;
///
/// assert_eq!(cell_text(&Data::String("  Trust1 ".into())), Some("Trust1".to_string()));
/// assert_eq!(cell_text(&Data::String("   ".into())), None);
/// assert_eq!(cell_text(&Data::Int(7)), Some("7".to_string()));
/// assert_eq!(cell_text(&Data::Empty), None);
/// ```
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        other => Some(other.to_string()),
    }
}

/// Render a cell as its exact text, without trimming
///
/// Metric ids are matched verbatim against the caller's allow-list.
pub fn cell_raw_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Normalise a string for sentinel comparison: trim, lower-case and collapse
/// inner runs of whitespace to a single space
///
/// # Examples
///
/// ```
/// use metric_flatten::utils::normalize_sentinel;
///
/// assert_eq!(normalize_sentinel("  Too  few to\treport "), "too few to report");
/// assert_eq!(normalize_sentinel("N/A"), "n/a");
/// assert_eq!(normalize_sentinel("   "), "");
/// ```
pub fn normalize_sentinel(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Replace embedded line breaks in a label with spaces
pub fn flatten_newlines(label: &str) -> String {
    label
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}
