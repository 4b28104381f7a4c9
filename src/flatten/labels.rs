use calamine::{Data, Range};

use crate::utils::{cell_text, flatten_newlines};

/// Metric labels carried down through blank label cells
///
/// Audit sheets often print a metric label once and leave the following
/// rows (sub-measures of the same metric) blank. Indexed by absolute row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelIndex {
    labels: Vec<Option<String>>,
}

impl LabelIndex {
    /// Scan `column` from the top of the sheet to its last row
    pub fn build(range: &Range<Data>, column: u32) -> Self {
        let Some((end_row, _)) = range.end() else {
            return LabelIndex::default();
        };

        let mut current: Option<String> = None;
        let labels = (0..=end_row)
            .map(|row| {
                if let Some(text) = range.get_value((row, column)).and_then(cell_text) {
                    current = Some(flatten_newlines(&text));
                }
                current.clone()
            })
            .collect();

        LabelIndex { labels }
    }

    /// Label for a data row, reading label-source row `row + row_offset`
    pub fn label_for(&self, row: u32, row_offset: i64) -> Option<&str> {
        let source_row = i64::from(row) + row_offset;
        if source_row < 0 {
            return None;
        }
        self.labels
            .get(source_row as usize)
            .and_then(|label| label.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::{MemoryWorkbook, SheetSource};

    fn label_sheet(labels: &[(usize, &str)], height: usize) -> Range<Data> {
        let rows = (0..height)
            .map(|row| {
                let cell = labels
                    .iter()
                    .find(|(r, _)| *r == row)
                    .map_or(Data::Empty, |(_, v)| Data::String(v.to_string()));
                vec![cell, Data::Int(row as i64)]
            })
            .collect();
        MemoryWorkbook::new()
            .with_sheet("S", rows)
            .sheet_range("S")
            .unwrap()
    }

    #[test]
    fn test_forward_fill_between_labels() {
        let range = label_sheet(&[(5, "A"), (9, "B")], 14);
        let index = LabelIndex::build(&range, 0);

        for row in 0..5 {
            assert_eq!(index.label_for(row, 0), None, "row {row}");
        }
        for row in 5..=8 {
            assert_eq!(index.label_for(row, 0), Some("A"), "row {row}");
        }
        for row in 9..14 {
            assert_eq!(index.label_for(row, 0), Some("B"), "row {row}");
        }
        assert_eq!(index.label_for(14, 0), None);
    }

    #[test]
    fn test_row_past_end_has_no_label() {
        let range = label_sheet(&[(0, "A")], 3);
        let index = LabelIndex::build(&range, 0);
        assert_eq!(index.label_for(3, 0), None);
    }

    #[test]
    fn test_row_offset_shifts_source_row() {
        let range = label_sheet(&[(5, "A"), (9, "B")], 12);
        let index = LabelIndex::build(&range, 0);

        // Data row 8 reads label-source row 9 with an offset of +1
        assert_eq!(index.label_for(8, 0), Some("A"));
        assert_eq!(index.label_for(8, 1), Some("B"));
        // Data row 10 reads label-source row 8 with an offset of -2
        assert_eq!(index.label_for(10, -2), Some("A"));
        assert_eq!(index.label_for(1, -2), None);
    }

    #[test]
    fn test_newlines_become_spaces() {
        let range = label_sheet(&[(0, "Median time\nto scan")], 2);
        let index = LabelIndex::build(&range, 0);
        assert_eq!(index.label_for(1, 0), Some("Median time to scan"));
    }

    #[test]
    fn test_blank_text_does_not_reset_label() {
        let range = label_sheet(&[(0, "A"), (1, "   ")], 3);
        let index = LabelIndex::build(&range, 0);
        assert_eq!(index.label_for(2, 0), Some("A"));
    }

    #[test]
    fn test_empty_sheet() {
        let index = LabelIndex::build(&Range::empty(), 0);
        assert_eq!(index, LabelIndex::default());
        assert_eq!(index.label_for(0, 0), None);
    }
}
