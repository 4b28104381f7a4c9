#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

/// A fixture cell written into a generated workbook
#[derive(Debug, Clone)]
pub enum Fx {
    Text(&'static str),
    Num(f64),
    Blank,
}

pub use Fx::{Blank, Num, Text};

pub type Grid = Vec<Vec<Fx>>;

/// Write an .xlsx file with the given sheets into `dir`
pub fn write_workbook(dir: &Path, file_name: &str, sheets: &[(&str, Grid)]) -> PathBuf {
    let mut workbook = Workbook::new();
    for (name, grid) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).expect("Invalid sheet name");
        for (row, cells) in grid.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let (row, col) = (row as u32, col as u16);
                match cell {
                    Fx::Text(s) => {
                        worksheet.write_string(row, col, *s).expect("write_string failed");
                    }
                    Fx::Num(n) => {
                        worksheet.write_number(row, col, *n).expect("write_number failed");
                    }
                    Fx::Blank => {}
                }
            }
        }
    }

    let path = dir.join(file_name);
    workbook.save(&path).expect("Failed to save fixture workbook");
    path
}

/// Metadata rows 0-3 naming TeamX (column 5) and TeamY (column 6)
pub fn esd_metadata() -> Grid {
    let pad = || vec![Blank, Blank, Blank, Blank, Blank];
    let row = |x: &'static str, y: &'static str| {
        let mut cells = pad();
        cells.extend([Text(x), Text(y)]);
        cells
    };
    vec![
        row("ESD", "ESD"),
        row("London", "London"),
        row("Trust1", "Trust2"),
        row("TeamX", "TeamY"),
    ]
}

/// A metric row: label (col 0), id (col 1), data type (col 3), values (cols 5, 6)
pub fn metric_row(
    label: &'static str,
    id: &'static str,
    data_type: &'static str,
    x: Fx,
    y: Fx,
) -> Vec<Fx> {
    vec![Text(label), Text(id), Blank, Text(data_type), Blank, x, y]
}

/// An ESD sheet: metadata rows followed by the given metric rows
pub fn esd_sheet(rows: Vec<Vec<Fx>>) -> Grid {
    let mut grid = esd_metadata();
    grid.extend(rows);
    grid
}
