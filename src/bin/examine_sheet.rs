/// Print the top-left corner of a sheet with 0-based row/column indices,
/// for working out metadata rows and column offsets of a new workbook layout
use calamine::{Data, DataType};
use std::env;

use metric_flatten::workbook::{list_sheet_names, open_workbook, SheetSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let Some(file_path) = args.get(1) else {
        return Err("usage: examine-sheet <WORKBOOK> [SHEET] [ROWS]".into());
    };

    println!("Opening workbook: {file_path}");
    let mut workbook = open_workbook(file_path)?;

    let names = list_sheet_names(&workbook);
    println!("\nSheet names:");
    for (i, name) in names.iter().enumerate() {
        println!("  {i}: {name}");
    }

    let sheet_name = match args.get(2) {
        Some(name) => name.clone(),
        None => names.first().cloned().ok_or("workbook has no sheets")?,
    };
    let max_rows: usize = match args.get(3) {
        Some(rows) => rows.parse()?,
        None => 20,
    };

    println!("\n\nExamining sheet: {sheet_name}");
    println!("{}", "=".repeat(100));

    let range = workbook.sheet_range(&sheet_name)?;
    println!("Dimensions: {:?} (start {:?})", range.get_size(), range.start());
    println!("\nFirst {max_rows} rows (showing first 10 columns):");
    println!("{}", "=".repeat(100));

    let Some((start_row, start_col)) = range.start() else {
        println!("[sheet is empty]");
        return Ok(());
    };

    for (offset, row) in range.rows().enumerate().take(max_rows) {
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        print!("Row {:3}: ", start_row as usize + offset);
        for (col_offset, cell) in row.iter().enumerate().take(10) {
            let col = start_col as usize + col_offset;
            match cell {
                Data::Empty => print!("[{col}:empty] "),
                other => print!("[{col}:{other}] "),
            }
        }
        println!();
    }

    Ok(())
}
