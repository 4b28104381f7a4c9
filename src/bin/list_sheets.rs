/// List the sheet names of a workbook, one per line, in workbook order
use std::env;

use metric_flatten::workbook::{list_sheet_names, open_workbook};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        return Err("usage: list-sheets <WORKBOOK>".into());
    };

    let workbook = open_workbook(path)?;
    for name in list_sheet_names(&workbook) {
        println!("{name}");
    }

    Ok(())
}
