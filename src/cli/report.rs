use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{export, open_db};
use crate::error::Result;
use crate::export::{display_cell, ExportFormat};
use crate::fmt::{money, number};
use crate::report::{total_label, DateRange, Report, ReportKind};
use crate::store::build_report;

fn print_report(report: &Report) {
    let mut table = Table::new();
    table.set_header(report.headers());
    for row in &report.rows {
        table.add_row(
            row.iter()
                .zip(report.columns)
                .map(|(cell, column)| Cell::new(display_cell(cell, column)))
                .collect::<Vec<_>>(),
        );
    }
    println!("{} ({})\n{table}", report.kind.title().bold(), report.range);

    let mut totals = Table::new();
    totals.set_header(vec!["Total", "Value"]);
    for (key, value) in report.ordered_totals() {
        let shown = if report.is_money(key) { money(value) } else { number(value) };
        totals.add_row(vec![Cell::new(total_label(report.columns, key)), Cell::new(shown)]);
    }
    println!("{totals}");

    if report.lookup_misses > 0 {
        println!(
            "{}",
            format!(
                "{} cell(s) reference records that no longer exist.",
                report.lookup_misses
            )
            .yellow()
        );
    }
}

pub fn run(
    kind: &str,
    from_date: &str,
    to_date: &str,
    export_format: Option<&str>,
    output: Option<String>,
    summary_sheet: bool,
) -> Result<()> {
    let kind = ReportKind::parse(kind)?;
    let range = DateRange::parse(from_date, to_date)?;
    let format = export_format.map(ExportFormat::parse).transpose()?;

    let conn = open_db()?;
    let report = build_report(&conn, kind, range)?;

    match format {
        Some(format) => {
            export::write_report(&report, format, output, summary_sheet)?;
        }
        None => print_report(&report),
    }
    Ok(())
}
