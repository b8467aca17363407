use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{employee_names, name_of, open_db, parse_month};
use crate::error::Result;
use crate::fmt::money;
use crate::models::Actor;
use crate::store;

pub fn generate(actor: &Actor, month: &str) -> Result<()> {
    let conn = open_db()?;
    let summary = store::generate_contributions(&conn, actor, parse_month(month)?)?;
    println!(
        "Generated EPF/ETF for {} employees in {month} ({} skipped)",
        summary.created, summary.skipped
    );
    Ok(())
}

pub fn process(actor: &Actor, month: &str) -> Result<()> {
    let conn = open_db()?;
    let changed = store::process_contributions(&conn, actor, parse_month(month)?)?;
    if changed == 0 {
        println!("{}", format!("No pending contributions for {month}.").yellow());
    } else {
        println!("Processed {changed} contribution rows for {month}");
    }
    Ok(())
}

pub fn list(month: &str) -> Result<()> {
    let conn = open_db()?;
    let month = parse_month(month)?;
    let names = employee_names(&conn)?;

    let mut epf_table = Table::new();
    epf_table.set_header(vec!["Employee", "Basic", "Employee 8%", "Employer 12%", "Total", "Status"]);
    let mut epf_total = 0.0;
    for c in store::list_epf(&conn)?.into_iter().filter(|c| c.month == month) {
        epf_total += c.total_contribution;
        epf_table.add_row(vec![
            Cell::new(name_of(&names, c.employee_id)),
            Cell::new(money(c.basic_salary)),
            Cell::new(money(c.employee_contribution)),
            Cell::new(money(c.employer_contribution)),
            Cell::new(money(c.total_contribution)),
            Cell::new(c.status.as_str()),
        ]);
    }
    epf_table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(money(epf_total).bold()),
        Cell::new(""),
    ]);

    let mut etf_table = Table::new();
    etf_table.set_header(vec!["Employee", "Basic", "Employer 3%", "Status"]);
    let mut etf_total = 0.0;
    for c in store::list_etf(&conn)?.into_iter().filter(|c| c.month == month) {
        etf_total += c.employer_contribution;
        etf_table.add_row(vec![
            Cell::new(name_of(&names, c.employee_id)),
            Cell::new(money(c.basic_salary)),
            Cell::new(money(c.employer_contribution)),
            Cell::new(c.status.as_str()),
        ]);
    }
    etf_table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(money(etf_total).bold()),
        Cell::new(""),
    ]);

    let label = month.format("%Y-%m");
    println!("EPF {label}\n{epf_table}\n\nETF {label}\n{etf_table}");
    Ok(())
}
