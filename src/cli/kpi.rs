use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{employee_names, label_or_unknown, name_of, open_db, parse_date_opt};
use crate::error::Result;
use crate::fmt::number;
use crate::kpi::validate_ranking_table;
use crate::models::Actor;
use crate::report::NOT_AVAILABLE;
use crate::store;

pub fn record(actor: &Actor, employee: i64, value: f64, date: Option<String>) -> Result<()> {
    let conn = open_db()?;
    let entry = store::record_kpi(&conn, actor, employee, value, parse_date_opt(date.as_deref())?)?;
    let ranking = match entry.ranking_id {
        Some(id) => {
            let rankings = store::list_kpi_rankings(&conn)?;
            label_or_unknown(rankings.iter().find(|r| r.id == id).map(|r| r.name.as_str()))
        }
        None => "no tier".yellow().to_string(),
    };
    println!("Recorded KPI {} for employee #{employee} ({ranking})", number(value));
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let names = employee_names(&conn)?;
    let rankings = store::list_kpi_rankings(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Employee", "Date", "Year", "KPI", "Ranking"]);
    for k in store::list_kpis(&conn)? {
        let ranking = match k.ranking_id {
            Some(id) => label_or_unknown(rankings.iter().find(|r| r.id == id).map(|r| r.name.as_str())),
            None => NOT_AVAILABLE.to_string(),
        };
        table.add_row(vec![
            Cell::new(k.id.unwrap_or_default()),
            Cell::new(name_of(&names, k.employee_id)),
            Cell::new(k.calculation_date),
            Cell::new(k.year),
            Cell::new(number(k.value)),
            Cell::new(ranking),
        ]);
    }
    println!("KPI entries\n{table}");
    Ok(())
}

pub fn rankings() -> Result<()> {
    let conn = open_db()?;
    let rankings = store::list_kpi_rankings(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Min", "Max"]);
    for r in &rankings {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(&r.name),
            Cell::new(number(r.min_value)),
            Cell::new(number(r.max_value)),
        ]);
    }
    println!("KPI rankings\n{table}");

    for warning in validate_ranking_table(&rankings)? {
        println!("{} {warning}", "warning:".yellow().bold());
    }
    Ok(())
}
