use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{employee_names, name_of, open_db, parse_date_opt};
use crate::error::{PayrollError, Result};
use crate::fmt::{money, number};
use crate::models::{Actor, Overtime, OvertimeStatus, OvertimeType};
use crate::store;

pub fn add(
    actor: &Actor,
    employee: i64,
    hours: f64,
    rate: f64,
    ot_type: &str,
    date: Option<String>,
) -> Result<()> {
    let conn = open_db()?;
    let ot_type = OvertimeType::parse(ot_type)
        .ok_or_else(|| PayrollError::Other(format!("Unknown overtime type: {ot_type}")))?;
    let overtime = Overtime::new(employee, hours, rate, ot_type, parse_date_opt(date.as_deref())?)?;
    let id = store::add_overtime(&conn, actor, &overtime)?;
    println!(
        "Recorded overtime #{id}: {} h x {} = {}",
        number(overtime.hours),
        money(overtime.rate_per_hour),
        money(overtime.amount)
    );
    Ok(())
}

pub fn approve(actor: &Actor, id: i64) -> Result<()> {
    let conn = open_db()?;
    let overtime = store::approve_overtime(&conn, actor, id)?;
    println!("Approved overtime #{id} ({})", money(overtime.amount));
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let names = employee_names(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Employee", "Date", "Type", "Hours", "Rate", "Amount", "Status"]);
    for o in store::list_overtime(&conn)? {
        let status = match o.status {
            OvertimeStatus::Pending => o.status.as_str().yellow().to_string(),
            OvertimeStatus::Approved => o.status.as_str().green().to_string(),
        };
        table.add_row(vec![
            Cell::new(o.id.unwrap_or_default()),
            Cell::new(name_of(&names, o.employee_id)),
            Cell::new(o.date),
            Cell::new(o.ot_type.as_str()),
            Cell::new(number(o.hours)),
            Cell::new(money(o.rate_per_hour)),
            Cell::new(money(o.amount)),
            Cell::new(status),
        ]);
    }
    println!("Overtime\n{table}");
    Ok(())
}
