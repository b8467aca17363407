use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{employee_names, name_of, now, open_db, parse_date_opt};
use crate::error::Result;
use crate::fmt::money;
use crate::models::Actor;
use crate::payroll::{compute_salary_with, Rounding, SalaryBreakdown, SalaryInput};
use crate::store;

fn breakdown_table(b: &SalaryBreakdown) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Component", "Amount"]);
    table.add_row(vec![Cell::new("Basic salary"), Cell::new(money(b.basic_salary))]);
    table.add_row(vec![Cell::new("Overtime"), Cell::new(money(b.ot_pay))]);
    table.add_row(vec![Cell::new("Bonus"), Cell::new(money(b.bonus_pay))]);
    table.add_row(vec![Cell::new("Increment"), Cell::new(money(b.increment_pay))]);
    table.add_row(vec![
        Cell::new("No-pay deduction"),
        Cell::new(format!("-{}", money(b.no_pay_deduction))),
    ]);
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money(b.total_salary).bold()),
    ]);
    table
}

pub fn calc(input: SalaryInput, cents: bool) -> Result<()> {
    let rounding = if cents { Rounding::Cents } else { Rounding::WholeUnit };
    let breakdown = compute_salary_with(&input, rounding)?;
    println!("Salary\n{}", breakdown_table(&breakdown));
    Ok(())
}

pub fn record(actor: &Actor, employee: i64, date: Option<String>, input: SalaryInput) -> Result<()> {
    let conn = open_db()?;
    let date = parse_date_opt(date.as_deref())?;
    let entry = store::record_salary(&conn, actor, employee, date, &input)?;
    let breakdown = SalaryBreakdown {
        basic_salary: entry.basic_salary,
        ot_pay: entry.ot_pay,
        bonus_pay: entry.bonus_pay,
        increment_pay: entry.increment_pay,
        no_pay_deduction: entry.no_pay_deduction,
        total_salary: entry.total_salary,
    };
    println!(
        "Recorded salary #{} for employee #{employee} on {date}\n{}",
        entry.id.unwrap_or_default(),
        breakdown_table(&breakdown)
    );
    Ok(())
}

pub fn process(actor: &Actor, id: i64) -> Result<()> {
    let conn = open_db()?;
    let entry = store::process_salary(&conn, actor, id, now())?;
    println!(
        "Processed salary #{id} ({}) by {}",
        money(entry.total_salary),
        actor.name
    );
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let entries = store::list_salaries(&conn)?;
    let names = employee_names(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Employee", "Date", "Basic", "Total", "Status", "Processed By"]);
    for e in &entries {
        table.add_row(vec![
            Cell::new(e.id.unwrap_or_default()),
            Cell::new(name_of(&names, e.employee_id)),
            Cell::new(e.salary_date),
            Cell::new(money(e.basic_salary)),
            Cell::new(money(e.total_salary)),
            Cell::new(e.status().as_str()),
            Cell::new(e.processed_by.as_deref().unwrap_or("")),
        ]);
    }
    println!("Salaries\n{table}");
    Ok(())
}
