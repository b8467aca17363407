use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::{money, number};
use crate::importer::import_employees;
use crate::models::Actor;
use crate::store::{self, EmployeeUpdate, NewEmployee};

pub fn add(
    actor: &Actor,
    name: &str,
    department: &str,
    position: &str,
    salary: f64,
    satisfaction: f64,
) -> Result<()> {
    let conn = open_db()?;
    let employee = store::add_employee(
        &conn,
        actor,
        &NewEmployee {
            full_name: name.to_string(),
            department: department.to_string(),
            role: position.to_string(),
            basic_salary: salary,
            satisfaction_score: satisfaction,
        },
    )?;
    println!("Added employee #{}: {}", employee.id, employee.full_name);
    Ok(())
}

pub fn list(all: bool) -> Result<()> {
    let conn = open_db()?;
    let employees = store::list_employees(&conn, all)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Department", "Role", "Basic Salary", "KPI", "Active"]);
    for e in &employees {
        let active = if e.is_active {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        };
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(&e.full_name),
            Cell::new(&e.department),
            Cell::new(&e.role),
            Cell::new(money(e.basic_salary)),
            Cell::new(number(e.kpi_score)),
            Cell::new(active),
        ]);
    }
    println!("Employees\n{table}");
    Ok(())
}

pub fn update(
    actor: &Actor,
    id: i64,
    department: Option<String>,
    position: Option<String>,
    salary: Option<f64>,
) -> Result<()> {
    let conn = open_db()?;
    let employee = store::update_employee(
        &conn,
        actor,
        id,
        &EmployeeUpdate {
            department,
            role: position,
            basic_salary: salary,
        },
    )?;
    println!(
        "Updated #{}: {} / {} / {}",
        employee.id,
        employee.department,
        employee.role,
        money(employee.basic_salary)
    );
    Ok(())
}

pub fn deactivate(actor: &Actor, id: i64) -> Result<()> {
    let conn = open_db()?;
    store::deactivate_employee(&conn, actor, id)?;
    println!("Deactivated employee #{id}");
    Ok(())
}

pub fn import(actor: &Actor, file: &str) -> Result<()> {
    let conn = open_db()?;
    let result = import_employees(&conn, actor, Path::new(file))?;
    if result.duplicate_file {
        println!("{}", "This file has already been imported.".yellow());
        return Ok(());
    }
    println!(
        "Imported {} employees ({} skipped)",
        result.imported, result.skipped
    );
    Ok(())
}
