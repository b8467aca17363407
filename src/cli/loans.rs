use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{employee_names, label_or_unknown, name_of, now, open_db, parse_date_opt};
use crate::eligibility::evaluate_loan_eligibility;
use crate::error::Result;
use crate::fmt::money;
use crate::models::{Actor, LoanStatus};
use crate::store::{self, LoanApplication};

pub fn types() -> Result<()> {
    let conn = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Description"]);
    for t in store::list_loan_types(&conn)? {
        table.add_row(vec![Cell::new(t.id), Cell::new(&t.name), Cell::new(&t.description)]);
    }
    println!("Loan types\n{table}");
    Ok(())
}

pub fn eligibility(employee_id: i64) -> Result<()> {
    let conn = open_db()?;
    let employee = store::get_employee(&conn, employee_id)?;
    let loan_types = store::list_loan_types(&conn)?;
    let results = evaluate_loan_eligibility(&employee, &loan_types)?;

    let mut table = Table::new();
    table.set_header(vec!["Loan Type", "Eligible", "Max Amount", "Reasons"]);
    for r in &results {
        let eligible = if r.eligible {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        };
        table.add_row(vec![
            Cell::new(&r.loan_type.name),
            Cell::new(eligible),
            Cell::new(money(r.max_amount)),
            Cell::new(r.reasons.join("\n")),
        ]);
    }
    println!(
        "Loan eligibility for {} ({}, {})\n{table}",
        employee.full_name,
        employee.role,
        money(employee.basic_salary)
    );
    Ok(())
}

pub fn request(
    actor: &Actor,
    employee: i64,
    loan_type: &str,
    amount: f64,
    months: u32,
    interest: f64,
    date: Option<String>,
) -> Result<()> {
    let conn = open_db()?;
    let request = store::submit_loan_request(
        &conn,
        actor,
        &LoanApplication {
            employee_id: employee,
            loan_type: loan_type.to_string(),
            amount,
            duration_months: months,
            interest_rate: interest,
            date: parse_date_opt(date.as_deref())?,
        },
    )?;
    println!(
        "Submitted loan request #{} for {} over {months} months",
        request.id.unwrap_or_default(),
        money(amount)
    );
    Ok(())
}

pub fn decide(actor: &Actor, id: i64, decision: LoanStatus) -> Result<()> {
    let conn = open_db()?;
    let request = store::decide_loan_request(&conn, actor, id, decision, now())?;
    println!("Loan request #{id} {}", request.status.as_str());
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let names = employee_names(&conn)?;
    let loan_types = store::list_loan_types(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Employee", "Date", "Type", "Amount", "Months", "Interest %", "Status"]);
    for r in store::list_loan_requests(&conn)? {
        let type_name = label_or_unknown(
            loan_types
                .iter()
                .find(|t| t.id == r.loan_type_id)
                .map(|t| t.name.as_str()),
        );
        let status = match r.status {
            LoanStatus::Pending => r.status.as_str().yellow().to_string(),
            LoanStatus::Approved => r.status.as_str().green().to_string(),
            LoanStatus::Rejected => r.status.as_str().red().to_string(),
        };
        table.add_row(vec![
            Cell::new(r.id.unwrap_or_default()),
            Cell::new(name_of(&names, r.employee_id)),
            Cell::new(r.date),
            Cell::new(type_name),
            Cell::new(money(r.amount)),
            Cell::new(r.duration_months),
            Cell::new(r.interest_rate),
            Cell::new(status),
        ]);
    }
    println!("Loan requests\n{table}");
    Ok(())
}
