pub mod bonus;
pub mod contributions;
pub mod employees;
pub mod export;
pub mod init;
pub mod kpi;
pub mod loans;
pub mod overtime;
pub mod report;
pub mod salary;
pub mod status;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{PayrollError, Result};
use crate::models::{Actor, Role};
use crate::report::{parse_date, resolve_or_placeholder, UNKNOWN};
use crate::settings::{load_settings, Settings};
use crate::store::list_employees;

pub(crate) fn open_db() -> Result<Connection> {
    let path = load_settings().db_path();
    if !path.exists() {
        return Err(PayrollError::Other(
            "Database not found. Run `hrpay init` to set up.".to_string(),
        ));
    }
    get_connection(&path)
}

/// Display names for every employee, including deactivated ones.
pub(crate) fn employee_names(conn: &Connection) -> Result<HashMap<i64, String>> {
    Ok(list_employees(conn, true)?
        .into_iter()
        .map(|e| (e.id, e.full_name))
        .collect())
}

pub(crate) fn name_of(names: &HashMap<i64, String>, id: i64) -> String {
    label_or_unknown(names.get(&id).map(String::as_str))
}

/// A looked-up name, or the same placeholder reports use for a dangling reference.
pub(crate) fn label_or_unknown(name: Option<&str>) -> String {
    resolve_or_placeholder(name, UNKNOWN).to_string()
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub(crate) fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub(crate) fn parse_date_opt(date: Option<&str>) -> Result<NaiveDate> {
    date.map(parse_date).unwrap_or_else(|| Ok(today()))
}

/// `YYYY-MM` to the first day of that month.
pub(crate) fn parse_month(month: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| PayrollError::InvalidDateRange(format!("'{month}' is not a YYYY-MM month")))
}

#[derive(Parser)]
#[command(name = "hrpay", about = "Payroll, statutory contributions and HR reports.")]
pub struct Cli {
    /// Act as this user (default: user_name from settings)
    #[arg(long = "as", global = true)]
    pub acting_as: Option<String>,
    /// Act with this role: admin, hr, manager, accountant, ceo, employee
    #[arg(long, global = true)]
    pub role: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The acting identity for this invocation.
    pub fn actor(&self) -> Result<Actor> {
        self.actor_with(&load_settings())
    }

    fn actor_with(&self, settings: &Settings) -> Result<Actor> {
        let role = match &self.role {
            Some(r) => Some(
                Role::parse(r).ok_or_else(|| PayrollError::Other(format!("Unknown role: {r}")))?,
            ),
            None => None,
        };
        Ok(settings.actor(self.acting_as.as_deref(), role))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and initialize the database.
    Init {
        /// Path for hrpay data (default: ~/Documents/hrpay)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Company name shown on exported reports
        #[arg(long)]
        company: Option<String>,
        /// Default acting user name
        #[arg(long)]
        user: Option<String>,
    },
    /// Show current database and summary statistics.
    Status,
    /// Manage employees.
    Employees {
        #[command(subcommand)]
        command: EmployeesCommands,
    },
    /// Compute and record salaries.
    Salary {
        #[command(subcommand)]
        command: SalaryCommands,
    },
    /// Generate and process EPF/ETF contributions.
    Contributions {
        #[command(subcommand)]
        command: ContributionsCommands,
    },
    /// Manage bonuses.
    Bonus {
        #[command(subcommand)]
        command: BonusCommands,
    },
    /// Record and approve overtime.
    Overtime {
        #[command(subcommand)]
        command: OvertimeCommands,
    },
    /// Loan types, eligibility and requests.
    Loans {
        #[command(subcommand)]
        command: LoansCommands,
    },
    /// Record KPI values and view rankings.
    Kpi {
        #[command(subcommand)]
        command: KpiCommands,
    },
    /// Build a report for a date range, optionally exporting it.
    Report {
        /// Report type: salary, epf, etf, loan, bonus, overtime, kpi
        kind: String,
        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long = "from")]
        from_date: String,
        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long = "to")]
        to_date: String,
        /// Export format: spreadsheet or document
        #[arg(long)]
        export: Option<String>,
        /// Output file path (default: <data_dir>/exports/<kind>-<date>.<ext>)
        #[arg(long)]
        output: Option<String>,
        /// Add a Summary sheet of totals to spreadsheet exports
        #[arg(long = "summary-sheet")]
        summary_sheet: bool,
    },
}

#[derive(Subcommand)]
pub enum EmployeesCommands {
    /// Hire a new employee.
    Add {
        /// Full name
        name: String,
        #[arg(long)]
        department: String,
        /// Job role, e.g. staff or probation
        #[arg(long)]
        position: String,
        /// Monthly basic salary
        #[arg(long)]
        salary: f64,
        #[arg(long, default_value = "0")]
        satisfaction: f64,
    },
    /// List employees.
    List {
        /// Include deactivated employees
        #[arg(long)]
        all: bool,
    },
    /// Change department, job role or basic salary.
    Update {
        id: i64,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        salary: Option<f64>,
    },
    /// Deactivate an employee (history is kept).
    Deactivate { id: i64 },
    /// Import employees from a CSV or XLSX roster.
    Import {
        /// Roster with full_name, department, role, basic_salary columns
        file: String,
    },
}

#[derive(Subcommand)]
pub enum SalaryCommands {
    /// Compute a salary breakdown without saving it.
    Calc {
        #[arg(long)]
        basic: f64,
        #[arg(long = "ot-hours", default_value = "0")]
        ot_hours: f64,
        #[arg(long = "ot-rate", default_value = "0")]
        ot_rate: f64,
        #[arg(long, default_value = "0")]
        bonus: f64,
        #[arg(long, default_value = "0")]
        increment: f64,
        #[arg(long = "no-pay-days", default_value = "0")]
        no_pay_days: f64,
        /// Keep cents instead of rounding to whole units
        #[arg(long)]
        cents: bool,
    },
    /// Compute and store a pending salary entry for an employee.
    Record {
        employee: i64,
        /// Salary date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "ot-hours", default_value = "0")]
        ot_hours: f64,
        #[arg(long = "ot-rate", default_value = "0")]
        ot_rate: f64,
        #[arg(long, default_value = "0")]
        bonus: f64,
        #[arg(long, default_value = "0")]
        increment: f64,
        #[arg(long = "no-pay-days", default_value = "0")]
        no_pay_days: f64,
    },
    /// Mark a salary entry processed.
    Process { id: i64 },
    /// List salary entries.
    List,
}

#[derive(Subcommand)]
pub enum ContributionsCommands {
    /// Create pending EPF/ETF rows for every active employee.
    Generate {
        /// Month: YYYY-MM
        month: String,
    },
    /// Mark a month's pending contributions processed.
    Process {
        /// Month: YYYY-MM
        month: String,
    },
    /// Show EPF and ETF rows for a month.
    List {
        /// Month: YYYY-MM
        month: String,
    },
}

#[derive(Subcommand)]
pub enum BonusCommands {
    /// Grant a bonus.
    Add {
        employee: i64,
        #[arg(long)]
        amount: f64,
        /// performance, festival, annual, attendance, special
        #[arg(long = "type", default_value = "performance")]
        bonus_type: String,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// List bonuses.
    List,
    /// Delete a bonus.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum OvertimeCommands {
    /// Record overtime hours.
    Add {
        employee: i64,
        #[arg(long)]
        hours: f64,
        #[arg(long)]
        rate: f64,
        /// weekday, weekend, holiday
        #[arg(long = "type", default_value = "weekday")]
        ot_type: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Approve a pending overtime entry.
    Approve { id: i64 },
    /// List overtime entries.
    List,
}

#[derive(Subcommand)]
pub enum LoansCommands {
    /// List loan types.
    Types,
    /// Check an employee's eligibility for every loan type.
    Eligibility { employee: i64 },
    /// Submit a loan request.
    Request {
        employee: i64,
        /// Loan type name, e.g. "staff" or "Home Loan"
        #[arg(long = "type")]
        loan_type: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        months: u32,
        #[arg(long, default_value = "0")]
        interest: f64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Approve a pending loan request.
    Approve { id: i64 },
    /// Reject a pending loan request.
    Reject { id: i64 },
    /// List loan requests.
    List,
}

#[derive(Subcommand)]
pub enum KpiCommands {
    /// Record a KPI value (0-100) for an employee.
    Record {
        employee: i64,
        value: f64,
        #[arg(long)]
        date: Option<String>,
    },
    /// List KPI entries.
    List,
    /// Show the ranking table and any coverage problems.
    Rankings,
}
