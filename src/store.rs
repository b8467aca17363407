use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};

use crate::eligibility::evaluate_loan_eligibility;
use crate::error::{PayrollError, Result};
use crate::kpi::{rank_kpi, validate_kpi_value};
use crate::models::*;
use crate::payroll::{compute_epf, compute_etf, compute_salary, SalaryInput};
use crate::report::{assemble_report, DateRange, Report, ReportContext, ReportKind};

const OVERTIME_RECORDERS: &[Role] = &[Role::Admin, Role::Hr, Role::Manager, Role::Accountant];

fn bad_value(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unexpected value '{value}'").into(),
    )
}

fn parsed<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| bad_value(idx, &raw))
}

fn require_employee(conn: &Connection, id: i64) -> Result<Employee> {
    get_employee(conn, id)
}

// ---------------------------------------------------------------------------
// Employees
// ---------------------------------------------------------------------------

const EMPLOYEE_COLS: &str =
    "id, full_name, department, role, basic_salary, is_active, kpi_score, satisfaction_score";

fn employee_from_row(row: &Row) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        full_name: row.get(1)?,
        department: row.get(2)?,
        role: row.get(3)?,
        basic_salary: row.get(4)?,
        is_active: row.get::<_, i64>(5)? != 0,
        kpi_score: row.get(6)?,
        satisfaction_score: row.get(7)?,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub full_name: String,
    pub department: String,
    pub role: String,
    pub basic_salary: f64,
    pub satisfaction_score: f64,
}

/// Fields a promotion or profile edit may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeUpdate {
    pub department: Option<String>,
    pub role: Option<String>,
    pub basic_salary: Option<f64>,
}

fn check_salary(basic_salary: f64) -> Result<()> {
    if !basic_salary.is_finite() || basic_salary < 0.0 {
        return Err(PayrollError::InvalidAmount(format!(
            "basic salary must be zero or more, got {basic_salary}"
        )));
    }
    Ok(())
}

pub fn add_employee(conn: &Connection, actor: &Actor, new: &NewEmployee) -> Result<Employee> {
    actor.require(EMPLOYEE_WRITERS, "add employees")?;
    check_salary(new.basic_salary)?;
    if new.full_name.trim().is_empty() {
        return Err(PayrollError::Other("employee name must not be empty".to_string()));
    }
    conn.execute(
        "INSERT INTO employees (full_name, department, role, basic_salary, satisfaction_score) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.full_name.trim(),
            new.department.trim(),
            new.role.trim(),
            new.basic_salary,
            new.satisfaction_score
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(employee_id = id, by = %actor.name, "employee added");
    get_employee(conn, id)
}

pub fn get_employee(conn: &Connection, id: i64) -> Result<Employee> {
    conn.query_row(
        &format!("SELECT {EMPLOYEE_COLS} FROM employees WHERE id = ?1"),
        [id],
        employee_from_row,
    )
    .optional()?
    .ok_or(PayrollError::LookupMiss {
        entity: "employee",
        id,
    })
}

pub fn list_employees(conn: &Connection, include_inactive: bool) -> Result<Vec<Employee>> {
    let sql = if include_inactive {
        format!("SELECT {EMPLOYEE_COLS} FROM employees ORDER BY id")
    } else {
        format!("SELECT {EMPLOYEE_COLS} FROM employees WHERE is_active = 1 ORDER BY id")
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], employee_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_employee(
    conn: &Connection,
    actor: &Actor,
    id: i64,
    update: &EmployeeUpdate,
) -> Result<Employee> {
    actor.require(EMPLOYEE_WRITERS, "update employees")?;
    let mut employee = require_employee(conn, id)?;
    if let Some(department) = &update.department {
        employee.department = department.trim().to_string();
    }
    if let Some(role) = &update.role {
        employee.role = role.trim().to_string();
    }
    if let Some(basic_salary) = update.basic_salary {
        check_salary(basic_salary)?;
        employee.basic_salary = basic_salary;
    }
    conn.execute(
        "UPDATE employees SET department = ?1, role = ?2, basic_salary = ?3 WHERE id = ?4",
        params![employee.department, employee.role, employee.basic_salary, id],
    )?;
    info!(employee_id = id, by = %actor.name, "employee updated");
    Ok(employee)
}

/// Soft delete; history rows keep pointing at the employee.
pub fn deactivate_employee(conn: &Connection, actor: &Actor, id: i64) -> Result<()> {
    actor.require(EMPLOYEE_WRITERS, "deactivate employees")?;
    require_employee(conn, id)?;
    conn.execute("UPDATE employees SET is_active = 0 WHERE id = ?1", [id])?;
    info!(employee_id = id, by = %actor.name, "employee deactivated");
    Ok(())
}

// ---------------------------------------------------------------------------
// Salary
// ---------------------------------------------------------------------------

const SALARY_COLS: &str = "id, employee_id, basic_salary, ot_pay, bonus_pay, increment_pay, \
     no_pay_deduction, total_salary, salary_date, processed_by, processed_at";

fn salary_from_row(row: &Row) -> rusqlite::Result<SalaryEntry> {
    Ok(SalaryEntry {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        basic_salary: row.get(2)?,
        ot_pay: row.get(3)?,
        bonus_pay: row.get(4)?,
        increment_pay: row.get(5)?,
        no_pay_deduction: row.get(6)?,
        total_salary: row.get(7)?,
        salary_date: row.get(8)?,
        processed_by: row.get(9)?,
        processed_at: row.get(10)?,
    })
}

/// Computes and stores a pending pay-cycle entry. The basic salary always
/// comes from the employee record; `input.basic_salary` is ignored.
pub fn record_salary(
    conn: &Connection,
    actor: &Actor,
    employee_id: i64,
    salary_date: NaiveDate,
    input: &SalaryInput,
) -> Result<SalaryEntry> {
    actor.require(PAYROLL_WRITERS, "record salaries")?;
    let employee = require_employee(conn, employee_id)?;
    let input = SalaryInput {
        basic_salary: employee.basic_salary,
        ..*input
    };
    let breakdown = compute_salary(&input)?;
    let mut entry = SalaryEntry::from_breakdown(employee_id, salary_date, &breakdown);
    conn.execute(
        "INSERT INTO salaries (employee_id, basic_salary, ot_pay, bonus_pay, increment_pay, no_pay_deduction, total_salary, salary_date) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.employee_id,
            entry.basic_salary,
            entry.ot_pay,
            entry.bonus_pay,
            entry.increment_pay,
            entry.no_pay_deduction,
            entry.total_salary,
            entry.salary_date
        ],
    )?;
    entry.id = Some(conn.last_insert_rowid());
    info!(employee_id, total = entry.total_salary, by = %actor.name, "salary recorded");
    Ok(entry)
}

pub fn get_salary(conn: &Connection, id: i64) -> Result<SalaryEntry> {
    conn.query_row(
        &format!("SELECT {SALARY_COLS} FROM salaries WHERE id = ?1"),
        [id],
        salary_from_row,
    )
    .optional()?
    .ok_or(PayrollError::LookupMiss {
        entity: "salary entry",
        id,
    })
}

pub fn process_salary(
    conn: &Connection,
    actor: &Actor,
    id: i64,
    at: NaiveDateTime,
) -> Result<SalaryEntry> {
    actor.require(PAYROLL_WRITERS, "process salaries")?;
    let mut entry = get_salary(conn, id)?;
    entry.process(actor, at)?;
    conn.execute(
        "UPDATE salaries SET processed_by = ?1, processed_at = ?2 WHERE id = ?3",
        params![entry.processed_by, entry.processed_at, id],
    )?;
    info!(salary_id = id, by = %actor.name, "salary processed");
    Ok(entry)
}

pub fn list_salaries(conn: &Connection) -> Result<Vec<SalaryEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SALARY_COLS} FROM salaries ORDER BY salary_date, id"
    ))?;
    let rows = stmt
        .query_map([], salary_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Statutory contributions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub created: usize,
    pub skipped: usize,
}

fn epf_from_row(row: &Row) -> rusqlite::Result<EpfContribution> {
    Ok(EpfContribution {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        basic_salary: row.get(2)?,
        employee_contribution: row.get(3)?,
        employer_contribution: row.get(4)?,
        total_contribution: row.get(5)?,
        month: row.get(6)?,
        status: parsed(row, 7, ContributionStatus::parse)?,
    })
}

fn etf_from_row(row: &Row) -> rusqlite::Result<EtfContribution> {
    Ok(EtfContribution {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        basic_salary: row.get(2)?,
        employer_contribution: row.get(3)?,
        month: row.get(4)?,
        status: parsed(row, 5, ContributionStatus::parse)?,
    })
}

/// Creates pending EPF and ETF rows for `month` for every active employee
/// with a positive basic salary. Employees that already have a row for the
/// month are skipped, so re-running is harmless.
pub fn generate_contributions(
    conn: &Connection,
    actor: &Actor,
    month: NaiveDate,
) -> Result<GenerateSummary> {
    actor.require(PAYROLL_WRITERS, "generate contributions")?;
    let month = month_start(month);
    let tx = conn.unchecked_transaction()?;
    let mut summary = GenerateSummary::default();

    for employee in list_employees(&tx, false)? {
        if employee.basic_salary <= 0.0 {
            summary.skipped += 1;
            continue;
        }
        let exists = tx
            .prepare_cached("SELECT 1 FROM epf_contributions WHERE employee_id = ?1 AND month = ?2")?
            .exists(params![employee.id, month])?;
        if exists {
            summary.skipped += 1;
            continue;
        }

        let epf = compute_epf(employee.basic_salary)?;
        let etf = compute_etf(employee.basic_salary)?;
        tx.execute(
            "INSERT INTO epf_contributions (employee_id, basic_salary, employee_contribution, employer_contribution, total_contribution, month, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending')",
            params![
                employee.id,
                employee.basic_salary,
                epf.employee_contribution,
                epf.employer_contribution,
                epf.total_contribution,
                month
            ],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO etf_contributions (employee_id, basic_salary, employer_contribution, month, status) VALUES (?1, ?2, ?3, ?4, 'pending')",
            params![employee.id, employee.basic_salary, etf, month],
        )?;
        summary.created += 1;
    }

    tx.commit()?;
    info!(%month, created = summary.created, skipped = summary.skipped, by = %actor.name, "contributions generated");
    Ok(summary)
}

/// Marks every pending EPF and ETF row for `month` processed. Returns the
/// number of rows changed.
pub fn process_contributions(conn: &Connection, actor: &Actor, month: NaiveDate) -> Result<usize> {
    actor.require(PAYROLL_WRITERS, "process contributions")?;
    let month = month_start(month);
    let next = ContributionStatus::Pending.process()?;
    let tx = conn.unchecked_transaction()?;
    let mut changed = 0;
    for table in ["epf_contributions", "etf_contributions"] {
        changed += tx.execute(
            &format!("UPDATE {table} SET status = ?1 WHERE month = ?2 AND status = 'pending'"),
            params![next.as_str(), month],
        )?;
    }
    tx.commit()?;
    info!(%month, changed, by = %actor.name, "contributions processed");
    Ok(changed)
}

pub fn list_epf(conn: &Connection) -> Result<Vec<EpfContribution>> {
    let mut stmt = conn.prepare(
        "SELECT id, employee_id, basic_salary, employee_contribution, employer_contribution, total_contribution, month, status FROM epf_contributions ORDER BY month, employee_id",
    )?;
    let rows = stmt
        .query_map([], epf_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_etf(conn: &Connection) -> Result<Vec<EtfContribution>> {
    let mut stmt = conn.prepare(
        "SELECT id, employee_id, basic_salary, employer_contribution, month, status FROM etf_contributions ORDER BY month, employee_id",
    )?;
    let rows = stmt
        .query_map([], etf_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Bonuses
// ---------------------------------------------------------------------------

pub fn add_bonus(conn: &Connection, actor: &Actor, bonus: &Bonus) -> Result<i64> {
    actor.require(PAYROLL_WRITERS, "add bonuses")?;
    require_employee(conn, bonus.employee_id)?;
    conn.execute(
        "INSERT INTO bonuses (employee_id, amount, bonus_type, reason, date) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            bonus.employee_id,
            bonus.amount,
            bonus.bonus_type.as_str(),
            bonus.reason,
            bonus.date
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(bonus_id = id, employee_id = bonus.employee_id, amount = bonus.amount, "bonus added");
    Ok(id)
}

pub fn delete_bonus(conn: &Connection, actor: &Actor, id: i64) -> Result<()> {
    actor.require(PAYROLL_WRITERS, "delete bonuses")?;
    let deleted = conn.execute("DELETE FROM bonuses WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(PayrollError::LookupMiss { entity: "bonus", id });
    }
    info!(bonus_id = id, by = %actor.name, "bonus deleted");
    Ok(())
}

pub fn list_bonuses(conn: &Connection) -> Result<Vec<Bonus>> {
    let mut stmt = conn.prepare(
        "SELECT id, employee_id, amount, bonus_type, reason, date FROM bonuses ORDER BY date, id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Bonus {
                id: row.get(0)?,
                employee_id: row.get(1)?,
                amount: row.get(2)?,
                bonus_type: parsed(row, 3, BonusType::parse)?,
                reason: row.get(4)?,
                date: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Overtime
// ---------------------------------------------------------------------------

const OVERTIME_COLS: &str = "id, employee_id, hours, rate_per_hour, amount, ot_type, status, date";

fn overtime_from_row(row: &Row) -> rusqlite::Result<Overtime> {
    Ok(Overtime {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        hours: row.get(2)?,
        rate_per_hour: row.get(3)?,
        amount: row.get(4)?,
        ot_type: parsed(row, 5, OvertimeType::parse)?,
        status: parsed(row, 6, OvertimeStatus::parse)?,
        date: row.get(7)?,
    })
}

pub fn add_overtime(conn: &Connection, actor: &Actor, overtime: &Overtime) -> Result<i64> {
    actor.require(OVERTIME_RECORDERS, "record overtime")?;
    require_employee(conn, overtime.employee_id)?;
    conn.execute(
        "INSERT INTO overtime (employee_id, hours, rate_per_hour, amount, ot_type, status, date) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            overtime.employee_id,
            overtime.hours,
            overtime.rate_per_hour,
            overtime.amount,
            overtime.ot_type.as_str(),
            overtime.status.as_str(),
            overtime.date
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(overtime_id = id, employee_id = overtime.employee_id, amount = overtime.amount, "overtime recorded");
    Ok(id)
}

pub fn approve_overtime(conn: &Connection, actor: &Actor, id: i64) -> Result<Overtime> {
    actor.require(APPROVERS, "approve overtime")?;
    let mut overtime = conn
        .query_row(
            &format!("SELECT {OVERTIME_COLS} FROM overtime WHERE id = ?1"),
            [id],
            overtime_from_row,
        )
        .optional()?
        .ok_or(PayrollError::LookupMiss {
            entity: "overtime entry",
            id,
        })?;
    overtime.status = overtime.status.approve()?;
    conn.execute(
        "UPDATE overtime SET status = ?1 WHERE id = ?2",
        params![overtime.status.as_str(), id],
    )?;
    info!(overtime_id = id, by = %actor.name, "overtime approved");
    Ok(overtime)
}

pub fn list_overtime(conn: &Connection) -> Result<Vec<Overtime>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OVERTIME_COLS} FROM overtime ORDER BY date, id"
    ))?;
    let rows = stmt
        .query_map([], overtime_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

const LOAN_COLS: &str = "id, employee_id, loan_type_id, amount, duration_months, interest_rate, \
     date, status, processed_by, processed_at";

fn loan_from_row(row: &Row) -> rusqlite::Result<LoanRequest> {
    Ok(LoanRequest {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        loan_type_id: row.get(2)?,
        amount: row.get(3)?,
        duration_months: row.get(4)?,
        interest_rate: row.get(5)?,
        date: row.get(6)?,
        status: parsed(row, 7, LoanStatus::parse)?,
        processed_by: row.get(8)?,
        processed_at: row.get(9)?,
    })
}

pub fn list_loan_types(conn: &Connection) -> Result<Vec<LoanType>> {
    let mut stmt = conn.prepare("SELECT id, name, description FROM loan_types ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(LoanType {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Matches "Home Loan", "home loan" or just "home".
pub fn find_loan_type(conn: &Connection, name: &str) -> Result<LoanType> {
    let name = name.trim();
    let with_suffix = format!("{name} loan");
    list_loan_types(conn)?
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(name) || t.name.eq_ignore_ascii_case(&with_suffix))
        .ok_or_else(|| PayrollError::UnknownLoanType(name.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoanApplication {
    pub employee_id: i64,
    pub loan_type: String,
    pub amount: f64,
    pub duration_months: u32,
    pub interest_rate: f64,
    pub date: NaiveDate,
}

/// Stores a pending loan request after re-running the eligibility check
/// against the employee's current salary and role.
/// Any role may apply; eligibility is checked against the employee, not the actor.
pub fn submit_loan_request(
    conn: &Connection,
    actor: &Actor,
    application: &LoanApplication,
) -> Result<LoanRequest> {
    let employee = require_employee(conn, application.employee_id)?;
    if !employee.is_active {
        return Err(PayrollError::Ineligible(format!(
            "{} is no longer an active employee",
            employee.full_name
        )));
    }
    let loan_type = find_loan_type(conn, &application.loan_type)?;
    let mut request = LoanRequest::new(
        employee.id,
        &loan_type,
        application.amount,
        application.duration_months,
        application.interest_rate,
        application.date,
    )?;

    let verdict = evaluate_loan_eligibility(&employee, std::slice::from_ref(&loan_type))?
        .into_iter()
        .next()
        .ok_or_else(|| PayrollError::UnknownLoanType(loan_type.name.clone()))?;
    if !verdict.eligible {
        return Err(PayrollError::Ineligible(verdict.reasons.join("; ")));
    }
    if request.amount > verdict.max_amount {
        return Err(PayrollError::Ineligible(format!(
            "requested {} exceeds the {} maximum of {}",
            request.amount, loan_type.name, verdict.max_amount
        )));
    }

    conn.execute(
        "INSERT INTO loan_requests (employee_id, loan_type_id, amount, duration_months, interest_rate, date, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            request.employee_id,
            request.loan_type_id,
            request.amount,
            request.duration_months,
            request.interest_rate,
            request.date,
            request.status.as_str()
        ],
    )?;
    request.id = Some(conn.last_insert_rowid());
    info!(
        employee_id = employee.id,
        loan_type = %loan_type.name,
        amount = request.amount,
        by = %actor.name,
        "loan request submitted"
    );
    Ok(request)
}

pub fn get_loan_request(conn: &Connection, id: i64) -> Result<LoanRequest> {
    conn.query_row(
        &format!("SELECT {LOAN_COLS} FROM loan_requests WHERE id = ?1"),
        [id],
        loan_from_row,
    )
    .optional()?
    .ok_or(PayrollError::LookupMiss {
        entity: "loan request",
        id,
    })
}

pub fn decide_loan_request(
    conn: &Connection,
    actor: &Actor,
    id: i64,
    decision: LoanStatus,
    at: NaiveDateTime,
) -> Result<LoanRequest> {
    actor.require(APPROVERS, "decide loan requests")?;
    let mut request = get_loan_request(conn, id)?;
    request.decide(decision, actor, at)?;
    conn.execute(
        "UPDATE loan_requests SET status = ?1, processed_by = ?2, processed_at = ?3 WHERE id = ?4",
        params![
            request.status.as_str(),
            request.processed_by,
            request.processed_at,
            id
        ],
    )?;
    info!(loan_id = id, status = request.status.as_str(), by = %actor.name, "loan request decided");
    Ok(request)
}

pub fn list_loan_requests(conn: &Connection) -> Result<Vec<LoanRequest>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LOAN_COLS} FROM loan_requests ORDER BY date, id"
    ))?;
    let rows = stmt
        .query_map([], loan_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// KPI
// ---------------------------------------------------------------------------

pub fn list_kpi_rankings(conn: &Connection) -> Result<Vec<KpiRanking>> {
    let mut stmt =
        conn.prepare("SELECT id, name, min_value, max_value FROM kpi_rankings ORDER BY min_value, id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(KpiRanking {
                id: row.get(0)?,
                name: row.get(1)?,
                min_value: row.get(2)?,
                max_value: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Stores a KPI measurement and makes it the employee's current score.
/// An entry whose value falls outside every tier is kept with no ranking.
pub fn record_kpi(
    conn: &Connection,
    actor: &Actor,
    employee_id: i64,
    value: f64,
    date: NaiveDate,
) -> Result<KpiEntry> {
    actor.require(KPI_WRITERS, "record KPI values")?;
    let value = validate_kpi_value(value)?;
    require_employee(conn, employee_id)?;
    let rankings = list_kpi_rankings(conn)?;
    let ranking_id = rank_kpi(value, &rankings)?;
    if ranking_id.is_none() {
        warn!(employee_id, value, "KPI value matches no ranking tier; stored without a rank");
    }

    let mut entry = KpiEntry::new(employee_id, value, date, ranking_id);
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO kpis (employee_id, value, calculation_date, year, ranking_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![entry.employee_id, entry.value, entry.calculation_date, entry.year, entry.ranking_id],
    )?;
    entry.id = Some(tx.last_insert_rowid());
    tx.execute(
        "UPDATE employees SET kpi_score = ?1 WHERE id = ?2",
        params![value, employee_id],
    )?;
    tx.commit()?;
    info!(employee_id, value, ?ranking_id, by = %actor.name, "KPI recorded");
    Ok(entry)
}

pub fn list_kpis(conn: &Connection) -> Result<Vec<KpiEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, employee_id, value, calculation_date, year, ranking_id FROM kpis ORDER BY calculation_date, id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(KpiEntry {
                id: row.get(0)?,
                employee_id: row.get(1)?,
                value: row.get(2)?,
                calculation_date: row.get(3)?,
                year: row.get(4)?,
                ranking_id: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Join data for reports. Inactive employees are included so history still
/// resolves to a name.
pub fn report_context(conn: &Connection) -> Result<ReportContext> {
    Ok(ReportContext::new(&list_employees(conn, true)?)
        .with_loan_types(&list_loan_types(conn)?)
        .with_rankings(&list_kpi_rankings(conn)?))
}

pub fn build_report(conn: &Connection, kind: ReportKind, range: DateRange) -> Result<Report> {
    let ctx = report_context(conn)?;
    let report = match kind {
        ReportKind::Salary => assemble_report(&list_salaries(conn)?, &ctx, range),
        ReportKind::Epf => assemble_report(&list_epf(conn)?, &ctx, range),
        ReportKind::Etf => assemble_report(&list_etf(conn)?, &ctx, range),
        ReportKind::Loan => assemble_report(&list_loan_requests(conn)?, &ctx, range),
        ReportKind::Bonus => assemble_report(&list_bonuses(conn)?, &ctx, range),
        ReportKind::Overtime => assemble_report(&list_overtime(conn)?, &ctx, range),
        ReportKind::Kpi => assemble_report(&list_kpis(conn)?, &ctx, range),
    };
    Ok(report)
}
