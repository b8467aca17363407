use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS employees (
    id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL,
    department TEXT NOT NULL,
    role TEXT NOT NULL,
    basic_salary REAL NOT NULL CHECK (basic_salary >= 0),
    is_active INTEGER DEFAULT 1,
    kpi_score REAL DEFAULT 0,
    satisfaction_score REAL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS salaries (
    id INTEGER PRIMARY KEY,
    employee_id INTEGER NOT NULL,
    basic_salary REAL NOT NULL,
    ot_pay REAL NOT NULL DEFAULT 0,
    bonus_pay REAL NOT NULL DEFAULT 0,
    increment_pay REAL NOT NULL DEFAULT 0,
    no_pay_deduction REAL NOT NULL DEFAULT 0,
    total_salary REAL NOT NULL CHECK (total_salary >= 0),
    salary_date TEXT NOT NULL,
    processed_by TEXT,
    processed_at TEXT,
    FOREIGN KEY (employee_id) REFERENCES employees(id)
);

CREATE TABLE IF NOT EXISTS epf_contributions (
    id INTEGER PRIMARY KEY,
    employee_id INTEGER NOT NULL,
    basic_salary REAL NOT NULL,
    employee_contribution REAL NOT NULL,
    employer_contribution REAL NOT NULL,
    total_contribution REAL NOT NULL,
    month TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    UNIQUE (employee_id, month),
    FOREIGN KEY (employee_id) REFERENCES employees(id)
);

CREATE TABLE IF NOT EXISTS etf_contributions (
    id INTEGER PRIMARY KEY,
    employee_id INTEGER NOT NULL,
    basic_salary REAL NOT NULL,
    employer_contribution REAL NOT NULL,
    month TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    UNIQUE (employee_id, month),
    FOREIGN KEY (employee_id) REFERENCES employees(id)
);

CREATE TABLE IF NOT EXISTS bonuses (
    id INTEGER PRIMARY KEY,
    employee_id INTEGER NOT NULL,
    amount REAL NOT NULL CHECK (amount > 0),
    bonus_type TEXT NOT NULL,
    reason TEXT,
    date TEXT NOT NULL,
    FOREIGN KEY (employee_id) REFERENCES employees(id)
);

CREATE TABLE IF NOT EXISTS overtime (
    id INTEGER PRIMARY KEY,
    employee_id INTEGER NOT NULL,
    hours REAL NOT NULL,
    rate_per_hour REAL NOT NULL,
    amount REAL NOT NULL,
    ot_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    date TEXT NOT NULL,
    FOREIGN KEY (employee_id) REFERENCES employees(id)
);

CREATE TABLE IF NOT EXISTS loan_types (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS loan_requests (
    id INTEGER PRIMARY KEY,
    employee_id INTEGER NOT NULL,
    loan_type_id INTEGER NOT NULL,
    amount REAL NOT NULL CHECK (amount >= 0),
    duration_months INTEGER NOT NULL,
    interest_rate REAL NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    processed_by TEXT,
    processed_at TEXT,
    FOREIGN KEY (employee_id) REFERENCES employees(id),
    FOREIGN KEY (loan_type_id) REFERENCES loan_types(id)
);

CREATE TABLE IF NOT EXISTS kpi_rankings (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    min_value REAL NOT NULL,
    max_value REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS kpis (
    id INTEGER PRIMARY KEY,
    employee_id INTEGER NOT NULL,
    value REAL NOT NULL,
    calculation_date TEXT NOT NULL,
    year INTEGER NOT NULL,
    ranking_id INTEGER,
    FOREIGN KEY (employee_id) REFERENCES employees(id),
    FOREIGN KEY (ranking_id) REFERENCES kpi_rankings(id)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    checksum TEXT
);
";

// (name, description)
const DEFAULT_LOAN_TYPES: &[(&str, &str)] = &[
    ("Staff Loan", "General purpose loan, up to 3x basic salary"),
    ("Home Loan", "Housing loan, up to 60x basic salary; basic salary of 50,000 or more"),
    ("Emergency Loan", "Short-term emergency advance, up to 2x basic salary"),
    ("Education Loan", "Tuition and study costs, up to 12x basic salary"),
    ("Vehicle Loan", "Vehicle purchase, up to 24x basic salary"),
    ("Product Loan", "Consumer goods purchase, up to 6x basic salary"),
];

// (name, min_value, max_value)
const DEFAULT_KPI_RANKINGS: &[(&str, f64, f64)] = &[
    ("Needs Improvement", 0.0, 40.0),
    ("Average", 40.0, 60.0),
    ("Good", 60.0, 75.0),
    ("Very Good", 75.0, 90.0),
    ("Excellent", 90.0, 100.0),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM loan_types", [], |row| row.get(0))?;
    if count == 0 {
        for (name, description) in DEFAULT_LOAN_TYPES {
            conn.execute(
                "INSERT INTO loan_types (name, description) VALUES (?1, ?2)",
                rusqlite::params![name, description],
            )?;
        }
    }

    let count: i64 = conn.query_row("SELECT count(*) FROM kpi_rankings", [], |row| row.get(0))?;
    if count == 0 {
        for (name, min, max) in DEFAULT_KPI_RANKINGS {
            conn.execute(
                "INSERT INTO kpi_rankings (name, min_value, max_value) VALUES (?1, ?2, ?3)",
                rusqlite::params![name, min, max],
            )?;
        }
    }
    Ok(())
}
