use std::path::Path;

use calamine::{Data, Reader};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{PayrollError, Result};
use crate::models::Actor;
use crate::store::{add_employee, NewEmployee};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"'], "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// One roster line before it is validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    pub full_name: String,
    pub department: String,
    pub role: String,
    pub basic_salary: Option<f64>,
    pub satisfaction: Option<f64>,
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub duplicate_file: bool,
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

const REQUIRED_COLUMNS: [&str; 4] = ["full_name", "department", "role", "basic_salary"];

fn column_index(headers: &[String]) -> Result<[usize; 4]> {
    let mut idx = [0usize; 4];
    for (slot, name) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| PayrollError::Other(format!("Roster is missing a '{name}' column")))?;
    }
    Ok(idx)
}

fn satisfaction_index(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("satisfaction"))
}

fn parse_csv(file_path: &Path) -> Result<Vec<RosterRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(file_path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let [name, dept, role, salary] = column_index(&headers)?;
    let satisfaction = satisfaction_index(&headers);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("").to_string();
        rows.push(RosterRow {
            full_name: field(name),
            department: field(dept),
            role: field(role),
            basic_salary: parse_amount(&field(salary)),
            satisfaction: satisfaction.and_then(|i| parse_amount(&field(i))),
        });
    }
    Ok(rows)
}

fn data_text(cell: Option<&Data>) -> String {
    match cell {
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn data_number(cell: Option<&Data>) -> Option<f64> {
    match cell {
        Some(Data::Float(f)) => Some(*f),
        Some(Data::Int(i)) => Some(*i as f64),
        Some(Data::String(s)) => parse_amount(s),
        _ => None,
    }
}

fn parse_xlsx(file_path: &Path) -> Result<Vec<RosterRow>> {
    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| PayrollError::Spreadsheet(format!("Failed to open workbook: {e}")))?;
    let Some(first) = workbook.sheet_names().first().cloned() else {
        return Ok(Vec::new());
    };
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| PayrollError::Spreadsheet(e.to_string()))?;

    let mut lines = range.rows();
    let Some(header_row) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row.iter().map(|c| data_text(Some(c))).collect();
    let [name, dept, role, salary] = column_index(&headers)?;
    let satisfaction = satisfaction_index(&headers);

    Ok(lines
        .map(|row| RosterRow {
            full_name: data_text(row.get(name)),
            department: data_text(row.get(dept)),
            role: data_text(row.get(role)),
            basic_salary: data_number(row.get(salary)),
            satisfaction: satisfaction.and_then(|i| data_number(row.get(i))),
        })
        .collect())
}

pub fn parse_roster(file_path: &Path) -> Result<Vec<RosterRow>> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => parse_csv(file_path),
        "xlsx" | "xls" | "ods" => parse_xlsx(file_path),
        _ => Err(PayrollError::UnsupportedFormat(format!(
            "{} (expected .csv or .xlsx)",
            file_path.display()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Adds every valid roster line as a new employee. Lines without a name or
/// with a missing or negative salary are skipped and counted. A file whose
/// checksum was imported before is refused as a whole.
pub fn import_employees(conn: &Connection, actor: &Actor, file_path: &Path) -> Result<ImportResult> {
    let checksum = compute_checksum(file_path)?;
    {
        let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1")?;
        if stmt.exists([&checksum])? {
            return Ok(ImportResult {
                duplicate_file: true,
                ..ImportResult::default()
            });
        }
    }

    let rows = parse_roster(file_path)?;
    let tx = conn.unchecked_transaction()?;
    let mut result = ImportResult::default();
    for (line, row) in rows.iter().enumerate() {
        let salary = match row.basic_salary {
            Some(s) if s.is_finite() && s >= 0.0 => s,
            _ => {
                warn!(line = line + 2, name = %row.full_name, "skipping roster line with invalid basic salary");
                result.skipped += 1;
                continue;
            }
        };
        if row.full_name.is_empty() {
            result.skipped += 1;
            continue;
        }
        add_employee(
            &tx,
            actor,
            &NewEmployee {
                full_name: row.full_name.clone(),
                department: row.department.clone(),
                role: row.role.clone(),
                basic_salary: salary,
                satisfaction_score: row.satisfaction.unwrap_or(0.0),
            },
        )?;
        result.imported += 1;
    }

    tx.execute(
        "INSERT INTO imports (filename, record_count, checksum) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            result.imported as i64,
            checksum,
        ],
    )?;
    tx.commit()?;
    info!(imported = result.imported, skipped = result.skipped, "roster imported");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::Role;
    use crate::store::list_employees;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn hr() -> Actor {
        Actor::new("hr", Role::Hr)
    }

    fn write_csv(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("50,000.00"), Some(50000.0));
        assert_eq!(parse_amount("\"1,234\""), Some(1234.0));
        assert_eq!(parse_amount("(100)"), Some(-100.0));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_import_csv_skips_negative_salaries() {
        let (dir, conn) = test_db();
        let path = write_csv(
            dir.path(),
            "roster.csv",
            "full_name,department,role,basic_salary,satisfaction\n\
             Nimal Perera,Finance,staff,\"50,000\",4\n\
             Kamal Silva,IT,probation,-100,\n\
             Ruwan Fernando,IT,staff,30000,\n",
        );
        let result = import_employees(&conn, &hr(), &path).unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(result.skipped, 1);
        let employees = list_employees(&conn, false).unwrap();
        assert_eq!(employees.len(), 2);
        assert_eq!(employees[0].basic_salary, 50000.0);
        assert_eq!(employees[0].satisfaction_score, 4.0);
    }

    #[test]
    fn test_import_detects_duplicate_file() {
        let (dir, conn) = test_db();
        let path = write_csv(
            dir.path(),
            "roster.csv",
            "full_name,department,role,basic_salary\nA,HR,staff,1000\n",
        );
        import_employees(&conn, &hr(), &path).unwrap();
        let again = import_employees(&conn, &hr(), &path).unwrap();
        assert!(again.duplicate_file);
        assert_eq!(list_employees(&conn, false).unwrap().len(), 1);
    }

    #[test]
    fn test_import_requires_columns() {
        let (dir, conn) = test_db();
        let path = write_csv(dir.path(), "bad.csv", "name,salary\nA,1000\n");
        assert!(import_employees(&conn, &hr(), &path).is_err());
    }

    #[test]
    fn test_import_is_role_gated() {
        let (dir, conn) = test_db();
        let path = write_csv(
            dir.path(),
            "roster.csv",
            "full_name,department,role,basic_salary\nA,HR,staff,1000\n",
        );
        let err = import_employees(&conn, &Actor::new("e", Role::Employee), &path).unwrap_err();
        assert!(matches!(err, PayrollError::Forbidden { .. }));
        // Nothing recorded, so a permitted retry still goes through.
        assert_eq!(import_employees(&conn, &hr(), &path).unwrap().imported, 1);
    }

    #[test]
    fn test_import_xlsx_roster() {
        let (dir, conn) = test_db();
        let path = dir.path().join("roster.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, h) in ["full_name", "department", "role", "basic_salary"].iter().enumerate() {
            sheet.write_string(0, col as u16, *h).unwrap();
        }
        sheet.write_string(1, 0, "Nimal Perera").unwrap();
        sheet.write_string(1, 1, "Finance").unwrap();
        sheet.write_string(1, 2, "staff").unwrap();
        sheet.write_number(1, 3, 45000.0).unwrap();
        workbook.save(&path).unwrap();

        let result = import_employees(&conn, &hr(), &path).unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(list_employees(&conn, false).unwrap()[0].basic_salary, 45000.0);
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            parse_roster(Path::new("roster.txt")),
            Err(PayrollError::UnsupportedFormat(_))
        ));
    }
}
