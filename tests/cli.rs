use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn hrpay(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hrpay").unwrap();
    cmd.env("HOME", home.path()).env_remove("HRPAY_LOG");
    cmd
}

fn init(home: &TempDir) {
    let data_dir = home.path().join("data");
    hrpay(home)
        .args(["init", "--data-dir"])
        .arg(&data_dir)
        .args(["--company", "Lanka Traders", "--user", "Dilani"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized hrpay"));
}

fn hire(home: &TempDir, name: &str, position: &str, salary: &str) {
    hrpay(home)
        .args(["employees", "add", name, "--department", "Finance", "--position", position])
        .args(["--salary", salary])
        .assert()
        .success();
}

#[test]
fn test_salary_calc_prints_total() {
    let home = TempDir::new().unwrap();
    hrpay(&home)
        .args(["salary", "calc", "--basic", "50000", "--ot-hours", "10", "--ot-rate", "200"])
        .args(["--bonus", "5000", "--increment", "2000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("59,000.00"));
}

#[test]
fn test_salary_calc_rejects_negative_total() {
    let home = TempDir::new().unwrap();
    hrpay(&home)
        .args(["salary", "calc", "--basic", "10000", "--no-pay-days", "31"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Invalid amount"));
}

#[test]
fn test_commands_need_init() {
    let home = TempDir::new().unwrap();
    hrpay(&home)
        .args(["employees", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hrpay init"));
}

#[test]
fn test_employee_and_payroll_flow() {
    let home = TempDir::new().unwrap();
    init(&home);
    hire(&home, "Nimal Perera", "staff", "40000");

    hrpay(&home)
        .args(["employees", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nimal Perera"));

    hrpay(&home)
        .args(["salary", "record", "1", "--date", "2025-01-31", "--ot-hours", "2", "--ot-rate", "250"])
        .assert()
        .success()
        .stdout(predicate::str::contains("40,500.00"));

    hrpay(&home)
        .args(["salary", "process", "1", "--role", "accountant"])
        .assert()
        .success()
        .stdout(predicate::str::contains("by Dilani"));

    hrpay(&home)
        .args(["contributions", "generate", "2025-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated EPF/ETF for 1 employees"));

    hrpay(&home)
        .args(["contributions", "list", "2025-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("8,000.00"))
        .stdout(predicate::str::contains("1,200.00"));
}

#[test]
fn test_role_gating() {
    let home = TempDir::new().unwrap();
    init(&home);
    hrpay(&home)
        .args(["employees", "add", "Kamal", "--department", "IT", "--position", "staff"])
        .args(["--salary", "30000", "--role", "employee"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed"));
}

#[test]
fn test_loan_eligibility_and_request() {
    let home = TempDir::new().unwrap();
    init(&home);
    hire(&home, "Nimal Perera", "staff", "40000");

    hrpay(&home)
        .args(["loans", "eligibility", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Basic salary too low for home loan"));

    hrpay(&home)
        .args(["loans", "request", "1", "--type", "home", "--amount", "100000", "--months", "24"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not eligible"));

    hrpay(&home)
        .args(["loans", "request", "1", "--type", "staff", "--amount", "100000", "--months", "12"])
        .assert()
        .success();

    hrpay(&home)
        .args(["loans", "approve", "1", "--role", "manager"])
        .assert()
        .success()
        .stdout(predicate::str::contains("approved"));

    hrpay(&home)
        .args(["loans", "reject", "1", "--role", "manager"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot move loan request"));
}

#[test]
fn test_report_export_writes_files() {
    let home = TempDir::new().unwrap();
    init(&home);
    hire(&home, "Nimal Perera", "staff", "40000");
    hrpay(&home)
        .args(["contributions", "generate", "2025-01"])
        .assert()
        .success();

    hrpay(&home)
        .args(["report", "epf", "--from", "2025-01-01", "--to", "2025-01-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nimal Perera"));

    let xlsx = home.path().join("epf.xlsx");
    hrpay(&home)
        .args(["report", "epf", "--from", "2025-01-01", "--to", "2025-01-31"])
        .args(["--export", "spreadsheet", "--summary-sheet", "--output"])
        .arg(&xlsx)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    assert!(xlsx.exists());

    let docx = home.path().join("epf.docx");
    hrpay(&home)
        .args(["report", "epf", "--from", "2025-01-01", "--to", "2025-01-31"])
        .args(["--export", "document", "--output"])
        .arg(&docx)
        .assert()
        .success();
    assert!(docx.exists());

    hrpay(&home)
        .args(["report", "epf", "--from", "2025-01-01", "--to", "2025-01-31", "--export", "pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported export format"));

    hrpay(&home)
        .args(["report", "epf", "--from", "2025-02-01", "--to", "2025-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date range"));
}

#[test]
fn test_default_export_path_uses_report_type() {
    let home = TempDir::new().unwrap();
    init(&home);
    hrpay(&home)
        .args(["report", "bonus", "--from", "2025-01-01", "--to", "2025-12-31", "--export", "document"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exports").and(predicate::str::contains("bonus-")));
}

#[test]
fn test_kpi_rankings_listed() {
    let home = TempDir::new().unwrap();
    init(&home);
    hire(&home, "Nimal Perera", "staff", "40000");
    hrpay(&home)
        .args(["kpi", "record", "1", "92", "--date", "2025-06-30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Excellent"));
    hrpay(&home)
        .args(["kpi", "rankings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Needs Improvement"))
        .stdout(predicate::str::contains("warning").not());
}
