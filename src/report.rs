use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use tracing::warn;

use crate::error::{PayrollError, Result};
use crate::models::{
    Bonus, Employee, EpfContribution, EtfContribution, KpiEntry, KpiRanking, LoanRequest, LoanType,
    Overtime, SalaryEntry,
};

pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "N/A";

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PayrollError::InvalidDateRange(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn parse(from: &str, to: &str) -> Result<Self> {
        Self::new(parse_date(from)?, parse_date(to)?)
    }

    /// The whole calendar month `year-month`.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| PayrollError::InvalidDateRange(format!("{year}-{month:02}")))?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let end = next
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| PayrollError::InvalidDateRange(format!("{year}-{month:02}")))?;
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| PayrollError::InvalidDateRange(format!("'{raw}' is not a YYYY-MM-DD date")))
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Money,
    Number,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Average,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub header: &'static str,
    pub kind: ColumnKind,
    pub aggregate: Option<Aggregate>,
}

const fn col(key: &'static str, header: &'static str, kind: ColumnKind) -> Column {
    Column {
        key,
        header,
        kind,
        aggregate: None,
    }
}

const fn sum(key: &'static str, header: &'static str, kind: ColumnKind) -> Column {
    Column {
        key,
        header,
        kind,
        aggregate: Some(Aggregate::Sum),
    }
}

const EMPLOYEE: Column = col("employee_name", "Employee", ColumnKind::Text);
const DEPARTMENT: Column = col("department", "Department", ColumnKind::Text);
const STATUS: Column = col("status", "Status", ColumnKind::Text);

const SALARY_COLUMNS: &[Column] = &[
    EMPLOYEE,
    DEPARTMENT,
    col("salary_date", "Salary Date", ColumnKind::Date),
    sum("basic_salary", "Basic Salary", ColumnKind::Money),
    sum("ot_pay", "OT Pay", ColumnKind::Money),
    sum("bonus_pay", "Bonus", ColumnKind::Money),
    sum("increment_pay", "Increment", ColumnKind::Money),
    sum("no_pay_deduction", "No-pay Deduction", ColumnKind::Money),
    sum("total_salary", "Total Salary", ColumnKind::Money),
    STATUS,
    col("processed_by", "Processed By", ColumnKind::Text),
];

const EPF_COLUMNS: &[Column] = &[
    EMPLOYEE,
    DEPARTMENT,
    col("month", "Month", ColumnKind::Date),
    sum("basic_salary", "Basic Salary", ColumnKind::Money),
    sum("employee_contribution", "Employee (8%)", ColumnKind::Money),
    sum("employer_contribution", "Employer (12%)", ColumnKind::Money),
    sum("total_contribution", "Total", ColumnKind::Money),
    STATUS,
];

const ETF_COLUMNS: &[Column] = &[
    EMPLOYEE,
    DEPARTMENT,
    col("month", "Month", ColumnKind::Date),
    sum("basic_salary", "Basic Salary", ColumnKind::Money),
    sum("employer_contribution", "Employer (3%)", ColumnKind::Money),
    STATUS,
];

const LOAN_COLUMNS: &[Column] = &[
    EMPLOYEE,
    DEPARTMENT,
    col("date", "Date", ColumnKind::Date),
    col("loan_type", "Loan Type", ColumnKind::Text),
    sum("amount", "Amount", ColumnKind::Money),
    col("duration_months", "Months", ColumnKind::Number),
    col("interest_rate", "Interest %", ColumnKind::Number),
    STATUS,
    col("processed_by", "Processed By", ColumnKind::Text),
];

const BONUS_COLUMNS: &[Column] = &[
    EMPLOYEE,
    DEPARTMENT,
    col("date", "Date", ColumnKind::Date),
    col("bonus_type", "Type", ColumnKind::Text),
    sum("amount", "Amount", ColumnKind::Money),
    col("reason", "Reason", ColumnKind::Text),
];

const OVERTIME_COLUMNS: &[Column] = &[
    EMPLOYEE,
    DEPARTMENT,
    col("date", "Date", ColumnKind::Date),
    col("ot_type", "Type", ColumnKind::Text),
    sum("hours", "Hours", ColumnKind::Number),
    col("rate_per_hour", "Rate / Hour", ColumnKind::Money),
    sum("amount", "Amount", ColumnKind::Money),
    STATUS,
];

const KPI_COLUMNS: &[Column] = &[
    EMPLOYEE,
    DEPARTMENT,
    col("calculation_date", "Date", ColumnKind::Date),
    col("year", "Year", ColumnKind::Number),
    Column {
        key: "value",
        header: "KPI",
        kind: ColumnKind::Number,
        aggregate: Some(Aggregate::Average),
    },
    col("ranking", "Ranking", ColumnKind::Text),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Salary,
    Epf,
    Etf,
    Loan,
    Bonus,
    Overtime,
    Kpi,
}

impl ReportKind {
    pub const ALL: [ReportKind; 7] = [
        ReportKind::Salary,
        ReportKind::Epf,
        ReportKind::Etf,
        ReportKind::Loan,
        ReportKind::Bonus,
        ReportKind::Overtime,
        ReportKind::Kpi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Salary => "salary",
            ReportKind::Epf => "epf",
            ReportKind::Etf => "etf",
            ReportKind::Loan => "loan",
            ReportKind::Bonus => "bonus",
            ReportKind::Overtime => "overtime",
            ReportKind::Kpi => "kpi",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| PayrollError::Other(format!("Unknown report type: {s}")))
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Salary => "Salary Report",
            ReportKind::Epf => "EPF Contribution Report",
            ReportKind::Etf => "ETF Contribution Report",
            ReportKind::Loan => "Loan Request Report",
            ReportKind::Bonus => "Bonus Report",
            ReportKind::Overtime => "Overtime Report",
            ReportKind::Kpi => "KPI Report",
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        match self {
            ReportKind::Salary => SALARY_COLUMNS,
            ReportKind::Epf => EPF_COLUMNS,
            ReportKind::Etf => ETF_COLUMNS,
            ReportKind::Loan => LOAN_COLUMNS,
            ReportKind::Bonus => BONUS_COLUMNS,
            ReportKind::Overtime => OVERTIME_COLUMNS,
            ReportKind::Kpi => KPI_COLUMNS,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Cells and rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    /// A join target that could not be found.
    Placeholder(&'static str),
    Empty,
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, CellValue::Placeholder(_))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Placeholder(p) => f.write_str(p),
            CellValue::Empty => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl From<Option<String>> for CellValue {
    fn from(v: Option<String>) -> Self {
        v.map(CellValue::Text).unwrap_or(CellValue::Empty)
    }
}

/// One report row, aligned with the report columns.
pub type RowRecord = Vec<CellValue>;

// ---------------------------------------------------------------------------
// Join context
// ---------------------------------------------------------------------------

/// Resolves a looked-up display value, falling back to a placeholder cell
/// instead of failing.
pub fn resolve_or_placeholder(value: Option<&str>, placeholder: &'static str) -> CellValue {
    match value {
        Some(v) => CellValue::Text(v.to_string()),
        None => CellValue::Placeholder(placeholder),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    employees: HashMap<i64, (String, String)>,
    loan_types: HashMap<i64, String>,
    rankings: HashMap<i64, String>,
}

impl ReportContext {
    pub fn new(employees: &[Employee]) -> Self {
        Self {
            employees: employees
                .iter()
                .map(|e| (e.id, (e.full_name.clone(), e.department.clone())))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_loan_types(mut self, loan_types: &[LoanType]) -> Self {
        self.loan_types = loan_types.iter().map(|t| (t.id, t.name.clone())).collect();
        self
    }

    pub fn with_rankings(mut self, rankings: &[KpiRanking]) -> Self {
        self.rankings = rankings.iter().map(|r| (r.id, r.name.clone())).collect();
        self
    }

    pub fn employee_name(&self, id: i64) -> CellValue {
        resolve_or_placeholder(self.employees.get(&id).map(|e| e.0.as_str()), UNKNOWN)
    }

    pub fn department(&self, id: i64) -> CellValue {
        resolve_or_placeholder(self.employees.get(&id).map(|e| e.1.as_str()), NOT_AVAILABLE)
    }

    pub fn loan_type_name(&self, id: i64) -> CellValue {
        resolve_or_placeholder(self.loan_types.get(&id).map(String::as_str), UNKNOWN)
    }

    /// No tier assigned is an ordinary empty cell, not a lookup miss.
    pub fn ranking_name(&self, id: Option<i64>) -> CellValue {
        match id {
            Some(id) => resolve_or_placeholder(self.rankings.get(&id).map(String::as_str), UNKNOWN),
            None => CellValue::Empty,
        }
    }
}

// ---------------------------------------------------------------------------
// Record projection
// ---------------------------------------------------------------------------

pub trait ReportRecord {
    /// The report this record type feeds.
    const KIND: ReportKind;
    fn employee_id(&self) -> i64;
    /// The date used for range filtering.
    fn report_date(&self) -> NaiveDate;
    fn field(&self, key: &str, ctx: &ReportContext) -> CellValue;
}

fn money(v: f64) -> CellValue {
    CellValue::Number(v)
}

impl ReportRecord for SalaryEntry {
    const KIND: ReportKind = ReportKind::Salary;

    fn employee_id(&self) -> i64 {
        self.employee_id
    }

    fn report_date(&self) -> NaiveDate {
        self.salary_date
    }

    fn field(&self, key: &str, _ctx: &ReportContext) -> CellValue {
        match key {
            "salary_date" => CellValue::Date(self.salary_date),
            "basic_salary" => money(self.basic_salary),
            "ot_pay" => money(self.ot_pay),
            "bonus_pay" => money(self.bonus_pay),
            "increment_pay" => money(self.increment_pay),
            "no_pay_deduction" => money(self.no_pay_deduction),
            "total_salary" => money(self.total_salary),
            "status" => CellValue::Text(self.status().as_str().to_string()),
            "processed_by" => self.processed_by.clone().into(),
            _ => CellValue::Empty,
        }
    }
}

impl ReportRecord for EpfContribution {
    const KIND: ReportKind = ReportKind::Epf;

    fn employee_id(&self) -> i64 {
        self.employee_id
    }

    fn report_date(&self) -> NaiveDate {
        self.month
    }

    fn field(&self, key: &str, _ctx: &ReportContext) -> CellValue {
        match key {
            "month" => CellValue::Date(self.month),
            "basic_salary" => money(self.basic_salary),
            "employee_contribution" => money(self.employee_contribution),
            "employer_contribution" => money(self.employer_contribution),
            "total_contribution" => money(self.total_contribution),
            "status" => CellValue::Text(self.status.as_str().to_string()),
            _ => CellValue::Empty,
        }
    }
}

impl ReportRecord for EtfContribution {
    const KIND: ReportKind = ReportKind::Etf;

    fn employee_id(&self) -> i64 {
        self.employee_id
    }

    fn report_date(&self) -> NaiveDate {
        self.month
    }

    fn field(&self, key: &str, _ctx: &ReportContext) -> CellValue {
        match key {
            "month" => CellValue::Date(self.month),
            "basic_salary" => money(self.basic_salary),
            "employer_contribution" => money(self.employer_contribution),
            "status" => CellValue::Text(self.status.as_str().to_string()),
            _ => CellValue::Empty,
        }
    }
}

impl ReportRecord for LoanRequest {
    const KIND: ReportKind = ReportKind::Loan;

    fn employee_id(&self) -> i64 {
        self.employee_id
    }

    fn report_date(&self) -> NaiveDate {
        self.date
    }

    fn field(&self, key: &str, ctx: &ReportContext) -> CellValue {
        match key {
            "date" => CellValue::Date(self.date),
            "loan_type" => ctx.loan_type_name(self.loan_type_id),
            "amount" => money(self.amount),
            "duration_months" => CellValue::Number(self.duration_months as f64),
            "interest_rate" => CellValue::Number(self.interest_rate),
            "status" => CellValue::Text(self.status.as_str().to_string()),
            "processed_by" => self.processed_by.clone().into(),
            _ => CellValue::Empty,
        }
    }
}

impl ReportRecord for Bonus {
    const KIND: ReportKind = ReportKind::Bonus;

    fn employee_id(&self) -> i64 {
        self.employee_id
    }

    fn report_date(&self) -> NaiveDate {
        self.date
    }

    fn field(&self, key: &str, _ctx: &ReportContext) -> CellValue {
        match key {
            "date" => CellValue::Date(self.date),
            "bonus_type" => CellValue::Text(self.bonus_type.as_str().to_string()),
            "amount" => money(self.amount),
            "reason" => self.reason.clone().into(),
            _ => CellValue::Empty,
        }
    }
}

impl ReportRecord for Overtime {
    const KIND: ReportKind = ReportKind::Overtime;

    fn employee_id(&self) -> i64 {
        self.employee_id
    }

    fn report_date(&self) -> NaiveDate {
        self.date
    }

    fn field(&self, key: &str, _ctx: &ReportContext) -> CellValue {
        match key {
            "date" => CellValue::Date(self.date),
            "ot_type" => CellValue::Text(self.ot_type.as_str().to_string()),
            "hours" => CellValue::Number(self.hours),
            "rate_per_hour" => money(self.rate_per_hour),
            "amount" => money(self.amount),
            "status" => CellValue::Text(self.status.as_str().to_string()),
            _ => CellValue::Empty,
        }
    }
}

impl ReportRecord for KpiEntry {
    const KIND: ReportKind = ReportKind::Kpi;

    fn employee_id(&self) -> i64 {
        self.employee_id
    }

    fn report_date(&self) -> NaiveDate {
        self.calculation_date
    }

    fn field(&self, key: &str, ctx: &ReportContext) -> CellValue {
        match key {
            "calculation_date" => CellValue::Date(self.calculation_date),
            "year" => CellValue::Number(self.year as f64),
            "value" => CellValue::Number(self.value),
            "ranking" => ctx.ranking_name(self.ranking_id),
            _ => CellValue::Empty,
        }
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

pub const ROW_COUNT_KEY: &str = "row_count";

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: ReportKind,
    pub range: DateRange,
    pub columns: &'static [Column],
    pub rows: Vec<RowRecord>,
    pub totals: BTreeMap<String, f64>,
    /// Cells that fell back to a placeholder because a join target was missing.
    pub lookup_misses: usize,
}

impl Report {
    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.header).collect()
    }

    /// Totals in display order: column aggregates as the columns appear,
    /// then status counts, then the record count.
    pub fn ordered_totals(&self) -> Vec<(&str, f64)> {
        let mut out = Vec::with_capacity(self.totals.len());
        for column in self.columns {
            let key = match column.aggregate {
                Some(Aggregate::Sum) => column.key.to_string(),
                Some(Aggregate::Average) => format!("average_{}", column.key),
                None => continue,
            };
            if let Some((k, v)) = self.totals.get_key_value(&key) {
                out.push((k.as_str(), *v));
            }
        }
        out.extend(
            self.totals
                .iter()
                .filter(|(k, _)| k.starts_with("count_"))
                .map(|(k, v)| (k.as_str(), *v)),
        );
        if let Some((k, v)) = self.totals.get_key_value(ROW_COUNT_KEY) {
            out.push((k.as_str(), *v));
        }
        out
    }

    /// Whether a totals key sums a money column.
    pub fn is_money(&self, key: &str) -> bool {
        self.columns
            .iter()
            .any(|c| c.key == key && c.kind == ColumnKind::Money)
    }
}

pub fn assemble_report<R: ReportRecord>(
    records: &[R],
    ctx: &ReportContext,
    range: DateRange,
) -> Report {
    let kind = R::KIND;
    let columns = kind.columns();
    let rows: Vec<RowRecord> = records
        .iter()
        .filter(|r| range.contains(r.report_date()))
        .map(|r| {
            columns
                .iter()
                .map(|c| match c.key {
                    "employee_name" => ctx.employee_name(r.employee_id()),
                    "department" => ctx.department(r.employee_id()),
                    key => r.field(key, ctx),
                })
                .collect()
        })
        .collect();

    let lookup_misses = rows
        .iter()
        .flat_map(|row| row.iter())
        .filter(|c| c.is_placeholder())
        .count();
    if lookup_misses > 0 {
        warn!(report = %kind, lookup_misses, "report references missing records; placeholders used");
    }

    let totals = compute_totals(columns, &rows);
    Report {
        kind,
        range,
        columns,
        rows,
        totals,
        lookup_misses,
    }
}

/// Sums (or averages) every aggregated column and counts rows per status,
/// in one pass over `rows`. Sum keys are the column key, averages are
/// `average_<key>`, status counts are `count_<status>`.
pub fn compute_totals(columns: &[Column], rows: &[RowRecord]) -> BTreeMap<String, f64> {
    let status_idx = columns.iter().position(|c| c.key == "status");
    let mut sums = vec![0.0f64; columns.len()];
    let mut counts = vec![0usize; columns.len()];
    let mut status_counts: BTreeMap<String, f64> = BTreeMap::new();

    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns.len()) {
            if columns[i].aggregate.is_some() {
                if let Some(n) = cell.as_number() {
                    sums[i] += n;
                    counts[i] += 1;
                }
            }
        }
        if let Some(CellValue::Text(status)) = status_idx.and_then(|i| row.get(i)) {
            *status_counts.entry(format!("count_{status}")).or_default() += 1.0;
        }
    }

    let mut totals = BTreeMap::new();
    totals.insert(ROW_COUNT_KEY.to_string(), rows.len() as f64);
    for (i, column) in columns.iter().enumerate() {
        match column.aggregate {
            Some(Aggregate::Sum) => {
                totals.insert(column.key.to_string(), crate::payroll::round_cents(sums[i]));
            }
            Some(Aggregate::Average) => {
                let avg = if counts[i] > 0 {
                    sums[i] / counts[i] as f64
                } else {
                    0.0
                };
                totals.insert(format!("average_{}", column.key), crate::payroll::round_cents(avg));
            }
            None => {}
        }
    }
    totals.extend(status_counts);
    totals
}

/// Human label for a totals key, using the column header where one exists.
pub fn total_label(columns: &[Column], key: &str) -> String {
    if key == ROW_COUNT_KEY {
        return "Records".to_string();
    }
    if let Some(status) = key.strip_prefix("count_") {
        let mut chars = status.chars();
        let cap = chars
            .next()
            .map(|c| c.to_uppercase().collect::<String>() + chars.as_str())
            .unwrap_or_default();
        return cap;
    }
    if let Some(inner) = key.strip_prefix("average_") {
        if let Some(c) = columns.iter().find(|c| c.key == inner) {
            return format!("Average {}", c.header);
        }
    }
    match columns.iter().find(|c| c.key == key) {
        Some(c) if c.header.starts_with("Total") => c.header.to_string(),
        Some(c) => format!("Total {}", c.header),
        None => key.to_string(),
    }
}
