use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{PayrollError, Result};
use crate::payroll::{compute_overtime, SalaryBreakdown};

// ---------------------------------------------------------------------------
// Roles and the acting identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Hr,
    Manager,
    Accountant,
    Ceo,
    Employee,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Hr,
        Role::Manager,
        Role::Accountant,
        Role::Ceo,
        Role::Employee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Hr => "hr",
            Role::Manager => "manager",
            Role::Accountant => "accountant",
            Role::Ceo => "ceo",
            Role::Employee => "employee",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is performing an operation. Passed explicitly to every write that
/// stamps processed-by / approved-by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    pub fn require(&self, allowed: &[Role], action: &str) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(PayrollError::Forbidden {
                role: self.role.to_string(),
                action: action.to_string(),
            })
        }
    }
}

pub const EMPLOYEE_WRITERS: &[Role] = &[Role::Admin, Role::Hr];
pub const PAYROLL_WRITERS: &[Role] = &[Role::Admin, Role::Hr, Role::Accountant];
pub const APPROVERS: &[Role] = &[Role::Admin, Role::Hr, Role::Manager, Role::Ceo];
pub const KPI_WRITERS: &[Role] = &[Role::Admin, Role::Hr, Role::Manager];

// ---------------------------------------------------------------------------
// Employee
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub full_name: String,
    pub department: String,
    pub role: String,
    pub basic_salary: f64,
    pub is_active: bool,
    pub kpi_score: f64,
    pub satisfaction_score: f64,
}

// ---------------------------------------------------------------------------
// Salary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayStatus {
    Pending,
    Processed,
}

impl PayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayStatus::Pending => "pending",
            PayStatus::Processed => "processed",
        }
    }
}

/// One pay-cycle record. Only the processed-by/at pair may change after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryEntry {
    pub id: Option<i64>,
    pub employee_id: i64,
    pub basic_salary: f64,
    pub ot_pay: f64,
    pub bonus_pay: f64,
    pub increment_pay: f64,
    pub no_pay_deduction: f64,
    pub total_salary: f64,
    pub salary_date: NaiveDate,
    pub processed_by: Option<String>,
    pub processed_at: Option<NaiveDateTime>,
}

impl SalaryEntry {
    pub fn from_breakdown(employee_id: i64, salary_date: NaiveDate, breakdown: &SalaryBreakdown) -> Self {
        Self {
            id: None,
            employee_id,
            basic_salary: breakdown.basic_salary,
            ot_pay: breakdown.ot_pay,
            bonus_pay: breakdown.bonus_pay,
            increment_pay: breakdown.increment_pay,
            no_pay_deduction: breakdown.no_pay_deduction,
            total_salary: breakdown.total_salary,
            salary_date,
            processed_by: None,
            processed_at: None,
        }
    }

    pub fn status(&self) -> PayStatus {
        if self.processed_by.is_some() {
            PayStatus::Processed
        } else {
            PayStatus::Pending
        }
    }

    pub fn process(&mut self, actor: &Actor, at: NaiveDateTime) -> Result<()> {
        if self.status() == PayStatus::Processed {
            return Err(PayrollError::InvalidTransition {
                entity: "salary entry",
                from: PayStatus::Processed.as_str().to_string(),
                to: PayStatus::Processed.as_str().to_string(),
            });
        }
        self.processed_by = Some(actor.name.clone());
        self.processed_at = Some(at);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Statutory contributions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionStatus {
    Pending,
    Processed,
}

impl ContributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionStatus::Pending => "pending",
            ContributionStatus::Processed => "processed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ContributionStatus::Pending),
            "processed" => Some(ContributionStatus::Processed),
            _ => None,
        }
    }

    pub fn process(self) -> Result<Self> {
        match self {
            ContributionStatus::Pending => Ok(ContributionStatus::Processed),
            ContributionStatus::Processed => Err(PayrollError::InvalidTransition {
                entity: "contribution",
                from: self.as_str().to_string(),
                to: ContributionStatus::Processed.as_str().to_string(),
            }),
        }
    }
}

/// First day of the month containing `date`. Contributions are keyed by month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpfContribution {
    pub id: Option<i64>,
    pub employee_id: i64,
    pub basic_salary: f64,
    pub employee_contribution: f64,
    pub employer_contribution: f64,
    pub total_contribution: f64,
    pub month: NaiveDate,
    pub status: ContributionStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtfContribution {
    pub id: Option<i64>,
    pub employee_id: i64,
    pub basic_salary: f64,
    pub employer_contribution: f64,
    pub month: NaiveDate,
    pub status: ContributionStatus,
}

// ---------------------------------------------------------------------------
// Bonus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusType {
    Performance,
    Festival,
    Annual,
    Attendance,
    Special,
}

impl BonusType {
    pub const ALL: [BonusType; 5] = [
        BonusType::Performance,
        BonusType::Festival,
        BonusType::Annual,
        BonusType::Attendance,
        BonusType::Special,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BonusType::Performance => "performance",
            BonusType::Festival => "festival",
            BonusType::Annual => "annual",
            BonusType::Attendance => "attendance",
            BonusType::Special => "special",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bonus {
    pub id: Option<i64>,
    pub employee_id: i64,
    pub amount: f64,
    pub bonus_type: BonusType,
    pub reason: Option<String>,
    pub date: NaiveDate,
}

impl Bonus {
    pub fn new(
        employee_id: i64,
        amount: f64,
        bonus_type: BonusType,
        reason: Option<String>,
        date: NaiveDate,
    ) -> Result<Self> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(PayrollError::InvalidAmount(format!(
                "bonus amount must be greater than zero, got {amount}"
            )));
        }
        Ok(Self {
            id: None,
            employee_id,
            amount,
            bonus_type,
            reason: reason.filter(|r| !r.trim().is_empty()),
            date,
        })
    }
}

// ---------------------------------------------------------------------------
// Overtime
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvertimeType {
    Weekday,
    Weekend,
    Holiday,
}

impl OvertimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OvertimeType::Weekday => "weekday",
            OvertimeType::Weekend => "weekend",
            OvertimeType::Holiday => "holiday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "weekday" => Some(OvertimeType::Weekday),
            "weekend" => Some(OvertimeType::Weekend),
            "holiday" => Some(OvertimeType::Holiday),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvertimeStatus {
    Pending,
    Approved,
}

impl OvertimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OvertimeStatus::Pending => "pending",
            OvertimeStatus::Approved => "approved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OvertimeStatus::Pending),
            "approved" => Some(OvertimeStatus::Approved),
            _ => None,
        }
    }

    pub fn approve(self) -> Result<Self> {
        match self {
            OvertimeStatus::Pending => Ok(OvertimeStatus::Approved),
            OvertimeStatus::Approved => Err(PayrollError::InvalidTransition {
                entity: "overtime",
                from: self.as_str().to_string(),
                to: OvertimeStatus::Approved.as_str().to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overtime {
    pub id: Option<i64>,
    pub employee_id: i64,
    pub hours: f64,
    pub rate_per_hour: f64,
    pub amount: f64,
    pub ot_type: OvertimeType,
    pub status: OvertimeStatus,
    pub date: NaiveDate,
}

impl Overtime {
    pub fn new(
        employee_id: i64,
        hours: f64,
        rate_per_hour: f64,
        ot_type: OvertimeType,
        date: NaiveDate,
    ) -> Result<Self> {
        let (hours, amount) = compute_overtime(hours, rate_per_hour)?;
        Ok(Self {
            id: None,
            employee_id,
            hours,
            rate_per_hour,
            amount,
            ot_type,
            status: OvertimeStatus::Pending,
            date,
        })
    }
}

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanType {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LoanStatus::Pending),
            "approved" => Some(LoanStatus::Approved),
            "rejected" => Some(LoanStatus::Rejected),
            _ => None,
        }
    }

    /// Pending is the only non-terminal state.
    pub fn transition(self, to: LoanStatus) -> Result<LoanStatus> {
        match (self, to) {
            (LoanStatus::Pending, LoanStatus::Approved | LoanStatus::Rejected) => Ok(to),
            _ => Err(PayrollError::InvalidTransition {
                entity: "loan request",
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoanRequest {
    pub id: Option<i64>,
    pub employee_id: i64,
    pub loan_type_id: i64,
    pub amount: f64,
    pub duration_months: u32,
    pub interest_rate: f64,
    pub date: NaiveDate,
    pub status: LoanStatus,
    pub processed_by: Option<String>,
    pub processed_at: Option<NaiveDateTime>,
}

impl LoanRequest {
    pub fn new(
        employee_id: i64,
        loan_type: &LoanType,
        amount: f64,
        duration_months: u32,
        interest_rate: f64,
        date: NaiveDate,
    ) -> Result<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(PayrollError::InvalidAmount(format!(
                "loan amount must not be negative, got {amount}"
            )));
        }
        if duration_months == 0 {
            return Err(PayrollError::InvalidAmount(
                "loan duration must be at least one month".to_string(),
            ));
        }
        if !interest_rate.is_finite() || interest_rate < 0.0 {
            return Err(PayrollError::InvalidAmount(format!(
                "interest rate must not be negative, got {interest_rate}"
            )));
        }
        Ok(Self {
            id: None,
            employee_id,
            loan_type_id: loan_type.id,
            amount,
            duration_months,
            interest_rate,
            date,
            status: LoanStatus::Pending,
            processed_by: None,
            processed_at: None,
        })
    }

    pub fn decide(&mut self, to: LoanStatus, actor: &Actor, at: NaiveDateTime) -> Result<()> {
        self.status = self.status.transition(to)?;
        self.processed_by = Some(actor.name.clone());
        self.processed_at = Some(at);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KPI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRanking {
    pub id: i64,
    pub name: String,
    pub min_value: f64,
    pub max_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KpiEntry {
    pub id: Option<i64>,
    pub employee_id: i64,
    pub value: f64,
    pub calculation_date: NaiveDate,
    pub year: i32,
    pub ranking_id: Option<i64>,
}

impl KpiEntry {
    pub fn new(employee_id: i64, value: f64, calculation_date: NaiveDate, ranking_id: Option<i64>) -> Self {
        Self {
            id: None,
            employee_id,
            value,
            calculation_date,
            year: calculation_date.year(),
            ranking_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> NaiveDateTime {
        date(2025, 3, 31).and_hms_opt(17, 0, 0).unwrap()
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("HR"), Some(Role::Hr));
        assert_eq!(Role::parse(" accountant "), Some(Role::Accountant));
        assert_eq!(Role::parse("janitor"), None);
    }

    #[test]
    fn test_actor_require() {
        let actor = Actor::new("alice", Role::Employee);
        let err = actor.require(PAYROLL_WRITERS, "process salaries").unwrap_err();
        assert!(err.to_string().contains("employee"), "got: {err}");
        assert!(Actor::new("bob", Role::Accountant)
            .require(PAYROLL_WRITERS, "process salaries")
            .is_ok());
    }

    #[test]
    fn test_contribution_status_only_moves_forward() {
        assert_eq!(
            ContributionStatus::Pending.process().unwrap(),
            ContributionStatus::Processed
        );
        assert!(ContributionStatus::Processed.process().is_err());
    }

    #[test]
    fn test_loan_status_terminal_states() {
        assert_eq!(
            LoanStatus::Pending.transition(LoanStatus::Approved).unwrap(),
            LoanStatus::Approved
        );
        assert!(LoanStatus::Approved.transition(LoanStatus::Rejected).is_err());
        assert!(LoanStatus::Rejected.transition(LoanStatus::Approved).is_err());
        assert!(LoanStatus::Pending.transition(LoanStatus::Pending).is_err());
    }

    #[test]
    fn test_loan_decide_stamps_actor() {
        let loan_type = LoanType {
            id: 1,
            name: "Staff Loan".to_string(),
            description: String::new(),
        };
        let mut req = LoanRequest::new(7, &loan_type, 50000.0, 12, 4.5, date(2025, 3, 1)).unwrap();
        let actor = Actor::new("maria", Role::Manager);
        req.decide(LoanStatus::Rejected, &actor, now()).unwrap();
        assert_eq!(req.status, LoanStatus::Rejected);
        assert_eq!(req.processed_by.as_deref(), Some("maria"));
        assert!(req.decide(LoanStatus::Approved, &actor, now()).is_err());
    }

    #[test]
    fn test_loan_request_rejects_negative_amount() {
        let loan_type = LoanType {
            id: 1,
            name: "Staff Loan".to_string(),
            description: String::new(),
        };
        assert!(LoanRequest::new(7, &loan_type, -1.0, 12, 4.5, date(2025, 3, 1)).is_err());
        assert!(LoanRequest::new(7, &loan_type, 100.0, 0, 4.5, date(2025, 3, 1)).is_err());
    }

    #[test]
    fn test_salary_entry_process_once() {
        let input = crate::payroll::SalaryInput::basic(40000.0);
        let breakdown = crate::payroll::compute_salary(&input).unwrap();
        let mut entry = SalaryEntry::from_breakdown(1, date(2025, 3, 31), &breakdown);
        assert_eq!(entry.status(), PayStatus::Pending);
        entry.process(&Actor::new("acc", Role::Accountant), now()).unwrap();
        assert_eq!(entry.status(), PayStatus::Processed);
        assert!(entry.process(&Actor::new("acc", Role::Accountant), now()).is_err());
    }

    #[test]
    fn test_bonus_requires_positive_amount() {
        assert!(Bonus::new(1, 0.0, BonusType::Annual, None, date(2025, 1, 1)).is_err());
        let b = Bonus::new(1, 500.0, BonusType::Festival, Some("  ".into()), date(2025, 1, 1)).unwrap();
        assert!(b.reason.is_none());
    }

    #[test]
    fn test_overtime_amount_is_hours_times_rate() {
        let ot = Overtime::new(1, 2.5, 150.0, OvertimeType::Weekend, date(2025, 1, 4)).unwrap();
        assert_eq!(ot.amount, 375.0);
        let ot = Overtime::new(1, 1.006, 150.0, OvertimeType::Weekday, date(2025, 1, 6)).unwrap();
        assert_eq!(ot.hours, 1.01);
        assert_eq!(ot.amount, 151.5);
        assert_eq!(ot.status, OvertimeStatus::Pending);
        assert_eq!(ot.status.approve().unwrap(), OvertimeStatus::Approved);
    }

    #[test]
    fn test_kpi_entry_year_from_date() {
        let entry = KpiEntry::new(3, 88.0, date(2024, 12, 31), Some(2));
        assert_eq!(entry.year, 2024);
    }

    #[test]
    fn test_month_start() {
        assert_eq!(month_start(date(2025, 2, 17)), date(2025, 2, 1));
    }
}
