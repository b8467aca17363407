use tracing::debug;

use crate::error::{PayrollError, Result};

/// Employee share of EPF, as a fraction of basic salary.
pub const EPF_EMPLOYEE_RATE: f64 = 0.08;
/// Employer share of EPF.
pub const EPF_EMPLOYER_RATE: f64 = 0.12;
/// Employer-only ETF contribution.
pub const ETF_EMPLOYER_RATE: f64 = 0.03;
/// No-pay deductions divide basic salary by a fixed 30 days regardless of the
/// calendar month.
pub const NO_PAY_DAY_DIVISOR: f64 = 30.0;

/// Float noise allowed below zero before an unrounded total counts as negative.
const NEGATIVE_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rounding {
    /// Nearest whole currency unit. Used for everything that gets persisted.
    #[default]
    WholeUnit,
    Cents,
}

impl Rounding {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Rounding::WholeUnit => value.round(),
            Rounding::Cents => round_cents(value),
        }
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn require_non_negative(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(PayrollError::InvalidAmount(format!(
            "{field} must be zero or more, got {value}"
        )));
    }
    Ok(value)
}

fn require_positive(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PayrollError::InvalidAmount(format!(
            "{field} must be greater than zero, got {value}"
        )));
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Salary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SalaryInput {
    pub basic_salary: f64,
    pub ot_hours: f64,
    pub ot_rate: f64,
    pub bonus_amount: f64,
    pub increment_amount: f64,
    pub no_pay_days: f64,
}

impl SalaryInput {
    pub fn basic(basic_salary: f64) -> Self {
        Self {
            basic_salary,
            ..Self::default()
        }
    }
}

/// Every component is already rounded, so `total_salary` is exactly
/// `basic + ot + bonus + increment - no_pay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryBreakdown {
    pub basic_salary: f64,
    pub ot_pay: f64,
    pub bonus_pay: f64,
    pub increment_pay: f64,
    pub no_pay_deduction: f64,
    pub total_salary: f64,
}

pub fn compute_salary(input: &SalaryInput) -> Result<SalaryBreakdown> {
    compute_salary_with(input, Rounding::WholeUnit)
}

pub fn compute_salary_with(input: &SalaryInput, rounding: Rounding) -> Result<SalaryBreakdown> {
    let basic = require_non_negative("basic salary", input.basic_salary)?;
    let ot_hours = require_non_negative("overtime hours", input.ot_hours)?;
    let ot_rate = require_non_negative("overtime rate", input.ot_rate)?;
    let bonus = require_non_negative("bonus amount", input.bonus_amount)?;
    let increment = require_non_negative("increment amount", input.increment_amount)?;
    let no_pay_days = require_non_negative("no-pay days", input.no_pay_days)?;

    let raw_ot = ot_hours * ot_rate;
    let raw_no_pay = no_pay_days * (basic / NO_PAY_DAY_DIVISOR);
    let raw_total = basic + raw_ot + bonus + increment - raw_no_pay;
    if raw_total < -NEGATIVE_TOLERANCE {
        return Err(PayrollError::InvalidAmount(format!(
            "total salary would be negative ({}): no-pay deduction of {} exceeds earnings",
            round_cents(raw_total),
            round_cents(raw_no_pay)
        )));
    }

    let basic_salary = rounding.apply(basic);
    let ot_pay = rounding.apply(raw_ot);
    let bonus_pay = rounding.apply(bonus);
    let increment_pay = rounding.apply(increment);
    let earnings = basic_salary + ot_pay + bonus_pay + increment_pay;
    // Rounding alone must not push a valid total below zero.
    let no_pay_deduction = rounding.apply(raw_no_pay).min(earnings);

    // Re-round to drop float noise from the cent-precision path.
    let total_salary = round_cents(earnings - no_pay_deduction);

    debug!(basic_salary, ot_pay, no_pay_deduction, total_salary, "computed salary");
    Ok(SalaryBreakdown {
        basic_salary,
        ot_pay,
        bonus_pay,
        increment_pay,
        no_pay_deduction,
        total_salary,
    })
}

// ---------------------------------------------------------------------------
// Statutory contributions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpfBreakdown {
    pub employee_contribution: f64,
    pub employer_contribution: f64,
    pub total_contribution: f64,
}

pub fn compute_epf(basic_salary: f64) -> Result<EpfBreakdown> {
    let basic = require_positive("basic salary", basic_salary)?;
    let employee_contribution = (basic * EPF_EMPLOYEE_RATE).round();
    let employer_contribution = (basic * EPF_EMPLOYER_RATE).round();
    Ok(EpfBreakdown {
        employee_contribution,
        employer_contribution,
        total_contribution: employee_contribution + employer_contribution,
    })
}

pub fn compute_etf(basic_salary: f64) -> Result<f64> {
    let basic = require_positive("basic salary", basic_salary)?;
    Ok((basic * ETF_EMPLOYER_RATE).round())
}

// ---------------------------------------------------------------------------
// Overtime
// ---------------------------------------------------------------------------

/// Returns `(hours, amount)` with hours kept to two decimals and the amount
/// to cents.
pub fn compute_overtime(hours: f64, rate_per_hour: f64) -> Result<(f64, f64)> {
    let hours = round_cents(require_positive("overtime hours", hours)?);
    let rate = require_positive("overtime rate", rate_per_hour)?;
    if hours <= 0.0 {
        return Err(PayrollError::InvalidAmount(
            "overtime hours round to zero".to_string(),
        ));
    }
    Ok((hours, round_cents(hours * rate)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_salary_example() {
        let input = SalaryInput {
            basic_salary: 50000.0,
            ot_hours: 10.0,
            ot_rate: 200.0,
            bonus_amount: 5000.0,
            increment_amount: 2000.0,
            no_pay_days: 0.0,
        };
        let out = compute_salary(&input).unwrap();
        assert_eq!(out.ot_pay, 2000.0);
        assert_eq!(out.no_pay_deduction, 0.0);
        assert_eq!(out.total_salary, 59000.0);
    }

    #[test]
    fn test_compute_salary_rejects_negative_total() {
        let input = SalaryInput {
            basic_salary: 10000.0,
            no_pay_days: 31.0,
            ..SalaryInput::default()
        };
        let err = compute_salary(&input).unwrap_err();
        assert!(matches!(err, PayrollError::InvalidAmount(_)), "got: {err}");
    }

    #[test]
    fn test_small_positive_total_survives_rounding() {
        // 100.4 + 0.4 - 30.119 * 100.4 / 30 = 0.0017
        let input = SalaryInput {
            basic_salary: 100.4,
            ot_hours: 1.0,
            ot_rate: 0.4,
            no_pay_days: 30.119,
            ..SalaryInput::default()
        };
        let out = compute_salary(&input).unwrap();
        assert_eq!(out.basic_salary, 100.0);
        assert_eq!(out.no_pay_deduction, 100.0);
        assert_eq!(out.total_salary, 0.0);
    }

    #[test]
    fn test_small_negative_total_is_rejected_before_rounding() {
        let input = SalaryInput {
            basic_salary: 10000.6,
            no_pay_days: 30.00001,
            ..SalaryInput::default()
        };
        let err = compute_salary(&input).unwrap_err();
        assert!(matches!(err, PayrollError::InvalidAmount(_)), "got: {err}");
        let err = compute_salary_with(&input, Rounding::Cents).unwrap_err();
        assert!(matches!(err, PayrollError::InvalidAmount(_)), "got: {err}");
    }

    #[test]
    fn test_compute_salary_full_month_no_pay_is_zero() {
        let input = SalaryInput {
            basic_salary: 30000.0,
            no_pay_days: 30.0,
            ..SalaryInput::default()
        };
        let out = compute_salary(&input).unwrap();
        assert_eq!(out.no_pay_deduction, 30000.0);
        assert_eq!(out.total_salary, 0.0);
    }

    #[test]
    fn test_compute_salary_rejects_negative_inputs() {
        let fields: [fn(&mut SalaryInput); 6] = [
            |i| i.basic_salary = -1.0,
            |i| i.ot_hours = -1.0,
            |i| i.ot_rate = -1.0,
            |i| i.bonus_amount = -1.0,
            |i| i.increment_amount = -1.0,
            |i| i.no_pay_days = -1.0,
        ];
        for set in fields {
            let mut input = SalaryInput::basic(40000.0);
            set(&mut input);
            assert!(compute_salary(&input).is_err(), "accepted {input:?}");
        }
        assert!(compute_salary(&SalaryInput::basic(f64::NAN)).is_err());
    }

    #[test]
    fn test_compute_salary_rounds_to_whole_units() {
        let input = SalaryInput {
            basic_salary: 45000.0,
            ot_hours: 3.5,
            ot_rate: 187.5,
            no_pay_days: 1.0,
            ..SalaryInput::default()
        };
        let out = compute_salary(&input).unwrap();
        // 3.5 * 187.5 = 656.25
        assert_eq!(out.ot_pay, 656.0);
        assert_eq!(out.no_pay_deduction, 1500.0);
        assert_eq!(out.total_salary, 45000.0 + 656.0 - 1500.0);
    }

    #[test]
    fn test_compute_salary_cent_precision() {
        let input = SalaryInput {
            basic_salary: 45000.0,
            ot_hours: 3.5,
            ot_rate: 187.5,
            no_pay_days: 1.0,
            ..SalaryInput::default()
        };
        let out = compute_salary_with(&input, Rounding::Cents).unwrap();
        assert_eq!(out.ot_pay, 656.25);
        assert_eq!(out.total_salary, 44156.25);
    }

    #[test]
    fn test_total_matches_components() {
        for basic in [0.0, 1.0, 25000.0, 33333.0, 87654.0] {
            for days in [0.0, 0.5, 2.0, 7.0] {
                let input = SalaryInput {
                    basic_salary: basic,
                    ot_hours: 4.0,
                    ot_rate: 120.0,
                    bonus_amount: 1000.0,
                    increment_amount: 250.0,
                    no_pay_days: days,
                };
                let out = compute_salary(&input).unwrap();
                assert!(out.total_salary >= 0.0);
                assert_eq!(
                    out.total_salary,
                    out.basic_salary + out.ot_pay + out.bonus_pay + out.increment_pay
                        - out.no_pay_deduction
                );
            }
        }
    }

    #[test]
    fn test_compute_epf() {
        let epf = compute_epf(40000.0).unwrap();
        assert_eq!(epf.employee_contribution, 3200.0);
        assert_eq!(epf.employer_contribution, 4800.0);
        assert_eq!(epf.total_contribution, 8000.0);
    }

    #[test]
    fn test_epf_total_is_sum_of_rounded_shares() {
        for basic in [1.0, 13.0, 999.0, 25001.0, 33337.0, 123457.0] {
            let epf = compute_epf(basic).unwrap();
            assert_eq!(
                epf.total_contribution,
                epf.employee_contribution + epf.employer_contribution
            );
            assert_eq!(
                epf.total_contribution,
                (basic * 0.08).round() + (basic * 0.12).round()
            );
        }
    }

    #[test]
    fn test_epf_and_etf_reject_non_positive_salary() {
        assert!(compute_epf(0.0).is_err());
        assert!(compute_epf(-100.0).is_err());
        assert!(compute_etf(0.0).is_err());
    }

    #[test]
    fn test_compute_etf() {
        assert_eq!(compute_etf(40000.0).unwrap(), 1200.0);
        assert_eq!(compute_etf(33337.0).unwrap(), 1000.0);
    }

    #[test]
    fn test_compute_overtime() {
        assert_eq!(compute_overtime(2.0, 250.0).unwrap(), (2.0, 500.0));
        assert!(compute_overtime(0.0, 250.0).is_err());
        assert!(compute_overtime(2.0, 0.0).is_err());
        assert!(compute_overtime(0.001, 250.0).is_err());
    }
}
