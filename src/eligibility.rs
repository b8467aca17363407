use crate::error::{PayrollError, Result};
use crate::models::{Employee, LoanType};

pub const HOME_LOAN_MIN_SALARY: f64 = 50000.0;
pub const GENERAL_LOAN_MIN_SALARY: f64 = 25000.0;
pub const PROBATION_ROLE: &str = "probation";

const DEFAULT_MULTIPLIER: f64 = 3.0;

// (loan type name, multiple of basic salary)
const LOAN_MULTIPLIERS: &[(&str, f64)] = &[
    ("staff loan", 3.0),
    ("home loan", 60.0),
    ("emergency loan", 2.0),
    ("education loan", 12.0),
    ("vehicle loan", 24.0),
    ("product loan", 6.0),
];

pub const REASON_ELIGIBLE: &str = "Eligible for this loan type";
pub const REASON_HOME_LOAN_SALARY: &str = "Basic salary too low for home loan (minimum 50,000)";
pub const REASON_PROBATION: &str = "Employees on probation are not eligible for loans";
pub const REASON_LOW_SALARY: &str =
    "Basic salary below 25,000 qualifies for emergency loans only";

#[derive(Debug, Clone, PartialEq)]
pub struct LoanEligibility {
    pub loan_type: LoanType,
    pub eligible: bool,
    pub max_amount: f64,
    pub reasons: Vec<String>,
}

fn normalized(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn loan_multiplier(loan_type_name: &str) -> f64 {
    let name = normalized(loan_type_name);
    LOAN_MULTIPLIERS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, m)| *m)
        .unwrap_or(DEFAULT_MULTIPLIER)
}

/// Evaluates every loan type independently against the employee's current
/// salary and role. Output order follows `loan_types`.
pub fn evaluate_loan_eligibility(
    employee: &Employee,
    loan_types: &[LoanType],
) -> Result<Vec<LoanEligibility>> {
    let basic = employee.basic_salary;
    if !basic.is_finite() || basic < 0.0 {
        return Err(PayrollError::InvalidAmount(format!(
            "basic salary must be zero or more, got {basic}"
        )));
    }
    let on_probation = normalized(&employee.role) == PROBATION_ROLE;

    let results = loan_types
        .iter()
        .map(|loan_type| {
            let name = normalized(&loan_type.name);
            let mut eligible = true;
            let mut reasons = Vec::new();

            if name == "home loan" && basic < HOME_LOAN_MIN_SALARY {
                eligible = false;
                reasons.push(REASON_HOME_LOAN_SALARY.to_string());
            }
            if on_probation {
                eligible = false;
                reasons.push(REASON_PROBATION.to_string());
            }
            if basic < GENERAL_LOAN_MIN_SALARY && name != "emergency loan" {
                eligible = false;
                reasons.push(REASON_LOW_SALARY.to_string());
            }
            if reasons.is_empty() {
                reasons.push(REASON_ELIGIBLE.to_string());
            }

            LoanEligibility {
                loan_type: loan_type.clone(),
                eligible,
                max_amount: basic * loan_multiplier(&loan_type.name),
                reasons,
            }
        })
        .collect();
    Ok(results)
}
