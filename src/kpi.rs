use std::fmt;

use tracing::debug;

use crate::error::{PayrollError, Result};
use crate::models::KpiRanking;

pub const KPI_MIN: f64 = 0.0;
pub const KPI_MAX: f64 = 100.0;

/// Problems in a ranking table that do not make ranking ambiguous but can
/// leave a KPI value without a tier.
#[derive(Debug, Clone, PartialEq)]
pub enum RankingWarning {
    Empty,
    /// Values strictly between `after` and `before` match no tier.
    Gap { after: f64, before: f64 },
    /// Two tiers share more than an endpoint; the lower-starting one wins.
    Overlap { first: i64, second: i64 },
    LowEndUncovered { starts_at: f64 },
    HighEndUncovered { ends_at: f64 },
}

impl fmt::Display for RankingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingWarning::Empty => write!(f, "ranking table is empty; no KPI will get a tier"),
            RankingWarning::Gap { after, before } => {
                write!(f, "values between {after} and {before} match no tier")
            }
            RankingWarning::Overlap { first, second } => {
                write!(f, "tiers {first} and {second} overlap; tier {first} takes precedence")
            }
            RankingWarning::LowEndUncovered { starts_at } => {
                write!(f, "values below {starts_at} match no tier")
            }
            RankingWarning::HighEndUncovered { ends_at } => {
                write!(f, "values above {ends_at} match no tier")
            }
        }
    }
}

pub fn validate_kpi_value(value: f64) -> Result<f64> {
    if !value.is_finite() || !(KPI_MIN..=KPI_MAX).contains(&value) {
        return Err(PayrollError::InvalidAmount(format!(
            "KPI value must be between {KPI_MIN} and {KPI_MAX}, got {value}"
        )));
    }
    Ok(value)
}

/// Sorts tiers by `min_value`, rejecting tables whose first-match result
/// would depend on input order.
fn sorted_table(table: &[KpiRanking]) -> Result<Vec<&KpiRanking>> {
    for r in table {
        if !r.min_value.is_finite() || !r.max_value.is_finite() || r.min_value > r.max_value {
            return Err(PayrollError::InvalidRange(format!(
                "tier {} has bounds {}..={}",
                r.id, r.min_value, r.max_value
            )));
        }
    }
    let mut sorted: Vec<&KpiRanking> = table.iter().collect();
    sorted.sort_by(|a, b| a.min_value.total_cmp(&b.min_value));
    for pair in sorted.windows(2) {
        if pair[0].min_value == pair[1].min_value && pair[0].id != pair[1].id {
            return Err(PayrollError::InvalidRange(format!(
                "tiers {} and {} both start at {}",
                pair[0].id, pair[1].id, pair[0].min_value
            )));
        }
    }
    Ok(sorted)
}

/// Returns the id of the first tier (lowest `min_value`) containing `value`,
/// inclusive at both ends, or `None` when no tier matches.
pub fn rank_kpi(value: f64, table: &[KpiRanking]) -> Result<Option<i64>> {
    let sorted = sorted_table(table)?;
    let hit = sorted
        .iter()
        .find(|r| r.min_value <= value && value <= r.max_value)
        .map(|r| r.id);
    if hit.is_none() {
        debug!(value, "KPI value matches no ranking tier");
    }
    Ok(hit)
}

pub fn validate_ranking_table(table: &[KpiRanking]) -> Result<Vec<RankingWarning>> {
    let sorted = sorted_table(table)?;
    let mut warnings = Vec::new();

    let Some(first) = sorted.first() else {
        warnings.push(RankingWarning::Empty);
        return Ok(warnings);
    };
    if first.min_value > KPI_MIN {
        warnings.push(RankingWarning::LowEndUncovered {
            starts_at: first.min_value,
        });
    }

    let mut reach = first.max_value;
    let mut reach_id = first.id;
    for r in sorted.iter().skip(1) {
        if r.min_value > reach {
            warnings.push(RankingWarning::Gap {
                after: reach,
                before: r.min_value,
            });
        } else if r.min_value < reach {
            warnings.push(RankingWarning::Overlap {
                first: reach_id,
                second: r.id,
            });
        }
        if r.max_value > reach {
            reach = r.max_value;
            reach_id = r.id;
        }
    }

    if reach < KPI_MAX {
        warnings.push(RankingWarning::HighEndUncovered { ends_at: reach });
    }
    Ok(warnings)
}
