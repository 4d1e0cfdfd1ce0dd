use tracing::info;

use crate::error::Result;
use crate::models::{GroupStats, OpportunityRow};
use crate::normalize::{scale_all, DegeneratePolicy, IMPORTANCE_RANGE, SATISFACTION_RANGE};

/// `importance + max(importance - satisfaction, 0)`, both already normalized.
pub fn opportunity(importance: f64, satisfaction: f64) -> f64 {
    importance + (importance - satisfaction).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringOptions {
    pub precision: u32,
    pub on_degenerate: DegeneratePolicy,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            precision: crate::normalize::DEFAULT_PRECISION,
            on_degenerate: DegeneratePolicy::Fail,
        }
    }
}

/// Normalize satisfaction and importance across all groups and score each one.
/// Row order follows `groups`.
pub fn score_groups(groups: &[GroupStats], opts: ScoringOptions) -> Result<Vec<OpportunityRow>> {
    let raw_sat: Vec<f64> = groups.iter().map(|g| g.raw_satisfaction).collect();
    let raw_imp: Vec<f64> = groups.iter().map(|g| g.raw_importance).collect();

    let sat = scale_all("satisfaction", &raw_sat, SATISFACTION_RANGE, opts.precision, opts.on_degenerate)?;
    let imp = scale_all("importance", &raw_imp, IMPORTANCE_RANGE, opts.precision, opts.on_degenerate)?;

    let rows: Vec<OpportunityRow> = groups
        .iter()
        .zip(sat.into_iter().zip(imp))
        .map(|(g, (satisfaction, importance))| OpportunityRow {
            key: g.key,
            label: g.key.to_string(),
            count: g.count,
            raw_satisfaction: g.raw_satisfaction,
            raw_importance: g.raw_importance,
            satisfaction,
            importance,
            opportunity: opportunity(importance, satisfaction),
        })
        .collect();

    if let Some(top) = rows.iter().max_by(|a, b| a.opportunity.total_cmp(&b.opportunity)) {
        info!(
            "Opportunity scoring completed - groups={}, top={} ({:.4})",
            rows.len(),
            top.label,
            top.opportunity
        );
    }
    Ok(rows)
}
