//! Min-max rescaling of group-level raw values.
//!
//! `scaled = lo + (raw - min) / (max - min) * (hi - lo)`, rounded to a fixed
//! number of decimals. A value set with a single distinct value cannot be
//! scaled and is reported as [`PipelineError::DegenerateInput`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub lo: f64,
    pub hi: f64,
}

impl FeatureRange {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn midpoint(&self) -> f64 {
        (self.lo + self.hi) / 2.0
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }
}

pub const SATISFACTION_RANGE: FeatureRange = FeatureRange::new(-10.0, 10.0);
pub const IMPORTANCE_RANGE: FeatureRange = FeatureRange::new(0.0, 10.0);
pub const DEFAULT_PRECISION: u32 = 4;

/// What to do when every raw value is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    #[default]
    Fail,
    /// Place every group at the middle of the target range.
    Midpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: f64,
    pub max: f64,
    pub range: FeatureRange,
}

impl MinMaxScaler {
    /// Fit to `values`. `what` names the quantity in errors and logs.
    pub fn fit(what: &'static str, values: &[f64], range: FeatureRange) -> Result<Self> {
        if values.is_empty() {
            return Err(PipelineError::EmptyCorpus { stage: "scaling" });
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max == min {
            return Err(PipelineError::DegenerateInput {
                what,
                count: values.len(),
                value: min,
            });
        }
        debug!("Scaler fitted - what={}, min={}, max={}, range=[{}, {}]", what, min, max, range.lo, range.hi);
        Ok(Self { min, max, range })
    }

    pub fn transform(&self, raw: f64) -> f64 {
        self.range.lo + (raw - self.min) / (self.max - self.min) * (self.range.hi - self.range.lo)
    }

    pub fn transform_rounded(&self, raw: f64, precision: u32) -> f64 {
        round_to(self.transform(raw), precision)
    }
}

/// Round half away from zero to `digits` decimals.
pub fn round_to(v: f64, digits: u32) -> f64 {
    let f = 10f64.powi(digits as i32);
    (v * f).round() / f
}

/// Scale a full value set, applying `policy` when the set is degenerate.
pub fn scale_all(
    what: &'static str,
    values: &[f64],
    range: FeatureRange,
    precision: u32,
    policy: DegeneratePolicy,
) -> Result<Vec<f64>> {
    match MinMaxScaler::fit(what, values, range) {
        Ok(scaler) => Ok(values
            .iter()
            .map(|&v| scaler.transform_rounded(v, precision))
            .collect()),
        Err(PipelineError::DegenerateInput { count, value, .. }) if policy == DegeneratePolicy::Midpoint => {
            warn!(
                "Degenerate {} scaling - all {} values equal {}, assigning midpoint {}",
                what,
                count,
                value,
                range.midpoint()
            );
            Ok(vec![round_to(range.midpoint(), precision); values.len()])
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfaction_endpoints_map_to_range_edges() {
        let out = scale_all("satisfaction", &[5.0, 15.0], SATISFACTION_RANGE, 4, DegeneratePolicy::Fail).unwrap();
        assert_eq!(out, vec![-10.0, 10.0]);
        assert!(out.iter().all(|&v| SATISFACTION_RANGE.contains(v)));
        assert!(!SATISFACTION_RANGE.contains(10.0001));
    }

    #[test]
    fn importance_interior_point() {
        let s = MinMaxScaler::fit("importance", &[10.0, 20.0, 50.0], IMPORTANCE_RANGE).unwrap();
        assert_eq!(s.transform(10.0), 0.0);
        assert_eq!(s.transform(50.0), 10.0);
        assert!((s.transform(20.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn identical_values_fail_instead_of_nan() {
        let err = scale_all("satisfaction", &[7.0, 7.0, 7.0], SATISFACTION_RANGE, 4, DegeneratePolicy::Fail)
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::DegenerateInput { what: "satisfaction", count: 3, value: 7.0 }
        );
    }

    #[test]
    fn single_group_is_degenerate() {
        assert!(matches!(
            MinMaxScaler::fit("importance", &[100.0], IMPORTANCE_RANGE),
            Err(PipelineError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn empty_values_are_rejected() {
        assert_eq!(
            MinMaxScaler::fit("importance", &[], IMPORTANCE_RANGE),
            Err(PipelineError::EmptyCorpus { stage: "scaling" })
        );
    }

    #[test]
    fn midpoint_policy_fills_range_center() {
        let out = scale_all("satisfaction", &[7.0, 7.0], SATISFACTION_RANGE, 4, DegeneratePolicy::Midpoint).unwrap();
        assert_eq!(out, vec![0.0, 0.0]);
        let out = scale_all("importance", &[50.0, 50.0], IMPORTANCE_RANGE, 4, DegeneratePolicy::Midpoint).unwrap();
        assert_eq!(out, vec![5.0, 5.0]);
    }

    #[test]
    fn rounds_to_four_decimals() {
        let out = scale_all("satisfaction", &[0.0, 1.0, 3.0], SATISFACTION_RANGE, 4, DegeneratePolicy::Fail).unwrap();
        // 1/3 * 20 - 10 = -3.3333...
        assert_eq!(out[1], -3.3333);
        assert_eq!(round_to(2.71828, 2), 2.72);
        assert_eq!(round_to(-0.00004, 4), -0.0);
    }
}
