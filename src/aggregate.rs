use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::models::{GroupKey, GroupStats, ScoredDocument};

/// Group scored documents by (cluster, action) and compute raw
/// satisfaction (mean sentiment) and raw importance (percent share).
///
/// Groups come back in ascending key order.
pub fn aggregate(scored: &[ScoredDocument]) -> Result<Vec<GroupStats>> {
    if scored.is_empty() {
        return Err(PipelineError::EmptyCorpus { stage: "aggregation" });
    }

    let mut sums: BTreeMap<GroupKey, (i64, usize)> = BTreeMap::new();
    for d in scored {
        let e = sums.entry(d.key).or_insert((0, 0));
        e.0 += d.sentiment;
        e.1 += 1;
    }

    let total = scored.len() as f64;
    let groups: Vec<GroupStats> = sums
        .into_iter()
        .map(|(key, (sum, count))| GroupStats {
            key,
            count,
            raw_satisfaction: sum as f64 / count as f64,
            raw_importance: count as f64 / total * 100.0,
        })
        .collect();

    debug!(
        "Aggregation - documents={}, groups={}, clusters={}",
        scored.len(),
        groups.len(),
        groups.iter().map(|g| g.key.cluster).collect::<std::collections::BTreeSet<_>>().len()
    );
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sd(cluster: i64, action: i64, sentiment: i64) -> ScoredDocument {
        ScoredDocument {
            id: format!("{cluster}-{action}-{sentiment}"),
            key: GroupKey::new(cluster, action),
            sentiment,
            matches: vec![],
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(
            aggregate(&[]),
            Err(PipelineError::EmptyCorpus { stage: "aggregation" })
        );
    }

    #[test]
    fn mean_and_share_per_group() {
        let docs = vec![sd(1, 0, 3), sd(0, 1, 2), sd(1, 0, -1), sd(0, 1, 1)];
        let groups = aggregate(&docs).unwrap();
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].key, GroupKey::new(0, 1));
        assert_eq!(groups[0].count, 2);
        assert!((groups[0].raw_satisfaction - 1.5).abs() < 1e-12);
        assert!((groups[0].raw_importance - 50.0).abs() < 1e-12);

        assert_eq!(groups[1].key, GroupKey::new(1, 0));
        assert!((groups[1].raw_satisfaction - 1.0).abs() < 1e-12);
    }

    #[test]
    fn only_observed_pairs_become_groups() {
        let docs = vec![sd(0, 0, 0), sd(2, 5, 0), sd(2, 5, 1)];
        let keys: Vec<GroupKey> = aggregate(&docs).unwrap().into_iter().map(|g| g.key).collect();
        assert_eq!(keys, vec![GroupKey::new(0, 0), GroupKey::new(2, 5)]);
    }

    #[test]
    fn importance_sums_to_one_hundred() {
        let docs: Vec<ScoredDocument> = (0..7).map(|i| sd(i % 3, i % 2, i)).collect();
        let total: f64 = aggregate(&docs).unwrap().iter().map(|g| g.raw_importance).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }
}
