use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::models::ClusterKeywords;

/// Top TF-IDF keywords per cluster.
///
/// Each cluster's member tokens are pooled into one pseudo-document. Weights
/// use raw counts, smooth idf `ln((1 + n) / (1 + df)) + 1` and l2
/// normalization. Single-character tokens are ignored.
pub fn cluster_keywords(labeled: &[(i64, &[String])], top_n: usize) -> Vec<ClusterKeywords> {
    let mut pooled: BTreeMap<i64, (usize, HashMap<&str, usize>)> = BTreeMap::new();
    for &(cluster, tokens) in labeled {
        let entry = pooled.entry(cluster).or_default();
        entry.0 += 1;
        for t in tokens {
            if t.chars().count() >= 2 {
                *entry.1.entry(t.as_str()).or_insert(0) += 1;
            }
        }
    }

    let n = pooled.len() as f64;
    let mut df: HashMap<&str, usize> = HashMap::new();
    for (_, counts) in pooled.values() {
        for &w in counts.keys() {
            *df.entry(w).or_insert(0) += 1;
        }
    }
    let idf = |w: &str| ((1.0 + n) / (1.0 + df[w] as f64)).ln() + 1.0;

    pooled
        .into_iter()
        .map(|(cluster, (documents, counts))| {
            let mut weights: Vec<(String, f64)> = counts
                .iter()
                .map(|(&w, &c)| (w.to_string(), c as f64 * idf(w)))
                .collect();
            let norm = weights.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, v) in weights.iter_mut() {
                    *v /= norm;
                }
            }
            weights.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            weights.truncate(top_n);
            debug!(
                "Cluster keywords - cluster={}, documents={}, top={:?}",
                cluster,
                documents,
                weights.iter().take(5).map(|(w, _)| w.as_str()).collect::<Vec<_>>()
            );
            ClusterKeywords {
                cluster,
                documents,
                keywords: weights,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn distinctive_words_rank_first() {
        let a1 = toks("보청기 배터리 병원");
        let a2 = toks("보청기 배터리");
        let b1 = toks("수어 통역 병원");
        let input: Vec<(i64, &[String])> = vec![(0, &a1), (0, &a2), (1, &b1)];
        let out = cluster_keywords(&input, 10);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].cluster, 0);
        assert_eq!(out[0].documents, 2);
        // 보청기 and 배터리 tie on weight; ties are alphabetical
        assert_eq!(out[0].keywords[0].0, "배터리");
        assert_eq!(out[0].keywords[1].0, "보청기");
        // 병원 appears in both clusters so it is down-weighted
        assert_eq!(out[0].keywords.last().unwrap().0, "병원");
    }

    #[test]
    fn weights_are_l2_normalized() {
        let a = toks("소리 소리 진동 알림");
        let b = toks("자막 영상");
        let input: Vec<(i64, &[String])> = vec![(3, &a), (7, &b)];
        for ck in cluster_keywords(&input, 10) {
            let norm: f64 = ck.keywords.iter().map(|(_, v)| v * v).sum();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn single_char_tokens_are_ignored_and_top_n_applies() {
        let a = toks("a 가 소리 진동 알림 자막");
        let input: Vec<(i64, &[String])> = vec![(0, &a)];
        let out = cluster_keywords(&input, 2);
        assert_eq!(out[0].keywords.len(), 2);
        assert!(out[0].keywords.iter().all(|(w, _)| w.chars().count() >= 2));
    }
}
