//! Ward-linkage agglomerative clustering over document embeddings.
//!
//! The dendrogram is built once with the nearest-neighbor-chain algorithm
//! and then cut at every candidate cluster count; the cut with the best
//! mean silhouette wins.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::similarity::{squared_euclidean, DistanceMatrix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterParams {
    pub min_clusters: usize, // inclusive
    pub max_clusters: usize, // inclusive
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            min_clusters: 2,
            max_clusters: 14,
        }
    }
}

/// One agglomeration step. `a` and `b` are any member index of each side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub a: usize,
    pub b: usize,
    pub distance: f64,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterOutcome {
    pub labels: Vec<i64>,
    pub n_clusters: usize,
    pub silhouette_by_k: Vec<(usize, f64)>,
}

// Condensed upper-triangle storage for pairwise merge costs.
struct Condensed {
    n: usize,
    data: Vec<f64>,
}

impl Condensed {
    fn idx(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.n * i - i * (i + 1) / 2 + (j - i - 1)
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.data[self.idx(i, j)]
    }

    fn set(&mut self, i: usize, j: usize, v: f64) {
        let k = self.idx(i, j);
        self.data[k] = v;
    }
}

/// Full Ward merge sequence, sorted by merge distance (stable).
pub fn ward_linkage(vectors: &[Vec<f32>]) -> Vec<Merge> {
    let n = vectors.len();
    if n < 2 {
        return Vec::new();
    }

    // squared Euclidean; the Lance-Williams Ward update stays in squared space
    let data: Vec<f64> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| ((i + 1)..n).map(move |j| (i, j)))
        .map(|(i, j)| squared_euclidean(&vectors[i], &vectors[j]))
        .collect();
    let mut d2 = Condensed { n, data };

    let mut active = vec![true; n];
    let mut size = vec![1usize; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n - 1);

    while merges.len() < n - 1 {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&x| x) {
                chain.push(first);
            }
        }

        // grow the chain until a reciprocal nearest-neighbor pair appears
        let (a, b) = loop {
            let a = chain[chain.len() - 1];
            let prev = if chain.len() >= 2 { Some(chain[chain.len() - 2]) } else { None };

            let mut best = prev;
            let mut best_d = prev.map(|p| d2.get(a, p)).unwrap_or(f64::INFINITY);
            for x in 0..n {
                if x == a || !active[x] {
                    continue;
                }
                let d = d2.get(a, x);
                if d < best_d {
                    best_d = d;
                    best = Some(x);
                }
            }

            match best {
                Some(b) if Some(b) == prev => break (a, b),
                Some(b) => chain.push(b),
                None => unreachable!("at least two active clusters remain"),
            }
        };
        chain.truncate(chain.len() - 2);

        let dab = d2.get(a, b);
        let (keep, drop) = (a.min(b), a.max(b));
        let (na, nb) = (size[a] as f64, size[b] as f64);
        for k in 0..n {
            if !active[k] || k == a || k == b {
                continue;
            }
            let nk = size[k] as f64;
            let v = ((nk + na) * d2.get(k, a) + (nk + nb) * d2.get(k, b) - nk * dab) / (na + nb + nk);
            d2.set(k, keep, v);
        }
        active[drop] = false;
        size[keep] += size[drop];

        merges.push(Merge {
            a: keep,
            b: drop,
            distance: dab.max(0.0).sqrt(),
            size: size[keep],
        });
    }

    merges.sort_by(|x, y| x.distance.total_cmp(&y.distance));
    merges
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Labels after applying the first `n - k` merges. Clusters are numbered
/// by the position of their first member.
pub fn cut_tree(n: usize, merges: &[Merge], k: usize) -> Vec<i64> {
    let mut parent: Vec<usize> = (0..n).collect();
    let steps = n.saturating_sub(k.max(1)).min(merges.len());
    for m in &merges[..steps] {
        let ra = find(&mut parent, m.a);
        let rb = find(&mut parent, m.b);
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let mut label_of_root: Vec<Option<i64>> = vec![None; n];
    let mut next = 0i64;
    (0..n)
        .map(|i| {
            let r = find(&mut parent, i);
            *label_of_root[r].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}

/// Mean silhouette coefficient. Singleton clusters score 0 for their member.
pub fn silhouette_score(dist: &DistanceMatrix, labels: &[i64]) -> f64 {
    if dist.is_empty() {
        return 0.0;
    }
    let n = dist.len();
    debug_assert_eq!(labels.len(), n);
    let k = labels.iter().copied().max().map(|m| m as usize + 1).unwrap_or(0);
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l as usize] += 1;
    }

    let total: f64 = (0..n)
        .into_par_iter()
        .map(|i| {
            let own = labels[i] as usize;
            if sizes[own] <= 1 {
                return 0.0;
            }
            let mut sums = vec![0.0f64; k];
            for j in 0..n {
                if i != j {
                    sums[labels[j] as usize] += dist.get(i, j);
                }
            }
            let a = sums[own] / (sizes[own] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != own && sizes[c] > 0)
                .map(|c| sums[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let m = a.max(b);
            if m == 0.0 || !m.is_finite() {
                0.0
            } else {
                (b - a) / m
            }
        })
        .sum();
    total / n as f64
}

/// Cluster `vectors`, picking the cluster count with the best silhouette.
/// Ties keep the smaller count.
pub fn cluster_vectors(vectors: &[Vec<f32>], params: ClusterParams) -> ClusterOutcome {
    let n = vectors.len();
    let start = std::time::Instant::now();
    debug!(
        "Clustering started - documents={}, k_range={}..={}",
        n, params.min_clusters, params.max_clusters
    );

    let upper = params.max_clusters.min(n.saturating_sub(1));
    let lower = params.min_clusters.max(2);
    if n < 3 || lower > upper {
        warn!(
            "Too few documents for silhouette selection - documents={}, k_range={}..={}; using one cluster",
            n, params.min_clusters, params.max_clusters
        );
        return ClusterOutcome {
            labels: vec![0; n],
            n_clusters: usize::from(n > 0),
            silhouette_by_k: Vec::new(),
        };
    }

    let merges = ward_linkage(vectors);
    let dist = DistanceMatrix::euclidean(vectors);

    let mut silhouette_by_k = Vec::with_capacity(upper - lower + 1);
    let mut best: Option<(usize, f64, Vec<i64>)> = None;
    for k in lower..=upper {
        let labels = cut_tree(n, &merges, k);
        let score = silhouette_score(&dist, &labels);
        debug!("Silhouette - k={}, score={:.4}", k, score);
        silhouette_by_k.push((k, score));
        if best.as_ref().map_or(true, |(_, s, _)| score > *s) {
            best = Some((k, score, labels));
        }
    }

    let (k, score, labels) = match best {
        Some(b) => b,
        None => unreachable!("candidate range is non-empty"),
    };

    let mut sizes = vec![0usize; k];
    for &l in &labels {
        sizes[l as usize] += 1;
    }
    debug!(
        "Cluster size distribution - min={}, max={}, avg={:.1}",
        sizes.iter().min().copied().unwrap_or(0),
        sizes.iter().max().copied().unwrap_or(0),
        n as f32 / k as f32
    );
    info!(
        "Clustering completed - documents={}, clusters={}, silhouette={:.4}, duration={:.2}s",
        n,
        k,
        score,
        start.elapsed().as_secs_f32()
    );

    ClusterOutcome {
        labels,
        n_clusters: k,
        silhouette_by_k,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f32>> {
        // three well-separated groups of three
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.0],
            vec![10.0, 10.1],
            vec![-10.0, 10.0],
            vec![-10.1, 10.0],
            vec![-10.0, 10.1],
        ]
    }

    #[test]
    fn linkage_has_n_minus_one_sorted_merges() {
        let m = ward_linkage(&blobs());
        assert_eq!(m.len(), 8);
        assert!(m.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(m.last().unwrap().size, 9);
    }

    #[test]
    fn ward_distance_for_two_points_is_euclidean() {
        let m = ward_linkage(&[vec![0.0, 0.0], vec![3.0, 4.0]]);
        assert_eq!(m.len(), 1);
        assert!((m[0].distance - 5.0).abs() < 1e-12);
    }

    #[test]
    fn cut_tree_numbers_by_first_member() {
        let v = blobs();
        let m = ward_linkage(&v);
        let labels = cut_tree(v.len(), &m, 3);
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1, 2, 2, 2]);
        assert_eq!(cut_tree(v.len(), &m, 1), vec![0; 9]);
        assert_eq!(cut_tree(v.len(), &m, 9), (0..9).collect::<Vec<i64>>());
    }

    #[test]
    fn silhouette_selects_natural_cluster_count() {
        let out = cluster_vectors(&blobs(), ClusterParams::default());
        assert_eq!(out.n_clusters, 3);
        assert_eq!(out.labels, vec![0, 0, 0, 1, 1, 1, 2, 2, 2]);
        // k is capped at n - 1
        assert_eq!(out.silhouette_by_k.last().unwrap().0, 8);
    }

    #[test]
    fn silhouette_of_separated_blobs_is_high() {
        let v = blobs();
        let d = DistanceMatrix::euclidean(&v);
        let s = silhouette_score(&d, &[0, 0, 0, 1, 1, 1, 2, 2, 2]);
        assert!(s > 0.9, "silhouette {s}");
        let bad = silhouette_score(&d, &[0, 1, 2, 0, 1, 2, 0, 1, 2]);
        assert!(bad < 0.0);
    }

    #[test]
    fn silhouette_of_empty_matrix_is_zero() {
        let d = DistanceMatrix::euclidean(&[]);
        assert!(d.is_empty());
        assert_eq!(silhouette_score(&d, &[]), 0.0);
    }

    #[test]
    fn tiny_corpus_is_one_cluster() {
        let out = cluster_vectors(&[vec![1.0], vec![2.0]], ClusterParams::default());
        assert_eq!(out.labels, vec![0, 0]);
        assert_eq!(out.n_clusters, 1);
    }

    #[test]
    fn deterministic_across_runs() {
        let a = cluster_vectors(&blobs(), ClusterParams::default());
        let b = cluster_vectors(&blobs(), ClusterParams::default());
        assert_eq!(a, b);
    }
}
