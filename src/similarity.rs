use rayon::prelude::*;

pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

pub fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Symmetric distance matrix, row-major `n × n`, zero diagonal.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Euclidean distances between every pair of vectors, rows filled in parallel.
    pub fn euclidean(vectors: &[Vec<f32>]) -> Self {
        let n = vectors.len();
        let data: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| (0..n).map(move |j| (i, j)))
            .map(|(i, j)| if i == j { 0.0 } else { euclidean(&vectors[i], &vectors[j]) })
            .collect();
        Self { n, data }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_basics() {
        assert_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(squared_euclidean(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn matrix_is_symmetric() {
        let v = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 2.0]];
        let m = DistanceMatrix::euclidean(&v);
        assert_eq!(m.len(), 3);
        for i in 0..3 {
            assert_eq!(m.get(i, i), 0.0);
            for j in 0..3 {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
        assert!((m.get(1, 2) - 5f64.sqrt()).abs() < 1e-12);
    }
}
