//! Cluster Engine
//!
//! Seeded k-means with k-means++ initialization and multiple restarts.
//! Every floating point sum runs in a fixed order, so the same matrix, `k`,
//! seed and restart count always produce the same assignment.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{ClusterError, Result};
use crate::model::{ClusterAssignment, FeatureMatrix};

/// Result of a clustering run
#[derive(Clone, Debug, Serialize)]
pub struct ClusterFit {
    pub assignment: ClusterAssignment,

    /// Final centroid per cluster id
    pub centroids: Vec<Vec<f64>>,

    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
}

/// Partitions assets into `k` clusters in return space
pub struct ClusterEngine {
    clusters: usize,
    seed: u64,
    restarts: usize,
    max_iterations: usize,
    tolerance: f64,
}

struct Run {
    labels: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    inertia: f64,
    iterations: usize,
}

impl ClusterEngine {
    pub const fn new(config: &EngineConfig) -> Self {
        Self {
            clusters: config.clusters,
            seed: config.seed,
            restarts: config.restarts,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        }
    }

    /// Fit the matrix, keeping the lowest-inertia restart (earliest on ties)
    pub fn fit(&self, matrix: &FeatureMatrix) -> Result<ClusterFit> {
        self.validate(matrix)?;

        let points = matrix.rows();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut best: Option<Run> = None;

        for restart in 0..self.restarts {
            let initial = kmeans_plus_plus(points, self.clusters, &mut rng);
            let run = self.lloyd(points, initial);
            debug!(
                restart,
                inertia = run.inertia,
                iterations = run.iterations,
                "k-means restart finished"
            );

            if best.as_ref().is_none_or(|b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        let best = best.ok_or_else(|| ClusterError::Configuration("no restarts ran".into()))?;
        let assignment =
            ClusterAssignment::new(self.clusters, matrix.tickers().to_vec(), best.labels)?;

        info!(
            assets = assignment.len(),
            clusters = self.clusters,
            inertia = best.inertia,
            sizes = ?assignment.cluster_sizes(),
            "clustering complete"
        );

        Ok(ClusterFit {
            assignment,
            centroids: best.centroids,
            inertia: best.inertia,
        })
    }

    fn validate(&self, matrix: &FeatureMatrix) -> Result<()> {
        if self.clusters == 0 {
            return Err(ClusterError::Configuration("cluster count must be at least 1".into()));
        }
        if self.restarts == 0 {
            return Err(ClusterError::Configuration("restart count must be at least 1".into()));
        }
        if self.max_iterations == 0 {
            return Err(ClusterError::Configuration("iteration cap must be at least 1".into()));
        }
        if self.clusters > matrix.n_assets() {
            return Err(ClusterError::Configuration(format!(
                "{} clusters requested for {} assets",
                self.clusters,
                matrix.n_assets()
            )));
        }
        Ok(())
    }

    /// Assign-to-nearest / recompute-centroid until stable
    fn lloyd(&self, points: &[Vec<f64>], mut centroids: Vec<Vec<f64>>) -> Run {
        let mut labels = assign(points, &centroids);
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;

            let updated = recompute(points, &labels, &centroids);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            centroids = updated;

            let next = assign(points, &centroids);
            let stable = next == labels;
            labels = next;

            if stable || shift <= self.tolerance {
                break;
            }
        }

        let inertia = points
            .iter()
            .zip(&labels)
            .map(|(p, &l)| squared_distance(p, &centroids[l]))
            .sum();

        Run {
            labels,
            centroids,
            inertia,
            iterations,
        }
    }
}

/// k-means++ seeding: first centre uniform, the rest proportional to D(x)^2
fn kmeans_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..n)].clone());

    let mut nearest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();

        let idx = if total > 0.0 {
            let threshold = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            nearest
                .iter()
                .position(|&d| {
                    cumulative += d;
                    cumulative > threshold
                })
                .unwrap_or_else(|| last_positive(&nearest))
        } else {
            // every point sits on a centre already
            rng.random_range(0..n)
        };

        let centre = points[idx].clone();
        for (d, p) in nearest.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &centre));
        }
        centroids.push(centre);
    }

    centroids
}

fn last_positive(weights: &[f64]) -> usize {
    weights.iter().rposition(|&d| d > 0.0).unwrap_or(0)
}

/// Nearest centroid per point, lowest id on ties
fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (j, c) in centroids.iter().enumerate() {
                let dist = squared_distance(p, c);
                if dist < best_dist {
                    best_dist = dist;
                    best = j;
                }
            }
            best
        })
        .collect()
}

/// Member means; an empty cluster keeps its previous centroid
fn recompute(points: &[Vec<f64>], labels: &[usize], previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dims = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dims]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (p, &l) in points.iter().zip(labels) {
        counts[l] += 1;
        for (s, v) in sums[l].iter_mut().zip(p) {
            *s += v;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), prev)| {
            if count == 0 {
                prev.clone()
            } else {
                #[allow(clippy::cast_precision_loss)]
                let n = count as f64;
                sum.into_iter().map(|s| s / n).collect()
            }
        })
        .collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn matrix(rows: &[(&str, [f64; 3])]) -> FeatureMatrix {
        let dates = (1..=3)
            .map(|d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap())
            .collect();
        FeatureMatrix::new(
            rows.iter().map(|(t, _)| (*t).to_string()).collect(),
            dates,
            rows.iter().map(|(_, r)| r.to_vec()).collect(),
        )
        .unwrap()
    }

    fn three_groups() -> FeatureMatrix {
        matrix(&[
            ("USDC", [0.0, 0.0001, -0.0001]),
            ("USDT", [0.0001, 0.0, 0.0]),
            ("ETH", [0.03, -0.02, 0.025]),
            ("SOL", [0.035, -0.025, 0.03]),
            ("PEPE", [0.30, -0.25, 0.40]),
            ("DOGE", [0.29, -0.24, 0.39]),
        ])
    }

    fn engine(k: usize, seed: u64) -> ClusterEngine {
        ClusterEngine::new(&EngineConfig::default().with_clusters(k).with_seed(seed))
    }

    #[test]
    fn test_separates_obvious_groups() {
        let fit = engine(3, 42).fit(&three_groups()).unwrap();
        let a = &fit.assignment;

        assert_eq!(a.cluster_of("USDC"), a.cluster_of("USDT"));
        assert_eq!(a.cluster_of("ETH"), a.cluster_of("SOL"));
        assert_eq!(a.cluster_of("PEPE"), a.cluster_of("DOGE"));
        assert_ne!(a.cluster_of("USDC"), a.cluster_of("ETH"));
        assert_ne!(a.cluster_of("ETH"), a.cluster_of("PEPE"));
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let data = three_groups();
        let first = engine(3, 7).fit(&data).unwrap();
        let second = engine(3, 7).fit(&data).unwrap();

        assert_eq!(first.assignment, second.assignment);
        assert_eq!(first.inertia.to_bits(), second.inertia.to_bits());
        assert_eq!(first.centroids, second.centroids);
    }

    #[test]
    fn test_every_asset_assigned_once() {
        let data = three_groups();
        let fit = engine(4, 42).fit(&data).unwrap();

        assert_eq!(fit.assignment.len(), data.n_assets());
        for ticker in data.tickers() {
            assert!(fit.assignment.cluster_of(ticker).is_some_and(|c| c < 4));
        }
        assert_eq!(fit.assignment.cluster_sizes().iter().sum::<usize>(), data.n_assets());
    }

    #[test]
    fn test_more_restarts_never_worse() {
        let data = three_groups();
        let single = ClusterEngine::new(&EngineConfig::default().with_clusters(3).with_restarts(1))
            .fit(&data)
            .unwrap();
        let many = ClusterEngine::new(&EngineConfig::default().with_clusters(3).with_restarts(10))
            .fit(&data)
            .unwrap();

        assert!(many.inertia <= single.inertia);
    }

    #[test]
    fn test_identical_points_allow_empty_clusters() {
        let data = matrix(&[
            ("USDC", [0.0, 0.0, 0.0]),
            ("USDT", [0.0, 0.0, 0.0]),
            ("DAI", [0.0, 0.0, 0.0]),
        ]);
        let fit = engine(2, 1).fit(&data).unwrap();

        assert_eq!(fit.assignment.len(), 3);
        assert!(fit.inertia.abs() < f64::EPSILON);
        assert!(fit.assignment.cluster_sizes().contains(&0));
    }

    #[test]
    fn test_too_many_clusters() {
        let result = engine(7, 42).fit(&three_groups());
        assert!(matches!(result, Err(ClusterError::Configuration(_))));
    }

    #[test]
    fn test_zero_restarts_rejected() {
        let result = ClusterEngine::new(&EngineConfig::default().with_clusters(2).with_restarts(0))
            .fit(&three_groups());
        assert!(matches!(result, Err(ClusterError::Configuration(_))));
    }

    #[test]
    fn test_k_equal_to_assets_is_allowed() {
        let fit = engine(6, 42).fit(&three_groups()).unwrap();
        assert!(fit.inertia.abs() < 1e-12);
    }
}
