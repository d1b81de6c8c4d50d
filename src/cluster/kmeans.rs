//! Seeded k-means (Lloyd's algorithm with k-means++ initialization).
//!
//! Each restart:
//! 1. pick initial centroids by k-means++ from a seeded `StdRng`
//! 2. assign every point to its nearest centroid (Euclidean, ties → lowest id)
//! 3. move each centroid to the mean of its points
//! 4. repeat until no assignment changes or `max_iterations` is reached
//!
//! `n_init` restarts draw from the same RNG in sequence and the lowest-inertia
//! result wins (ties → earliest restart), so a given seed always produces the
//! same labels and centroids.
//!
//! Empty clusters are re-seeded to the point farthest from its own centroid.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::domain::ClusterAssignment;
use crate::error::AppError;

/// Clustering parameters.
#[derive(Debug, Clone)]
pub struct KMeansOptions {
    pub k: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iterations: usize,
    /// Fail with `IterationCapReached` instead of returning the capped result.
    pub require_convergence: bool,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self {
            k: 3,
            seed: 42,
            n_init: 10,
            max_iterations: 300,
            require_convergence: false,
        }
    }
}

/// Cluster the rows of `points` into `opts.k` groups.
pub fn fit_kmeans(points: &DMatrix<f64>, opts: &KMeansOptions) -> Result<ClusterAssignment, AppError> {
    let n = points.nrows();
    if n == 0 {
        return Err(AppError::InvalidInput("cannot cluster an empty matrix".into()));
    }
    if opts.k == 0 {
        return Err(AppError::InvalidInput("cluster count must be > 0".into()));
    }
    if opts.k > n {
        return Err(AppError::InvalidInput(format!(
            "cluster count ({}) cannot exceed number of rows ({n})",
            opts.k
        )));
    }
    if points.iter().any(|v| !v.is_finite()) {
        return Err(AppError::InvalidInput("cannot cluster non-finite values".into()));
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut best: Option<ClusterAssignment> = None;

    for restart in 0..opts.n_init.max(1) {
        let init = kmeans_plus_plus(points, opts.k, &mut rng);
        let run = lloyd(points, init, opts.max_iterations);
        debug!(
            restart,
            inertia = run.inertia,
            iterations = run.iterations,
            converged = run.converged,
            "k-means restart"
        );

        let better = match &best {
            None => true,
            Some(b) => run.inertia < b.inertia,
        };
        if better {
            best = Some(run);
        }
    }

    let best = best.ok_or_else(|| AppError::InvalidInput("no k-means restarts ran".into()))?;

    if !best.converged {
        if opts.require_convergence {
            return Err(AppError::IterationCapReached {
                iterations: best.iterations,
            });
        }
        warn!(
            iterations = best.iterations,
            "k-means stopped at the iteration cap before assignments settled"
        );
    }

    Ok(best)
}

/// Index of the nearest centroid for a row (ties → lowest index).
pub fn nearest_centroid(points: &DMatrix<f64>, row: usize, centroids: &DMatrix<f64>) -> (usize, f64) {
    let mut best = (0usize, f64::INFINITY);
    for c in 0..centroids.nrows() {
        let d = squared_distance(points, row, centroids, c);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

fn squared_distance(a: &DMatrix<f64>, ra: usize, b: &DMatrix<f64>, rb: usize) -> f64 {
    (0..a.ncols())
        .map(|j| {
            let d = a[(ra, j)] - b[(rb, j)];
            d * d
        })
        .sum()
}

fn kmeans_plus_plus(points: &DMatrix<f64>, k: usize, rng: &mut StdRng) -> DMatrix<f64> {
    let n = points.nrows();
    let d = points.ncols();
    let mut centroids = DMatrix::<f64>::zeros(k, d);

    let first = rng.gen_range(0..n);
    centroids.row_mut(0).copy_from(&points.row(first));

    let mut dist: Vec<f64> = (0..n).map(|i| squared_distance(points, i, &centroids, 0)).collect();

    for c in 1..k {
        let total: f64 = dist.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut pick = n - 1;
            for (i, &w) in dist.iter().enumerate() {
                if target < w {
                    pick = i;
                    break;
                }
                target -= w;
            }
            pick
        } else {
            // Every point coincides with an existing centroid.
            rng.gen_range(0..n)
        };

        centroids.row_mut(c).copy_from(&points.row(chosen));
        for (i, di) in dist.iter_mut().enumerate() {
            *di = di.min(squared_distance(points, i, &centroids, c));
        }
    }

    centroids
}

fn lloyd(points: &DMatrix<f64>, mut centroids: DMatrix<f64>, max_iterations: usize) -> ClusterAssignment {
    let n = points.nrows();
    let k = centroids.nrows();
    let d = points.ncols();

    let mut labels: Vec<usize> = (0..n).map(|i| nearest_centroid(points, i, &centroids).0).collect();
    let mut converged = false;
    let mut iterations = 0usize;

    while iterations < max_iterations {
        iterations += 1;

        update_centroids(points, &labels, &mut centroids);

        let mut changed = false;
        for (i, label) in labels.iter_mut().enumerate() {
            let (c, _) = nearest_centroid(points, i, &centroids);
            if c != *label {
                *label = c;
                changed = true;
            }
        }

        if !changed {
            converged = true;
            break;
        }
    }

    // Centroids consistent with the final labels.
    if !converged {
        update_centroids(points, &labels, &mut centroids);
    }

    let inertia = (0..n)
        .map(|i| squared_distance(points, i, &centroids, labels[i]))
        .sum();

    debug_assert_eq!(centroids.ncols(), d);
    debug_assert!(labels.iter().all(|&l| l < k));

    ClusterAssignment {
        labels,
        centroids,
        inertia,
        iterations,
        converged,
    }
}

fn update_centroids(points: &DMatrix<f64>, labels: &[usize], centroids: &mut DMatrix<f64>) {
    let k = centroids.nrows();
    let d = points.ncols();
    let mut sums = DMatrix::<f64>::zeros(k, d);
    let mut counts = vec![0usize; k];

    for (i, &l) in labels.iter().enumerate() {
        counts[l] += 1;
        for j in 0..d {
            sums[(l, j)] += points[(i, j)];
        }
    }

    for c in 0..k {
        if counts[c] > 0 {
            for j in 0..d {
                centroids[(c, j)] = sums[(c, j)] / counts[c] as f64;
            }
        }
    }

    // Several clusters can empty out at once; each takes a different row.
    let mut taken = vec![false; points.nrows()];
    for c in 0..k {
        if counts[c] == 0 {
            let Some(far) = farthest_point(points, labels, centroids, &taken) else {
                break;
            };
            taken[far] = true;
            debug!(cluster = c, row = far, "re-seeding empty cluster");
            centroids.row_mut(c).copy_from(&points.row(far));
        }
    }
}

/// Row farthest from its own centroid, skipping rows already used for re-seeding.
fn farthest_point(points: &DMatrix<f64>, labels: &[usize], centroids: &DMatrix<f64>, taken: &[bool]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &l) in labels.iter().enumerate() {
        if taken[i] {
            continue;
        }
        let d = squared_distance(points, i, centroids, l);
        if best.is_none_or(|(_, bd)| d > bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            8,
            2,
            &[
                0.00, 0.02, 0.03, 0.00, 0.01, 0.05, 0.04, 0.03, //
                0.95, 0.97, 0.99, 0.94, 0.96, 1.00, 0.98, 0.96,
            ],
        )
    }

    #[test]
    fn separates_two_blobs() {
        let opts = KMeansOptions {
            k: 2,
            ..KMeansOptions::default()
        };
        let a = fit_kmeans(&blobs(), &opts).unwrap();
        assert!(a.converged);
        assert_eq!(a.labels.len(), 8);
        let first = a.labels[0];
        assert!(a.labels[..4].iter().all(|&l| l == first));
        assert!(a.labels[4..].iter().all(|&l| l != first));
        assert_eq!(a.sizes(), vec![4, 4]);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let opts = KMeansOptions::default();
        let a = fit_kmeans(&blobs(), &opts).unwrap();
        let b = fit_kmeans(&blobs(), &opts).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centroids, b.centroids);
        assert!(a.labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn duplicate_points_do_not_crash() {
        let points = DMatrix::from_element(5, 2, 0.5);
        let a = fit_kmeans(&points, &KMeansOptions::default()).unwrap();
        assert_eq!(a.labels.len(), 5);
        assert!(a.labels.iter().all(|&l| l < 3));
        assert_eq!(a.inertia, 0.0);
    }

    #[test]
    fn simultaneous_empty_clusters_get_distinct_rows() {
        let points = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 5.0, 10.0]);
        let mut centroids = DMatrix::from_row_slice(3, 1, &[4.0, 100.0, 200.0]);
        update_centroids(&points, &[0, 0, 0, 0], &mut centroids);

        assert_eq!(centroids[(0, 0)], 4.0);
        assert_eq!(centroids[(1, 0)], 10.0);
        assert_eq!(centroids[(2, 0)], 0.0);
    }

    #[test]
    fn rejects_invalid_k() {
        let points = blobs();
        let zero = KMeansOptions { k: 0, ..KMeansOptions::default() };
        assert!(fit_kmeans(&points, &zero).is_err());
        let too_many = KMeansOptions { k: 9, ..KMeansOptions::default() };
        assert!(fit_kmeans(&points, &too_many).is_err());
    }

    #[test]
    fn iteration_cap_can_be_enforced() {
        let points = DMatrix::from_row_slice(
            6,
            1,
            &[0.0, 0.1, 0.2, 0.45, 0.55, 1.0],
        );
        let opts = KMeansOptions {
            k: 3,
            max_iterations: 0,
            require_convergence: true,
            ..KMeansOptions::default()
        };
        let err = fit_kmeans(&points, &opts).unwrap_err();
        assert!(matches!(err, AppError::IterationCapReached { iterations: 0 }));
    }
}
