//! Spatial k-means over the nonzero pixels of a channel.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    DEFAULT_KMEANS_MAX_ITERATIONS, DEFAULT_KMEANS_RESTARTS, DEFAULT_KMEANS_TOLERANCE,
};
use crate::error::{ColocError, Result};
use crate::frame::Coord;

/// A clustering strategy: summarize `points` as `k` centroids.
pub trait Clusterer: Send + Sync {
    fn fit(&self, points: &[[f64; 2]], k: usize) -> Result<Vec<[f64; 2]>>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Independent restarts; the lowest-inertia fit is kept.
    #[serde(default = "default_n_init")]
    pub n_init: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Stop once the summed squared centroid shift falls to this value.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Fixed seed for reproducible fits. `None` draws one per fit.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_n_init() -> usize {
    DEFAULT_KMEANS_RESTARTS
}
fn default_max_iterations() -> usize {
    DEFAULT_KMEANS_MAX_ITERATIONS
}
fn default_tolerance() -> f64 {
    DEFAULT_KMEANS_TOLERANCE
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_init: DEFAULT_KMEANS_RESTARTS,
            max_iterations: DEFAULT_KMEANS_MAX_ITERATIONS,
            tolerance: DEFAULT_KMEANS_TOLERANCE,
            seed: None,
        }
    }
}

/// Lloyd's k-means with k-means++ seeding and multiple restarts.
#[derive(Clone, Debug, Default)]
pub struct KMeans {
    pub config: KMeansConfig,
}

struct Fit {
    centroids: Vec<[f64; 2]>,
    inertia: f64,
}

fn sq_dist(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    d0 * d0 + d1 * d1
}

/// Index of and squared distance to the nearest centroid. Ties go to the
/// lower index.
fn nearest(point: &[f64; 2], centroids: &[[f64; 2]]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = sq_dist(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

impl KMeans {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    /// k-means++: each further seed is drawn with probability proportional
    /// to its squared distance from the nearest seed so far.
    fn seed_centroids(points: &[[f64; 2]], k: usize, rng: &mut StdRng) -> Vec<[f64; 2]> {
        let n = points.len();
        let mut centroids = Vec::with_capacity(k);
        centroids.push(points[rng.random_range(0..n)]);
        let mut d2: Vec<f64> = points.iter().map(|p| sq_dist(p, &centroids[0])).collect();

        while centroids.len() < k {
            let total: f64 = d2.iter().sum();
            let pick = if total > 0.0 {
                let mut target = rng.random::<f64>() * total;
                let mut chosen = n - 1;
                for (i, &d) in d2.iter().enumerate() {
                    target -= d;
                    if target < 0.0 {
                        chosen = i;
                        break;
                    }
                }
                chosen
            } else {
                // Every point coincides with a seed already.
                rng.random_range(0..n)
            };
            let c = points[pick];
            centroids.push(c);
            for (d, p) in d2.iter_mut().zip(points) {
                *d = d.min(sq_dist(p, &c));
            }
        }
        centroids
    }

    fn run_once(&self, points: &[[f64; 2]], k: usize, seed: u64) -> Fit {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = Self::seed_centroids(points, k, &mut rng);

        for iteration in 0..self.config.max_iterations {
            let mut sums = vec![[0.0f64; 2]; k];
            let mut counts = vec![0usize; k];
            for p in points {
                let (label, _) = nearest(p, &centroids);
                sums[label][0] += p[0];
                sums[label][1] += p[1];
                counts[label] += 1;
            }

            let mut shift = 0.0;
            for (i, c) in centroids.iter_mut().enumerate() {
                // An emptied cluster keeps its previous centroid.
                if counts[i] == 0 {
                    continue;
                }
                let updated = [sums[i][0] / counts[i] as f64, sums[i][1] / counts[i] as f64];
                shift += sq_dist(c, &updated);
                *c = updated;
            }
            if shift <= self.config.tolerance {
                debug!(iteration, "k-means converged");
                break;
            }
        }

        let inertia = points.iter().map(|p| nearest(p, &centroids).1).sum();
        Fit { centroids, inertia }
    }
}

impl Clusterer for KMeans {
    fn fit(&self, points: &[[f64; 2]], k: usize) -> Result<Vec<[f64; 2]>> {
        if points.is_empty() {
            return Err(ColocError::invalid("no points to cluster"));
        }
        if k == 0 || k > points.len() {
            return Err(ColocError::config(format!(
                "cluster count must be between 1 and the number of points ({}), got {k}",
                points.len()
            )));
        }
        let restarts = self.config.n_init.max(1);
        let base_seed = self.config.seed.unwrap_or_else(|| rand::rng().random());

        let fits: Vec<Fit> = (0..restarts)
            .into_par_iter()
            .map(|r| self.run_once(points, k, base_seed.wrapping_add(r as u64)))
            .collect();

        // Strict `<` keeps the earliest restart among equal inertias.
        let mut best: Option<Fit> = None;
        for fit in fits {
            let better = match &best {
                None => true,
                Some(b) => fit.inertia < b.inertia,
            };
            if better {
                best = Some(fit);
            }
        }
        best.map(|b| b.centroids)
            .ok_or_else(|| ColocError::Pipeline("k-means produced no fit".into()))
    }
}

/// Coordinates of every pixel with nonzero intensity, in scan order.
pub fn nonzero_coords(slice: &ArrayView2<f32>) -> Vec<Coord> {
    slice
        .indexed_iter()
        .filter(|&(_, &v)| v != 0.0)
        .map(|((row, col), _)| Coord::new(row, col))
        .collect()
}

/// Fit `k` centroids to the nonzero footprint of one channel.
///
/// Only pixel positions enter the fit; intensities do not weight it.
/// Centroids are rounded to the nearest pixel. A clusterer that returns the
/// wrong number of centroids, or any non-finite coordinate, is an internal
/// error.
pub fn fit_clusters(slice: &ArrayView2<f32>, k: usize, clusterer: &dyn Clusterer) -> Result<Vec<Coord>> {
    let coords = nonzero_coords(slice);
    if coords.is_empty() {
        return Err(ColocError::invalid(
            "channel has no nonzero pixels to cluster; apply a threshold that keeps some signal",
        ));
    }
    let points: Vec<[f64; 2]> = coords
        .iter()
        .map(|c| [c.row as f64, c.col as f64])
        .collect();
    let centroids = clusterer.fit(&points, k)?;
    if centroids.len() != k {
        return Err(ColocError::Pipeline(format!(
            "clusterer returned {} centroids, expected {k}",
            centroids.len()
        )));
    }
    if let Some(bad) = centroids.iter().find(|c| !c.iter().all(|v| v.is_finite())) {
        return Err(ColocError::Pipeline(format!(
            "clusterer returned a non-finite centroid {bad:?}"
        )));
    }
    debug!(points = points.len(), k, "Fitted clusters");
    Ok(centroids
        .into_iter()
        .map(|[r, c]| Coord::new(r.round().max(0.0) as usize, c.round().max(0.0) as usize))
        .collect())
}
