//! Cross-channel centroid pairing.

use ndarray::ArrayView3;
use serde::Serialize;
use tracing::debug;

use crate::error::{ColocError, Result};
use crate::frame::{Coord, PlotPoint};

use super::cluster::{fit_clusters, Clusterer};
use super::select_pair;

/// Two centroids, one per channel, closer than the matching cutoff.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColocPair {
    /// Discovery index within the frame.
    pub id: usize,
    pub channel1: Coord,
    pub channel2: Coord,
    pub distance: f64,
    /// Rounded midpoint, in plotting (x, y) order.
    pub average: PlotPoint,
}

impl ColocPair {
    pub fn label(&self) -> String {
        format!("Pair {}", self.id)
    }
}

/// Per-channel centroids of one frame and the pairs found between them.
#[derive(Clone, Debug, Default)]
pub struct MatchResult {
    pub channel1: Vec<Coord>,
    pub channel2: Vec<Coord>,
    pub pairs: Vec<ColocPair>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn markers(&self) -> Vec<PlotPoint> {
        self.pairs.iter().map(|p| p.average).collect()
    }
}

/// Coordinate-wise mean of two centroids, rounded half away from zero and
/// swapped to (x, y).
pub fn average_point(a: &Coord, b: &Coord) -> PlotPoint {
    let row = (a.row + b.row) as f64 / 2.0;
    let col = (a.col + b.col) as f64 / 2.0;
    PlotPoint {
        x: col.round() as usize,
        y: row.round() as usize,
    }
}

/// Pair every centroid of `a` with every centroid of `b` closer than
/// `max_dist` (exclusive).
///
/// Matching is many-to-many: a centroid may appear in several pairs. Pairs
/// come out channel-1-major. An empty result is a valid outcome.
pub fn compare_dists(a: &[Coord], b: &[Coord], max_dist: f64) -> Result<Vec<ColocPair>> {
    if a.len() != b.len() {
        return Err(ColocError::invalid(format!(
            "centroid lists differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if max_dist.is_nan() || max_dist <= 0.0 {
        return Err(ColocError::config(format!(
            "matching distance must be positive, got {max_dist}"
        )));
    }

    let mut pairs = Vec::new();
    for c1 in a {
        for c2 in b {
            let distance = c1.distance(c2);
            if distance < max_dist {
                pairs.push(ColocPair {
                    id: pairs.len(),
                    channel1: *c1,
                    channel2: *c2,
                    distance,
                    average: average_point(c1, c2),
                });
            }
        }
    }
    Ok(pairs)
}

/// Cluster both selected channels of a frame and pair their centroids.
pub fn get_colocs(
    frame: &ArrayView3<f32>,
    channels: &[usize],
    num_clusters: usize,
    max_dist: f64,
    clusterer: &dyn Clusterer,
) -> Result<MatchResult> {
    let (a, b) = select_pair(frame, channels)?;
    let channel1 = fit_clusters(&a, num_clusters, clusterer)?;
    let channel2 = fit_clusters(&b, num_clusters, clusterer)?;
    let pairs = compare_dists(&channel1, &channel2, max_dist)?;
    debug!(pairs = pairs.len(), "Compared cluster centroids");
    Ok(MatchResult {
        channel1,
        channel2,
        pairs,
    })
}
