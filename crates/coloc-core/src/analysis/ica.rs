//! Intensity Correlation Analysis.
//!
//! Each pixel is scored with the product of both channels' deviations from
//! their own mean, `(a - mean(a)) * (b - mean(b))`. The map is a covariance
//! contribution, not a Pearson map: it is never divided by the variances.
//! Positive scores mark pixels where both channels are bright (or both dim)
//! together.

use ndarray::{Array2, ArrayView2, ArrayView3, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{ColocError, Result};
use crate::frame::Coord;

use super::select_pair;

#[derive(Clone, Debug)]
pub struct IcaResult {
    /// Strongest-overlap pixels, highest score first.
    pub coords: Vec<Coord>,
    /// Score of each entry in `coords`.
    pub scores: Vec<f64>,
    pub map: Array2<f64>,
}

fn mean(data: &ArrayView2<f32>) -> f64 {
    data.iter().map(|&v| v as f64).sum::<f64>() / data.len() as f64
}

/// Compute the product-of-deviations map of two channels.
///
/// Fails with `InvalidInput` when the shapes differ or the channels are
/// element-wise identical.
pub fn ica_map(a: &ArrayView2<f32>, b: &ArrayView2<f32>) -> Result<Array2<f64>> {
    if a.dim() != b.dim() {
        return Err(ColocError::invalid(format!(
            "channel shapes differ: {:?} vs {:?}",
            a.dim(),
            b.dim()
        )));
    }
    if a.is_empty() {
        return Err(ColocError::invalid("cannot correlate empty channels"));
    }
    if a == b {
        return Err(ColocError::invalid(
            "the two channels are identical; correlating a channel with itself is meaningless",
        ));
    }

    let (mu_a, mu_b) = (mean(a), mean(b));
    let mut out = Array2::<f64>::zeros(a.dim());
    let zip = Zip::from(&mut out).and(a).and(b);
    let score = |o: &mut f64, &va: &f32, &vb: &f32| {
        *o = (va as f64 - mu_a) * (vb as f64 - mu_b);
    };
    if a.len() >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_for_each(score);
    } else {
        zip.for_each(score);
    }
    Ok(out)
}

/// Locations of the `k` highest scores, highest first. Equal scores keep
/// row-major scan order.
pub fn top_k_coords(map: &Array2<f64>, k: usize) -> Result<Vec<(Coord, f64)>> {
    let total = map.len();
    if k == 0 || k > total {
        return Err(ColocError::config(format!(
            "top-K must be between 1 and the pixel count ({total}), got {k}"
        )));
    }
    let width = map.ncols();
    let flat: Vec<f64> = map.iter().copied().collect();
    let mut order: Vec<usize> = (0..total).collect();
    order.sort_by(|&i, &j| flat[j].total_cmp(&flat[i]));
    Ok(order
        .into_iter()
        .take(k)
        .map(|i| (Coord::new(i / width, i % width), flat[i]))
        .collect())
}

/// Run ICA on two channels of one `(height, width, channel)` frame.
pub fn correlate(frame: &ArrayView3<f32>, channels: &[usize], top_k: usize) -> Result<IcaResult> {
    let (a, b) = select_pair(frame, channels)?;
    let map = ica_map(&a, &b)?;
    let (coords, scores): (Vec<Coord>, Vec<f64>) = top_k_coords(&map, top_k)?.into_iter().unzip();
    Ok(IcaResult { coords, scores, map })
}
