//! Two-channel colocalization statistics.

pub mod cluster;
pub mod ica;
pub mod matcher;

use ndarray::{ArrayView2, ArrayView3, Axis};

use crate::error::{ColocError, Result};

pub use cluster::{fit_clusters, nonzero_coords, Clusterer, KMeans, KMeansConfig};
pub use ica::{correlate, ica_map, top_k_coords, IcaResult};
pub use matcher::{average_point, compare_dists, get_colocs, ColocPair, MatchResult};

/// Extract the two requested channels of a `(height, width, channel)` frame.
pub fn select_pair<'a>(
    frame: &ArrayView3<'a, f32>,
    channels: &[usize],
) -> Result<(ArrayView2<'a, f32>, ArrayView2<'a, f32>)> {
    if channels.len() != 2 {
        return Err(ColocError::invalid(format!(
            "exactly two channels can be compared at a time, got {}",
            channels.len()
        )));
    }
    let total = frame.dim().2;
    for &index in channels {
        if index >= total {
            return Err(ColocError::ChannelIndexOutOfRange { index, total });
        }
    }
    let first = frame.clone().index_axis_move(Axis(2), channels[0]);
    let second = frame.clone().index_axis_move(Axis(2), channels[1]);
    Ok((first, second))
}
