//! The flat parameter record used by form-style front ends.
//!
//! Keys and value shapes are accepted verbatim (including the
//! `"Run KMeans" = "Y"` style flags) and converted once into a validated
//! [`ColocConfig`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_CHANNELS, DEFAULT_MAX_DIST, DEFAULT_NUM_CLUSTERS, DEFAULT_THRESHOLD};
use crate::error::{ColocError, Result};
use crate::preprocess::{Threshold, ThresholdSetting};

use super::config::ColocConfig;

pub const RUN_ICA_KEY: &str = "Run Intensity Correlation Analysis";
pub const RUN_KMEANS_KEY: &str = "Run KMeans";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamRecord {
    pub in_path: PathBuf,
    pub out_path: PathBuf,
    #[serde(default = "default_threshold")]
    pub threshold: ThresholdSetting,
    #[serde(default = "default_channels")]
    pub channels: Vec<usize>,
    #[serde(default = "default_num_clusts")]
    pub num_clusts: usize,
    #[serde(default = "default_min_dist")]
    pub min_dist: f64,
    #[serde(rename = "Run Intensity Correlation Analysis", default)]
    pub run_ica: Option<String>,
    #[serde(rename = "Run KMeans", default)]
    pub run_kmeans: Option<String>,
}

fn default_threshold() -> ThresholdSetting {
    ThresholdSetting::Number(DEFAULT_THRESHOLD as f64)
}
fn default_channels() -> Vec<usize> {
    DEFAULT_CHANNELS.to_vec()
}
fn default_num_clusts() -> usize {
    DEFAULT_NUM_CLUSTERS
}
fn default_min_dist() -> f64 {
    DEFAULT_MAX_DIST
}

fn parse_flag(key: &str, value: Option<&str>) -> Result<bool> {
    match value.map(str::trim) {
        Some("Y") | Some("y") => Ok(true),
        Some("N") | Some("n") => Ok(false),
        Some(other) => Err(ColocError::config(format!(
            "{key:?} must be \"Y\" or \"N\", got {other:?}"
        ))),
        None => Err(ColocError::config(format!("missing key {key:?}"))),
    }
}

impl TryFrom<ParamRecord> for ColocConfig {
    type Error = ColocError;

    fn try_from(record: ParamRecord) -> Result<Self> {
        let threshold = Threshold::try_from(record.threshold)?;
        let channels: [usize; 2] = record.channels.as_slice().try_into().map_err(|_| {
            ColocError::invalid(format!(
                "exactly two channels can be compared at a time, got {}",
                record.channels.len()
            ))
        })?;
        let run_ica = parse_flag(RUN_ICA_KEY, record.run_ica.as_deref())?;
        let run_kmeans = parse_flag(RUN_KMEANS_KEY, record.run_kmeans.as_deref())?;

        let mut config = ColocConfig::new(record.in_path, record.out_path);
        config.threshold = threshold;
        config.channels = channels;
        config.ica.enabled = run_ica;
        config.kmeans.enabled = run_kmeans;
        config.kmeans.num_clusters = record.num_clusts;
        config.kmeans.max_dist = record.min_dist;
        Ok(config)
    }
}
