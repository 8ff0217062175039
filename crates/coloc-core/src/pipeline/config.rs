use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analysis::cluster::KMeansConfig;
use crate::consts::{DEFAULT_CHANNELS, DEFAULT_MAX_DIST, DEFAULT_NUM_CLUSTERS, DEFAULT_THRESHOLD};
use crate::error::{ColocError, Result};
use crate::io::tiff_stack::{check_stack_path, LoaderConfig};
use crate::preprocess::{NormalizeScope, Threshold};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColocConfig {
    pub input: PathBuf,
    /// Existing directory; each run writes into a fresh subdirectory.
    pub output: PathBuf,
    #[serde(default = "default_threshold")]
    pub threshold: Threshold,
    #[serde(default)]
    pub normalize_scope: NormalizeScope,
    /// The two channels compared by both analyses.
    #[serde(default = "default_channels")]
    pub channels: [usize; 2],
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub ica: IcaConfig,
    #[serde(default)]
    pub kmeans: ClusterMatchConfig,
}

fn default_threshold() -> Threshold {
    Threshold::Cutoff(DEFAULT_THRESHOLD as f64)
}
fn default_channels() -> [usize; 2] {
    DEFAULT_CHANNELS
}
fn default_enabled() -> bool {
    true
}
fn default_num_clusters() -> usize {
    DEFAULT_NUM_CLUSTERS
}
fn default_max_dist() -> f64 {
    DEFAULT_MAX_DIST
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IcaConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Number of strongest pixels to report. Defaults to the cluster count.
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl Default for IcaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterMatchConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_num_clusters")]
    pub num_clusters: usize,
    /// Matching cutoff in pixels (exclusive).
    #[serde(default = "default_max_dist")]
    pub max_dist: f64,
    /// Matching cutoff in microns; overrides `max_dist` when set.
    #[serde(default)]
    pub max_dist_microns: Option<f64>,
    /// Physical pixel pitch, required by `max_dist_microns`.
    #[serde(default)]
    pub pixel_size_microns: Option<f64>,
    #[serde(default)]
    pub fit: KMeansConfig,
}

impl Default for ClusterMatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_clusters: DEFAULT_NUM_CLUSTERS,
            max_dist: DEFAULT_MAX_DIST,
            max_dist_microns: None,
            pixel_size_microns: None,
            fit: KMeansConfig::default(),
        }
    }
}

impl ClusterMatchConfig {
    /// Matching cutoff in pixels.
    pub fn effective_max_dist(&self) -> Result<f64> {
        let dist = match (self.max_dist_microns, self.pixel_size_microns) {
            (None, _) => self.max_dist,
            (Some(_), None) => {
                return Err(ColocError::config(
                    "max_dist_microns needs pixel_size_microns to convert to pixels",
                ))
            }
            (Some(_), Some(px)) if px.is_nan() || px <= 0.0 => {
                return Err(ColocError::config(format!(
                    "pixel_size_microns must be positive, got {px}"
                )))
            }
            (Some(um), Some(px)) => um / px,
        };
        if !dist.is_finite() || dist <= 0.0 {
            return Err(ColocError::config(format!(
                "matching distance must be a positive number of pixels, got {dist}"
            )));
        }
        Ok(dist)
    }
}

/// Which analyses a run performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisMode {
    Ica,
    KMeans,
    Both,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ica => write!(f, "Intensity Correlation"),
            Self::KMeans => write!(f, "K-Means Matching"),
            Self::Both => write!(f, "Intensity Correlation + K-Means Matching"),
        }
    }
}

impl ColocConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            threshold: default_threshold(),
            normalize_scope: NormalizeScope::default(),
            channels: DEFAULT_CHANNELS,
            loader: LoaderConfig::default(),
            ica: IcaConfig::default(),
            kmeans: ClusterMatchConfig::default(),
        }
    }

    pub fn mode(&self) -> Result<AnalysisMode> {
        match (self.ica.enabled, self.kmeans.enabled) {
            (true, true) => Ok(AnalysisMode::Both),
            (true, false) => Ok(AnalysisMode::Ica),
            (false, true) => Ok(AnalysisMode::KMeans),
            (false, false) => Err(ColocError::config(
                "no analysis selected; enable intensity correlation, k-means, or both",
            )),
        }
    }

    pub fn ica_top_k(&self) -> usize {
        self.ica.top_k.unwrap_or(self.kmeans.num_clusters)
    }

    /// Check every parameter that does not depend on the filesystem or the
    /// loaded data.
    pub fn validate(&self) -> Result<()> {
        self.mode()?;
        if let Threshold::Cutoff(v) = self.threshold {
            Threshold::cutoff(v)?;
        }
        if self.channels[0] == self.channels[1] {
            return Err(ColocError::invalid(format!(
                "the two compared channels must differ, got {:?}",
                self.channels
            )));
        }
        if self.ica.enabled && self.ica_top_k() == 0 {
            return Err(ColocError::config("ICA top-K must be at least 1"));
        }
        if self.kmeans.enabled {
            if self.kmeans.num_clusters == 0 {
                return Err(ColocError::config("cluster count must be at least 1"));
            }
            if self.kmeans.fit.n_init == 0 || self.kmeans.fit.max_iterations == 0 {
                return Err(ColocError::config(
                    "k-means needs at least one restart and one iteration",
                ));
            }
            self.kmeans.effective_max_dist()?;
        }
        Ok(())
    }

    /// Check that the source stack and output directory exist.
    pub fn validate_paths(&self) -> Result<()> {
        check_stack_path(&self.input)?;
        if !self.output.is_dir() {
            return Err(ColocError::invalid(format!(
                "output directory {} does not exist",
                self.output.display()
            )));
        }
        Ok(())
    }
}
