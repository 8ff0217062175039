use std::path::PathBuf;

use serde::Serialize;

use crate::analysis::{IcaResult, MatchResult};

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Loading,
    Reshaping,
    Normalizing,
    Analyzing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading stack"),
            Self::Reshaping => write!(f, "Reshaping"),
            Self::Normalizing => write!(f, "Normalizing"),
            Self::Analyzing => write!(f, "Analyzing frames"),
        }
    }
}

/// Where an orchestrator is in its run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Loaded,
    Reshaped,
    Normalized,
    Analyzing { frame: usize },
    Done,
    Failed,
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Analysis output for one frame.
#[derive(Clone, Debug)]
pub struct FrameResult {
    pub frame: usize,
    pub ica: Option<IcaResult>,
    pub kmeans: Option<MatchResult>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FrameSummary {
    pub frame: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ica_coords: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ica_top_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairs: Option<usize>,
}

impl From<&FrameResult> for FrameSummary {
    fn from(result: &FrameResult) -> Self {
        Self {
            frame: result.frame,
            ica_coords: result.ica.as_ref().map(|r| r.coords.len()),
            ica_top_score: result.ica.as_ref().and_then(|r| r.scores.first().copied()),
            pairs: result.kmeans.as_ref().map(|m| m.pairs.len()),
        }
    }
}

/// Report of a completed run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub frames: usize,
    pub channels: [usize; 2],
    pub side: usize,
    pub threshold: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dist: Option<f64>,
    /// Channels left unnormalized because they were constant.
    pub degenerate_channels: usize,
    /// Frames where k-means matching found no pair.
    pub frames_without_pairs: Vec<usize>,
    pub per_frame: Vec<FrameSummary>,
}
