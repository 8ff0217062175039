use std::sync::Arc;

use tracing::{info, warn};

use crate::analysis::{correlate, get_colocs, Clusterer, KMeans};
use crate::error::{ColocError, Result};
use crate::frame::ImageStack;
use crate::preprocess::{FrameStore, NormalizeReport};

use super::config::ColocConfig;
use super::sink::{FrameView, ResultSink};
use super::types::{
    FrameResult, FrameSummary, NoOpReporter, PipelineStage, PipelineState, ProgressReporter,
    RunSummary,
};

/// Runs load → reshape → normalize → per-frame analysis for one
/// configuration.
///
/// Each phase takes `&mut self` and checks the current [`PipelineState`], so
/// the stack is fully reshaped and normalized before any frame is analyzed.
pub struct Orchestrator {
    config: ColocConfig,
    clusterer: Box<dyn Clusterer>,
    reporter: Arc<dyn ProgressReporter>,
    store: Option<FrameStore>,
    state: PipelineState,
    degenerate_channels: usize,
}

impl Orchestrator {
    /// Validate the configuration and both paths. Nothing is loaded yet.
    pub fn new(config: ColocConfig) -> Result<Self> {
        config.validate()?;
        config.validate_paths()?;
        Ok(Self::build(config, None))
    }

    /// Start from an in-memory stack instead of a file.
    pub fn with_stack(config: ColocConfig, stack: ImageStack) -> Result<Self> {
        config.validate()?;
        let store = FrameStore::from_stack(stack)?;
        let orchestrator = Self::build(config, Some(store));
        orchestrator.check_stack()?;
        Ok(orchestrator)
    }

    fn build(config: ColocConfig, store: Option<FrameStore>) -> Self {
        let clusterer = Box::new(KMeans::new(config.kmeans.fit.clone()));
        let state = if store.is_some() {
            PipelineState::Loaded
        } else {
            PipelineState::Idle
        };
        Self {
            config,
            clusterer,
            reporter: Arc::new(NoOpReporter),
            store,
            state,
            degenerate_channels: 0,
        }
    }

    /// Replace the default k-means strategy.
    pub fn with_clusterer(mut self, clusterer: Box<dyn Clusterer>) -> Self {
        self.clusterer = clusterer;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &ColocConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn store(&self) -> Option<&FrameStore> {
        self.store.as_ref()
    }

    fn expect_state(&self, expected: PipelineState, operation: &str) -> Result<()> {
        if self.state != expected {
            return Err(ColocError::Pipeline(format!(
                "cannot {operation} in state {:?} (expected {expected:?})",
                self.state
            )));
        }
        Ok(())
    }

    fn store_ref(&self) -> Result<&FrameStore> {
        self.store
            .as_ref()
            .ok_or_else(|| ColocError::Pipeline("no stack loaded".into()))
    }

    /// Data-dependent checks that can run as soon as a stack is present.
    fn check_stack(&self) -> Result<()> {
        let store = self.store_ref()?;
        let total = store.channel_count();
        for &index in &self.config.channels {
            if index >= total {
                return Err(ColocError::ChannelIndexOutOfRange { index, total });
            }
        }
        let (h, w) = store.dims();
        let side = h.min(w);
        let top_k = self.config.ica_top_k();
        if self.config.ica.enabled && top_k > side * side {
            return Err(ColocError::config(format!(
                "ICA top-K {top_k} exceeds the {} pixels of a reshaped frame",
                side * side
            )));
        }
        Ok(())
    }

    pub fn load(&mut self) -> Result<()> {
        self.expect_state(PipelineState::Idle, "load")?;
        self.reporter.begin_stage(PipelineStage::Loading, None);
        self.store = Some(FrameStore::open(&self.config.input, &self.config.loader)?);
        self.check_stack()?;
        self.reporter.finish_stage();
        self.state = PipelineState::Loaded;
        Ok(())
    }

    pub fn reshape(&mut self) -> Result<()> {
        self.expect_state(PipelineState::Loaded, "reshape")?;
        self.reporter.begin_stage(PipelineStage::Reshaping, None);
        if let Some(store) = self.store.as_mut() {
            store.reshape_square();
        }
        self.reporter.finish_stage();
        self.state = PipelineState::Reshaped;
        Ok(())
    }

    pub fn normalize(&mut self) -> Result<NormalizeReport> {
        self.expect_state(PipelineState::Reshaped, "normalize")?;
        self.reporter.begin_stage(PipelineStage::Normalizing, None);
        let (threshold, scope) = (self.config.threshold, self.config.normalize_scope);
        let store = self
            .store
            .as_mut()
            .ok_or_else(|| ColocError::Pipeline("no stack loaded".into()))?;
        let report = store.normalize_all(threshold, scope);
        for d in &report.degenerate {
            warn!(channel = d.channel, frame = ?d.frame, "Constant channel skipped by normalization");
        }
        self.degenerate_channels = report.degenerate.len();
        self.reporter.finish_stage();
        self.state = PipelineState::Normalized;
        Ok(report)
    }

    /// Run the enabled analyses on one normalized frame.
    pub fn analyze_frame(&self, index: usize) -> Result<FrameResult> {
        if !matches!(
            self.state,
            PipelineState::Normalized | PipelineState::Analyzing { .. } | PipelineState::Done
        ) {
            return Err(ColocError::Pipeline(format!(
                "cannot analyze frames in state {:?}",
                self.state
            )));
        }
        let frame = self.store_ref()?.normalized_frame(index)?;
        let channels = &self.config.channels;

        let ica = if self.config.ica.enabled {
            Some(correlate(&frame, channels, self.config.ica_top_k())?)
        } else {
            None
        };

        let kmeans = if self.config.kmeans.enabled {
            let result = get_colocs(
                &frame,
                channels,
                self.config.kmeans.num_clusters,
                self.config.kmeans.effective_max_dist()?,
                self.clusterer.as_ref(),
            )?;
            if result.is_empty() {
                warn!(frame = index, "No colocalized cluster pairs found");
            }
            Some(result)
        } else {
            None
        };

        Ok(FrameResult {
            frame: index,
            ica,
            kmeans,
        })
    }

    /// Run every remaining phase and hand each frame's results to `sink`.
    ///
    /// Any error moves the orchestrator to [`PipelineState::Failed`].
    pub fn run(&mut self, sink: &mut dyn ResultSink) -> Result<RunSummary> {
        let result = self.run_phases(sink);
        if result.is_err() {
            self.state = PipelineState::Failed;
        }
        result
    }

    fn run_phases(&mut self, sink: &mut dyn ResultSink) -> Result<RunSummary> {
        if self.state == PipelineState::Idle {
            self.load()?;
        }
        if self.state == PipelineState::Loaded {
            self.reshape()?;
        }
        if self.state == PipelineState::Reshaped {
            self.normalize()?;
        }
        self.expect_state(PipelineState::Normalized, "analyze")?;

        let frames = self.store_ref()?.frame_count();
        let mut summary = RunSummary {
            input: self.config.input.clone(),
            frames,
            channels: self.config.channels,
            side: self.store_ref()?.dims().0,
            threshold: self.config.threshold.to_string(),
            max_dist: if self.config.kmeans.enabled {
                Some(self.config.kmeans.effective_max_dist()?)
            } else {
                None
            },
            degenerate_channels: self.degenerate_channels,
            ..Default::default()
        };
        let mode = self.config.mode()?;
        info!(
            frames,
            mode = %mode,
            channels = ?self.config.channels,
            "Analyzing frames"
        );

        self.reporter.begin_stage(PipelineStage::Analyzing, Some(frames));
        for index in 0..frames {
            self.state = PipelineState::Analyzing { frame: index };
            let result = self.analyze_frame(index)?;
            let store = self.store_ref()?;
            let view = FrameView {
                index,
                original: store.raw_frame(index)?,
                normalized: store.normalized_frame(index)?,
                channels: self.config.channels,
            };
            if let Some(ica) = &result.ica {
                sink.ica(&view, ica)?;
            }
            if let Some(matches) = &result.kmeans {
                if matches.is_empty() {
                    summary.frames_without_pairs.push(index);
                }
                sink.kmeans(&view, matches)?;
            }
            summary.per_frame.push(FrameSummary::from(&result));
            self.reporter.advance(index + 1);
        }
        self.reporter.finish_stage();

        sink.finish(&summary)?;
        self.state = PipelineState::Done;
        info!(
            frames,
            without_pairs = summary.frames_without_pairs.len(),
            "Run complete"
        );
        Ok(summary)
    }
}
