use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use ndarray::ArrayView3;
use tracing::info;

use crate::analysis::{IcaResult, MatchResult};
use crate::consts::{RUN_DIR_PREFIX, SUMMARY_FILE_NAME};
use crate::error::{ColocError, Result};
use crate::frame::PlotPoint;
use crate::io::render::{save_annotated_pair, ICA_MARKER, PAIR_MARKER};

use super::types::{FrameResult, RunSummary};

/// Everything a sink needs to render one frame.
pub struct FrameView<'a> {
    pub index: usize,
    pub original: ArrayView3<'a, f32>,
    pub normalized: ArrayView3<'a, f32>,
    pub channels: [usize; 2],
}

/// Consumer of per-frame analysis results.
pub trait ResultSink {
    fn ica(&mut self, frame: &FrameView<'_>, result: &IcaResult) -> Result<()>;

    /// Called for every frame when k-means is enabled, including frames with
    /// no colocalized pair.
    fn kmeans(&mut self, frame: &FrameView<'_>, result: &MatchResult) -> Result<()>;

    fn finish(&mut self, _summary: &RunSummary) -> Result<()> {
        Ok(())
    }
}

/// Keeps every result in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<FrameResult>,
    pub summary: Option<RunSummary>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, frame: usize) -> &mut FrameResult {
        if let Some(pos) = self.frames.iter().position(|f| f.frame == frame) {
            return &mut self.frames[pos];
        }
        self.frames.push(FrameResult {
            frame,
            ica: None,
            kmeans: None,
        });
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

impl ResultSink for MemorySink {
    fn ica(&mut self, frame: &FrameView<'_>, result: &IcaResult) -> Result<()> {
        self.entry(frame.index).ica = Some(result.clone());
        Ok(())
    }

    fn kmeans(&mut self, frame: &FrameView<'_>, result: &MatchResult) -> Result<()> {
        self.entry(frame.index).kmeans = Some(result.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        self.summary = Some(summary.clone());
        Ok(())
    }
}

/// Writes annotated PNG pairs into a fresh per-run subdirectory.
///
/// The subdirectory is created on the first write, so a run that fails
/// before producing any result leaves nothing behind.
#[derive(Debug)]
pub struct PngSink {
    root: PathBuf,
    dir: Option<PathBuf>,
}

impl PngSink {
    /// Prepare a sink under `root`, which must exist.
    pub fn create(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(ColocError::invalid(format!(
                "output directory {} does not exist",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
            dir: None,
        })
    }

    /// The run subdirectory, once something has been written.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// `<root>/coloc_output_<unix seconds>`, created on first use.
    fn run_dir(&mut self) -> Result<PathBuf> {
        if let Some(ref dir) = self.dir {
            return Ok(dir.clone());
        }
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut dir = self.root.join(format!("{RUN_DIR_PREFIX}{stamp}"));
        let mut n = 1;
        while dir.exists() {
            dir = self.root.join(format!("{RUN_DIR_PREFIX}{stamp}_{n}"));
            n += 1;
        }
        std::fs::create_dir(&dir)?;
        info!(dir = %dir.display(), "Created run output directory");
        self.dir = Some(dir.clone());
        Ok(dir)
    }
}

impl ResultSink for PngSink {
    fn ica(&mut self, frame: &FrameView<'_>, result: &IcaResult) -> Result<()> {
        let markers: Vec<PlotPoint> = result
            .coords
            .iter()
            .map(|c| PlotPoint { x: c.col, y: c.row })
            .collect();
        let path = self.run_dir()?.join(format!("0{}_ICA.png", frame.index));
        save_annotated_pair(
            &path,
            &frame.original,
            &frame.normalized,
            frame.channels,
            &markers,
            ICA_MARKER,
        )
    }

    fn kmeans(&mut self, frame: &FrameView<'_>, result: &MatchResult) -> Result<()> {
        let path = self.run_dir()?.join(format!("0{}_kmeans.png", frame.index));
        save_annotated_pair(
            &path,
            &frame.original,
            &frame.normalized,
            frame.channels,
            &result.markers(),
            PAIR_MARKER,
        )
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        let text = toml::to_string_pretty(summary)?;
        std::fs::write(self.run_dir()?.join(SUMMARY_FILE_NAME), text)?;
        Ok(())
    }
}
