use std::path::Path;

use ndarray::{ArrayView2, ArrayView3};
use tracing::info;

use crate::error::{ColocError, Result};
use crate::frame::{ImageStack, SourceInfo};
use crate::io::tiff_stack::{read_stack, LoaderConfig};

use super::normalize::{normalize_stack, NormalizeReport, NormalizeScope, Threshold};
use super::reshape::reshape_square;

/// Owns the loaded stack and its normalized working copy.
///
/// The two buffers are independent arrays: normalization always starts from
/// a fresh copy of the raw data and never writes through to it.
#[derive(Clone, Debug)]
pub struct FrameStore {
    raw: ImageStack,
    normalized: ImageStack,
    info: Option<SourceInfo>,
}

impl FrameStore {
    /// Load a stack from a `.tif`/`.tiff` file.
    pub fn open(path: &Path, loader: &LoaderConfig) -> Result<Self> {
        let (stack, info) = read_stack(path, loader)?;
        info!(
            frames = info.total_frames,
            channels = info.channels,
            width = info.width,
            height = info.height,
            "Loaded image stack"
        );
        let mut store = Self::from_stack(stack)?;
        store.info = Some(info);
        Ok(store)
    }

    /// Wrap an in-memory stack.
    pub fn from_stack(stack: ImageStack) -> Result<Self> {
        if stack.data.is_empty() {
            return Err(ColocError::invalid(format!(
                "image stack has an empty axis: shape {:?}",
                stack.data.shape()
            )));
        }
        Ok(Self {
            normalized: stack.clone(),
            raw: stack,
            info: None,
        })
    }

    pub fn info(&self) -> Option<&SourceInfo> {
        self.info.as_ref()
    }

    pub fn frame_count(&self) -> usize {
        self.raw.frame_count()
    }

    pub fn channel_count(&self) -> usize {
        self.raw.channel_count()
    }

    /// Current `(height, width)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.raw.height(), self.raw.width())
    }

    pub fn raw(&self) -> &ImageStack {
        &self.raw
    }

    pub fn normalized(&self) -> &ImageStack {
        &self.normalized
    }

    pub fn raw_frame(&self, frame: usize) -> Result<ArrayView3<'_, f32>> {
        self.raw.frame(frame)
    }

    pub fn normalized_frame(&self, frame: usize) -> Result<ArrayView3<'_, f32>> {
        self.normalized.frame(frame)
    }

    pub fn raw_slice(&self, frame: usize, channel: usize) -> Result<ArrayView2<'_, f32>> {
        self.raw.channel(frame, channel)
    }

    pub fn normalized_slice(&self, frame: usize, channel: usize) -> Result<ArrayView2<'_, f32>> {
        self.normalized.channel(frame, channel)
    }

    /// Resample to `min(h, w)` square. Returns whether the shape changed.
    ///
    /// Resets the working copy to the reshaped raw data, discarding any
    /// earlier normalization.
    pub fn reshape_square(&mut self) -> bool {
        if self.raw.is_square() {
            return false;
        }
        let (h, w) = self.dims();
        self.raw = reshape_square(&self.raw);
        self.normalized = self.raw.clone();
        info!(from_h = h, from_w = w, side = self.raw.height(), "Reshaped stack to square");
        true
    }

    /// Re-derive the working copy from the raw data and normalize it.
    pub fn normalize_all(&mut self, threshold: Threshold, scope: NormalizeScope) -> NormalizeReport {
        self.normalized = self.raw.clone();
        let report = normalize_stack(&mut self.normalized, threshold, scope);
        info!(
            rescaled = report.rescaled,
            degenerate = report.degenerate.len(),
            threshold = %threshold,
            "Normalized stack"
        );
        report
    }
}
