use std::path::PathBuf;

use ndarray::{s, Array4, ArrayView2, ArrayView3, ArrayViewMut2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ColocError, Result};

/// A multi-frame, multi-channel image stack.
///
/// Axes are `(height, width, channel, frame)`. Every frame shares the same
/// spatial shape and channel count.
#[derive(Clone, Debug)]
pub struct ImageStack {
    pub data: Array4<f32>,
}

impl ImageStack {
    pub fn new(data: Array4<f32>) -> Self {
        Self { data }
    }

    pub fn height(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn channel_count(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn frame_count(&self) -> usize {
        self.data.shape()[3]
    }

    pub fn is_square(&self) -> bool {
        self.height() == self.width()
    }

    /// All channels of one frame, shape `(height, width, channel)`.
    pub fn frame(&self, index: usize) -> Result<ArrayView3<'_, f32>> {
        self.check_frame(index)?;
        Ok(self.data.index_axis(Axis(3), index))
    }

    /// One channel of one frame.
    pub fn channel(&self, frame: usize, channel: usize) -> Result<ArrayView2<'_, f32>> {
        self.check_frame(frame)?;
        self.check_channel(channel)?;
        Ok(self.data.slice(s![.., .., channel, frame]))
    }

    pub fn channel_mut(&mut self, frame: usize, channel: usize) -> Result<ArrayViewMut2<'_, f32>> {
        self.check_frame(frame)?;
        self.check_channel(channel)?;
        Ok(self.data.slice_mut(s![.., .., channel, frame]))
    }

    fn check_frame(&self, index: usize) -> Result<()> {
        let total = self.frame_count();
        if index >= total {
            return Err(ColocError::FrameIndexOutOfRange { index, total });
        }
        Ok(())
    }

    fn check_channel(&self, index: usize) -> Result<()> {
        let total = self.channel_count();
        if index >= total {
            return Err(ColocError::ChannelIndexOutOfRange { index, total });
        }
        Ok(())
    }
}

/// Integer pixel coordinate in image (row, column) order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Euclidean distance to another coordinate, in pixels.
    pub fn distance(&self, other: &Coord) -> f64 {
        let dr = self.row as f64 - other.row as f64;
        let dc = self.col as f64 - other.col as f64;
        (dr * dr + dc * dc).sqrt()
    }
}

/// Integer position in plotting order: `x` is the column, `y` the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotPoint {
    pub x: usize,
    pub y: usize,
}

/// Metadata about the loaded source file.
#[derive(Clone, Debug)]
pub struct SourceInfo {
    pub filename: PathBuf,
    pub total_frames: usize,
    pub channels: usize,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
}
