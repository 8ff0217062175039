//! Min-max normalization with optional sub-threshold zeroing.

use std::fmt;

use ndarray::{s, ArrayViewMut, Dimension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ColocError, Result};
use crate::frame::ImageStack;

/// Post-rescale cutoff, in normalized [0, 1] units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ThresholdSetting", into = "ThresholdSetting")]
pub enum Threshold {
    /// Rescale only.
    #[default]
    Off,
    /// Zero every rescaled value strictly below the cutoff.
    Cutoff(f64),
}

impl Threshold {
    /// Build a cutoff, rejecting anything outside the open interval (0, 1).
    pub fn cutoff(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 || value >= 1.0 {
            return Err(ColocError::config(format!(
                "threshold must lie strictly between 0 and 1, got {value}"
            )));
        }
        Ok(Self::Cutoff(value))
    }

    /// Parse a user-supplied threshold: a number, or one of `off`, `none`,
    /// `false`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "off" | "none" | "false" => Ok(Self::Off),
            _ => match trimmed.parse::<f64>() {
                Ok(v) => Self::cutoff(v),
                Err(_) => Err(ColocError::ThresholdType(trimmed.to_string())),
            },
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Off => None,
            Self::Cutoff(v) => Some(*v),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Cutoff(v) => write!(f, "{v}"),
        }
    }
}

/// A threshold as written in a parameter file: a number, `false`, or text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdSetting {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl TryFrom<ThresholdSetting> for Threshold {
    type Error = ColocError;

    fn try_from(setting: ThresholdSetting) -> Result<Self> {
        match setting {
            ThresholdSetting::Flag(false) => Ok(Self::Off),
            ThresholdSetting::Flag(true) => Err(ColocError::ThresholdType("true".into())),
            ThresholdSetting::Number(v) => Self::cutoff(v),
            ThresholdSetting::Text(s) => Self::parse(&s),
        }
    }
}

impl From<Threshold> for ThresholdSetting {
    fn from(t: Threshold) -> Self {
        match t {
            Threshold::Off => Self::Flag(false),
            Threshold::Cutoff(v) => Self::Number(v),
        }
    }
}

/// What `normalize` did to a slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NormalizeOutcome {
    Rescaled,
    /// Constant input (max == min); left unchanged.
    Degenerate,
}

/// Which pixels share one min/max.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizeScope {
    /// Each (frame, channel) slice on its own.
    #[default]
    PerFrame,
    /// One channel jointly across every frame.
    PerChannel,
}

impl fmt::Display for NormalizeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerFrame => write!(f, "Per Frame"),
            Self::PerChannel => write!(f, "Per Channel"),
        }
    }
}

/// Min-max rescale `data` in place to [0, 1], then zero values below the
/// threshold.
pub fn normalize<D: Dimension>(mut data: ArrayViewMut<f32, D>, threshold: Threshold) -> NormalizeOutcome {
    let (min, max) = data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if data.is_empty() || max <= min {
        return NormalizeOutcome::Degenerate;
    }

    let range = max - min;
    let cutoff = threshold.value();
    data.mapv_inplace(|v| {
        let scaled = (v - min) / range;
        match cutoff {
            Some(t) if (scaled as f64) < t => 0.0,
            _ => scaled,
        }
    });
    NormalizeOutcome::Rescaled
}

/// A channel left untouched because it was constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DegenerateChannel {
    pub channel: usize,
    /// `None` when the channel was normalized across all frames.
    pub frame: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct NormalizeReport {
    pub rescaled: usize,
    pub degenerate: Vec<DegenerateChannel>,
}

/// Normalize every channel of every frame. Degenerate channels are skipped
/// and reported; they never abort the stack.
pub fn normalize_stack(
    stack: &mut ImageStack,
    threshold: Threshold,
    scope: NormalizeScope,
) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    let channels = stack.channel_count();
    let frames = stack.frame_count();

    let mut record = |outcome: NormalizeOutcome, channel: usize, frame: Option<usize>| match outcome
    {
        NormalizeOutcome::Rescaled => report.rescaled += 1,
        NormalizeOutcome::Degenerate => {
            debug!(channel, frame = ?frame, "Constant channel left unnormalized");
            report.degenerate.push(DegenerateChannel { channel, frame });
        }
    };

    match scope {
        NormalizeScope::PerFrame => {
            for f in 0..frames {
                for c in 0..channels {
                    let outcome = normalize(stack.data.slice_mut(s![.., .., c, f]), threshold);
                    record(outcome, c, Some(f));
                }
            }
        }
        NormalizeScope::PerChannel => {
            for c in 0..channels {
                let outcome = normalize(stack.data.slice_mut(s![.., .., c, ..]), threshold);
                record(outcome, c, None);
            }
        }
    }
    report
}
