pub mod normalize;
pub mod reshape;
mod store;

pub use normalize::{
    normalize, normalize_stack, DegenerateChannel, NormalizeOutcome, NormalizeReport,
    NormalizeScope, Threshold, ThresholdSetting,
};
pub use reshape::{resample_bicubic, reshape_square};
pub use store::FrameStore;
