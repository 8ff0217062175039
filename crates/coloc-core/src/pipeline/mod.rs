pub mod config;
mod orchestrator;
pub mod params;
mod sink;
mod types;

pub use orchestrator::Orchestrator;
pub use sink::{FrameView, MemorySink, PngSink, ResultSink};
pub use types::{
    FrameResult, FrameSummary, NoOpReporter, PipelineStage, PipelineState, ProgressReporter,
    RunSummary,
};
