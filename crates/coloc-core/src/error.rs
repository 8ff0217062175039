use thiserror::Error;

#[derive(Error, Debug)]
pub enum ColocError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF decoding error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Threshold must be a real number or \"off\", got {0:?}")]
    ThresholdType(String),

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Channel index {index} out of range (total: {total})")]
    ChannelIndexOutOfRange { index: usize, total: usize },

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Summary serialization error: {0}")]
    Summary(#[from] toml::ser::Error),
}

/// Coarse classification of [`ColocError`], used by callers that only need
/// to know which class of failure stopped the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Configuration,
    Type,
    Io,
    Internal,
}

impl ColocError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_)
            | Self::FrameIndexOutOfRange { .. }
            | Self::ChannelIndexOutOfRange { .. } => ErrorKind::InvalidInput,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::ThresholdType(_) => ErrorKind::Type,
            Self::Io(_) | Self::Tiff(_) | Self::ImageError(_) | Self::Summary(_) => ErrorKind::Io,
            Self::Pipeline(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ColocError>;
