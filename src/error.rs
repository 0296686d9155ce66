use thiserror::Error;

/// Errors produced by analysis, mixing and rendering.
#[derive(Error, Debug)]
pub enum ReactiveError {
    #[error("invalid audio: {0}")]
    InvalidAudio(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("timestamp {timestamp:.3}s is outside the analysed audio (duration {duration:.3}s)")]
    FrameIndexOutOfRange { timestamp: f64, duration: f64 },

    #[error("render cancelled before frame {frame_index}")]
    Cancelled { frame_index: usize },

    #[error("corrupt input frame: {0}")]
    CorruptFrame(String),

    /// Wraps a per-frame failure so callers can see which frame broke.
    #[error("frame {index} of {total}: {source}")]
    Frame {
        index: usize,
        total: usize,
        #[source]
        source: Box<ReactiveError>,
    },

    #[error("invalid analysis file: {0}")]
    CacheFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Wav(#[from] hound::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ReactiveError {
    /// Attach a frame index to an error, leaving cancellation untouched.
    pub fn at_frame(self, index: usize, total: usize) -> Self {
        match self {
            ReactiveError::Cancelled { .. } | ReactiveError::Frame { .. } => self,
            other => ReactiveError::Frame {
                index,
                total,
                source: Box::new(other),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReactiveError::Cancelled { .. })
    }

    /// Index of the failing frame, if the error carries one.
    pub fn frame_index(&self) -> Option<usize> {
        match self {
            ReactiveError::Frame { index, .. } => Some(*index),
            ReactiveError::Cancelled { frame_index } => Some(*frame_index),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReactiveError>;
