use thiserror::Error;

/// Errors raised by the histogram pipeline.
#[derive(Debug, Error)]
pub enum HistogramError {
    /// Configuration or input rejected at pipeline entry.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A bin index fell outside `[0, len)`.
    #[error("bin index {index} out of range for {len} bins")]
    OutOfRange { index: usize, len: usize },

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("worker result channel closed before all chunks reported")]
    ChannelClosed,
}

impl HistogramError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub type Result<T, E = HistogramError> = std::result::Result<T, E>;
