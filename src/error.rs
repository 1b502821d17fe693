use thiserror::Error;

/// Failures surfaced by the detection core and its collaborators.
#[derive(Debug, Error)]
pub enum SentryError {
    /// Programmer error, e.g. asking for the median of an empty window.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("playback error: {0}")]
    Playback(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(String),
}

impl From<reqwest::Error> for SentryError {
    fn from(err: reqwest::Error) -> Self {
        SentryError::Transport(err.to_string())
    }
}

impl From<image::ImageError> for SentryError {
    fn from(err: image::ImageError) -> Self {
        SentryError::Image(err.to_string())
    }
}

pub type SentryResult<T> = std::result::Result<T, SentryError>;
