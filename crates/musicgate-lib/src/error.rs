use thiserror::Error;

/// Convenient result alias for the musicgate library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure talking to an upstream service.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Upstream returned a body that was not valid JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The search client could not extract its session configuration.
    #[error("failed to initialize YouTube Music client: {0}")]
    Initialization(String),

    /// Upstream answered, but not in a shape we understand.
    #[error("unexpected response from {service}: {message}")]
    UnexpectedResponse {
        service: &'static str,
        message: String,
    },

    /// Raised when a video identifier is not a well-formed YouTube id.
    #[error("invalid video ID '{0}'")]
    InvalidVideoId(String),

    /// The player reported that the video cannot be played.
    #[error("video {video_id} is not playable: {reason}")]
    Unplayable { video_id: String, reason: String },

    /// None of the resolved formats carried a usable audio stream.
    #[error("No usable audio formats found for this video.")]
    NoAudioFormats,

    /// The metadata upstream answered with a non-success status.
    #[error("{message}")]
    UpstreamStatus { status: u16, message: String },

    /// A configured base URL could not be parsed.
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}

impl Error {
    /// Whether the error was caused by caller input rather than the upstream.
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::InvalidVideoId(_) => true,
            Error::UpstreamStatus { status, .. } => (400..500).contains(status),
            _ => false,
        }
    }
}
