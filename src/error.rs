use thiserror::Error;

/// Failures a submission can end in. None of them are fatal to the caller:
/// the worst case is that the user submits again.
#[derive(Debug, Error)]
pub enum SumtubeError {
    /// Submitted text carries no video identifier
    #[error("could not extract a YouTube video ID from: {0}")]
    InvalidInput(String),

    /// The status request never produced a usable HTTP response
    #[error("summary service unreachable: {0}")]
    Transport(String),

    /// The response arrived but matched neither known status shape
    #[error("unexpected summary service response: {0}")]
    Protocol(String),

    #[error("malformed URL: {0}")]
    MalformedUrl(String),

    /// The owning session was superseded before it finished
    #[error("submission cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for SumtubeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SumtubeError::Protocol(e.to_string())
        } else {
            SumtubeError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SumtubeError {
    fn from(e: serde_json::Error) -> Self {
        SumtubeError::Protocol(e.to_string())
    }
}

impl SumtubeError {
    /// Message shown to the user; transport and protocol problems share one generic text
    pub fn user_message(&self) -> String {
        match self {
            SumtubeError::InvalidInput(_) => "Please enter a valid YouTube URL".to_string(),
            SumtubeError::Transport(_) | SumtubeError::Protocol(_) | SumtubeError::MalformedUrl(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            SumtubeError::Cancelled => "Submission cancelled".to_string(),
        }
    }
}
