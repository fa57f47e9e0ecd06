use thiserror::Error;

/// A failure in one of the relay's outbound calls. Each variant is fatal to
/// the webhook event that triggered it.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to fetch message from Chatwork: {0}")]
    Fetch(String),

    #[error("Failed to generate image from external API: {0}")]
    Generation(String),

    #[error("Failed to upload file to Chatwork: {0}")]
    Upload(String),
}

impl RelayError {
    /// Pipeline stage that failed, for log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            RelayError::Fetch(_) => "fetch",
            RelayError::Generation(_) => "generate",
            RelayError::Upload(_) => "upload",
        }
    }
}
