// Error taxonomy shared by the pipeline stages

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or rejected credentials, or the login form never showed up.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The quota value could not be read from the portal.
    #[error("quota extraction failed: {0}")]
    Extraction(String),

    /// The browser session itself failed (driver unreachable, crashed tab).
    #[error("browser automation failed: {0}")]
    Browser(String),

    /// Stored content is not a JSON array of samples.
    #[error("stored series is malformed: {0}")]
    StoreFormat(String),

    #[error("nothing to read: {0}")]
    NotFound(String),

    /// Existing content cannot be extended with a new sample.
    #[error("refusing to append: {0}")]
    Validation(String),

    #[error("stored series changed during the update (read revision {expected}, now {actual})")]
    Conflict { expected: String, actual: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Errors raised while driving the portal, which get a diagnostic record.
    pub fn is_portal_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::Auth(_) | PipelineError::Extraction(_) | PipelineError::Browser(_)
        )
    }
}
