use thiserror::Error;

/// Failure taxonomy for the moderation pipeline.
///
/// `Configuration` messages name the missing variable, never its value, so
/// they are safe to surface verbatim.
#[derive(Debug, Error)]
pub enum AegisError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("upstream AI failure: {0}")]
    Upstream(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("service unavailable: {0}")]
    Configuration(String),
}

impl AegisError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// The bare detail string, without the taxonomy prefix `Display` adds.
    pub fn detail(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::Upstream(msg)
            | Self::Persistence(msg)
            | Self::Configuration(msg) => msg,
        }
    }
}
