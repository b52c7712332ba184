use outreach_shared::OutreachError;
use thiserror::Error;

/// Errors raised by the learning engine
#[derive(Debug, Error)]
pub enum LearningError {
    #[error("Action space must contain at least one action")]
    EmptyActionSpace,

    #[error("Duplicate action '{0}' in action space")]
    DuplicateAction(String),

    #[error("Action '{0}' is not part of the action space")]
    UnknownAction(String),

    #[error("Invalid action key '{0}': expected template:timing:depth")]
    InvalidActionKey(String),

    #[error("Policy file '{path}' could not be accessed: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Policy snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LearningError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<LearningError> for OutreachError {
    fn from(err: LearningError) -> Self {
        OutreachError::learning(err.to_string())
    }
}
