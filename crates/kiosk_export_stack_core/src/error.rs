use thiserror::Error;

/// Failures that abort synthesis. There is no partial output: a template is
/// either fully built or not produced at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SynthError {
    #[error("invalid resource name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("logical id '{0}' is already defined in the template")]
    DuplicateLogicalId(String),

    #[error("invalid stack configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to serialize {resource}: {message}")]
    Serialize { resource: String, message: String },
}

impl SynthError {
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
