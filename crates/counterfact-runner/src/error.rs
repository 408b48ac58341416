//! Error types for the LLM collaborator.
//!
//! Uses `thiserror` for typed errors that surface through the collaborator
//! pipeline: backend construction, HTTP calls, prompt rendering, response
//! parsing. At the collaborator seam every variant becomes a
//! [`CollaboratorError`], which the resilient wrapper absorbs.

use counterfact_core::error::CollaboratorError;

/// Errors that can occur while talking to an LLM backend.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to load or render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The LLM response could not be parsed into the expected shape.
    #[error("response parse error: {0}")]
    Parse(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<RunnerError> for CollaboratorError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::LlmBackend(msg) => Self::Backend(msg),
            RunnerError::Parse(msg) => Self::Malformed(msg),
            RunnerError::Serde(e) => Self::Malformed(e.to_string()),
            RunnerError::Template(msg) | RunnerError::Config(msg) => Self::Unavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runner_errors_map_onto_collaborator_classes() {
        assert_eq!(
            CollaboratorError::from(RunnerError::LlmBackend("503".to_owned())),
            CollaboratorError::Backend("503".to_owned())
        );
        assert_eq!(
            CollaboratorError::from(RunnerError::Parse("not json".to_owned())),
            CollaboratorError::Malformed("not json".to_owned())
        );
        assert!(matches!(
            CollaboratorError::from(RunnerError::Template("missing fork".to_owned())),
            CollaboratorError::Unavailable(_)
        ));
    }
}
