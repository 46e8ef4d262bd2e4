//! Error types for the pipeline orchestrator and its stores.
//!
//! Step failures are not errors: a collaborator that times out or answers
//! non-2xx is recorded on the Step (see [`crate::executor::StepOutcome`]).
//! Only input, persistence and setup problems surface here.

/// Pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or malformed project identifier, preset or options.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Another orchestration for the same project holds the advisory lock.
    #[error("run already in progress for project {project_id}")]
    RunInProgress { project_id: String },

    /// The document store read or write failed.
    #[error("store error: {message}")]
    Store { message: String },

    /// HTTP client could not be constructed.
    #[error("http client error: {message}")]
    Http { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Requested run, job or history entry does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },
}

impl PipelineError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput { .. } => 2,
            Self::Config { .. } => 2,
            Self::NotFound { .. } => 2,
            Self::RunInProgress { .. } => 4,

            // Infrastructure
            Self::Store { .. } => 3,
            Self::Http { .. } => 3,
        }
    }

    /// Whether re-triggering the same request later can succeed without changing it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RunInProgress { .. } | Self::Store { .. })
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store {
            message: format!("document encoding: {}", err),
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_separate_input_from_infra() {
        assert_eq!(PipelineError::invalid_input("x").exit_code(), 2);
        assert_eq!(PipelineError::store("disk full").exit_code(), 3);
        assert_eq!(
            PipelineError::RunInProgress {
                project_id: "p".into()
            }
            .exit_code(),
            4
        );
    }

    #[test]
    fn test_serde_error_maps_to_store() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let mapped: PipelineError = err.into();
        assert!(matches!(mapped, PipelineError::Store { .. }));
        assert!(mapped.is_transient());
    }
}
