//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Exit code when the directory was instrumented by an earlier run
pub const EXIT_ALREADY_INSTRUMENTED: u8 = 3;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Library error
    #[error("{0}")]
    Vri(#[from] vri::VriError),

    /// Report serialization error
    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Vri(err) if err.is_already_instrumented() => EXIT_ALREADY_INSTRUMENTED,
            _ => 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_already_instrumented_exit_code() {
        let err: CliError = vri::VriError::AlreadyInstrumented {
            root: PathBuf::from("obj_dir"),
            marker: PathBuf::from("obj_dir/coverage.hpp"),
        }
        .into();
        assert_eq!(err.exit_code(), EXIT_ALREADY_INSTRUMENTED);
        assert!(err.to_string().contains("already instrumented"));
    }

    #[test]
    fn test_other_errors_exit_one() {
        let err: CliError = vri::VriError::MissingDirectory {
            path: PathBuf::from("nowhere"),
        }
        .into();
        assert_eq!(err.exit_code(), 1);

        let err: CliError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().starts_with("Failed to render JSON"));
    }
}
