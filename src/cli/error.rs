//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        CliError::from(ApplicationError::Domain(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::ResultsDir { .. } => crate::exitcode::IOERR,
                InfraError::Application(ApplicationError::Config { .. }) => {
                    crate::exitcode::CONFIG
                }
                InfraError::Application(ApplicationError::OperationFailed { .. }) => {
                    crate::exitcode::CANTCREAT
                }
                InfraError::Application(ApplicationError::Domain(d)) => match d {
                    DomainError::NotFound(_) => crate::exitcode::NOINPUT,
                    DomainError::TooManyCutSets { .. } => crate::exitcode::SOFTWARE,
                    _ => crate::exitcode::DATAERR,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn given_missing_input_when_mapping_exit_code_then_noinput() {
        let err = CliError::from(DomainError::NotFound(PathBuf::from("events.txt")));
        assert_eq!(err.exit_code(), crate::exitcode::NOINPUT);
    }

    #[test]
    fn given_bad_input_when_mapping_exit_code_then_dataerr() {
        let err = CliError::from(DomainError::InvalidOperator("XOR".into()));
        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
    }

    #[test]
    fn given_unwritable_results_dir_when_mapping_exit_code_then_ioerr() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CliError::from(InfraError::results_dir(&PathBuf::from("/out"), source));
        assert_eq!(err.exit_code(), crate::exitcode::IOERR);
        assert!(err.to_string().contains("/out"));
    }

    #[test]
    fn given_usage_error_when_mapping_exit_code_then_usage() {
        assert_eq!(
            CliError::Usage("missing".into()).exit_code(),
            crate::exitcode::USAGE
        );
    }
}
