//! Errors raised while wiring services to the filesystem

use std::path::Path;

use thiserror::Error;

use crate::application::ApplicationError;

#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Results directory could not be prepared before the analysis ran.
    #[error("results directory {path}: {source}")]
    ResultsDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl InfraError {
    pub fn results_dir(path: &Path, source: std::io::Error) -> Self {
        Self::ResultsDir {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type InfraResult<T> = Result<T, InfraError>;
