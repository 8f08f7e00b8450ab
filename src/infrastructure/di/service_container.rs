//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::application::services::{QuantificationService, ReportService};
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::{InfraError, InfraResult};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub quantification: QuantificationService,
    pub report: ReportService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);
        let quantification = QuantificationService::new(Arc::clone(&fs));
        let report = ReportService::new(Arc::clone(&fs));

        Self {
            settings,
            fs,
            quantification,
            report,
        }
    }

    /// Create the configured results directory up front, so an unwritable location fails
    /// before the quantification runs.
    pub fn prepare_results_dir(&self) -> InfraResult<PathBuf> {
        let dir = self.settings.results_dir.clone();
        self.fs
            .create_dir_all(&dir)
            .map_err(|e| InfraError::results_dir(&dir, e))?;
        debug!(dir = %dir.display(), "results directory ready");
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn given_missing_results_dir_when_preparing_then_created() {
        // Arrange
        let temp = TempDir::new().unwrap();
        let settings = Settings {
            results_dir: temp.path().join("runs/plant"),
            ..Default::default()
        };
        let container = ServiceContainer::new(settings);

        // Act
        let dir = container.prepare_results_dir().unwrap();

        // Assert
        assert!(dir.is_dir());
    }

    #[test]
    fn given_file_in_place_of_results_dir_when_preparing_then_results_dir_error() {
        // Arrange
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("results");
        std::fs::write(&blocker, "not a directory").unwrap();
        let settings = Settings {
            results_dir: blocker.join("nested"),
            ..Default::default()
        };

        // Act
        let err = ServiceContainer::new(settings)
            .prepare_results_dir()
            .unwrap_err();

        // Assert
        assert!(matches!(err, InfraError::ResultsDir { .. }), "got {err:?}");
    }
}
