//! Result tables
//!
//! Writes the analysis results as CSV files below `<results_dir>/<name>_results/`:
//! `approach_1/` holds cut sets, top-event estimates and importance measures,
//! `approach_2/` the per-bin hazard and top-event fragility table.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::services::quantification::{Approach1, Approach2, Quantification};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{ImportanceMeasures, Summary};
use crate::infrastructure::traits::FileSystem;

const MEASURE_FILES: [&str; 6] = ["fv", "rrr", "rir", "rri", "rii", "bi"];

/// Writes quantification results through the filesystem seam.
pub struct ReportService {
    fs: Arc<dyn FileSystem>,
}

impl ReportService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Directory receiving the results of `name`.
    pub fn results_dir(results_dir: &Path, name: &str) -> PathBuf {
        results_dir.join(format!("{}_results", name))
    }

    /// Write all available results; returns the written files.
    #[instrument(level = "debug", skip(self, quantification), fields(name = quantification.name()))]
    pub fn write(
        &self,
        quantification: &Quantification,
        results_dir: &Path,
    ) -> ApplicationResult<Vec<PathBuf>> {
        let base = Self::results_dir(results_dir, quantification.name());
        let mut written = Vec::new();
        if let Some(a2) = quantification.approach_2() {
            written.push(self.write_approach_2(a2, &base.join("approach_2"))?);
        }
        if let Some(a1) = quantification.approach_1() {
            written.extend(self.write_approach_1(a1, &base.join("approach_1"))?);
        }
        debug!(files = written.len(), "results written");
        Ok(written)
    }

    pub fn write_approach_1(&self, a1: &Approach1, dir: &Path) -> ApplicationResult<Vec<PathBuf>> {
        let mut written = Vec::new();

        let mut rows = vec![
            row(["Cut Sets", "Prob/Freq", "IM (%)"]),
            vec![
                "Total".to_string(),
                a1.upper_bound().summary.point.to_string(),
                "100".to_string(),
            ],
        ];
        rows.extend(a1.cut_sets.iter().map(|cs| {
            vec![
                cs.label(),
                cs.probability.point().to_string(),
                cs.importance.point().to_string(),
            ]
        }));
        written.push(self.write_csv(&dir.join("cutsets.csv"), &rows)?);

        let mut rows = vec![row([
            "Quantification Method",
            "Prob/Freq",
            "Mean",
            "Median",
            "5th",
            "95th",
            "SD",
        ])];
        rows.extend(
            a1.top_event
                .iter()
                .map(|est| summary_row(est.method, &est.summary)),
        );
        written.push(self.write_csv(&dir.join("top_event.csv"), &rows)?);

        let mut header = row(["Basic Event", "Count", "Prob"]);
        header.extend(ImportanceMeasures::NAMES.iter().map(|n| n.to_string()));
        let mut rows = vec![header];
        rows.extend(a1.events.iter().map(|e| {
            let mut r = vec![e.name.clone(), e.count.to_string(), e.probability.to_string()];
            r.extend(e.measures.as_array().iter().map(|s| s.point.to_string()));
            r
        }));
        written.push(self.write_csv(&dir.join("importance_measures.csv"), &rows)?);

        for (i, file) in MEASURE_FILES.iter().enumerate() {
            let mut header = row(["Basic Event"]);
            header.extend(Summary::HEADERS.iter().map(|h| h.to_string()));
            let mut rows = vec![header];
            rows.extend(
                a1.events
                    .iter()
                    .map(|e| summary_row(&e.name, e.measures.as_array()[i])),
            );
            written.push(self.write_csv(&dir.join(format!("{}.csv", file)), &rows)?);
        }
        Ok(written)
    }

    pub fn write_approach_2(&self, a2: &Approach2, dir: &Path) -> ApplicationResult<PathBuf> {
        let mut rows = vec![row([
            "bin#",
            "im",
            "mafe",
            "top_failure_prob",
            "delta_mafe",
            "bin_risk",
        ])];
        for i in 0..a2.top_fragility.len() {
            rows.push(vec![
                (i + 1).to_string(),
                a2.hazard.im[i].to_string(),
                a2.hazard.frequencies[i].to_string(),
                a2.top_fragility[i].to_string(),
                a2.hazard.deltas[i].to_string(),
                a2.bin_risk[i].to_string(),
            ]);
        }
        self.write_csv(&dir.join("results.csv"), &rows)
    }

    fn write_csv(&self, path: &Path, rows: &[Vec<String>]) -> ApplicationResult<PathBuf> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for r in rows {
            wtr.write_record(r).map_err(|e| csv_err(path, e))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))
            .with_path_context("serialize csv", path)?;
        let content = String::from_utf8(bytes).map_err(|e| ApplicationError::OperationFailed {
            context: format!("encode csv: {}", path.display()),
            source: Box::new(e),
        })?;

        self.fs
            .ensure_parent(path)
            .with_path_context("create results directory", path)?;
        self.fs
            .write(path, &content)
            .with_path_context("write results", path)?;
        Ok(path.to_path_buf())
    }
}

fn row<const N: usize>(cells: [&str; N]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn summary_row(label: &str, summary: &Summary) -> Vec<String> {
    let mut r = vec![label.to_string()];
    r.extend(summary.as_row().iter().map(|v| v.to_string()));
    r
}

fn csv_err(path: &Path, e: csv::Error) -> ApplicationError {
    ApplicationError::OperationFailed {
        context: format!("write csv record: {}", path.display()),
        source: Box::new(e),
    }
}
