//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the FileSystem boundary trait but are themselves
//! concrete structs, not traits.

pub mod quantification;
mod report;

pub use quantification::{
    AnalysisOptions, Approach1, Approach2, CutSetResult, EventResult, Quantification,
    QuantificationService, TopEventEstimate,
};
pub use report::ReportService;
