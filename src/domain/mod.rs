//! Domain layer: fault-tree model and quantification logic
//!
//! Independent of configuration, terminal output and result files.

pub mod arena;
pub mod builder;
pub mod error;
pub mod event;
pub mod fit;
pub mod hazard;
pub mod importance;
pub mod minmax;
pub mod mocus;
pub mod probability;
pub mod stats;
pub mod tree;

pub use arena::EventArena;
pub use builder::{FaultTreeBuilder, LogicRow};
pub use error::{DomainError, DomainResult};
pub use event::{AnalysisMode, Distribution, EventNode, Sampling};
pub use hazard::{BinnedHazard, Bins, HazardCurve, ImBinning};
pub use importance::{BasicEventImportance, ImportanceMeasures};
pub use mocus::CutSet;
pub use probability::{Gate, Probability, ProbabilityEnv, ProbabilityLookup};
pub use stats::Summary;
pub use tree::FaultTree;
