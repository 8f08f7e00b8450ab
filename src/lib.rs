//! rsfta: fault-tree analysis
//!
//! Minimal cut sets by MOCUS, top-event risk by upper bound, rare-event and exact min-max
//! quantification, importance measures, and fragility convolution with a hazard curve.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
