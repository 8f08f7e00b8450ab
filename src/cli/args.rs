//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::domain::AnalysisMode;

/// Fault-tree analysis: minimal cut sets, top-event risk and importance measures
#[derive(Parser, Debug)]
#[command(name = "rsfta")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d INFO, -dd DEBUG, -ddd TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file (default: ./rsfta.toml if present)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Quantify a fault tree
    Analyze(AnalyzeArgs),

    /// List minimal cut sets
    Cutsets {
        /// Fault tree logic file
        #[arg(value_hint = ValueHint::FilePath)]
        logic: PathBuf,
    },

    /// Show fault tree
    Tree {
        /// Fault tree logic file
        #[arg(value_hint = ValueHint::FilePath)]
        logic: PathBuf,
        /// Print the gate rows instead of the tree
        #[arg(long)]
        rows: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Options of `rsfta analyze`; unset flags fall back to the loaded settings.
#[derive(Args, Debug, Default)]
pub struct AnalyzeArgs {
    /// Fault tree logic file
    #[arg(value_hint = ValueHint::FilePath)]
    pub logic: PathBuf,

    /// Basic events file
    #[arg(value_hint = ValueHint::FilePath)]
    pub basic_events: PathBuf,

    /// Name of the analysis (default: logic file stem)
    #[arg(short, long)]
    pub name: Option<String>,

    /// fragility or risk
    #[arg(short, long)]
    pub analysis: Option<AnalysisMode>,

    /// Hazard curve file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub hazard: Option<PathBuf>,

    /// IM range (two values) or bin extents
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub im: Option<Vec<f64>>,

    /// Explicit IM bin midpoints
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub im_midpoints: Option<Vec<f64>>,

    /// Number of IM bins for a range
    #[arg(long)]
    pub nbins: Option<usize>,

    /// Sample NORM basic events
    #[arg(short, long)]
    pub uncertainty: bool,

    /// Number of samples
    #[arg(long)]
    pub nsamp: Option<usize>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip the cut-set based approach (fragility only)
    #[arg(long)]
    pub lite: bool,

    /// Write CSV results
    #[arg(short, long)]
    pub write_output: bool,

    /// Directory receiving <name>_results/
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub results_dir: Option<PathBuf>,

    /// Largest cut-set count for the exact calculation
    #[arg(long)]
    pub max_exact_cut_sets: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,

    /// Print config template
    Template,
}
