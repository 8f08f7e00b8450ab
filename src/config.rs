//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/rsfta/rsfta.toml`
//! 3. Local config: `./rsfta.toml` or an explicit `--config` file
//! 4. Environment variables: `RSFTA_*` prefix
//! 5. Command line flags (applied by the CLI)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::quantification::MAX_SEED;
use crate::application::services::AnalysisOptions;
use crate::application::ApplicationError;
use crate::domain::hazard::{DEFAULT_IM_RANGE, DEFAULT_NBINS};
use crate::domain::minmax::DEFAULT_MAX_CUT_SETS;
use crate::domain::{AnalysisMode, DomainError, ImBinning, Sampling};

pub const CONFIG_FILE: &str = "rsfta.toml";

/// Unified configuration for rsfta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// `fragility` or `risk`
    pub analysis: AnalysisMode,
    /// Hazard curve file for fragility analysis (built-in curve when unset)
    pub hazard: Option<PathBuf>,
    /// Two values: IM range split into `nbins`; more: bin extents
    pub im: Vec<f64>,
    /// Explicit bin midpoints, overrides `im`
    pub im_midpoints: Vec<f64>,
    pub nbins: usize,
    /// Monte Carlo sampling of NORM basic events
    pub uncertainty: bool,
    pub nsamp: usize,
    pub seed: Option<u64>,
    /// Skip approach 1 in fragility analysis
    pub lite: bool,
    pub write_output: bool,
    pub results_dir: PathBuf,
    pub max_exact_cut_sets: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            analysis: AnalysisMode::Risk,
            hazard: None,
            im: DEFAULT_IM_RANGE.to_vec(),
            im_midpoints: Vec::new(),
            nbins: DEFAULT_NBINS,
            uncertainty: false,
            nsamp: 1,
            seed: None,
            lite: false,
            write_output: false,
            results_dir: PathBuf::from("."),
            max_exact_cut_sets: DEFAULT_MAX_CUT_SETS,
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub analysis: Option<AnalysisMode>,
    pub hazard: Option<PathBuf>,
    pub im: Option<Vec<f64>>,
    pub im_midpoints: Option<Vec<f64>>,
    pub nbins: Option<usize>,
    pub uncertainty: Option<bool>,
    pub nsamp: Option<usize>,
    pub seed: Option<u64>,
    pub lite: Option<bool>,
    pub write_output: Option<bool>,
    pub results_dir: Option<PathBuf>,
    pub max_exact_cut_sets: Option<usize>,
}

/// Get the XDG config directory for rsfta.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rsfta").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        self.results_dir = expand_path(&self.results_dir);
        self.hazard = self.hazard.as_deref().map(expand_path);
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            analysis: overlay.analysis.unwrap_or(self.analysis),
            hazard: overlay.hazard.clone().or_else(|| self.hazard.clone()),
            im: overlay.im.clone().unwrap_or_else(|| self.im.clone()),
            im_midpoints: overlay
                .im_midpoints
                .clone()
                .unwrap_or_else(|| self.im_midpoints.clone()),
            nbins: overlay.nbins.unwrap_or(self.nbins),
            uncertainty: overlay.uncertainty.unwrap_or(self.uncertainty),
            nsamp: overlay.nsamp.unwrap_or(self.nsamp),
            seed: overlay.seed.or(self.seed),
            lite: overlay.lite.unwrap_or(self.lite),
            write_output: overlay.write_output.unwrap_or(self.write_output),
            results_dir: overlay
                .results_dir
                .clone()
                .unwrap_or_else(|| self.results_dir.clone()),
            max_exact_cut_sets: overlay.max_exact_cut_sets.unwrap_or(self.max_exact_cut_sets),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Explicit config file; must exist. Without it `./rsfta.toml` is used if
    ///   present.
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        // 3. Local config
        match local {
            Some(path) => {
                if !path.exists() {
                    return Err(DomainError::NotFound(path.to_path_buf()).into());
                }
                current = current.merge_with(&load_raw_settings(path)?);
            }
            None => {
                let path = PathBuf::from(CONFIG_FILE);
                if path.exists() {
                    current = current.merge_with(&load_raw_settings(&path)?);
                }
            }
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        current.validate()?;
        Ok(current)
    }

    /// Apply RSFTA_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("RSFTA")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("im")
                .with_list_parse_key("im_midpoints")
                .try_parsing(true),
        );
        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("analysis") {
            settings.analysis = val.parse()?;
        }
        if let Ok(val) = config.get_string("hazard") {
            settings.hazard = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get::<Vec<f64>>("im") {
            settings.im = val;
        }
        if let Ok(val) = config.get::<Vec<f64>>("im_midpoints") {
            settings.im_midpoints = val;
        }
        if let Ok(val) = config.get::<usize>("nbins") {
            settings.nbins = val;
        }
        if let Ok(val) = config.get_bool("uncertainty") {
            settings.uncertainty = val;
        }
        if let Ok(val) = config.get::<usize>("nsamp") {
            settings.nsamp = val;
        }
        if let Ok(val) = config.get::<u64>("seed") {
            settings.seed = Some(val);
        }
        if let Ok(val) = config.get_bool("lite") {
            settings.lite = val;
        }
        if let Ok(val) = config.get_bool("write_output") {
            settings.write_output = val;
        }
        if let Ok(val) = config.get_string("results_dir") {
            settings.results_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get::<usize>("max_exact_cut_sets") {
            settings.max_exact_cut_sets = val;
        }
        Ok(settings)
    }

    /// Reject values the analysis can not run with.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.nbins == 0 {
            return Err(DomainError::RangeError("nbins must be greater than 0".to_string()).into());
        }
        if self.nsamp == 0 {
            return Err(DomainError::RangeError("nsamp must be greater than 0".to_string()).into());
        }
        if let Some(seed) = self.seed {
            if seed > MAX_SEED {
                return Err(DomainError::RangeError(format!(
                    "seed must be between 0 and {}, got {}",
                    MAX_SEED, seed
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Translate into analysis options; the hazard file is read by the service.
    pub fn analysis_options(&self) -> Result<AnalysisOptions, ApplicationError> {
        self.validate()?;
        let binning = if self.im_midpoints.is_empty() {
            ImBinning::from_list(&self.im, self.nbins)?
        } else {
            ImBinning::Midpoints(self.im_midpoints.clone())
        };
        let sampling = if self.uncertainty {
            Sampling::monte_carlo(self.nsamp, self.seed)
        } else {
            Sampling {
                uncertainty: false,
                nsamp: self.nsamp,
                seed: self.seed,
            }
        };
        Ok(AnalysisOptions {
            analysis: self.analysis,
            hazard: None,
            binning,
            sampling,
            lite: self.lite,
            max_exact_cut_sets: self.max_exact_cut_sets,
        })
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# rsfta configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/rsfta/rsfta.toml
#   Local:  ./rsfta.toml (or --config <file>)
#   Env:    RSFTA_* environment variables, e.g. RSFTA_ANALYSIS=fragility, RSFTA_IM=0.1,4
#   CLI flags of `rsfta analyze`

# Analysis type: "risk" (basic events are probabilities/frequencies)
# or "fragility" (basic events are lognormal fragility curves)
# analysis = "risk"

# Hazard curve file (IM, annual exceedance frequency per line).
# The built-in curve is used for fragility analysis when unset.
# hazard = "~/pra/hazard.txt"

# Intensity measure: two values are a range split into nbins equal bins,
# more values are bin extents
# im = [0.1, 4.0]
# nbins = 15

# Explicit bin midpoints (take precedence over im)
# im_midpoints = [0.2, 0.4, 0.8]

# Monte Carlo sampling of NORM basic events
# uncertainty = false
# nsamp = 1
# seed = 42

# Fragility analysis only: skip the cut-set based approach
# lite = false

# Write CSV results to <results_dir>/<name>_results/
# write_output = false
# results_dir = "."

# Largest cut-set count for the exact min-max calculation
# max_exact_cut_sets = 20
"#
        .to_string()
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(raw.as_ref()) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_validating_then_ok() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.nbins, 15);
        assert_eq!(settings.im, vec![0.1, 4.0]);
    }

    #[test]
    fn given_raw_overlay_when_merging_then_only_specified_fields_change() {
        let base = Settings::default();
        let overlay = RawSettings {
            analysis: Some(AnalysisMode::Fragility),
            nbins: Some(4),
            ..Default::default()
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.analysis, AnalysisMode::Fragility);
        assert_eq!(merged.nbins, 4);
        assert_eq!(merged.nsamp, base.nsamp);
        assert_eq!(merged.results_dir, base.results_dir);
    }

    #[test]
    fn given_large_seed_when_validating_then_range_error() {
        let settings = Settings {
            seed: Some(1 << 32),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ApplicationError::Domain(DomainError::RangeError(_)))
        ));
    }

    #[test]
    fn given_midpoints_when_building_options_then_midpoint_binning() {
        let settings = Settings {
            im_midpoints: vec![0.2, 0.4],
            ..Default::default()
        };
        let options = settings.analysis_options().unwrap();
        assert_eq!(options.binning, ImBinning::Midpoints(vec![0.2, 0.4]));
    }

    #[test]
    fn given_settings_when_serialising_then_template_keys_parse() {
        let toml = Settings::default().to_toml().unwrap();
        let raw: RawSettings = toml::from_str(&toml).unwrap();
        assert_eq!(raw.nbins, Some(15));
        assert_eq!(raw.analysis, Some(AnalysisMode::Risk));
    }
}
