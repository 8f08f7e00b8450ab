//! Quantification service
//!
//! Runs the full analysis: fault tree, basic-event probabilities, top-event estimates and
//! importance measures. In fragility mode the basic events carry fragility curves; the
//! top-event fragility is convolved with the hazard (approach 2) and, unless running lite,
//! the basic-event fragilities are convolved first and propagated as risks (approach 1).

use std::path::Path;
use std::sync::Arc;

use generational_arena::Index;
use tracing::{debug, info, instrument, warn};

use crate::application::input::{parse_basic_events, parse_hazard, parse_logic, BasicEventInput};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::fit::{fit_lognormal, LognormalFit};
use crate::domain::hazard::{convolve, interpolate};
use crate::domain::importance::{basic_event_importance, cut_set_importance, summarise};
use crate::domain::minmax::{cut_set_probabilities, exact, rare_event, upper_bound, DEFAULT_MAX_CUT_SETS};
use crate::domain::{
    AnalysisMode, BinnedHazard, DomainError, DomainResult, EventNode,
    FaultTree, FaultTreeBuilder, HazardCurve, ImBinning, ImportanceMeasures, Probability,
    ProbabilityEnv, Sampling, Summary,
};
use crate::infrastructure::traits::FileSystem;

/// Largest seed accepted for the Monte Carlo generator.
pub const MAX_SEED: u64 = u32::MAX as u64;

/// Options of one quantification run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub analysis: AnalysisMode,
    /// Hazard curve for fragility analysis; the built-in curve when `None`
    pub hazard: Option<HazardCurve>,
    pub binning: ImBinning,
    pub sampling: Sampling,
    /// Skip approach 1 (cut-set probabilities, approximations, importance)
    pub lite: bool,
    pub max_exact_cut_sets: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            analysis: AnalysisMode::Risk,
            hazard: None,
            binning: ImBinning::default(),
            sampling: Sampling::deterministic(),
            lite: false,
            max_exact_cut_sets: DEFAULT_MAX_CUT_SETS,
        }
    }
}

impl AnalysisOptions {
    pub fn validate(&self) -> DomainResult<()> {
        if self.sampling.nsamp == 0 {
            return Err(DomainError::RangeError(
                "nsamp must be greater than 0".to_string(),
            ));
        }
        if let Some(seed) = self.sampling.seed {
            if seed > MAX_SEED {
                return Err(DomainError::RangeError(format!(
                    "seed must be between 0 and {}, got {}",
                    MAX_SEED, seed
                )));
            }
        }
        if let ImBinning::Range { nbins: 0, .. } = self.binning {
            return Err(DomainError::RangeError(
                "nbins must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-event value of one quantification method.
#[derive(Debug, Clone, PartialEq)]
pub struct TopEventEstimate {
    pub method: &'static str,
    pub probability: Probability,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CutSetResult {
    pub events: Vec<String>,
    pub probability: Probability,
    /// Share of the MCS upper bound in percent
    pub importance: Probability,
}

impl CutSetResult {
    /// `[B1, B2]` style label.
    pub fn label(&self) -> String {
        format!("[{}]", self.events.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventResult {
    pub name: String,
    /// Point probability (risk in fragility mode)
    pub probability: f64,
    pub count: usize,
    pub measures: ImportanceMeasures,
}

/// Cut-set based results on basic-event probabilities or convolved risks.
#[derive(Debug, Clone, PartialEq)]
pub struct Approach1 {
    pub cut_sets: Vec<CutSetResult>,
    /// MCS upper bound, rare event, min-max
    pub top_event: [TopEventEstimate; 3],
    pub events: Vec<EventResult>,
}

impl Approach1 {
    pub fn upper_bound(&self) -> &TopEventEstimate {
        &self.top_event[0]
    }

    pub fn rare_event(&self) -> &TopEventEstimate {
        &self.top_event[1]
    }

    pub fn min_max(&self) -> &TopEventEstimate {
        &self.top_event[2]
    }
}

/// Top-event fragility convolved with the hazard curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Approach2 {
    pub hazard: BinnedHazard,
    pub top_fragility: Vec<f64>,
    pub fit: LognormalFit,
    /// `top_fragility × delta` per bin
    pub bin_risk: Vec<f64>,
    /// `top_fragility × frequency` per bin
    pub bin_risk_mod: Vec<f64>,
    pub top_risk: f64,
}

/// Completed analysis.
#[derive(Debug, Clone)]
pub struct Quantification {
    name: String,
    tree: FaultTree,
    basic_events: Vec<BasicEventInput>,
    options: AnalysisOptions,
    approach_1: Option<Approach1>,
    approach_2: Option<Approach2>,
}

/// Basic event with its resolved arena index (`None` when not part of the logic).
struct ResolvedEvent {
    name: String,
    index: Option<Index>,
    probability: Probability,
}

impl Quantification {
    /// Run the analysis on an already built tree.
    #[instrument(level = "debug", skip(tree, basic_events, options), fields(mode = %options.analysis))]
    pub fn compute(
        name: &str,
        mut tree: FaultTree,
        basic_events: Vec<BasicEventInput>,
        options: AnalysisOptions,
    ) -> DomainResult<Self> {
        options.validate()?;

        let (im, hazard) = match options.analysis {
            AnalysisMode::Fragility => {
                let bins = options.binning.bins()?;
                let curve = options.hazard.clone().unwrap_or_default();
                (bins.midpoints.clone(), Some(interpolate(&curve, &bins)))
            }
            AnalysisMode::Risk => (Vec::new(), None),
        };

        let mut events = assign_probabilities(&mut tree, &basic_events, &options, &im)?;
        let env = environment(&events);
        env.width()?;

        let approach_2 = match &hazard {
            Some(hazard) => Some(approach_2(&tree, &env, hazard, &options)?),
            None => None,
        };

        let approach_1 = if options.lite {
            None
        } else {
            if let Some(hazard) = &hazard {
                convolve_events(&mut tree, &mut events, &hazard.deltas)?;
            }
            Some(approach_1(&tree, &environment(&events), &events, &options)?)
        };

        info!(
            name,
            cut_sets = tree.mocus().len(),
            lite = options.lite,
            "quantification finished"
        );
        Ok(Self {
            name: name.to_string(),
            tree,
            basic_events,
            options,
            approach_1,
            approach_2,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree(&self) -> &FaultTree {
        &self.tree
    }

    pub fn basic_events(&self) -> &[BasicEventInput] {
        &self.basic_events
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn approach_1(&self) -> Option<&Approach1> {
        self.approach_1.as_ref()
    }

    pub fn approach_2(&self) -> Option<&Approach2> {
        self.approach_2.as_ref()
    }

    /// Upper bound, rare-event and min-max point values of approach 1.
    ///
    /// Not available in lite mode.
    pub fn toprisk_1(&self) -> DomainResult<[f64; 3]> {
        self.approach_1
            .as_ref()
            .map(|a| {
                [
                    a.upper_bound().summary.point,
                    a.rare_event().summary.point,
                    a.min_max().summary.point,
                ]
            })
            .ok_or_else(|| {
                DomainError::InvalidInput(
                    "top risk of approach 1 is only available for a full analysis, lite is set"
                        .to_string(),
                )
            })
    }

    /// Top-event risk of approach 2; fragility analysis only.
    pub fn toprisk_2(&self) -> DomainResult<f64> {
        self.approach_2.as_ref().map(|a| a.top_risk).ok_or_else(|| {
            DomainError::InvalidInput(
                "top risk of approach 2 is only computed for fragility analysis".to_string(),
            )
        })
    }

    /// Ratio measures (FV, RRR, RIR) per basic event.
    pub fn be_im_ratio(&self) -> Vec<(&str, [Summary; 3])> {
        self.event_results()
            .map(|e| (e.name.as_str(), [e.measures.fv, e.measures.rrr, e.measures.rir]))
            .collect()
    }

    /// Interval measures (RRI, RII, BI) per basic event.
    pub fn be_im_diff(&self) -> Vec<(&str, [Summary; 3])> {
        self.event_results()
            .map(|e| (e.name.as_str(), [e.measures.rri, e.measures.rii, e.measures.bi]))
            .collect()
    }

    fn event_results(&self) -> impl Iterator<Item = &EventResult> + '_ {
        self.approach_1.iter().flat_map(|a| a.events.iter())
    }
}

fn assign_probabilities(
    tree: &mut FaultTree,
    basic_events: &[BasicEventInput],
    options: &AnalysisOptions,
    im: &[f64],
) -> DomainResult<Vec<ResolvedEvent>> {
    let mut resolved = Vec::with_capacity(basic_events.len());
    for (stream, be) in basic_events.iter().enumerate() {
        let sampling = options.sampling.for_stream(stream as u64);
        let index = tree.arena().index_of(&be.name);
        let probability = match index.and_then(|idx| tree.arena_mut().get_node_mut(idx)) {
            Some(node) => {
                node.set_distribution(be.distribution, options.analysis)?;
                node.set_probability(&be.params, options.analysis, im, &sampling)?;
                node.probability().cloned()
            }
            None => {
                warn!(event = %be.name, "Basic event is not used in logic of the fault tree");
                let mut node = EventNode::basic(&be.name);
                node.set_distribution(be.distribution, options.analysis)?;
                node.set_probability(&be.params, options.analysis, im, &sampling)?;
                node.probability().cloned()
            }
        }
        .ok_or_else(|| DomainError::invariant(&be.name, "probability was not assigned"))?;
        resolved.push(ResolvedEvent {
            name: be.name.clone(),
            index,
            probability,
        });
    }

    if let Some((_, missing)) = tree
        .arena()
        .basic_events()
        .find(|(_, node)| node.probability().is_none())
    {
        return Err(DomainError::InvalidInput(format!(
            "basic event '{}' has no entry in the basic events input",
            missing.name()
        )));
    }
    Ok(resolved)
}

fn environment(events: &[ResolvedEvent]) -> ProbabilityEnv {
    let mut env = ProbabilityEnv::new();
    for event in events {
        if let Some(idx) = event.index {
            env.insert(idx, event.probability.clone());
        }
    }
    env
}

/// Replace fragility curves by their convolved risk.
fn convolve_events(
    tree: &mut FaultTree,
    events: &mut [ResolvedEvent],
    deltas: &[f64],
) -> DomainResult<()> {
    for event in events.iter_mut() {
        let risk = convolve(&event.probability.values(), deltas)?;
        if let Some(node) = event.index.and_then(|idx| tree.arena_mut().get_node_mut(idx)) {
            node.set_point_risk(risk);
        }
        event.probability = Probability::PointEstimate(risk);
    }
    debug!(events = events.len(), "basic-event fragilities convolved");
    Ok(())
}

#[instrument(level = "debug", skip_all)]
fn approach_2(
    tree: &FaultTree,
    env: &ProbabilityEnv,
    hazard: &BinnedHazard,
    options: &AnalysisOptions,
) -> DomainResult<Approach2> {
    let top_fragility = exact(tree.mocus(), env, options.max_exact_cut_sets)?.values();
    if top_fragility.len() != hazard.deltas.len() {
        return Err(DomainError::LengthMismatch {
            left: top_fragility.len(),
            right: hazard.deltas.len(),
        });
    }
    let fit = fit_lognormal(&hazard.im, &top_fragility)?;
    let bin_risk: Vec<f64> = top_fragility
        .iter()
        .zip(&hazard.deltas)
        .map(|(f, d)| f * d)
        .collect();
    let bin_risk_mod = top_fragility
        .iter()
        .zip(&hazard.frequencies)
        .map(|(f, h)| f * h)
        .collect();
    let top_risk = bin_risk.iter().sum();
    debug!(median = fit.median, beta = fit.beta, top_risk, "top-event fragility");
    Ok(Approach2 {
        hazard: hazard.clone(),
        top_fragility,
        fit,
        bin_risk,
        bin_risk_mod,
        top_risk,
    })
}

#[instrument(level = "debug", skip_all)]
fn approach_1(
    tree: &FaultTree,
    env: &ProbabilityEnv,
    events: &[ResolvedEvent],
    options: &AnalysisOptions,
) -> DomainResult<Approach1> {
    let cut_sets = tree.mocus();
    let probabilities = cut_set_probabilities(cut_sets, env)?;

    let ub = upper_bound(cut_sets, env)?;
    let rare = rare_event(cut_sets, env)?;
    let min_max = exact(cut_sets, env, options.max_exact_cut_sets)?;
    let importance = cut_set_importance(&probabilities, &ub)?;

    let cut_set_results = cut_sets
        .iter()
        .zip(probabilities)
        .zip(importance)
        .map(|((cs, probability), importance)| CutSetResult {
            events: cs.names(tree.arena()).iter().map(|s| s.to_string()).collect(),
            probability,
            importance,
        })
        .collect();

    let event_results = events
        .iter()
        .map(|event| {
            let im = basic_event_importance(cut_sets, env, event.index, &ub)?;
            Ok(EventResult {
                name: event.name.clone(),
                probability: event.probability.point(),
                count: im.count,
                measures: im.measures,
            })
        })
        .collect::<DomainResult<Vec<_>>>()?;

    let estimate = |method, probability: Probability| TopEventEstimate {
        method,
        summary: summarise(&probability),
        probability,
    };
    Ok(Approach1 {
        cut_sets: cut_set_results,
        top_event: [
            estimate("MCS Upper Bound", ub),
            estimate("Rare Event", rare),
            estimate("Min Max", min_max),
        ],
        events: event_results,
    })
}

/// Loads inputs through the filesystem seam and runs the analysis.
pub struct QuantificationService {
    fs: Arc<dyn FileSystem>,
}

impl QuantificationService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    fn read(&self, path: &Path, what: &str) -> ApplicationResult<String> {
        if !self.fs.exists(path) {
            return Err(DomainError::NotFound(path.to_path_buf()).into());
        }
        if !self.fs.is_file(path) {
            return Err(DomainError::InvalidInput(format!(
                "{} input {} is not a file",
                what,
                path.display()
            ))
            .into());
        }
        self.fs
            .read_to_string(path)
            .with_path_context(&format!("read {}", what), path)
    }

    pub fn load_tree(&self, logic: &Path) -> ApplicationResult<FaultTree> {
        let content = self.read(logic, "fault tree logic")?;
        let rows = parse_logic(&content, logic)?;
        Ok(FaultTreeBuilder::new().build_from_rows(rows)?)
    }

    pub fn load_basic_events(&self, path: &Path) -> ApplicationResult<Vec<BasicEventInput>> {
        let content = self.read(path, "basic events")?;
        Ok(parse_basic_events(&content, path)?)
    }

    pub fn load_hazard(&self, path: &Path) -> ApplicationResult<HazardCurve> {
        let content = self.read(path, "hazard curve")?;
        Ok(parse_hazard(&content, path)?)
    }

    /// Read the input files and run the analysis.
    #[instrument(level = "debug", skip(self, options))]
    pub fn run(
        &self,
        name: &str,
        logic: &Path,
        basic_events: &Path,
        hazard: Option<&Path>,
        mut options: AnalysisOptions,
    ) -> ApplicationResult<Quantification> {
        let tree = self.load_tree(logic)?;
        let events = self.load_basic_events(basic_events)?;
        if let Some(path) = hazard {
            if options.analysis != AnalysisMode::Fragility {
                warn!(hazard = %path.display(), "hazard curve is ignored for risk analysis");
            }
            options.hazard = Some(self.load_hazard(path)?);
        }
        Quantification::compute(name, tree, events, options).map_err(ApplicationError::from)
    }
}
