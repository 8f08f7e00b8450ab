//! Event nodes: basic events and AND/OR gates of a fault tree.

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use generational_arena::Index;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::fit::normal_cdf;
use crate::domain::probability::{Gate, Probability};

impl FromStr for Gate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Gate::And),
            "OR" => Ok(Gate::Or),
            other => Err(DomainError::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::And => write!(f, "AND"),
            Gate::Or => write!(f, "OR"),
        }
    }
}

/// Interpretation of basic-event inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Basic events carry fragility curves convolved with a hazard curve
    Fragility,
    /// Basic events carry risk values (probability or frequency)
    #[default]
    Risk,
}

impl FromStr for AnalysisMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fragility" => Ok(AnalysisMode::Fragility),
            "risk" => Ok(AnalysisMode::Risk),
            other => Err(DomainError::InvalidInput(format!(
                "analysis type '{}' should be either fragility or risk",
                other
            ))),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Fragility => write!(f, "fragility"),
            AnalysisMode::Risk => write!(f, "risk"),
        }
    }
}

/// Probability distribution of a basic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    /// `PE`: a single probability
    PointEstimate,
    /// `NORM`: mean and standard deviation of a risk value
    Normal,
    /// `LNORM`: median and dispersion of a fragility curve
    LogNormal,
}

impl Distribution {
    /// Number of parameters the distribution takes.
    pub fn arity(&self) -> usize {
        match self {
            Distribution::PointEstimate => 1,
            Distribution::Normal | Distribution::LogNormal => 2,
        }
    }

    pub fn supports(&self, mode: AnalysisMode) -> bool {
        match mode {
            AnalysisMode::Fragility => {
                matches!(self, Distribution::LogNormal | Distribution::PointEstimate)
            }
            AnalysisMode::Risk => matches!(self, Distribution::PointEstimate | Distribution::Normal),
        }
    }
}

impl FromStr for Distribution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PE" => Ok(Distribution::PointEstimate),
            "NORM" => Ok(Distribution::Normal),
            "LNORM" => Ok(Distribution::LogNormal),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::PointEstimate => write!(f, "PE"),
            Distribution::Normal => write!(f, "NORM"),
            Distribution::LogNormal => write!(f, "LNORM"),
        }
    }
}

/// Monte Carlo settings for basic-event sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sampling {
    pub uncertainty: bool,
    pub nsamp: usize,
    pub seed: Option<u64>,
}

impl Sampling {
    pub fn deterministic() -> Self {
        Self {
            uncertainty: false,
            nsamp: 1,
            seed: None,
        }
    }

    pub fn monte_carlo(nsamp: usize, seed: Option<u64>) -> Self {
        Self {
            uncertainty: true,
            nsamp,
            seed,
        }
    }

    /// Settings for the `stream`-th sampled event.
    ///
    /// Each stream gets its own seed derived from the base seed, so events drawn with the
    /// same settings are independent yet a seeded run stays reproducible.
    pub fn for_stream(&self, stream: u64) -> Self {
        Self {
            seed: self.seed.map(|seed| seed.wrapping_add(stream)),
            ..*self
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Node of a fault tree.
///
/// A node without operator is a basic event and may carry a distribution and probability;
/// a node with an operator is a gate and may have children. Both invariants are checked on
/// every mutation.
#[derive(Debug, Clone)]
pub struct EventNode {
    name: String,
    operator: Option<Gate>,
    children: Vec<Index>,
    distribution: Option<Distribution>,
    probability: Option<Probability>,
}

impl EventNode {
    pub fn new(name: &str, operator: Option<Gate>) -> Self {
        Self {
            name: name.to_string(),
            operator,
            children: Vec::new(),
            distribution: None,
            probability: None,
        }
    }

    pub fn basic(name: &str) -> Self {
        Self::new(name, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operator(&self) -> Option<Gate> {
        self.operator
    }

    pub fn children(&self) -> &[Index] {
        &self.children
    }

    pub fn distribution(&self) -> Option<Distribution> {
        self.distribution
    }

    pub fn probability(&self) -> Option<&Probability> {
        self.probability.as_ref()
    }

    pub fn is_basic(&self) -> bool {
        self.operator.is_none()
    }

    pub fn set_operator(&mut self, operator: Option<Gate>) -> DomainResult<()> {
        if operator.is_none() && !self.children.is_empty() {
            return Err(DomainError::invariant(
                &self.name,
                "operator can not be removed because the event has children",
            ));
        }
        if operator.is_some() && (self.distribution.is_some() || self.probability.is_some()) {
            return Err(DomainError::invariant(
                &self.name,
                "a basic event with a distribution can not become a gate",
            ));
        }
        self.operator = operator;
        Ok(())
    }

    pub fn set_children(&mut self, children: Vec<Index>) -> DomainResult<()> {
        if self.is_basic() {
            return Err(DomainError::invariant(
                &self.name,
                "a basic event can not have children",
            ));
        }
        self.children = children;
        Ok(())
    }

    pub(crate) fn push_child(&mut self, child: Index) -> DomainResult<()> {
        if self.is_basic() {
            return Err(DomainError::invariant(
                &self.name,
                "a basic event can not have children",
            ));
        }
        self.children.push(child);
        Ok(())
    }

    pub fn set_distribution(
        &mut self,
        distribution: Distribution,
        mode: AnalysisMode,
    ) -> DomainResult<()> {
        if !self.is_basic() {
            return Err(DomainError::invariant(
                &self.name,
                "a gate can not have a distribution",
            ));
        }
        if !distribution.supports(mode) {
            return Err(DomainError::UnsupportedDistribution {
                event: self.name.clone(),
                distribution: distribution.to_string(),
                mode: mode.to_string(),
            });
        }
        self.distribution = Some(distribution);
        Ok(())
    }

    /// Compute and store the probability from distribution parameters.
    ///
    /// `im` holds the intensity-measure bin midpoints and is only used in fragility mode.
    pub fn set_probability(
        &mut self,
        params: &[f64],
        mode: AnalysisMode,
        im: &[f64],
        sampling: &Sampling,
    ) -> DomainResult<()> {
        let distribution = self.distribution.ok_or_else(|| {
            DomainError::invariant(&self.name, "distribution must be set before probability")
        })?;
        if params.len() != distribution.arity() {
            return Err(DomainError::ShapeMismatch {
                event: self.name.clone(),
                expected: distribution.arity(),
                actual: params.len(),
            });
        }
        if distribution == Distribution::PointEstimate && !(0.0..=1.0).contains(&params[0]) {
            return Err(DomainError::RangeError(format!(
                "point estimate of '{}' should be between 0 and 1, got {}",
                self.name, params[0]
            )));
        }
        if distribution == Distribution::Normal && !(params[1].is_finite() && params[1] >= 0.0) {
            return Err(DomainError::RangeError(format!(
                "standard deviation of '{}' must be non-negative, got {}",
                self.name, params[1]
            )));
        }

        let probability = match mode {
            AnalysisMode::Fragility => {
                if sampling.uncertainty {
                    return Err(DomainError::InvalidInput(
                        "uncertainty is not available for fragility analysis".to_string(),
                    ));
                }
                match distribution {
                    Distribution::LogNormal => {
                        let (median, beta) = (params[0], params[1]);
                        if median <= 0.0 || beta <= 0.0 {
                            return Err(DomainError::RangeError(format!(
                                "median and dispersion of '{}' must be positive",
                                self.name
                            )));
                        }
                        Probability::Binned(
                            im.iter()
                                .map(|x| normal_cdf((x / median).ln() / beta))
                                .collect(),
                        )
                    }
                    _ => Probability::Binned(vec![params[0]; im.len()]),
                }
            }
            AnalysisMode::Risk => match distribution {
                Distribution::Normal => self.normal_risk(params[0], params[1], sampling)?,
                _ => {
                    let p = params[0];
                    if sampling.uncertainty {
                        Probability::Sampled {
                            point: p,
                            samples: vec![p; sampling.nsamp],
                        }
                    } else {
                        Probability::PointEstimate(p)
                    }
                }
            },
        };
        self.probability = Some(probability);
        Ok(())
    }

    fn normal_risk(&self, mean: f64, sd: f64, sampling: &Sampling) -> DomainResult<Probability> {
        let point = mean.clamp(0.0, 1.0);
        if !sampling.uncertainty {
            return Ok(Probability::PointEstimate(point));
        }
        let normal = Normal::new(mean, sd).map_err(|e| {
            DomainError::RangeError(format!("standard deviation of '{}': {}", self.name, e))
        })?;
        let mut rng = sampling.rng();
        let samples = (0..sampling.nsamp)
            .map(|_| normal.sample(&mut rng).clamp(0.0, 1.0))
            .collect();
        Ok(Probability::Sampled { point, samples })
    }

    /// Replace the probability with a convolved point-estimate risk.
    pub(crate) fn set_point_risk(&mut self, risk: f64) {
        self.distribution = Some(Distribution::PointEstimate);
        self.probability = Some(Probability::PointEstimate(risk));
    }

    /// Compare by name against an event or a string; other types are rejected.
    pub fn compare(&self, other: &dyn Any) -> DomainResult<bool> {
        if let Some(node) = other.downcast_ref::<EventNode>() {
            Ok(self.name == node.name)
        } else if let Some(name) = other.downcast_ref::<String>() {
            Ok(&self.name == name)
        } else if let Some(name) = other.downcast_ref::<&str>() {
            Ok(self.name == *name)
        } else {
            Err(DomainError::InvalidComparison(format!("{:?}", other.type_id())))
        }
    }
}

impl PartialEq for EventNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EventNode {}

impl PartialEq<str> for EventNode {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl PartialEq<&str> for EventNode {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

impl fmt::Display for EventNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Some(gate) => write!(f, "{} (Operator: {})", self.name, gate),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use generational_arena::Arena;

    fn child_index() -> Index {
        let mut arena = Arena::new();
        arena.insert(EventNode::basic("child"))
    }

    #[test]
    fn given_gate_with_children_when_removing_operator_then_errors() {
        let mut node = EventNode::new("G", Some(Gate::And));
        node.set_children(vec![child_index()]).unwrap();
        let err = node.set_operator(None).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation { .. }));
    }

    #[test]
    fn given_basic_event_when_setting_children_then_errors() {
        let mut node = EventNode::basic("B");
        assert!(matches!(
            node.set_children(vec![child_index()]),
            Err(DomainError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn given_unknown_gate_when_parsing_then_invalid_operator() {
        assert_eq!(
            "XOR".parse::<Gate>(),
            Err(DomainError::InvalidOperator("XOR".to_string()))
        );
        assert_eq!(" and ".parse::<Gate>(), Ok(Gate::And));
    }

    #[test]
    fn given_gate_when_setting_distribution_then_errors() {
        let mut node = EventNode::new("G", Some(Gate::Or));
        assert!(matches!(
            node.set_distribution(Distribution::PointEstimate, AnalysisMode::Risk),
            Err(DomainError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn given_lognormal_in_risk_mode_when_setting_distribution_then_unsupported() {
        let mut node = EventNode::basic("B");
        assert!(matches!(
            node.set_distribution(Distribution::LogNormal, AnalysisMode::Risk),
            Err(DomainError::UnsupportedDistribution { .. })
        ));
        assert!(matches!(
            node.set_distribution(Distribution::Normal, AnalysisMode::Fragility),
            Err(DomainError::UnsupportedDistribution { .. })
        ));
    }

    #[test]
    fn given_point_estimate_when_setting_probability_then_two_position_vector() {
        let mut node = EventNode::basic("B");
        node.set_distribution(Distribution::PointEstimate, AnalysisMode::Risk)
            .unwrap();
        node.set_probability(&[0.25], AnalysisMode::Risk, &[], &Sampling::deterministic())
            .unwrap();
        assert_eq!(node.probability().unwrap().values(), vec![0.25, 0.25]);
    }

    #[test]
    fn given_point_estimate_with_uncertainty_then_repeats_value() {
        let mut node = EventNode::basic("B");
        node.set_distribution(Distribution::PointEstimate, AnalysisMode::Risk)
            .unwrap();
        node.set_probability(&[0.25], AnalysisMode::Risk, &[], &Sampling::monte_carlo(3, None))
            .unwrap();
        assert_eq!(node.probability().unwrap().values(), vec![0.25; 4]);
    }

    #[test]
    fn given_point_estimate_out_of_range_then_range_error() {
        let mut node = EventNode::basic("B");
        node.set_distribution(Distribution::PointEstimate, AnalysisMode::Risk)
            .unwrap();
        let err = node
            .set_probability(&[1.5], AnalysisMode::Risk, &[], &Sampling::deterministic())
            .unwrap_err();
        assert!(matches!(err, DomainError::RangeError(_)));
    }

    #[test]
    fn given_wrong_parameter_count_then_shape_mismatch() {
        let mut node = EventNode::basic("B");
        node.set_distribution(Distribution::Normal, AnalysisMode::Risk)
            .unwrap();
        let err = node
            .set_probability(&[0.1], AnalysisMode::Risk, &[], &Sampling::deterministic())
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::ShapeMismatch {
                event: "B".to_string(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn given_normal_without_uncertainty_then_clipped_mean() {
        let mut node = EventNode::basic("B");
        node.set_distribution(Distribution::Normal, AnalysisMode::Risk)
            .unwrap();
        node.set_probability(&[-0.2, 0.1], AnalysisMode::Risk, &[], &Sampling::deterministic())
            .unwrap();
        assert_eq!(node.probability(), Some(&Probability::PointEstimate(0.0)));
    }

    #[test]
    fn given_normal_with_seed_then_samples_reproducible_and_clipped() {
        let sample = || {
            let mut node = EventNode::basic("B");
            node.set_distribution(Distribution::Normal, AnalysisMode::Risk)
                .unwrap();
            node.set_probability(
                &[0.5, 0.5],
                AnalysisMode::Risk,
                &[],
                &Sampling::monte_carlo(200, Some(42)),
            )
            .unwrap();
            node.probability().unwrap().clone()
        };
        let first = sample();
        assert_eq!(first, sample());
        let values = first.values();
        assert_eq!(values.len(), 201);
        assert_eq!(values[0], 0.5);
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn given_two_streams_of_one_seed_then_events_sample_differently() {
        // Arrange
        let base = Sampling::monte_carlo(50, Some(7));
        let draw = |sampling: Sampling| {
            let mut node = EventNode::basic("B1");
            node.set_distribution(Distribution::Normal, AnalysisMode::Risk)
                .unwrap();
            node.set_probability(&[0.5, 0.1], AnalysisMode::Risk, &[], &sampling)
                .unwrap();
            node.probability().unwrap().clone()
        };

        // Act
        let first = draw(base.for_stream(0));
        let second = draw(base.for_stream(1));

        // Assert
        assert_ne!(first, second);
        assert_eq!(first, draw(base.for_stream(0)));
        assert_eq!(Sampling::deterministic().for_stream(3).seed, None);
    }

    #[test]
    fn given_lognormal_fragility_then_cdf_per_bin() {
        let mut node = EventNode::basic("C1");
        node.set_distribution(Distribution::LogNormal, AnalysisMode::Fragility)
            .unwrap();
        node.set_probability(
            &[1.0, 0.5],
            AnalysisMode::Fragility,
            &[0.5, 1.0, 2.0],
            &Sampling::deterministic(),
        )
        .unwrap();
        let values = node.probability().unwrap().values();
        assert_eq!(values.len(), 3);
        assert_relative_eq!(values[1], 0.5, epsilon = 1e-7);
        assert_relative_eq!(values[0] + values[2], 1.0, epsilon = 1e-7);
    }

    #[test]
    fn given_fragility_with_uncertainty_then_invalid_input() {
        let mut node = EventNode::basic("C1");
        node.set_distribution(Distribution::LogNormal, AnalysisMode::Fragility)
            .unwrap();
        assert!(matches!(
            node.set_probability(
                &[1.0, 0.5],
                AnalysisMode::Fragility,
                &[1.0],
                &Sampling::monte_carlo(10, None)
            ),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn given_nodes_when_comparing_then_by_name() {
        let a = EventNode::new("TOP", Some(Gate::And));
        let b = EventNode::basic("TOP");
        assert_eq!(a, b);
        assert!(a == "TOP");
        assert!(a.compare(&"TOP".to_string()).unwrap());
        assert!(!a.compare(&EventNode::basic("B1")).unwrap());
        assert!(matches!(
            a.compare(&42_i32),
            Err(DomainError::InvalidComparison(_))
        ));
    }
}
