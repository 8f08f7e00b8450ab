//! Probability values and their propagation through AND/OR gates.
//!
//! A basic event's probability is one of three shapes: a deterministic point estimate,
//! a Monte Carlo sample set (point estimate plus samples), or a fragility curve with one
//! value per intensity-measure bin. Gate combination is elementwise; a point estimate
//! broadcasts against any other shape.

use std::collections::HashMap;

use generational_arena::Index;

use crate::domain::error::{DomainError, DomainResult};

/// Gate used to combine probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    And,
    Or,
}

/// Probability of a basic event, cut set or top event.
#[derive(Debug, Clone, PartialEq)]
pub enum Probability {
    /// Deterministic value
    PointEstimate(f64),
    /// Point estimate followed by Monte Carlo samples
    Sampled { point: f64, samples: Vec<f64> },
    /// One value per intensity-measure bin
    Binned(Vec<f64>),
}

impl Probability {
    /// Constant probability with the same shape as `self`.
    pub fn constant_like(&self, value: f64) -> Self {
        match self {
            Probability::PointEstimate(_) => Probability::PointEstimate(value),
            Probability::Sampled { samples, .. } => Probability::Sampled {
                point: value,
                samples: vec![value; samples.len()],
            },
            Probability::Binned(values) => Probability::Binned(vec![value; values.len()]),
        }
    }

    /// Flat vector view.
    ///
    /// A point estimate is exposed as `[p, p]` so every basic event has at least two
    /// positions; a sample set as `[point, s1, .., sN]`.
    pub fn values(&self) -> Vec<f64> {
        match self {
            Probability::PointEstimate(p) => vec![*p, *p],
            Probability::Sampled { point, samples } => {
                let mut out = Vec::with_capacity(samples.len() + 1);
                out.push(*point);
                out.extend_from_slice(samples);
                out
            }
            Probability::Binned(values) => values.clone(),
        }
    }

    /// The point estimate (first position of the flat view).
    pub fn point(&self) -> f64 {
        match self {
            Probability::PointEstimate(p) => *p,
            Probability::Sampled { point, .. } => *point,
            Probability::Binned(values) => values.first().copied().unwrap_or(0.0),
        }
    }

    /// Values that describe the uncertainty around the point estimate.
    pub fn spread(&self) -> Vec<f64> {
        match self {
            Probability::PointEstimate(p) => vec![*p],
            Probability::Sampled { point, samples } => {
                if samples.is_empty() {
                    vec![*point]
                } else {
                    samples.clone()
                }
            }
            Probability::Binned(values) => values.clone(),
        }
    }

    /// Number of positions besides the point estimate (0 for point estimates).
    fn width(&self) -> Option<usize> {
        match self {
            Probability::PointEstimate(_) => None,
            Probability::Sampled { samples, .. } => Some(samples.len()),
            Probability::Binned(values) => Some(values.len()),
        }
    }

    /// Elementwise map preserving shape.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            Probability::PointEstimate(p) => Probability::PointEstimate(f(*p)),
            Probability::Sampled { point, samples } => Probability::Sampled {
                point: f(*point),
                samples: samples.iter().map(|&s| f(s)).collect(),
            },
            Probability::Binned(values) => Probability::Binned(values.iter().map(|&v| f(v)).collect()),
        }
    }

    /// Elementwise binary operation; a point estimate broadcasts.
    pub fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> DomainResult<Self> {
        use Probability::*;
        match (self, other) {
            (PointEstimate(a), PointEstimate(b)) => Ok(PointEstimate(f(*a, *b))),
            (PointEstimate(a), rhs) => Ok(rhs.map(|b| f(*a, b))),
            (lhs, PointEstimate(b)) => Ok(lhs.map(|a| f(a, *b))),
            (Sampled { point: pa, samples: sa }, Sampled { point: pb, samples: sb }) => {
                check_len(sa.len(), sb.len())?;
                Ok(Sampled {
                    point: f(*pa, *pb),
                    samples: sa.iter().zip(sb).map(|(&a, &b)| f(a, b)).collect(),
                })
            }
            (Binned(a), Binned(b)) => {
                check_len(a.len(), b.len())?;
                Ok(Binned(a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()))
            }
            (lhs, rhs) => Err(DomainError::InvalidInput(format!(
                "cannot combine {} with {}",
                lhs.kind(),
                rhs.kind()
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Probability::PointEstimate(_) => "point estimate",
            Probability::Sampled { .. } => "sampled distribution",
            Probability::Binned(_) => "binned curve",
        }
    }
}

fn check_len(left: usize, right: usize) -> DomainResult<()> {
    if left != right {
        return Err(DomainError::LengthMismatch { left, right });
    }
    Ok(())
}

/// Combine probabilities through a gate.
///
/// AND multiplies elementwise; OR applies the complement rule `1 - Π(1 - p)`.
/// Vectors of different length are rejected rather than truncated.
pub fn combine<'a, I>(inputs: I, gate: Gate) -> DomainResult<Probability>
where
    I: IntoIterator<Item = &'a Probability>,
{
    let mut iter = inputs.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| DomainError::InvalidInput("no probabilities to combine".to_string()))?;

    match gate {
        Gate::And => iter.try_fold(first.clone(), |acc, p| acc.zip_with(p, |a, b| a * b)),
        Gate::Or => {
            let survival = iter.try_fold(first.map(|p| 1.0 - p), |acc, p| {
                acc.zip_with(p, |a, b| a * (1.0 - b))
            })?;
            Ok(survival.map(|s| 1.0 - s))
        }
    }
}

/// Elementwise sum (rare-event approximation).
pub fn sum<'a, I>(inputs: I) -> DomainResult<Probability>
where
    I: IntoIterator<Item = &'a Probability>,
{
    let mut iter = inputs.into_iter();
    let first = match iter.next() {
        Some(p) => p.clone(),
        None => return Ok(Probability::PointEstimate(0.0)),
    };
    iter.try_fold(first, |acc, p| acc.zip_with(p, |a, b| a + b))
}

/// Basic-event probabilities of one analysis.
///
/// Evaluations under a forced value use [`ProbabilityEnv::with_override`], which leaves the
/// underlying environment untouched.
#[derive(Debug, Clone, Default)]
pub struct ProbabilityEnv {
    values: HashMap<Index, Probability>,
}

impl ProbabilityEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, event: Index, probability: Probability) {
        self.values.insert(event, probability);
    }

    pub fn get(&self, event: Index) -> Option<&Probability> {
        self.values.get(&event)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Common width of all stored probabilities, `None` if only point estimates.
    pub fn width(&self) -> DomainResult<Option<usize>> {
        let mut width = None;
        for p in self.values.values() {
            if let Some(w) = p.width() {
                match width {
                    None => width = Some(w),
                    Some(existing) => check_len(existing, w)?,
                }
            }
        }
        Ok(width)
    }

    /// View of this environment with one event forced to a constant.
    pub fn with_override(&self, event: Index, value: f64) -> Overlay<'_> {
        let forced = self
            .values
            .get(&event)
            .map(|p| p.constant_like(value))
            .unwrap_or(Probability::PointEstimate(value));
        Overlay {
            base: self,
            event,
            forced,
        }
    }
}

/// Read-only lookup of basic-event probabilities.
pub trait ProbabilityLookup {
    fn lookup(&self, event: Index) -> Option<&Probability>;
}

impl ProbabilityLookup for ProbabilityEnv {
    fn lookup(&self, event: Index) -> Option<&Probability> {
        self.get(event)
    }
}

/// An environment with a single event replaced.
pub struct Overlay<'a> {
    base: &'a ProbabilityEnv,
    event: Index,
    forced: Probability,
}

impl ProbabilityLookup for Overlay<'_> {
    fn lookup(&self, event: Index) -> Option<&Probability> {
        if event == self.event {
            Some(&self.forced)
        } else {
            self.base.get(event)
        }
    }
}
