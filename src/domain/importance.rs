//! Basic-event and cut-set importance measures.
//!
//! With `F` the MCS upper bound of the top event, `F1`/`F0` the upper bound with the event
//! forced to 1/0, and `Fi` the upper bound over the cut sets containing the event:
//!
//! | measure | formula |
//! |---|---|
//! | Fussell-Vesely | `Fi / F` |
//! | Risk Reduction Ratio | `F / F0` |
//! | Risk Increase Ratio | `F1 / F` |
//! | Risk Reduction Interval | `F - F0` |
//! | Risk Increase Interval | `F1 - F` |
//! | Birnbaum | `F1 - F0` |

use generational_arena::Index;
use serde::Serialize;
use tracing::{instrument, trace};

use crate::domain::error::DomainResult;
use crate::domain::minmax::upper_bound;
use crate::domain::mocus::CutSet;
use crate::domain::probability::{Probability, ProbabilityEnv};
use crate::domain::stats::{guarded_div, Summary};

/// Summaries of the six importance measures of one basic event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImportanceMeasures {
    pub fv: Summary,
    pub rrr: Summary,
    pub rir: Summary,
    pub rri: Summary,
    pub rii: Summary,
    pub bi: Summary,
}

impl ImportanceMeasures {
    pub const NAMES: [&'static str; 6] = ["FV", "RRR", "RIR", "RRI", "RII", "BI"];

    /// Sentinel for events that appear in no minimal cut set.
    pub fn zero() -> Self {
        Self {
            fv: Summary::zero(),
            rrr: Summary::zero(),
            rir: Summary::zero(),
            rri: Summary::zero(),
            rii: Summary::zero(),
            bi: Summary::zero(),
        }
    }

    /// Measures in [`Self::NAMES`] order.
    pub fn as_array(&self) -> [&Summary; 6] {
        [&self.fv, &self.rrr, &self.rir, &self.rri, &self.rii, &self.bi]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BasicEventImportance {
    /// Number of minimal cut sets containing the event
    pub count: usize,
    pub measures: ImportanceMeasures,
}

/// Importance of one basic event relative to the top-event upper bound `top`.
///
/// `event` is `None` for events that are not part of the tree; they get the zero sentinel.
#[instrument(level = "trace", skip(cut_sets, env, top))]
pub fn basic_event_importance(
    cut_sets: &[CutSet],
    env: &ProbabilityEnv,
    event: Option<Index>,
    top: &Probability,
) -> DomainResult<BasicEventImportance> {
    let event = match event {
        Some(event) => event,
        None => {
            return Ok(BasicEventImportance {
                count: 0,
                measures: ImportanceMeasures::zero(),
            })
        }
    };
    let containing: Vec<CutSet> = cut_sets
        .iter()
        .filter(|cs| cs.contains(event))
        .cloned()
        .collect();
    let count = containing.len();
    if count == 0 {
        return Ok(BasicEventImportance {
            count,
            measures: ImportanceMeasures::zero(),
        });
    }

    let f1 = upper_bound(cut_sets, &env.with_override(event, 1.0))?;
    let f0 = upper_bound(cut_sets, &env.with_override(event, 0.0))?;
    let fi = upper_bound(&containing, env)?;
    trace!(count, f1 = f1.point(), f0 = f0.point(), fi = fi.point(), "event bounds");

    let measures = ImportanceMeasures {
        fv: summarise(&fi.zip_with(top, guarded_div)?),
        rrr: summarise(&top.zip_with(&f0, guarded_div)?),
        rir: summarise(&f1.zip_with(top, guarded_div)?),
        rri: summarise(&top.zip_with(&f0, |f, f0| f - f0)?),
        rii: summarise(&f1.zip_with(top, |f1, f| f1 - f)?),
        bi: summarise(&f1.zip_with(&f0, |f1, f0| f1 - f0)?),
    };
    Ok(BasicEventImportance { count, measures })
}

/// Share of the top-event upper bound carried by each cut set, in percent.
pub fn cut_set_importance(
    cut_set_probabilities: &[Probability],
    top: &Probability,
) -> DomainResult<Vec<Probability>> {
    cut_set_probabilities
        .iter()
        .map(|p| p.zip_with(top, |x, f| 100.0 * guarded_div(x, f)))
        .collect()
}

pub fn summarise(p: &Probability) -> Summary {
    Summary::new(p.point(), &p.spread())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use generational_arena::Arena;

    fn setup() -> (Vec<Index>, Vec<CutSet>, ProbabilityEnv) {
        // TOP = A OR (B AND C)
        let mut arena: Arena<()> = Arena::new();
        let idx: Vec<Index> = (0..4).map(|_| arena.insert(())).collect();
        let mut env = ProbabilityEnv::new();
        env.insert(idx[0], Probability::PointEstimate(0.1));
        env.insert(idx[1], Probability::PointEstimate(0.2));
        env.insert(idx[2], Probability::PointEstimate(0.5));
        env.insert(idx[3], Probability::PointEstimate(0.3));
        let sets = vec![CutSet::new(vec![idx[0]]), CutSet::new(vec![idx[1], idx[2]])];
        (idx, sets, env)
    }

    #[test]
    fn given_event_when_computing_importance_then_standard_definitions() {
        let (idx, sets, env) = setup();
        let top = upper_bound(&sets, &env).unwrap();
        let f = 1.0 - 0.9 * 0.9;

        let im = basic_event_importance(&sets, &env, Some(idx[0]), &top).unwrap();

        assert_eq!(im.count, 1);
        assert_relative_eq!(im.measures.fv.point, 0.1 / f, epsilon = 1e-12);
        assert_relative_eq!(im.measures.rrr.point, f / 0.1, epsilon = 1e-12);
        assert_relative_eq!(im.measures.rir.point, 1.0 / f, epsilon = 1e-12);
        assert_relative_eq!(im.measures.rri.point, f - 0.1, epsilon = 1e-12);
        assert_relative_eq!(im.measures.rii.point, 1.0 - f, epsilon = 1e-12);
        assert_relative_eq!(im.measures.bi.point, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn given_event_outside_cut_sets_then_zero_sentinel() {
        let (idx, sets, env) = setup();
        let top = upper_bound(&sets, &env).unwrap();

        let im = basic_event_importance(&sets, &env, Some(idx[3]), &top).unwrap();

        assert_eq!(im.count, 0);
        assert_eq!(im.measures, ImportanceMeasures::zero());
        let detached = basic_event_importance(&sets, &env, None, &top).unwrap();
        assert_eq!(detached.measures, ImportanceMeasures::zero());
    }

    #[test]
    fn given_sweep_when_repeated_then_identical_and_env_untouched() {
        let (idx, sets, env) = setup();
        let top = upper_bound(&sets, &env).unwrap();

        let first: Vec<_> = idx
            .iter()
            .map(|&e| basic_event_importance(&sets, &env, Some(e), &top).unwrap())
            .collect();
        let second: Vec<_> = idx
            .iter()
            .map(|&e| basic_event_importance(&sets, &env, Some(e), &top).unwrap())
            .collect();

        assert_eq!(first, second);
        assert_eq!(env.get(idx[0]), Some(&Probability::PointEstimate(0.1)));
    }

    #[test]
    fn given_zero_top_when_ratio_then_nan_not_panic() {
        let (idx, sets, mut env) = setup();
        env.insert(idx[0], Probability::PointEstimate(0.0));
        env.insert(idx[1], Probability::PointEstimate(0.0));
        let top = upper_bound(&sets, &env).unwrap();

        let im = basic_event_importance(&sets, &env, Some(idx[0]), &top).unwrap();

        assert!(im.measures.fv.point.is_nan());
        assert!(im.measures.rir.point.is_nan());
        assert_eq!(im.measures.bi.point, 1.0);
    }

    #[test]
    fn given_cut_set_probabilities_then_percent_of_top() {
        let top = Probability::PointEstimate(0.2);
        let cs = vec![Probability::PointEstimate(0.1), Probability::PointEstimate(0.05)];
        let im = cut_set_importance(&cs, &top).unwrap();
        assert_relative_eq!(im[0].point(), 50.0);
        assert_relative_eq!(im[1].point(), 25.0);
    }
}
