//! Top-event probability from minimal cut sets.
//!
//! Three estimates: the exact min-max (inclusion-exclusion) value, the rare-event sum and
//! the MCS upper bound. The exact value enumerates all `2^n - 1` cut-set combinations, so
//! it is guarded by a cut-set limit.

use generational_arena::Index;
use itertools::Itertools;
use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::mocus::CutSet;
use crate::domain::probability::{combine, sum, Gate, Probability, ProbabilityLookup};

/// Cut-set count from which the exact calculation logs a warning.
pub const WARN_CUT_SETS: usize = 15;
/// Default cut-set count above which the exact calculation is refused.
pub const DEFAULT_MAX_CUT_SETS: usize = 20;

/// AND-probability of a group of basic events.
pub fn joint_probability<L>(events: &[Index], env: &L) -> DomainResult<Probability>
where
    L: ProbabilityLookup + ?Sized,
{
    let probabilities = events
        .iter()
        .map(|&e| {
            env.lookup(e).ok_or_else(|| {
                DomainError::InvalidInput(format!("basic event {:?} has no probability", e))
            })
        })
        .collect::<DomainResult<Vec<_>>>()?;
    combine(probabilities, Gate::And)
}

pub fn cut_set_probabilities<L>(cut_sets: &[CutSet], env: &L) -> DomainResult<Vec<Probability>>
where
    L: ProbabilityLookup + ?Sized,
{
    cut_sets
        .iter()
        .map(|cs| joint_probability(cs.events(), env))
        .collect()
}

/// MCS upper bound: `1 - Π(1 - P(cut set))`.
pub fn upper_bound<L>(cut_sets: &[CutSet], env: &L) -> DomainResult<Probability>
where
    L: ProbabilityLookup + ?Sized,
{
    if cut_sets.is_empty() {
        return Ok(Probability::PointEstimate(0.0));
    }
    let probabilities = cut_set_probabilities(cut_sets, env)?;
    combine(&probabilities, Gate::Or)
}

/// Rare-event approximation: sum of cut-set probabilities.
pub fn rare_event<L>(cut_sets: &[CutSet], env: &L) -> DomainResult<Probability>
where
    L: ProbabilityLookup + ?Sized,
{
    let probabilities = cut_set_probabilities(cut_sets, env)?;
    sum(&probabilities)
}

/// Exact top-event probability by inclusion-exclusion.
///
/// Each combination of cut sets contributes the joint probability of the union of its
/// events, added for odd and subtracted for even combination sizes.
#[instrument(level = "debug", skip(cut_sets, env), fields(cut_sets = cut_sets.len()))]
pub fn exact<L>(cut_sets: &[CutSet], env: &L, max_cut_sets: usize) -> DomainResult<Probability>
where
    L: ProbabilityLookup + Sync + ?Sized,
{
    let n = cut_sets.len();
    if n > max_cut_sets {
        return Err(DomainError::TooManyCutSets {
            count: n,
            limit: max_cut_sets,
        });
    }
    if n > WARN_CUT_SETS {
        warn!(
            cut_sets = n,
            combinations = 2f64.powi(n as i32) - 1.0,
            "exact calculation over many cut sets, this may take a while"
        );
    }

    let mut total = Probability::PointEstimate(0.0);
    for k in 1..=n {
        let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
        let combos: Vec<Vec<usize>> = (0..n).combinations(k).collect();
        let terms = combos
            .par_iter()
            .map(|combo| {
                let events = union_events(combo.iter().map(|&i| &cut_sets[i]));
                joint_probability(&events, env)
            })
            .collect::<DomainResult<Vec<_>>>()?;
        // Summed in combination order so repeated runs agree bit for bit
        let level = terms
            .iter()
            .try_fold(Probability::PointEstimate(0.0), |acc, term| {
                acc.zip_with(term, |x, y| x + y)
            })?;
        total = total.zip_with(&level, |t, l| t + sign * l)?;
        debug!(k, "combination level done");
    }
    Ok(total)
}

fn union_events<'a>(cut_sets: impl Iterator<Item = &'a CutSet>) -> Vec<Index> {
    let mut events: Vec<Index> = Vec::new();
    for cs in cut_sets {
        for &e in cs.events() {
            if !events.contains(&e) {
                events.push(e);
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::probability::ProbabilityEnv;
    use approx::assert_relative_eq;
    use generational_arena::Arena;

    fn setup(values: &[f64]) -> (Vec<Index>, ProbabilityEnv) {
        let mut arena: Arena<()> = Arena::new();
        let mut env = ProbabilityEnv::new();
        let idx: Vec<Index> = values
            .iter()
            .map(|&p| {
                let i = arena.insert(());
                env.insert(i, Probability::PointEstimate(p));
                i
            })
            .collect();
        (idx, env)
    }

    #[test]
    fn given_overlapping_cut_sets_when_exact_then_inclusion_exclusion() {
        let (e, env) = setup(&[0.1, 0.2, 0.3]);
        // {A,B} or {B,C}: P = ab + bc - abc
        let sets = vec![CutSet::new(vec![e[0], e[1]]), CutSet::new(vec![e[1], e[2]])];

        let p = exact(&sets, &env, DEFAULT_MAX_CUT_SETS).unwrap();

        assert_relative_eq!(p.point(), 0.02 + 0.06 - 0.006, epsilon = 1e-15);
    }

    #[test]
    fn given_disjoint_cut_sets_then_upper_bound_equals_exact() {
        let (e, env) = setup(&[0.1, 0.2, 0.3]);
        let sets: Vec<CutSet> = e.iter().map(|&i| CutSet::new(vec![i])).collect();

        let ub = upper_bound(&sets, &env).unwrap().point();
        let ex = exact(&sets, &env, DEFAULT_MAX_CUT_SETS).unwrap().point();
        let rare = rare_event(&sets, &env).unwrap().point();

        assert_relative_eq!(ub, ex, epsilon = 1e-12);
        assert_relative_eq!(rare, 0.6, epsilon = 1e-12);
        assert!(rare >= ex);
    }

    #[test]
    fn given_same_input_when_exact_repeatedly_then_bitwise_identical() {
        let (e, env) = setup(&[0.11, 0.23, 0.37, 0.41, 0.53, 0.67]);
        let sets: Vec<CutSet> = (0..e.len())
            .map(|i| CutSet::new(vec![e[i], e[(i + 1) % e.len()]]))
            .collect();

        let first = exact(&sets, &env, DEFAULT_MAX_CUT_SETS).unwrap().point();
        for _ in 0..10 {
            let again = exact(&sets, &env, DEFAULT_MAX_CUT_SETS).unwrap().point();
            assert_eq!(first.to_bits(), again.to_bits());
        }
    }

    #[test]
    fn given_too_many_cut_sets_when_exact_then_errors() {
        let (e, env) = setup(&[0.1, 0.2, 0.3]);
        let sets: Vec<CutSet> = e.iter().map(|&i| CutSet::new(vec![i])).collect();
        assert_eq!(
            exact(&sets, &env, 2).unwrap_err(),
            DomainError::TooManyCutSets { count: 3, limit: 2 }
        );
    }

    #[test]
    fn given_no_cut_sets_then_zero() {
        let (_, env) = setup(&[]);
        assert_eq!(exact(&[], &env, 20).unwrap(), Probability::PointEstimate(0.0));
        assert_eq!(upper_bound(&[], &env).unwrap(), Probability::PointEstimate(0.0));
    }

    #[test]
    fn given_binned_probabilities_when_exact_then_per_bin() {
        let mut arena: Arena<()> = Arena::new();
        let (a, b) = (arena.insert(()), arena.insert(()));
        let mut env = ProbabilityEnv::new();
        env.insert(a, Probability::Binned(vec![0.1, 0.5]));
        env.insert(b, Probability::Binned(vec![0.2, 0.5]));
        let sets = vec![CutSet::new(vec![a]), CutSet::new(vec![b])];

        let p = exact(&sets, &env, 20).unwrap();

        let values = p.values();
        assert_relative_eq!(values[0], 0.1 + 0.2 - 0.02, epsilon = 1e-12);
        assert_relative_eq!(values[1], 0.75, epsilon = 1e-12);
    }

    #[test]
    fn given_missing_probability_then_invalid_input() {
        let mut arena: Arena<()> = Arena::new();
        let a = arena.insert(());
        let env = ProbabilityEnv::new();
        assert!(matches!(
            upper_bound(&[CutSet::new(vec![a])], &env),
            Err(DomainError::InvalidInput(_))
        ));
    }
}
