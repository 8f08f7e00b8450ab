//! Bounds between the top-event estimates
//!
//! For any list of cut sets over independent basic events the rare-event sum and the MCS
//! upper bound never fall below the exact value, and the upper bound is exact precisely
//! when no two cut sets share an event.

use generational_arena::{Arena, Index};
use proptest::prelude::*;

use rsfta::domain::minmax::{exact, rare_event, upper_bound, DEFAULT_MAX_CUT_SETS};
use rsfta::domain::{CutSet, Probability, ProbabilityEnv};

const TOLERANCE: f64 = 1e-12;

/// Point probabilities for up to six basic events plus up to eight cut sets of one to
/// three of those events.
fn random_cut_sets() -> impl Strategy<Value = (Vec<f64>, Vec<Vec<usize>>)> {
    (2usize..=6).prop_flat_map(|nevents| {
        let events: Vec<usize> = (0..nevents).collect();
        (
            prop::collection::vec(0.1f64..0.9, nevents),
            prop::collection::vec(prop::sample::subsequence(events, 1..=nevents.min(3)), 1..=8),
        )
    })
}

fn setup(probabilities: &[f64], groups: &[Vec<usize>]) -> (Vec<CutSet>, ProbabilityEnv) {
    let mut arena: Arena<()> = Arena::new();
    let mut env = ProbabilityEnv::new();
    let events: Vec<Index> = probabilities
        .iter()
        .map(|&p| {
            let idx = arena.insert(());
            env.insert(idx, Probability::PointEstimate(p));
            idx
        })
        .collect();
    let cut_sets = groups
        .iter()
        .map(|group| CutSet::new(group.iter().map(|&i| events[i]).collect()))
        .collect();
    (cut_sets, env)
}

fn pairwise_disjoint(groups: &[Vec<usize>]) -> bool {
    groups.iter().enumerate().all(|(i, a)| {
        groups
            .iter()
            .skip(i + 1)
            .all(|b| a.iter().all(|e| !b.contains(e)))
    })
}

proptest! {
    #[test]
    fn given_random_cut_sets_when_quantifying_then_approximations_bound_exact(
        (probabilities, groups) in random_cut_sets()
    ) {
        let (cut_sets, env) = setup(&probabilities, &groups);

        let ex = exact(&cut_sets, &env, DEFAULT_MAX_CUT_SETS).unwrap().point();
        let ub = upper_bound(&cut_sets, &env).unwrap().point();
        let rare = rare_event(&cut_sets, &env).unwrap().point();

        prop_assert!(rare >= ex - TOLERANCE, "rare event {rare} below exact {ex}");
        prop_assert!(ub >= ex - TOLERANCE, "upper bound {ub} below exact {ex}");
    }

    #[test]
    fn given_random_cut_sets_when_quantifying_then_upper_bound_exact_iff_disjoint(
        (probabilities, groups) in random_cut_sets()
    ) {
        let (cut_sets, env) = setup(&probabilities, &groups);

        let ex = exact(&cut_sets, &env, DEFAULT_MAX_CUT_SETS).unwrap().point();
        let ub = upper_bound(&cut_sets, &env).unwrap().point();

        if pairwise_disjoint(&groups) {
            prop_assert!((ub - ex).abs() <= TOLERANCE, "disjoint: {ub} != {ex}");
        } else {
            prop_assert!(ub - ex > 1e-13, "overlapping: {ub} not above {ex}");
        }
    }
}
