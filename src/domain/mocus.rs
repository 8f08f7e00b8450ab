//! MOCUS: minimal cut sets by top-down expansion of the fault tree.
//!
//! Reference: NUREG-0492 / "Fault Tree Handbook", method of obtaining cut sets.

use std::collections::HashMap;

use generational_arena::Index;
use tracing::{debug, instrument, trace};

use crate::domain::arena::EventArena;
use crate::domain::probability::Gate;

/// Set of basic events whose joint occurrence causes the top event.
///
/// Members are kept in registry order, so two cut sets with the same members compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CutSet {
    events: Vec<Index>,
}

impl CutSet {
    pub fn new(events: Vec<Index>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[Index] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn contains(&self, event: Index) -> bool {
        self.events.contains(&event)
    }

    pub fn is_subset_of(&self, other: &CutSet) -> bool {
        self.events.iter().all(|e| other.contains(*e))
    }

    pub fn names<'a>(&self, arena: &'a EventArena) -> Vec<&'a str> {
        self.events.iter().map(|&e| arena.name_of(e)).collect()
    }

    /// `[B1, B2]` style label.
    pub fn label(&self, arena: &EventArena) -> String {
        format!("[{}]", self.names(arena).join(", "))
    }
}

/// Compute the minimal cut sets of the graph below the arena root.
///
/// The arena must be acyclic; see [`EventArena::check_acyclic`].
#[instrument(level = "debug", skip(arena))]
pub fn minimal_cut_sets(arena: &EventArena) -> Vec<CutSet> {
    let root = match arena.root() {
        Some(root) => root,
        None => return Vec::new(),
    };

    let mut paths: Vec<Vec<Index>> = vec![vec![root]];
    let gates: Vec<(Index, Gate)> = arena
        .nodes()
        .filter_map(|(idx, node)| node.operator().map(|g| (idx, g)))
        .collect();

    // Expand one gate at a time until only basic events remain
    let mut sweeps = 0usize;
    loop {
        let mut changed = false;
        for &(gate_idx, gate) in &gates {
            let (expanded, updated) = expand_gate(arena, gate_idx, gate, paths);
            paths = updated;
            if expanded {
                changed = true;
                break;
            }
        }
        sweeps += 1;
        if !changed {
            break;
        }
    }
    debug!(sweeps, paths = paths.len(), "expansion finished");

    let position: HashMap<Index, usize> = arena
        .nodes()
        .enumerate()
        .map(|(pos, (idx, _))| (idx, pos))
        .collect();

    let mut unique: Vec<CutSet> = Vec::new();
    for mut path in paths {
        path.sort_by_key(|idx| position.get(idx).copied().unwrap_or(usize::MAX));
        let cut_set = CutSet::new(path);
        if !unique.contains(&cut_set) {
            unique.push(cut_set);
        }
    }

    absorb(unique)
}

/// Replace every occurrence of `gate_idx` in `paths` by its expansion.
fn expand_gate(
    arena: &EventArena,
    gate_idx: Index,
    gate: Gate,
    paths: Vec<Vec<Index>>,
) -> (bool, Vec<Vec<Index>>) {
    let children = arena
        .get_node(gate_idx)
        .map(|n| n.children().to_vec())
        .unwrap_or_default();
    let mut expanded = false;
    let mut out = Vec::with_capacity(paths.len());

    for path in paths {
        if !path.contains(&gate_idx) {
            out.push(path);
            continue;
        }
        expanded = true;
        let rest: Vec<Index> = path.into_iter().filter(|&e| e != gate_idx).collect();
        match gate {
            Gate::And => {
                let mut merged = rest;
                for &child in &children {
                    if !merged.contains(&child) {
                        merged.push(child);
                    }
                }
                out.push(merged);
            }
            Gate::Or => {
                for &child in &children {
                    let mut branch = rest.clone();
                    if !branch.contains(&child) {
                        branch.push(child);
                    }
                    out.push(branch);
                }
            }
        }
    }
    if expanded {
        trace!(gate = arena.name_of(gate_idx), paths = out.len(), "expanded gate");
    }
    (expanded, out)
}

/// Drop every cut set that is a proper superset of another.
fn absorb(mut cut_sets: Vec<CutSet>) -> Vec<CutSet> {
    // Stable: equal sizes keep discovery order
    cut_sets.sort_by_key(|cs| cs.len());

    let mut minimal: Vec<CutSet> = Vec::new();
    for cs in cut_sets {
        if !minimal.iter().any(|m| m.is_subset_of(&cs)) {
            minimal.push(cs);
        }
    }
    minimal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_from(rows: &[(&str, Gate, &[&str])]) -> EventArena {
        let mut arena = EventArena::new();
        for (name, gate, deps) in rows {
            let idx = arena.get_or_insert(name, Some(*gate)).unwrap();
            for dep in *deps {
                let child = arena.get_or_insert(dep, None).unwrap();
                arena.add_child(idx, child).unwrap();
            }
        }
        arena
    }

    fn names(arena: &EventArena, sets: &[CutSet]) -> Vec<Vec<String>> {
        sets.iter()
            .map(|cs| cs.names(arena).iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn given_or_of_basics_then_one_cut_set_per_child() {
        let arena = arena_from(&[("TOP", Gate::Or, &["A", "B"])]);
        let sets = minimal_cut_sets(&arena);
        assert_eq!(names(&arena, &sets), vec![vec!["A"], vec!["B"]]);
    }

    #[test]
    fn given_and_of_basics_then_single_cut_set() {
        let arena = arena_from(&[("TOP", Gate::And, &["A", "B"])]);
        let sets = minimal_cut_sets(&arena);
        assert_eq!(names(&arena, &sets), vec![vec!["A", "B"]]);
    }

    #[test]
    fn given_absorbed_path_then_superset_removed() {
        // TOP = A OR (A AND B)
        let arena = arena_from(&[("TOP", Gate::Or, &["A", "G"]), ("G", Gate::And, &["A", "B"])]);
        let sets = minimal_cut_sets(&arena);
        assert_eq!(names(&arena, &sets), vec![vec!["A"]]);
    }

    #[test]
    fn given_duplicate_paths_then_deduplicated() {
        // TOP = (A OR B) AND (A OR B) through a shared gate
        let arena = arena_from(&[
            ("TOP", Gate::And, &["G1", "G2"]),
            ("G1", Gate::Or, &["A", "B"]),
            ("G2", Gate::Or, &["B", "A"]),
        ]);
        let sets = minimal_cut_sets(&arena);
        let mut got = names(&arena, &sets);
        got.sort();
        assert_eq!(got, vec![vec!["A"], vec!["B"]]);
    }

    #[test]
    fn given_empty_arena_then_no_cut_sets() {
        assert!(minimal_cut_sets(&EventArena::new()).is_empty());
    }
}
