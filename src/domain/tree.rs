//! Fault tree: event DAG plus its minimal cut sets.

use std::fmt;

use generational_arena::Index;

use crate::domain::arena::EventArena;
use crate::domain::builder::LogicRow;
use crate::domain::mocus::{minimal_cut_sets, CutSet};

/// Built fault tree.
///
/// Structure is fixed after construction; minimal cut sets are computed once here.
#[derive(Debug, Clone)]
pub struct FaultTree {
    arena: EventArena,
    logic: Vec<LogicRow>,
    cut_sets: Vec<CutSet>,
}

impl FaultTree {
    pub(crate) fn new(arena: EventArena, logic: Vec<LogicRow>) -> Self {
        let cut_sets = minimal_cut_sets(&arena);
        Self {
            arena,
            logic,
            cut_sets,
        }
    }

    pub fn arena(&self) -> &EventArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut EventArena {
        &mut self.arena
    }

    pub fn root(&self) -> Option<Index> {
        self.arena.root()
    }

    /// Minimal cut sets, ascending size.
    pub fn mocus(&self) -> &[CutSet] {
        &self.cut_sets
    }

    /// Rows the tree was built from.
    pub fn logic(&self) -> &[LogicRow] {
        &self.logic
    }

    /// Gate rows derived from the built graph, in registry order.
    pub fn structure(&self) -> Vec<LogicRow> {
        self.arena
            .nodes()
            .filter_map(|(_, node)| {
                node.operator().map(|gate| LogicRow {
                    name: node.name().to_string(),
                    gate,
                    deps: node
                        .children()
                        .iter()
                        .map(|&c| self.arena.name_of(c).to_string())
                        .collect(),
                })
            })
            .collect()
    }

    /// Cut sets as name lists.
    pub fn cut_set_names(&self) -> Vec<Vec<String>> {
        self.cut_sets
            .iter()
            .map(|cs| cs.names(&self.arena).iter().map(|s| s.to_string()).collect())
            .collect()
    }
}

impl fmt::Display for FaultTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.arena.to_tree_string())
    }
}
