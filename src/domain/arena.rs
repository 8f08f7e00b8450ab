//! Arena storage for fault-tree event nodes.

use std::collections::HashMap;

use generational_arena::{Arena, Index};
use termtree::Tree;
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::event::EventNode;
use crate::domain::probability::Gate;

/// Arena-based event graph.
///
/// Nodes are shared between parents through their index, so the structure is a DAG.
/// Names are unique; the registry maps each name to its index and remembers the order in
/// which names were first seen.
#[derive(Debug, Clone)]
pub struct EventArena {
    arena: Arena<EventNode>,
    names: HashMap<String, Index>,
    order: Vec<Index>,
    root: Option<Index>,
}

impl Default for EventArena {
    fn default() -> Self {
        Self::new()
    }
}

impl EventArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            names: HashMap::new(),
            order: Vec::new(),
            root: None,
        }
    }

    /// Fetch the node with this name, creating it with `operator` if missing.
    ///
    /// An existing node without operator is promoted to the given operator; this lets a row
    /// define a gate that earlier rows already referenced as a dependency.
    #[instrument(level = "trace", skip(self))]
    pub fn get_or_insert(&mut self, name: &str, operator: Option<Gate>) -> DomainResult<Index> {
        if let Some(&idx) = self.names.get(name) {
            if let Some(node) = self.arena.get_mut(idx) {
                if node.operator().is_none() && operator.is_some() {
                    node.set_operator(operator)?;
                }
            }
            return Ok(idx);
        }
        let idx = self.arena.insert(EventNode::new(name, operator));
        self.names.insert(name.to_string(), idx);
        self.order.push(idx);
        if self.root.is_none() {
            self.root = Some(idx);
        }
        Ok(idx)
    }

    /// Append `child` to the children of `parent`.
    pub fn add_child(&mut self, parent: Index, child: Index) -> DomainResult<()> {
        if !self.arena.contains(child) {
            return Err(DomainError::InvalidInput(format!(
                "child {:?} is not an event of this tree",
                child
            )));
        }
        self.get_node_mut(parent)
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown event {:?}", parent)))?
            .push_child(child)
    }

    /// Replace the children of `parent`; every index must belong to this arena.
    pub fn set_children(&mut self, parent: Index, children: Vec<Index>) -> DomainResult<()> {
        if let Some(bad) = children.iter().find(|c| !self.arena.contains(**c)) {
            return Err(DomainError::InvalidInput(format!(
                "child {:?} is not an event of this tree",
                bad
            )));
        }
        self.get_node_mut(parent)
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown event {:?}", parent)))?
            .set_children(children)
    }

    pub fn get_node(&self, idx: Index) -> Option<&EventNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut EventNode> {
        self.arena.get_mut(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<Index> {
        self.names.get(name).copied()
    }

    pub fn name_of(&self, idx: Index) -> &str {
        self.arena.get(idx).map(|n| n.name()).unwrap_or("?")
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// All nodes in registry order.
    pub fn nodes(&self) -> impl Iterator<Item = (Index, &EventNode)> + '_ {
        self.order
            .iter()
            .filter_map(move |&idx| self.arena.get(idx).map(|n| (idx, n)))
    }

    /// Basic events in registry order.
    pub fn basic_events(&self) -> impl Iterator<Item = (Index, &EventNode)> + '_ {
        self.nodes().filter(|(_, n)| n.is_basic())
    }

    /// Fail if any gate can reach itself.
    #[instrument(level = "debug", skip(self))]
    pub fn check_acyclic(&self) -> DomainResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }
        let mut marks: HashMap<Index, Mark> = self.order.iter().map(|&i| (i, Mark::Unvisited)).collect();

        for &start in &self.order {
            if marks.get(&start) != Some(&Mark::Unvisited) {
                continue;
            }
            // (node, next child position)
            let mut stack = vec![(start, 0usize)];
            marks.insert(start, Mark::InProgress);
            while let Some((idx, pos)) = stack.pop() {
                let children = self.get_node(idx).map(|n| n.children()).unwrap_or(&[]);
                if pos < children.len() {
                    stack.push((idx, pos + 1));
                    let child = children[pos];
                    match marks.get(&child).copied().unwrap_or(Mark::Unvisited) {
                        Mark::InProgress => {
                            return Err(DomainError::CycleDetected(self.name_of(child).to_string()))
                        }
                        Mark::Unvisited => {
                            marks.insert(child, Mark::InProgress);
                            stack.push((child, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks.insert(idx, Mark::Done);
                }
            }
        }
        Ok(())
    }

    /// Render the graph below the root, one line per node.
    pub fn to_tree_string(&self) -> Tree<String> {
        fn build(arena: &EventArena, idx: Index) -> Tree<String> {
            let label = arena
                .get_node(idx)
                .map(|n| n.to_string())
                .unwrap_or_default();
            let leaves: Vec<_> = arena
                .get_node(idx)
                .map(|n| n.children().iter().map(|&c| build(arena, c)).collect())
                .unwrap_or_default();
            Tree::new(label).with_leaves(leaves)
        }

        match self.root {
            Some(root) => build(self, root),
            None => Tree::new("Empty tree".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_arena() -> EventArena {
        let mut arena = EventArena::new();
        let top = arena.get_or_insert("TOP", Some(Gate::Or)).unwrap();
        let g = arena.get_or_insert("G", Some(Gate::And)).unwrap();
        let b1 = arena.get_or_insert("B1", None).unwrap();
        let b2 = arena.get_or_insert("B2", None).unwrap();
        arena.add_child(top, g).unwrap();
        arena.add_child(top, b1).unwrap();
        arena.add_child(g, b1).unwrap();
        arena.add_child(g, b2).unwrap();
        arena
    }

    #[test]
    fn given_first_inserted_node_then_it_is_root() {
        let arena = small_arena();
        assert_eq!(arena.name_of(arena.root().unwrap()), "TOP");
        assert_eq!(arena.len(), 4);
    }

    #[test]
    fn given_shared_child_when_listing_nodes_then_registry_order_once() {
        let arena = small_arena();
        let names: Vec<_> = arena.nodes().map(|(_, n)| n.name()).collect();
        let basics: Vec<_> = arena.basic_events().map(|(_, n)| n.name()).collect();
        assert_eq!(names, vec!["TOP", "G", "B1", "B2"]);
        assert_eq!(basics, vec!["B1", "B2"]);
    }

    #[test]
    fn given_placeholder_when_defined_later_then_promoted_to_gate() {
        let mut arena = EventArena::new();
        let top = arena.get_or_insert("TOP", Some(Gate::And)).unwrap();
        let g = arena.get_or_insert("G", None).unwrap();
        arena.add_child(top, g).unwrap();
        arena.get_or_insert("G", Some(Gate::Or)).unwrap();
        assert_eq!(arena.get_node(g).unwrap().operator(), Some(Gate::Or));
    }

    #[test]
    fn given_basic_parent_when_adding_child_then_invariant_violation() {
        let mut arena = small_arena();
        let b1 = arena.index_of("B1").unwrap();
        let b2 = arena.index_of("B2").unwrap();
        assert!(matches!(
            arena.add_child(b1, b2),
            Err(DomainError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn given_foreign_index_when_setting_children_then_invalid_input() {
        let mut arena = small_arena();
        let mut other = EventArena::new();
        for i in 0..10 {
            other.get_or_insert(&format!("X{}", i), None).unwrap();
        }
        let foreign = other.index_of("X9").unwrap();
        let top = arena.root().unwrap();
        assert!(matches!(
            arena.set_children(top, vec![foreign]),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn given_cycle_when_checking_then_errors() {
        let mut arena = EventArena::new();
        let a = arena.get_or_insert("A", Some(Gate::And)).unwrap();
        let b = arena.get_or_insert("B", Some(Gate::Or)).unwrap();
        arena.add_child(a, b).unwrap();
        arena.add_child(b, a).unwrap();
        assert!(matches!(arena.check_acyclic(), Err(DomainError::CycleDetected(_))));
        assert!(small_arena().check_acyclic().is_ok());
    }

    #[test]
    fn given_arena_when_rendering_then_lists_operators() {
        let rendered = small_arena().to_tree_string().to_string();
        assert!(rendered.contains("TOP (Operator: OR)"));
        assert!(rendered.contains("G (Operator: AND)"));
        assert!(rendered.contains("B2"));
    }
}
