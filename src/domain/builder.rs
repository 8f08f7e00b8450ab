//! Fault-tree builder: logic rows to an event DAG.

use std::fmt;

use tracing::{debug, instrument};

use crate::domain::arena::EventArena;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::probability::Gate;
use crate::domain::tree::FaultTree;

/// One line of fault-tree logic: `NAME, AND|OR, DEP0, DEP1, ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicRow {
    pub name: String,
    pub gate: Gate,
    pub deps: Vec<String>,
}

impl LogicRow {
    pub fn new(name: &str, gate: Gate, deps: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            gate,
            deps: deps.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl fmt::Display for LogicRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.name, self.gate, self.deps.join(", "))
    }
}

/// Constructs a [`FaultTree`] from logic rows.
///
/// The first row names the root. Dependencies that never get a row of their own stay
/// basic events.
#[derive(Debug, Default)]
pub struct FaultTreeBuilder {
    arena: EventArena,
}

impl FaultTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the tree from in-memory rows.
    #[instrument(level = "debug", skip(self, rows), fields(rows = rows.len()))]
    pub fn build_from_rows(mut self, rows: Vec<LogicRow>) -> DomainResult<FaultTree> {
        if rows.is_empty() {
            return Err(DomainError::InvalidInput(
                "fault tree logic has no rows".to_string(),
            ));
        }
        for row in &rows {
            self.process_row(row)?;
        }
        self.arena.check_acyclic()?;
        debug!(events = self.arena.len(), "fault tree built");
        Ok(FaultTree::new(self.arena, rows))
    }

    fn process_row(&mut self, row: &LogicRow) -> DomainResult<()> {
        if row.name.is_empty() {
            return Err(DomainError::InvalidInput(
                "event name can not be empty".to_string(),
            ));
        }
        if row.deps.is_empty() {
            return Err(DomainError::InvalidInput(format!(
                "gate '{}' has no dependencies",
                row.name
            )));
        }
        let parent = self.arena.get_or_insert(&row.name, Some(row.gate))?;
        for dep in &row.deps {
            if dep.is_empty() {
                return Err(DomainError::InvalidInput(format!(
                    "gate '{}' lists an empty dependency",
                    row.name
                )));
            }
            let child = self.arena.get_or_insert(dep, None)?;
            self.arena.add_child(parent, child)?;
        }
        Ok(())
    }
}
