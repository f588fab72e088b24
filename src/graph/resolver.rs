//! Build order resolution
//!
//! Depth-first post-order traversal over the units of one partition. Every
//! unit is visited once, in discovery order, and carries an explicit
//! three-state marker:
//!
//! - `Unvisited`: not reached yet;
//! - `InProgress`: on the current traversal path. Reaching it again is a
//!   cycle back-edge, which contributes nothing and is recorded;
//! - `Done`: finished, either emitted or dropped.
//!
//! A unit is dropped when one of its references names an excluded unit or a
//! unit that was itself dropped. Dropped names join the excluded set so the
//! exclusion flows from dependency to every dependent. Dependencies that were
//! emitted before the excluded reference was reached stay emitted: they do not
//! depend on the excluded name themselves.
//!
//! A unit emitted through a cycle back-edge is resolved before the unit it
//! points at has finished. Once the traversal is over, emitted units that
//! reference a dropped unit are dropped too, repeated until nothing changes.

use super::NameSet;
use crate::project::Unit;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Emitted,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done(Outcome),
}

/// A reference that closed a cycle: `from` referenced `to` while `to` was
/// still being resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleEdge {
    pub from: String,
    pub to: String,
}

/// Findings of resolving one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Units in build order: dependencies before dependents.
    pub ordered: Vec<Unit>,
    /// Vendor-prefixed references that are not units of the partition.
    pub external_refs: NameSet,
    /// Units left out because they depend on an excluded name.
    pub dropped: Vec<String>,
    pub cycles: Vec<CycleEdge>,
}

impl Resolution {
    pub fn position(&self, name: &str) -> Option<usize> {
        self.ordered
            .iter()
            .position(|u| u.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.ordered.iter().map(|u| u.name.as_str()).collect()
    }
}

struct Resolver<'a> {
    units: &'a [Unit],
    index: HashMap<String, usize>,
    states: Vec<VisitState>,
    excluded: NameSet,
    vendor_prefix: String,
    ordered: Vec<usize>,
    external_refs: NameSet,
    dropped: Vec<String>,
    cycles: Vec<CycleEdge>,
}

impl<'a> Resolver<'a> {
    fn new(units: &'a [Unit], excluded: &NameSet, vendor_prefix: &str) -> Self {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            let key = unit.name.to_lowercase();
            if let Some(&first) = index.get(&key) {
                warn!(
                    name = %unit.name,
                    kept = %units[first].path.display(),
                    ignored = %unit.path.display(),
                    "Duplicate unit name, keeping the first one"
                );
                continue;
            }
            index.insert(key, i);
        }

        Self {
            units,
            index,
            states: vec![VisitState::Unvisited; units.len()],
            excluded: excluded.clone(),
            vendor_prefix: vendor_prefix.to_lowercase(),
            ordered: Vec::new(),
            external_refs: NameSet::new(),
            dropped: Vec::new(),
            cycles: Vec::new(),
        }
    }

    fn is_indexed(&self, i: usize) -> bool {
        self.index.get(&self.units[i].name.to_lowercase()) == Some(&i)
    }

    fn run(mut self) -> Resolution {
        for i in 0..self.units.len() {
            if self.is_indexed(i) {
                self.visit(i);
            }
        }
        self.settle_back_edges();

        let units = self.units;
        Resolution {
            ordered: self.ordered.iter().map(|&i| units[i].clone()).collect(),
            external_refs: self.external_refs,
            dropped: self.dropped,
            cycles: self.cycles,
        }
    }

    fn depends_on_dropped(&self, i: usize) -> Option<usize> {
        self.units[i].references.iter().find_map(|reference| {
            let dep = *self.index.get(&reference.to_lowercase())?;
            (self.states[dep] == VisitState::Done(Outcome::Dropped)).then_some(dep)
        })
    }

    /// Drop emitted units whose dependency was dropped after they finished.
    /// Only cycle members and their dependents can be in that position.
    fn settle_back_edges(&mut self) {
        let units = self.units;
        loop {
            let mut changed = false;
            for &i in &self.ordered {
                if self.states[i] != VisitState::Done(Outcome::Emitted) {
                    continue;
                }
                if let Some(dep) = self.depends_on_dropped(i) {
                    debug!(unit = %units[i].name, dependency = %units[dep].name, "Dependency was excluded after a cycle");
                    self.states[i] = VisitState::Done(Outcome::Dropped);
                    self.dropped.push(units[i].name.clone());
                    self.excluded.insert(&units[i].name);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let states = &self.states;
        self.ordered
            .retain(|&i| states[i] == VisitState::Done(Outcome::Emitted));
    }

    /// Returns `None` when the unit is still in progress.
    fn visit(&mut self, i: usize) -> Option<Outcome> {
        match self.states[i] {
            VisitState::InProgress => return None,
            VisitState::Done(outcome) => return Some(outcome),
            VisitState::Unvisited => {}
        }
        self.states[i] = VisitState::InProgress;

        let units = self.units;
        let unit = &units[i];
        let mut outcome = Outcome::Emitted;

        for reference in &unit.references {
            if let Some(&dep) = self.index.get(&reference.to_lowercase()) {
                match self.visit(dep) {
                    Some(Outcome::Emitted) => {}
                    Some(Outcome::Dropped) => {
                        debug!(unit = %unit.name, dependency = %units[dep].name, "Dependency was excluded");
                        outcome = Outcome::Dropped;
                        break;
                    }
                    None => {
                        debug!(unit = %unit.name, dependency = %units[dep].name, "Cycle back-edge ignored");
                        self.cycles.push(CycleEdge {
                            from: unit.name.clone(),
                            to: units[dep].name.clone(),
                        });
                    }
                }
            } else if self.excluded.contains(reference) {
                debug!(unit = %unit.name, reference = %reference, "References an excluded name");
                outcome = Outcome::Dropped;
                break;
            } else if reference.to_lowercase().starts_with(&self.vendor_prefix) {
                self.external_refs.insert(reference);
            }
        }

        match outcome {
            Outcome::Emitted => self.ordered.push(i),
            Outcome::Dropped => {
                self.dropped.push(unit.name.clone());
                self.excluded.insert(&unit.name);
            }
        }
        self.states[i] = VisitState::Done(outcome);
        Some(outcome)
    }
}

/// Resolve the build order of one partition.
///
/// `units` must all belong to the same partition; their order is the
/// discovery order and breaks ties between independent units.
///
/// # Example
///
/// ```
/// use buildgen::graph::{resolve, NameSet};
/// use buildgen::project::Unit;
///
/// let units = vec![
///     Unit::new("App", "App/App.csproj").with_references(["Lib"]),
///     Unit::new("Lib", "Lib/Lib.csproj"),
/// ];
/// let resolution = resolve(&units, &NameSet::new(), "DevExpress");
/// assert_eq!(resolution.names(), vec!["Lib", "App"]);
/// ```
pub fn resolve(units: &[Unit], excluded: &NameSet, vendor_prefix: &str) -> Resolution {
    Resolver::new(units, excluded, vendor_prefix).run()
}
