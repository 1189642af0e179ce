//! Turns a [`Registry`] snapshot into a [`Model`] with a weighted objective.
//!
//! The month model is built in one forward pass: variables first, then the
//! per-day hard rules (coverage, capability, exclusivity, preferences), then
//! the multi-day rules (aggregates, spacing, run-length and sum rules,
//! transitions, threshold ladders). A single-day scope skips the multi-day
//! rules entirely and is only used for diagnostics.

mod coverage;
pub mod ladder;
pub mod preferences;
mod rules;
pub mod sequence;
pub mod soft_sum;
mod spacing;

use crate::data::{Category, Day};
use crate::model::{Lit, Model, Valuation, VarId};
use crate::registry::{EmployeeIdx, Registry, ShiftIdx};
use itertools::Itertools;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

pub use ladder::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Month,
    Day(Day),
}

/// Every variable that belongs to one employee.
///
/// The caches below are write-once per key: an entry is created the first
/// time a rule asks for it and only read afterwards.
#[derive(Debug, Default)]
pub struct EmployeeVars {
    /// `assign[slot][shift]`
    pub assign: Vec<Vec<VarId>>,
    pub works: Vec<VarId>,
    pub virtual_work: Vec<VarId>,
    pub counts: BTreeMap<Category, VarId>,
    thresholds: BTreeMap<(Category, i64), VarId>,
    bands: BTreeMap<(Category, Side, u32, u32), VarId>,
    total_eq: BTreeMap<u32, VarId>,
    derived: BTreeMap<Vec<ShiftIdx>, Vec<VarId>>,
}

impl EmployeeVars {
    pub fn threshold(&self, category: Category, k: i64) -> Option<VarId> {
        self.thresholds.get(&(category, k)).copied()
    }

    pub fn thresholds(&self) -> impl Iterator<Item = (Category, i64, VarId)> + '_ {
        self.thresholds.iter().map(|(&(c, k), &v)| (c, k, v))
    }
}

/// A compiled model plus the handles a decoder needs to read it back.
#[derive(Debug)]
pub struct RosterModel {
    pub model: Model,
    pub scope: Scope,
    /// Month day index of each slot.
    pub days: Vec<Day>,
    pub employees: Vec<EmployeeVars>,
    /// `(employee, shift, day)` triples forced false before search.
    pub blacklist: BTreeSet<(EmployeeIdx, ShiftIdx, Day)>,
}

impl RosterModel {
    pub fn slot(&self, day: Day) -> Option<usize> {
        self.days.iter().position(|&d| d == day)
    }

    pub fn assignment(&self, employee: EmployeeIdx, shift: ShiftIdx, day: Day) -> Option<VarId> {
        let slot = self.slot(day)?;
        Some(self.employees[employee].assign[slot][shift])
    }

    pub fn is_assigned(&self, valuation: &Valuation, employee: EmployeeIdx, shift: ShiftIdx, day: Day) -> bool {
        self.assignment(employee, shift, day)
            .is_some_and(|var| valuation.lit(Lit::pos(var)))
    }

    pub fn count(&self, employee: EmployeeIdx, category: Category) -> Option<VarId> {
        self.employees[employee].counts.get(&category).copied()
    }
}

pub fn compile(registry: &Registry, scope: Scope) -> RosterModel {
    let start_time = Instant::now();
    let days = match scope {
        Scope::Month => registry.calendar.days().collect(),
        Scope::Day(day) => vec![day],
    };
    info!(
        "Compiling {:?} model with {} employees, {} shifts and {} days...",
        scope,
        registry.employees.len(),
        registry.shifts.len(),
        days.len()
    );

    let mut compiler = Compiler {
        registry,
        roster: RosterModel {
            model: Model::new(),
            scope,
            days,
            employees: Vec::new(),
            blacklist: BTreeSet::new(),
        },
    };
    compiler.allocate_variables();
    compiler.add_coverage();
    compiler.add_capability();
    compiler.add_daily_exclusivity();
    compiler.add_preferences();
    compiler.add_fixed_assignments();
    compiler.add_requests();

    if scope == Scope::Month {
        compiler.add_aggregates();
        compiler.add_spacing();
        compiler.add_sequence_rules();
        compiler.add_sum_rules();
        compiler.add_transitions();
        compiler.add_ladders();
        compiler.add_threshold_chains();
    }

    let roster = compiler.roster;
    let by_kind = roster
        .model
        .objective()
        .iter()
        .map(|term| term.kind)
        .counts();
    for (kind, count) in by_kind.iter().sorted() {
        debug!("  {count} objective terms of kind '{kind}'");
    }
    info!(
        "Compiled model: {} ({} blacklisted slots) in {:.2?}",
        roster.model,
        roster.blacklist.len(),
        start_time.elapsed()
    );
    roster
}

pub(crate) struct Compiler<'a> {
    registry: &'a Registry,
    roster: RosterModel,
}

impl Compiler<'_> {
    fn model(&mut self) -> &mut Model {
        &mut self.roster.model
    }

    fn slots(&self) -> usize {
        self.roster.days.len()
    }

    fn employee_id(&self, employee: EmployeeIdx) -> &str {
        &self.registry.employees[employee].id
    }

    fn assign(&self, employee: EmployeeIdx, slot: usize, shift: ShiftIdx) -> Lit {
        Lit::pos(self.roster.employees[employee].assign[slot][shift])
    }

    fn works(&self, employee: EmployeeIdx, slot: usize) -> Lit {
        Lit::pos(self.roster.employees[employee].works[slot])
    }

    fn allocate_variables(&mut self) {
        let registry = self.registry;
        for employee in &registry.employees {
            let mut vars = EmployeeVars::default();
            for &day in &self.roster.days {
                let row = registry
                    .shifts
                    .iter()
                    .map(|shift| {
                        self.roster
                            .model
                            .new_bool(format!("work[{},{},{day}]", employee.id, shift.code))
                    })
                    .collect();
                vars.assign.push(row);
                vars.works.push(
                    self.roster
                        .model
                        .new_bool(format!("works[{},{day}]", employee.id)),
                );
                vars.virtual_work.push(
                    self.roster
                        .model
                        .new_bool(format!("virtual[{},{day}]", employee.id)),
                );
            }
            self.roster.employees.push(vars);
        }
        debug!(
            "Allocated {} variables for {} employees",
            self.roster.model.vars().len(),
            registry.employees.len()
        );
    }

    /// One of the assignment literals or `!works` holds, so `works` mirrors
    /// "some shift today"; virtual work excludes physical work.
    fn add_daily_exclusivity(&mut self) {
        for e in 0..self.registry.employees.len() {
            for (slot, &day) in self.roster.days.clone().iter().enumerate() {
                let id = self.employee_id(e).to_string();
                let mut lits: Vec<Lit> = (0..self.registry.shifts.len())
                    .map(|s| self.assign(e, slot, s))
                    .collect();
                lits.push(!self.works(e, slot));
                self.model()
                    .add_exactly_one(lits, format!("one shift per day [{id}, day {day}]"));

                let virtual_work = Lit::pos(self.roster.employees[e].virtual_work[slot]);
                let works = self.works(e, slot);
                self.model().add_at_most_one(
                    [works, virtual_work],
                    format!("work or virtual [{id}, day {day}]"),
                );
            }
        }
    }
}
