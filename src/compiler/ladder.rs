//! Per-employee aggregate counts and the tiered threshold ladder.
//!
//! A ladder row says: "if this employee ends the month with `total` shifts,
//! the category count must stay within these limits". Because the total is
//! itself a solver decision, every row is guarded by a reified
//! `total == value` indicator. Indicators are memoised per employee, so rows
//! that share a threshold share the literal.

use super::Compiler;
use crate::data::{Category, Day, DayPart, Limit, ShiftCategory};
use crate::model::{Cmp, LinExpr, Lit, PenaltyTerm, VarId};
use crate::registry::{EmployeeIdx, LadderTable, Registry, ShiftIdx};
use itertools::Itertools;
use log::{debug, info};
use std::fmt;

const KIND: &str = "threshold ladder";

/// Which side of a limit a band indicator watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// count in `(soft, hard]`
    Above,
    /// count in `[hard, soft)`
    Below,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Above => f.write_str("above"),
            Side::Below => f.write_str("below"),
        }
    }
}

/// A category whose acceptable count depends on the employee's total.
pub trait LadderPolicy {
    fn category(&self) -> Category;

    /// Whether `employee` working `shift` on `day` counts toward the category.
    fn counts(&self, registry: &Registry, employee: EmployeeIdx, shift: ShiftIdx, day: Day) -> bool;

    /// Row index of the limit table that applies to `employee`.
    fn bucket_index(&self, registry: &Registry, employee: EmployeeIdx) -> usize;

    fn limit_table<'r>(&self, registry: &'r Registry) -> Option<&'r LadderTable> {
        registry.ladders.get(&self.category())
    }
}

pub struct NightPolicy;
pub struct HolidayPolicy;
pub struct InternalPolicy;
/// Counts virtual-work days rather than physical shifts.
pub struct VirtualPolicy;

impl LadderPolicy for NightPolicy {
    fn category(&self) -> Category {
        Category::Nights
    }

    fn counts(&self, registry: &Registry, _employee: EmployeeIdx, shift: ShiftIdx, _day: Day) -> bool {
        registry.shifts[shift].part == DayPart::Night
    }

    fn bucket_index(&self, registry: &Registry, employee: EmployeeIdx) -> usize {
        registry.employees[employee].extra_nights
    }
}

impl LadderPolicy for HolidayPolicy {
    fn category(&self) -> Category {
        Category::Holidays
    }

    fn counts(&self, registry: &Registry, _employee: EmployeeIdx, shift: ShiftIdx, day: Day) -> bool {
        let calendar = &registry.calendar;
        if calendar.is_holiday_day(day) {
            return true;
        }
        let eve_nights = self.limit_table(registry).is_some_and(|t| t.eve_nights);
        eve_nights && registry.shifts[shift].part == DayPart::Night && calendar.is_holiday_eve(day)
    }

    fn bucket_index(&self, registry: &Registry, employee: EmployeeIdx) -> usize {
        registry.employees[employee].level
    }
}

impl LadderPolicy for InternalPolicy {
    fn category(&self) -> Category {
        Category::Internal
    }

    fn counts(&self, registry: &Registry, _employee: EmployeeIdx, shift: ShiftIdx, _day: Day) -> bool {
        registry.shifts[shift].category == ShiftCategory::Internal
    }

    fn bucket_index(&self, registry: &Registry, employee: EmployeeIdx) -> usize {
        registry.employees[employee].level
    }
}

impl LadderPolicy for VirtualPolicy {
    fn category(&self) -> Category {
        Category::Virtual
    }

    fn counts(&self, _registry: &Registry, _employee: EmployeeIdx, _shift: ShiftIdx, _day: Day) -> bool {
        false
    }

    fn bucket_index(&self, registry: &Registry, employee: EmployeeIdx) -> usize {
        registry.employees[employee].level
    }
}

pub const POLICIES: [&dyn LadderPolicy; 4] = [&NightPolicy, &HolidayPolicy, &InternalPolicy, &VirtualPolicy];

impl Compiler<'_> {
    /// One exact integer count per (employee, category).
    pub(super) fn add_aggregates(&mut self) {
        info!("Adding aggregate counts...");
        let registry = self.registry;
        let shifts = registry.shifts.len();
        for (e, employee) in registry.employees.iter().enumerate() {
            let days = self.roster.days.clone();
            let all = days.iter().enumerate().flat_map(|(slot, _)| (0..shifts).map(move |s| (slot, s)));
            let total_expr = LinExpr::sum_lits(all.map(|(slot, s)| self.assign(e, slot, s)));
            let (lo, hi) = employee.physical_range();
            let total = self.model().new_sum(
                format!("count[{}, {}]", employee.id, Category::Total),
                &total_expr,
                lo as i64,
                hi as i64,
            );
            self.roster.employees[e].counts.insert(Category::Total, total);

            for policy in POLICIES {
                let category = policy.category();
                let (expr, max) = if category == Category::Virtual {
                    let virtual_work = &self.roster.employees[e].virtual_work;
                    (LinExpr::sum_vars(virtual_work.iter().copied()), virtual_work.len() as i64)
                } else {
                    let mut expr = LinExpr::new();
                    for (slot, &day) in days.iter().enumerate() {
                        for s in 0..shifts {
                            if policy.counts(registry, e, s, day) {
                                expr.add_lit(self.assign(e, slot, s), 1);
                            }
                        }
                    }
                    (expr, employee.max_shifts as i64)
                };
                let name = format!("count[{}, {category}]", employee.id);
                let count = self.model().new_sum(name, &expr, 0, max);
                self.roster.employees[e].counts.insert(category, count);
            }

            let virtual_count = self.roster.employees[e].counts[&Category::Virtual];
            self.model().add(
                LinExpr::sum_vars([virtual_count]),
                Cmp::Eq,
                employee.virtual_quota as i64,
                format!("virtual quota [{}]", employee.id),
            );
        }
    }

    /// `count(category) > k`, created once per (employee, category, k).
    pub(super) fn threshold(&mut self, e: EmployeeIdx, category: Category, k: i64) -> Lit {
        if let Some(var) = self.roster.employees[e].threshold(category, k) {
            return Lit::pos(var);
        }
        let count = self.roster.employees[e].counts[&category];
        let name = format!("{category} > {k} [{}]", self.employee_id(e));
        let model = self.model();
        let var = model.new_bool(name.clone());
        model.reify_greater_than(var, &LinExpr::sum_vars([count]), k, &name);
        self.roster.employees[e].thresholds.insert((category, k), var);
        Lit::pos(var)
    }

    /// `total == value`, created once per (employee, value).
    fn total_equals(&mut self, e: EmployeeIdx, value: u32) -> Lit {
        if let Some(&var) = self.roster.employees[e].total_eq.get(&value) {
            return Lit::pos(var);
        }
        let above_previous = self.threshold(e, Category::Total, value as i64 - 1);
        let above_value = self.threshold(e, Category::Total, value as i64);
        let name = format!("total == {value} [{}]", self.employee_id(e));
        let var = self.model().new_and(name, &[above_previous, !above_value]);
        self.roster.employees[e].total_eq.insert(value, var);
        Lit::pos(var)
    }

    /// Band indicator between the soft and hard thresholds of one limit.
    fn band(&mut self, e: EmployeeIdx, category: Category, side: Side, limit: Limit) -> Lit {
        let key = (category, side, limit.soft, limit.hard);
        if let Some(&var) = self.roster.employees[e].bands.get(&key) {
            return Lit::pos(var);
        }
        let (soft, hard) = (limit.soft as i64, limit.hard as i64);
        let lits = match side {
            Side::Above => [self.threshold(e, category, soft), !self.threshold(e, category, hard)],
            Side::Below => [self.threshold(e, category, hard - 1), !self.threshold(e, category, soft - 1)],
        };
        let name = format!(
            "{category} {side} band ({soft}, {hard}) [{}]",
            self.employee_id(e)
        );
        let var = self.model().new_and(name, &lits);
        self.roster.employees[e].bands.insert(key, var);
        Lit::pos(var)
    }

    pub(super) fn add_ladders(&mut self) {
        let registry = self.registry;
        for policy in POLICIES {
            let Some(table) = policy.limit_table(registry) else {
                continue;
            };
            let category = policy.category();
            info!("Adding {category} threshold ladder...");
            let mut penalties = Vec::new();
            for (e, employee) in registry.employees.iter().enumerate() {
                let Some(bucket) = table.bucket(policy.bucket_index(registry, e)) else {
                    continue;
                };
                let (lo, hi) = employee.physical_range();
                for (&value, limits) in bucket.range(lo..=hi) {
                    let total_is = self.total_equals(e, value);
                    let context = format!("{} with {value} shifts", employee.id);

                    if let Some(max) = limits.max {
                        let over_hard = self.threshold(e, category, max.hard as i64);
                        self.model().add_bool_or(
                            [!total_is, !over_hard],
                            format!("{category} above {} for {context}", max.hard),
                        );
                        if max.hard > max.soft && max.penalty != 0 {
                            let band = self.band(e, category, Side::Above, max);
                            let name = format!("{category} in ({}, {}] for {context}", max.soft, max.hard);
                            let lit = Lit::pos(self.model().new_and(name.clone(), &[total_is, band]));
                            penalties.push(PenaltyTerm::lit(lit, max.penalty, KIND, name));
                        }
                    }

                    if let Some(min) = limits.min {
                        if min.hard > 0 {
                            let reaches_hard = self.threshold(e, category, min.hard as i64 - 1);
                            self.model().add_bool_or(
                                [!total_is, reaches_hard],
                                format!("{category} below {} for {context}", min.hard),
                            );
                        }
                        if min.soft > min.hard && min.penalty != 0 {
                            let band = self.band(e, category, Side::Below, min);
                            let name = format!("{category} in [{}, {}) for {context}", min.hard, min.soft);
                            let lit = Lit::pos(self.model().new_and(name.clone(), &[total_is, band]));
                            penalties.push(PenaltyTerm::lit(lit, min.penalty, KIND, name));
                        }
                    }
                }
            }
            debug!("{category} ladder produced {} penalty literals", penalties.len());
            self.model().add_penalties(penalties);
        }
    }

    /// `count > k2` implies `count > k1` for every k1 < k2 on the same count.
    pub(super) fn add_threshold_chains(&mut self) {
        for e in 0..self.roster.employees.len() {
            let chains: Vec<(Category, VarId, VarId)> = self.roster.employees[e]
                .thresholds()
                .tuple_windows()
                .filter(|((c1, _, _), (c2, _, _))| c1 == c2)
                .map(|((category, _, lower), (_, _, higher))| (category, lower, higher))
                .collect();
            for (category, lower, higher) in chains {
                let label = format!("{category} thresholds ordered [{}]", self.employee_id(e));
                self.model()
                    .add_implication(Lit::pos(higher), Lit::pos(lower), label);
            }
        }
    }
}
