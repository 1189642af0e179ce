//! Immutable, index-based snapshot of one month's staffing policy.
//!
//! [`Registry::build`] is the single validation gate: it resolves every shift
//! code, level name and employee id in a [`RosterInput`] and collects every
//! problem it finds into one configuration error. Nothing downstream looks
//! at raw strings again.

use crate::calendar::Calendar;
use crate::data::{
    Category, DayPart, Day, LadderDef, Limit, Preference, RosterInput, ShiftCategory,
    ShiftCode, SoftBounds, TargetDef,
};
use crate::error::{Result, RosterError};
use itertools::Itertools;
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub type ShiftIdx = usize;
pub type EmployeeIdx = usize;

#[derive(Debug, Clone)]
pub struct Shift {
    pub code: ShiftCode,
    pub part: DayPart,
    pub category: ShiftCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Allowed,
    Penalized(i64),
    Forbidden,
}

#[derive(Debug, Clone)]
pub struct Level {
    pub name: String,
    pub shifts: BTreeSet<ShiftIdx>,
    pub penalized: BTreeMap<ShiftIdx, i64>,
}

impl Level {
    pub fn capability(&self, shift: ShiftIdx) -> Capability {
        if self.shifts.contains(&shift) {
            Capability::Allowed
        } else if let Some(&penalty) = self.penalized.get(&shift) {
            Capability::Penalized(penalty)
        } else {
            Capability::Forbidden
        }
    }
}

#[derive(Debug, Clone)]
pub struct Employee {
    pub id: String,
    pub level: usize,
    pub min_shifts: u32,
    pub max_shifts: u32,
    pub virtual_quota: u32,
    pub gift_quota: u32,
    pub extra_nights: usize,
    pub grid: Vec<[Preference; 3]>,
}

impl Employee {
    pub fn preference(&self, day: Day, part: DayPart) -> Preference {
        self.grid
            .get(day)
            .map(|row| row[part.index()])
            .unwrap_or_default()
    }

    /// Physical shift range once gifted shifts are credited.
    pub fn physical_range(&self) -> (u32, u32) {
        (
            self.min_shifts.saturating_sub(self.gift_quota),
            self.max_shifts.saturating_sub(self.gift_quota),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Demand {
    pub weekday: BTreeSet<ShiftIdx>,
    pub holiday: BTreeSet<ShiftIdx>,
    pub groups: Vec<BTreeSet<ShiftIdx>>,
    pub phase: usize,
}

impl Demand {
    /// Shift codes that must be staffed on `day`.
    pub fn demanded(&self, calendar: &Calendar, day: Day) -> BTreeSet<ShiftIdx> {
        let base = if calendar.is_holiday_day(day) {
            &self.holiday
        } else {
            &self.weekday
        };
        if self.groups.is_empty() {
            return base.clone();
        }
        let len = self.groups.len();
        let active = &self.groups[(day % len + self.phase % len) % len];
        base.intersection(active).copied().collect()
    }
}

#[derive(Debug, Clone)]
pub struct Spacing {
    pub rest_window: usize,
    pub night_close_range: usize,
    pub close_shift_penalties: Vec<i64>,
}

#[derive(Debug, Clone, Copy)]
pub struct PreferencePolicy {
    pub night_lover_threshold: Option<usize>,
    pub night_lover_multiplier: i64,
}

/// Which per-day boolean a rule watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Work,
    Rest,
    Shifts(Vec<ShiftIdx>),
}

#[derive(Debug, Clone)]
pub struct SequenceRule {
    pub target: Target,
    pub bounds: SoftBounds,
}

#[derive(Debug, Clone)]
pub struct SumRule {
    pub target: Target,
    pub period_days: usize,
    pub bounds: SoftBounds,
}

#[derive(Debug, Clone, Copy)]
pub struct LadderLimits {
    pub max: Option<Limit>,
    pub min: Option<Limit>,
}

/// Threshold ladder for one category: bucket index -> total value -> limits.
#[derive(Debug, Clone, Default)]
pub struct LadderTable {
    pub eve_nights: bool,
    pub buckets: BTreeMap<usize, BTreeMap<u32, LadderLimits>>,
}

impl LadderTable {
    pub fn bucket(&self, index: usize) -> Option<&BTreeMap<u32, LadderLimits>> {
        self.buckets.get(&index)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Request {
    pub employee: EmployeeIdx,
    pub shift: ShiftIdx,
    pub day: Day,
    pub weight: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: ShiftIdx,
    pub to: ShiftIdx,
    pub penalty: i64,
}

#[derive(Debug, Clone)]
pub struct Registry {
    pub calendar: Calendar,
    pub shifts: Vec<Shift>,
    pub parts: [Vec<ShiftIdx>; 3],
    pub levels: Vec<Level>,
    pub employees: Vec<Employee>,
    pub demand: Demand,
    pub spacing: Spacing,
    pub preference_policy: PreferencePolicy,
    pub ladders: BTreeMap<Category, LadderTable>,
    pub sequence_rules: Vec<SequenceRule>,
    pub sum_rules: Vec<SumRule>,
    pub fixed: Vec<(EmployeeIdx, ShiftIdx, Day)>,
    pub requests: Vec<Request>,
    pub transitions: Vec<Transition>,
}

impl Registry {
    pub fn build(input: &RosterInput) -> Result<Self> {
        let mut v = Validator::default();
        let month_days = input.calendar.month_days;
        if !(1..=31).contains(&month_days) {
            v.issue(format!("monthDays must be within 1..=31, got {month_days}"));
        }
        for &holiday in &input.calendar.public_holidays {
            if holiday < 1 || holiday > month_days {
                v.issue(format!("public holiday {holiday} is outside 1..={month_days}"));
            }
        }

        // shift table and the day-part cover
        let mut codes: HashMap<&str, ShiftIdx> = HashMap::new();
        for (i, def) in input.shifts.iter().enumerate() {
            if codes.insert(def.code.as_str(), i).is_some() {
                v.issue(format!("shift code {} is declared twice", def.code));
            }
        }
        let mut part_of: Vec<Option<DayPart>> = vec![None; input.shifts.len()];
        let mut parts: [Vec<ShiftIdx>; 3] = Default::default();
        for part in DayPart::ALL {
            for code in input.day_parts.codes(part) {
                let Some(&s) = codes.get(code.as_str()) else {
                    v.issue(format!("{part} day-part references unknown shift {code}"));
                    continue;
                };
                if let Some(previous) = part_of[s] {
                    v.issue(format!("shift {code} is in both {previous} and {part}"));
                    continue;
                }
                part_of[s] = Some(part);
                parts[part.index()].push(s);
            }
        }
        let shifts: Vec<Shift> = input
            .shifts
            .iter()
            .zip(&part_of)
            .map(|(def, part)| {
                if part.is_none() {
                    v.issue(format!("shift {} is not covered by any day-part", def.code));
                }
                Shift {
                    code: def.code.clone(),
                    part: part.unwrap_or(DayPart::Morning),
                    category: def.category,
                }
            })
            .collect();

        let demand = Demand {
            weekday: v.shift_set(&codes, &input.demand.weekday_shifts, "weekday demand"),
            holiday: v.shift_set(&codes, &input.demand.holiday_shifts, "holiday demand"),
            groups: input
                .demand
                .shift_groups
                .iter()
                .map(|group| v.shift_set(&codes, group, "shift group"))
                .collect(),
            phase: input.demand.group_phase,
        };

        let mut level_index: HashMap<&str, usize> = HashMap::new();
        let levels: Vec<Level> = input
            .levels
            .iter()
            .enumerate()
            .map(|(i, def)| {
                if level_index.insert(def.name.as_str(), i).is_some() {
                    v.issue(format!("level {} is declared twice", def.name));
                }
                let context = format!("level {}", def.name);
                let mut penalized = BTreeMap::new();
                for p in &def.penalized_shifts {
                    if let Some(s) = v.shift(&codes, &p.code, &context) {
                        penalized.insert(s, p.penalty);
                    }
                }
                Level {
                    name: def.name.clone(),
                    shifts: v.shift_set(&codes, &def.shifts, &context),
                    penalized,
                }
            })
            .collect();

        let mut employee_index: HashMap<&str, EmployeeIdx> = HashMap::new();
        let mut employees = Vec::with_capacity(input.employees.len());
        for (i, def) in input.employees.iter().enumerate() {
            if employee_index.insert(def.id.as_str(), i).is_some() {
                v.issue(format!("employee {} is declared twice", def.id));
            }
            let level = level_index.get(def.level.as_str()).copied().unwrap_or_else(|| {
                v.issue(format!("employee {} has unknown level {}", def.id, def.level));
                0
            });
            if def.min_shifts > def.max_shifts {
                v.issue(format!(
                    "employee {} has minShifts {} above maxShifts {}",
                    def.id, def.min_shifts, def.max_shifts
                ));
            }
            if def.virtual_shifts > 0 && def.gift_shifts > 0 {
                v.issue(format!(
                    "employee {} has both virtual and gift shifts",
                    def.id
                ));
            }
            let grid = match &def.preferences {
                Some(rows) => v.grid(&def.id, rows, month_days),
                None => vec![[Preference::Indifferent; 3]; month_days],
            };
            employees.push(Employee {
                id: def.id.clone(),
                level,
                min_shifts: def.min_shifts,
                max_shifts: def.max_shifts,
                virtual_quota: def.virtual_shifts,
                gift_quota: def.gift_shifts,
                extra_nights: def.extra_nights,
                grid,
            });
        }

        let mut ladders = BTreeMap::new();
        for def in &input.ladders {
            if ladders.contains_key(&def.category) {
                v.issue(format!("ladder for {} is declared twice", def.category));
                continue;
            }
            if let Some(table) = v.ladder(def) {
                ladders.insert(def.category, table);
            }
        }

        let sequence_rules = input
            .sequence_rules
            .iter()
            .map(|rule| SequenceRule {
                target: v.target(&codes, &parts, &rule.target),
                bounds: v.bounds(rule.bounds, "sequence rule"),
            })
            .collect();
        let sum_rules = input
            .sum_rules
            .iter()
            .map(|rule| {
                if rule.period_days == 0 {
                    v.issue("sum rule periodDays must be positive".to_string());
                }
                SumRule {
                    target: v.target(&codes, &parts, &rule.target),
                    period_days: rule.period_days.max(1),
                    bounds: v.bounds(rule.bounds, "sum rule"),
                }
            })
            .collect();

        let mut fixed = Vec::new();
        for f in &input.fixed_assignments {
            let context = format!("fixed assignment for {}", f.employee);
            let employee = v.employee(&employee_index, &f.employee, &context);
            let shift = v.shift(&codes, &f.shift, &context);
            v.day(f.day, month_days, &context);
            if let (Some(e), Some(s)) = (employee, shift) {
                fixed.push((e, s, f.day));
            }
        }
        let mut requests = Vec::new();
        for r in &input.requests {
            let context = format!("request of {}", r.employee);
            let employee = v.employee(&employee_index, &r.employee, &context);
            let shift = v.shift(&codes, &r.shift, &context);
            v.day(r.day, month_days, &context);
            if let (Some(employee), Some(shift)) = (employee, shift) {
                requests.push(Request {
                    employee,
                    shift,
                    day: r.day,
                    weight: r.weight,
                });
            }
        }
        let mut transitions = Vec::new();
        for t in &input.transitions {
            let from = v.shift(&codes, &t.from, "transition");
            let to = v.shift(&codes, &t.to, "transition");
            if t.penalty < 0 {
                v.issue(format!("transition {} -> {} has a negative penalty", t.from, t.to));
            }
            if let (Some(from), Some(to)) = (from, to) {
                transitions.push(Transition {
                    from,
                    to,
                    penalty: t.penalty,
                });
            }
        }

        if !v.issues.is_empty() {
            debug!("Rejected roster input: {}", v.issues.iter().join("; "));
            return Err(RosterError::configuration(v.issues));
        }

        Ok(Registry {
            calendar: Calendar::new(&input.calendar),
            shifts,
            parts,
            levels,
            employees,
            demand,
            spacing: Spacing {
                rest_window: input.spacing.rest_window,
                night_close_range: input.spacing.night_close_range,
                close_shift_penalties: input.spacing.close_shift_penalties.clone(),
            },
            preference_policy: PreferencePolicy {
                night_lover_threshold: input.preference_policy.night_lover_threshold,
                night_lover_multiplier: input.preference_policy.night_lover_multiplier,
            },
            ladders,
            sequence_rules,
            sum_rules,
            fixed,
            requests,
            transitions,
        })
    }

    pub fn part_shifts(&self, part: DayPart) -> &[ShiftIdx] {
        &self.parts[part.index()]
    }

    pub fn level_of(&self, employee: EmployeeIdx) -> &Level {
        &self.levels[self.employees[employee].level]
    }
}

/// Collects issues while resolving names, so one pass reports everything.
#[derive(Default)]
struct Validator {
    issues: Vec<String>,
}

impl Validator {
    fn issue(&mut self, message: String) {
        self.issues.push(message);
    }

    fn shift(&mut self, codes: &HashMap<&str, ShiftIdx>, code: &str, context: &str) -> Option<ShiftIdx> {
        let found = codes.get(code).copied();
        if found.is_none() {
            self.issue(format!("{context} references unknown shift {code}"));
        }
        found
    }

    fn shift_set(
        &mut self,
        codes: &HashMap<&str, ShiftIdx>,
        list: &[ShiftCode],
        context: &str,
    ) -> BTreeSet<ShiftIdx> {
        list.iter()
            .filter_map(|code| self.shift(codes, code, context))
            .collect()
    }

    fn employee(
        &mut self,
        index: &HashMap<&str, EmployeeIdx>,
        id: &str,
        context: &str,
    ) -> Option<EmployeeIdx> {
        let found = index.get(id).copied();
        if found.is_none() {
            self.issue(format!("{context} references unknown employee {id}"));
        }
        found
    }

    fn day(&mut self, day: Day, month_days: usize, context: &str) {
        if day >= month_days {
            self.issue(format!("{context} uses day {day} outside 0..{month_days}"));
        }
    }

    fn grid(&mut self, id: &str, rows: &[String], month_days: usize) -> Vec<[Preference; 3]> {
        if rows.len() != month_days {
            self.issue(format!(
                "employee {id} has {} preference rows, expected {month_days}",
                rows.len()
            ));
        }
        rows.iter()
            .enumerate()
            .map(|(day, row)| {
                let cells: Vec<char> = row.chars().collect();
                if cells.len() != 3 {
                    self.issue(format!(
                        "employee {id} preference row {day} has {} values, expected 3",
                        cells.len()
                    ));
                }
                let mut parsed = [Preference::Indifferent; 3];
                for (slot, &symbol) in parsed.iter_mut().zip(&cells) {
                    match Preference::from_symbol(symbol) {
                        Some(p) => *slot = p,
                        None => self.issue(format!(
                            "employee {id} preference row {day} has unknown symbol {symbol:?}"
                        )),
                    }
                }
                parsed
            })
            .collect()
    }

    fn target(
        &mut self,
        codes: &HashMap<&str, ShiftIdx>,
        parts: &[Vec<ShiftIdx>; 3],
        def: &TargetDef,
    ) -> Target {
        match def {
            TargetDef::Work => Target::Work,
            TargetDef::Rest => Target::Rest,
            TargetDef::DayPart { part } => Target::Shifts(parts[part.index()].clone()),
            TargetDef::Shifts { codes: list } => {
                Target::Shifts(self.shift_set(codes, list, "rule target").into_iter().collect())
            }
        }
    }

    fn bounds(&mut self, bounds: SoftBounds, context: &str) -> SoftBounds {
        if bounds.hard_min > bounds.soft_min || bounds.soft_max > bounds.hard_max {
            self.issue(format!(
                "{context} needs hardMin <= softMin and softMax <= hardMax, got {bounds:?}"
            ));
        }
        if bounds.soft_min > bounds.soft_max {
            self.issue(format!("{context} has softMin above softMax, got {bounds:?}"));
        }
        if bounds.min_cost < 0 || bounds.max_cost < 0 {
            self.issue(format!("{context} has a negative cost"));
        }
        bounds
    }

    fn ladder(&mut self, def: &LadderDef) -> Option<LadderTable> {
        if def.category == Category::Total {
            self.issue("the total category cannot carry a ladder".to_string());
            return None;
        }
        let mut table = LadderTable {
            eve_nights: def.eve_nights,
            buckets: BTreeMap::new(),
        };
        for row in &def.rows {
            let context = format!("{} ladder row (index {}, total {})", def.category, row.index, row.total);
            if let Some(max) = row.max
                && max.soft > max.hard
            {
                self.issue(format!("{context}: max limit has soft above hard"));
            }
            if let Some(min) = row.min
                && min.soft < min.hard
            {
                self.issue(format!("{context}: min limit has soft below hard"));
            }
            let bucket = table.buckets.entry(row.index).or_default();
            let limits = LadderLimits {
                max: row.max,
                min: row.min,
            };
            if bucket.insert(row.total, limits).is_some() {
                self.issue(format!("{context} is declared twice"));
            }
        }
        Some(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::*;

    fn sample_input() -> RosterInput {
        RosterInput {
            calendar: CalendarDef {
                month_days: 28,
                first_weekday: Weekday::Mon,
                public_holidays: vec![1],
                holiday_before: false,
                holiday_after: false,
            },
            shifts: ["M", "A", "N"]
                .iter()
                .map(|c| ShiftDef {
                    code: c.to_string(),
                    category: ShiftCategory::External,
                })
                .collect(),
            day_parts: DayPartPartition {
                morning: vec!["M".into()],
                afternoon: vec!["A".into()],
                night: vec!["N".into()],
            },
            demand: DemandDef {
                weekday_shifts: vec!["A".into(), "N".into()],
                holiday_shifts: vec!["M".into(), "A".into(), "N".into()],
                shift_groups: vec![],
                group_phase: 0,
            },
            levels: vec![LevelDef {
                name: "L1".into(),
                shifts: vec!["M".into(), "A".into()],
                penalized_shifts: vec![],
            }],
            employees: vec![EmployeeDef {
                id: "P01".into(),
                level: "L1".into(),
                min_shifts: 2,
                max_shifts: 10,
                virtual_shifts: 0,
                gift_shifts: 0,
                extra_nights: 0,
                preferences: None,
            }],
            spacing: SpacingDef::default(),
            preference_policy: PreferencePolicyDef::default(),
            ladders: vec![],
            sequence_rules: vec![],
            sum_rules: vec![],
            fixed_assignments: vec![],
            requests: vec![],
            transitions: vec![],
        }
    }

    fn issues_of(input: &RosterInput) -> Vec<String> {
        match Registry::build(input) {
            Ok(_) => vec![],
            Err(e) => e.issues().to_vec(),
        }
    }

    #[test]
    fn test_valid_month_lengths() {
        let mut input = sample_input();
        assert!(Registry::build(&input).is_ok());
        input.calendar.month_days = 31;
        assert!(Registry::build(&input).is_ok());
    }

    #[test]
    fn test_partition_missing_code() {
        let mut input = sample_input();
        input.day_parts.night.clear();
        let issues = issues_of(&input);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("not covered"));
    }

    #[test]
    fn test_partition_overlap_and_unknown() {
        let mut input = sample_input();
        input.day_parts.afternoon.push("M".into());
        input.day_parts.night.push("Z".into());
        let issues = issues_of(&input);
        assert!(issues.iter().any(|i| i.contains("both")));
        assert!(issues.iter().any(|i| i.contains("unknown shift Z")));
    }

    #[test]
    fn test_min_above_max() {
        let mut input = sample_input();
        input.employees[0].min_shifts = 11;
        assert!(issues_of(&input)[0].contains("minShifts"));
    }

    #[test]
    fn test_conflicting_quotas() {
        let mut input = sample_input();
        input.employees[0].virtual_shifts = 1;
        input.employees[0].gift_shifts = 1;
        assert!(issues_of(&input)[0].contains("both virtual and gift"));
    }

    #[test]
    fn test_holiday_out_of_range() {
        let mut input = sample_input();
        input.calendar.public_holidays = vec![0, 29];
        assert_eq!(issues_of(&input).len(), 2);
    }

    #[test]
    fn test_unknown_codes_in_levels_and_demand() {
        let mut input = sample_input();
        input.levels[0].shifts.push("X".into());
        input.demand.holiday_shifts.push("Y".into());
        input.demand.shift_groups = vec![vec!["Q".into()]];
        assert_eq!(issues_of(&input).len(), 3);
    }

    #[test]
    fn test_preference_grid_shape() {
        let mut input = sample_input();
        let mut rows = vec!["...".to_string(); 27];
        rows.push("..?".to_string());
        input.employees[0].preferences = Some(rows.clone());
        assert!(issues_of(&input)[0].contains("unknown symbol"));

        rows.pop();
        input.employees[0].preferences = Some(rows);
        assert!(issues_of(&input)[0].contains("27 preference rows"));

        let mut rows = vec!["...".to_string(); 28];
        rows[3] = "..".to_string();
        input.employees[0].preferences = Some(rows);
        assert!(issues_of(&input)[0].contains("has 2 values"));
    }

    #[test]
    fn test_resolved_registry() {
        let mut input = sample_input();
        let mut rows = vec!["...".to_string(); 28];
        rows[2] = "-xo".to_string();
        input.employees[0].preferences = Some(rows);
        input.levels[0].penalized_shifts = vec![PenalizedShift {
            code: "N".into(),
            penalty: 50,
        }];
        let registry = Registry::build(&input).unwrap();
        let employee = &registry.employees[0];
        assert_eq!(employee.preference(2, DayPart::Morning), Preference::WeakNegative);
        assert_eq!(employee.preference(2, DayPart::Night), Preference::StrictPositive);
        let level = registry.level_of(0);
        assert_eq!(level.capability(0), Capability::Allowed);
        assert_eq!(level.capability(2), Capability::Penalized(50));
        // Day 0 is a public holiday, day 1 a Tuesday.
        assert_eq!(registry.demand.demanded(&registry.calendar, 0).len(), 3);
        assert_eq!(registry.demand.demanded(&registry.calendar, 1).len(), 2);
    }

    #[test]
    fn test_shift_groups_alternate() {
        let mut input = sample_input();
        input.demand.shift_groups = vec![vec!["M".into()], vec!["A".into(), "N".into()]];
        input.demand.group_phase = 1;
        let registry = Registry::build(&input).unwrap();
        let cal = &registry.calendar;
        // Day 0 (holiday) takes group 1, day 1 (weekday) takes group 0.
        assert_eq!(registry.demand.demanded(cal, 0), BTreeSet::from([1, 2]));
        assert!(registry.demand.demanded(cal, 1).is_empty());
    }

    #[test]
    fn test_huge_group_phase_wraps() {
        let mut input = sample_input();
        input.demand.shift_groups = vec![vec!["M".into()], vec!["A".into(), "N".into()]];
        input.demand.group_phase = usize::MAX;
        let registry = Registry::build(&input).unwrap();
        // usize::MAX is odd, so it acts as a phase of 1
        assert_eq!(registry.demand.demanded(&registry.calendar, 0), BTreeSet::from([1, 2]));
        assert!(registry.demand.demanded(&registry.calendar, 1).is_empty());
    }

    #[test]
    fn test_overlapping_soft_window() {
        let mut input = sample_input();
        input.sequence_rules = vec![SequenceRuleDef {
            target: TargetDef::Work,
            bounds: SoftBounds {
                hard_min: 1,
                soft_min: 4,
                min_cost: 5,
                soft_max: 3,
                hard_max: 6,
                max_cost: 5,
            },
        }];
        let issues = issues_of(&input);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("softMin above softMax"));
    }

    #[test]
    fn test_ladder_row_validation() {
        let mut input = sample_input();
        input.ladders = vec![LadderDef {
            category: Category::Nights,
            eve_nights: false,
            rows: vec![LadderRow {
                index: 0,
                total: 4,
                max: Some(Limit {
                    soft: 3,
                    hard: 2,
                    penalty: 10,
                }),
                min: None,
            }],
        }];
        assert!(issues_of(&input)[0].contains("soft above hard"));
    }
}
