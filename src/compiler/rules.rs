use super::sequence::add_soft_sequence_constraint;
use super::soft_sum::add_soft_sum_constraint;
use super::Compiler;
use crate::model::{Cmp, LinExpr, Lit, PenaltyTerm};
use crate::registry::{EmployeeIdx, Target};
use log::{debug, info};

impl Compiler<'_> {
    /// One literal per slot that is true when the employee matches `target`.
    fn target_sequence(&mut self, e: EmployeeIdx, target: &Target) -> Vec<Lit> {
        let slots = self.slots();
        match target {
            Target::Work => (0..slots).map(|slot| self.works(e, slot)).collect(),
            Target::Rest => (0..slots).map(|slot| !self.works(e, slot)).collect(),
            Target::Shifts(shifts) if shifts.len() == 1 => {
                (0..slots).map(|slot| self.assign(e, slot, shifts[0])).collect()
            }
            Target::Shifts(shifts) => {
                if let Some(vars) = self.roster.employees[e].derived.get(shifts) {
                    return vars.iter().copied().map(Lit::pos).collect();
                }
                let codes = shifts
                    .iter()
                    .map(|&s| self.registry.shifts[s].code.as_str())
                    .collect::<Vec<_>>()
                    .join("|");
                let mut vars = Vec::with_capacity(slots);
                for (slot, day) in self.roster.days.clone().into_iter().enumerate() {
                    let name = format!("works {codes} [{}, day {day}]", self.employee_id(e));
                    // at most one shift per day, so the sum is already 0/1
                    let mut expr = LinExpr::sum_lits(shifts.iter().map(|&s| self.assign(e, slot, s)));
                    let model = self.model();
                    let var = model.new_bool(name.clone());
                    expr.add_term(var, -1);
                    model.add(expr, Cmp::Eq, 0, name);
                    vars.push(var);
                }
                self.roster.employees[e]
                    .derived
                    .insert(shifts.clone(), vars.clone());
                vars.into_iter().map(Lit::pos).collect()
            }
        }
    }

    pub(super) fn add_sequence_rules(&mut self) {
        let registry = self.registry;
        if registry.sequence_rules.is_empty() {
            return;
        }
        info!("Adding {} run-length rules...", registry.sequence_rules.len());
        for (r, rule) in registry.sequence_rules.iter().enumerate() {
            for e in 0..registry.employees.len() {
                let lits = self.target_sequence(e, &rule.target);
                let prefix = format!("sequence rule {r} [{}]", self.employee_id(e));
                let penalties = add_soft_sequence_constraint(self.model(), &lits, &rule.bounds, &prefix);
                self.model().add_penalties(penalties);
            }
        }
    }

    /// Sum rules only look at complete periods; a trailing partial period is ignored.
    pub(super) fn add_sum_rules(&mut self) {
        let registry = self.registry;
        if registry.sum_rules.is_empty() {
            return;
        }
        info!("Adding {} sum rules...", registry.sum_rules.len());
        for (r, rule) in registry.sum_rules.iter().enumerate() {
            let periods = self.slots() / rule.period_days;
            debug!("Sum rule {r} covers {periods} periods of {} days", rule.period_days);
            for e in 0..registry.employees.len() {
                let lits = self.target_sequence(e, &rule.target);
                for (p, period) in lits.chunks_exact(rule.period_days).enumerate() {
                    let prefix = format!("sum rule {r} [{}, period {p}]", self.employee_id(e));
                    let soft = add_soft_sum_constraint(self.model(), period, &rule.bounds, &prefix);
                    self.model().add_penalties(soft.penalties);
                }
            }
        }
    }

    pub(super) fn add_fixed_assignments(&mut self) {
        let registry = self.registry;
        for &(e, s, day) in &registry.fixed {
            let Some(slot) = self.roster.slot(day) else {
                continue;
            };
            let lit = self.assign(e, slot, s);
            let label = format!(
                "{} fixed to {} on day {day}",
                self.employee_id(e),
                registry.shifts[s].code
            );
            self.model().fix(lit, true, label);
        }
    }

    pub(super) fn add_requests(&mut self) {
        let registry = self.registry;
        let mut penalties = Vec::new();
        for request in &registry.requests {
            if request.weight == 0 {
                continue;
            }
            let Some(slot) = self.roster.slot(request.day) else {
                continue;
            };
            let lit = self.assign(request.employee, slot, request.shift);
            let description = format!(
                "{} {} {} on day {}",
                self.employee_id(request.employee),
                if request.weight < 0 { "wants" } else { "avoids" },
                registry.shifts[request.shift].code,
                request.day
            );
            penalties.push(PenaltyTerm::lit(lit, request.weight, "request", description));
        }
        self.model().add_penalties(penalties);
    }

    /// `from` on one day followed by `to` on the next; penalty 0 forbids the pair.
    pub(super) fn add_transitions(&mut self) {
        let registry = self.registry;
        if registry.transitions.is_empty() {
            return;
        }
        info!("Adding {} shift transitions...", registry.transitions.len());
        let mut penalties = Vec::new();
        for transition in &registry.transitions {
            let from = &registry.shifts[transition.from].code;
            let to = &registry.shifts[transition.to].code;
            for e in 0..registry.employees.len() {
                let id = self.employee_id(e).to_string();
                for slot in 0..self.slots().saturating_sub(1) {
                    let day = self.roster.days[slot];
                    let first = self.assign(e, slot, transition.from);
                    let second = self.assign(e, slot + 1, transition.to);
                    let name = format!("{id} {from} on day {day} then {to}");
                    if transition.penalty == 0 {
                        self.model().add_bool_or([!first, !second], name);
                    } else {
                        let lit = Lit::pos(self.model().new_and(name.clone(), &[first, second]));
                        penalties.push(PenaltyTerm::lit(lit, transition.penalty, "transition", name));
                    }
                }
            }
        }
        self.model().add_penalties(penalties);
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::test_support::base_input;
    use crate::compiler::{compile, Scope};
    use crate::data::{
        DayPart, FixedAssignment, ShiftRequest, SoftBounds, SumRuleDef, SequenceRuleDef, TargetDef,
        TransitionDef,
    };
    use crate::model::Valuation;
    use crate::registry::Registry;

    #[test]
    fn test_fixed_assignment_and_request() {
        let mut input = base_input();
        input.fixed_assignments = vec![FixedAssignment {
            employee: "P02".into(),
            shift: "A".into(),
            day: 3,
        }];
        input.requests = vec![ShiftRequest {
            employee: "P01".into(),
            shift: "A".into(),
            day: 4,
            weight: -5,
        }];
        let registry = Registry::build(&input).unwrap();
        let roster = compile(&registry, Scope::Month);
        assert!(roster
            .model
            .constraints()
            .iter()
            .any(|c| c.label == "P02 fixed to A on day 3"));
        let request = roster
            .model
            .objective()
            .iter()
            .find(|t| t.kind == "request")
            .unwrap();
        assert_eq!(request.weight, -5);
        assert_eq!(request.description, "P01 wants A on day 4");

        // Out-of-scope days are skipped in a single-day model.
        let roster = compile(&registry, Scope::Day(0));
        assert!(!roster
            .model
            .constraints()
            .iter()
            .any(|c| c.label.contains("fixed to")));
    }

    #[test]
    fn test_forbidden_transition() {
        let mut input = base_input();
        input.transitions = vec![TransitionDef {
            from: "N".into(),
            to: "A".into(),
            penalty: 0,
        }];
        let registry = Registry::build(&input).unwrap();
        let roster = compile(&registry, Scope::Month);
        let row = roster
            .model
            .constraints()
            .iter()
            .find(|c| c.label == "P02 N on day 5 then A")
            .unwrap();
        let mut values = vec![0; roster.model.vars().len()];
        values[roster.assignment(1, 2, 5).unwrap().index()] = 1;
        assert!(row.holds(&Valuation::new(values.clone())));
        values[roster.assignment(1, 1, 6).unwrap().index()] = 1;
        assert!(!row.holds(&Valuation::new(values)));
    }

    #[test]
    fn test_penalized_transition_creates_literals() {
        let mut input = base_input();
        input.transitions = vec![TransitionDef {
            from: "A".into(),
            to: "N".into(),
            penalty: 12,
        }];
        let registry = Registry::build(&input).unwrap();
        let roster = compile(&registry, Scope::Month);
        let terms = roster
            .model
            .objective()
            .iter()
            .filter(|t| t.kind == "transition")
            .count();
        assert_eq!(terms, 2 * 6);
    }

    #[test]
    fn test_multi_shift_target_is_derived_once() {
        let mut input = base_input();
        let target = TargetDef::Shifts {
            codes: vec!["A".into(), "N".into()],
        };
        input.sequence_rules = vec![SequenceRuleDef {
            target: target.clone(),
            bounds: SoftBounds::hard(0, 3),
        }];
        input.sum_rules = vec![SumRuleDef {
            target,
            period_days: 7,
            bounds: SoftBounds::hard(0, 5),
        }];
        let registry = Registry::build(&input).unwrap();
        let roster = compile(&registry, Scope::Month);
        let derived = roster
            .model
            .vars()
            .iter()
            .filter(|v| v.name.starts_with("works A|N [P02"))
            .count();
        assert_eq!(derived, 7);
    }

    #[test]
    fn test_sum_rule_ignores_partial_periods() {
        let mut input = base_input();
        input.sum_rules = vec![SumRuleDef {
            target: TargetDef::DayPart {
                part: DayPart::Night,
            },
            period_days: 3,
            bounds: SoftBounds {
                hard_min: 0,
                soft_min: 0,
                min_cost: 0,
                soft_max: 1,
                hard_max: 3,
                max_cost: 9,
            },
        }];
        let registry = Registry::build(&input).unwrap();
        let roster = compile(&registry, Scope::Month);
        let sums: Vec<_> = roster
            .model
            .objective()
            .iter()
            .filter(|t| t.kind == "sum")
            .collect();
        // two complete periods of 3 days in 7, per employee
        assert_eq!(sums.len(), 2 * 2);
        assert!(sums.iter().all(|t| t.weight == 9));
    }
}
