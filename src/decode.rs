//! Reads a solver valuation back into roster terms.

use crate::compiler::RosterModel;
use crate::data::{Assignment, Category, EmployeeTotals, RosterOutput, SolveStatus, UnmetSoftConstraint};
use crate::model::{Lit, PenaltySource, Valuation};
use crate::registry::Registry;
use log::{info, warn};

pub fn decode(
    registry: &Registry,
    roster: &RosterModel,
    valuation: &Valuation,
    status: SolveStatus,
) -> RosterOutput {
    let mut assignments = Vec::new();
    for (e, employee) in registry.employees.iter().enumerate() {
        for &day in &roster.days {
            for (s, shift) in registry.shifts.iter().enumerate() {
                if roster.is_assigned(valuation, e, s, day) {
                    assignments.push(Assignment {
                        day,
                        shift: shift.code.clone(),
                        employee: employee.id.clone(),
                    });
                }
            }
        }
    }
    assignments.sort();

    let realised = |e, category| {
        roster
            .count(e, category)
            .map_or(0, |var| valuation.value(var).max(0) as u32)
    };
    let totals = registry
        .employees
        .iter()
        .enumerate()
        .map(|(e, employee)| EmployeeTotals {
            employee: employee.id.clone(),
            total: realised(e, Category::Total),
            nights: realised(e, Category::Nights),
            holidays: realised(e, Category::Holidays),
            internal: realised(e, Category::Internal),
            virtual_days: roster.employees[e]
                .virtual_work
                .iter()
                .zip(&roster.days)
                .filter(|&(&var, _)| valuation.lit(Lit::pos(var)))
                .map(|(_, &day)| day)
                .collect(),
        })
        .collect();

    let unmet_soft_constraints: Vec<UnmetSoftConstraint> = roster
        .model
        .objective()
        .iter()
        .filter_map(|term| {
            let units = term.units(valuation);
            let cost = match term.source {
                // a reward that was not collected
                PenaltySource::Lit(_) if term.weight < 0 && units == 0 => -term.weight,
                _ if term.weight > 0 && units > 0 => term.weight * units,
                _ => return None,
            };
            Some(UnmetSoftConstraint {
                constraint_type: term.kind.to_string(),
                description: term.description.clone(),
                cost,
            })
        })
        .collect();

    let mut violations = roster.model.violations(valuation);
    for &(e, s, day) in &roster.blacklist {
        if roster.is_assigned(valuation, e, s, day) {
            violations.push(format!(
                "{} assigned blacklisted {} on day {day}",
                registry.employees[e].id, registry.shifts[s].code
            ));
        }
    }
    if !violations.is_empty() {
        warn!("Decoded roster violates {} hard constraints", violations.len());
    }

    let objective = roster.model.objective_value(valuation);
    info!(
        "Decoded {} assignments with objective {objective} and {} unmet soft constraints",
        assignments.len(),
        unmet_soft_constraints.len()
    );

    RosterOutput {
        status,
        objective: Some(objective),
        assignments,
        totals,
        unmet_soft_constraints,
        violations,
        day_diagnostics: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_support::base_input;
    use crate::compiler::{compile, Scope};
    use crate::data::ShiftRequest;

    #[test]
    fn test_decode_reports_assignments_and_forgone_rewards() {
        let mut input = base_input();
        input.requests = vec![
            ShiftRequest {
                employee: "P01".into(),
                shift: "A".into(),
                day: 0,
                weight: -4,
            },
            ShiftRequest {
                employee: "P02".into(),
                shift: "A".into(),
                day: 0,
                weight: 3,
            },
        ];
        let registry = Registry::build(&input).unwrap();
        let roster = compile(&registry, Scope::Day(0));
        let mut values = vec![0; roster.model.vars().len()];
        values[roster.assignment(1, 1, 0).unwrap().index()] = 1;
        values[roster.employees[1].works[0].index()] = 1;
        let output = decode(&registry, &roster, &Valuation::new(values), SolveStatus::Feasible);

        assert_eq!(
            output.assignments,
            vec![Assignment {
                day: 0,
                shift: "A".into(),
                employee: "P02".into(),
            }]
        );
        assert!(output.violations.is_empty());
        assert_eq!(output.objective, Some(3));
        let costs: Vec<(String, i64)> = output
            .unmet_soft_constraints
            .iter()
            .map(|u| (u.description.clone(), u.cost))
            .collect();
        assert_eq!(
            costs,
            vec![
                ("P01 wants A on day 0".to_string(), 4),
                ("P02 avoids A on day 0".to_string(), 3),
            ]
        );
        // single-day models carry no aggregate counts
        assert_eq!(output.totals[1].total, 0);
    }

    #[test]
    fn test_decode_flags_blacklisted_assignment() {
        let registry = Registry::build(&base_input()).unwrap();
        let roster = compile(&registry, Scope::Day(0));
        let mut values = vec![0; roster.model.vars().len()];
        // M is never demanded
        values[roster.assignment(0, 0, 0).unwrap().index()] = 1;
        let output = decode(&registry, &roster, &Valuation::new(values), SolveStatus::Feasible);
        assert!(output
            .violations
            .contains(&"P01 assigned blacklisted M on day 0".to_string()));
    }
}
