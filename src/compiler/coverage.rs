use super::Compiler;
use crate::model::{Lit, PenaltyTerm};
use crate::registry::Capability;
use log::info;

impl Compiler<'_> {
    /// Exactly one assignee per demanded slot; everything else is forced off.
    pub(super) fn add_coverage(&mut self) {
        info!("Adding coverage constraints...");
        let registry = self.registry;
        let employees = registry.employees.len();
        for (slot, day) in self.roster.days.clone().into_iter().enumerate() {
            let demanded = registry.demand.demanded(&registry.calendar, day);
            for (s, shift) in registry.shifts.iter().enumerate() {
                if demanded.contains(&s) {
                    let lits: Vec<Lit> = (0..employees).map(|e| self.assign(e, slot, s)).collect();
                    self.model()
                        .add_exactly_one(lits, format!("cover {} on day {day}", shift.code));
                    continue;
                }
                for e in 0..employees {
                    let lit = self.assign(e, slot, s);
                    self.model()
                        .fix(lit, false, format!("{} not demanded on day {day}", shift.code));
                    self.roster.blacklist.insert((e, s, day));
                }
            }
        }
    }

    /// Shifts outside an employee's level are forbidden, unless the level
    /// tolerates them at a cost.
    pub(super) fn add_capability(&mut self) {
        info!("Adding capability constraints...");
        let registry = self.registry;
        let mut penalties = Vec::new();
        for (e, employee) in registry.employees.iter().enumerate() {
            let level = registry.level_of(e);
            for (s, shift) in registry.shifts.iter().enumerate() {
                let capability = level.capability(s);
                if capability == Capability::Allowed {
                    continue;
                }
                for (slot, day) in self.roster.days.clone().into_iter().enumerate() {
                    if self.roster.blacklist.contains(&(e, s, day)) {
                        continue;
                    }
                    let lit = self.assign(e, slot, s);
                    match capability {
                        Capability::Penalized(weight) => penalties.push(PenaltyTerm::lit(
                            lit,
                            weight,
                            "capability",
                            format!(
                                "{} works {} on day {day} outside level {}",
                                employee.id, shift.code, level.name
                            ),
                        )),
                        _ => {
                            self.model().fix(
                                lit,
                                false,
                                format!("{} not qualified for {}", employee.id, shift.code),
                            );
                            self.roster.blacklist.insert((e, s, day));
                        }
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
    use crate::data::PenalizedShift;
    use crate::model::PenaltySource;
    use crate::registry::Registry;

    #[test]
    fn test_penalized_capability_emits_literal_instead_of_blacklist() {
        let mut input = base_input();
        input.levels[0].penalized_shifts = vec![PenalizedShift {
            code: "N".into(),
            penalty: 40,
        }];
        let registry = Registry::build(&input).unwrap();
        let roster = compile(&registry, Scope::Month);
        // N is demanded on the weekend only: two penalised slots for P01.
        let terms: Vec<_> = roster
            .model
            .objective()
            .iter()
            .filter(|t| t.kind == "capability")
            .collect();
        assert_eq!(terms.len(), 2);
        assert!(terms.iter().all(|t| t.weight == 40));
        let saturday = roster.assignment(0, 2, 5).unwrap();
        assert!(terms
            .iter()
            .any(|t| t.source == PenaltySource::Lit(saturday.into())));
        assert!(!roster.blacklist.contains(&(0, 2, 5)));
        assert!(roster.blacklist.contains(&(0, 2, 0)));
    }
}
