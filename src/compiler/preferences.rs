use super::Compiler;
use crate::data::{DayPart, Preference};
use crate::model::{Lit, PenaltyTerm};
use crate::registry::{Employee, PreferencePolicy};
use log::{debug, info};

const KIND: &str = "weak preference";

/// Cost of one unmet weak preference. Employees who mark most of their month
/// have few flexible cells left, so each of their marks weighs more.
pub fn weak_weight(employee: &Employee, days: usize) -> i64 {
    let marked = employee
        .grid
        .iter()
        .flatten()
        .filter(|&&p| p != Preference::Indifferent)
        .count();
    let flexible = (3 * days).saturating_sub(marked) / 3;
    (flexible / 2).max(1) as i64
}

/// Days whose only mark is a positive one on the night.
pub fn night_loving_days(employee: &Employee) -> usize {
    employee
        .grid
        .iter()
        .filter(|row| {
            row[DayPart::Night.index()].is_positive()
                && row[DayPart::Morning.index()] == Preference::Indifferent
                && row[DayPart::Afternoon.index()] == Preference::Indifferent
        })
        .count()
}

pub fn is_night_lover(employee: &Employee, policy: &PreferencePolicy) -> bool {
    policy
        .night_lover_threshold
        .is_some_and(|threshold| night_loving_days(employee) >= threshold)
}

impl Compiler<'_> {
    pub(super) fn add_preferences(&mut self) {
        info!("Adding preference constraints...");
        let registry = self.registry;
        let month_days = registry.calendar.month_days();
        let mut penalties = Vec::new();

        for (e, employee) in registry.employees.iter().enumerate() {
            let weight = weak_weight(employee, month_days);
            let night_lover = is_night_lover(employee, &registry.preference_policy);
            if night_lover {
                debug!("{} prefers nights", employee.id);
            }

            for (slot, day) in self.roster.days.clone().into_iter().enumerate() {
                for part in DayPart::ALL {
                    let preference = employee.preference(day, part);
                    if preference == Preference::Indifferent {
                        continue;
                    }
                    let lits: Vec<Lit> = registry
                        .part_shifts(part)
                        .iter()
                        .map(|&s| self.assign(e, slot, s))
                        .collect();
                    let cell = format!("{} {part} on day {day}", employee.id);
                    match preference {
                        Preference::StrictPositive => {
                            self.model()
                                .add_exactly_one(lits, format!("{cell} must be worked"));
                        }
                        Preference::StrictNegative => {
                            for lit in lits {
                                self.model().fix(lit, false, format!("{cell} must not be worked"));
                            }
                            if part == DayPart::Night {
                                let virtual_work =
                                    Lit::pos(self.roster.employees[e].virtual_work[slot]);
                                self.model().fix(
                                    virtual_work,
                                    false,
                                    format!("{cell} must not be worked (virtual)"),
                                );
                            }
                        }
                        Preference::WeakNegative => {
                            let name = format!("{cell} prefers not to work");
                            let lit = Lit::pos(self.model().new_or(name.clone(), &lits));
                            penalties.push(PenaltyTerm::lit(lit, weight, KIND, name));
                        }
                        Preference::WeakPositive => {
                            let reward = if night_lover && part == DayPart::Night {
                                weight * registry.preference_policy.night_lover_multiplier
                            } else {
                                weight
                            };
                            let name = format!("{cell} prefers to work");
                            let lit = Lit::pos(self.model().new_or(name.clone(), &lits));
                            penalties.push(PenaltyTerm::lit(lit, -reward, KIND, name));
                        }
                        Preference::Indifferent => {}
                    }
                }
            }
        }
        self.model().add_penalties(penalties);
    }
}
