use super::Compiler;
use crate::data::DayPart;
use crate::model::{Cmp, LinExpr, Lit, PenaltyTerm};
use log::info;

impl Compiler<'_> {
    /// Rest windows, night clustering and the close-shift penalty ladder.
    ///
    /// The night window and the close-shift ladder can both fire on the same
    /// pair of days; the block and the penalty simply add up.
    pub(super) fn add_spacing(&mut self) {
        info!("Adding spacing constraints...");
        let registry = self.registry;
        let spacing = &registry.spacing;
        let slots = self.slots();
        let nights = registry.part_shifts(DayPart::Night);
        let mut penalties = Vec::new();

        for e in 0..registry.employees.len() {
            let id = self.employee_id(e).to_string();

            if spacing.rest_window >= 2 {
                for start in 0..(slots + 1).saturating_sub(spacing.rest_window) {
                    let lits: Vec<Lit> = (start..start + spacing.rest_window)
                        .map(|slot| self.works(e, slot))
                        .collect();
                    self.model()
                        .add_at_most_one(lits, format!("rest window [{id}, day {start}]"));
                }
            }

            if spacing.night_close_range > 0 && !nights.is_empty() {
                let window = spacing.night_close_range + 1;
                for start in 0..(slots + 1).saturating_sub(window) {
                    let mut expr = LinExpr::new();
                    for slot in start..start + window {
                        for &s in nights {
                            expr.add_lit(self.assign(e, slot, s), 1);
                        }
                    }
                    self.model()
                        .add(expr, Cmp::Le, 1, format!("night clustering [{id}, day {start}]"));
                }
            }

            for (gap, &weight) in spacing.close_shift_penalties.iter().enumerate() {
                if weight == 0 {
                    continue;
                }
                // works d, rests d+1..=d+gap, works d+gap+1
                for first in 0..slots.saturating_sub(gap + 1) {
                    let mut pattern = vec![self.works(e, first)];
                    pattern.extend((first + 1..=first + gap).map(|slot| !self.works(e, slot)));
                    pattern.push(self.works(e, first + gap + 1));
                    let name = format!("close shifts [{id}, day {first}, gap {gap}]");
                    let lit = Lit::pos(self.model().new_and(name.clone(), &pattern));
                    penalties.push(PenaltyTerm::lit(lit, weight, "close shifts", name));
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
    use crate::model::Valuation;
    use crate::registry::Registry;

    #[test]
    fn test_close_shift_ladder_literals() {
        let mut input = base_input();
        input.spacing.close_shift_penalties = vec![0, 30, 10];
        let registry = Registry::build(&input).unwrap();
        let roster = compile(&registry, Scope::Month);
        let close: Vec<_> = roster
            .model
            .objective()
            .iter()
            .filter(|t| t.kind == "close shifts")
            .collect();
        // gap 1 fits 5 times in 7 days, gap 2 fits 4 times; two employees
        assert_eq!(close.len(), 2 * (5 + 4));
        assert_eq!(close.iter().filter(|t| t.weight == 30).count(), 10);
    }

    #[test]
    fn test_rest_window_rows() {
        let mut input = base_input();
        input.spacing.rest_window = 2;
        let registry = Registry::build(&input).unwrap();
        let roster = compile(&registry, Scope::Month);
        let rows = roster
            .model
            .constraints()
            .iter()
            .filter(|c| c.label.starts_with("rest window"))
            .count();
        assert_eq!(rows, 2 * 6);
    }

    #[test]
    fn test_night_clustering_window() {
        let mut input = base_input();
        input.spacing.night_close_range = 2;
        let registry = Registry::build(&input).unwrap();
        let roster = compile(&registry, Scope::Month);
        let window = roster
            .model
            .constraints()
            .iter()
            .find(|c| c.label == "night clustering [P02, day 4]")
            .unwrap();
        let night = |day| roster.assignment(1, 2, day).unwrap();
        let mut values = vec![0; roster.model.vars().len()];
        values[night(4).index()] = 1;
        assert!(window.holds(&Valuation::new(values.clone())));
        values[night(6).index()] = 1;
        assert!(!window.holds(&Valuation::new(values)));
    }
}
