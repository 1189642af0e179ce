//! Soft-bounded sum constraint over a boolean sequence.

use crate::data::SoftBounds;
use crate::model::{LinExpr, Lit, Model, PenaltyTerm, VarId};

const KIND: &str = "sum";

pub struct SoftSum {
    /// Integer equal to the number of true literals, within the hard bounds.
    pub sum: VarId,
    pub penalties: Vec<PenaltyTerm>,
}

/// Counts the true literals of `works`, forbids sums outside
/// `[hard_min, hard_max]` and charges the distance to the soft bounds.
pub fn add_soft_sum_constraint(
    model: &mut Model,
    works: &[Lit],
    bounds: &SoftBounds,
    prefix: &str,
) -> SoftSum {
    let len = works.len();
    let hard_min = bounds.hard_min as i64;
    let hard_max = bounds.hard_max.min(len).max(bounds.hard_min) as i64;
    let sum = model.new_sum(format!("{prefix}: sum"), &LinExpr::sum_lits(works.iter().copied()), hard_min, hard_max);
    let mut penalties = Vec::new();

    if bounds.soft_min > bounds.hard_min && bounds.min_cost > 0 {
        let deficit_expr = LinExpr::constant(bounds.soft_min as i64).with_term(sum, -1);
        let name = format!("{prefix}: under_sum");
        let deficit = model.new_positive_part(name.clone(), &deficit_expr);
        penalties.push(PenaltyTerm::int(deficit, bounds.min_cost, KIND, name));
    }

    if bounds.soft_max < bounds.hard_max && bounds.max_cost > 0 {
        let excess_expr = LinExpr::constant(-(bounds.soft_max as i64)).with_term(sum, 1);
        let name = format!("{prefix}: over_sum");
        let excess = model.new_positive_part(name.clone(), &excess_expr);
        penalties.push(PenaltyTerm::int(excess, bounds.max_cost, KIND, name));
    }

    SoftSum { sum, penalties }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Valuation;

    fn build(n: usize, bounds: SoftBounds) -> (Model, Vec<Lit>, SoftSum) {
        let mut model = Model::new();
        let works: Vec<Lit> = (0..n).map(|i| Lit::pos(model.new_bool(format!("w{i}")))).collect();
        let soft = add_soft_sum_constraint(&mut model, &works, &bounds, "week");
        model.add_penalties(soft.penalties.clone());
        (model, works, soft)
    }

    /// Cheapest objective over all completions of a fixed pattern.
    fn cheapest(model: &Model, pattern: &[i64]) -> Option<i64> {
        let n = model.vars().len();
        let mut best: Option<i64> = None;
        let mut values = pattern.to_vec();
        values.resize(n, 0);
        // auxiliary variables are small: enumerate 0..=7 for each of them
        let aux: Vec<usize> = (pattern.len()..n).collect();
        let combos = 8usize.pow(aux.len() as u32);
        for mut code in 0..combos {
            for &i in &aux {
                values[i] = (code % 8) as i64;
                code /= 8;
            }
            let valuation = Valuation::new(values.clone());
            if model.violations(&valuation).is_empty() {
                let cost = model.objective_value(&valuation);
                best = Some(best.map_or(cost, |b| b.min(cost)));
            }
        }
        best
    }

    #[test]
    fn test_degenerate_bounds_create_no_penalties() {
        let (_, _, soft) = build(7, SoftBounds::hard(2, 2));
        assert!(soft.penalties.is_empty());
    }

    #[test]
    fn test_deficit_and_excess_costs() {
        let bounds = SoftBounds {
            hard_min: 1,
            soft_min: 2,
            min_cost: 7,
            soft_max: 2,
            hard_max: 3,
            max_cost: 4,
        };
        let (model, _, soft) = build(4, bounds);
        assert_eq!(soft.penalties.len(), 2);
        assert_eq!(cheapest(&model, &[1, 1, 0, 0]), Some(0));
        assert_eq!(cheapest(&model, &[1, 0, 0, 0]), Some(7));
        assert_eq!(cheapest(&model, &[1, 1, 1, 0]), Some(4));
        assert_eq!(cheapest(&model, &[0, 0, 0, 0]), None);
        assert_eq!(cheapest(&model, &[1, 1, 1, 1]), None);
    }

    #[test]
    fn test_slack_covers_full_deficit() {
        let bounds = SoftBounds {
            hard_min: 0,
            soft_min: 5,
            min_cost: 1,
            soft_max: 5,
            hard_max: 5,
            max_cost: 0,
        };
        let (model, _, soft) = build(5, bounds);
        let deficit = match soft.penalties[0].source {
            crate::model::PenaltySource::Int(var) => var,
            _ => unreachable!(),
        };
        assert_eq!(model.var(deficit).domain.bounds(), (0, 5));
    }
}
