//! Soft-bounded run-length constraint over a boolean sequence.
//!
//! Every maximal run of true literals is checked against
//! `[hard_min, hard_max]` as a hard window and `[soft_min, soft_max]` as a
//! penalised one. A run that touches either end of the sequence has no
//! neighbour on that side; the missing neighbour behaves as "false".

use crate::data::SoftBounds;
use crate::model::{Lit, Model, PenaltyTerm};

const KIND: &str = "run length";

/// Literals whose disjunction is false exactly when `works[start..start + length]`
/// is an isolated run: the span is true and its existing neighbours are false.
pub fn negated_bounded_span(works: &[Lit], start: usize, length: usize) -> Vec<Lit> {
    let mut sequence = Vec::with_capacity(length + 2);
    if start > 0 {
        sequence.push(works[start - 1]);
    }
    sequence.extend(works[start..start + length].iter().map(|&lit| !lit));
    if start + length < works.len() {
        sequence.push(works[start + length]);
    }
    sequence
}

/// Adds the run-length rules for `works` and returns the penalty terms it
/// created; the caller merges them into the objective.
pub fn add_soft_sequence_constraint(
    model: &mut Model,
    works: &[Lit],
    bounds: &SoftBounds,
    prefix: &str,
) -> Vec<PenaltyTerm> {
    let len = works.len();
    let mut penalties = Vec::new();

    // forbid runs that are too short
    for length in 1..bounds.hard_min {
        for start in 0..(len + 1).saturating_sub(length) {
            model.add_bool_or(
                negated_bounded_span(works, start, length),
                format!("{prefix}: run shorter than {} at {start}", bounds.hard_min),
            );
        }
    }

    // penalise runs below the soft minimum
    if bounds.min_cost > 0 {
        for length in bounds.hard_min.max(1)..bounds.soft_min {
            for start in 0..(len + 1).saturating_sub(length) {
                let name = format!("{prefix}: under_span(start={start}, length={length})");
                let lit = Lit::pos(model.new_bool(name.clone()));
                let mut span = negated_bounded_span(works, start, length);
                span.push(lit);
                model.add_bool_or(span, name.clone());
                penalties.push(PenaltyTerm::lit(
                    lit,
                    bounds.min_cost * (bounds.soft_min - length) as i64,
                    KIND,
                    name,
                ));
            }
        }
    }

    // penalise runs above the soft maximum
    if bounds.max_cost > 0 {
        for length in (bounds.soft_max + 1)..=bounds.hard_max {
            for start in 0..(len + 1).saturating_sub(length) {
                let name = format!("{prefix}: over_span(start={start}, length={length})");
                let lit = Lit::pos(model.new_bool(name.clone()));
                let mut span = negated_bounded_span(works, start, length);
                span.push(lit);
                model.add_bool_or(span, name.clone());
                penalties.push(PenaltyTerm::lit(
                    lit,
                    bounds.max_cost * (length - bounds.soft_max) as i64,
                    KIND,
                    name,
                ));
            }
        }
    }

    // no run may reach hard_max + 1
    for start in 0..len.saturating_sub(bounds.hard_max) {
        model.add_bool_or(
            works[start..=start + bounds.hard_max].iter().map(|&lit| !lit),
            format!("{prefix}: run longer than {} at {start}", bounds.hard_max),
        );
    }

    penalties
}
