use crate::compiler::{compile, Scope};
use crate::config::SolverSettings;
use crate::data::{RosterInput, RosterOutput, SolveStatus};
use crate::decode::decode;
use crate::error::Result;
use crate::fallback::diagnose_days;
use crate::model::{Cmp, Domain, LinExpr, Lit, Model, PenaltySource, Valuation};
use crate::registry::Registry;
use good_lp::solvers::SolutionStatus;
use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use log::{info, trace, warn};
use std::time::Instant;

/// Status and, when the solver found one, the value of every model variable.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub valuation: Option<Valuation>,
}

fn lower_terms(expr: &LinExpr, vars: &[Variable]) -> Expression {
    expr.terms()
        .iter()
        .map(|&(var, coef)| coef as f64 * vars[var.index()])
        .sum()
}

fn lower(expr: &LinExpr, vars: &[Variable]) -> Expression {
    lower_terms(expr, vars) + expr.constant_part() as f64
}

fn lower_lit(lit: Lit, vars: &[Variable]) -> Expression {
    lower(&LinExpr::new().with_lit(lit, 1), vars)
}

/// Hands `model` to HiGHS and reads the valuation back.
pub fn solve_model(model: &Model, settings: &SolverSettings) -> SolveOutcome {
    let start_time = Instant::now();
    let mut problem = ProblemVariables::new();
    let vars: Vec<Variable> = model
        .vars()
        .iter()
        .map(|def| {
            let definition = match def.domain {
                Domain::Bool => variable().binary(),
                Domain::Int { min, max } => variable().integer().min(min as f64).max(max as f64),
            };
            problem.add(definition.name(def.name.clone()))
        })
        .collect();

    let objective: Expression = model
        .objective()
        .iter()
        .map(|term| {
            let units = match term.source {
                PenaltySource::Lit(lit) => lower_lit(lit, &vars),
                PenaltySource::Int(var) => 1.0 * vars[var.index()],
            };
            term.weight as f64 * units
        })
        .sum();

    let mut solver = problem
        .minimise(objective)
        .using(default_solver)
        .set_option("threads", settings.threads)
        .set_option("random_seed", settings.random_seed)
        .set_option("output_flag", settings.log_to_console)
        .set_option("log_to_console", settings.log_to_console);
    if let Some(limit) = settings.time_limit_secs {
        solver = solver.set_option("time_limit", limit);
    }

    for c in model.constraints() {
        let lhs = lower_terms(&c.expr, &vars);
        let rhs = (c.rhs - c.expr.constant_part()) as f64;
        let lowered = match c.cmp {
            Cmp::Le => constraint!(lhs <= rhs),
            Cmp::Ge => constraint!(lhs >= rhs),
            Cmp::Eq => constraint!(lhs == rhs),
        };
        solver.add_constraint(lowered);
    }
    trace!("Lowered {} constraints onto HiGHS", model.constraints().len());

    info!("Starting ILP solver...");
    let outcome = match solver.solve() {
        Ok(solution) => {
            let status = match solution.status() {
                SolutionStatus::Optimal => SolveStatus::Optimal,
                _ => SolveStatus::Feasible,
            };
            let values = vars
                .iter()
                .map(|&var| solution.value(var).round() as i64)
                .collect();
            SolveOutcome {
                status,
                valuation: Some(Valuation::new(values)),
            }
        }
        Err(ResolutionError::Infeasible) => SolveOutcome {
            status: SolveStatus::Infeasible,
            valuation: None,
        },
        Err(e) => {
            warn!("Solver stopped without a solution: {e}");
            SolveOutcome {
                status: SolveStatus::Unknown,
                valuation: None,
            }
        }
    };
    info!("Solver finished with {:?} in {:.2?}", outcome.status, start_time.elapsed());
    outcome
}

/// Validates `input`, solves the month and decodes the roster. An infeasible
/// month is an answer, not an error: it comes back with per-day diagnostics.
pub fn solve(input: &RosterInput, settings: &SolverSettings) -> Result<RosterOutput> {
    let registry = Registry::build(input)?;
    Ok(solve_registry(&registry, settings))
}

pub fn solve_registry(registry: &Registry, settings: &SolverSettings) -> RosterOutput {
    let roster = compile(registry, Scope::Month);
    let outcome = solve_model(&roster.model, settings);
    match outcome.valuation {
        Some(valuation) if outcome.status.has_solution() => {
            decode(registry, &roster, &valuation, outcome.status)
        }
        _ => {
            warn!("No roster found for the month ({:?})", outcome.status);
            let diagnostics = if settings.run_fallback {
                diagnose_days(registry, settings)
            } else {
                Vec::new()
            };
            RosterOutput::without_solution(outcome.status, diagnostics)
        }
    }
}
