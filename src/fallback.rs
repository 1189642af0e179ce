//! Per-day feasibility report for a month that has no roster.
//!
//! Each day is compiled on its own, without any multi-day rule, and solved
//! independently. A day that is feasible here may still be part of an
//! infeasible month; the report only narrows down where to look.

use crate::compiler::{compile, Scope};
use crate::config::SolverSettings;
use crate::data::DayDiagnostic;
use crate::registry::Registry;
use crate::solver::solve_model;
use log::{info, warn};

pub fn diagnose_days(registry: &Registry, settings: &SolverSettings) -> Vec<DayDiagnostic> {
    info!("Running per-day fallback over {} days...", registry.calendar.month_days());
    let calendar = &registry.calendar;
    registry
        .calendar
        .days()
        .map(|day| {
            let roster = compile(registry, Scope::Day(day));
            let status = solve_model(&roster.model, settings).status;
            if status.has_solution() {
                info!("Day {day}: {status:?}");
            } else {
                warn!("Day {day}: {status:?}");
            }
            DayDiagnostic {
                day,
                weekday: calendar.weekday(day),
                holiday: calendar.is_holiday_day(day),
                status,
            }
        })
        .collect()
}
