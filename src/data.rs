use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type EmployeeId = String;
pub type ShiftCode = String;
pub type Day = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Weekday {
        Self::ALL[index % 7]
    }

    pub fn is_weekend(self) -> bool {
        matches!(self, Weekday::Sat | Weekday::Sun)
    }
}

/// The three slices of a day every shift code falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DayPart {
    Morning,
    Afternoon,
    Night,
}

impl DayPart {
    pub const ALL: [DayPart; 3] = [DayPart::Morning, DayPart::Afternoon, DayPart::Night];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DayPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayPart::Morning => "morning",
            DayPart::Afternoon => "afternoon",
            DayPart::Night => "night",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ShiftCategory {
    Internal,
    #[default]
    External,
}

/// Per-employee aggregate counters tracked by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Total,
    Nights,
    Holidays,
    Internal,
    Virtual,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Total => "total",
            Category::Nights => "nights",
            Category::Holidays => "holidays",
            Category::Internal => "internal",
            Category::Virtual => "virtual",
        };
        f.write_str(name)
    }
}

/// One cell of an employee's day x day-part preference grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preference {
    #[default]
    Indifferent,
    WeakNegative,
    StrictNegative,
    WeakPositive,
    StrictPositive,
}

impl Preference {
    pub fn from_symbol(symbol: char) -> Option<Preference> {
        match symbol {
            '.' => Some(Preference::Indifferent),
            '-' => Some(Preference::WeakNegative),
            'x' => Some(Preference::StrictNegative),
            '+' => Some(Preference::WeakPositive),
            'o' => Some(Preference::StrictPositive),
            _ => None,
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Preference::WeakPositive | Preference::StrictPositive)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDef {
    pub month_days: usize,
    pub first_weekday: Weekday,
    /// 1-based day-of-month numbers.
    #[serde(default)]
    pub public_holidays: Vec<usize>,
    /// Whether the day before day 0 is a holiday.
    #[serde(default)]
    pub holiday_before: bool,
    /// Whether the day after the last day is a holiday.
    #[serde(default)]
    pub holiday_after: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftDef {
    pub code: ShiftCode,
    #[serde(default)]
    pub category: ShiftCategory,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPartPartition {
    #[serde(default)]
    pub morning: Vec<ShiftCode>,
    #[serde(default)]
    pub afternoon: Vec<ShiftCode>,
    #[serde(default)]
    pub night: Vec<ShiftCode>,
}

impl DayPartPartition {
    pub fn codes(&self, part: DayPart) -> &[ShiftCode] {
        match part {
            DayPart::Morning => &self.morning,
            DayPart::Afternoon => &self.afternoon,
            DayPart::Night => &self.night,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandDef {
    #[serde(default)]
    pub weekday_shifts: Vec<ShiftCode>,
    #[serde(default)]
    pub holiday_shifts: Vec<ShiftCode>,
    /// Rotating shift groups; empty means every shift is active every day.
    #[serde(default)]
    pub shift_groups: Vec<Vec<ShiftCode>>,
    #[serde(default)]
    pub group_phase: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDef {
    pub name: String,
    pub shifts: Vec<ShiftCode>,
    /// Shifts outside `shifts` that are tolerated at a cost.
    #[serde(default)]
    pub penalized_shifts: Vec<PenalizedShift>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PenalizedShift {
    pub code: ShiftCode,
    pub penalty: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDef {
    pub id: EmployeeId,
    pub level: String,
    pub min_shifts: u32,
    pub max_shifts: u32,
    #[serde(default)]
    pub virtual_shifts: u32,
    #[serde(default)]
    pub gift_shifts: u32,
    #[serde(default)]
    pub extra_nights: usize,
    /// One 3-character row per day: morning, afternoon, night.
    #[serde(default)]
    pub preferences: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpacingDef {
    /// At most one worked day in any window of this many days.
    pub rest_window: usize,
    /// At most one night in any `night_close_range + 1` consecutive days.
    pub night_close_range: usize,
    /// Entry i penalises exactly i rest days between two worked days.
    pub close_shift_penalties: Vec<i64>,
}

impl Default for SpacingDef {
    fn default() -> Self {
        Self {
            rest_window: 2,
            night_close_range: 0,
            close_shift_penalties: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferencePolicyDef {
    /// Number of night-only positive days that marks an employee as a night lover.
    pub night_lover_threshold: Option<usize>,
    pub night_lover_multiplier: i64,
}

impl Default for PreferencePolicyDef {
    fn default() -> Self {
        Self {
            night_lover_threshold: None,
            night_lover_multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Limit {
    pub soft: u32,
    pub hard: u32,
    pub penalty: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LadderRow {
    /// Bucket index this row applies to (see the category's policy).
    pub index: usize,
    /// Total-shift value this row applies to.
    pub total: u32,
    #[serde(default)]
    pub max: Option<Limit>,
    #[serde(default)]
    pub min: Option<Limit>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LadderDef {
    pub category: Category,
    pub rows: Vec<LadderRow>,
    /// Holidays only: a night on the eve of a holiday counts as a holiday shift.
    #[serde(default)]
    pub eve_nights: bool,
}

/// Bounds shared by the run-length and sum primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftBounds {
    pub hard_min: usize,
    pub soft_min: usize,
    pub min_cost: i64,
    pub soft_max: usize,
    pub hard_max: usize,
    pub max_cost: i64,
}

impl SoftBounds {
    pub fn hard(min: usize, max: usize) -> Self {
        Self {
            hard_min: min,
            soft_min: min,
            min_cost: 0,
            soft_max: max,
            hard_max: max,
            max_cost: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TargetDef {
    Work,
    Rest,
    DayPart { part: DayPart },
    Shifts { codes: Vec<ShiftCode> },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceRuleDef {
    pub target: TargetDef,
    #[serde(flatten)]
    pub bounds: SoftBounds,
}

fn default_period() -> usize {
    7
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SumRuleDef {
    pub target: TargetDef,
    #[serde(default = "default_period")]
    pub period_days: usize,
    #[serde(flatten)]
    pub bounds: SoftBounds,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedAssignment {
    pub employee: EmployeeId,
    pub shift: ShiftCode,
    pub day: Day,
}

/// A negative weight means the employee wants the assignment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRequest {
    pub employee: EmployeeId,
    pub shift: ShiftCode,
    pub day: Day,
    pub weight: i64,
}

/// Penalty 0 forbids the transition.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionDef {
    pub from: ShiftCode,
    pub to: ShiftCode,
    pub penalty: i64,
}

/// The complete input for one month.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterInput {
    pub calendar: CalendarDef,
    pub shifts: Vec<ShiftDef>,
    pub day_parts: DayPartPartition,
    pub demand: DemandDef,
    pub levels: Vec<LevelDef>,
    pub employees: Vec<EmployeeDef>,
    #[serde(default)]
    pub spacing: SpacingDef,
    #[serde(default)]
    pub preference_policy: PreferencePolicyDef,
    #[serde(default)]
    pub ladders: Vec<LadderDef>,
    #[serde(default)]
    pub sequence_rules: Vec<SequenceRuleDef>,
    #[serde(default)]
    pub sum_rules: Vec<SumRuleDef>,
    #[serde(default)]
    pub fixed_assignments: Vec<FixedAssignment>,
    #[serde(default)]
    pub requests: Vec<ShiftRequest>,
    #[serde(default)]
    pub transitions: Vec<TransitionDef>,
}

impl RosterInput {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

impl SolveStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// Represents a single rostered shift.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub day: Day,
    pub shift: ShiftCode,
    pub employee: EmployeeId,
}

/// Realised per-employee counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeTotals {
    pub employee: EmployeeId,
    pub total: u32,
    pub nights: u32,
    pub holidays: u32,
    pub internal: u32,
    pub virtual_days: Vec<Day>,
}

/// Describes a soft constraint that was not met in the final roster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetSoftConstraint {
    pub constraint_type: String,
    pub description: String,
    pub cost: i64,
}

impl fmt::Display for UnmetSoftConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (cost {})", self.constraint_type, self.description, self.cost)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayDiagnostic {
    pub day: Day,
    pub weekday: Weekday,
    pub holiday: bool,
    pub status: SolveStatus,
}

/// The final output of the solver.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterOutput {
    pub status: SolveStatus,
    pub objective: Option<i64>,
    pub assignments: Vec<Assignment>,
    pub totals: Vec<EmployeeTotals>,
    pub unmet_soft_constraints: Vec<UnmetSoftConstraint>,
    /// Hard-constraint re-check against the returned valuation; empty when sound.
    pub violations: Vec<String>,
    pub day_diagnostics: Vec<DayDiagnostic>,
}

impl RosterOutput {
    pub fn without_solution(status: SolveStatus, day_diagnostics: Vec<DayDiagnostic>) -> Self {
        Self {
            status,
            objective: None,
            assignments: Vec::new(),
            totals: Vec::new(),
            unmet_soft_constraints: Vec::new(),
            violations: Vec::new(),
            day_diagnostics,
        }
    }
}
