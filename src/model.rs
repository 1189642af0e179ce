//! Solver-neutral 0/1 + bounded-integer linear model.
//!
//! The compiler writes into a [`Model`]; the solver adapter lowers it onto the
//! MIP backend. Boolean logic (clauses, exactly-one, reification) is expressed
//! as linear rows over 0/1 variables so the same model can be re-checked
//! against any returned [`Valuation`].

use std::fmt;
use std::ops::Not;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Bool,
    Int { min: i64, max: i64 },
}

impl Domain {
    pub fn bounds(self) -> (i64, i64) {
        match self {
            Domain::Bool => (0, 1),
            Domain::Int { min, max } => (min, max),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub domain: Domain,
}

/// A 0/1 variable or its negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit {
    var: VarId,
    negated: bool,
}

impl Lit {
    pub fn pos(var: VarId) -> Self {
        Self { var, negated: false }
    }

    pub fn neg(var: VarId) -> Self {
        Self { var, negated: true }
    }

    pub fn var(self) -> VarId {
        self.var
    }
}

impl From<VarId> for Lit {
    fn from(var: VarId) -> Self {
        Lit::pos(var)
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit {
            var: self.var,
            negated: !self.negated,
        }
    }
}

/// `sum(coef * var) + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(VarId, i64)>,
    constant: i64,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn sum_vars<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        let mut expr = Self::new();
        for var in vars {
            expr.add_term(var, 1);
        }
        expr
    }

    pub fn sum_lits<I: IntoIterator<Item = Lit>>(lits: I) -> Self {
        let mut expr = Self::new();
        for lit in lits {
            expr.add_lit(lit, 1);
        }
        expr
    }

    pub fn add_term(&mut self, var: VarId, coef: i64) -> &mut Self {
        if coef != 0 {
            self.terms.push((var, coef));
        }
        self
    }

    /// A negated literal contributes `coef * (1 - var)`.
    pub fn add_lit(&mut self, lit: Lit, coef: i64) -> &mut Self {
        if lit.negated {
            self.constant += coef;
            self.add_term(lit.var, -coef)
        } else {
            self.add_term(lit.var, coef)
        }
    }

    pub fn add_constant(&mut self, value: i64) -> &mut Self {
        self.constant += value;
        self
    }

    pub fn with_term(mut self, var: VarId, coef: i64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn with_lit(mut self, lit: Lit, coef: i64) -> Self {
        self.add_lit(lit, coef);
        self
    }

    pub fn terms(&self) -> &[(VarId, i64)] {
        &self.terms
    }

    pub fn constant_part(&self) -> i64 {
        self.constant
    }

    pub fn eval(&self, valuation: &Valuation) -> i64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * valuation.value(var))
            .sum::<i64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Le,
    Ge,
    Eq,
}

#[derive(Debug, Clone)]
pub struct LinConstraint {
    pub expr: LinExpr,
    pub cmp: Cmp,
    pub rhs: i64,
    pub label: String,
}

impl LinConstraint {
    pub fn holds(&self, valuation: &Valuation) -> bool {
        let lhs = self.expr.eval(valuation);
        match self.cmp {
            Cmp::Le => lhs <= self.rhs,
            Cmp::Ge => lhs >= self.rhs,
            Cmp::Eq => lhs == self.rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltySource {
    /// Pays `weight` when the literal is true.
    Lit(Lit),
    /// Pays `weight` per unit of the integer variable.
    Int(VarId),
}

/// One weighted term of the minimisation objective.
#[derive(Debug, Clone)]
pub struct PenaltyTerm {
    pub source: PenaltySource,
    pub weight: i64,
    pub kind: &'static str,
    pub description: String,
}

impl PenaltyTerm {
    pub fn lit(lit: Lit, weight: i64, kind: &'static str, description: String) -> Self {
        Self {
            source: PenaltySource::Lit(lit),
            weight,
            kind,
            description,
        }
    }

    pub fn int(var: VarId, weight: i64, kind: &'static str, description: String) -> Self {
        Self {
            source: PenaltySource::Int(var),
            weight,
            kind,
            description,
        }
    }

    /// Number of units this term is charged for under `valuation`.
    pub fn units(&self, valuation: &Valuation) -> i64 {
        match self.source {
            PenaltySource::Lit(lit) => valuation.lit(lit) as i64,
            PenaltySource::Int(var) => valuation.value(var),
        }
    }
}

/// Values for every variable of a model, indexed by [`VarId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Valuation(Vec<i64>);

impl Valuation {
    pub fn new(values: Vec<i64>) -> Self {
        Self(values)
    }

    pub fn value(&self, var: VarId) -> i64 {
        self.0[var.0]
    }

    pub fn lit(&self, lit: Lit) -> bool {
        (self.value(lit.var) != 0) != lit.negated
    }
}

#[derive(Debug, Default)]
pub struct Model {
    vars: Vec<VarDef>,
    constraints: Vec<LinConstraint>,
    objective: Vec<PenaltyTerm>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn constraints(&self) -> &[LinConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[PenaltyTerm] {
        &self.objective
    }

    pub fn var(&self, id: VarId) -> &VarDef {
        &self.vars[id.0]
    }

    pub fn new_bool(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), Domain::Bool)
    }

    pub fn new_int(&mut self, name: impl Into<String>, min: i64, max: i64) -> VarId {
        self.push_var(name.into(), Domain::Int { min, max })
    }

    fn push_var(&mut self, name: String, domain: Domain) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VarDef { name, domain });
        id
    }

    pub fn add(&mut self, expr: LinExpr, cmp: Cmp, rhs: i64, label: impl Into<String>) {
        self.constraints.push(LinConstraint {
            expr,
            cmp,
            rhs,
            label: label.into(),
        });
    }

    /// At least one literal holds. An empty clause makes the model infeasible.
    pub fn add_bool_or<I: IntoIterator<Item = Lit>>(&mut self, lits: I, label: impl Into<String>) {
        self.add(LinExpr::sum_lits(lits), Cmp::Ge, 1, label);
    }

    pub fn add_exactly_one<I: IntoIterator<Item = Lit>>(&mut self, lits: I, label: impl Into<String>) {
        self.add(LinExpr::sum_lits(lits), Cmp::Eq, 1, label);
    }

    pub fn add_at_most_one<I: IntoIterator<Item = Lit>>(&mut self, lits: I, label: impl Into<String>) {
        self.add(LinExpr::sum_lits(lits), Cmp::Le, 1, label);
    }

    pub fn fix(&mut self, lit: Lit, value: bool, label: impl Into<String>) {
        self.add(LinExpr::sum_lits([lit]), Cmp::Eq, value as i64, label);
    }

    /// `a => b`
    pub fn add_implication(&mut self, a: Lit, b: Lit, label: impl Into<String>) {
        let expr = LinExpr::new().with_lit(a, 1).with_lit(b, -1);
        self.add(expr, Cmp::Le, 0, label);
    }

    /// `target <=> AND(lits)`; an empty conjunction is true.
    pub fn reify_and(&mut self, target: VarId, lits: &[Lit], label: &str) {
        for &lit in lits {
            self.add_implication(Lit::pos(target), lit, label);
        }
        let mut expr = LinExpr::new().with_term(target, 1);
        for &lit in lits {
            expr.add_lit(lit, -1);
        }
        self.add(expr, Cmp::Ge, 1 - lits.len() as i64, label);
    }

    /// `target <=> OR(lits)`; an empty disjunction is false.
    pub fn reify_or(&mut self, target: VarId, lits: &[Lit], label: &str) {
        for &lit in lits {
            self.add_implication(lit, Lit::pos(target), label);
        }
        let mut expr = LinExpr::new().with_term(target, 1);
        for &lit in lits {
            expr.add_lit(lit, -1);
        }
        self.add(expr, Cmp::Le, 0, label);
    }

    pub fn new_and(&mut self, name: impl Into<String>, lits: &[Lit]) -> VarId {
        let name = name.into();
        let target = self.new_bool(name.clone());
        self.reify_and(target, lits, &name);
        target
    }

    pub fn new_or(&mut self, name: impl Into<String>, lits: &[Lit]) -> VarId {
        let name = name.into();
        let target = self.new_bool(name.clone());
        self.reify_or(target, lits, &name);
        target
    }

    /// Tightest `[min, max]` interval of `expr` under the variable domains.
    pub fn bounds(&self, expr: &LinExpr) -> (i64, i64) {
        let mut lo = expr.constant;
        let mut hi = expr.constant;
        for &(var, coef) in &expr.terms {
            let (min, max) = self.vars[var.0].domain.bounds();
            if coef >= 0 {
                lo += coef * min;
                hi += coef * max;
            } else {
                lo += coef * max;
                hi += coef * min;
            }
        }
        (lo, hi)
    }

    /// `target <=> expr > k`, with big-M coefficients taken from the domains.
    pub fn reify_greater_than(&mut self, target: VarId, expr: &LinExpr, k: i64, label: &str) {
        let (lo, hi) = self.bounds(expr);
        if k < lo {
            self.fix(Lit::pos(target), true, label);
            return;
        }
        if k >= hi {
            self.fix(Lit::pos(target), false, label);
            return;
        }
        // target = 1 => expr >= k + 1
        let upward = expr.clone().with_term(target, -(k + 1 - lo));
        self.add(upward, Cmp::Ge, lo, label);
        // target = 0 => expr <= k
        let downward = expr.clone().with_term(target, -(hi - k));
        self.add(downward, Cmp::Le, k, label);
    }

    /// Integer variable constrained to equal `expr`.
    pub fn new_sum(&mut self, name: impl Into<String>, expr: &LinExpr, min: i64, max: i64) -> VarId {
        let name = name.into();
        let var = self.new_int(name.clone(), min, max);
        self.add(expr.clone().with_term(var, -1), Cmp::Eq, 0, name);
        var
    }

    /// Integer variable equal to `max(0, expr)`, exact rather than relaxed.
    pub fn new_positive_part(&mut self, name: impl Into<String>, expr: &LinExpr) -> VarId {
        let name = name.into();
        let (lo, hi) = self.bounds(expr);
        if hi <= 0 {
            return self.new_int(name, 0, 0);
        }
        if lo >= 0 {
            return self.new_sum(name, expr, lo, hi);
        }
        let slack = self.new_int(name.clone(), 0, hi);
        let positive = self.new_bool(format!("{name}: positive"));
        // slack >= expr
        self.add(expr.clone().with_term(slack, -1), Cmp::Le, 0, name.clone());
        // positive = 0 => slack <= expr - lo, i.e. slack <= expr once positive
        let mut tight = LinExpr::new().with_term(slack, 1).with_term(positive, -lo);
        for &(var, coef) in expr.terms() {
            tight.add_term(var, -coef);
        }
        self.add(tight, Cmp::Le, expr.constant - lo, name.clone());
        // positive = 0 => slack = 0
        let off = LinExpr::new().with_term(slack, 1).with_term(positive, -hi);
        self.add(off, Cmp::Le, 0, name);
        slack
    }

    pub fn add_penalty(&mut self, term: PenaltyTerm) {
        self.objective.push(term);
    }

    pub fn add_penalties<I: IntoIterator<Item = PenaltyTerm>>(&mut self, terms: I) {
        self.objective.extend(terms);
    }

    pub fn objective_value(&self, valuation: &Valuation) -> i64 {
        self.objective
            .iter()
            .map(|term| term.weight * term.units(valuation))
            .sum()
    }

    /// Labels of every domain or constraint violated by `valuation`.
    pub fn violations(&self, valuation: &Valuation) -> Vec<String> {
        let mut violated = Vec::new();
        for (i, def) in self.vars.iter().enumerate() {
            let (min, max) = def.domain.bounds();
            let value = valuation.0[i];
            if value < min || value > max {
                violated.push(format!("{} = {value} outside [{min}, {max}]", def.name));
            }
        }
        violated.extend(
            self.constraints
                .iter()
                .filter(|c| !c.holds(valuation))
                .map(|c| c.label.clone()),
        );
        violated
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} variables, {} constraints, {} objective terms",
            self.vars.len(),
            self.constraints.len(),
            self.objective.len()
        )
    }
}
