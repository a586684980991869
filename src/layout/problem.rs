//! Numeric problem handed to the optimizer
//!
//! Variables form one flat vector; each allocated object owns four
//! consecutive slots `[x1, y1, x2, y2]`. Constraints are linear rows over that
//! vector: equalities mean `row = 0`, inequalities mean `row >= 0`.

use std::collections::BTreeMap;
use std::fmt;

/// `sum(coefficient * x[index]) + constant`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRow {
    /// Sorted by variable index, no duplicates, no zero coefficients
    pub terms: Vec<(usize, f64)>,
    pub constant: f64,
    /// Human-readable origin, used in diagnostics and warnings
    pub label: String,
}

impl LinearRow {
    /// Build a row, merging repeated variables and dropping cancelled ones
    pub fn new(
        terms: impl IntoIterator<Item = (usize, f64)>,
        constant: f64,
        label: impl Into<String>,
    ) -> Self {
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for (index, coefficient) in terms {
            *merged.entry(index).or_insert(0.0) += coefficient;
        }
        Self {
            terms: merged.into_iter().filter(|(_, c)| *c != 0.0).collect(),
            constant,
            label: label.into(),
        }
    }

    /// Evaluate at `x`
    pub fn eval(&self, x: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(i, c)| c * x[i])
            .sum::<f64>()
            + self.constant
    }

    /// Coefficient of variable `index`, zero when absent
    pub fn coefficient(&self, index: usize) -> f64 {
        self.terms
            .binary_search_by_key(&index, |&(i, _)| i)
            .map(|pos| self.terms[pos].1)
            .unwrap_or(0.0)
    }

    /// Rows without variables are decided by their constant alone
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }
}

impl fmt::Display for LinearRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Whether a row must be zero or non-negative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Equality,
    Inequality,
}

impl RowKind {
    /// Amount by which `value` misses this kind of row
    pub fn violation(&self, value: f64) -> f64 {
        match self {
            RowKind::Equality => value.abs(),
            RowKind::Inequality => (-value).max(0.0),
        }
    }
}

/// Total projected area: `sum((x2 - x1) * (y2 - y1))` over every allocated
/// polygon and instance
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AreaObjective {
    /// Base index of each box in the variable vector
    pub boxes: Vec<usize>,
}

impl AreaObjective {
    pub fn value(&self, x: &[f64]) -> f64 {
        self.boxes
            .iter()
            .map(|&b| (x[b + 2] - x[b]) * (x[b + 3] - x[b + 1]))
            .sum()
    }

    /// Partial derivatives of [AreaObjective::value] at `x`
    pub fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut g = vec![0.0; x.len()];
        for &b in &self.boxes {
            let w = x[b + 2] - x[b];
            let h = x[b + 3] - x[b + 1];
            g[b] -= h;
            g[b + 2] += h;
            g[b + 1] -= w;
            g[b + 3] += w;
        }
        g
    }
}

/// A complete optimization problem
#[derive(Debug, Clone, Default)]
pub struct Problem {
    pub num_vars: usize,
    pub equalities: Vec<LinearRow>,
    pub inequalities: Vec<LinearRow>,
    pub objective: AreaObjective,
    /// Cell boxes: constrained like any object but outside the objective,
    /// since propagation overwrites them with the tight box of their children
    pub containers: Vec<usize>,
    /// Starting point for the optimizer
    pub initial: Vec<f64>,
}

impl Problem {
    /// Every row with its kind, equalities first
    pub fn rows(&self) -> impl Iterator<Item = (RowKind, &LinearRow)> {
        self.equalities
            .iter()
            .map(|r| (RowKind::Equality, r))
            .chain(self.inequalities.iter().map(|r| (RowKind::Inequality, r)))
    }

    /// Sum of all row violations at `x`, ignoring anything within `tolerance`
    pub fn total_violation(&self, x: &[f64], tolerance: f64) -> f64 {
        self.rows()
            .map(|(kind, row)| kind.violation(row.eval(x)))
            .filter(|v| *v > tolerance)
            .sum()
    }

    /// Rows violated by more than `tolerance` at `x`
    pub fn violated(&self, x: &[f64], tolerance: f64) -> Vec<(RowKind, &LinearRow)> {
        self.rows()
            .filter(|(kind, row)| kind.violation(row.eval(x)) > tolerance)
            .collect()
    }

    pub fn is_satisfied(&self, x: &[f64], tolerance: f64) -> bool {
        self.rows()
            .all(|(kind, row)| kind.violation(row.eval(x)) <= tolerance)
    }
}

/// Result of one optimizer call
#[derive(Debug, Clone, PartialEq)]
pub struct Optimization {
    pub success: bool,
    /// Assignment for every variable; meaningful only on success
    pub x: Vec<f64>,
    /// Diagnostic text, empty on success
    pub message: String,
}

impl Optimization {
    pub fn solved(x: Vec<f64>) -> Self {
        Self {
            success: true,
            x,
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            x: Vec::new(),
            message: message.into(),
        }
    }
}

/// External numeric optimizer.
///
/// Implementations minimize `problem.objective` subject to every row,
/// starting from `problem.initial`. The call blocks; failure is reported in
/// the returned [Optimization], never retried.
pub trait Optimizer {
    fn minimize(&self, problem: &Problem) -> Optimization;
}
