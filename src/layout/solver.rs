//! Constraint solver integration for the default optimizer
//!
//! This module provides a wrapper around the kasuari Cassowary constraint
//! solver. Every row becomes a required constraint. Cassowary only minimizes
//! weighted linear errors, so the area objective is handled by successive
//! linearization: each pass pulls every extent towards zero with a strength
//! proportional to the area gradient at the previous point (a width is
//! weighted by its box's height and the reverse), then re-solves from scratch.
//! Passes stop once the weights settle, and the smallest-area feasible point
//! wins. Cell boxes stay outside the objective and only get a weak pull.
//!
//! Min corners are weakly anchored to the initial guess. Anchor weights
//! decrease with allocation order so that ties between anchors resolve the
//! same way on every run.
//!
//! Extents also prefer, at strong strength, to be at least one grid unit. With
//! integer constants the optimum is then a lattice point, and plain rounding
//! in the corrector keeps it.

use std::collections::HashMap;

use kasuari::{
    Expression, Solver as KasuariSolver, Strength, Term, Variable as KasuariVariable,
    WeightedRelation::*,
};
use log::debug;
use thiserror::Error;

use super::problem::{AreaObjective, LinearRow, Optimization, Optimizer, Problem};

/// Smallest extent representable on the integer grid
const GRID_UNIT: f64 = 1.0;

/// Upper bound on re-weighted passes
const MAX_PASSES: usize = 8;

/// Relative weight change below which a pass is considered settled
const SETTLED: f64 = 1e-6;

/// Errors from the constraint solver
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Unsatisfiable constraint: {label}")]
    Unsatisfiable { label: String },

    #[error("Internal solver error: {0}")]
    Internal(String),
}

/// Default optimizer backed by kasuari
#[derive(Debug, Clone, Copy, Default)]
pub struct CassowaryOptimizer;

impl Optimizer for CassowaryOptimizer {
    fn minimize(&self, problem: &Problem) -> Optimization {
        let mut start = problem.initial.clone();
        start.resize(problem.num_vars, 0.0);
        let mut weights = ExtentWeights::at(&problem.objective, &start);
        let mut best: Option<(f64, Vec<f64>)> = None;

        for pass in 0..MAX_PASSES {
            let x = match Self::solve_pass(problem, &weights) {
                Ok(x) => x,
                Err(message) if best.is_none() => return Optimization::failed(message),
                Err(message) => {
                    debug!("pass {} failed, keeping best point: {}", pass, message);
                    break;
                }
            };
            let area = problem.objective.value(&x);
            debug!("pass {}: area {}", pass, area);
            if best.as_ref().map_or(true, |(a, _)| area < *a - SETTLED) {
                best = Some((area, x.clone()));
            }
            let next = ExtentWeights::at(&problem.objective, &x);
            if next.settled(&weights) {
                break;
            }
            weights = next;
        }
        match best {
            Some((_, x)) => Optimization::solved(x),
            None => Optimization::failed("no optimizer pass ran"),
        }
    }
}

impl CassowaryOptimizer {
    /// One linearized solve with the given extent weights
    fn solve_pass(problem: &Problem, weights: &ExtentWeights) -> Result<Vec<f64>, String> {
        let mut solver = ConstraintSolver::new(problem.num_vars);
        let x = solver
            .add_rows(problem)
            .and_then(|()| solver.add_objective(problem, weights))
            .map(|()| solver.solve())
            .map_err(|e| e.to_string())?;
        if problem.is_satisfied(&x, 1e-6) {
            return Ok(x);
        }
        let violated: Vec<String> = problem
            .violated(&x, 1e-6)
            .into_iter()
            .map(|(_, r)| r.label.clone())
            .collect();
        Err(format!(
            "solver returned an infeasible point, violating: {}",
            violated.join("; ")
        ))
    }
}

/// Per-box `(width, height)` pull, scaled so the largest is one
#[derive(Debug, Clone, PartialEq)]
struct ExtentWeights(Vec<(f64, f64)>);

impl ExtentWeights {
    /// Linearize the area objective at `x`
    fn at(objective: &AreaObjective, x: &[f64]) -> Self {
        let gradient = objective.gradient(x);
        // A box thinner than the grid still pulls on its other extent
        let raw: Vec<(f64, f64)> = objective
            .boxes
            .iter()
            .map(|&b| (gradient[b + 2].max(GRID_UNIT), gradient[b + 3].max(GRID_UNIT)))
            .collect();
        let scale = raw
            .iter()
            .map(|&(w, h)| w.max(h))
            .fold(GRID_UNIT, f64::max);
        Self(raw.into_iter().map(|(w, h)| (w / scale, h / scale)).collect())
    }

    fn settled(&self, previous: &ExtentWeights) -> bool {
        self.0.len() == previous.0.len()
            && self.0.iter().zip(&previous.0).all(|(a, b)| {
                (a.0 - b.0).abs() <= SETTLED && (a.1 - b.1).abs() <= SETTLED
            })
    }
}

/// Wrapper around kasuari solver
struct ConstraintSolver {
    solver: KasuariSolver,
    /// Kasuari variable per problem slot
    variables: Vec<KasuariVariable>,
    /// Reverse map for extracting solutions
    slots: HashMap<KasuariVariable, usize>,
}

impl ConstraintSolver {
    fn new(num_vars: usize) -> Self {
        let variables: Vec<KasuariVariable> =
            (0..num_vars).map(|_| KasuariVariable::new()).collect();
        let slots = variables
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, i))
            .collect();
        Self {
            solver: KasuariSolver::new(),
            variables,
            slots,
        }
    }

    /// Create a kasuari expression for a row
    fn expression(&self, row: &LinearRow) -> Expression {
        let terms = row
            .terms
            .iter()
            .map(|&(i, c)| Term::new(self.variables[i], c))
            .collect();
        Expression::new(terms, row.constant)
    }

    /// Convert a kasuari error to a SolverError with context
    fn convert_kasuari_error(e: kasuari::AddConstraintError, label: &str) -> SolverError {
        match e {
            kasuari::AddConstraintError::UnsatisfiableConstraint => SolverError::Unsatisfiable {
                label: label.to_string(),
            },
            kasuari::AddConstraintError::DuplicateConstraint => {
                SolverError::Internal(format!("Duplicate constraint: {}", label))
            }
            kasuari::AddConstraintError::InternalSolverError(msg) => {
                SolverError::Internal(format!("Internal solver error for {}: {}", label, msg))
            }
        }
    }

    /// Add every row as a required constraint
    fn add_rows(&mut self, problem: &Problem) -> Result<(), SolverError> {
        for row in &problem.equalities {
            let expr = self.expression(row);
            self.solver
                .add_constraint(expr | EQ(Strength::REQUIRED) | 0.0)
                .map_err(|e| Self::convert_kasuari_error(e, &row.label))?;
        }
        for row in &problem.inequalities {
            let expr = self.expression(row);
            self.solver
                .add_constraint(expr | GE(Strength::REQUIRED) | 0.0)
                .map_err(|e| Self::convert_kasuari_error(e, &row.label))?;
        }
        Ok(())
    }

    /// Pull `hi - lo` towards zero, keeping it at least a grid unit
    fn pull_extent(&mut self, lo: usize, hi: usize, strength: Strength) -> Result<(), SolverError> {
        let extent = Expression::new(
            vec![
                Term::new(self.variables[hi], 1.0),
                Term::new(self.variables[lo], -1.0),
            ],
            0.0,
        );
        self.solver
            .add_constraint(extent.clone() | EQ(strength) | 0.0)
            .map_err(|e| Self::convert_kasuari_error(e, "extent objective"))?;
        self.solver
            .add_constraint(extent | GE(Strength::STRONG) | GRID_UNIT)
            .map_err(|e| Self::convert_kasuari_error(e, "extent grid unit"))
    }

    /// Add the linearized area objective and the anchors
    fn add_objective(
        &mut self,
        problem: &Problem,
        weights: &ExtentWeights,
    ) -> Result<(), SolverError> {
        for (&b, &(w, h)) in problem.objective.boxes.iter().zip(&weights.0) {
            self.pull_extent(b, b + 2, Strength::MEDIUM.mul_f64(w))?;
            self.pull_extent(b + 1, b + 3, Strength::MEDIUM.mul_f64(h))?;
        }
        // Just above any single anchor
        for &b in &problem.containers {
            self.pull_extent(b, b + 2, Strength::WEAK.mul_f64(2.0))?;
            self.pull_extent(b + 1, b + 3, Strength::WEAK.mul_f64(2.0))?;
        }

        let mut anchored: Vec<usize> = problem
            .objective
            .boxes
            .iter()
            .chain(&problem.containers)
            .copied()
            .collect();
        anchored.sort_unstable();
        for (n, b) in anchored.into_iter().enumerate() {
            let weight = 1.0 / (n as f64 + 1.0);
            for slot in [b, b + 1] {
                let guess = problem.initial.get(slot).copied().unwrap_or(0.0);
                self
                    .suggest_value(slot, guess, Strength::WEAK.mul_f64(weight))
                    ?;
            }
        }
        Ok(())
    }

    /// Add an edit variable with suggested value (for anchoring the system)
    fn suggest_value(
        &mut self,
        slot: usize,
        value: f64,
        strength: Strength,
    ) -> Result<(), SolverError> {
        let kvar = self.variables[slot];
        self.solver
            .add_edit_variable(kvar, strength)
            .map_err(|e| SolverError::Internal(format!("Failed to add edit variable: {}", e)))?;
        self.solver
            .suggest_value(kvar, value)
            .map_err(|e| SolverError::Internal(format!("Failed to suggest value: {}", e)))?;
        Ok(())
    }

    /// Solve the constraint system into a flat vector
    fn solve(&mut self) -> Vec<f64> {
        // Variables kasuari never reports stay at zero
        let mut x = vec![0.0; self.variables.len()];
        let changes = self.solver.fetch_changes();
        for (kvar, value) in changes {
            if let Some(&slot) = self.slots.get(kvar) {
                x[slot] = *value;
            }
        }
        debug!("cassowary reported {} changed variables", changes.len());
        x
    }
}
