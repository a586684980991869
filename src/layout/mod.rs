//! Solve pipeline: allocate, compile, optimize, correct, propagate
//!
//! [solve] runs the whole pipeline for one root cell and writes the integer
//! boxes back into the design in place. Templates are shared, so solving a
//! cell that instances a template also updates every other instance of it.

pub mod alloc;
pub mod compile;
pub mod config;
pub mod error;
pub mod problem;
pub mod propagate;
pub mod rounding;
pub mod solver;

pub use alloc::{Allocation, Operand};
pub use compile::{compile, Compiled};
pub use config::{ConfigError, CorrectionConfig, SolveConfig};
pub use error::LayoutError;
pub use problem::{AreaObjective, LinearRow, Optimization, Optimizer, Problem, RowKind};
pub use propagate::propagate;
pub use rounding::{correct, Correction, RoundingWarning, Strategy};
pub use solver::CassowaryOptimizer;

use log::{debug, warn};

use crate::design::{CellKey, Design};

/// Outcome of one solve
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub success: bool,
    /// Optimizer or feasibility diagnostic, empty on success
    pub message: String,
    /// Integer correction strategy that produced the boxes
    pub strategy: Option<Strategy>,
    /// Set when the best-effort rounding fallback was used
    pub warning: Option<RoundingWarning>,
    /// Total area of the solved boxes
    pub objective: f64,
    /// Number of scalar unknowns in the solve
    pub variables: usize,
}

impl SolveReport {
    fn failed(message: impl Into<String>, variables: usize) -> Self {
        Self {
            success: false,
            message: message.into(),
            strategy: None,
            warning: None,
            objective: 0.0,
            variables,
        }
    }

    /// Turn an unsuccessful report into [LayoutError::Unsatisfiable]
    pub fn into_result(self) -> Result<Self, LayoutError> {
        if self.success {
            Ok(self)
        } else {
            Err(LayoutError::unsatisfiable(self.message))
        }
    }
}

/// Solve `root` with the default optimizer
pub fn solve(
    design: &mut Design,
    root: CellKey,
    config: &SolveConfig,
) -> Result<SolveReport, LayoutError> {
    solve_with(design, root, config, &CassowaryOptimizer)
}

/// Solve `root` with a caller-supplied optimizer.
///
/// Parse errors and structural problems are returned as `Err`. An infeasible
/// system is reported through an unsuccessful [SolveReport] and leaves the
/// design untouched.
pub fn solve_with(
    design: &mut Design,
    root: CellKey,
    config: &SolveConfig,
    optimizer: &dyn Optimizer,
) -> Result<SolveReport, LayoutError> {
    let alloc = Allocation::build(design, root)?;
    debug!(
        "allocated {} objects in {} active cells",
        alloc.nodes().len(),
        alloc.cells().len()
    );

    let Compiled {
        problem,
        infeasible,
    } = compile(design, &alloc, config)?;
    if !infeasible.is_empty() {
        debug!("{} constant rows can never hold", infeasible.len());
        return Ok(SolveReport::failed(
            format!("constraints can never hold: {}", infeasible.join("; ")),
            alloc.num_vars(),
        ));
    }

    let result = optimizer.minimize(&problem);
    if !result.success || result.x.len() != problem.num_vars {
        debug!("optimizer failed: {}", result.message);
        return Ok(SolveReport::failed(result.message, alloc.num_vars()));
    }

    let correction = correct(&problem, &result.x, &config.correction);
    let warning = correction.warning();
    if let Some(w) = &warning {
        warn!("{}", w);
    }

    for &node in alloc.nodes() {
        if let Some(bbox) = alloc.bbox_of(node, &correction.values) {
            design.write_bbox(node, Some(bbox));
        }
    }
    propagate(design, root);

    Ok(SolveReport {
        success: true,
        message: String::new(),
        strategy: Some(correction.strategy),
        warning,
        objective: problem.objective.value(&correction.values),
        variables: alloc.num_vars(),
    })
}

/// Names within `max_distance` edits of `target`, closest first
pub(crate) fn find_similar<'a>(
    names: impl IntoIterator<Item = &'a str>,
    target: &str,
    max_distance: usize,
) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = names
        .into_iter()
        .filter_map(|name| {
            let dist = strsim::levenshtein(name, target);
            (dist <= max_distance && dist > 0).then_some((dist, name))
        })
        .collect();

    candidates.sort();
    candidates.dedup();
    candidates
        .into_iter()
        .map(|(_, name)| name.to_string())
        .take(3)
        .collect()
}
