//! Integer grid correction
//!
//! Layout coordinates must land on the integer manufacturing grid. The
//! continuous optimum is snapped with the cheapest strategy that keeps every
//! row satisfied: round, floor, ceil, then a bounded local search around the
//! best of the three. When nothing works the lowest-violation assignment is
//! returned together with the rows it still breaks.

use std::fmt;

use log::debug;

use super::config::CorrectionConfig;
use super::problem::Problem;

/// Which strategy produced the corrected values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Round,
    Floor,
    Ceil,
    LocalSearch,
    /// No strategy satisfied every row
    BestEffort,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Round => "round",
            Strategy::Floor => "floor",
            Strategy::Ceil => "ceil",
            Strategy::LocalSearch => "local search",
            Strategy::BestEffort => "best effort",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of integer correction
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    /// Integer-valued assignment for every variable
    pub values: Vec<f64>,
    pub strategy: Strategy,
    /// Total violation of `values`, zero unless best effort
    pub residual: f64,
    /// Labels of rows `values` still violates
    pub violated: Vec<String>,
}

impl Correction {
    pub fn is_exact(&self) -> bool {
        self.strategy != Strategy::BestEffort
    }

    /// Warning to surface when the best-effort fallback was used
    pub fn warning(&self) -> Option<RoundingWarning> {
        if self.is_exact() {
            return None;
        }
        Some(RoundingWarning {
            residual: self.residual,
            violated: self.violated.clone(),
        })
    }
}

/// Non-fatal report that the integer layout breaks some rows
#[derive(Debug, Clone, PartialEq)]
pub struct RoundingWarning {
    pub residual: f64,
    pub violated: Vec<String>,
}

impl fmt::Display for RoundingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "integer rounding left a residual violation of {} in: {}",
            self.residual,
            self.violated.join("; ")
        )
    }
}

/// Offsets tried on each critical variable, nearest first
fn offsets(window: i64) -> impl Iterator<Item = f64> {
    (1..=window).flat_map(|d| [-d as f64, d as f64])
}

/// Snap `x` to integers without breaking the rows of `problem`
pub fn correct(problem: &Problem, x: &[f64], config: &CorrectionConfig) -> Correction {
    let tol = config.tolerance;
    let candidates = [
        (Strategy::Round, x.iter().map(|v| v.round()).collect::<Vec<f64>>()),
        (Strategy::Floor, x.iter().map(|v| v.floor()).collect()),
        (Strategy::Ceil, x.iter().map(|v| v.ceil()).collect()),
    ];

    let mut best: Option<(f64, Vec<f64>)> = None;
    for (strategy, values) in candidates {
        if problem.is_satisfied(&values, tol) {
            debug!("integer correction succeeded with {}", strategy);
            return finish(problem, values, strategy, tol);
        }
        let violation = problem.total_violation(&values, tol);
        if best.as_ref().map_or(true, |(v, _)| violation < *v) {
            best = Some((violation, values));
        }
    }
    let Some((violation, start)) = best else {
        return finish(problem, Vec::new(), Strategy::Round, tol);
    };

    let (values, satisfied) = local_search(problem, x, start, violation, config);
    let strategy = if satisfied {
        Strategy::LocalSearch
    } else {
        Strategy::BestEffort
    };
    debug!("integer correction finished with {}", strategy);
    finish(problem, values, strategy, tol)
}

fn finish(problem: &Problem, values: Vec<f64>, strategy: Strategy, tol: f64) -> Correction {
    let violated = problem
        .violated(&values, tol)
        .into_iter()
        .map(|(_, row)| row.label.clone())
        .collect();
    Correction {
        residual: problem.total_violation(&values, tol),
        values,
        strategy,
        violated,
    }
}

/// Rank variables by how likely a nudge fixes something, most critical
/// first. Ties keep index order.
fn rank_by_criticality(
    problem: &Problem,
    x: &[f64],
    current: &[f64],
    config: &CorrectionConfig,
) -> Vec<usize> {
    let violated = problem.violated(current, config.tolerance);
    let mut scored: Vec<(usize, f64)> = x
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let error = (v - v.round()).abs();
            let sensitive = violated
                .iter()
                .filter(|(_, row)| {
                    (row.coefficient(i) * config.probe_delta).abs() > config.change_threshold
                })
                .count();
            (i, error + sensitive as f64)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.into_iter().map(|(i, _)| i).collect()
}

/// Perturb the top-K critical variables within the window. Returns the best
/// assignment seen and whether it satisfies every row.
fn local_search(
    problem: &Problem,
    x: &[f64],
    start: Vec<f64>,
    start_violation: f64,
    config: &CorrectionConfig,
) -> (Vec<f64>, bool) {
    let tol = config.tolerance;
    let mut current = start;
    let mut current_violation = start_violation;

    for round in 0..config.max_rounds {
        let ranked = rank_by_criticality(problem, x, &current, config);
        let mut improvement: Option<(f64, usize, f64)> = None;

        for &i in ranked.iter().take(config.top_k) {
            for offset in offsets(config.window) {
                let mut candidate = current.clone();
                candidate[i] += offset;
                if problem.is_satisfied(&candidate, tol) {
                    debug!(
                        "local search fixed variable {} by {} in round {}",
                        i, offset, round
                    );
                    return (candidate, true);
                }
                let violation = problem.total_violation(&candidate, tol);
                let bar = improvement.map_or(current_violation, |(v, _, _)| v);
                if violation < bar {
                    improvement = Some((violation, i, offset));
                }
            }
        }

        match improvement {
            Some((violation, i, offset)) => {
                current[i] += offset;
                current_violation = violation;
            }
            None => break,
        }
    }

    let satisfied = problem.is_satisfied(&current, tol);
    (current, satisfied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::problem::LinearRow;

    fn problem(equalities: Vec<LinearRow>, inequalities: Vec<LinearRow>, n: usize) -> Problem {
        Problem {
            num_vars: n,
            equalities,
            inequalities,
            ..Default::default()
        }
    }

    #[test]
    fn test_offsets_nearest_first() {
        let got: Vec<f64> = offsets(3).collect();
        assert_eq!(got, vec![-1.0, 1.0, -2.0, 2.0, -3.0, 3.0]);
    }

    #[test]
    fn test_round_preferred() {
        // a = 0.2, b = a + 17 = 17.2, c >= b + 5 => 22.2
        let p = problem(
            vec![LinearRow::new(vec![(1, 1.0), (0, -1.0)], -17.0, "width 17")],
            vec![LinearRow::new(vec![(2, 1.0), (1, -1.0)], -5.0, "spacing 5")],
            3,
        );
        let c = correct(&p, &[0.2, 17.2, 22.2], &CorrectionConfig::default());
        assert_eq!(c.strategy, Strategy::Round);
        assert_eq!(c.values, vec![0.0, 17.0, 22.0]);
        assert!(c.warning().is_none());
    }

    #[test]
    fn test_floor_when_rounding_breaks_spacing() {
        // round gives b = 1, c = 6: spacing 5 < 5.4
        let p = problem(
            vec![],
            vec![LinearRow::new(vec![(1, 1.0), (0, -1.0)], -5.4, "spacing 5.4")],
            2,
        );
        let c = correct(&p, &[0.6, 6.0], &CorrectionConfig::default());
        assert_eq!(c.strategy, Strategy::Floor);
        assert_eq!(c.values, vec![0.0, 6.0]);
    }

    #[test]
    fn test_local_search_escapes_all_uniform_strategies() {
        // a >= 0.3 breaks round and floor, b <= 1.7 breaks ceil
        let p = problem(
            vec![],
            vec![
                LinearRow::new(vec![(0, 1.0)], -0.3, "a >= 0.3"),
                LinearRow::new(vec![(1, -1.0)], 1.7, "b <= 1.7"),
                LinearRow::new(vec![(1, 1.0), (0, -1.0)], 0.0, "b >= a"),
            ],
            2,
        );
        let c = correct(&p, &[0.4, 1.6], &CorrectionConfig::default());
        assert_eq!(c.strategy, Strategy::LocalSearch);
        assert_eq!(c.values, vec![1.0, 1.0]);
        assert_eq!(c.residual, 0.0);
    }

    #[test]
    fn test_best_effort_names_violated_row() {
        // 2a = 1 has no integer solution
        let p = problem(
            vec![LinearRow::new(vec![(0, 2.0)], -1.0, "2*a = 1")],
            vec![],
            1,
        );
        let c = correct(&p, &[0.5], &CorrectionConfig::default());
        assert_eq!(c.strategy, Strategy::BestEffort);
        assert_eq!(c.residual, 1.0);
        let warning = c.warning().unwrap();
        assert_eq!(warning.violated, vec!["2*a = 1".to_string()]);
        assert!(warning.to_string().contains("2*a = 1"));
    }

    #[test]
    fn test_ranking_prefers_variables_in_violated_rows() {
        let p = problem(
            vec![],
            vec![LinearRow::new(vec![(1, 1.0)], -0.5, "b >= 0.5")],
            2,
        );
        let config = CorrectionConfig::default();
        let ranked = rank_by_criticality(&p, &[0.0, 0.4], &[0.0, 0.0], &config);
        assert_eq!(ranked, vec![1, 0]);
    }
}
