//! Compiles a design into a numeric problem
//!
//! Constraint families, in order:
//! - validity: every allocated box has extent of at least `epsilon`
//! - default sizing (optional): unmentioned leaf polygons get a minimum size
//! - containment: children of active cells lie inside the cell box
//! - instance sizing: an instance spans exactly its template's extent
//! - user constraints: parsed clauses over subject and object coordinates

use std::collections::HashSet;

use log::debug;

use crate::design::{CellKey, Constraint, Design, NodeKey};
use crate::parser::{self, Relation, Role};

use super::alloc::{Allocation, Operand};
use super::config::SolveConfig;
use super::problem::{AreaObjective, LinearRow, Problem};
use super::LayoutError;

const X1: usize = 0;
const Y1: usize = 1;
const X2: usize = 2;
const Y2: usize = 3;

/// Output of compilation
#[derive(Debug, Clone)]
pub struct Compiled {
    pub problem: Problem,
    /// Labels of rows without variables that can never hold
    pub infeasible: Vec<String>,
}

/// Accumulates rows, deciding constant rows on the spot
struct RowSink {
    equalities: Vec<LinearRow>,
    inequalities: Vec<LinearRow>,
    infeasible: Vec<String>,
    tolerance: f64,
}

impl RowSink {
    fn equal(&mut self, row: LinearRow) {
        if row.is_constant() {
            if row.constant.abs() > self.tolerance {
                self.infeasible.push(row.label);
            }
            return;
        }
        self.equalities.push(row);
    }

    fn non_negative(&mut self, row: LinearRow) {
        if row.is_constant() {
            if row.constant < -self.tolerance {
                self.infeasible.push(row.label);
            }
            return;
        }
        self.inequalities.push(row);
    }
}

/// `sum(coefficient * operand) + constant` as a row
fn row(parts: &[(f64, Operand)], constant: f64, label: String) -> LinearRow {
    let mut fixed = constant;
    let mut terms = Vec::new();
    for &(coefficient, operand) in parts {
        match operand {
            Operand::Var(i) => terms.push((i, coefficient)),
            Operand::Fixed(v) => fixed += coefficient * v,
        }
    }
    LinearRow::new(terms, fixed, label)
}

/// Build the problem for an allocation
pub fn compile(
    design: &Design,
    alloc: &Allocation,
    config: &SolveConfig,
) -> Result<Compiled, LayoutError> {
    let mut sink = RowSink {
        equalities: Vec::new(),
        inequalities: Vec::new(),
        infeasible: Vec::new(),
        tolerance: config.correction.tolerance,
    };

    validity(design, alloc, config, &mut sink);
    let mentioned = user_constraints(design, alloc, &mut sink)?;
    if config.default_sizing {
        default_sizing(design, alloc, config, &mentioned, &mut sink);
    }
    for &cell in alloc.cells() {
        containment(design, alloc, cell, &mut sink);
    }
    instance_sizing(design, alloc, &mut sink);

    let (cells, objects): (Vec<NodeKey>, Vec<NodeKey>) = alloc
        .nodes()
        .iter()
        .copied()
        .partition(|n| matches!(n, NodeKey::Cell(_)));
    let objective = AreaObjective {
        boxes: objects.iter().filter_map(|&n| alloc.base(n)).collect(),
    };
    let containers = cells.iter().filter_map(|&n| alloc.base(n)).collect();
    let initial = initial_guess(alloc, config);

    debug!(
        "compiled {} variables, {} equalities, {} inequalities",
        alloc.num_vars(),
        sink.equalities.len(),
        sink.inequalities.len()
    );

    Ok(Compiled {
        problem: Problem {
            num_vars: alloc.num_vars(),
            equalities: sink.equalities,
            inequalities: sink.inequalities,
            objective,
            containers,
            initial,
        },
        infeasible: sink.infeasible,
    })
}

/// Staggered diagonal, one step per allocated object
fn initial_guess(alloc: &Allocation, config: &SolveConfig) -> Vec<f64> {
    let mut x = vec![0.0; alloc.num_vars()];
    for (i, node) in alloc.nodes().iter().enumerate() {
        let Some(b) = alloc.base(*node) else {
            continue;
        };
        let offset = config.stagger * i as f64;
        x[b + X1] = offset;
        x[b + Y1] = offset;
        x[b + X2] = offset + config.default_min_size;
        x[b + Y2] = offset + config.default_min_size;
    }
    x
}

fn validity(design: &Design, alloc: &Allocation, config: &SolveConfig, sink: &mut RowSink) {
    for &node in alloc.nodes() {
        let Some(b) = alloc.base(node) else {
            continue;
        };
        let name = design.name(node);
        sink.non_negative(LinearRow::new(
            vec![(b + X2, 1.0), (b + X1, -1.0)],
            -config.epsilon,
            format!("validity: width of '{}'", name),
        ));
        sink.non_negative(LinearRow::new(
            vec![(b + Y2, 1.0), (b + Y1, -1.0)],
            -config.epsilon,
            format!("validity: height of '{}'", name),
        ));
    }
}

fn default_sizing(
    design: &Design,
    alloc: &Allocation,
    config: &SolveConfig,
    mentioned: &HashSet<NodeKey>,
    sink: &mut RowSink,
) {
    for &node in alloc.nodes() {
        if !matches!(node, NodeKey::Polygon(_)) || mentioned.contains(&node) {
            continue;
        }
        let Some(b) = alloc.base(node) else {
            continue;
        };
        let name = design.name(node);
        let min = config.default_min_size;
        sink.non_negative(LinearRow::new(
            vec![(b + X1, 1.0)],
            0.0,
            format!("default size: '{}' x1 >= 0", name),
        ));
        sink.non_negative(LinearRow::new(
            vec![(b + Y1, 1.0)],
            0.0,
            format!("default size: '{}' y1 >= 0", name),
        ));
        sink.non_negative(LinearRow::new(
            vec![(b + X2, 1.0), (b + X1, -1.0)],
            -min,
            format!("default size: '{}' width >= {}", name, min),
        ));
        sink.non_negative(LinearRow::new(
            vec![(b + Y2, 1.0), (b + Y1, -1.0)],
            -min,
            format!("default size: '{}' height >= {}", name, min),
        ));
    }
}

fn containment(design: &Design, alloc: &Allocation, cell: CellKey, sink: &mut RowSink) {
    let parent = NodeKey::Cell(cell);
    let Some(p) = alloc.operands(design, parent) else {
        return;
    };
    let parent_name = design.name(parent);
    for child in design.children(cell) {
        let Some(c) = alloc.operands(design, child) else {
            continue;
        };
        let label = format!(
            "containment: '{}' inside '{}'",
            design.name(child),
            parent_name
        );
        // child.min >= parent.min, parent.max >= child.max
        for (inner, outer) in [(c[X1], p[X1]), (c[Y1], p[Y1]), (p[X2], c[X2]), (p[Y2], c[Y2])] {
            sink.non_negative(row(&[(1.0, inner), (-1.0, outer)], 0.0, label.clone()));
        }
    }
}

fn instance_sizing(design: &Design, alloc: &Allocation, sink: &mut RowSink) {
    for &node in alloc.nodes() {
        let NodeKey::Instance(key) = node else {
            continue;
        };
        let (Some(inst), Some(i)) = (design.instance(key), alloc.operands(design, node)) else {
            continue;
        };
        let template = NodeKey::Cell(inst.template);
        let t = if alloc.is_allocated(template) {
            alloc.operands(design, template)
        } else {
            design
                .content_bbox(inst.template)
                .map(|bbox| bbox.coords().map(Operand::Fixed))
        };
        let Some(t) = t else {
            continue;
        };
        let template_name = design.name(template);
        for (lo, hi, axis) in [(X1, X2, "width"), (Y1, Y2, "height")] {
            sink.equal(row(
                &[(1.0, i[hi]), (-1.0, i[lo]), (-1.0, t[hi]), (1.0, t[lo])],
                0.0,
                format!(
                    "instance size: {} of '{}' matches '{}'",
                    axis, inst.name, template_name
                ),
            ));
        }
    }
}

/// Compile every constraint of every active cell; returns the nodes mentioned
fn user_constraints(
    design: &Design,
    alloc: &Allocation,
    sink: &mut RowSink,
) -> Result<HashSet<NodeKey>, LayoutError> {
    let mut mentioned = HashSet::new();
    for &cell in alloc.cells() {
        let Some(c) = design.cell(cell) else {
            continue;
        };
        for constraint in &c.constraints {
            compile_constraint(design, alloc, &c.name, constraint, sink)?;
            mentioned.insert(constraint.subject);
            if let Some(object) = constraint.object {
                mentioned.insert(object);
            }
        }
    }
    Ok(mentioned)
}

fn compile_constraint(
    design: &Design,
    alloc: &Allocation,
    cell_name: &str,
    constraint: &Constraint,
    sink: &mut RowSink,
) -> Result<(), LayoutError> {
    let clauses = parser::parse_clauses(&constraint.clause, constraint.object.is_some())?;

    let resolve = |node: NodeKey| {
        alloc
            .operands(design, node)
            .ok_or_else(|| LayoutError::UnboundReference {
                name: design.name(node).to_string(),
                clause: constraint.clause.clone(),
            })
    };
    let subject = resolve(constraint.subject)?;
    let object = match constraint.object {
        Some(node) => Some(resolve(node)?),
        None => None,
    };
    let participants = match constraint.object {
        Some(o) => format!(
            "{}, {}",
            design.name(constraint.subject),
            design.name(o)
        ),
        None => design.name(constraint.subject).to_string(),
    };

    for clause in clauses {
        let label = format!("{}: '{}' ({})", cell_name, clause.text, participants);
        let (expr, is_equality) = match clause.relation() {
            Relation::Equal(expr) => (expr, true),
            Relation::NonNegative(expr) => (expr, false),
        };
        let mut parts = Vec::with_capacity(expr.terms.len());
        let mut constant = 0.0;
        for term in &expr.terms {
            match term.coord {
                None => constant += term.coefficient,
                Some(coord) => {
                    let ops = match (coord.role, object) {
                        (Role::Subject, _) => subject,
                        (Role::Object, Some(o)) => o,
                        // Rejected by the parser when there is no object
                        (Role::Object, None) => continue,
                    };
                    parts.push((term.coefficient, ops[coord.index()]));
                }
            }
        }
        let compiled = row(&parts, constant, label);
        if is_equality {
            sink.equal(compiled);
        } else {
            sink.non_negative(compiled);
        }
    }
    Ok(())
}
