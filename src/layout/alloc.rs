//! Variable allocation over the active hierarchy
//!
//! Every engine-tracked object gets four consecutive scalar unknowns, keyed by
//! its handle. The walk starts at the root cell and follows instances into
//! their templates. A template reached through several instances is visited
//! once, so its interior is solved once and shared. Frozen cells are never
//! entered: their content is a read-only input.

use std::collections::{HashMap, HashSet};

use crate::design::{BoundBox, CellKey, Design, NodeKey};

use super::LayoutError;

/// A value a clause coordinate resolves to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    /// Index into the variable vector
    Var(usize),
    /// Read-only value of an object outside the solve
    Fixed(f64),
}

/// The explicit solve session: which objects are unknowns and where
#[derive(Debug, Clone, Default)]
pub struct Allocation {
    /// Allocated objects in discovery order
    nodes: Vec<NodeKey>,
    base: HashMap<NodeKey, usize>,
    /// Non-frozen cells in discovery order, root first
    cells: Vec<CellKey>,
}

impl Allocation {
    /// Walk the hierarchy below `root` and allocate its objects
    pub fn build(design: &Design, root: CellKey) -> Result<Self, LayoutError> {
        let root_cell = design.cell_ref(root)?;
        if root_cell.is_frozen() {
            return Err(LayoutError::Frozen {
                cell: root_cell.name.clone(),
            });
        }
        let mut alloc = Self::default();
        let mut visited = HashSet::new();
        alloc.visit(design, root, &mut visited);
        Ok(alloc)
    }

    fn visit(&mut self, design: &Design, cell: CellKey, visited: &mut HashSet<CellKey>) {
        if !visited.insert(cell) {
            return;
        }
        let Some(c) = design.cell(cell) else {
            return;
        };
        if c.is_frozen() {
            return;
        }
        self.cells.push(cell);
        self.push(NodeKey::Cell(cell));
        for &p in &c.polygons {
            self.push(NodeKey::Polygon(p));
        }
        for &i in &c.instances {
            self.push(NodeKey::Instance(i));
        }
        for &i in &c.instances {
            if let Some(inst) = design.instance(i) {
                self.visit(design, inst.template, visited);
            }
        }
    }

    fn push(&mut self, node: NodeKey) {
        if self.base.contains_key(&node) {
            return;
        }
        self.base.insert(node, self.nodes.len() * 4);
        self.nodes.push(node);
    }

    /// Total number of scalar unknowns
    pub fn num_vars(&self) -> usize {
        self.nodes.len() * 4
    }

    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }

    /// Active (non-frozen) cells, root first
    pub fn cells(&self) -> &[CellKey] {
        &self.cells
    }

    pub fn is_allocated(&self, node: NodeKey) -> bool {
        self.base.contains_key(&node)
    }

    /// Base index of a node's `[x1, y1, x2, y2]` slots
    pub fn base(&self, node: NodeKey) -> Option<usize> {
        self.base.get(&node).copied()
    }

    /// The four operands of a node: variables when allocated, otherwise the
    /// node's bound box as constants
    pub fn operands(&self, design: &Design, node: NodeKey) -> Option<[Operand; 4]> {
        if let Some(b) = self.base(node) {
            return Some([
                Operand::Var(b),
                Operand::Var(b + 1),
                Operand::Var(b + 2),
                Operand::Var(b + 3),
            ]);
        }
        design
            .bbox(node)
            .map(|bbox| bbox.coords().map(Operand::Fixed))
    }

    /// Read a node's box out of a solution vector
    pub fn bbox_of(&self, node: NodeKey, x: &[f64]) -> Option<BoundBox> {
        let b = self.base(node)?;
        Some(BoundBox::new(x[b], x[b + 1], x[b + 2], x[b + 3]))
    }
}
