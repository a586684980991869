//!
//! # Design Hierarchy
//!
//! Cells, polygons and instances live in [SlotMap] arenas owned by a [Design]
//! and are addressed by typed keys. An [Instance] holds the key of its template
//! [Cell], never a copy of it: every instance of a template draws the same
//! interior geometry, offset by its own box.
//!

use std::collections::HashSet;

use slotmap::{new_key_type, SlotMap};

use crate::layout::LayoutError;

pub mod bbox;
pub mod file;
pub mod flatten;
pub mod freeze;

pub use bbox::{tight, BoundBox};
pub use file::DesignFile;
pub use flatten::FlatRect;

// Create key-types for each arena
new_key_type! {
    /// Keys for [Cell] entries
    pub struct CellKey;
    /// Keys for [Polygon] entries
    pub struct PolygonKey;
    /// Keys for [Instance] entries
    pub struct InstanceKey;
}

/// Any object a constraint can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    Cell(CellKey),
    Polygon(PolygonKey),
    Instance(InstanceKey),
}

impl From<CellKey> for NodeKey {
    fn from(k: CellKey) -> Self {
        NodeKey::Cell(k)
    }
}
impl From<PolygonKey> for NodeKey {
    fn from(k: PolygonKey) -> Self {
        NodeKey::Polygon(k)
    }
}
impl From<InstanceKey> for NodeKey {
    fn from(k: InstanceKey) -> Self {
        NodeKey::Instance(k)
    }
}

/// A named leaf shape on a layer
#[derive(Debug, Clone)]
pub struct Polygon {
    pub name: String,
    pub layer: String,
    pub bbox: Option<BoundBox>,
    /// Owning cell
    pub parent: CellKey,
}

/// A placed reference to a template cell
#[derive(Debug, Clone)]
pub struct Instance {
    pub name: String,
    pub template: CellKey,
    pub bbox: Option<BoundBox>,
    /// Owning cell
    pub parent: CellKey,
}

/// A relational constraint: `clause` over the subject and optional object.
/// Without an object the clause is absolute and reads only the subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub subject: NodeKey,
    pub clause: String,
    pub object: Option<NodeKey>,
}

/// Hierarchical container
#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub name: String,
    pub polygons: Vec<PolygonKey>,
    pub instances: Vec<InstanceKey>,
    pub constraints: Vec<Constraint>,
    pub bbox: Option<BoundBox>,
    /// Tight box cached at freeze time; `Some` iff frozen
    pub(crate) frozen: Option<BoundBox>,
}

impl Cell {
    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// Cached tight box of a frozen cell
    pub fn frozen_bbox(&self) -> Option<BoundBox> {
        self.frozen
    }

    /// Cells without polygons or instances
    pub fn is_leaf(&self) -> bool {
        self.polygons.is_empty() && self.instances.is_empty()
    }
}

/// Arena of all geometric objects
#[derive(Debug, Default, Clone)]
pub struct Design {
    cells: SlotMap<CellKey, Cell>,
    polygons: SlotMap<PolygonKey, Polygon>,
    instances: SlotMap<InstanceKey, Instance>,
}

impl Design {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, empty and unfrozen cell
    pub fn add_cell(&mut self, name: impl Into<String>) -> CellKey {
        self.cells.insert(Cell {
            name: name.into(),
            ..Default::default()
        })
    }

    /// Add an unbound polygon to `cell`
    pub fn add_polygon(
        &mut self,
        cell: CellKey,
        name: impl Into<String>,
        layer: impl Into<String>,
    ) -> Result<PolygonKey, LayoutError> {
        self.mutable_cell(cell)?;
        let key = self.polygons.insert(Polygon {
            name: name.into(),
            layer: layer.into(),
            bbox: None,
            parent: cell,
        });
        self.cells[cell].polygons.push(key);
        Ok(key)
    }

    /// Add an unbound instance of `template` to `cell`
    pub fn add_instance(
        &mut self,
        cell: CellKey,
        name: impl Into<String>,
        template: CellKey,
    ) -> Result<InstanceKey, LayoutError> {
        let name = name.into();
        self.mutable_cell(cell)?;
        let template_name = self.cell_ref(template)?.name.clone();
        if template == cell || self.reaches(template, cell) {
            return Err(LayoutError::RecursiveInstance {
                cell: self.cells[cell].name.clone(),
                template: template_name,
            });
        }
        let key = self.instances.insert(Instance {
            name,
            template,
            bbox: None,
            parent: cell,
        });
        self.cells[cell].instances.push(key);
        Ok(key)
    }

    /// Attach a constraint to `cell`
    pub fn constrain(
        &mut self,
        cell: CellKey,
        subject: impl Into<NodeKey>,
        clause: impl Into<String>,
        object: Option<NodeKey>,
    ) -> Result<(), LayoutError> {
        let subject = subject.into();
        self.mutable_cell(cell)?;
        self.check_node(subject)?;
        if let Some(object) = object {
            self.check_node(object)?;
        }
        self.cells[cell].constraints.push(Constraint {
            subject,
            clause: clause.into(),
            object,
        });
        Ok(())
    }

    pub fn cell(&self, key: CellKey) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub fn polygon(&self, key: PolygonKey) -> Option<&Polygon> {
        self.polygons.get(key)
    }

    pub fn instance(&self, key: InstanceKey) -> Option<&Instance> {
        self.instances.get(key)
    }

    /// Iterate over all cells
    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &Cell)> {
        self.cells.iter()
    }

    /// Find the first cell named `name`
    pub fn cell_named(&self, name: &str) -> Option<CellKey> {
        self.cells
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(k, _)| k)
    }

    /// Name of any node, or `"?"` for stale keys
    pub fn name(&self, node: NodeKey) -> &str {
        let name = match node {
            NodeKey::Cell(k) => self.cells.get(k).map(|c| c.name.as_str()),
            NodeKey::Polygon(k) => self.polygons.get(k).map(|p| p.name.as_str()),
            NodeKey::Instance(k) => self.instances.get(k).map(|i| i.name.as_str()),
        };
        name.unwrap_or("?")
    }

    /// Current box of any node. Frozen cells report their cached box.
    pub fn bbox(&self, node: NodeKey) -> Option<BoundBox> {
        match node {
            NodeKey::Cell(k) => self.cells.get(k).and_then(|c| c.frozen.or(c.bbox)),
            NodeKey::Polygon(k) => self.polygons.get(k).and_then(|p| p.bbox),
            NodeKey::Instance(k) => self.instances.get(k).and_then(|i| i.bbox),
        }
    }

    /// Bind a node's box directly.
    ///
    /// Fails for frozen cells and for content owned by a frozen cell.
    pub fn set_bbox(&mut self, node: NodeKey, bbox: BoundBox) -> Result<(), LayoutError> {
        let owner = self.owner(node)?;
        self.mutable_cell(owner)?;
        self.write_bbox(node, Some(bbox));
        Ok(())
    }

    /// Pipeline-internal write that skips the frozen check
    pub(crate) fn write_bbox(&mut self, node: NodeKey, bbox: Option<BoundBox>) {
        match node {
            NodeKey::Cell(k) => {
                if let Some(c) = self.cells.get_mut(k) {
                    c.bbox = bbox;
                }
            }
            NodeKey::Polygon(k) => {
                if let Some(p) = self.polygons.get_mut(k) {
                    p.bbox = bbox;
                }
            }
            NodeKey::Instance(k) => {
                if let Some(i) = self.instances.get_mut(k) {
                    i.bbox = bbox;
                }
            }
        }
    }

    /// Direct children of a cell: polygons first, then instances
    pub fn children(&self, cell: CellKey) -> Vec<NodeKey> {
        match self.cells.get(cell) {
            Some(c) => c
                .polygons
                .iter()
                .map(|&p| NodeKey::Polygon(p))
                .chain(c.instances.iter().map(|&i| NodeKey::Instance(i)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Extent of a cell's drawn content.
    ///
    /// Frozen cells report their cache, otherwise the tight box of the bound
    /// children, falling back to the cell's own box when it has none.
    pub fn content_bbox(&self, cell: CellKey) -> Option<BoundBox> {
        let c = self.cells.get(cell)?;
        if let Some(frozen) = c.frozen {
            return Some(frozen);
        }
        tight(self.children(cell).into_iter().filter_map(|n| self.bbox(n))).or(c.bbox)
    }

    pub(crate) fn cell_ref(&self, key: CellKey) -> Result<&Cell, LayoutError> {
        self.cells.get(key).ok_or(LayoutError::InvalidHandle)
    }

    /// Cell whose frozen state governs writes to `node`
    fn owner(&self, node: NodeKey) -> Result<CellKey, LayoutError> {
        match node {
            NodeKey::Cell(k) => self.cells.get(k).map(|_| k),
            NodeKey::Polygon(k) => self.polygons.get(k).map(|p| p.parent),
            NodeKey::Instance(k) => self.instances.get(k).map(|i| i.parent),
        }
        .ok_or(LayoutError::InvalidHandle)
    }

    fn check_node(&self, node: NodeKey) -> Result<(), LayoutError> {
        self.owner(node).map(|_| ())
    }

    fn mutable_cell(&self, key: CellKey) -> Result<&Cell, LayoutError> {
        let cell = self.cell_ref(key)?;
        if cell.is_frozen() {
            return Err(LayoutError::Frozen {
                cell: cell.name.clone(),
            });
        }
        Ok(cell)
    }

    /// Whether `target` is reachable from `from` through instances
    fn reaches(&self, from: CellKey, target: CellKey) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(cell) = stack.pop() {
            if cell == target {
                return true;
            }
            if !seen.insert(cell) {
                continue;
            }
            if let Some(c) = self.cells.get(cell) {
                stack.extend(c.instances.iter().filter_map(|&i| {
                    self.instances.get(i).map(|inst| inst.template)
                }));
            }
        }
        false
    }
}
