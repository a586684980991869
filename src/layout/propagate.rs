//! Post-solve bound propagation
//!
//! Walks the hierarchy bottom-up. Each instance keeps its solved min corner
//! and takes the size of its template's content; each non-leaf cell is then
//! shrunk or grown to the tight box of its children. Frozen cells are left
//! exactly as they were cached.

use std::collections::HashSet;

use crate::design::{tight, CellKey, Design, NodeKey};

/// Refit instance and container boxes below `root`
pub fn propagate(design: &mut Design, root: CellKey) {
    let mut done = HashSet::new();
    fit_cell(design, root, &mut done);
}

fn fit_cell(design: &mut Design, cell: CellKey, done: &mut HashSet<CellKey>) {
    if !done.insert(cell) {
        return;
    }
    let Some(c) = design.cell(cell) else {
        return;
    };
    if c.is_frozen() {
        return;
    }
    let leaf = c.is_leaf();
    let instances = c.instances.clone();

    for &inst in &instances {
        if let Some(template) = design.instance(inst).map(|i| i.template) {
            fit_cell(design, template, done);
        }
    }

    for &inst in &instances {
        let Some(i) = design.instance(inst) else {
            continue;
        };
        let (Some(placed), Some(content)) = (i.bbox, design.content_bbox(i.template)) else {
            continue;
        };
        let fitted = content.moved_to(placed.x1, placed.y1);
        design.write_bbox(NodeKey::Instance(inst), Some(fitted));
    }

    if leaf {
        return;
    }
    let children = design.children(cell);
    if let Some(fitted) = tight(children.into_iter().filter_map(|n| design.bbox(n))) {
        design.write_bbox(NodeKey::Cell(cell), Some(fitted));
    }
}
