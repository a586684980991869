//! Flattening a hierarchy into drawn rectangles
//!
//! An instance draws its template's own solved content translated by
//! `instance.min - template_content.min`. No rotation or scaling.

use super::{BoundBox, CellKey, Design};

/// One drawn rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRect {
    /// Instance names from the flattened cell down to the owning cell, then the polygon name
    pub path: Vec<String>,
    pub layer: String,
    pub bbox: BoundBox,
}

impl FlatRect {
    pub fn path_string(&self) -> String {
        self.path.join("/")
    }
}

impl Design {
    /// Every bound polygon reachable from `cell`, in absolute coordinates
    pub fn flatten(&self, cell: CellKey) -> Vec<FlatRect> {
        let mut out = Vec::new();
        self.flatten_into(cell, 0.0, 0.0, &mut Vec::new(), &mut out);
        out
    }

    fn flatten_into(
        &self,
        cell: CellKey,
        dx: f64,
        dy: f64,
        path: &mut Vec<String>,
        out: &mut Vec<FlatRect>,
    ) {
        let Some(c) = self.cell(cell) else {
            return;
        };
        for &pk in &c.polygons {
            let Some(p) = self.polygon(pk) else {
                continue;
            };
            if let Some(b) = p.bbox {
                let mut full = path.clone();
                full.push(p.name.clone());
                out.push(FlatRect {
                    path: full,
                    layer: p.layer.clone(),
                    bbox: b.translate(dx, dy),
                });
            }
        }
        for &ik in &c.instances {
            let Some(inst) = self.instance(ik) else {
                continue;
            };
            let (Some(ib), Some(content)) = (inst.bbox, self.content_bbox(inst.template)) else {
                continue;
            };
            path.push(inst.name.clone());
            self.flatten_into(
                inst.template,
                dx + ib.x1 - content.x1,
                dy + ib.y1 - content.y1,
                path,
                out,
            );
            path.pop();
        }
    }
}
