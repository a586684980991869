//! Freezing solved cells into immutable layouts

use log::info;

use super::{tight, BoundBox, CellKey, Design};
use crate::layout::LayoutError;

impl Design {
    /// Freeze `cell`, caching the tight box of its content.
    ///
    /// Every owned polygon and instance must already be bound. Freezing an
    /// already-frozen cell returns the cached box unchanged.
    pub fn freeze(&mut self, cell: CellKey) -> Result<BoundBox, LayoutError> {
        let c = self.cell_ref(cell)?;
        if let Some(cached) = c.frozen {
            return Ok(cached);
        }

        let mut boxes = Vec::new();
        for node in self.children(cell) {
            match self.bbox(node) {
                Some(b) => boxes.push(b),
                None => {
                    return Err(LayoutError::FreezePrecondition {
                        cell: c.name.clone(),
                        object: self.name(node).to_string(),
                    })
                }
            }
        }
        let Some(bbox) = tight(boxes).or(c.bbox) else {
            return Err(LayoutError::FreezePrecondition {
                cell: c.name.clone(),
                object: c.name.clone(),
            });
        };

        info!("freezing cell '{}' at {:?}", c.name, bbox);
        let c = &mut self.cells[cell];
        c.frozen = Some(bbox);
        c.bbox = Some(bbox);
        Ok(bbox)
    }

    /// Clear the frozen flag and cache, making the cell solvable again
    pub fn unfreeze(&mut self, cell: CellKey) -> Result<(), LayoutError> {
        let c = self
            .cells
            .get_mut(cell)
            .ok_or(LayoutError::InvalidHandle)?;
        if c.frozen.take().is_some() {
            info!("unfroze cell '{}'", c.name);
        }
        Ok(())
    }
}
