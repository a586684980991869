//!
//! # Rectangular Bounding Boxes
//!

use serde::{Deserialize, Serialize};

/// # Axis-aligned box
///
/// `(x1, y1)` is the min corner and `(x2, y2)` the max corner.
/// Solved boxes always have `x2 > x1` and `y2 > y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from the `[x1, y1, x2, y2]` layout used by the solver
    pub fn from_coords(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    pub fn coords(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Positive extent on both axes
    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    /// Smallest box containing both
    pub fn union(&self, other: &BoundBox) -> BoundBox {
        BoundBox::new(
            self.x1.min(other.x1),
            self.y1.min(other.y1),
            self.x2.max(other.x2),
            self.y2.max(other.y2),
        )
    }

    pub fn translate(&self, dx: f64, dy: f64) -> BoundBox {
        BoundBox::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }

    /// Same size, min corner moved to `(x, y)`
    pub fn moved_to(&self, x: f64, y: f64) -> BoundBox {
        BoundBox::new(x, y, x + self.width(), y + self.height())
    }
}

/// Tight box around every box in `boxes`, `None` when empty
pub fn tight<I>(boxes: I) -> Option<BoundBox>
where
    I: IntoIterator<Item = BoundBox>,
{
    boxes.into_iter().reduce(|acc, b| acc.union(&b))
}
