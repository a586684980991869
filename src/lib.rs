//! rectsolve - constraint-based rectilinear layout
//!
//! Designs are hierarchies of cells holding leaf polygons on layers and
//! instances of other cells. Instead of coordinates, users attach relational
//! clauses such as `sx2+5<=ox1` ("my right edge plus 5 is left of your left
//! edge"). [solve] turns those clauses into an optimization problem, snaps the
//! result to the integer grid and writes the boxes back into the design.
//!
//! # Example
//!
//! ```rust
//! use rectsolve::{solve, BoundBox, Design, SolveConfig};
//!
//! let mut design = Design::new();
//! let top = design.add_cell("top");
//! let a = design.add_polygon(top, "A", "met1")?;
//! let b = design.add_polygon(top, "B", "met1")?;
//! design.constrain(top, a, "sx1=0,sy1=0,width=17,height=4", None)?;
//! design.constrain(top, b, "swidth=owidth,top,bottom", Some(a.into()))?;
//! design.constrain(top, a, "sx2+5<=ox1", Some(b.into()))?;
//!
//! let report = solve(&mut design, top, &SolveConfig::default())?;
//! assert!(report.success);
//! assert_eq!(design.bbox(b.into()), Some(BoundBox::new(22.0, 0.0, 39.0, 4.0)));
//! # Ok::<(), rectsolve::LayoutError>(())
//! ```

pub mod design;
pub mod error;
pub mod export;
pub mod layout;
pub mod parser;

pub use design::{
    BoundBox, Cell, CellKey, Design, DesignFile, FlatRect, Instance, InstanceKey, NodeKey,
    Polygon, PolygonKey,
};
pub use error::ParseError;
pub use export::{export, import, ExportConfig, ExportLibrary, LayerTable};
pub use layout::{
    solve, solve_with, CassowaryOptimizer, CorrectionConfig, LayoutError, Optimizer,
    RoundingWarning, SolveConfig, SolveReport, Strategy,
};
