//! TOML design files
//!
//! A design file names every cell, polygon and instance and attaches
//! constraints by name:
//!
//! ```toml
//! top = "top"
//!
//! [[cell]]
//! name = "unit"
//! polygons = [{ name = "m1", layer = "met1" }]
//! constraints = [{ subject = "m1", clause = "width=8,height=4" }]
//!
//! [[cell]]
//! name = "top"
//! instances = [{ name = "u0", cell = "unit" }, { name = "u1", cell = "unit" }]
//! constraints = [{ subject = "u0", clause = "sx2+2<=ox1", object = "u1" }]
//! ```
//!
//! Inside a cell, constraint participants are looked up among the cell's own
//! polygons and instances; the cell's own name refers to the cell itself.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{BoundBox, CellKey, Design, NodeKey};
use crate::layout::{find_similar, ConfigError, LayoutError};

/// Top-level design file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignFile {
    /// Cell solved by default
    pub top: String,
    #[serde(default, rename = "cell")]
    pub cells: Vec<CellEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEntry {
    pub name: String,
    #[serde(default)]
    pub polygons: Vec<PolygonEntry>,
    #[serde(default)]
    pub instances: Vec<InstanceEntry>,
    #[serde(default)]
    pub constraints: Vec<ConstraintEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonEntry {
    pub name: String,
    pub layer: String,
    /// Pre-bound box `[x1, y1, x2, y2]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceEntry {
    pub name: String,
    /// Name of the template cell
    pub cell: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintEntry {
    pub subject: String,
    pub clause: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
}

impl DesignFile {
    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve names into a [Design]; returns it with the key of `top`
    pub fn build(&self) -> Result<(Design, CellKey), LayoutError> {
        let mut design = Design::new();
        let mut cells: HashMap<&str, CellKey> = HashMap::new();
        for entry in &self.cells {
            let key = design.add_cell(entry.name.as_str());
            cells.entry(entry.name.as_str()).or_insert(key);
        }
        let cell_names = || self.cells.iter().map(|c| c.name.as_str());

        for entry in &self.cells {
            let cell = cells[entry.name.as_str()];
            let mut scope: HashMap<&str, NodeKey> = HashMap::new();
            scope.insert(entry.name.as_str(), NodeKey::Cell(cell));

            for p in &entry.polygons {
                let key = design.add_polygon(cell, p.name.as_str(), p.layer.as_str())?;
                if let Some(coords) = p.bbox {
                    design.set_bbox(key.into(), BoundBox::from_coords(coords))?;
                }
                scope.insert(p.name.as_str(), key.into());
            }

            for i in &entry.instances {
                let Some(&template) = cells.get(i.cell.as_str()) else {
                    return Err(LayoutError::undefined(
                        &i.cell,
                        "cell list",
                        find_similar(cell_names(), &i.cell, 2),
                    ));
                };
                let key = design.add_instance(cell, i.name.as_str(), template)?;
                scope.insert(i.name.as_str(), key.into());
            }

            let lookup = |name: &str| {
                scope.get(name).copied().ok_or_else(|| {
                    LayoutError::undefined(
                        name,
                        format!("cell '{}'", entry.name),
                        find_similar(scope.keys().copied(), name, 2),
                    )
                })
            };
            for c in &entry.constraints {
                let subject = lookup(&c.subject)?;
                let object = c.object.as_deref().map(lookup).transpose()?;
                design.constrain(cell, subject, c.clause.as_str(), object)?;
            }
        }

        let top = cells.get(self.top.as_str()).copied().ok_or_else(|| {
            LayoutError::undefined(&self.top, "cell list", find_similar(cell_names(), &self.top, 2))
        })?;
        Ok((design, top))
    }
}
