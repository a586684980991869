//!
//! # Export & Import
//!
//! Converts a solved [Design] into a codec-neutral [ExportLibrary] of integer
//! rectangles and cell references, and back. Writing the library to a binary
//! stream format is left to an external codec.
//!
//! Coordinates are scaled by [ExportConfig::unit_ratio] and rounded. The top
//! cell is written in absolute coordinates. Every referenced cell is written
//! relative to the min corner of its content, and each reference sits at its
//! instance's min corner, so the exported placement matches [Design::flatten].
//!

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::design::{tight, BoundBox, CellKey, Design, NodeKey};
use crate::layout::{ConfigError, LayoutError};

/// `(layer, datatype)` pair of the stream format
pub type LayerSpec = (i32, i32);

/// Reverse lookup from `(layer, datatype)` to layer name
pub type ReverseLayers = HashMap<LayerSpec, String>;

/// Layer name -> `(layer, datatype)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerTable {
    #[serde(default)]
    pub layers: BTreeMap<String, LayerSpec>,
}

impl LayerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load from TOML of the form `[layers]` / `met1 = [68, 20]`
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Add or replace a layer
    pub fn with_layer(mut self, name: impl Into<String>, layer: i32, datatype: i32) -> Self {
        self.layers.insert(name.into(), (layer, datatype));
        self
    }

    pub fn get(&self, name: &str) -> Option<LayerSpec> {
        self.layers.get(name).copied()
    }

    /// Invert the table for import
    pub fn reverse(&self) -> ReverseLayers {
        self.layers
            .iter()
            .map(|(name, &spec)| (spec, name.clone()))
            .collect()
    }
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Database units per layout unit
    pub unit_ratio: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { unit_ratio: 1000.0 }
    }
}

/// A library of cells, dependencies before their users
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportLibrary {
    pub unit_ratio: f64,
    #[serde(default, rename = "cell")]
    pub cells: Vec<ExportCell>,
}

impl ExportLibrary {
    pub fn cell(&self, name: &str) -> Option<&ExportCell> {
        self.cells.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportCell {
    pub name: String,
    #[serde(default)]
    pub rects: Vec<ExportRect>,
    #[serde(default)]
    pub refs: Vec<ExportRef>,
}

/// Axis-aligned rectangle in database units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRect {
    pub layer: i32,
    pub datatype: i32,
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

/// Placement of another cell at a point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRef {
    pub name: String,
    pub cell: String,
    pub x: i64,
    pub y: i64,
}

/// Export `top` and everything it references
pub fn export(
    design: &Design,
    top: CellKey,
    layers: &LayerTable,
    config: &ExportConfig,
) -> Result<ExportLibrary, LayoutError> {
    Exporter {
        design,
        layers,
        config,
    }
    .export_all(top)
}

/// Rebuild a design from `library`, returning the key of cell `top`.
///
/// With `frozen` set, every imported cell is frozen after it is filled, so
/// the result can be instanced as fixed geometry.
pub fn import(
    library: &ExportLibrary,
    top: &str,
    layers: &ReverseLayers,
    config: &ExportConfig,
    frozen: bool,
) -> Result<(Design, CellKey), LayoutError> {
    let mut importer = Importer {
        library,
        layers,
        scale: library_scale(library, config),
        frozen,
        design: Design::new(),
        done: HashMap::new(),
        pending: HashSet::new(),
    };
    let key = importer.import_cell(top)?;
    Ok((importer.design, key))
}

/// The library's own ratio wins over the caller's
fn library_scale(library: &ExportLibrary, config: &ExportConfig) -> f64 {
    if library.unit_ratio > 0.0 {
        library.unit_ratio
    } else {
        config.unit_ratio
    }
}

struct Exporter<'a> {
    design: &'a Design,
    layers: &'a LayerTable,
    config: &'a ExportConfig,
}

impl Exporter<'_> {
    fn export_all(&self, top: CellKey) -> Result<ExportLibrary, LayoutError> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        self.dependency_order(top, &mut seen, &mut order);

        let cells = order
            .into_iter()
            .map(|cell| self.export_cell(cell, cell == top))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("exported {} cells", cells.len());
        Ok(ExportLibrary {
            unit_ratio: self.config.unit_ratio,
            cells,
        })
    }

    /// Post-order walk: templates before the cells that use them
    fn dependency_order(
        &self,
        cell: CellKey,
        seen: &mut HashSet<CellKey>,
        order: &mut Vec<CellKey>,
    ) {
        if !seen.insert(cell) {
            return;
        }
        if let Some(c) = self.design.cell(cell) {
            for &i in &c.instances {
                if let Some(inst) = self.design.instance(i) {
                    self.dependency_order(inst.template, seen, order);
                }
            }
        }
        order.push(cell);
    }

    fn scale(&self, v: f64) -> i64 {
        (v * self.config.unit_ratio).round() as i64
    }

    fn export_cell(&self, cell: CellKey, is_top: bool) -> Result<ExportCell, LayoutError> {
        let c = self.design.cell(cell).ok_or(LayoutError::InvalidHandle)?;
        let (ox, oy) = match self.design.content_bbox(cell) {
            Some(b) if !is_top => (b.x1, b.y1),
            _ => (0.0, 0.0),
        };

        let mut out = ExportCell {
            name: c.name.clone(),
            ..Default::default()
        };
        for &pk in &c.polygons {
            let Some(p) = self.design.polygon(pk) else {
                continue;
            };
            let Some(b) = p.bbox else {
                warn!("skipping unbound polygon '{}' in '{}'", p.name, c.name);
                continue;
            };
            let (layer, datatype) = self.layers.get(&p.layer).ok_or_else(|| {
                LayoutError::UnknownLayer {
                    layer: p.layer.clone(),
                }
            })?;
            out.rects.push(ExportRect {
                layer,
                datatype,
                x1: self.scale(b.x1 - ox),
                y1: self.scale(b.y1 - oy),
                x2: self.scale(b.x2 - ox),
                y2: self.scale(b.y2 - oy),
            });
        }
        for &ik in &c.instances {
            let Some(inst) = self.design.instance(ik) else {
                continue;
            };
            let Some(b) = inst.bbox else {
                warn!("skipping unplaced instance '{}' in '{}'", inst.name, c.name);
                continue;
            };
            out.refs.push(ExportRef {
                name: inst.name.clone(),
                cell: self.design.name(NodeKey::Cell(inst.template)).to_string(),
                x: self.scale(b.x1 - ox),
                y: self.scale(b.y1 - oy),
            });
        }
        Ok(out)
    }
}

struct Importer<'a> {
    library: &'a ExportLibrary,
    layers: &'a ReverseLayers,
    scale: f64,
    frozen: bool,
    design: Design,
    /// Cells already imported, by name
    done: HashMap<String, CellKey>,
    /// Cells on the current import stack
    pending: HashSet<String>,
}

impl Importer<'_> {
    fn import_cell(&mut self, name: &str) -> Result<CellKey, LayoutError> {
        if let Some(&key) = self.done.get(name) {
            return Ok(key);
        }
        if !self.pending.insert(name.to_string()) {
            return Err(LayoutError::RecursiveInstance {
                cell: name.to_string(),
                template: name.to_string(),
            });
        }
        let library = self.library;
        let source = library.cell(name).ok_or_else(|| LayoutError::MissingCell {
            name: name.to_string(),
        })?;

        // Templates first, so their content size is known when placing refs
        let mut templates = Vec::with_capacity(source.refs.len());
        for r in &source.refs {
            templates.push(self.import_cell(&r.cell)?);
        }

        let cell = self.design.add_cell(name);
        for (n, rect) in source.rects.iter().enumerate() {
            let layer = self
                .layers
                .get(&(rect.layer, rect.datatype))
                .ok_or_else(|| LayoutError::UnknownLayer {
                    layer: format!("{}/{}", rect.layer, rect.datatype),
                })?;
            let key = self
                .design
                .add_polygon(cell, format!("{}_{}", layer, n), layer.as_str())?;
            let bbox = BoundBox::new(
                rect.x1 as f64 / self.scale,
                rect.y1 as f64 / self.scale,
                rect.x2 as f64 / self.scale,
                rect.y2 as f64 / self.scale,
            );
            self.design.set_bbox(key.into(), bbox)?;
        }
        for (r, template) in source.refs.iter().zip(templates) {
            let key = self.design.add_instance(cell, r.name.as_str(), template)?;
            let x = r.x as f64 / self.scale;
            let y = r.y as f64 / self.scale;
            let placed = self
                .design
                .content_bbox(template)
                .map_or(BoundBox::new(x, y, x, y), |b| b.moved_to(x, y));
            self.design.set_bbox(key.into(), placed)?;
        }

        let content = tight(
            self.design
                .children(cell)
                .into_iter()
                .filter_map(|n| self.design.bbox(n)),
        );
        if let Some(bbox) = content {
            self.design.set_bbox(cell.into(), bbox)?;
            if self.frozen {
                self.design.freeze(cell)?;
            }
        }

        self.pending.remove(name);
        self.done.insert(name.to_string(), cell);
        Ok(cell)
    }
}
