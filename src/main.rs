//! rectsolve CLI
//!
//! Usage:
//!   rectsolve [OPTIONS] <DESIGN>
//!
//! Options:
//!   -c, --config <FILE>   Solve configuration (TOML format)
//!   -t, --top <NAME>      Cell to solve instead of the file's `top`
//!   -f, --freeze          Freeze the solved cell
//!   -e, --export <FILE>   Print the export library using this layer table
//!   -h, --help            Print help
//!
//! Set `RUST_LOG=debug` to trace the solve pipeline.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;

use rectsolve::{
    export, solve, BoundBox, CellKey, Design, DesignFile, ExportConfig, LayerTable, LayoutError,
    NodeKey, SolveConfig,
};

#[derive(Parser)]
#[command(name = "rectsolve")]
#[command(about = "Constraint-based rectilinear layout solver")]
struct Cli {
    /// Design file (TOML format)
    input: PathBuf,

    /// Solve configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cell to solve (defaults to the design's top cell)
    #[arg(short, long)]
    top: Option<String>,

    /// Freeze the solved cell
    #[arg(short, long)]
    freeze: bool,

    /// Layer table; prints the export library instead of the solved boxes
    #[arg(short, long)]
    export: Option<PathBuf>,
}

/// Solved boxes of one cell
#[derive(Serialize)]
struct SolvedCell {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bbox: Option<[f64; 4]>,
    frozen: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    objects: Vec<SolvedObject>,
}

#[derive(Serialize)]
struct SolvedObject {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bbox: Option<[f64; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    area: Option<f64>,
}

#[derive(Serialize)]
struct SolvedDesign {
    cell: Vec<SolvedCell>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match SolveConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => SolveConfig::default(),
    };

    let file = match DesignFile::from_file(&cli.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error reading design '{}': {}", cli.input.display(), e);
            std::process::exit(1);
        }
    };

    let (mut design, default_top) = match file.build() {
        Ok(built) => built,
        Err(e) => fail(&cli.input, e),
    };
    let top = match &cli.top {
        Some(name) => match design.cell_named(name) {
            Some(k) => k,
            None => {
                eprintln!("Error: no cell named '{}'", name);
                std::process::exit(1);
            }
        },
        None => default_top,
    };

    let report = match solve(&mut design, top, &config).and_then(|r| r.into_result()) {
        Ok(r) => r,
        Err(e) => fail(&cli.input, e),
    };
    if let Some(warning) = &report.warning {
        eprintln!("Warning: {}", warning);
    }

    if cli.freeze {
        if let Err(e) = design.freeze(top) {
            fail(&cli.input, e);
        }
    }

    let output = match &cli.export {
        Some(path) => export_library(&design, top, path),
        None => toml::to_string(&solved_design(&design)).map_err(|e| e.to_string()),
    };
    match output {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn fail(input: &Path, error: LayoutError) -> ! {
    match &error {
        LayoutError::Parse(e) => eprint!("{}", e.format(&input.display().to_string())),
        LayoutError::UndefinedName { suggestions, .. } if !suggestions.is_empty() => {
            eprintln!("Error: {} (did you mean {}?)", error, suggestions.join(", "));
        }
        _ => eprintln!("Error: {}", error),
    }
    std::process::exit(1);
}

fn export_library(design: &Design, top: CellKey, layers: &Path) -> Result<String, String> {
    let table = LayerTable::from_file(layers)
        .map_err(|e| format!("cannot load layer table '{}': {}", layers.display(), e))?;
    let library = export(design, top, &table, &ExportConfig::default()).map_err(|e| e.to_string())?;
    toml::to_string(&library).map_err(|e| e.to_string())
}

fn solved_design(design: &Design) -> SolvedDesign {
    let coords = |b: Option<BoundBox>| b.map(|b| b.coords());
    let cell = design
        .cells()
        .map(|(key, c)| SolvedCell {
            name: c.name.clone(),
            bbox: coords(design.bbox(NodeKey::Cell(key))),
            frozen: c.is_frozen(),
            objects: design
                .children(key)
                .into_iter()
                .map(|n| SolvedObject {
                    name: design.name(n).to_string(),
                    bbox: coords(design.bbox(n)),
                    area: design.bbox(n).map(|b| b.area()),
                })
                .collect(),
        })
        .collect();
    SolvedDesign { cell }
}
