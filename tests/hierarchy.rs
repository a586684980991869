//! Hierarchy tests: shared templates, frozen cells, flattening, export and
//! design files.

use pretty_assertions::assert_eq;

use rectsolve::{
    export, import, solve, BoundBox, CellKey, Design, DesignFile, ExportConfig, InstanceKey,
    LayerTable, LayoutError, NodeKey, PolygonKey, SolveConfig,
};

fn bbox(design: &Design, node: impl Into<NodeKey>) -> BoundBox {
    let node = node.into();
    design
        .bbox(node)
        .unwrap_or_else(|| panic!("'{}' is unbound", design.name(node)))
}

/// `unit` holds one 8x4 met1 polygon; `top` places two units side by side
struct Row {
    design: Design,
    top: CellKey,
    unit: CellKey,
    m1: PolygonKey,
    u0: InstanceKey,
    u1: InstanceKey,
}

fn row() -> Row {
    let mut design = Design::new();
    let unit = design.add_cell("unit");
    let m1 = design.add_polygon(unit, "m1", "met1").unwrap();
    design
        .constrain(unit, m1, "width=8,height=4", None)
        .unwrap();

    let top = design.add_cell("top");
    let u0 = design.add_instance(top, "u0", unit).unwrap();
    let u1 = design.add_instance(top, "u1", unit).unwrap();
    design
        .constrain(top, u0, "sx2+2<=ox1,sy1=oy1", Some(u1.into()))
        .unwrap();
    design.constrain(top, u0, "x1=0,y1=0", None).unwrap();
    Row {
        design,
        top,
        unit,
        m1,
        u0,
        u1,
    }
}

#[test]
fn test_instances_mirror_template_size() {
    let mut r = row();
    let report = solve(&mut r.design, r.top, &SolveConfig::default()).unwrap();
    assert!(report.success, "{}", report.message);

    let (b0, b1) = (bbox(&r.design, r.u0), bbox(&r.design, r.u1));
    assert_eq!(b0, BoundBox::new(0.0, 0.0, 8.0, 4.0));
    assert_eq!((b1.width(), b1.height()), (8.0, 4.0));
    assert!(b1.x1 - b0.x2 >= 2.0);
    assert_eq!(bbox(&r.design, r.unit), bbox(&r.design, r.m1));
}

#[test]
fn test_shared_template_draws_once_per_instance() {
    let mut r = row();
    solve(&mut r.design, r.top, &SolveConfig::default()).unwrap();

    let flat = r.design.flatten(r.top);
    let paths: Vec<String> = flat.iter().map(|f| f.path_string()).collect();
    assert_eq!(paths, vec!["u0/m1".to_string(), "u1/m1".to_string()]);
    assert_eq!(flat[0].bbox, bbox(&r.design, r.u0));
    assert_eq!(flat[1].bbox, bbox(&r.design, r.u1));
}

#[test]
fn test_editing_template_moves_every_instance() {
    let mut r = row();
    solve(&mut r.design, r.top, &SolveConfig::default()).unwrap();

    let m = bbox(&r.design, r.m1);
    r.design
        .set_bbox(r.m1.into(), BoundBox::new(m.x1, m.y1, m.x1 + 3.0, m.y1 + 3.0))
        .unwrap();
    for f in r.design.flatten(r.top) {
        assert_eq!((f.bbox.width(), f.bbox.height()), (3.0, 3.0));
    }
}

#[test]
fn test_frozen_template_is_not_resolved() {
    let mut r = row();
    solve(&mut r.design, r.unit, &SolveConfig::default()).unwrap();
    let before = bbox(&r.design, r.m1);
    r.design.freeze(r.unit).unwrap();

    // A clause on the top cell that would stretch an unfrozen template
    r.design.constrain(r.top, r.u1, "width>=20", None).unwrap();
    let report = solve(&mut r.design, r.top, &SolveConfig::default()).unwrap();

    assert_eq!(bbox(&r.design, r.m1), before);
    assert!(r.design.cell(r.unit).unwrap().is_frozen());
    // Instance sizing against the frozen size makes the request infeasible
    assert!(!report.success);
}

#[test]
fn test_frozen_template_places_instances() {
    let mut r = row();
    solve(&mut r.design, r.unit, &SolveConfig::default()).unwrap();
    let template = r.design.freeze(r.unit).unwrap();

    let report = solve(&mut r.design, r.top, &SolveConfig::default()).unwrap();
    assert!(report.success, "{}", report.message);
    assert_eq!(report.variables, 12);
    let b1 = bbox(&r.design, r.u1);
    assert_eq!(
        (b1.width(), b1.height()),
        (template.width(), template.height())
    );
}

#[test]
fn test_frozen_cell_rejects_edits() {
    let mut r = row();
    solve(&mut r.design, r.unit, &SolveConfig::default()).unwrap();
    r.design.freeze(r.unit).unwrap();

    assert!(matches!(
        r.design.add_polygon(r.unit, "extra", "met2"),
        Err(LayoutError::Frozen { .. })
    ));
    assert!(matches!(
        r.design
            .set_bbox(r.m1.into(), BoundBox::new(0.0, 0.0, 1.0, 1.0)),
        Err(LayoutError::Frozen { .. })
    ));
    r.design.unfreeze(r.unit).unwrap();
    assert!(r.design.add_polygon(r.unit, "extra", "met2").is_ok());
}

#[test]
fn test_nested_cells_are_tight() {
    let mut r = row();
    let chip = r.design.add_cell("chip");
    let rows = r.design.add_instance(chip, "r0", r.top).unwrap();
    let pad = r.design.add_polygon(chip, "pad", "met2").unwrap();
    r.design
        .constrain(chip, pad, "width=6,height=6", None)
        .unwrap();
    r.design
        .constrain(chip, rows, "tb_edge+3<=0,left", Some(pad.into()))
        .unwrap();

    let report = solve(&mut r.design, chip, &SolveConfig::default()).unwrap();
    assert!(report.success, "{}", report.message);

    let (rb, pb) = (bbox(&r.design, rows), bbox(&r.design, pad));
    assert!(pb.y1 - rb.y2 >= 3.0);
    assert_eq!(rb.x1, pb.x1);
    assert_eq!(bbox(&r.design, chip), rb.union(&pb));
    assert_eq!(r.design.flatten(chip).len(), 3);
}

#[test]
fn test_export_import_round_trip() {
    let mut r = row();
    solve(&mut r.design, r.top, &SolveConfig::default()).unwrap();
    let layers = LayerTable::new().with_layer("met1", 68, 20);
    let config = ExportConfig::default();

    let library = export(&r.design, r.top, &layers, &config).unwrap();
    assert_eq!(library.cells.len(), 2);
    assert_eq!(library.cell("top").unwrap().refs.len(), 2);

    let (imported, top) = import(&library, "top", &layers.reverse(), &config, false).unwrap();
    let drawn = |d: &Design, k: CellKey| -> Vec<BoundBox> {
        d.flatten(k).into_iter().map(|f| f.bbox).collect()
    };
    assert_eq!(drawn(&imported, top), drawn(&r.design, r.top));
    assert!(!imported.cell(top).unwrap().is_frozen());
}

#[test]
fn test_design_file_solves() {
    let file = DesignFile::from_str(
        r#"
top = "top"

[[cell]]
name = "unit"
polygons = [{ name = "m1", layer = "met1" }]
constraints = [{ subject = "m1", clause = "width=8,height=4" }]

[[cell]]
name = "top"
instances = [{ name = "u0", cell = "unit" }, { name = "u1", cell = "unit" }]
constraints = [
    { subject = "u0", clause = "sx2+2<=ox1,sy1=oy1", object = "u1" },
    { subject = "u0", clause = "x1=0,y1=0" },
]
"#,
    )
    .unwrap();
    let (mut design, top) = file.build().unwrap();
    let report = solve(&mut design, top, &SolveConfig::default()).unwrap();
    assert!(report.success, "{}", report.message);
    assert_eq!(
        design.flatten(top)[0].bbox,
        BoundBox::new(0.0, 0.0, 8.0, 4.0)
    );
}
