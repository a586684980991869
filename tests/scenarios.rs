//! End-to-end solve scenarios. These check that solved boxes satisfy the
//! declared clauses exactly, on the integer grid.

use rectsolve::{
    solve, BoundBox, CellKey, Design, LayoutError, NodeKey, PolygonKey, SolveConfig, SolveReport,
};

fn solved(design: &mut Design, top: CellKey) -> SolveReport {
    let report = solve(design, top, &SolveConfig::default()).expect("solve should not error");
    assert!(report.success, "solve failed: {}", report.message);
    report
}

fn bbox(design: &Design, node: impl Into<NodeKey>) -> BoundBox {
    let node = node.into();
    design
        .bbox(node)
        .unwrap_or_else(|| panic!("'{}' is unbound", design.name(node)))
}

/// Two leaves A and B in one cell, nothing else
fn two_leaves() -> (Design, CellKey, PolygonKey, PolygonKey) {
    let mut design = Design::new();
    let top = design.add_cell("top");
    let a = design.add_polygon(top, "A", "met1").unwrap();
    let b = design.add_polygon(top, "B", "met1").unwrap();
    (design, top, a, b)
}

fn assert_integral(b: BoundBox) {
    for v in b.coords() {
        assert_eq!(v, v.round(), "{:?} is off the grid", b);
    }
}

#[test]
fn test_anchored_leaf_takes_declared_size() {
    let mut design = Design::new();
    let top = design.add_cell("top");
    let a = design.add_polygon(top, "A", "met1").unwrap();
    design
        .constrain(top, a, "width=20, height=10", None)
        .unwrap();
    design.constrain(top, a, "x1=0,y1=0", None).unwrap();

    let report = solved(&mut design, top);
    assert!(report.warning.is_none());
    assert_eq!(bbox(&design, a), BoundBox::new(0.0, 0.0, 20.0, 10.0));
}

#[test]
fn test_spacing_and_alignment_between_leaves() {
    let (mut design, top, a, b) = two_leaves();
    design
        .constrain(top, a, "sx2+5<ox1", Some(b.into()))
        .unwrap();
    design.constrain(top, a, "sy1=oy1", Some(b.into())).unwrap();

    let report = solved(&mut design, top);
    assert!(report.warning.is_none());
    let (ba, bb) = (bbox(&design, a), bbox(&design, b));
    assert!(bb.x1 - ba.x2 >= 5.0, "A={:?} B={:?}", ba, bb);
    assert_eq!(ba.y1, bb.y1);
    assert_integral(ba);
    assert_integral(bb);
}

#[test]
fn test_parent_box_equals_fixed_child() {
    let mut design = Design::new();
    let top = design.add_cell("top");
    let a = design.add_polygon(top, "A", "met1").unwrap();
    design
        .constrain(top, a, "x1=10,y1=10,x2=60,y2=60", None)
        .unwrap();

    solved(&mut design, top);
    assert_eq!(bbox(&design, top), BoundBox::new(10.0, 10.0, 60.0, 60.0));
}

#[test]
fn test_left_edge_distance_aligns() {
    let (mut design, top, a, b) = two_leaves();
    design
        .constrain(top, a, "ll_edge=0", Some(b.into()))
        .unwrap();
    design.constrain(top, a, "width=4,height=4", None).unwrap();
    design.constrain(top, b, "width=9,height=2", None).unwrap();

    solved(&mut design, top);
    assert_eq!(bbox(&design, a).x1, bbox(&design, b).x1);
}

#[test]
fn test_single_letter_edge_family_reads_object_first() {
    let (mut design, top, a, b) = two_leaves();
    design
        .constrain(top, a, "x1=0,y1=0,width=5,height=5", None)
        .unwrap();
    design.constrain(top, b, "width=5,height=5", None).unwrap();
    // ox1 - sx1 = 12: B starts 12 units right of A
    design
        .constrain(top, a, "l_edge=12,bottom", Some(b.into()))
        .unwrap();

    solved(&mut design, top);
    assert_eq!(bbox(&design, b), BoundBox::new(12.0, 0.0, 17.0, 5.0));
}

#[test]
fn test_unsatisfiable_rounding_is_reported_not_hidden() {
    let (mut design, top, a, b) = two_leaves();
    design
        .constrain(top, a, "x1=0.5,y1=0,height=3", None)
        .unwrap();
    design.constrain(top, a, "sx2-sx1=17", None).unwrap();
    design
        .constrain(top, a, "sx2+5<=ox1,sy1=oy1", Some(b.into()))
        .unwrap();

    let report = solved(&mut design, top);
    let warning = report
        .warning
        .expect("x1=0.5 has no integer solution, a warning is required");
    assert!(warning.residual > 0.0);
    assert!(
        warning.violated.iter().any(|label| label.contains("x1=0.5")),
        "warning does not name the clause: {}",
        warning
    );

    // Every other clause either holds or is named
    let (ba, bb) = (bbox(&design, a), bbox(&design, b));
    if ba.x2 - ba.x1 != 17.0 {
        assert!(warning.violated.iter().any(|l| l.contains("sx2-sx1=17")));
    }
    if bb.x1 - ba.x2 < 5.0 {
        assert!(warning.violated.iter().any(|l| l.contains("sx2+5<=ox1")));
    }
}

#[test]
fn test_shared_width_goes_to_the_shorter_box() {
    let (mut design, top, a, b) = two_leaves();
    design.constrain(top, a, "height=1", None).unwrap();
    design.constrain(top, b, "height=10", None).unwrap();
    design
        .constrain(top, a, "swidth+owidth=20", Some(b.into()))
        .unwrap();

    let report = solved(&mut design, top);
    let (ba, bb) = (bbox(&design, a), bbox(&design, b));
    assert_eq!((ba.width(), bb.width()), (19.0, 1.0));
    assert_eq!(ba.area() + bb.area(), 29.0);
    assert_eq!(report.objective, 29.0);
}

#[test]
fn test_area_is_minimal_across_a_chain() {
    // Heights 2, 6 and 3; A+B and B+C each need a minimum total width, none under 4
    let mut design = Design::new();
    let top = design.add_cell("top");
    let boxes: Vec<PolygonKey> = ["A", "B", "C"]
        .iter()
        .map(|&name| design.add_polygon(top, name, "met1").unwrap())
        .collect();
    for (&p, h) in boxes.iter().zip([2, 6, 3]) {
        let clause = format!("height={},width>=4", h);
        design.constrain(top, p, clause, None).unwrap();
    }
    design
        .constrain(top, boxes[0], "swidth+owidth>=26", Some(boxes[1].into()))
        .unwrap();
    design
        .constrain(top, boxes[1], "swidth+owidth>=30", Some(boxes[2].into()))
        .unwrap();

    solved(&mut design, top);
    let widths: Vec<f64> = boxes.iter().map(|&p| bbox(&design, p).width()).collect();
    let total: f64 = boxes.iter().map(|&p| bbox(&design, p).area()).sum();
    // B is the tallest, so it stays at its floor and the others absorb the rest
    assert_eq!(widths, vec![22.0, 4.0, 26.0]);
    assert_eq!(total, 22.0 * 2.0 + 4.0 * 6.0 + 26.0 * 3.0);
}

#[test]
fn test_width_and_spacing_survive_rounding() {
    let (mut design, top, a, b) = two_leaves();
    design
        .constrain(top, a, "x1=0,y1=0,height=3", None)
        .unwrap();
    design.constrain(top, a, "sx2-sx1=17", None).unwrap();
    design
        .constrain(top, a, "sx2+4.5<=ox1,sy1=oy1", Some(b.into()))
        .unwrap();

    let report = solved(&mut design, top);
    assert!(report.warning.is_none(), "{:?}", report.warning);
    let (ba, bb) = (bbox(&design, a), bbox(&design, b));
    assert_eq!(ba.x2 - ba.x1, 17.0);
    assert!(bb.x1 - ba.x2 >= 4.5);
}

#[test]
fn test_freeze_with_unbound_polygon_fails() {
    let mut design = Design::new();
    let cell = design.add_cell("cell");
    design.add_polygon(cell, "loose", "met1").unwrap();

    let err = design.freeze(cell).unwrap_err();
    assert!(matches!(
        err,
        LayoutError::FreezePrecondition { ref object, .. } if object == "loose"
    ));
    assert!(!design.cell(cell).unwrap().is_frozen());
}

#[test]
fn test_solved_boxes_are_valid_and_tight() {
    let (mut design, top, a, b) = two_leaves();
    let c = design.add_polygon(top, "C", "poly").unwrap();
    design
        .constrain(top, a, "rl_edge+3<=0", Some(b.into()))
        .unwrap();
    design
        .constrain(top, b, "tb_edge+2<=0", Some(c.into()))
        .unwrap();

    solved(&mut design, top);
    for node in design.children(top) {
        let b = bbox(&design, node);
        assert!(b.x2 > b.x1 && b.y2 > b.y1, "{:?}", b);
    }
    let children = design.children(top).into_iter().map(|n| bbox(&design, n));
    assert_eq!(Some(bbox(&design, top)), rectsolve::design::tight(children));
}

#[test]
fn test_resolve_is_deterministic() {
    let build = || {
        let (mut design, top, a, b) = two_leaves();
        design
            .constrain(top, a, "sx2+5<ox1", Some(b.into()))
            .unwrap();
        design.constrain(top, b, "width=7", None).unwrap();
        (design, top)
    };
    let (mut first, top1) = build();
    let (mut second, top2) = build();
    solved(&mut first, top1);
    solved(&mut second, top2);
    assert_eq!(first.flatten(top1), second.flatten(top2));

    // Solving the same graph again changes nothing
    let before = first.flatten(top1);
    solved(&mut first, top1);
    assert_eq!(first.flatten(top1), before);
}

#[test]
fn test_freeze_unfreeze_resolve_cycle() {
    let (mut design, top, a, b) = two_leaves();
    design
        .constrain(top, a, "sx2+5<=ox1,sy1=oy1", Some(b.into()))
        .unwrap();
    solved(&mut design, top);

    let frozen = design.freeze(top).unwrap();
    assert_eq!(frozen, bbox(&design, top));
    assert!(matches!(
        solve(&mut design, top, &SolveConfig::default()),
        Err(LayoutError::Frozen { .. })
    ));

    design.unfreeze(top).unwrap();
    solved(&mut design, top);
    let (ba, bb) = (bbox(&design, a), bbox(&design, b));
    assert!(bb.x1 - ba.x2 >= 5.0);
    assert_eq!(ba.y1, bb.y1);
}

#[test]
fn test_parse_error_names_clause() {
    let (mut design, top, a, _) = two_leaves();
    design.constrain(top, a, "sx2+5 < foo", None).unwrap();
    let err = solve(&mut design, top, &SolveConfig::default()).unwrap_err();
    match err {
        LayoutError::Parse(e) => assert_eq!(e.clause(), "sx2+5 < foo"),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_contradiction_is_unsatisfiable() {
    let (mut design, top, a, _) = two_leaves();
    design.constrain(top, a, "width=10", None).unwrap();
    design.constrain(top, a, "width<=5", None).unwrap();

    let report = solve(&mut design, top, &SolveConfig::default()).unwrap();
    assert!(!report.success);
    assert!(design.bbox(a.into()).is_none());
    assert!(matches!(
        report.into_result(),
        Err(LayoutError::Unsatisfiable { .. })
    ));
}

#[test]
fn test_default_sizing_gives_unconstrained_leaves_room() {
    let (mut design, top, a, b) = two_leaves();
    design
        .constrain(top, a, "x1=0,y1=0,width=3,height=3", None)
        .unwrap();
    let config = SolveConfig::default().with_default_sizing(true);

    let report = solve(&mut design, top, &config).unwrap();
    assert!(report.success);
    let bb = bbox(&design, b);
    assert!(bb.width() >= 10.0 && bb.height() >= 10.0);
    assert!(bb.x1 >= 0.0 && bb.y1 >= 0.0);
    assert_eq!(bbox(&design, a).width(), 3.0);
}
