//! The keyword table is persisted in saved constraint files; these snapshots
//! pin every expansion byte for byte.

use insta::assert_snapshot;

use rectsolve::parser::{expand, keywords::KEYWORDS, parse_clauses, Comparison};

#[test]
fn test_alignment_keywords() {
    assert_snapshot!(expand("xcenter"), @"sx1+sx2=ox1+ox2");
    assert_snapshot!(expand("ycenter"), @"sy1+sy2=oy1+oy2");
    assert_snapshot!(expand("center"), @"sx1+sx2=ox1+ox2,sy1+sy2=oy1+oy2");
    assert_snapshot!(expand("left,right"), @"sx1=ox1,sx2=ox2");
    assert_snapshot!(expand("top,bottom"), @"sy2=oy2,sy1=oy1");
}

#[test]
fn test_dimension_keywords() {
    assert_snapshot!(expand("swidth=owidth"), @"sx2-sx1=ox2-ox1");
    assert_snapshot!(expand("sheight=oheight"), @"sy2-sy1=oy2-oy1");
    assert_snapshot!(expand("width=20, height=10"), @"x2-x1=20, y2-y1=10");
    assert_snapshot!(expand("sx+3<=ox"), @"sx1+3<=ox1");
    assert_snapshot!(expand("sy=oy"), @"sy1=oy1");
}

#[test]
fn test_edge_keywords_keep_their_signs() {
    assert_snapshot!(expand("ll_edge=0"), @"sx1-ox1=0");
    assert_snapshot!(expand("lr_edge=0"), @"sx1-ox2=0");
    assert_snapshot!(expand("rl_edge=0"), @"sx2-ox1=0");
    assert_snapshot!(expand("rr_edge=0"), @"sx2-ox2=0");
    assert_snapshot!(expand("bb_edge=0"), @"sy1-oy1=0");
    assert_snapshot!(expand("bt_edge=0"), @"sy1-oy2=0");
    assert_snapshot!(expand("tb_edge=0"), @"sy2-oy1=0");
    assert_snapshot!(expand("tt_edge=0"), @"sy2-oy2=0");
    assert_snapshot!(expand("l_edge=0"), @"ox1-sx1=0");
    assert_snapshot!(expand("r_edge=0"), @"ox2-sx2=0");
    assert_snapshot!(expand("t_edge=0"), @"oy2-sy2=0");
    assert_snapshot!(expand("b_edge=0"), @"oy1-sy1=0");
}

#[test]
fn test_expansion_is_idempotent() {
    let mut inputs: Vec<String> = KEYWORDS.iter().map(|(k, _)| k.to_string()).collect();
    inputs.push("center, width>=2*owidth, ll_edge+5<=0".to_string());
    inputs.push("leftover=topmost".to_string());
    for input in inputs {
        let once = expand(&input);
        assert_eq!(expand(&once), once, "expanding '{}' twice changed it", input);
    }
}

#[test]
fn test_embedded_words_untouched() {
    assert_eq!(expand("leftover=topmost"), "leftover=topmost");
    assert_eq!(expand("sx1=ox1"), "sx1=ox1");
}

#[test]
fn test_expanded_keywords_parse() {
    let clauses = parse_clauses("center,width>=owidth", true).unwrap();
    let texts: Vec<&str> = clauses.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["sx1+sx2=ox1+ox2", "sy1+sy2=oy1+oy2", "x2-x1>=ox2-ox1"]
    );
    assert_eq!(clauses[2].comparison, Comparison::GreaterOrEqual);
}
