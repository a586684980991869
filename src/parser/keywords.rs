//! Keyword macros for constraint clauses
//!
//! Keywords are expanded textually before parsing. Saved constraint files
//! depend on these expansions, so the table must stay byte-stable.
//!
//! The double-letter edge family (`ll_edge`, ...) reads subject minus object,
//! while the single-letter family (`l_edge`, ...) reads object minus subject.

/// Keyword -> replacement text
pub const KEYWORDS: &[(&str, &str)] = &[
    ("xcenter", "sx1+sx2=ox1+ox2"),
    ("ycenter", "sy1+sy2=oy1+oy2"),
    ("center", "sx1+sx2=ox1+ox2,sy1+sy2=oy1+oy2"),
    ("left", "sx1=ox1"),
    ("right", "sx2=ox2"),
    ("top", "sy2=oy2"),
    ("bottom", "sy1=oy1"),
    ("swidth", "sx2-sx1"),
    ("sheight", "sy2-sy1"),
    ("owidth", "ox2-ox1"),
    ("oheight", "oy2-oy1"),
    ("width", "x2-x1"),
    ("height", "y2-y1"),
    ("sx", "sx1"),
    ("sy", "sy1"),
    ("ox", "ox1"),
    ("oy", "oy1"),
    ("ll_edge", "sx1-ox1"),
    ("lr_edge", "sx1-ox2"),
    ("rl_edge", "sx2-ox1"),
    ("rr_edge", "sx2-ox2"),
    ("bb_edge", "sy1-oy1"),
    ("bt_edge", "sy1-oy2"),
    ("tb_edge", "sy2-oy1"),
    ("tt_edge", "sy2-oy2"),
    ("l_edge", "ox1-sx1"),
    ("r_edge", "ox2-sx2"),
    ("t_edge", "oy2-sy2"),
    ("b_edge", "oy1-sy1"),
];

/// Look up the expansion of a single word
pub fn lookup(word: &str) -> Option<&'static str> {
    KEYWORDS
        .iter()
        .find(|(keyword, _)| *keyword == word)
        .map(|(_, expansion)| *expansion)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Expand every whole-word keyword occurrence in `text`.
///
/// Words are maximal runs of `[A-Za-z0-9_]`, so a keyword only matches when it
/// is not embedded in a longer word (`swidth` never matches `width`). No
/// replacement text contains a keyword, which makes expansion idempotent.
pub fn expand(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if is_word_byte(bytes[i]) {
            let start = i;
            while i < bytes.len() && is_word_byte(bytes[i]) {
                i += 1;
            }
            let word = &text[start..i];
            out.push_str(lookup(word).unwrap_or(word));
        } else {
            // Non-word bytes may start a multi-byte char; copy the whole char
            let ch_len = text[i..].chars().next().map_or(1, |c| c.len_utf8());
            out.push_str(&text[i..i + ch_len]);
            i += ch_len;
        }
    }
    out
}
