//! Typed AST for constraint clauses
//!
//! A clause is built once at parse time into two linear expressions and a
//! comparison. Each term is a coefficient with an optional coordinate of the
//! subject or object box; nothing is re-interpreted from text at solve time.

use std::fmt;

pub use crate::error::Span;

/// Which participant of a constraint a coordinate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Subject,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// `1` is the min corner, `2` the max corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    Min,
    Max,
}

/// One of the four box scalars of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub role: Role,
    pub axis: Axis,
    pub corner: Corner,
}

impl Coord {
    pub fn new(role: Role, axis: Axis, corner: Corner) -> Self {
        Self { role, axis, corner }
    }

    /// Offset within a box laid out as `[x1, y1, x2, y2]`
    pub fn index(&self) -> usize {
        match (self.axis, self.corner) {
            (Axis::X, Corner::Min) => 0,
            (Axis::Y, Corner::Min) => 1,
            (Axis::X, Corner::Max) => 2,
            (Axis::Y, Corner::Max) => 3,
        }
    }

    /// Resolve a coordinate name.
    ///
    /// `sx1`..`oy2` carry an explicit role; the bare `x1`..`y2` form always
    /// refers to the subject.
    pub fn from_name(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        let (role, rest) = match bytes {
            [b's', rest @ ..] if rest.len() == 2 => (Role::Subject, rest),
            [b'o', rest @ ..] if rest.len() == 2 => (Role::Object, rest),
            rest if rest.len() == 2 => (Role::Subject, rest),
            _ => return None,
        };
        let axis = match rest[0] {
            b'x' => Axis::X,
            b'y' => Axis::Y,
            _ => return None,
        };
        let corner = match rest[1] {
            b'1' => Corner::Min,
            b'2' => Corner::Max,
            _ => return None,
        };
        Some(Self { role, axis, corner })
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.role {
            Role::Subject => "s",
            Role::Object => "o",
        };
        let axis = match self.axis {
            Axis::X => "x",
            Axis::Y => "y",
        };
        let corner = match self.corner {
            Corner::Min => "1",
            Corner::Max => "2",
        };
        write!(f, "{}{}{}", role, axis, corner)
    }
}

/// `coefficient * coord`, or a bare constant when `coord` is `None`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub coefficient: f64,
    pub coord: Option<Coord>,
}

impl Term {
    pub fn constant(value: f64) -> Self {
        Self {
            coefficient: value,
            coord: None,
        }
    }

    pub fn coord(coefficient: f64, coord: Coord) -> Self {
        Self {
            coefficient,
            coord: Some(coord),
        }
    }
}

/// Ordered sum of terms
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearExpr {
    pub terms: Vec<Term>,
}

impl LinearExpr {
    pub fn new(terms: Vec<Term>) -> Self {
        Self { terms }
    }

    /// `self - other`, keeping term order
    pub fn minus(&self, other: &LinearExpr) -> LinearExpr {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().map(|t| Term {
            coefficient: -t.coefficient,
            coord: t.coord,
        }));
        LinearExpr { terms }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
}

impl Comparison {
    /// Operators in scan order: longer operators before their prefixes
    pub const SCAN_ORDER: [(&'static str, Comparison); 5] = [
        ("<=", Comparison::LessOrEqual),
        (">=", Comparison::GreaterOrEqual),
        ("<", Comparison::Less),
        (">", Comparison::Greater),
        ("=", Comparison::Equal),
    ];
}

/// A normalized relation: `expr = 0` or `expr >= 0`
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    Equal(LinearExpr),
    NonNegative(LinearExpr),
}

/// One parsed `expr OP expr` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Clause text after keyword expansion
    pub text: String,
    pub comparison: Comparison,
    pub lhs: LinearExpr,
    pub rhs: LinearExpr,
}

impl Clause {
    /// Rewrite into a single expression compared against zero.
    ///
    /// Strict comparisons relax to their non-strict form.
    pub fn relation(&self) -> Relation {
        match self.comparison {
            Comparison::Equal => Relation::Equal(self.lhs.minus(&self.rhs)),
            Comparison::Less | Comparison::LessOrEqual => {
                Relation::NonNegative(self.rhs.minus(&self.lhs))
            }
            Comparison::Greater | Comparison::GreaterOrEqual => {
                Relation::NonNegative(self.lhs.minus(&self.rhs))
            }
        }
    }}
