//! Parser for the constraint clause language

pub mod ast;
mod grammar;
pub mod keywords;
pub mod lexer;

pub use ast::*;
pub use grammar::{parse_clause, parse_clauses};
pub use keywords::expand;
