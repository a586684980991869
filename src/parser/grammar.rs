//! Clause parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::{ParseError, Span};
use crate::parser::ast::*;
use crate::parser::keywords;
use crate::parser::lexer::{self, Token};

/// A term before its name is bound to a coordinate
#[derive(Debug, Clone, PartialEq)]
struct RawTerm {
    coefficient: f64,
    name: Option<(String, Span)>,
}

impl RawTerm {
    fn scaled(self, factor: f64) -> Self {
        Self {
            coefficient: self.coefficient * factor,
            name: self.name,
        }
    }
}

/// Expand keywords in `text` and parse every comma-separated clause.
///
/// `has_object` tells whether the constraint names an object; without one
/// only subject coordinates may appear.
pub fn parse_clauses(text: &str, has_object: bool) -> Result<Vec<Clause>, ParseError> {
    let expanded = keywords::expand(text);
    expanded
        .split(',')
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .map(|clause| parse_clause(clause, has_object))
        .collect()
}

/// Parse one already-expanded `expr OP expr` clause
pub fn parse_clause(clause: &str, has_object: bool) -> Result<Clause, ParseError> {
    let (at, symbol, comparison) = Comparison::SCAN_ORDER
        .iter()
        .find_map(|(symbol, cmp)| clause.find(symbol).map(|at| (at, *symbol, *cmp)))
        .ok_or_else(|| ParseError::MissingOperator {
            clause: clause.to_string(),
        })?;

    let rhs_start = at + symbol.len();
    let lhs = parse_side(&clause[..at], 0, clause, has_object)?;
    let rhs = parse_side(&clause[rhs_start..], rhs_start, clause, has_object)?;

    Ok(Clause {
        text: clause.to_string(),
        comparison,
        lhs,
        rhs,
    })
}

fn parse_side(
    input: &str,
    offset: usize,
    clause: &str,
    has_object: bool,
) -> Result<LinearExpr, ParseError> {
    let tokens = lexer::lex(input, offset, clause)?;
    let end = offset + input.len();

    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((end..end).into(), |(t, s): (_, _)| (t, s));

    let raw = expr_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| match errs.into_iter().next() {
            Some(err) => syntax_error(err, clause),
            None => ParseError::Syntax {
                clause: clause.to_string(),
                span: offset..end,
                message: "invalid expression".to_string(),
                expected: Vec::new(),
            },
        })?;

    raw.into_iter()
        .map(|term| bind(term, clause, has_object))
        .collect::<Result<Vec<_>, _>>()
        .map(LinearExpr::new)
}

/// Resolve a raw term's name to a coordinate
fn bind(term: RawTerm, clause: &str, has_object: bool) -> Result<Term, ParseError> {
    let Some((name, span)) = term.name else {
        return Ok(Term::constant(term.coefficient));
    };
    match Coord::from_name(&name) {
        Some(coord) if coord.role == Role::Object && !has_object => Err(ParseError::Syntax {
            clause: clause.to_string(),
            span,
            message: format!("'{}' refers to an object, but the constraint has none", name),
            expected: vec!["x1, y1, x2, y2".to_string()],
        }),
        Some(coord) => Ok(Term::coord(term.coefficient, coord)),
        None => Err(ParseError::UnknownToken {
            clause: clause.to_string(),
            token: name,
            span,
        }),
    }
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn expr_parser<'a, I>() -> impl Parser<'a, I, Vec<RawTerm>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let number = select! {
        Token::Number(n) => n,
    };

    let name = select! {
        Token::Ident(s) => s,
    }
    .map_with(|s, e| (s, span_range(&e.span())));

    // `2*sx1`, `2 sx1`, `2`, or `sx1`
    let term = choice((
        number
            .then(just(Token::Star).or_not().ignore_then(name.clone()).or_not())
            .map(|(coefficient, name)| RawTerm { coefficient, name }),
        name.map(|name| RawTerm {
            coefficient: 1.0,
            name: Some(name),
        }),
    ));

    let sign = choice((just(Token::Plus).to(1.0), just(Token::Minus).to(-1.0)));

    let first = sign
        .clone()
        .or_not()
        .then(term.clone())
        .map(|(s, t): (Option<f64>, RawTerm)| t.scaled(s.unwrap_or(1.0)));

    let rest = sign.then(term).map(|(s, t): (f64, RawTerm)| t.scaled(s));

    first
        .then(rest.repeated().collect::<Vec<_>>())
        .map(|(head, tail)| {
            let mut terms = Vec::with_capacity(tail.len() + 1);
            terms.push(head);
            terms.extend(tail);
            terms
        })
        .then_ignore(end())
}

fn syntax_error(err: Rich<'_, Token>, clause: &str) -> ParseError {
    use chumsky::error::{RichPattern, RichReason};

    let message = match err.reason() {
        RichReason::ExpectedFound { found, .. } => match found {
            Some(tok) => format!("unexpected {}", format_token(tok)),
            None => "unexpected end of expression".to_string(),
        },
        RichReason::Custom(msg) => msg.to_string(),
        #[allow(unreachable_patterns)]
        _ => "invalid expression".to_string(),
    };

    let expected: Vec<String> = err
        .expected()
        .filter_map(|e| match e {
            RichPattern::Token(tok) => Some(format_token(tok)),
            RichPattern::Label(label) => Some(label.to_string()),
            RichPattern::EndOfInput => Some("end of expression".to_string()),
            #[allow(unreachable_patterns)]
            _ => None,
        })
        .collect();

    ParseError::Syntax {
        clause: clause.to_string(),
        span: err.span().into_range(),
        message,
        expected,
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("name '{}'", s),
        Token::Number(n) => format!("number {}", n),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
    }
}
