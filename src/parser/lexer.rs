//! Lexer for one side of a constraint clause using logos

use logos::Logos;

use crate::error::{ParseError, Span};

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?", |lex| {
        lex.slice().parse::<f64>().ok()
    })]
    Number(f64),
}

/// Lex a clause fragment into tokens with spans.
///
/// `offset` shifts spans so they point into the full clause. Characters the
/// lexer does not recognise are reported, never skipped.
pub fn lex(input: &str, offset: usize, clause: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut tokens = Vec::new();
    for (tok, span) in Token::lexer(input).spanned() {
        let span = span.start + offset..span.end + offset;
        match tok {
            Ok(t) => tokens.push((t, span)),
            Err(()) => {
                return Err(ParseError::UnknownToken {
                    clause: clause.to_string(),
                    token: clause[span.clone()].to_string(),
                    span,
                })
            }
        }
    }
    Ok(tokens)
}
