//! Recursive-descent parser over the token stream.
//!
//! Precedence, loosest first: tuple comma, `if`/`else`, `or`, `and`, `not`,
//! comparisons, `+ -`, `* / // %`, unary `+ -`, `**`, then calls, methods
//! and subscripts.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::str::FromStr;
use thiserror::Error;

use super::ast::{BinaryOp, CompareOp, Expr, UnaryOp};
use super::lexer::{Punct, Token};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub(crate) struct ParseError(String);

type ParseResult<T> = Result<T, ParseError>;

pub(crate) fn parse(tokens: &[Token]) -> ParseResult<Expr> {
    let mut parser = Parser { tokens, pos: 0 };
    if tokens.is_empty() {
        return Err(ParseError("empty formula".into()));
    }
    let expr = parser.tuple()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ParseError(format!("unexpected {token:?}"))),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn at_punct(&self, punct: Punct) -> bool {
        self.peek() == Some(&Token::Punct(punct))
    }

    fn eat_punct(&mut self, punct: Punct) -> bool {
        if self.at_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == word)
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.at_keyword(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: Punct) -> ParseResult<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(ParseError(format!("expected {punct:?}")))
        }
    }

    /// Can the next token begin an expression?
    fn starts_expr(&self) -> bool {
        match self.peek() {
            Some(Token::Number(_) | Token::Str(_)) => true,
            Some(Token::Name(n)) => !matches!(n.as_str(), "if" | "else" | "and" | "or"),
            Some(Token::Punct(p)) => matches!(
                p,
                Punct::LParen | Punct::LBracket | Punct::Minus | Punct::Plus
            ),
            _ => false,
        }
    }

    fn tuple(&mut self) -> ParseResult<Expr> {
        let first = self.conditional()?;
        if !self.at_punct(Punct::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_punct(Punct::Comma) {
            if !self.starts_expr() {
                break;
            }
            items.push(self.conditional()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn conditional(&mut self) -> ParseResult<Expr> {
        let then = self.or_expr()?;
        if !self.eat_keyword("if") {
            return Ok(then);
        }
        let test = self.or_expr()?;
        if !self.eat_keyword("else") {
            return Err(ParseError("expected else".into()));
        }
        let otherwise = self.conditional()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn or_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("or") {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.not_expr()?;
        while self.eat_keyword("and") {
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> ParseResult<Expr> {
        if self.eat_keyword("not") {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let first = self.arith()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Punct(Punct::EqEq)) => CompareOp::Eq,
                Some(Token::Punct(Punct::NotEq)) => CompareOp::Ne,
                Some(Token::Punct(Punct::Lt)) => CompareOp::Lt,
                Some(Token::Punct(Punct::Le)) => CompareOp::Le,
                Some(Token::Punct(Punct::Gt)) => CompareOp::Gt,
                Some(Token::Punct(Punct::Ge)) => CompareOp::Ge,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.arith()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn arith(&mut self) -> ParseResult<Expr> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Punct(Punct::Plus)) => BinaryOp::Add,
                Some(Token::Punct(Punct::Minus)) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Punct(Punct::Star)) => BinaryOp::Mul,
                Some(Token::Punct(Punct::Slash)) => BinaryOp::Div,
                Some(Token::Punct(Punct::SlashSlash)) => BinaryOp::FloorDiv,
                Some(Token::Punct(Punct::Percent)) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.factor()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        if self.eat_punct(Punct::Minus) {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.factor()?)));
        }
        if self.eat_punct(Punct::Plus) {
            return Ok(Expr::Unary(UnaryOp::Pos, Box::new(self.factor()?)));
        }
        self.power()
    }

    fn power(&mut self) -> ParseResult<Expr> {
        let base = self.postfix()?;
        if self.eat_punct(Punct::StarStar) {
            let exponent = self.factor()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.atom()?;
        loop {
            if self.at_punct(Punct::LParen) {
                let Expr::Name(name) = expr else {
                    return Err(ParseError("only named functions can be called".into()));
                };
                self.pos += 1;
                let args = self.arguments()?;
                expr = Expr::Call { name, args };
            } else if self.eat_punct(Punct::Dot) {
                let Some(Token::Name(name)) = self.advance() else {
                    return Err(ParseError("expected method name".into()));
                };
                self.expect_punct(Punct::LParen)?;
                let args = self.arguments()?;
                expr = Expr::Method {
                    receiver: Box::new(expr),
                    name: name.clone(),
                    args,
                };
            } else if self.eat_punct(Punct::LBracket) {
                expr = self.subscript(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    /// Arguments after an opening parenthesis, through the closing one.
    fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.eat_punct(Punct::RParen) {
            args.push(self.conditional()?);
            if !self.eat_punct(Punct::Comma) {
                self.expect_punct(Punct::RParen)?;
                break;
            }
        }
        Ok(args)
    }

    fn subscript(&mut self, target: Expr) -> ParseResult<Expr> {
        let start = if self.at_punct(Punct::Colon) {
            None
        } else {
            Some(Box::new(self.conditional()?))
        };
        if self.eat_punct(Punct::RBracket) {
            let index = start.ok_or_else(|| ParseError("empty subscript".into()))?;
            return Ok(Expr::Index {
                target: Box::new(target),
                index,
            });
        }
        self.expect_punct(Punct::Colon)?;
        let stop = if self.at_punct(Punct::RBracket) {
            None
        } else {
            Some(Box::new(self.conditional()?))
        };
        self.expect_punct(Punct::RBracket)?;
        Ok(Expr::Slice {
            target: Box::new(target),
            start,
            stop,
        })
    }

    fn atom(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.advance() else {
            return Err(ParseError("unexpected end of formula".into()));
        };
        match token {
            Token::Number(literal) => integer_literal(literal).map(Expr::Number),
            Token::Str(text) => {
                let mut text = text.clone();
                while let Some(Token::Str(more)) = self.peek() {
                    text.push_str(more);
                    self.pos += 1;
                }
                Ok(Expr::Str(text))
            }
            Token::Name(name) => match name.as_str() {
                "True" => Ok(Expr::Bool(true)),
                "False" => Ok(Expr::Bool(false)),
                "if" | "else" | "and" | "or" | "not" => {
                    Err(ParseError(format!("unexpected keyword {name}")))
                }
                _ => Ok(Expr::Name(name.clone())),
            },
            Token::Punct(Punct::LParen) => {
                if self.eat_punct(Punct::RParen) {
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let inner = self.tuple()?;
                self.expect_punct(Punct::RParen)?;
                Ok(inner)
            }
            Token::Punct(Punct::LBracket) => {
                let mut items = Vec::new();
                while !self.eat_punct(Punct::RBracket) {
                    items.push(self.conditional()?);
                    if !self.eat_punct(Punct::Comma) {
                        self.expect_punct(Punct::RBracket)?;
                        break;
                    }
                }
                Ok(Expr::List(items))
            }
            other => Err(ParseError(format!("unexpected {other:?}"))),
        }
    }
}

/// Integer literals only reach here; fractional ones were rewritten into
/// `Decimal("...")` calls by the lexer.
fn integer_literal(literal: &str) -> ParseResult<Decimal> {
    let lower = literal.to_ascii_lowercase();
    let radix = match lower.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    let parsed = match radix {
        Some(radix) => i128::from_str_radix(&lower[2..].replace('_', ""), radix)
            .ok()
            .and_then(Decimal::from_i128),
        None => Decimal::from_str(literal).ok(),
    };
    parsed.ok_or_else(|| ParseError(format!("bad literal {literal}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::lexer::{decimalize, tokenize};

    fn parse_str(src: &str) -> ParseResult<Expr> {
        parse(&decimalize(tokenize(src).unwrap()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse_str("1 + 2 * 3").unwrap();
        let Expr::Binary(BinaryOp::Add, _, right) = expr else {
            panic!("expected addition at the top");
        };
        assert!(matches!(*right, Expr::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn test_power_binds_tighter_than_unary_minus() {
        let expr = parse_str("-2 ** 2").unwrap();
        assert!(matches!(expr, Expr::Unary(UnaryOp::Neg, _)));
    }

    #[test]
    fn test_calls_and_methods() {
        assert!(matches!(parse_str("sqrt(b)").unwrap(), Expr::Call { .. }));
        assert!(matches!(
            parse_str("'{}'.format(a)").unwrap(),
            Expr::Method { .. }
        ));
    }

    #[test]
    fn test_only_names_can_be_called() {
        assert!(parse_str("(a)(b)").is_err());
        assert!(parse_str("a.b").is_err());
    }

    #[test]
    fn test_tuples_and_lists() {
        assert!(matches!(parse_str("a, b").unwrap(), Expr::Tuple(items) if items.len() == 2));
        assert!(matches!(parse_str("[1, 2, 3]").unwrap(), Expr::List(items) if items.len() == 3));
        assert!(matches!(parse_str("(a,)").unwrap(), Expr::Tuple(items) if items.len() == 1));
    }

    #[test]
    fn test_conditional_and_chained_compare() {
        assert!(matches!(
            parse_str("a if 1 < b <= 3 else c").unwrap(),
            Expr::Conditional { .. }
        ));
    }

    #[test]
    fn test_slices() {
        assert!(matches!(parse_str("a[1:]").unwrap(), Expr::Slice { .. }));
        assert!(matches!(parse_str("a[-1]").unwrap(), Expr::Index { .. }));
    }

    #[test]
    fn test_syntax_errors() {
        for src in ["(2..3)", "x!4", "1 +", "a b", "if"] {
            assert!(parse_str(src).is_err(), "{src}");
        }
    }
}
