//! Formula tokenizer.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    /// Numeric literal exactly as written (`12`, `2.5`, `1e3`, `0x1f`).
    Number(String),
    Str(String),
    Name(String),
    Punct(Punct),
    /// A character with no meaning in the grammar (`!`, `@`, `$`, ...).
    Stray(char),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Question,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unbalanced bracket at {0}")]
    Unbalanced(usize),
    #[error("malformed number '{0}'")]
    BadNumber(String),
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut brackets: Vec<char> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let (literal, next) = scan_number(&chars, i)?;
            tokens.push(Token::Number(literal));
            i = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Name(chars[start..i].iter().collect()));
            continue;
        }

        if c == '"' || c == '\'' {
            let (text, next) = scan_string(&chars, i)?;
            tokens.push(Token::Str(text));
            i = next;
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (punct, width) = match (c, next) {
            ('*', Some('*')) => (Punct::StarStar, 2),
            ('/', Some('/')) => (Punct::SlashSlash, 2),
            ('=', Some('=')) => (Punct::EqEq, 2),
            ('!', Some('=')) => (Punct::NotEq, 2),
            ('<', Some('=')) => (Punct::Le, 2),
            ('>', Some('=')) => (Punct::Ge, 2),
            ('(', _) => (Punct::LParen, 1),
            (')', _) => (Punct::RParen, 1),
            ('[', _) => (Punct::LBracket, 1),
            (']', _) => (Punct::RBracket, 1),
            (',', _) => (Punct::Comma, 1),
            (':', _) => (Punct::Colon, 1),
            ('.', _) => (Punct::Dot, 1),
            ('+', _) => (Punct::Plus, 1),
            ('-', _) => (Punct::Minus, 1),
            ('*', _) => (Punct::Star, 1),
            ('/', _) => (Punct::Slash, 1),
            ('%', _) => (Punct::Percent, 1),
            ('<', _) => (Punct::Lt, 1),
            ('>', _) => (Punct::Gt, 1),
            ('?', _) => (Punct::Question, 1),
            _ => {
                tokens.push(Token::Stray(c));
                i += 1;
                continue;
            }
        };

        match punct {
            Punct::LParen => brackets.push(')'),
            Punct::LBracket => brackets.push(']'),
            Punct::RParen | Punct::RBracket => {
                let expected = if punct == Punct::RParen { ')' } else { ']' };
                if brackets.pop() != Some(expected) {
                    return Err(LexError::Unbalanced(i));
                }
            }
            _ => {}
        }
        tokens.push(Token::Punct(punct));
        i += width;
    }

    if !brackets.is_empty() {
        return Err(LexError::Unbalanced(chars.len()));
    }
    Ok(tokens)
}

fn scan_number(chars: &[char], start: usize) -> Result<(String, usize), LexError> {
    let mut i = start;
    let radix_prefix = chars[i] == '0'
        && chars
            .get(i + 1)
            .is_some_and(|c| matches!(c, 'x' | 'X' | 'o' | 'O' | 'b' | 'B'));
    if radix_prefix {
        i += 2;
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        let literal: String = chars[start..i].iter().collect();
        let radix = match chars[start + 1].to_ascii_lowercase() {
            'x' => 16,
            'o' => 8,
            _ => 2,
        };
        let digits = literal[2..].replace('_', "");
        if digits.is_empty() || i128::from_str_radix(&digits, radix).is_err() {
            return Err(LexError::BadNumber(literal));
        }
        return Ok((literal, i));
    }

    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if matches!(chars.get(i), Some('e' | 'E')) {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('+' | '-')) {
            j += 1;
        }
        if chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    Ok((chars[start..i].iter().collect(), i))
}

fn scan_string(chars: &[char], start: usize) -> Result<(String, usize), LexError> {
    let quote = chars[start];
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == quote {
            return Ok((text, i + 1));
        }
        if c == '\\' {
            let Some(&escaped) = chars.get(i + 1) else {
                break;
            };
            match escaped {
                'n' => text.push('\n'),
                't' => text.push('\t'),
                other => text.push(other),
            }
            i += 2;
            continue;
        }
        text.push(c);
        i += 1;
    }
    Err(LexError::UnterminatedString)
}

/// Rewrite fractional and exponent literals into `Decimal("...")` calls and
/// the `?` token into `random()`.
pub(crate) fn decimalize(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            Token::Number(ref lit) if is_inexact_literal(lit) => {
                out.push(Token::Name("Decimal".to_string()));
                out.push(Token::Punct(Punct::LParen));
                out.push(Token::Str(lit.clone()));
                out.push(Token::Punct(Punct::RParen));
            }
            Token::Punct(Punct::Question) => {
                out.push(Token::Name("random".to_string()));
                out.push(Token::Punct(Punct::LParen));
                out.push(Token::Punct(Punct::RParen));
            }
            other => out.push(other),
        }
    }
    out
}

fn is_inexact_literal(lit: &str) -> bool {
    let lower = lit.to_ascii_lowercase();
    !lower.starts_with("0x") && !lower.starts_with("0b") && !lower.starts_with("0o")
        && lower.contains(['.', 'e'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .map(|t| match t {
                Token::Number(n) => n.clone(),
                Token::Str(s) => format!("{s:?}"),
                Token::Name(n) => n.clone(),
                Token::Punct(p) => format!("{p:?}"),
                Token::Stray(c) => c.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_simple_expression() {
        let tokens = tokenize("b + 1").unwrap();
        assert_eq!(names(&tokens), vec!["b", "Plus", "1"]);
    }

    #[test]
    fn test_number_shapes() {
        let tokens = tokenize("2.5 1e3 .5 0x1f 7").unwrap();
        assert_eq!(names(&tokens), vec!["2.5", "1e3", ".5", "0x1f", "7"]);
    }

    #[test]
    fn test_double_dot_splits() {
        let tokens = tokenize("(2..3)").unwrap();
        assert_eq!(names(&tokens), vec!["LParen", "2.", ".3", "RParen"]);
    }

    #[test]
    fn test_unbalanced_brackets() {
        assert_eq!(tokenize("x==4)"), Err(LexError::Unbalanced(4)));
        assert!(tokenize("(a").is_err());
        assert!(tokenize("[a)").is_err());
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(tokenize("'abc"), Err(LexError::UnterminatedString));
    }

    #[test]
    fn test_bad_radix_literal() {
        assert!(matches!(tokenize("0x"), Err(LexError::BadNumber(_))));
        assert!(matches!(tokenize("0b102"), Err(LexError::BadNumber(_))));
    }

    #[test]
    fn test_stray_characters_are_kept() {
        let tokens = tokenize("x!4").unwrap();
        assert_eq!(tokens[1], Token::Stray('!'));
    }

    #[test]
    fn test_decimalize() {
        let tokens = decimalize(tokenize("2.5*x + ? + 3").unwrap());
        assert_eq!(
            names(&tokens),
            vec![
                "Decimal", "LParen", "\"2.5\"", "RParen", "Star", "x", "Plus", "random", "LParen",
                "RParen", "Plus", "3"
            ]
        );
    }
}
