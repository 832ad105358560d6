use reasoner_core::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Eof,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {}", n),
            Self::Str(s) => format!("string '{}'", s),
            Self::Ident(name) => format!("identifier '{}'", name),
            Self::Plus => "'+'".into(),
            Self::Minus => "'-'".into(),
            Self::Star => "'*'".into(),
            Self::Slash => "'/'".into(),
            Self::LParen => "'('".into(),
            Self::RParen => "')'".into(),
            Self::LBrace => "'{'".into(),
            Self::RBrace => "'}'".into(),
            Self::Comma => "','".into(),
            Self::Eof => "end of input".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset into the source expression.
    pub position: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        let kind = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                pos += 1;
                continue;
            }
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b',' => TokenKind::Comma,
            b'0'..=b'9' | b'.' => {
                let (value, end) = lex_number(source, start)?;
                pos = end;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    position: start,
                });
                continue;
            }
            b'"' | b'\'' => {
                let (value, end) = lex_string(source, start, c)?;
                pos = end;
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    position: start,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut end = start + 1;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] == b'.')
                {
                    end += 1;
                }
                pos = end;
                tokens.push(Token {
                    kind: TokenKind::Ident(source[start..end].to_string()),
                    position: start,
                });
                continue;
            }
            _ => {
                let ch = source[start..].chars().next().unwrap_or('?');
                return Err(Error::syntax(start, format!("unexpected character '{}'", ch)));
            }
        };

        pos += 1;
        tokens.push(Token { kind, position: start });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: source.len(),
    });
    Ok(tokens)
}

fn lex_number(source: &str, start: usize) -> Result<(f64, usize)> {
    let bytes = source.as_bytes();
    let mut end = start;
    let mut seen_dot = false;

    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }

    let text = &source[start..end];
    text.parse::<f64>()
        .map(|value| (value, end))
        .map_err(|_| Error::syntax(start, format!("malformed number '{}'", text)))
}

fn lex_string(source: &str, start: usize, quote: u8) -> Result<(String, usize)> {
    let mut value = String::new();
    let mut chars = source[start + 1..].char_indices();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            c if c as u32 == quote as u32 => {
                return Ok((value, start + 1 + offset + 1));
            }
            c => value.push(c),
        }
    }

    Err(Error::syntax(start, "unterminated string literal"))
}
