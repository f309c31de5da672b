use crate::errors::EvalError;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Question,
    Colon,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn syntax(position: usize, message: impl Into<String>) -> EvalError {
    EvalError::Syntax {
        position,
        message: message.into(),
    }
}

pub fn tokenize(src: &str) -> Result<Vec<Spanned>, EvalError> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let token = match c {
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b'.' if !bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => Token::Dot,
            b',' => Token::Comma,
            b'?' => Token::Question,
            b':' => Token::Colon,
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'%' => Token::Percent,
            b'<' | b'>' | b'=' | b'!' => {
                // `===` / `!==` are accepted as spellings of `==` / `!=`.
                let eq1 = bytes.get(i + 1) == Some(&b'=');
                let eq2 = eq1 && bytes.get(i + 2) == Some(&b'=');
                let (token, len) = match (c, eq1) {
                    (b'<', true) => (Token::Le, 2),
                    (b'<', false) => (Token::Lt, 1),
                    (b'>', true) => (Token::Ge, 2),
                    (b'>', false) => (Token::Gt, 1),
                    (b'=', true) => (Token::EqEq, if eq2 { 3 } else { 2 }),
                    (b'!', true) => (Token::NotEq, if eq2 { 3 } else { 2 }),
                    (b'!', false) => (Token::Bang, 1),
                    _ => return Err(syntax(i, "unexpected `=`; use `==` for comparison")),
                };
                out.push(Spanned { token, pos: start });
                i += len;
                continue;
            }
            b'&' | b'|' => {
                if bytes.get(i + 1) != Some(&c) {
                    return Err(syntax(i, format!("unexpected `{}`", c as char)));
                }
                out.push(Spanned {
                    token: if c == b'&' { Token::AndAnd } else { Token::OrOr },
                    pos: start,
                });
                i += 2;
                continue;
            }
            b'\'' | b'"' => {
                let (s, next) = lex_string(src, i)?;
                out.push(Spanned {
                    token: Token::Str(s),
                    pos: start,
                });
                i = next;
                continue;
            }
            b'0' if matches!(bytes.get(i + 1), Some(b'x') | Some(b'X')) => {
                // Hex literals are byte strings, not numbers.
                i += 2;
                while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
                    i += 1;
                }
                out.push(Spanned {
                    token: Token::Str(src[start..i].to_string()),
                    pos: start,
                });
                continue;
            }
            b'0'..=b'9' | b'.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let text = &src[start..i];
                let n = text
                    .parse::<f64>()
                    .map_err(|_| syntax(start, format!("invalid number `{text}`")))?;
                out.push(Spanned {
                    token: Token::Number(n),
                    pos: start,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' || c == b'$' => {
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'$')
                {
                    i += 1;
                }
                out.push(Spanned {
                    token: Token::Ident(src[start..i].to_string()),
                    pos: start,
                });
                continue;
            }
            _ => {
                let ch = src[i..].chars().next().unwrap_or('?');
                return Err(syntax(i, format!("unexpected character `{ch}`")));
            }
        };
        out.push(Spanned { token, pos: start });
        i += 1;
    }

    out.push(Spanned {
        token: Token::Eof,
        pos: src.len(),
    });
    Ok(out)
}

fn lex_string(src: &str, start: usize) -> Result<(String, usize), EvalError> {
    let mut chars = src[start..].char_indices();
    let quote = chars.next().map(|(_, c)| c).unwrap_or('"');
    let mut out = String::new();
    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            c if c == quote => return Ok((out, start + offset + c.len_utf8())),
            c => out.push(c),
        }
    }
    Err(syntax(start, "unterminated string"))
}
