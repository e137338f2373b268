use zylisp_core::{Span, ZyError};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Quote,
    /// `\` between the last two items of an improper list.
    Backslash,
    Int(i64),
    Uint64(u64),
    Float(f64),
    String(String),
    RawString(String),
    Symbol(String),
    Bool(bool),
    Char(char),
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

fn reader_error(message: impl Into<String>, span: Span) -> ZyError {
    ZyError::Reader {
        message: message.into(),
        span,
    }
}

pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, ZyError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut line = 1;
    let mut col = 1;

    macro_rules! single {
        ($tok:expr, $span:expr) => {{
            tokens.push(SpannedToken {
                token: $tok,
                span: $span,
            });
            col += 1;
            i += 1;
        }};
    }

    while i < chars.len() {
        let ch = chars[i];
        let span = Span::new(line, col);

        match ch {
            // Whitespace
            ' ' | '\t' | '\r' | ',' => {
                col += 1;
                i += 1;
            }
            '\n' => {
                line += 1;
                col = 1;
                i += 1;
            }

            // Line comments: `;` and `//`
            ';' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            // Block comments
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                col += 2;
                loop {
                    if i + 1 >= chars.len() {
                        return Err(ZyError::Incomplete("unterminated block comment".into()));
                    }
                    if chars[i] == '*' && chars[i + 1] == '/' {
                        i += 2;
                        col += 2;
                        break;
                    }
                    if chars[i] == '\n' {
                        line += 1;
                        col = 0;
                    }
                    i += 1;
                    col += 1;
                }
            }

            '(' => single!(Token::LParen, span),
            ')' => single!(Token::RParen, span),
            '[' => single!(Token::LBracket, span),
            ']' => single!(Token::RBracket, span),
            '{' => single!(Token::LBrace, span),
            '}' => single!(Token::RBrace, span),
            '\'' => single!(Token::Quote, span),
            '\\' => single!(Token::Backslash, span),

            // Strings
            '"' => {
                let mut s = String::new();
                i += 1;
                col += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        i += 1;
                        col += 1;
                        match chars[i] {
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            'r' => s.push('\r'),
                            '\\' => s.push('\\'),
                            '"' => s.push('"'),
                            '0' => s.push('\0'),
                            'u' => {
                                let mut hex = String::new();
                                for _ in 0..4 {
                                    if i + 1 >= chars.len() || !chars[i + 1].is_ascii_hexdigit() {
                                        return Err(reader_error(
                                            "\\u escape requires exactly 4 hex digits",
                                            span,
                                        ));
                                    }
                                    i += 1;
                                    col += 1;
                                    hex.push(chars[i]);
                                }
                                let c = u32::from_str_radix(&hex, 16)
                                    .ok()
                                    .and_then(char::from_u32)
                                    .ok_or_else(|| {
                                        reader_error(
                                            format!("invalid unicode scalar value \\u{hex}"),
                                            span,
                                        )
                                    })?;
                                s.push(c);
                            }
                            other => {
                                s.push('\\');
                                s.push(other);
                            }
                        }
                    } else {
                        if chars[i] == '\n' {
                            line += 1;
                            col = 0;
                        }
                        s.push(chars[i]);
                    }
                    i += 1;
                    col += 1;
                }
                if i >= chars.len() {
                    return Err(ZyError::Incomplete("unterminated string".into()));
                }
                i += 1; // closing quote
                col += 1;
                tokens.push(SpannedToken {
                    token: Token::String(s),
                    span,
                });
            }

            // Raw strings: no escapes, may span lines
            '`' => {
                i += 1;
                col += 1;
                let start = i;
                while i < chars.len() && chars[i] != '`' {
                    if chars[i] == '\n' {
                        line += 1;
                        col = 0;
                    }
                    i += 1;
                    col += 1;
                }
                if i >= chars.len() {
                    return Err(ZyError::Incomplete("unterminated raw string".into()));
                }
                let s: String = chars[start..i].iter().collect();
                i += 1;
                col += 1;
                tokens.push(SpannedToken {
                    token: Token::RawString(s),
                    span,
                });
            }

            // Character literals: #a, #space, #newline, #tab
            '#' => {
                i += 1;
                col += 1;
                if i >= chars.len() {
                    return Err(reader_error("unexpected end of input after #", span));
                }
                let start = i;
                if chars[i].is_alphabetic() {
                    while i < chars.len() && chars[i].is_alphanumeric() {
                        i += 1;
                        col += 1;
                    }
                } else {
                    i += 1;
                    col += 1;
                }
                let name: String = chars[start..i].iter().collect();
                let mut it = name.chars();
                let c = match (name.as_str(), it.next(), it.next()) {
                    ("space", _, _) => ' ',
                    ("newline", _, _) => '\n',
                    ("tab", _, _) => '\t',
                    ("return", _, _) => '\r',
                    ("nul", _, _) => '\0',
                    (_, Some(c), None) => c,
                    _ => {
                        return Err(reader_error(
                            format!("unknown character name: {name}"),
                            span,
                        ))
                    }
                };
                tokens.push(SpannedToken {
                    token: Token::Char(c),
                    span,
                });
            }

            // Numbers and symbols
            _ => {
                let signed_digit =
                    matches!(ch, '-' | '+') && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit());
                if ch.is_ascii_digit() || signed_digit {
                    let (tok, len) = read_number(&chars[i..], span)?;
                    tokens.push(SpannedToken { token: tok, span });
                    i += len;
                    col += len;
                } else if is_symbol_start(ch) {
                    let start = i;
                    while i < chars.len() && is_symbol_char(chars[i]) {
                        i += 1;
                        col += 1;
                    }
                    let name: String = chars[start..i].iter().collect();
                    let token = match name.as_str() {
                        "true" => Token::Bool(true),
                        "false" => Token::Bool(false),
                        "NaN" => Token::Float(f64::NAN),
                        _ => Token::Symbol(name),
                    };
                    tokens.push(SpannedToken { token, span });
                } else {
                    return Err(reader_error(format!("unexpected character: '{ch}'"), span));
                }
            }
        }
    }

    Ok(tokens)
}

fn read_number(chars: &[char], span: Span) -> Result<(Token, usize), ZyError> {
    let mut i = 0;
    if matches!(chars[0], '-' | '+') {
        i += 1;
    }

    // Hex: 0x1f
    if chars.get(i) == Some(&'0') && matches!(chars.get(i + 1), Some('x') | Some('X')) {
        let digits_start = i + 2;
        let mut j = digits_start;
        while j < chars.len() && chars[j].is_ascii_hexdigit() {
            j += 1;
        }
        let hex: String = chars[digits_start..j].iter().collect();
        let n = u64::from_str_radix(&hex, 16)
            .map_err(|_| reader_error(format!("invalid hex literal: 0x{hex}"), span))?;
        let negative = chars[0] == '-';
        let tok = match i64::try_from(n) {
            Ok(v) if negative => Token::Int(-v),
            Ok(v) => Token::Int(v),
            Err(_) if !negative => Token::Uint64(n),
            Err(_) => return Err(reader_error(format!("hex literal out of range: -0x{hex}"), span)),
        };
        return Ok((tok, j));
    }

    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let mut is_float = false;
    if i < chars.len() && chars[i] == '.' && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && matches!(chars[i], 'e' | 'E') {
        let mut j = i + 1;
        if j < chars.len() && matches!(chars[j], '-' | '+') {
            j += 1;
        }
        if chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    let s: String = chars[..i].iter().collect();
    if is_float {
        let f: f64 = s
            .parse()
            .map_err(|_| reader_error(format!("invalid float: {s}"), span))?;
        return Ok((Token::Float(f), i));
    }
    match s.parse::<i64>() {
        Ok(n) => Ok((Token::Int(n), i)),
        Err(_) => s
            .trim_start_matches('+')
            .parse::<u64>()
            .map(|n| (Token::Uint64(n), i))
            .map_err(|_| reader_error(format!("integer out of range: {s}"), span)),
    }
}

fn is_symbol_start(ch: char) -> bool {
    ch.is_alphabetic()
        || matches!(
            ch,
            '+' | '-'
                | '*'
                | '/'
                | '!'
                | '?'
                | '<'
                | '>'
                | '='
                | '_'
                | '&'
                | '%'
                | '^'
                | '~'
                | '.'
                | ':'
                | '$'
                | '@'
                | '|'
        )
}

fn is_symbol_char(ch: char) -> bool {
    is_symbol_start(ch) || ch.is_ascii_digit() || ch == '#'
}
