use zylisp_core::{Span, Sexp, ZyError};

use crate::lexer::{tokenize, SpannedToken, Token};

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or(Span::new(0, 0))
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn parse_expr(&mut self) -> Result<Sexp, ZyError> {
        let span = self.span();
        match self.peek() {
            None => Err(ZyError::Incomplete("unexpected end of input".into())),
            Some(Token::LParen) => self.parse_list(),
            Some(Token::LBracket) => self.parse_array(),
            Some(Token::LBrace) => self.parse_hash(),
            Some(Token::Quote) => {
                self.advance();
                let inner = self.parse_expr()?;
                Ok(Sexp::list(vec![Sexp::symbol("quote"), inner]))
            }
            Some(Token::RParen) | Some(Token::RBracket) | Some(Token::RBrace) => {
                Err(ZyError::Reader {
                    message: "unexpected closing delimiter".into(),
                    span,
                })
            }
            Some(Token::Backslash) => Err(ZyError::Reader {
                message: "`\\` is only valid inside a list".into(),
                span,
            }),
            Some(_) => self.parse_atom(),
        }
    }

    /// Items up to `close`, which is consumed.
    fn parse_seq(&mut self, close: &Token, what: &str) -> Result<Vec<Sexp>, ZyError> {
        self.advance(); // opener
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(ZyError::Incomplete(format!("unterminated {what}"))),
                Some(t) if t == close => {
                    self.advance();
                    return Ok(items);
                }
                _ => items.push(self.parse_expr()?),
            }
        }
    }

    fn parse_list(&mut self) -> Result<Sexp, ZyError> {
        self.advance(); // (
        let mut items = Vec::new();
        loop {
            let span = self.span();
            match self.peek() {
                None => return Err(ZyError::Incomplete("unterminated list".into())),
                Some(Token::RParen) => {
                    self.advance();
                    return Ok(Sexp::list(items));
                }
                // Improper list: (a b \ c)
                Some(Token::Backslash) => {
                    self.advance();
                    if items.is_empty() {
                        return Err(ZyError::Reader {
                            message: "`\\` needs an item before it".into(),
                            span,
                        });
                    }
                    let tail = self.parse_expr()?;
                    match self.peek() {
                        Some(Token::RParen) => {
                            self.advance();
                        }
                        None => return Err(ZyError::Incomplete("unterminated list".into())),
                        Some(_) => {
                            return Err(ZyError::Reader {
                                message: "expected `)` after improper list tail".into(),
                                span: self.span(),
                            })
                        }
                    }
                    return Ok(items
                        .into_iter()
                        .rev()
                        .fold(tail, |acc, head| Sexp::cons(head, acc)));
                }
                _ => items.push(self.parse_expr()?),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Sexp, ZyError> {
        let items = self.parse_seq(&Token::RBracket, "array")?;
        Ok(Sexp::array(items))
    }

    /// `{k v ...}` reads as `(hash k v ...)`; bare symbol keys are quoted.
    fn parse_hash(&mut self) -> Result<Sexp, ZyError> {
        let span = self.span();
        let items = self.parse_seq(&Token::RBrace, "hash literal")?;
        if items.len() % 2 != 0 {
            return Err(ZyError::Reader {
                message: "hash literal needs an even number of forms".into(),
                span,
            });
        }
        let mut form = vec![Sexp::symbol("hash")];
        for (i, item) in items.into_iter().enumerate() {
            match item {
                Sexp::Symbol(_) if i % 2 == 0 => {
                    form.push(Sexp::list(vec![Sexp::symbol("quote"), item]))
                }
                other => form.push(other),
            }
        }
        Ok(Sexp::list(form))
    }

    fn parse_atom(&mut self) -> Result<Sexp, ZyError> {
        let span = self.span();
        let token = match self.advance() {
            Some(t) => t.token.clone(),
            None => return Err(ZyError::Incomplete("unexpected end of input".into())),
        };
        Ok(match token {
            Token::Int(n) => Sexp::Int(n),
            Token::Uint64(n) => Sexp::Uint64(n),
            Token::Float(f) => Sexp::Float(f),
            Token::String(s) => Sexp::string(s),
            Token::RawString(s) => Sexp::raw_string(s),
            Token::Bool(b) => Sexp::Bool(b),
            Token::Char(c) => Sexp::Char(c),
            Token::Symbol(s) if s == "nil" => Sexp::Null,
            Token::Symbol(s) => Sexp::symbol(&s),
            other => {
                return Err(ZyError::Reader {
                    message: format!("unexpected token: {other:?}"),
                    span,
                })
            }
        })
    }
}

/// Read a single expression.
pub fn read(input: &str) -> Result<Sexp, ZyError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    if parser.at_end() {
        return Ok(Sexp::End);
    }
    parser.parse_expr()
}

/// Read every expression in `input`.
pub fn read_many(input: &str) -> Result<Vec<Sexp>, ZyError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let mut exprs = Vec::new();
    while !parser.at_end() {
        exprs.push(parser.parse_expr()?);
    }
    Ok(exprs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(s: &str) -> String {
        read(s).unwrap().to_string()
    }

    #[test]
    fn lists_and_arrays() {
        assert_eq!(one("(+ 1 2)"), "(+ 1 2)");
        assert_eq!(one("[1 [2 3]]"), "[1 [2 3]]");
        assert_eq!(one("()"), "nil");
        assert_eq!(one("(a b \\ c)"), "(a b \\ c)");
    }

    #[test]
    fn quote_and_hash_sugar() {
        assert_eq!(one("'x"), "(quote x)");
        assert_eq!(one("{a 1 b c}"), "(hash (quote a) 1 (quote b) c)");
        assert_eq!(one("{\"k\" 1}"), "(hash \"k\" 1)");
        assert!(matches!(read("{a}"), Err(ZyError::Reader { .. })));
    }

    #[test]
    fn atoms() {
        assert_eq!(read("nil").unwrap(), Sexp::Null);
        assert_eq!(read("true").unwrap(), Sexp::Bool(true));
        assert!(matches!(read("NaN").unwrap(), Sexp::Float(f) if f.is_nan()));
        match read("`raw`").unwrap() {
            Sexp::Str(s) => assert!(s.raw),
            other => panic!("expected string, got {other}"),
        }
        assert!(read("a.b").unwrap().as_symbol().unwrap().is_dot());
    }

    #[test]
    fn empty_input_is_end() {
        assert_eq!(read("  ; nothing").unwrap(), Sexp::End);
        assert!(read_many("").unwrap().is_empty());
    }

    #[test]
    fn unclosed_forms_are_incomplete() {
        for src in ["(a b", "[1 2", "{a 1", "'", "(a \\"] {
            let err = read_many(src).unwrap_err();
            assert!(err.is_incomplete(), "{src:?} gave {err}");
        }
    }

    #[test]
    fn stray_closer_is_an_error() {
        let err = read_many("(a))").unwrap_err();
        assert!(matches!(err, ZyError::Reader { .. }));
        assert!(!err.is_incomplete());
    }

    #[test]
    fn many() {
        let v = read_many("(def x 1) x").unwrap();
        assert_eq!(v.len(), 2);
    }
}
