use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{alpha1, alphanumeric1, char, digit1},
    combinator::{opt, recognize, rest},
    multi::many0,
    sequence::pair,
    IResult, Parser as NomParser,
};

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let lexer = Lexer::new(source);
    lexer.run()
}

/// Literal text up to the next tag opener, or the rest of the input.
fn text_segment(input: &str) -> IResult<&str, &str> {
    alt((take_until("<%"), rest)).parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(digit1, opt(pair(char('.'), digit1)))).parse(input)
}

struct Lexer<'a> {
    src: &'a str,
    offset: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            offset: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Vec<LexError>> {
        while !self.remaining().is_empty() {
            self.lex_text();
            if self.remaining().starts_with("<%") {
                self.lex_tag();
            }
        }
        self.push_token(TokenKind::Eof, self.offset, self.offset);

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn remaining(&self) -> &'a str {
        &self.src[self.offset..]
    }

    fn current(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.offset += ch.len_utf8();
        Some(ch)
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    fn error(&mut self, start: usize, end: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, end),
        });
    }

    fn lex_text(&mut self) {
        let start = self.offset;
        let Ok((_, text)) = text_segment(self.remaining()) else {
            return;
        };
        if text.is_empty() {
            return;
        }
        self.offset += text.len();
        self.push_token(TokenKind::Text(text.to_string()), start, self.offset);
    }

    fn lex_tag(&mut self) {
        let start = self.offset;
        if self.remaining().starts_with("<%#") {
            match self.remaining().find("%>") {
                Some(end) => self.offset += end + 2,
                None => {
                    self.offset = self.src.len();
                    self.error(start, self.offset, "Unterminated comment tag");
                }
            }
            return;
        }
        if self.remaining().starts_with("<%=") {
            self.offset += 3;
            self.push_token(TokenKind::OpenOutput, start, self.offset);
        } else {
            self.offset += 2;
            self.push_token(TokenKind::OpenCode, start, self.offset);
        }
        self.lex_code(start);
    }

    fn lex_code(&mut self, tag_start: usize) {
        while let Some(ch) = self.current() {
            match ch {
                '%' if self.peek() == Some('>') => {
                    let start = self.offset;
                    self.offset += 2;
                    self.push_token(TokenKind::Close, start, self.offset);
                    return;
                }
                ch if ch.is_whitespace() => {
                    self.bump();
                }
                ch if ch.is_ascii_alphabetic() || ch == '_' => self.lex_identifier(),
                ch if ch.is_ascii_digit() => self.lex_number(),
                '"' | '\'' => self.lex_string(ch),
                _ => self.lex_symbol(),
            }
        }
        self.error(tag_start, self.offset, "Unterminated tag, expected '%>'");
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        let Ok((_, ident)) = identifier(self.remaining()) else {
            self.bump();
            self.error(start, self.offset, "Invalid identifier");
            return;
        };
        self.offset += ident.len();
        let kind =
            TokenKind::keyword(ident).unwrap_or_else(|| TokenKind::Identifier(ident.to_string()));
        self.push_token(kind, start, self.offset);
    }

    fn lex_number(&mut self) {
        let start = self.offset;
        let Ok((_, text)) = number(self.remaining()) else {
            self.bump();
            self.error(start, self.offset, "Invalid number literal");
            return;
        };
        self.offset += text.len();
        let end = self.offset;

        if text.contains('.') {
            match text.parse::<f64>() {
                Ok(value) => self.push_token(TokenKind::Float(value), start, end),
                Err(_) => self.error(start, end, "Invalid float literal"),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.push_token(TokenKind::Integer(value), start, end),
                Err(_) => self.error(start, end, "Invalid integer literal"),
            }
        }
    }

    fn lex_string(&mut self, quote: char) {
        let start = self.offset;
        self.bump();
        let mut value = String::new();
        while let Some(ch) = self.current() {
            match ch {
                ch if ch == quote => {
                    self.bump();
                    let end = self.offset;
                    self.push_token(TokenKind::String(value), start, end);
                    return;
                }
                '\\' => {
                    self.bump();
                    if let Some(escaped) = self.bump() {
                        value.push(match escaped {
                            'n' => '\n',
                            'r' => '\r',
                            't' => '\t',
                            other => other,
                        });
                    } else {
                        break;
                    }
                }
                _ => {
                    value.push(ch);
                    self.bump();
                }
            }
        }
        self.error(start, self.offset, "Unterminated string literal");
    }

    fn lex_symbol(&mut self) {
        let start = self.offset;
        match self.current() {
            Some('(') => self.single(TokenKind::LParen),
            Some(')') => self.single(TokenKind::RParen),
            Some('{') => self.single(TokenKind::LBrace),
            Some('}') => self.single(TokenKind::RBrace),
            Some('[') => self.single(TokenKind::LBracket),
            Some(']') => self.single(TokenKind::RBracket),
            Some(',') => self.single(TokenKind::Comma),
            Some(':') => self.single(TokenKind::Colon),
            Some(';') => self.single(TokenKind::Semi),
            Some('.') => self.single(TokenKind::Dot),
            Some('+') => self.single(TokenKind::Plus),
            Some('-') => self.single(TokenKind::Minus),
            Some('*') => self.single(TokenKind::Star),
            Some('/') => self.single(TokenKind::Slash),
            Some('%') => self.single(TokenKind::Percent),
            Some('!') => self.one_or_two('=', TokenKind::Bang, TokenKind::BangEq),
            Some('=') => self.one_or_two('=', TokenKind::Eq, TokenKind::EqEq),
            Some('<') => self.one_or_two('=', TokenKind::Lt, TokenKind::LtEq),
            Some('>') => self.one_or_two('=', TokenKind::Gt, TokenKind::GtEq),
            Some('&') if self.peek() == Some('&') => {
                self.offset += 2;
                self.push_token(TokenKind::AmpersandAmpersand, start, self.offset);
            }
            Some('|') if self.peek() == Some('|') => {
                self.offset += 2;
                self.push_token(TokenKind::PipePipe, start, self.offset);
            }
            Some(ch) => {
                self.bump();
                self.error(start, self.offset, format!("Unexpected character '{}'", ch));
            }
            None => {}
        }
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.offset;
        self.bump();
        self.push_token(kind, start, self.offset);
    }

    fn one_or_two(&mut self, second: char, one: TokenKind, two: TokenKind) {
        let start = self.offset;
        self.bump();
        if self.current() == Some(second) {
            self.bump();
            self.push_token(two, start, self.offset);
        } else {
            self.push_token(one, start, self.offset);
        }
    }
}
