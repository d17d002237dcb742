//! Recursive-descent parser for the frame grammar.
//!
//! ```text
//! command    := id ":" identifier args? EOL
//! id         := "*" | digits
//! identifier := (alnum | "/" | "_" | "-")+
//! args       := (WS arg)+
//! arg        := bool | float | int | str
//! bool       := "yes" | "no"
//! float      := ["-"] digits "." digits
//! int        := ["-"] digits
//! str        := '"' ( '\"' | any-char-except-unescaped-quote )* '"'
//! EOL        := "\n"
//! ```
//!
//! Horizontal whitespace between the last argument and the newline is
//! tolerated. Inside strings `\"` is the only escape; any other backslash
//! is kept as-is.

use crate::arg::Arg;
use crate::codec::{is_identifier_char, Frame, SeqId};
use crate::error::ParseError;

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Parse one `\n`-terminated line.
pub fn parse_frame(input: &str) -> ParseResult<Frame> {
    Parser::new(input).command()
}

/// Parse a single argument token such as `yes`, `-3`, `2.5` or `"text"`.
/// The whole input must be consumed.
pub fn parse_arg(input: &str) -> ParseResult<Arg> {
    let mut parser = Parser::new(input);
    let arg = parser.arg()?;
    if parser.pos != input.len() {
        return Err(parser.error("trailing data after argument"));
    }
    Ok(arg)
}

struct Parser<'a> {
    src: &'a str,
    /// Byte offset of the next unread character.
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn command(mut self) -> ParseResult<Frame> {
        let seq_id = self.seq_id()?;
        self.expect(':', "expected ':' after sequence id")?;
        let identifier = self.identifier()?;
        let args = self.args()?;
        self.eol()?;

        Ok(Frame {
            seq_id,
            identifier,
            args,
        })
    }

    fn seq_id(&mut self) -> ParseResult<SeqId> {
        if self.eat('*') {
            return Ok(SeqId::Notification);
        }

        let start = self.pos;
        let digits = self.digits();
        if digits.is_empty() {
            return Err(self.error("expected sequence id ('*' or digits)"));
        }
        digits
            .parse::<u32>()
            .map(SeqId::Id)
            .map_err(|_| self.error_at(start, "sequence id out of range"))
    }

    fn identifier(&mut self) -> ParseResult<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_identifier_char) {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected command identifier"));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn args(&mut self) -> ParseResult<Option<Vec<Arg>>> {
        let mut args = Vec::new();
        loop {
            let separated = self.skip_whitespace();
            match self.peek() {
                None | Some('\n') => break,
                Some(c) if !separated => {
                    return Err(self.error(format!("unexpected character {c:?}")));
                }
                Some(_) => args.push(self.arg()?),
            }
        }
        Ok(if args.is_empty() { None } else { Some(args) })
    }

    fn arg(&mut self) -> ParseResult<Arg> {
        // bool is tried first so `yes`/`no` never reach the numeric rules.
        if let Some(value) = self.boolean() {
            return Ok(Arg::Bool(value));
        }
        match self.peek() {
            Some('"') => self.string(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            _ => {
                let token = self.token_preview();
                Err(self.error(format!("invalid argument '{token}'")))
            }
        }
    }

    fn boolean(&mut self) -> Option<bool> {
        let src = self.src;
        let rest = &src[self.pos..];
        let (value, len) = if rest.starts_with("yes") {
            (true, 3)
        } else if rest.starts_with("no") {
            (false, 2)
        } else {
            return None;
        };

        if !is_delimiter(rest[len..].chars().next()) {
            return None;
        }
        self.pos += len;
        Some(value)
    }

    fn number(&mut self) -> ParseResult<Arg> {
        let start = self.pos;
        self.eat('-');
        if self.digits().is_empty() {
            return Err(self.error("expected digits"));
        }

        let is_float = self.eat('.');
        if is_float && self.digits().is_empty() {
            return Err(self.error("expected digits after decimal point"));
        }
        if !is_delimiter(self.peek()) {
            let c = self.peek().unwrap_or_default();
            return Err(self.error(format!("unexpected character {c:?} in number")));
        }

        let src = self.src;
        let text = &src[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(Arg::Float)
                .map_err(|_| self.error_at(start, format!("invalid float '{text}'")))
        } else {
            text.parse::<i64>()
                .map(Arg::Int)
                .map_err(|_| self.error_at(start, format!("integer '{text}' out of range")))
        }
    }

    fn string(&mut self) -> ParseResult<Arg> {
        let start = self.pos;
        self.bump();

        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error_at(start, "unterminated string")),
                Some('\\') if self.peek() == Some('"') => {
                    self.bump();
                    value.push('"');
                }
                Some('"') => break,
                Some(c) => value.push(c),
            }
        }

        if !is_delimiter(self.peek()) {
            return Err(self.error("expected whitespace after string"));
        }
        Ok(Arg::Str(value))
    }

    fn eol(&mut self) -> ParseResult<()> {
        match self.peek() {
            Some('\n') => {
                self.bump();
            }
            None => return Err(self.error("missing end of line")),
            Some(c) => return Err(self.error(format!("unexpected character {c:?}"))),
        }
        if self.pos != self.src.len() {
            return Err(self.error("trailing data after end of line"));
        }
        Ok(())
    }

    fn digits(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let src = self.src;
        &src[start..self.pos]
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }
        self.pos > start
    }

    fn token_preview(&self) -> &'a str {
        let src = self.src;
        let rest = &src[self.pos..];
        let end = rest
            .find(|c: char| c.is_whitespace())
            .unwrap_or(rest.len());
        &rest[..end]
    }

    fn expect(&mut self, expected: char, reason: &str) -> ParseResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        self.error_at(self.pos, reason)
    }

    fn error_at(&self, pos: usize, reason: impl Into<String>) -> ParseError {
        ParseError::new(self.src[..pos].chars().count() + 1, reason)
    }
}

fn is_delimiter(c: Option<char>) -> bool {
    matches!(c, None | Some(' ' | '\t' | '\n'))
}
