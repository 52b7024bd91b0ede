//! Parser for Python literal syntax (the `repr` of dicts, lists, tuples,
//! strings, numbers, booleans and `None`).
//!
//! Several public review dumps are written one Python `dict` per line rather
//! than JSON: single-quoted strings, `True`/`None`, tuples. This parser turns
//! such a line into a `serde_json::Value` so the same serde types can be used
//! for both formats.
//!
//! Numbers are read more loosely than Python reads them:
//!
//! - leading zeros are accepted, so `007` is `7`;
//! - `_` separators are dropped wherever they appear, including a trailing one;
//! - whitespace between a sign and its digits is skipped;
//! - integers outside both `i64` and `u64` become the nearest `f64`.
//!
//! Prefixed literals (`0x`, `0o`, `0b`) must fit in `i64`. A prefix with no
//! digits or with digits outside its radix is still an error, as is any float
//! that is not finite.

use serde_json::{Map, Number, Value};
use thiserror::Error;

const MAX_DEPTH: usize = 128;

#[derive(Debug, Error, PartialEq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub message: String,
    pub offset: usize,
}

/// Parse a complete Python literal. Trailing non-whitespace is an error.
pub fn parse_literal(src: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser { src, pos: 0 };
    let value = parser.parse_value(0)?;
    parser.skip_whitespace();
    if parser.pos < src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            message: message.to_string(),
            offset: self.pos,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('{') => self.parse_brace(depth),
            Some('[') => {
                self.bump();
                Ok(Value::Array(self.parse_sequence(']', depth)?))
            }
            Some('(') => self.parse_paren(depth),
            Some('\'') | Some('"') => self.parse_strings(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                self.parse_number()
            }
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_word(),
            Some(_) => Err(self.error("unexpected character")),
        }
    }

    /// Comma-separated values up to `close`, trailing comma allowed.
    fn parse_sequence(&mut self, close: char, depth: usize) -> Result<Vec<Value>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.parse_value(depth + 1)?);
            self.skip_whitespace();
            if self.eat(',') {
                continue;
            }
            if self.eat(close) {
                return Ok(items);
            }
            return Err(self.error("expected ',' or closing bracket"));
        }
    }

    /// `(x)` is just `x`; `()`, `(x,)` and `(x, y)` are tuples.
    fn parse_paren(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.bump();
        self.skip_whitespace();
        if self.eat(')') {
            return Ok(Value::Array(Vec::new()));
        }
        let first = self.parse_value(depth + 1)?;
        self.skip_whitespace();
        if self.eat(')') {
            return Ok(first);
        }
        if !self.eat(',') {
            return Err(self.error("expected ',' or ')'"));
        }
        let mut items = vec![first];
        items.extend(self.parse_sequence(')', depth)?);
        Ok(Value::Array(items))
    }

    /// A `{...}` is a dict when its first element is followed by `:`,
    /// otherwise a set, which becomes an array.
    fn parse_brace(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.bump();
        self.skip_whitespace();
        if self.eat('}') {
            return Ok(Value::Object(Map::new()));
        }
        let first = self.parse_value(depth + 1)?;
        self.skip_whitespace();
        if !self.eat(':') {
            let mut items = vec![first];
            if self.eat(',') {
                items.extend(self.parse_sequence('}', depth)?);
            } else if !self.eat('}') {
                return Err(self.error("expected ',' or '}'"));
            }
            return Ok(Value::Array(items));
        }

        let mut map = Map::new();
        let mut key = self.key_string(first)?;
        loop {
            let value = self.parse_value(depth + 1)?;
            map.insert(key, value);
            self.skip_whitespace();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            if !self.eat(',') {
                return Err(self.error("expected ',' or '}'"));
            }
            self.skip_whitespace();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            let next = self.parse_value(depth + 1)?;
            key = self.key_string(next)?;
            self.skip_whitespace();
            if !self.eat(':') {
                return Err(self.error("expected ':'"));
            }
        }
    }

    fn key_string(&self, key: Value) -> Result<String, LiteralError> {
        match key {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(if b { "True" } else { "False" }.to_string()),
            Value::Null => Ok("None".to_string()),
            _ => Err(self.error("unhashable dict key")),
        }
    }

    fn parse_word(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let word = &self.src[start..self.pos];
        match word {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ if is_string_prefix(word) && matches!(self.peek(), Some('\'') | Some('"')) => {
                self.pos = start;
                self.parse_strings()
            }
            _ => {
                self.pos = start;
                Err(self.error("unknown identifier"))
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let negative = if self.eat('-') {
            true
        } else {
            self.eat('+');
            false
        };
        self.skip_whitespace();
        let digits_start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.pos += 1;
            } else if (c == '-' || c == '+')
                && matches!(self.src[..self.pos].chars().last(), Some('e') | Some('E'))
                && !self.src[digits_start..self.pos].starts_with("0x")
            {
                self.pos += 1;
            } else {
                break;
            }
        }
        let body: String = self.src[digits_start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if body.is_empty() {
            self.pos = start;
            return Err(self.error("expected a number"));
        }

        let radix = match body.get(..2).map(|p| p.to_ascii_lowercase()) {
            Some(p) if p == "0x" => Some(16),
            Some(p) if p == "0o" => Some(8),
            Some(p) if p == "0b" => Some(2),
            _ => None,
        };
        let number = if let Some(radix) = radix {
            i64::from_str_radix(&body[2..], radix)
                .ok()
                .map(|n| Number::from(if negative { -n } else { n }))
        } else if body.chars().all(|c| c.is_ascii_digit()) {
            let signed = if negative { format!("-{}", body) } else { body.clone() };
            signed
                .parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| signed.parse::<u64>().ok().map(Number::from))
                .or_else(|| signed.parse::<f64>().ok().and_then(Number::from_f64))
        } else {
            body.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .and_then(|f| Number::from_f64(if negative { -f } else { f }))
        };

        number.map(Value::Number).ok_or_else(|| LiteralError {
            message: format!("invalid number literal '{}'", &self.src[start..self.pos]),
            offset: start,
        })
    }

    /// One or more adjacent string literals, concatenated as Python does.
    fn parse_strings(&mut self) -> Result<Value, LiteralError> {
        let mut out = String::new();
        loop {
            self.parse_one_string(&mut out)?;
            let save = self.pos;
            self.skip_whitespace();
            let prefix_len = self
                .rest()
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .count();
            let prefix = &self.rest()[..prefix_len];
            let after_prefix = self.rest()[prefix_len..].chars().next();
            if (prefix.is_empty() || is_string_prefix(prefix))
                && matches!(after_prefix, Some('\'') | Some('"'))
            {
                continue;
            }
            self.pos = save;
            return Ok(Value::String(out));
        }
    }

    fn parse_one_string(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let mut raw = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                if c == 'r' || c == 'R' {
                    raw = true;
                }
                self.pos += 1;
            } else {
                break;
            }
        }
        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a string literal")),
        };
        let triple = self.rest().starts_with(&format!("{quote}{quote}"));
        if triple {
            self.pos += 2;
        }

        loop {
            let c = self
                .bump()
                .ok_or_else(|| self.error("unterminated string literal"))?;
            if c == quote {
                if !triple {
                    return Ok(());
                }
                if self.rest().starts_with(&format!("{quote}{quote}")) {
                    self.pos += 2;
                    return Ok(());
                }
                out.push(c);
                continue;
            }
            if c == '\n' && !triple {
                return Err(self.error("newline in single-quoted string"));
            }
            if c != '\\' {
                out.push(c);
                continue;
            }

            let escaped = self
                .bump()
                .ok_or_else(|| self.error("unterminated escape sequence"))?;
            if raw {
                out.push('\\');
                out.push(escaped);
                continue;
            }
            match escaped {
                '\n' => {}
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                'a' => out.push('\u{07}'),
                'b' => out.push('\u{08}'),
                'f' => out.push('\u{0C}'),
                'v' => out.push('\u{0B}'),
                'x' => out.push(self.hex_escape(2)?),
                'u' => out.push(self.hex_escape(4)?),
                'U' => out.push(self.hex_escape(8)?),
                '0'..='7' => {
                    let mut code = escaped.to_digit(8).unwrap_or(0);
                    for _ in 0..2 {
                        match self.peek().and_then(|c| c.to_digit(8)) {
                            Some(d) => {
                                code = code * 8 + d;
                                self.pos += 1;
                            }
                            None => break,
                        }
                    }
                    out.push(
                        char::from_u32(code).ok_or_else(|| self.error("invalid octal escape"))?,
                    );
                }
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }
    }

    fn hex_escape(&mut self, len: usize) -> Result<char, LiteralError> {
        let digits = self
            .rest()
            .get(..len)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("truncated hex escape"))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos += len;
        char::from_u32(code).ok_or_else(|| self.error("escape is not a valid character"))
    }
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "br" | "rb"
    )
}
