//! Recursive-descent JSON parser.
//!
//! The parser walks the input once with a shared cursor. Each production
//! (object, array, string, number or word) consumes exactly its own grammar
//! and leaves the cursor on the next unread character. Any malformed input
//! aborts the whole parse; partial results are never returned.

use kvbox_types::{Map, Value};

use crate::error::{JsonError, JsonResult};

/// Maximum nesting depth of arrays and objects.
pub const MAX_DEPTH: usize = 512;

/// Signature of a reviver callback: receives the member key (the decimal
/// index for array elements, `""` for the root) and the already-revived
/// value. Returning `None` deletes the member.
pub type ReviverFn<'a> = dyn Fn(&str, Value) -> Option<Value> + 'a;

/// Parse JSON text into a [`Value`].
pub fn parse(text: &str) -> JsonResult<Value> {
    Parser::new(text).document()
}

/// Parse JSON text, then pass every member through `reviver`, innermost
/// first.
///
/// Deleted object members are removed; deleted array elements become
/// `null` so indices stay stable. Returns `Ok(None)` when the reviver
/// deletes the root.
pub fn parse_with_reviver(text: &str, reviver: &ReviverFn<'_>) -> JsonResult<Option<Value>> {
    let value = parse(text)?;
    Ok(walk(reviver, "", value))
}

fn walk(reviver: &ReviverFn<'_>, key: &str, value: Value) -> Option<Value> {
    let value = match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| walk(reviver, &k, v).map(|v| (k, v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| walk(reviver, &i.to_string(), v).unwrap_or(Value::Null))
                .collect(),
        ),
        other => other,
    };
    reviver(key, value)
}

struct Parser<'t> {
    text: &'t str,
    chars: Vec<char>,
    /// Index of the next unread character.
    at: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            at: 0,
            depth: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> JsonError {
        JsonError::Syntax {
            message: message.into(),
            at: self.at,
            text: self.text.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.at).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.at += 1;
        }
        c
    }

    fn expect(&mut self, c: char) -> JsonResult<()> {
        match self.peek() {
            Some(ch) if ch == c => {
                self.at += 1;
                Ok(())
            }
            Some(ch) => Err(self.error(format!("Expected '{c}' instead of '{ch}'"))),
            None => Err(self.error(format!("Expected '{c}' instead of end of input"))),
        }
    }

    /// Skip whitespace: anything at or below U+0020.
    fn white(&mut self) {
        while matches!(self.peek(), Some(c) if c <= ' ') {
            self.at += 1;
        }
    }

    fn document(&mut self) -> JsonResult<Value> {
        let value = self.value()?;
        self.white();
        if self.peek().is_some() {
            return Err(self.error("Syntax error"));
        }
        Ok(value)
    }

    fn value(&mut self) -> JsonResult<Value> {
        self.white();
        match self.peek() {
            Some('{') => self.nested(Self::object),
            Some('[') => self.nested(Self::array),
            Some('"') => self.string().map(Value::String),
            Some('-') | Some('0'..='9') => self.number(),
            _ => self.word(),
        }
    }

    fn nested(&mut self, production: fn(&mut Self) -> JsonResult<Value>) -> JsonResult<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("Too deeply nested"));
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    /// `true`, `false` or `null`.
    fn word(&mut self) -> JsonResult<Value> {
        let (literal, value) = match self.peek() {
            Some('t') => ("true", Value::Bool(true)),
            Some('f') => ("false", Value::Bool(false)),
            Some('n') => ("null", Value::Null),
            Some(c) => return Err(self.error(format!("Unexpected '{c}'"))),
            None => return Err(self.error("Unexpected end of input")),
        };
        for c in literal.chars() {
            self.expect(c)?;
        }
        Ok(value)
    }

    fn number(&mut self) -> JsonResult<Value> {
        let start = self.at;
        let mut integral = true;

        if self.peek() == Some('-') {
            self.at += 1;
        }
        self.digits();
        if self.peek() == Some('.') {
            integral = false;
            self.at += 1;
            self.digits();
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            integral = false;
            self.at += 1;
            if matches!(self.peek(), Some('-') | Some('+')) {
                self.at += 1;
            }
            self.digits();
        }

        let literal: String = self.chars[start..self.at].iter().collect();
        if integral {
            if let Ok(i) = literal.parse::<i64>() {
                return Ok(Value::Int(i));
            }
        }
        match literal.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(self.error("Bad number")),
        }
    }

    fn digits(&mut self) {
        while matches!(self.peek(), Some('0'..='9')) {
            self.at += 1;
        }
    }

    fn string(&mut self) -> JsonResult<String> {
        if self.peek() != Some('"') {
            return Err(self.error("Bad string"));
        }
        self.at += 1;

        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => {
                    let unescaped = match self.bump() {
                        Some('u') => self.unicode_escape()?,
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        _ => return Err(self.error("Bad string")),
                    };
                    out.push(unescaped);
                }
                Some(c) => out.push(c),
                None => return Err(self.error("Bad string")),
            }
        }
    }

    /// Decode the payload of a `\u` escape, pairing UTF-16 surrogates.
    fn unicode_escape(&mut self) -> JsonResult<char> {
        let unit = self.hex4()?;
        let code = match unit {
            0xD800..=0xDBFF => {
                if self.peek() != Some('\\') || self.chars.get(self.at + 1) != Some(&'u') {
                    return Err(self.error("Bad string: unpaired surrogate"));
                }
                self.at += 2;
                let low = self.hex4()?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(self.error("Bad string: unpaired surrogate"));
                }
                0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
            }
            _ => unit,
        };
        char::from_u32(code).ok_or_else(|| self.error("Bad string: unpaired surrogate"))
    }

    fn hex4(&mut self) -> JsonResult<u32> {
        let mut unit = 0;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("Bad string"))?;
            unit = unit * 16 + digit;
        }
        Ok(unit)
    }

    fn array(&mut self) -> JsonResult<Value> {
        let mut items = Vec::new();
        self.expect('[')?;
        self.white();
        if self.peek() == Some(']') {
            self.at += 1;
            return Ok(Value::Array(items));
        }
        while self.peek().is_some() {
            items.push(self.value()?);
            self.white();
            if self.peek() == Some(']') {
                self.at += 1;
                return Ok(Value::Array(items));
            }
            self.expect(',')?;
            self.white();
        }
        Err(self.error("Bad array"))
    }

    fn object(&mut self) -> JsonResult<Value> {
        let mut map = Map::new();
        self.expect('{')?;
        self.white();
        if self.peek() == Some('}') {
            self.at += 1;
            return Ok(Value::Object(map));
        }
        while self.peek().is_some() {
            let key = self.string()?;
            self.white();
            self.expect(':')?;
            if map.contains_key(&key) {
                return Err(self.error(format!("Duplicate key \"{key}\"")));
            }
            let value = self.value()?;
            map.insert(key, value);
            self.white();
            if self.peek() == Some('}') {
                self.at += 1;
                return Ok(Value::Object(map));
            }
            self.expect(',')?;
            self.white();
        }
        Err(self.error("Bad object"))
    }
}
