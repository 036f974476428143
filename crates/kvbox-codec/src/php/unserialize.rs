use std::str;

use kvbox_types::{Map, Value};

use crate::error::{PhpError, PhpResult};

/// Maximum nesting depth of arrays.
///
/// The reader recurses once per level, so this stays well inside a 2 MiB
/// thread stack in unoptimized builds.
pub const MAX_DEPTH: usize = 128;

/// Type tag at the head of every serialized value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    Bool,
    Int,
    Double,
    String,
    Array,
    Null,
}

impl Tag {
    /// Tags are matched case-insensitively.
    pub fn from_byte(byte: u8) -> Option<Tag> {
        match byte.to_ascii_lowercase() {
            b'b' => Some(Tag::Bool),
            b'i' => Some(Tag::Int),
            b'd' => Some(Tag::Double),
            b's' => Some(Tag::String),
            b'a' => Some(Tag::Array),
            b'n' => Some(Tag::Null),
            _ => None,
        }
    }

    /// The canonical tag character.
    pub fn as_char(self) -> char {
        match self {
            Tag::Bool => 'b',
            Tag::Int => 'i',
            Tag::Double => 'd',
            Tag::String => 's',
            Tag::Array => 'a',
            Tag::Null => 'N',
        }
    }
}

/// Decode a complete serialized value. Input after the value is an error.
pub fn unserialize(data: &str) -> PhpResult<Value> {
    let (_, consumed, value) = unserialize_prefix(data, 0)?;
    if consumed != data.len() {
        return Err(PhpError::TrailingData { offset: consumed });
    }
    Ok(value)
}

/// Decode the value starting at byte `offset`.
///
/// Returns the value's tag, the number of bytes it occupied, and the value,
/// so a caller walking a larger buffer can advance its own offset.
pub fn unserialize_prefix(data: &str, offset: usize) -> PhpResult<(Tag, usize, Value)> {
    let mut reader = Reader {
        data: data.as_bytes(),
        pos: offset,
        depth: 0,
    };
    let (tag, value) = reader.value()?;
    Ok((tag, reader.pos - offset, value))
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn value(&mut self) -> PhpResult<(Tag, Value)> {
        let start = self.pos;
        let byte = *self
            .data
            .get(start)
            .ok_or(PhpError::UnexpectedEnd { offset: start })?;
        let tag = Tag::from_byte(byte).ok_or(PhpError::UnknownTag {
            tag: char::from(byte),
            offset: start,
        })?;
        self.pos += 1;

        let value = match tag {
            Tag::Null => {
                self.expect(";")?;
                Value::Null
            }
            Tag::Bool => {
                self.expect(":")?;
                Value::Bool(self.integer()? != 0)
            }
            Tag::Int => {
                self.expect(":")?;
                Value::Int(self.integer()?)
            }
            Tag::Double => {
                self.expect(":")?;
                Value::Float(self.double()?)
            }
            Tag::String => {
                self.expect(":")?;
                Value::String(self.string(start)?)
            }
            Tag::Array => {
                self.expect(":")?;
                self.array()?
            }
        };
        Ok((tag, value))
    }

    fn expect(&mut self, literal: &'static str) -> PhpResult<()> {
        let end = self.pos + literal.len();
        match self.data.get(self.pos..end) {
            Some(found) if found == literal.as_bytes() => {
                self.pos = end;
                Ok(())
            }
            Some(found) => Err(PhpError::Expected {
                expected: literal,
                found: String::from_utf8_lossy(found).into_owned(),
                offset: self.pos,
            }),
            None => Err(PhpError::UnexpectedEnd { offset: self.pos }),
        }
    }

    /// Consume bytes up to `stop`, returning them and skipping the stop byte.
    fn read_until(&mut self, stop: u8) -> PhpResult<(usize, &'a [u8])> {
        let data = self.data;
        let start = self.pos;
        let len = data
            .get(start..)
            .and_then(|rest| rest.iter().position(|&b| b == stop))
            .ok_or(PhpError::UnexpectedEnd { offset: data.len() })?;
        self.pos = start + len + 1;
        Ok((start, &data[start..start + len]))
    }

    fn number<T: str::FromStr>(&mut self, stop: u8) -> PhpResult<T> {
        let (start, raw) = self.read_until(stop)?;
        str::from_utf8(raw)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| PhpError::InvalidNumber {
                text: String::from_utf8_lossy(raw).into_owned(),
                offset: start,
            })
    }

    fn integer(&mut self) -> PhpResult<i64> {
        self.number(b';')
    }

    /// Accepts decimal and exponent forms plus `INF`, `-INF` and `NAN`.
    fn double(&mut self) -> PhpResult<f64> {
        self.number(b';')
    }

    /// `s:<len>:"<bytes>";` with the cursor just past `s:`.
    ///
    /// Exactly `<len>` bytes are taken before checking for the closing `";`,
    /// and only then is the payload converted to text.
    fn string(&mut self, tag_offset: usize) -> PhpResult<String> {
        let declared: usize = self.number(b':')?;
        self.expect("\"")?;

        let mismatch = PhpError::LengthMismatch {
            declared,
            offset: tag_offset,
        };
        let body_start = self.pos;
        let body_end = body_start.checked_add(declared).ok_or(mismatch.clone())?;
        let body = self.data.get(body_start..body_end).ok_or(mismatch.clone())?;
        if self.data.get(body_end..body_end + 2) != Some(b"\";".as_slice()) {
            return Err(mismatch);
        }
        let text = str::from_utf8(body).map_err(|_| mismatch)?;

        self.pos = body_end + 2;
        Ok(text.to_string())
    }

    /// `a:<count>:{<key><value>...}` with the cursor just past `a:`.
    fn array(&mut self) -> PhpResult<Value> {
        let count: usize = self.number(b':')?;
        self.expect("{")?;

        if self.depth >= MAX_DEPTH {
            return Err(PhpError::TooDeep { offset: self.pos });
        }
        self.depth += 1;

        let mut entries = Vec::new();
        let mut sequential = true;
        for index in 0..count {
            let key_offset = self.pos;
            let key = match self.value()? {
                (Tag::Int, Value::Int(i)) => {
                    if i64::try_from(index) != Ok(i) {
                        sequential = false;
                    }
                    i.to_string()
                }
                (Tag::String, Value::String(s)) => {
                    sequential = false;
                    s
                }
                (tag, _) => {
                    return Err(PhpError::InvalidKey {
                        tag: tag.as_char(),
                        offset: key_offset,
                    })
                }
            };
            let (_, value) = self.value()?;
            entries.push((key, value));
        }

        self.depth -= 1;
        self.expect("}")?;

        if sequential {
            Ok(Value::Array(entries.into_iter().map(|(_, v)| v).collect()))
        } else {
            // Later duplicates overwrite earlier ones.
            let map: Map = entries.into_iter().collect();
            Ok(Value::Object(map))
        }
    }
}
