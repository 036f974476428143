//! The JSON codec.
//!
//! [`stringify`] and [`parse`] are usable on their own and expose the
//! replacer, indent and reviver extension points. [`JsonCodec`] adapts them to
//! the [`Codec`] trait for the registry.

pub mod parse;
pub mod stringify;

use kvbox_types::Value;

use crate::error::CodecResult;
use crate::traits::Codec;

pub use parse::{parse, parse_with_reviver, ReviverFn, MAX_DEPTH};
pub use stringify::{
    quote, stringify, to_string, to_string_pretty, Indent, Replacer, ReplacerFn, StringifyOptions,
};

/// Registry adapter for JSON.
///
/// A root value that JSON cannot carry is written as `null`, so encoding
/// never fails.
#[derive(Clone, Debug, Default)]
pub struct JsonCodec {
    indent: Option<Indent>,
}

impl JsonCodec {
    pub const FORMAT: &'static str = "json";

    /// Compact output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Multi-line output using `indent` per nesting level.
    pub fn pretty(indent: Indent) -> Self {
        Self {
            indent: Some(indent),
        }
    }
}

impl Codec for JsonCodec {
    fn format(&self) -> &str {
        Self::FORMAT
    }

    fn encode(&self, value: &Value) -> CodecResult<String> {
        let options = StringifyOptions {
            replacer: None,
            indent: self.indent.clone(),
        };
        Ok(stringify(value, &options).unwrap_or_else(|| "null".to_string()))
    }

    fn decode(&self, data: &str) -> CodecResult<Value> {
        Ok(parse(data)?)
    }
}
