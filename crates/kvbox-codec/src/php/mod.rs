//! The PHP `serialize()` codec.
//!
//! A tagged, length-prefixed text format. String lengths are counted in
//! UTF-8 bytes, so readers must consume exactly the declared number of bytes
//! before looking for the closing delimiter.

pub mod serialize;
pub mod unserialize;

use kvbox_types::Value;

use crate::error::CodecResult;
use crate::traits::Codec;

pub use serialize::{serialize, utf8_size};
pub use unserialize::{unserialize, unserialize_prefix, Tag};

/// Registry adapter for the serialize format.
///
/// The format has a single array type, so decoding decides the shape: an
/// array whose keys are exactly `0..n-1` in order comes back as
/// [`Value::Array`], anything else as [`Value::Object`]. An empty object
/// therefore reads back as `[]`, and `{"0": x}` as `[x]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhpCodec;

impl PhpCodec {
    pub const FORMAT: &'static str = "serialize";
}

impl Codec for PhpCodec {
    fn format(&self) -> &str {
        Self::FORMAT
    }

    fn encode(&self, value: &Value) -> CodecResult<String> {
        Ok(serialize(value))
    }

    fn decode(&self, data: &str) -> CodecResult<Value> {
        Ok(unserialize(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CodecError, PhpError};
    use crate::testing::arb_php_value;
    use proptest::prelude::*;

    #[test]
    fn codec_roundtrip_keeps_number_classes() {
        let value: Value = vec![
            ("count", Value::Int(3)),
            ("ratio", Value::Float(0.75)),
            ("label", Value::from("naïve ☃")),
        ]
        .into_iter()
        .collect();
        let text = PhpCodec.encode(&value).unwrap();
        assert_eq!(
            text,
            "a:3:{s:5:\"count\";i:3;s:5:\"label\";s:10:\"naïve ☃\";s:5:\"ratio\";d:0.75;}"
        );
        let decoded = PhpCodec.decode(&text).unwrap();
        assert_eq!(decoded, value);
        assert!(matches!(decoded.get("count"), Some(Value::Int(3))));
        assert!(matches!(decoded.get("ratio"), Some(Value::Float(_))));
    }

    #[test]
    fn list_shaped_objects_read_back_as_arrays() {
        let empty = PhpCodec.encode(&Value::Object(Default::default())).unwrap();
        assert_eq!(empty, "a:0:{}");
        assert_eq!(PhpCodec.decode(&empty).unwrap(), Value::Array(vec![]));

        let zero: Value = vec![("0", Value::from("x"))].into_iter().collect();
        let text = PhpCodec.encode(&zero).unwrap();
        assert_eq!(PhpCodec.decode(&text).unwrap(), Value::Array(vec![Value::from("x")]));
    }

    #[test]
    fn length_mismatch_surfaces_as_codec_error() {
        let err = PhpCodec.decode("s:5:\"héllo\";").unwrap_err();
        assert!(matches!(err, CodecError::Php(PhpError::LengthMismatch { .. })));
        assert!(err.is_format());
    }

    proptest! {
        #[test]
        fn serialize_then_unserialize_roundtrips(value in arb_php_value()) {
            let text = serialize(&value);
            prop_assert_eq!(unserialize(&text).unwrap(), value);
        }

        #[test]
        fn declared_lengths_match_utf8_bytes(s in ".*") {
            let text = serialize(&Value::String(s.clone()));
            let expected = format!("s:{}:\"{}\";", s.len(), s);
            prop_assert_eq!(text, expected);
        }
    }
}
