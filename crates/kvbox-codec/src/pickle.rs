use kvbox_types::Value;

use crate::error::CodecResult;
use crate::traits::Codec;

/// Placeholder for the Python pickle format.
///
/// The name is registered so callers can select it, but no encoding is
/// implemented: `encode` yields an empty string and `decode` yields
/// [`Value::Unrepresentable`]. Nothing written with it can be read back.
#[derive(Clone, Copy, Debug, Default)]
pub struct PickleCodec;

impl PickleCodec {
    pub const FORMAT: &'static str = "pickle";
}

impl Codec for PickleCodec {
    fn format(&self) -> &str {
        Self::FORMAT
    }

    fn encode(&self, value: &Value) -> CodecResult<String> {
        tracing::warn!(kind = %value.kind(), "pickle codec is a stub; encoding to an empty string");
        Ok(String::new())
    }

    fn decode(&self, data: &str) -> CodecResult<Value> {
        tracing::warn!(bytes = data.len(), "pickle codec is a stub; decoding to an unrepresentable value");
        Ok(Value::Unrepresentable)
    }

    fn empty_value(&self) -> Value {
        Value::Unrepresentable
    }
}
