use kvbox_types::Value;

use crate::error::CodecResult;

/// A wire format: a stateless pair of encode/decode functions.
///
/// Implementations must satisfy the round-trip law: for every value the
/// format can represent, `decode(encode(v)) == v`. Values a format cannot
/// carry (see [`Value::Unrepresentable`]) decode to the format's null
/// sentinel instead.
pub trait Codec: Send + Sync {
    /// The name this codec is registered under (e.g. `"json"`).
    fn format(&self) -> &str;

    /// Encode a value to its textual wire form.
    fn encode(&self, value: &Value) -> CodecResult<String>;

    /// Decode wire text back into a value.
    ///
    /// Malformed input is an error; decoding never yields a partial value.
    fn decode(&self, data: &str) -> CodecResult<Value>;

    /// The value a read of a missing entry decodes to.
    fn empty_value(&self) -> Value {
        Value::Null
    }
}
