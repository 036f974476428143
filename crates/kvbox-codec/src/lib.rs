//! Wire codecs for kvbox.
//!
//! A codec turns a [`Value`](kvbox_types::Value) into text and back. Codecs
//! are stateless and never touch storage; the facade picks one through the
//! [`CodecRegistry`] by format name.
//!
//! # Formats
//!
//! - `json` -- [`JsonCodec`], a recursive-descent parser and structural
//!   stringifier with replacer, reviver and indent support
//! - `serialize` -- [`PhpCodec`], the PHP `serialize()` format with UTF-8
//!   byte-length string framing
//! - `pickle` -- [`PickleCodec`], a registered name with no real encoding
//!
//! # Errors
//!
//! [`CodecError::UnknownFormat`] is a configuration mistake and is raised
//! before any data is read. [`CodecError::Json`] and [`CodecError::Php`]
//! report malformed input and never carry a partial value.

pub mod error;
pub mod json;
mod number;
pub mod php;
pub mod pickle;
pub mod registry;
pub mod traits;

pub use error::{CodecError, CodecResult, JsonError, JsonResult, PhpError, PhpResult};
pub use json::JsonCodec;
pub use php::PhpCodec;
pub use pickle::PickleCodec;
pub use registry::{CodecRegistry, RegistryBuilder, DEFAULT_FORMAT};
pub use traits::Codec;

#[cfg(test)]
pub(crate) mod testing {
    use kvbox_types::Value;
    use proptest::prelude::*;

    fn arb_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            (-1e12f64..1e12f64).prop_map(Value::Float),
            ".*".prop_map(Value::String),
        ]
    }

    /// Any value JSON can carry.
    pub(crate) fn arb_value() -> impl Strategy<Value = Value> {
        arb_leaf().prop_recursive(4, 64, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map(".*", inner, 0..6).prop_map(Value::Object),
            ]
        })
    }

    /// Any value the serialize format carries without reshaping. Objects are
    /// non-empty with non-numeric keys; anything else reads back as a list.
    pub(crate) fn arb_php_value() -> impl Strategy<Value = Value> {
        arb_leaf().prop_recursive(4, 64, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z_][a-z0-9_]{0,7}", inner, 1..6)
                    .prop_map(Value::Object),
            ]
        })
    }
}
