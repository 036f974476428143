//! Foundation types for kvbox.
//!
//! Every codec and the store facade exchange data as a [`Value`]: a closed
//! sum type over null, booleans, integers, floats, strings, sequences,
//! string-keyed mappings and the `Unrepresentable` sentinel. Codecs pick a
//! wire encoding by matching on the variant; nothing inspects host types at
//! runtime.
//!
//! # Key Types
//!
//! - [`Value`] -- the dynamically-typed payload
//! - [`ValueKind`] -- the payload-free discriminant, used in diagnostics
//! - [`Map`] -- the mapping type behind [`Value::Object`]

pub mod value;

pub use value::{float_as_exact_i64, Map, Value, ValueKind};
