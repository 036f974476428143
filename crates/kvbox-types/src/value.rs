use std::collections::BTreeMap;
use std::fmt;

/// String-keyed mapping used for object values.
pub type Map = BTreeMap<String, Value>;

/// A dynamically-typed value that can travel through every kvbox codec.
///
/// The variant set is closed: a codec decides how to emit a value by matching
/// on it, never by inspecting the host type at runtime.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// The absence of a value (`null` in JSON, `N` in the serialize format).
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// An ordered sequence.
    Array(Vec<Value>),
    /// A string-keyed mapping. Key order is not significant.
    Object(Map),
    /// A host value that no wire format can carry, such as a callback.
    ///
    /// Codecs skip it inside containers and emit their null sentinel for it
    /// at the root.
    Unrepresentable,
}

/// The variant of a [`Value`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Object,
    Unrepresentable,
}

impl ValueKind {
    /// Lower-case name used in error messages and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Unrepresentable => "unrepresentable",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// The variant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Unrepresentable => ValueKind::Unrepresentable,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Loose truthiness: `null`, `false`, zero, NaN, the empty string and
    /// unrepresentable values are falsy; containers are always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Unrepresentable => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view. Floats with no fractional part that fit `i64` qualify.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => float_as_exact_i64(*f),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a member of an object value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }
}

/// Returns the integer an `f64` holds exactly, if any.
pub fn float_as_exact_i64(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or past it overflows i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_finite() && f.fract() == 0.0 && f >= -LIMIT && f < LIMIT {
        Some(f as i64)
    } else {
        None
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Unrepresentable, Value::Unrepresentable) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            // One number model: integers and floats compare by numeric value.
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                float_as_exact_i64(*b) == Some(*a)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn kinds() {
        assert_eq!(Value::Null.kind(), ValueKind::Null);
        assert_eq!(Value::from(1.5).kind(), ValueKind::Float);
        assert_eq!(Value::from("x").kind().as_str(), "string");
        assert_eq!(Value::Unrepresentable.kind().to_string(), "unrepresentable");
    }

    #[test]
    fn int_and_float_compare_numerically() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Float(-3.0), Value::Int(-3));
        assert_ne!(Value::Int(1), Value::Float(1.5));
        assert_ne!(Value::Int(0), Value::Float(f64::NAN));
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn different_variants_are_unequal() {
        assert_ne!(Value::Null, Value::Unrepresentable);
        assert_ne!(Value::from("1"), Value::Int(1));
        assert_ne!(Value::Bool(false), Value::Int(0));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(f64::NAN).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
    }

    #[test]
    fn exact_integer_view() {
        assert_eq!(float_as_exact_i64(2.0), Some(2));
        assert_eq!(float_as_exact_i64(2.5), None);
        assert_eq!(float_as_exact_i64(f64::INFINITY), None);
        assert_eq!(float_as_exact_i64(1e19), None);
        assert_eq!(float_as_exact_i64(-9_223_372_036_854_775_808.0), Some(i64::MIN));
    }

    #[test]
    fn object_from_pairs() {
        let v: Value = vec![("a", Value::Int(1)), ("b", Value::from("x"))]
            .into_iter()
            .collect();
        assert_eq!(v.get("a"), Some(&Value::Int(1)));
        assert_eq!(v.get("b").and_then(Value::as_str), Some("x"));
        assert!(v.get("c").is_none());
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("hi")), Value::from("hi"));
    }

    proptest! {
        #[test]
        fn integers_equal_their_float_form(i in -(1i64 << 53)..(1i64 << 53)) {
            prop_assert_eq!(Value::Int(i), Value::Float(i as f64));
            prop_assert_eq!(Value::Float(i as f64).as_i64(), Some(i));
        }
    }
}
