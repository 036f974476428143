use kvbox_types::{float_as_exact_i64, Map, Value};

use crate::number::format_finite;

/// Encode a value in the PHP `serialize()` wire format.
///
/// ```text
/// N;                      null (and unrepresentable roots)
/// b:1;  b:0;              boolean
/// i:42;                   integer
/// d:0.5;                  float
/// s:5:"hello";            string, length in UTF-8 bytes
/// a:2:{i:0;N;s:1:"k";b:1;} array: count, then key/value pairs
/// ```
pub fn serialize(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Number of bytes `s` occupies when UTF-8 encoded.
///
/// Walks code points and classifies each as a 1-, 2-, 3- or 4-byte
/// sequence. This is the length the string tag declares.
pub fn utf8_size(s: &str) -> usize {
    s.chars()
        .map(|c| match c as u32 {
            0..=0x7F => 1,
            0x80..=0x7FF => 2,
            0x800..=0xFFFF => 3,
            _ => 4,
        })
        .sum()
}

enum Key<'v> {
    Int(i64),
    Str(&'v str),
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null | Value::Unrepresentable => out.push_str("N;"),
        Value::Bool(b) => out.push_str(if *b { "b:1;" } else { "b:0;" }),
        Value::Int(i) => write_int(out, *i),
        Value::Float(f) => match float_as_exact_i64(*f) {
            Some(i) => write_int(out, i),
            None => {
                out.push_str("d:");
                out.push_str(&format_double(*f));
                out.push(';');
            }
        },
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            let members = items
                .iter()
                .enumerate()
                .map(|(i, v)| (Key::Int(i as i64), v));
            write_array(out, members);
        }
        Value::Object(map) => write_array(out, object_members(map)),
    }
}

fn write_int(out: &mut String, i: i64) {
    out.push_str("i:");
    out.push_str(&i.to_string());
    out.push(';');
}

fn write_string(out: &mut String, s: &str) {
    out.push_str("s:");
    out.push_str(&utf8_size(s).to_string());
    out.push_str(":\"");
    out.push_str(s);
    out.push_str("\";");
}

fn write_array<'v>(out: &mut String, members: impl Iterator<Item = (Key<'v>, &'v Value)>) {
    let mut count = 0usize;
    let mut body = String::new();
    for (key, value) in members {
        if matches!(value, Value::Unrepresentable) {
            continue;
        }
        match key {
            Key::Int(i) => write_int(&mut body, i),
            Key::Str(s) => write_string(&mut body, s),
        }
        write_value(&mut body, value);
        count += 1;
    }
    out.push_str("a:");
    out.push_str(&count.to_string());
    out.push_str(":{");
    out.push_str(&body);
    out.push('}');
}

fn object_members(map: &Map) -> impl Iterator<Item = (Key<'_>, &Value)> {
    map.iter().map(|(k, v)| {
        let key = match canonical_int_key(k) {
            Some(i) => Key::Int(i),
            None => Key::Str(k),
        };
        (key, v)
    })
}

/// Keys written in canonical decimal form (`"0"`, `"42"`, but not `"007"`)
/// are emitted as integer keys.
fn canonical_int_key(key: &str) -> Option<i64> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if canonical {
        key.parse().ok()
    } else {
        None
    }
}

fn format_double(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f == f64::INFINITY {
        "INF".to_string()
    } else if f == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format_finite(f)
    }
}
