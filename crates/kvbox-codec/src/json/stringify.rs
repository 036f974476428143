//! Structural JSON serialization.

use kvbox_types::{Map, Value};

use crate::number::format_finite;

/// Signature of a replacer callback: receives the member key (the decimal
/// index for array elements, `""` for the root) and the current value, and
/// returns the value to emit. `None` drops object members and becomes `null`
/// inside arrays.
pub type ReplacerFn<'a> = dyn Fn(&str, &Value) -> Option<Value> + 'a;

/// Per-call transform applied before values are emitted.
pub enum Replacer<'a> {
    /// Substitute every value through a callback.
    Function(Box<ReplacerFn<'a>>),
    /// Emit only these object members, in this order, at every depth.
    AllowList(Vec<String>),
}

impl<'a> Replacer<'a> {
    pub fn function(f: impl Fn(&str, &Value) -> Option<Value> + 'a) -> Self {
        Replacer::Function(Box::new(f))
    }

    pub fn allow<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Replacer::AllowList(keys.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Debug for Replacer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Replacer::Function(_) => f.write_str("Replacer::Function(..)"),
            Replacer::AllowList(keys) => f.debug_tuple("Replacer::AllowList").field(keys).finish(),
        }
    }
}

/// Indentation unit for pretty-printed output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Indent {
    /// That many spaces per nesting level.
    Spaces(usize),
    /// A literal string per nesting level.
    Text(String),
}

impl Indent {
    fn unit(&self) -> String {
        match self {
            Indent::Spaces(n) => " ".repeat(*n),
            Indent::Text(s) => s.clone(),
        }
    }
}

/// Options for [`stringify`]. The default is compact output with no replacer.
#[derive(Debug, Default)]
pub struct StringifyOptions<'a> {
    pub replacer: Option<Replacer<'a>>,
    pub indent: Option<Indent>,
}

impl<'a> StringifyOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replacer(mut self, replacer: Replacer<'a>) -> Self {
        self.replacer = Some(replacer);
        self
    }

    pub fn with_indent(mut self, indent: Indent) -> Self {
        self.indent = Some(indent);
        self
    }
}

/// Serialize `value` to JSON text.
///
/// Returns `None` when the root produces nothing: an
/// [`Value::Unrepresentable`] root, or a replacer that drops the root.
pub fn stringify(value: &Value, options: &StringifyOptions<'_>) -> Option<String> {
    let mut stringifier = Stringifier {
        replacer: options.replacer.as_ref(),
        indent: options.indent.as_ref().map(Indent::unit).unwrap_or_default(),
        gap: String::new(),
    };
    stringifier.member("", value)
}

/// Compact serialization with no replacer.
pub fn to_string(value: &Value) -> Option<String> {
    stringify(value, &StringifyOptions::default())
}

/// Pretty serialization with the given indent and no replacer.
pub fn to_string_pretty(value: &Value, indent: Indent) -> Option<String> {
    stringify(value, &StringifyOptions::new().with_indent(indent))
}

/// Quote a string, escaping characters that are unsafe to embed.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if needs_unicode_escape(c) => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Control characters plus the format and separator code points that some
/// consumers treat as line breaks or strip silently.
fn needs_unicode_escape(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{1f}'
            | '\u{7f}'..='\u{9f}'
            | '\u{ad}'
            | '\u{600}'..='\u{604}'
            | '\u{70f}'
            | '\u{17b4}'
            | '\u{17b5}'
            | '\u{200c}'..='\u{200f}'
            | '\u{2028}'..='\u{202f}'
            | '\u{2060}'..='\u{206f}'
            | '\u{feff}'
            | '\u{fff0}'..='\u{ffff}'
    )
}

struct Stringifier<'o, 'a> {
    replacer: Option<&'o Replacer<'a>>,
    indent: String,
    /// Accumulated indentation for the current depth.
    gap: String,
}

impl Stringifier<'_, '_> {
    fn member(&mut self, key: &str, value: &Value) -> Option<String> {
        if let Some(Replacer::Function(f)) = self.replacer {
            let replaced = f(key, value)?;
            return self.emit(&replaced);
        }
        self.emit(value)
    }

    fn emit(&mut self, value: &Value) -> Option<String> {
        match value {
            Value::Null => Some("null".to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) if f.is_finite() => Some(format_finite(*f)),
            Value::Float(_) => Some("null".to_string()),
            Value::String(s) => Some(quote(s)),
            Value::Array(items) => Some(self.array(items)),
            Value::Object(map) => Some(self.object(map)),
            Value::Unrepresentable => None,
        }
    }

    fn array(&mut self, items: &[Value]) -> String {
        let mind = self.gap.clone();
        self.gap.push_str(&self.indent);

        let partial: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.member(&i.to_string(), item)
                    .unwrap_or_else(|| "null".to_string())
            })
            .collect();

        let out = self.wrap('[', ']', &partial, &mind);
        self.gap = mind;
        out
    }

    fn object(&mut self, map: &Map) -> String {
        let mind = self.gap.clone();
        self.gap.push_str(&self.indent);
        let colon = if self.gap.is_empty() { ":" } else { ": " };

        let mut partial = Vec::with_capacity(map.len());
        let replacer = self.replacer;
        match replacer {
            Some(Replacer::AllowList(keys)) => {
                for key in keys {
                    if let Some(text) = map.get(key).and_then(|v| self.member(key, v)) {
                        partial.push(format!("{}{colon}{text}", quote(key)));
                    }
                }
            }
            _ => {
                for (key, value) in map {
                    if let Some(text) = self.member(key, value) {
                        partial.push(format!("{}{colon}{text}", quote(key)));
                    }
                }
            }
        }

        let out = self.wrap('{', '}', &partial, &mind);
        self.gap = mind;
        out
    }

    fn wrap(&self, open: char, close: char, partial: &[String], mind: &str) -> String {
        if partial.is_empty() {
            format!("{open}{close}")
        } else if self.gap.is_empty() {
            format!("{open}{}{close}", partial.join(","))
        } else {
            let separator = format!(",\n{}", self.gap);
            format!("{open}\n{}{}\n{mind}{close}", self.gap, partial.join(&separator))
        }
    }
}
