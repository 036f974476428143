use std::collections::BTreeMap;
use std::sync::Arc;

use kvbox_types::Value;

use crate::error::{CodecError, CodecResult};
use crate::json::JsonCodec;
use crate::php::PhpCodec;
use crate::pickle::PickleCodec;
use crate::traits::Codec;

/// Format used when a caller does not name one.
pub const DEFAULT_FORMAT: &str = JsonCodec::FORMAT;

/// Maps format names to codecs.
///
/// A registry is immutable once built. Codecs are added through
/// [`RegistryBuilder`] during setup; lookups by an unregistered name fail with
/// [`CodecError::UnknownFormat`] before any data is touched.
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: BTreeMap<String, Arc<dyn Codec>>,
    default: Arc<dyn Codec>,
}

impl CodecRegistry {
    /// Start an empty registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// `json`, `serialize` and `pickle`, with `json` as the default.
    pub fn standard() -> Self {
        let json: Arc<dyn Codec> = Arc::new(JsonCodec::new());
        let mut codecs: BTreeMap<String, Arc<dyn Codec>> = BTreeMap::new();
        codecs.insert(JsonCodec::FORMAT.to_string(), Arc::clone(&json));
        codecs.insert(PhpCodec::FORMAT.to_string(), Arc::new(PhpCodec));
        codecs.insert(PickleCodec::FORMAT.to_string(), Arc::new(PickleCodec));
        Self {
            codecs,
            default: json,
        }
    }

    /// The standard codecs with a different default format.
    pub fn standard_with_default(format: &str) -> CodecResult<Self> {
        RegistryBuilder::standard().default_format(format).build()
    }

    /// Look up a codec by name.
    pub fn get(&self, format: &str) -> CodecResult<&dyn Codec> {
        self.codecs
            .get(format)
            .map(|codec| codec.as_ref())
            .ok_or_else(|| CodecError::UnknownFormat(format.to_string()))
    }

    /// Look up `format`, or the default codec when `None`.
    pub fn resolve(&self, format: Option<&str>) -> CodecResult<&dyn Codec> {
        match format {
            Some(name) => self.get(name),
            None => Ok(self.default_codec()),
        }
    }

    pub fn default_codec(&self) -> &dyn Codec {
        self.default.as_ref()
    }

    pub fn default_format(&self) -> &str {
        self.default.format()
    }

    pub fn contains(&self, format: &str) -> bool {
        self.codecs.contains_key(format)
    }

    /// Registered format names, sorted.
    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }

    /// Encode `value` with `format` (default when `None`).
    pub fn encode(&self, value: &Value, format: Option<&str>) -> CodecResult<String> {
        self.resolve(format)?.encode(value)
    }

    /// Decode `data` with `format` (default when `None`).
    pub fn decode(&self, data: &str, format: Option<&str>) -> CodecResult<Value> {
        self.resolve(format)?.decode(data)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("formats", &self.codecs.keys().collect::<Vec<_>>())
            .field("default", &self.default.format())
            .finish()
    }
}

/// Collects codecs before freezing them into a [`CodecRegistry`].
pub struct RegistryBuilder {
    codecs: BTreeMap<String, Arc<dyn Codec>>,
    default_format: String,
}

impl RegistryBuilder {
    /// No codecs, default format `json`.
    pub fn new() -> Self {
        Self {
            codecs: BTreeMap::new(),
            default_format: DEFAULT_FORMAT.to_string(),
        }
    }

    /// Pre-populated with the standard codecs.
    pub fn standard() -> Self {
        Self::new()
            .register(JsonCodec::new())
            .register(PhpCodec)
            .register(PickleCodec)
    }

    /// Add a codec under its own format name, replacing any previous one.
    pub fn register(mut self, codec: impl Codec + 'static) -> Self {
        self.codecs.insert(codec.format().to_string(), Arc::new(codec));
        self
    }

    pub fn default_format(mut self, format: &str) -> Self {
        self.default_format = format.to_string();
        self
    }

    /// Freeze the registry. Fails if the default format was never registered.
    pub fn build(self) -> CodecResult<CodecRegistry> {
        let default = self
            .codecs
            .get(&self.default_format)
            .cloned()
            .ok_or(CodecError::UnknownFormat(self.default_format))?;
        Ok(CodecRegistry {
            codecs: self.codecs,
            default,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
