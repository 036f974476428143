use std::sync::Arc;

use kvbox_codec::CodecRegistry;
use kvbox_store::{BackendError, BackendProbe, ProbeReport, StorageBackend};
use kvbox_types::{Map, Value};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{SdkError, SdkResult};

/// Key the startup self-test writes and removes when none is configured.
pub const DEFAULT_SELF_TEST_KEY: &str = "__kvbox_self_test__";

const SELF_TEST_VALUE: &str = "TestValue";

/// A key/value store over one storage backend and a codec registry.
///
/// The backend is chosen once, at construction, and verified with a
/// write/read/delete self-test. If no backend passes, the store is
/// unsupported for its whole lifetime and every data operation returns
/// [`SdkError::Unsupported`].
///
/// Values at rest are encoded with the registry's default codec. Other
/// formats only apply to [`dumps`](Self::dumps) and [`loads`](Self::loads).
pub struct Store {
    backend: Option<Box<dyn StorageBackend>>,
    registry: Arc<CodecRegistry>,
    probe: Option<ProbeReport>,
}

impl Store {
    /// Probe for storage as `config` describes and self-test the result.
    ///
    /// An environment with no usable storage is not an error here; it yields
    /// a store whose [`supported`](Self::supported) is `false`. Errors are
    /// reserved for configuration mistakes such as an unknown default format.
    pub fn open(config: &StoreConfig) -> SdkResult<Self> {
        let registry = Arc::new(config.registry()?);
        let mut report = BackendProbe::new(&config.backend).run();
        let backend = report.take_backend();
        Ok(Self::assemble(
            backend,
            registry,
            &config.self_test_key,
            Some(report),
        ))
    }

    /// Use `backend` directly, skipping the probe.
    pub fn with_backend(backend: Box<dyn StorageBackend>, registry: Arc<CodecRegistry>) -> Self {
        Self::with_backend_and_key(backend, registry, DEFAULT_SELF_TEST_KEY)
    }

    pub fn with_backend_and_key(
        backend: Box<dyn StorageBackend>,
        registry: Arc<CodecRegistry>,
        self_test_key: &str,
    ) -> Self {
        Self::assemble(Some(backend), registry, self_test_key, None)
    }

    fn assemble(
        backend: Option<Box<dyn StorageBackend>>,
        registry: Arc<CodecRegistry>,
        self_test_key: &str,
        probe: Option<ProbeReport>,
    ) -> Self {
        let backend = backend.filter(|backend| {
            match self_test(&**backend, &registry, self_test_key) {
                Ok(()) => true,
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "storage self-test failed");
                    false
                }
            }
        });
        Self {
            backend,
            registry,
            probe,
        }
    }

    /// Whether a backend passed the self-test.
    pub fn supported(&self) -> bool {
        self.backend.is_some()
    }

    /// Name of the backend in use, if any.
    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.name())
    }

    /// The probe record, when the store was built by [`open`](Self::open).
    pub fn probe_report(&self) -> Option<&ProbeReport> {
        self.probe.as_ref()
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    fn backend(&self) -> SdkResult<&dyn StorageBackend> {
        self.backend.as_deref().ok_or(SdkError::Unsupported)
    }

    /// Encode `value` with the default codec and write it under `name`.
    pub fn store(&self, name: &str, value: &Value) -> SdkResult<()> {
        let backend = self.backend()?;
        write_value(backend, &self.registry, name, value)
    }

    /// Read and decode the value under `name`.
    ///
    /// A missing or empty entry yields the default codec's empty value
    /// (`null` for JSON).
    pub fn fetch(&self, name: &str) -> SdkResult<Value> {
        let backend = self.backend()?;
        read_value(backend, &self.registry, name)
    }

    /// Whether `name` holds a non-empty stored string.
    pub fn isset(&self, name: &str) -> SdkResult<bool> {
        let backend = self.backend()?;
        Ok(backend.read(name)?.is_some_and(|raw| !raw.is_empty()))
    }

    /// Remove `name`. Removing a missing key is not an error.
    pub fn unset(&self, name: &str) -> SdkResult<()> {
        debug!(key = name, "unset");
        self.backend()?.delete(name)?;
        Ok(())
    }

    /// Remove every entry.
    ///
    /// Uses the backend's bulk clear when it has one, otherwise lists all
    /// keys first and deletes them one at a time.
    pub fn empty(&self) -> SdkResult<()> {
        let backend = self.backend()?;
        if backend.supports_delete_all() {
            debug!(backend = backend.name(), "bulk clear");
            backend.delete_all()?;
            return Ok(());
        }
        let keys = backend.keys()?;
        debug!(backend = backend.name(), count = keys.len(), "clearing keys one at a time");
        for key in &keys {
            backend.delete(key)?;
        }
        Ok(())
    }

    /// Encode the whole store as one document in `format` (default codec when
    /// `None`).
    ///
    /// The document is an object mapping each key to its decoded value.
    pub fn dumps(&self, format: Option<&str>) -> SdkResult<String> {
        let codec = self.registry.resolve(format)?;
        let backend = self.backend()?;
        let mut doc = Map::new();
        for key in backend.keys()? {
            match backend.read(&key)? {
                Some(raw) if !raw.is_empty() => {
                    doc.insert(key, self.registry.decode(&raw, None)?);
                }
                // Removed since it was listed.
                _ => debug!(key = %key, "entry vanished during dump"),
            }
        }
        Ok(codec.encode(&Value::Object(doc))?)
    }

    /// Decode `data` in `format` and write each member into the store.
    ///
    /// Loading is additive: existing keys not in `data` are kept, keys in
    /// both are overwritten. An array document is keyed by decimal index.
    /// A document the format cannot represent loads no entries.
    /// A failure partway through leaves the earlier members written.
    pub fn loads(&self, data: &str, format: Option<&str>) -> SdkResult<()> {
        let codec = self.registry.resolve(format)?;
        let backend = self.backend()?;
        match codec.decode(data)? {
            Value::Object(map) => {
                for (key, value) in &map {
                    write_value(backend, &self.registry, key, value)?;
                }
            }
            Value::Array(items) => {
                for (index, value) in items.iter().enumerate() {
                    write_value(backend, &self.registry, &index.to_string(), value)?;
                }
            }
            // Formats with no real decoding (pickle) load nothing.
            Value::Unrepresentable => debug!("document decoded to nothing; loading no entries"),
            other => return Err(SdkError::NotADocument(other.kind())),
        }
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend_name())
            .field("registry", &self.registry)
            .field("probe", &self.probe)
            .finish()
    }
}

fn write_value(
    backend: &dyn StorageBackend,
    registry: &CodecRegistry,
    name: &str,
    value: &Value,
) -> SdkResult<()> {
    let raw = registry.encode(value, None)?;
    debug!(key = name, bytes = raw.len(), "store");
    backend.write(name, &raw)?;
    Ok(())
}

fn read_value(backend: &dyn StorageBackend, registry: &CodecRegistry, name: &str) -> SdkResult<Value> {
    match backend.read(name)? {
        Some(raw) if !raw.is_empty() => Ok(registry.decode(&raw, None)?),
        _ => Ok(registry.default_codec().empty_value()),
    }
}

/// Store a known string, read it back, and remove it.
///
/// The key is removed even when the read-back does not match.
fn self_test(backend: &dyn StorageBackend, registry: &CodecRegistry, key: &str) -> SdkResult<()> {
    let expected = Value::from(SELF_TEST_VALUE);
    write_value(backend, registry, key, &expected)?;
    let fetched = read_value(backend, registry, key);
    backend.delete(key)?;
    if fetched? != expected {
        return Err(BackendError::Unavailable(format!(
            "{} backend did not return the value it stored",
            backend.name()
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvbox_codec::{CodecError, RegistryBuilder};
    use kvbox_store::{BackendConfig, BackendKind, BackendResult, DocumentBackend, MemoryBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ----------------------------------------------------------------
    // Test backends
    // ----------------------------------------------------------------

    /// Memory backend that counts every call.
    #[derive(Default)]
    struct CountingBackend {
        inner: MemoryBackend,
        calls: AtomicUsize,
    }

    impl CountingBackend {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn tick(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl StorageBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        fn write(&self, name: &str, value: &str) -> BackendResult<()> {
            self.tick();
            self.inner.write(name, value)
        }

        fn read(&self, name: &str) -> BackendResult<Option<String>> {
            self.tick();
            self.inner.read(name)
        }

        fn delete(&self, name: &str) -> BackendResult<()> {
            self.tick();
            self.inner.delete(name)
        }

        fn enumerate(&self, visit: &mut dyn FnMut(&str)) -> BackendResult<()> {
            self.tick();
            self.inner.enumerate(visit)
        }
    }

    /// Rejects every write.
    struct FailingBackend;

    impl StorageBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        fn write(&self, _: &str, _: &str) -> BackendResult<()> {
            Err(BackendError::Unavailable("quota exceeded".into()))
        }

        fn read(&self, _: &str) -> BackendResult<Option<String>> {
            Ok(None)
        }

        fn delete(&self, _: &str) -> BackendResult<()> {
            Ok(())
        }

        fn enumerate(&self, _: &mut dyn FnMut(&str)) -> BackendResult<()> {
            Ok(())
        }
    }

    /// Accepts writes but never keeps them.
    struct ForgetfulBackend;

    impl StorageBackend for ForgetfulBackend {
        fn name(&self) -> &str {
            "forgetful"
        }

        fn write(&self, _: &str, _: &str) -> BackendResult<()> {
            Ok(())
        }

        fn read(&self, _: &str) -> BackendResult<Option<String>> {
            Ok(None)
        }

        fn delete(&self, _: &str) -> BackendResult<()> {
            Ok(())
        }

        fn enumerate(&self, _: &mut dyn FnMut(&str)) -> BackendResult<()> {
            Ok(())
        }
    }

    fn standard() -> Arc<CodecRegistry> {
        Arc::new(CodecRegistry::standard())
    }

    fn memory_store() -> Store {
        Store::with_backend(Box::new(MemoryBackend::new()), standard())
    }

    fn sample() -> Value {
        vec![("a", Value::Int(1)), ("b", Value::from("x"))]
            .into_iter()
            .collect()
    }

    // ----------------------------------------------------------------
    // Construction and self-test
    // ----------------------------------------------------------------

    #[test]
    fn open_selects_directory_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: BackendConfig::with_root(dir.path()),
            ..StoreConfig::default()
        };
        let store = Store::open(&config).unwrap();
        assert!(store.supported());
        assert_eq!(store.backend_name(), Some("directory"));
        let report = store.probe_report().unwrap();
        assert_eq!(report.selected(), Some(BackendKind::Directory));
    }

    #[test]
    fn open_without_usable_storage_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::default();
        config.backend = BackendConfig::with_root(dir.path());
        config.backend.preference = vec![BackendKind::Memory];
        let store = Store::open(&config).unwrap();
        assert!(!store.supported());
        assert_eq!(store.backend_name(), None);
        assert_eq!(store.probe_report().unwrap().attempts().len(), 1);
    }

    #[test]
    fn open_rejects_unknown_default_format() {
        let config = StoreConfig {
            default_format: "yaml".into(),
            ..StoreConfig::default()
        };
        let err = Store::open(&config).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn self_test_leaves_nothing_behind() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::with_backend_and_key(Box::new(Arc::clone(&backend)), standard(), "probe");
        assert!(store.supported());
        assert_eq!(backend.len().unwrap(), 0);
        assert!(store.probe_report().is_none());
    }

    #[test]
    fn failing_backend_is_unsupported_for_good() {
        let store = Store::with_backend(Box::new(FailingBackend), standard());
        assert!(!store.supported());
        for _ in 0..2 {
            assert!(matches!(store.store("k", &Value::Int(1)), Err(SdkError::Unsupported)));
            assert!(matches!(store.fetch("k"), Err(SdkError::Unsupported)));
            assert!(matches!(store.isset("k"), Err(SdkError::Unsupported)));
            assert!(matches!(store.unset("k"), Err(SdkError::Unsupported)));
            assert!(matches!(store.empty(), Err(SdkError::Unsupported)));
            assert!(matches!(store.dumps(None), Err(SdkError::Unsupported)));
            assert!(matches!(store.loads("{}", None), Err(SdkError::Unsupported)));
            assert!(!store.supported());
        }
    }

    #[test]
    fn backend_that_loses_writes_is_unsupported() {
        let store = Store::with_backend(Box::new(ForgetfulBackend), standard());
        assert!(!store.supported());
    }

    #[test]
    fn pickle_default_fails_self_test() {
        let registry = CodecRegistry::standard_with_default("pickle").unwrap();
        let store = Store::with_backend(Box::new(MemoryBackend::new()), Arc::new(registry));
        assert!(!store.supported());
    }

    // ----------------------------------------------------------------
    // Single-key operations
    // ----------------------------------------------------------------

    #[test]
    fn store_then_fetch_json() {
        let store = memory_store();
        let value: Value = vec![
            ("list", Value::Array(vec![Value::Int(1), Value::Float(2.5), Value::Null])),
            ("name", Value::from("héllo")),
            ("ok", Value::Bool(true)),
        ]
        .into_iter()
        .collect();
        store.store("k", &value).unwrap();
        assert_eq!(store.fetch("k").unwrap(), value);
    }

    #[test]
    fn store_then_fetch_serialize() {
        let registry = CodecRegistry::standard_with_default("serialize").unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::with_backend(Box::new(Arc::clone(&backend)), Arc::new(registry));
        assert!(store.supported());
        store.store("k", &sample()).unwrap();
        assert_eq!(
            backend.read("k").unwrap().as_deref(),
            Some("a:2:{s:1:\"a\";i:1;s:1:\"b\";s:1:\"x\";}")
        );
        assert_eq!(store.fetch("k").unwrap(), sample());
    }

    #[test]
    fn values_at_rest_use_default_codec() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::with_backend(Box::new(Arc::clone(&backend)), standard());
        store.store("k", &sample()).unwrap();
        assert_eq!(backend.read("k").unwrap().as_deref(), Some(r#"{"a":1,"b":"x"}"#));
    }

    #[test]
    fn fetch_missing_is_null() {
        let store = memory_store();
        assert_eq!(store.fetch("nope").unwrap(), Value::Null);
    }

    #[test]
    fn isset_and_unset() {
        let store = memory_store();
        assert!(!store.isset("k").unwrap());
        store.store("k", &Value::from("")).unwrap();
        // The encoded empty string is `""`, which is not empty.
        assert!(store.isset("k").unwrap());
        store.unset("k").unwrap();
        store.unset("k").unwrap();
        assert!(!store.isset("k").unwrap());
    }

    #[test]
    fn corrupt_entry_is_a_codec_error() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::with_backend(Box::new(Arc::clone(&backend)), standard());
        backend.write("k", "{oops").unwrap();
        assert!(matches!(store.fetch("k"), Err(SdkError::Codec(CodecError::Json(_)))));
    }

    // ----------------------------------------------------------------
    // Bulk operations
    // ----------------------------------------------------------------

    #[test]
    fn empty_with_bulk_clear() {
        let store = memory_store();
        store.store("a", &Value::Int(1)).unwrap();
        store.store("b", &Value::Int(2)).unwrap();
        store.empty().unwrap();
        assert!(!store.isset("a").unwrap());
        assert_eq!(store.dumps(None).unwrap(), "{}");
    }

    #[test]
    fn empty_without_bulk_clear() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DocumentBackend::open(dir.path().join("store.json")).unwrap();
        let store = Store::with_backend(Box::new(backend), standard());
        for key in ["a", "b", "c"] {
            store.store(key, &Value::from(key)).unwrap();
        }
        store.empty().unwrap();
        assert_eq!(store.dumps(None).unwrap(), "{}");
    }

    #[test]
    fn empty_on_empty_store() {
        let store = memory_store();
        store.empty().unwrap();
        store.empty().unwrap();
    }

    #[test]
    fn dumps_then_loads() {
        let source = memory_store();
        source.store("a", &Value::Int(1)).unwrap();
        source.store("b", &Value::from("x")).unwrap();
        let dump = source.dumps(None).unwrap();
        assert_eq!(dump, r#"{"a":1,"b":"x"}"#);

        let target = memory_store();
        target.loads(&dump, None).unwrap();
        assert_eq!(target.fetch("a").unwrap(), Value::Int(1));
        assert_eq!(target.fetch("b").unwrap(), Value::from("x"));
    }

    #[test]
    fn dumps_and_loads_in_serialize_format() {
        let source = memory_store();
        source.loads(r#"{"a":1,"b":"x"}"#, None).unwrap();
        let dump = source.dumps(Some("serialize")).unwrap();
        assert_eq!(dump, "a:2:{s:1:\"a\";i:1;s:1:\"b\";s:1:\"x\";}");

        let target = memory_store();
        target.loads(&dump, Some("serialize")).unwrap();
        assert_eq!(target.dumps(None).unwrap(), r#"{"a":1,"b":"x"}"#);
    }

    #[test]
    fn loads_is_additive() {
        let store = memory_store();
        store.store("a", &Value::Int(0)).unwrap();
        store.store("c", &Value::Bool(true)).unwrap();
        store.loads(r#"{"a":1,"b":"x"}"#, None).unwrap();
        assert_eq!(store.fetch("a").unwrap(), Value::Int(1));
        assert_eq!(store.fetch("b").unwrap(), Value::from("x"));
        assert_eq!(store.fetch("c").unwrap(), Value::Bool(true));
    }

    #[test]
    fn loads_array_uses_indices() {
        let store = memory_store();
        store.loads(r#"["x",{"y":2}]"#, None).unwrap();
        assert_eq!(store.fetch("0").unwrap(), Value::from("x"));
        assert_eq!(store.fetch("1").unwrap().get("y"), Some(&Value::Int(2)));
    }

    #[test]
    fn loads_rejects_scalars() {
        let store = memory_store();
        assert!(matches!(
            store.loads("42", None),
            Err(SdkError::NotADocument(kvbox_types::ValueKind::Int))
        ));
    }

    #[test]
    fn pickle_dump_loads_as_no_entries() {
        let store = memory_store();
        store.store("a", &Value::Int(1)).unwrap();
        let dump = store.dumps(Some("pickle")).unwrap();
        assert_eq!(dump, "");
        store.loads(&dump, Some("pickle")).unwrap();
        assert_eq!(store.dumps(None).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn directory_store_handles_long_keys() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: BackendConfig::with_root(dir.path()),
            ..StoreConfig::default()
        };
        let store = Store::open(&config).unwrap();
        assert_eq!(store.backend_name(), Some("directory"));

        let key = "k".repeat(1024);
        assert!(!store.isset(&key).unwrap());
        let doc = format!(r#"{{"a":1,"{key}":2}}"#);
        store.loads(&doc, None).unwrap();
        assert_eq!(store.fetch(&key).unwrap(), Value::Int(2));
        assert_eq!(store.dumps(None).unwrap(), doc);

        store.empty().unwrap();
        assert!(!store.isset(&key).unwrap());
        assert!(!store.isset("a").unwrap());
    }

    #[test]
    fn loads_malformed_writes_nothing() {
        let store = memory_store();
        assert!(matches!(
            store.loads(r#"{"a":1,"a":2}"#, None),
            Err(SdkError::Codec(CodecError::Json(_)))
        ));
        assert_eq!(store.dumps(None).unwrap(), "{}");
    }

    #[test]
    fn unknown_format_fails_before_io() {
        let backend = Arc::new(CountingBackend::default());
        let store = Store::with_backend(Box::new(Arc::clone(&backend)), standard());
        assert!(store.supported());
        store.store("k", &Value::Int(1)).unwrap();
        let before = backend.calls();

        let err = store.dumps(Some("yaml")).unwrap_err();
        assert!(matches!(err, SdkError::Codec(CodecError::UnknownFormat(ref f)) if f == "yaml"));
        assert!(err.is_configuration());
        let err = store.loads(r#"{"a":1}"#, Some("xml")).unwrap_err();
        assert!(err.is_configuration());

        assert_eq!(backend.calls(), before);
        assert_eq!(store.fetch("k").unwrap(), Value::Int(1));
    }

    #[test]
    fn custom_registry_default() {
        let registry = RegistryBuilder::standard()
            .default_format("serialize")
            .build()
            .unwrap();
        let store = Store::with_backend(Box::new(MemoryBackend::new()), Arc::new(registry));
        store.loads("a:1:{s:1:\"k\";b:1;}", None).unwrap();
        assert_eq!(store.dumps(Some("json")).unwrap(), r#"{"k":true}"#);
    }
}
