use std::fs;
use std::path::Path;

use kvbox_codec::CodecRegistry;
use kvbox_store::BackendConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};
use crate::store::DEFAULT_SELF_TEST_KEY;

/// Settings for [`Store::open`](crate::Store::open), usually read from TOML.
///
/// ```toml
/// default_format = "json"
///
/// [backend]
/// root = "/var/lib/app/kvbox"
/// preference = ["document", "memory"]
/// allow_ephemeral = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Codec used for values at rest and when no format is named.
    pub default_format: String,
    /// Key written and removed by the startup self-test.
    pub self_test_key: String,
    pub backend: BackendConfig,
}

impl StoreConfig {
    /// Read a TOML file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// The standard codecs with this config's default format.
    pub fn registry(&self) -> SdkResult<CodecRegistry> {
        Ok(CodecRegistry::standard_with_default(&self.default_format)?)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_format: kvbox_codec::DEFAULT_FORMAT.to_string(),
            self_test_key: DEFAULT_SELF_TEST_KEY.to_string(),
            backend: BackendConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvbox_store::BackendKind;
    use std::path::PathBuf;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.default_format, "json");
        assert_eq!(c.self_test_key, "__kvbox_self_test__");
        assert_eq!(c.backend, BackendConfig::default());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(StoreConfig::from_toml_str("").unwrap(), StoreConfig::default());
    }

    #[test]
    fn partial_toml() {
        let c = StoreConfig::from_toml_str(
            r#"
            default_format = "serialize"

            [backend]
            root = "/srv/kv"
            preference = ["document", "memory"]
            allow_ephemeral = true
            "#,
        )
        .unwrap();
        assert_eq!(c.default_format, "serialize");
        assert_eq!(c.self_test_key, "__kvbox_self_test__");
        assert_eq!(c.backend.root, PathBuf::from("/srv/kv"));
        assert_eq!(
            c.backend.preference,
            vec![BackendKind::Document, BackendKind::Memory]
        );
        assert!(c.backend.allow_ephemeral);
        assert_eq!(c.backend.document_file, "store.json");
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = StoreConfig::from_toml_str("default_format = ").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
        let err = StoreConfig::from_toml_str("[backend]\npreference = [\"cookie\"]").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kvbox.toml");
        fs::write(&path, "self_test_key = \"probe\"\n").unwrap();
        assert_eq!(StoreConfig::load(&path).unwrap().self_test_key, "probe");
        assert!(StoreConfig::load(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn registry_uses_default_format() {
        let mut c = StoreConfig::default();
        c.default_format = "serialize".into();
        assert_eq!(c.registry().unwrap().default_format(), "serialize");
        c.default_format = "yaml".into();
        assert!(c.registry().unwrap_err().is_configuration());
    }
}
