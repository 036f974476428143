use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A storage primitive the probe can select.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One file per key under a directory.
    Directory,
    /// A single JSON document holding every key.
    Document,
    /// Process memory. Nothing survives the process.
    Memory,
}

impl BackendKind {
    /// Every kind, in default preference order.
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Directory,
        BackendKind::Document,
        BackendKind::Memory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Directory => "directory",
            BackendKind::Document => "document",
            BackendKind::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown backend kind: {s}"))
    }
}

/// Where and how the probe looks for storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base directory for the filesystem backends.
    pub root: PathBuf,
    /// Kinds to try, first usable wins.
    pub preference: Vec<BackendKind>,
    /// Whether the memory backend may be selected.
    pub allow_ephemeral: bool,
    /// File name of the document backend, relative to `root`.
    pub document_file: String,
    /// Directory of the directory backend, relative to `root`.
    pub entries_dir: String,
}

impl BackendConfig {
    /// Defaults rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn entries_path(&self) -> PathBuf {
        self.root.join(&self.entries_dir)
    }

    pub fn document_path(&self) -> PathBuf {
        self.root.join(&self.document_file)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".kvbox"),
            preference: BackendKind::ALL.to_vec(),
            allow_ephemeral: false,
            document_file: "store.json".to_string(),
            entries_dir: "entries".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = BackendConfig::default();
        assert_eq!(c.root, PathBuf::from(".kvbox"));
        assert_eq!(
            c.preference,
            vec![BackendKind::Directory, BackendKind::Document, BackendKind::Memory]
        );
        assert!(!c.allow_ephemeral);
        assert_eq!(c.entries_path(), PathBuf::from(".kvbox/entries"));
        assert_eq!(c.document_path(), PathBuf::from(".kvbox/store.json"));
    }

    #[test]
    fn with_root_keeps_other_defaults() {
        let c = BackendConfig::with_root("/tmp/data");
        assert_eq!(c.document_path(), PathBuf::from("/tmp/data/store.json"));
        assert_eq!(c.preference.len(), 3);
    }

    #[test]
    fn kind_names() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.as_str().parse::<BackendKind>(), Ok(kind));
        }
        assert_eq!(BackendKind::Document.to_string(), "document");
        assert!("cookie".parse::<BackendKind>().is_err());
    }

    #[test]
    fn kinds_serialize_lowercase() {
        let json = serde_json::to_string(&BackendKind::ALL).unwrap();
        assert_eq!(json, r#"["directory","document","memory"]"#);
        let parsed: Vec<BackendKind> = serde_json::from_str(r#"["memory"]"#).unwrap();
        assert_eq!(parsed, vec![BackendKind::Memory]);
    }
}
