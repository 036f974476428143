use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{BackendError, BackendResult};
use crate::traits::StorageBackend;

type Document = BTreeMap<String, String>;

/// Every key in a single JSON object on disk.
///
/// The document is loaded and saved on every call, so several processes can
/// share it as long as they do not write concurrently. Saving writes a
/// temporary sibling file and renames it over the document. There is no bulk
/// clear.
#[derive(Debug)]
pub struct DocumentBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DocumentBackend {
    pub const NAME: &'static str = "document";

    /// Open the document at `path`, creating its parent directory.
    ///
    /// An existing document must parse as a string map.
    pub fn open(path: impl Into<PathBuf>) -> BackendResult<Self> {
        let path = path.into();
        let parent = parent_dir(&path);
        fs::create_dir_all(&parent)?;
        let backend = Self {
            path,
            lock: Mutex::new(()),
        };
        let doc = backend.load()?;
        debug!(path = %backend.path.display(), entries = doc.len(), "opened document backend");
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> BackendResult<Document> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Document::new());
        }
        serde_json::from_str(&text).map_err(|e| BackendError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn save(&self, doc: &Document) -> BackendResult<()> {
        let text = serde_json::to_string(doc).map_err(|e| BackendError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let mut temp = NamedTempFile::new_in(parent_dir(&self.path))?;
        temp.write_all(text.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Load, apply `f`, and save if `f` reports a change.
    fn update(&self, f: impl FnOnce(&mut Document) -> bool) -> BackendResult<()> {
        let _guard = self.lock.lock().map_err(|_| BackendError::Poisoned(Self::NAME))?;
        let mut doc = self.load()?;
        if f(&mut doc) {
            self.save(&doc)?;
        }
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl StorageBackend for DocumentBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn write(&self, name: &str, value: &str) -> BackendResult<()> {
        self.update(|doc| {
            doc.insert(name.to_string(), value.to_string());
            true
        })
    }

    fn read(&self, name: &str) -> BackendResult<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| BackendError::Poisoned(Self::NAME))?;
        Ok(self.load()?.remove(name))
    }

    fn delete(&self, name: &str) -> BackendResult<()> {
        self.update(|doc| doc.remove(name).is_some())
    }

    fn enumerate(&self, visit: &mut dyn FnMut(&str)) -> BackendResult<()> {
        let doc = {
            let _guard = self.lock.lock().map_err(|_| BackendError::Poisoned(Self::NAME))?;
            self.load()?
        };
        for (key, value) in &doc {
            if !value.is_empty() {
                visit(key);
            }
        }
        Ok(())
    }
}
