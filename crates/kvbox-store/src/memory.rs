use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{BackendError, BackendResult};
use crate::traits::StorageBackend;

/// In-memory, HashMap-based backend.
///
/// Nothing survives the process. The probe only selects it when ephemeral
/// storage is explicitly allowed; tests and embedders construct it directly.
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub const NAME: &'static str = "memory";

    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries, including empty values.
    pub fn len(&self) -> BackendResult<usize> {
        Ok(self.entries.read().map_err(|_| poisoned())?.len())
    }

    pub fn is_empty(&self) -> BackendResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> BackendError {
    BackendError::Poisoned(MemoryBackend::NAME)
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn write(&self, name: &str, value: &str) -> BackendResult<()> {
        let mut map = self.entries.write().map_err(|_| poisoned())?;
        map.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn read(&self, name: &str) -> BackendResult<Option<String>> {
        let map = self.entries.read().map_err(|_| poisoned())?;
        Ok(map.get(name).cloned())
    }

    fn delete(&self, name: &str) -> BackendResult<()> {
        self.entries.write().map_err(|_| poisoned())?.remove(name);
        Ok(())
    }

    fn supports_delete_all(&self) -> bool {
        true
    }

    fn delete_all(&self) -> BackendResult<()> {
        self.entries.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }

    fn enumerate(&self, visit: &mut dyn FnMut(&str)) -> BackendResult<()> {
        // Release the lock before calling out so `visit` may use the backend.
        let keys: Vec<String> = {
            let map = self.entries.read().map_err(|_| poisoned())?;
            map.iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, _)| k.clone())
                .collect()
        };
        for key in &keys {
            visit(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // ----------------------------------------------------------------
    // Basic operations
    // ----------------------------------------------------------------

    #[test]
    fn write_then_read() {
        let backend = MemoryBackend::new();
        backend.write("k", "v").unwrap();
        assert_eq!(backend.read("k").unwrap().as_deref(), Some("v"));
        assert_eq!(backend.read("missing").unwrap(), None);
    }

    #[test]
    fn write_overwrites() {
        let backend = MemoryBackend::new();
        backend.write("k", "one").unwrap();
        backend.write("k", "two").unwrap();
        assert_eq!(backend.read("k").unwrap().as_deref(), Some("two"));
        assert_eq!(backend.len().unwrap(), 1);
    }

    #[test]
    fn delete_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.write("k", "v").unwrap();
        backend.delete("k").unwrap();
        backend.delete("k").unwrap();
        assert_eq!(backend.read("k").unwrap(), None);
        assert!(backend.is_empty().unwrap());
    }

    // ----------------------------------------------------------------
    // Enumeration and bulk clear
    // ----------------------------------------------------------------

    #[test]
    fn enumerate_skips_empty_values() {
        let backend = MemoryBackend::new();
        backend.write("a", "1").unwrap();
        backend.write("b", "").unwrap();
        backend.write("c", "3").unwrap();
        let mut keys = backend.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn visitor_may_mutate_the_backend() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write("a", "1").unwrap();
        backend.write("b", "2").unwrap();
        let inner = Arc::clone(&backend);
        backend
            .enumerate(&mut |key| inner.delete(key).unwrap())
            .unwrap();
        assert!(backend.is_empty().unwrap());
    }

    #[test]
    fn delete_all_clears() {
        let backend = MemoryBackend::new();
        assert!(backend.supports_delete_all());
        backend.write("a", "1").unwrap();
        backend.write("b", "").unwrap();
        backend.delete_all().unwrap();
        assert!(backend.is_empty().unwrap());
    }

    #[test]
    fn poisoned_lock_is_an_error() {
        let backend = Arc::new(MemoryBackend::new());
        let inner = Arc::clone(&backend);
        let _ = std::thread::spawn(move || {
            let _guard = inner.entries.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(matches!(backend.read("k"), Err(BackendError::Poisoned("memory"))));
        assert!(matches!(backend.write("k", "v"), Err(BackendError::Poisoned(_))));
    }
}
