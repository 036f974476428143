use std::sync::Arc;

use crate::error::{BackendError, BackendResult};

/// A string-to-string persistence primitive.
///
/// Backends never interpret values. Implementations must satisfy:
/// - `write` persists the exact string and silently overwrites, and the data
///   is durable once it returns.
/// - `read` of a key that was never written is `Ok(None)`.
/// - `delete` of an absent key is not an error.
/// - `enumerate` reports each key holding a non-empty value exactly once.
pub trait StorageBackend: Send + Sync {
    /// Short name for logs and diagnostics.
    fn name(&self) -> &str;

    fn write(&self, name: &str, value: &str) -> BackendResult<()>;

    fn read(&self, name: &str) -> BackendResult<Option<String>>;

    fn delete(&self, name: &str) -> BackendResult<()>;

    /// Whether [`delete_all`](Self::delete_all) is available.
    fn supports_delete_all(&self) -> bool {
        false
    }

    /// Remove every entry in one operation.
    ///
    /// Optional. The default reports [`BackendError::CapabilityMissing`];
    /// callers should check [`supports_delete_all`](Self::supports_delete_all)
    /// and fall back to deleting keys one at a time.
    fn delete_all(&self) -> BackendResult<()> {
        Err(BackendError::CapabilityMissing {
            backend: self.name().to_string(),
            capability: "delete_all",
        })
    }

    /// Call `visit` once per key with a non-empty value, in no particular
    /// order.
    fn enumerate(&self, visit: &mut dyn FnMut(&str)) -> BackendResult<()>;

    /// Every enumerable key, collected before returning.
    ///
    /// Bulk operations use this so enumeration is complete before any
    /// mutation starts.
    fn keys(&self) -> BackendResult<Vec<String>> {
        let mut keys = Vec::new();
        self.enumerate(&mut |key| keys.push(key.to_string()))?;
        Ok(keys)
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write(&self, name: &str, value: &str) -> BackendResult<()> {
        (**self).write(name, value)
    }

    fn read(&self, name: &str) -> BackendResult<Option<String>> {
        (**self).read(name)
    }

    fn delete(&self, name: &str) -> BackendResult<()> {
        (**self).delete(name)
    }

    fn supports_delete_all(&self) -> bool {
        (**self).supports_delete_all()
    }

    fn delete_all(&self) -> BackendResult<()> {
        (**self).delete_all()
    }

    fn enumerate(&self, visit: &mut dyn FnMut(&str)) -> BackendResult<()> {
        (**self).enumerate(visit)
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        (**self).keys()
    }
}
