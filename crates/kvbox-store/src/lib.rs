//! Storage backends for kvbox.
//!
//! A backend persists opaque strings under string keys. It never sees
//! decoded values; encoding happens above it in the store facade.
//!
//! # Backends
//!
//! All backends implement the [`StorageBackend`] trait:
//!
//! - [`DirectoryBackend`] -- one file per key, with bulk clear
//! - [`DocumentBackend`] -- one JSON document for every key, no bulk clear
//! - [`MemoryBackend`] -- process memory, for tests and opt-in ephemeral use
//!
//! # Selection
//!
//! [`BackendProbe`] walks [`BackendConfig::preference`] once and selects the
//! first primitive that works in the current environment. The
//! [`ProbeReport`] records every attempt.
//!
//! # Design Rules
//!
//! 1. A write is durable when it returns; file backends write a temporary
//!    file and rename it into place.
//! 2. Reading a missing key is `Ok(None)`, deleting one is a no-op.
//! 3. Enumeration reports only keys holding non-empty values.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod directory;
pub mod document;
pub mod error;
pub mod memory;
pub mod probe;
pub mod traits;

pub use config::{BackendConfig, BackendKind};
pub use directory::DirectoryBackend;
pub use document::DocumentBackend;
pub use error::{BackendError, BackendResult};
pub use memory::MemoryBackend;
pub use probe::{BackendProbe, ProbeAttempt, ProbeOutcome, ProbeReport};
pub use traits::StorageBackend;
