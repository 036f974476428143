//! High-level kvbox API.
//!
//! [`Store`] is the entry point: a key/value facade that probes the
//! environment for a working storage primitive, self-tests it, and encodes
//! values through a [`CodecRegistry`] on their way in and out.
//!
//! ```no_run
//! use kvbox_sdk::{Store, StoreConfig, Value};
//!
//! let store = Store::open(&StoreConfig::default())?;
//! if store.supported() {
//!     store.store("greeting", &Value::from("hello"))?;
//!     let dump = store.dumps(Some("serialize"))?;
//!     println!("{dump}");
//! }
//! # Ok::<(), kvbox_sdk::SdkError>(())
//! ```

pub mod config;
pub mod error;
pub mod store;

pub use config::StoreConfig;
pub use error::{SdkError, SdkResult};
pub use store::{Store, DEFAULT_SELF_TEST_KEY};

// Re-export key types
pub use kvbox_codec::{Codec, CodecError, CodecRegistry};
pub use kvbox_store::{BackendConfig, BackendKind, ProbeAttempt, ProbeOutcome, ProbeReport};
pub use kvbox_types::{Map, Value, ValueKind};
