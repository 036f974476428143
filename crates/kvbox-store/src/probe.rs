use std::fmt;

use tracing::{debug, info};

use crate::config::{BackendConfig, BackendKind};
use crate::directory::DirectoryBackend;
use crate::document::DocumentBackend;
use crate::error::{BackendError, BackendResult};
use crate::memory::MemoryBackend;
use crate::traits::StorageBackend;

/// Result of probing one primitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Usable,
    /// Unusable, with the reason.
    Unusable(String),
}

impl ProbeOutcome {
    pub fn is_usable(&self) -> bool {
        matches!(self, ProbeOutcome::Usable)
    }
}

/// One probe that was actually run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeAttempt {
    pub kind: BackendKind,
    pub outcome: ProbeOutcome,
}

/// Picks the first usable storage primitive in preference order.
///
/// Each primitive is tried at most once. Failures are logged and recorded,
/// never retried, and probing stops at the first success.
pub struct BackendProbe<'a> {
    config: &'a BackendConfig,
}

impl<'a> BackendProbe<'a> {
    pub fn new(config: &'a BackendConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> ProbeReport {
        let mut attempts = Vec::new();
        for &kind in &self.config.preference {
            if attempts.iter().any(|a: &ProbeAttempt| a.kind == kind) {
                continue;
            }
            match self.probe(kind) {
                Ok(backend) => {
                    info!(backend = %kind, "selected storage backend");
                    attempts.push(ProbeAttempt {
                        kind,
                        outcome: ProbeOutcome::Usable,
                    });
                    return ProbeReport {
                        selected: Some(kind),
                        attempts,
                        backend: Some(backend),
                    };
                }
                Err(e) => {
                    debug!(backend = %kind, error = %e, "storage backend unusable");
                    attempts.push(ProbeAttempt {
                        kind,
                        outcome: ProbeOutcome::Unusable(e.to_string()),
                    });
                }
            }
        }
        info!("no usable storage backend");
        ProbeReport {
            selected: None,
            attempts,
            backend: None,
        }
    }

    fn probe(&self, kind: BackendKind) -> BackendResult<Box<dyn StorageBackend>> {
        match kind {
            BackendKind::Directory => {
                Ok(Box::new(DirectoryBackend::open(self.config.entries_path())?))
            }
            BackendKind::Document => {
                Ok(Box::new(DocumentBackend::open(self.config.document_path())?))
            }
            BackendKind::Memory if self.config.allow_ephemeral => {
                Ok(Box::new(MemoryBackend::new()))
            }
            BackendKind::Memory => Err(BackendError::Unavailable(
                "ephemeral storage not allowed".to_string(),
            )),
        }
    }
}

/// What the probe found.
pub struct ProbeReport {
    selected: Option<BackendKind>,
    attempts: Vec<ProbeAttempt>,
    backend: Option<Box<dyn StorageBackend>>,
}

impl ProbeReport {
    /// Whether any primitive was usable.
    pub fn supported(&self) -> bool {
        self.selected.is_some()
    }

    pub fn selected(&self) -> Option<BackendKind> {
        self.selected
    }

    /// Every probe run, in order.
    pub fn attempts(&self) -> &[ProbeAttempt] {
        &self.attempts
    }

    /// Move the selected backend out, leaving the record in place.
    pub fn take_backend(&mut self) -> Option<Box<dyn StorageBackend>> {
        self.backend.take()
    }

    pub fn into_backend(mut self) -> Option<Box<dyn StorageBackend>> {
        self.take_backend()
    }
}

impl fmt::Debug for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeReport")
            .field("selected", &self.selected)
            .field("attempts", &self.attempts)
            .finish()
    }
}
