//! Storage errors shared by every repository trait, plus the in-memory
//! backends used by the API binary and the tests.

pub mod memory;

use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("version mismatch (expected {expected}, found {found})")]
    VersionMismatch { expected: u64, found: u64 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub(crate) fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    store: &str,
) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{store} mutex poisoned")))
}
