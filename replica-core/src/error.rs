//! Error types for mirror cache operations.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Which mutation detected an inconsistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// An `update` call.
    Update,
    /// A `delete` call.
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Update => f.write_str("update"),
            MutationKind::Delete => f.write_str("delete"),
        }
    }
}

/// Errors surfaced by the mirror cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// A total view (`size`, `all`) was asked of a partial mirror.
    ///
    /// Recoverable: fetch from the remote source instead, or repopulate
    /// with a complete snapshot.
    #[error("cache is not fully populated")]
    NotFullyPopulated,

    /// A blocking read waited out its deadline without the cache
    /// reaching full population.
    #[error("cache was not fully populated within {waited:?}")]
    PollingTimeout {
        /// How long the caller was prepared to wait.
        waited: Duration,
    },

    /// A fully populated cache was asked to update or delete a key it
    /// does not hold.
    ///
    /// The cache has already applied the mutation and downgraded itself
    /// to partial by the time this error is returned, so it stays usable
    /// when the caller chooses to log and continue.
    #[error("attempt to {operation} a missing item in a fully populated cache: key {key}")]
    SynchronizationInconsistency {
        /// The mutation that tripped over the missing key.
        operation: MutationKind,
        /// The offending key, rendered with its `Debug` form.
        key: String,
    },
}

/// Result alias for mirror cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
