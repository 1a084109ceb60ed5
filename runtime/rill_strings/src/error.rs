//! Error types for the interning engine.

use thiserror::Error;

/// Errors produced by the fallible accessors on
/// [`StringPool`](crate::StringPool).
///
/// Every variant signals a caller bug rather than a runtime condition, so
/// the panicking accessor forms turn these into panics instead of
/// degrading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Asked for the string content of an entry that is not a string.
    #[error("entry is an identity, not a string")]
    NotString,
    /// Asked for the identity of an entry that is not an identity.
    #[error("entry is a string, not an identity")]
    NotIdentity,
    /// The entry behind this reference has already been freed.
    #[error("entry reference is stale: the entry has been freed")]
    Freed,
}
