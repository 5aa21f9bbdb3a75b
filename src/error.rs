use thiserror::Error;

/// Errors produced by the caches themselves.
///
/// Failures of user-provided init functions are not represented here. They are
/// memoized and handed back to callers as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("capacity must be greater than 0, got {0}")]
    InvalidCapacity(i64),
}
