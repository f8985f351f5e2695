use thiserror::Error;

/// Errors that can occur in the securemarshal library.
#[derive(Error, Debug)]
pub enum MarshalError {
    /// A required reference argument was null (passed as `None`).
    ///
    /// The payload names the offending parameter.
    #[error("argument `{0}` must not be null")]
    NullArgument(&'static str),

    /// The secure string has already been disposed.
    ///
    /// Once a secure string is closed its storage is wiped and freed; it
    /// cannot be read or appended to again.
    #[error("secure string has already been disposed")]
    StringDisposed,

    /// The secure string has been marked read-only and rejects mutation.
    #[error("secure string is read-only")]
    StringReadOnly,

    /// Unmanaged memory could not be allocated.
    ///
    /// Allocation failure is not retried: the operation is local and
    /// deterministic, so retrying with the same inputs cannot succeed.
    #[error("Failed to allocate unmanaged memory: {0}")]
    AllocationFailed(String),

    /// The memory protection of a region could not be changed.
    #[error("Failed to set memory protection: {0}")]
    ProtectionFailed(String),

    /// The memory could not be locked into RAM.
    #[error("Failed to lock memory: {0}")]
    MemoryLockFailed(String),

    /// The memory could not be freed.
    #[error("Failed to free memory: {0}")]
    DeallocationFailed(String),
}

/// Result type for securemarshal operations.
pub type Result<T> = std::result::Result<T, MarshalError>;
