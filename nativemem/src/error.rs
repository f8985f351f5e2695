use thiserror::Error;

/// Errors that can occur during raw memory operations.
#[derive(Error, Debug)]
pub enum NativeMemError {
    /// The underlying system call failed.
    #[error("System operation failed: {0}")]
    SystemError(String),

    /// Invalid arguments were provided to the operation.
    #[error("Invalid arguments: {0}")]
    InvalidArgument(String),
}
