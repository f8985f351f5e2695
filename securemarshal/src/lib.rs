//! # Secure Marshal
//!
//! A library for converting access-controlled, in-process secrets into
//! unmanaged native memory, and destroying that memory without a trace.
//!
//! The `securemarshal` library covers the hand-off point between a
//! protected secret container and raw memory that native APIs can read
//! arbitrarily. It provides two collaborating pieces:
//!
//! - [`SecureString`]: a mutable sequence of UTF-16 code units held in
//!   page-locked memory that is inaccessible while idle and wiped to zero
//!   on every teardown path.
//! - The marshal functions: [`secure_string_to_unicode`] copies a secure
//!   string into a freshly allocated, null-terminated unmanaged UTF-16
//!   buffer and hands the caller an owning [`UnicodeHandle`];
//!   [`zero_free_unicode`] overwrites every byte of that buffer with zero
//!   and only then releases it.
//!
//! Contents are treated as raw code units throughout: embedded zero units
//! and unpaired surrogate halves round-trip unchanged.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use securemarshal::{secure_string_to_unicode, zero_free_unicode, SecureString};
//!
//! // Build the secret in protected memory; the source buffer is wiped.
//! let mut units: Vec<u16> = "hunter2".encode_utf16().collect();
//! let mut secret = SecureString::from_units(&mut units).unwrap();
//! secret.make_read_only().unwrap();
//!
//! // Export to unmanaged memory for a native API expecting a wide string.
//! let handle = secure_string_to_unicode(Some(&secret)).unwrap();
//! // ... pass handle.as_ptr() across the FFI boundary ...
//!
//! // Wipe and release. The handle is consumed; it cannot be reused.
//! zero_free_unicode(handle);
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return `Result<T, MarshalError>`. A `None` source
//! fails with [`MarshalError::NullArgument`] naming the parameter, and an
//! already-closed secure string fails with
//! [`MarshalError::StringDisposed`]; in both cases nothing is allocated.
//! Allocation failures are surfaced once and never retried.

/// Secure UTF-16 string container
pub mod secure_string;

/// Conversion between secure strings and unmanaged unicode buffers
pub mod marshal;

/// Allocator seam for unmanaged buffers
pub mod alloc;

/// Error types
pub mod error;

/// Utilities for testing
pub mod test_utils;

// Re-export key types
pub use crate::alloc::{PageAllocator, UnmanagedAllocator};
pub use crate::error::{MarshalError, Result};
pub use crate::marshal::{
    secure_string_to_unicode, secure_string_to_unicode_with, zero_free_unicode,
    zero_free_unicode_with, UnicodeHandle,
};
pub use crate::secure_string::SecureString;
