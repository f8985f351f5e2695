//! # nativemem
//!
//! Cross-platform wrapper for raw memory system calls.
//!
//! This library provides a platform-independent interface for the memory
//! operations needed when secret data must live outside the normal Rust
//! allocator:
//! - Page-backed allocation and deallocation
//! - Memory protection management
//! - Memory locking to prevent swapping to disk
//!
//! Allocations are zero-filled on creation and wiped again before release.
//! The implementation uses the appropriate system calls for each supported
//! platform (`mmap`/`mprotect`/`mlock` on unix, `VirtualAlloc` and friends
//! on windows).

mod error;
mod types;

#[cfg(unix)]
pub(crate) mod unix;
#[cfg(unix)]
use unix as platform;

#[cfg(windows)]
pub(crate) mod windows;
#[cfg(windows)]
use windows as platform;

pub use error::NativeMemError;
pub use types::Protection;

/// Allocates a new zero-filled, readable and writable memory region.
///
/// The region is backed directly by the OS page allocator, so its base
/// address is page-aligned and never moves.
pub fn alloc(size: usize) -> Result<&'static mut [u8], NativeMemError> {
    platform::alloc(size)
}

/// Frees a memory region previously returned by [`alloc`].
///
/// The region is made writable if needed and wiped to zero before it is
/// handed back to the system. Freeing an empty region is a no-op.
pub fn free(region: &mut [u8]) -> Result<(), NativeMemError> {
    platform::free(region)
}

/// Changes the protection of a memory region.
pub fn protect(region: &mut [u8], protection: Protection) -> Result<(), NativeMemError> {
    platform::protect(region, protection)
}

/// Locks a memory region into physical RAM so it cannot be swapped to disk.
pub fn lock(region: &mut [u8]) -> Result<(), NativeMemError> {
    platform::lock(region)
}

/// Unlocks a memory region previously locked with [`lock`].
pub fn unlock(region: &mut [u8]) -> Result<(), NativeMemError> {
    platform::unlock(region)
}

/// Returns the system's page size.
pub fn page_size() -> usize {
    platform::page_size()
}
