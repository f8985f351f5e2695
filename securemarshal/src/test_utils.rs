//! Utilities for testing securemarshal components
//!
//! The marshal functions accept any [`UnmanagedAllocator`], which lets
//! tests observe the allocation lifecycle from the outside: how many
//! blocks are live, and whether each block had been wiped to zero by the
//! time it was released.

use crate::alloc::{PageAllocator, UnmanagedAllocator};
use crate::error::Result;
use std::collections::HashMap;
use std::ptr::NonNull;
use std::slice;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An allocator that delegates to [`PageAllocator`] while recording
/// every allocation and inspecting each block at release time.
pub struct RecordingAllocator {
    inner: PageAllocator,
    state: Mutex<RecordingState>,
}

#[derive(Default)]
struct RecordingState {
    /// Live allocations keyed by base address, value is the byte size.
    live: HashMap<usize, usize>,
    releases: usize,
    /// Releases where the block still held non-zero bytes.
    dirty_releases: usize,
}

impl RecordingAllocator {
    pub fn new() -> Self {
        Self {
            inner: PageAllocator,
            state: Mutex::new(RecordingState::default()),
        }
    }

    /// Number of blocks allocated but not yet released.
    pub fn live_allocations(&self) -> usize {
        self.lock_state().live.len()
    }

    /// Total number of releases observed.
    pub fn releases(&self) -> usize {
        self.lock_state().releases
    }

    /// Number of releases where the block was not all-zero.
    pub fn dirty_releases(&self) -> usize {
        self.lock_state().dirty_releases
    }

    fn lock_state(&self) -> MutexGuard<'_, RecordingState> {
        // A test that panicked mid-operation should not mask the
        // recorded state; recover from poisoning.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RecordingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl UnmanagedAllocator for RecordingAllocator {
    fn allocate(&self, bytes: usize) -> Result<NonNull<u8>> {
        let ptr = self.inner.allocate(bytes)?;
        self.lock_state().live.insert(ptr.as_ptr() as usize, bytes);
        Ok(ptr)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, bytes: usize) -> Result<()> {
        {
            let mut state = self.lock_state();
            let recorded = state.live.remove(&(ptr.as_ptr() as usize));
            assert_eq!(
                recorded,
                Some(bytes),
                "release of unknown or mis-sized block at {:p}",
                ptr.as_ptr()
            );

            state.releases += 1;
            let block = slice::from_raw_parts(ptr.as_ptr(), bytes);
            if block.iter().any(|&b| b != 0) {
                state.dirty_releases += 1;
            }
        }

        self.inner.release(ptr, bytes)
    }
}
