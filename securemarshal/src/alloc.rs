use crate::error::{MarshalError, Result};
use std::ptr::NonNull;
use std::slice;

/// Allocation seam for the unmanaged buffers produced by the marshal
/// functions.
///
/// The default implementation is [`PageAllocator`]; tests substitute an
/// instrumented implementation to observe that blocks are wiped before
/// release.
pub trait UnmanagedAllocator {
    /// Allocates `bytes` bytes of unmanaged memory.
    ///
    /// The returned memory is zero-filled and stays at a fixed address
    /// until released.
    fn allocate(&self, bytes: usize) -> Result<NonNull<u8>>;

    /// Releases a block previously returned by [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this same allocator
    /// with this exact `bytes` size, and must not have been released
    /// already. No reference to the block may exist after this call.
    unsafe fn release(&self, ptr: NonNull<u8>, bytes: usize) -> Result<()>;
}

/// The default allocator, backed by the OS page allocator via `nativemem`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageAllocator;

impl UnmanagedAllocator for PageAllocator {
    fn allocate(&self, bytes: usize) -> Result<NonNull<u8>> {
        let region = nativemem::alloc(bytes)
            .map_err(|e| MarshalError::AllocationFailed(e.to_string()))?;
        NonNull::new(region.as_mut_ptr()).ok_or_else(|| {
            MarshalError::AllocationFailed("allocator returned a null address".to_string())
        })
    }

    unsafe fn release(&self, ptr: NonNull<u8>, bytes: usize) -> Result<()> {
        let region = slice::from_raw_parts_mut(ptr.as_ptr(), bytes);
        nativemem::free(region).map_err(|e| MarshalError::DeallocationFailed(e.to_string()))
    }
}
