use crate::error::{MarshalError, Result};
use log::{debug, trace};
use nativemem::Protection;
use std::fmt;
use std::ptr;
use std::slice;
use zeroize::Zeroize;

/// Rounds a byte count up to a whole number of pages, at least one.
fn page_aligned(bytes: usize) -> usize {
    let page = nativemem::page_size();
    bytes.div_ceil(page).max(1) * page
}

/// RAII guard that temporarily opens a protected region and restores
/// `NoAccess` on every exit path, including panics and early returns.
struct OpenGuard {
    ptr: *mut u8,
    capacity: usize,
}

impl OpenGuard {
    fn open(ptr: *mut u8, capacity: usize, protection: Protection) -> Result<Self> {
        let region = unsafe { slice::from_raw_parts_mut(ptr, capacity) };
        nativemem::protect(region, protection)
            .map_err(|e| MarshalError::ProtectionFailed(e.to_string()))?;
        Ok(Self { ptr, capacity })
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        let region = unsafe { slice::from_raw_parts_mut(self.ptr, self.capacity) };
        // Restoration failure is ignored; the region stays readable at
        // worst, and teardown will wipe it regardless.
        let _ = nativemem::protect(region, Protection::NoAccess);
    }
}

/// An access-controlled, mutable sequence of UTF-16 code units.
///
/// The contents live in page-aligned memory that is locked into RAM,
/// kept inaccessible while idle, and wiped to zero before the pages are
/// returned to the system. Code units are stored verbatim: embedded zero
/// units and unpaired surrogates are preserved, never validated.
///
/// A secure string is single-owner and not shareable across threads
/// (`Send` but not `Sync`); the page protection toggling assumes one
/// accessor at a time.
pub struct SecureString {
    ptr: *mut u8,
    /// Allocation size in bytes, always a page multiple.
    capacity: usize,
    /// Logical length in 16-bit code units.
    len: usize,
    read_only: bool,
    closed: bool,
}

// Safety: the allocation is exclusively owned and only reachable through
// `&mut self` or protection-guarded `&self` methods.
unsafe impl Send for SecureString {}

impl SecureString {
    /// Creates a new, empty secure string backed by one locked page.
    pub fn new() -> Result<Self> {
        Self::with_capacity_bytes(nativemem::page_size())
    }

    /// Creates a secure string from a caller-supplied buffer of code
    /// units, then wipes the buffer.
    ///
    /// After this returns, `units` no longer contains the sensitive data.
    pub fn from_units(units: &mut [u16]) -> Result<Self> {
        let mut secure = Self::with_capacity_bytes(units.len().max(1) * 2)?;

        {
            let _guard = OpenGuard::open(secure.ptr, secure.capacity, Protection::ReadWrite)?;
            unsafe {
                ptr::copy_nonoverlapping(units.as_ptr(), secure.ptr.cast::<u16>(), units.len());
            }
        }

        secure.len = units.len();
        units.zeroize();
        Ok(secure)
    }

    fn with_capacity_bytes(bytes: usize) -> Result<Self> {
        let capacity = page_aligned(bytes);
        trace!("allocating secure string storage of {} bytes", capacity);

        let region = nativemem::alloc(capacity)
            .map_err(|e| MarshalError::AllocationFailed(e.to_string()))?;

        if let Err(e) = nativemem::lock(region) {
            let _ = nativemem::free(region);
            return Err(MarshalError::MemoryLockFailed(e.to_string()));
        }

        if let Err(e) = nativemem::protect(region, Protection::NoAccess) {
            let _ = nativemem::unlock(region);
            let _ = nativemem::free(region);
            return Err(MarshalError::ProtectionFailed(e.to_string()));
        }

        Ok(Self {
            ptr: region.as_mut_ptr(),
            capacity,
            len: 0,
            read_only: false,
            closed: false,
        })
    }

    /// Length in 16-bit code units, not characters.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Check if the secure string has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Appends a single code unit. Surrogate halves are accepted as-is.
    pub fn push_code_unit(&mut self, unit: u16) -> Result<()> {
        if self.closed {
            return Err(MarshalError::StringDisposed);
        }
        if self.read_only {
            return Err(MarshalError::StringReadOnly);
        }

        self.ensure_capacity(self.len + 1)?;

        let _guard = OpenGuard::open(self.ptr, self.capacity, Protection::ReadWrite)?;
        unsafe {
            self.ptr.cast::<u16>().add(self.len).write(unit);
        }
        self.len += 1;
        Ok(())
    }

    /// Appends a character, expanding it to one or two code units.
    pub fn push_char(&mut self, c: char) -> Result<()> {
        let mut buf = [0_u16; 2];
        for &unit in c.encode_utf16(&mut buf).iter() {
            self.push_code_unit(unit)?;
        }
        buf.zeroize();
        Ok(())
    }

    /// Marks the secure string read-only. All further mutation is
    /// rejected with [`MarshalError::StringReadOnly`].
    pub fn make_read_only(&mut self) -> Result<()> {
        if self.closed {
            return Err(MarshalError::StringDisposed);
        }
        self.read_only = true;
        Ok(())
    }

    /// Wipes the contents and resets the length to zero.
    pub fn clear(&mut self) -> Result<()> {
        if self.closed {
            return Err(MarshalError::StringDisposed);
        }
        if self.read_only {
            return Err(MarshalError::StringReadOnly);
        }

        let _guard = OpenGuard::open(self.ptr, self.capacity, Protection::ReadWrite)?;
        unsafe { slice::from_raw_parts_mut(self.ptr, self.capacity) }.zeroize();
        self.len = 0;
        Ok(())
    }

    /// Provides temporary, read-only access to the code units.
    ///
    /// The slice views the locked, fixed-address storage directly; the
    /// plaintext is never copied into movable memory. The pages are made
    /// readable only for the duration of the closure.
    pub fn with_code_units<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&[u16]) -> Result<R>,
    {
        if self.closed {
            return Err(MarshalError::StringDisposed);
        }

        let _guard = OpenGuard::open(self.ptr, self.capacity, Protection::ReadOnly)?;
        let units = unsafe { slice::from_raw_parts(self.ptr.cast::<u16>(), self.len) };
        f(units)
    }

    /// Closes the secure string: wipes the storage, unlocks it and
    /// returns it to the system. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        trace!("closing secure string of {} code units", self.len);

        let region = unsafe { slice::from_raw_parts_mut(self.ptr, self.capacity) };
        nativemem::protect(region, Protection::ReadWrite)
            .map_err(|e| MarshalError::ProtectionFailed(e.to_string()))?;
        region.zeroize();
        let _ = nativemem::unlock(region);
        nativemem::free(region).map_err(|e| MarshalError::DeallocationFailed(e.to_string()))?;

        self.ptr = ptr::null_mut();
        self.capacity = 0;
        self.len = 0;
        Ok(())
    }

    /// Grows the storage to hold at least `units` code units, wiping and
    /// releasing the old allocation after the copy.
    fn ensure_capacity(&mut self, units: usize) -> Result<()> {
        let needed = units * 2;
        if needed <= self.capacity {
            return Ok(());
        }

        let new_capacity = page_aligned(needed.max(self.capacity * 2));
        debug!(
            "growing secure string storage from {} to {} bytes",
            self.capacity, new_capacity
        );

        let new_region = nativemem::alloc(new_capacity)
            .map_err(|e| MarshalError::AllocationFailed(e.to_string()))?;

        if let Err(e) = nativemem::lock(new_region) {
            let _ = nativemem::free(new_region);
            return Err(MarshalError::MemoryLockFailed(e.to_string()));
        }

        {
            let guard = OpenGuard::open(self.ptr, self.capacity, Protection::ReadOnly);
            let _guard = match guard {
                Ok(g) => g,
                Err(e) => {
                    let _ = nativemem::unlock(new_region);
                    let _ = nativemem::free(new_region);
                    return Err(e);
                }
            };
            unsafe {
                ptr::copy_nonoverlapping(
                    self.ptr.cast::<u16>(),
                    new_region.as_mut_ptr().cast::<u16>(),
                    self.len,
                );
            }
        }

        // Retire the old allocation. free() wipes, but the explicit
        // zeroize guarantees the erase is not elided.
        let old = unsafe { slice::from_raw_parts_mut(self.ptr, self.capacity) };
        let _ = nativemem::protect(old, Protection::ReadWrite);
        old.zeroize();
        let _ = nativemem::unlock(old);
        let _ = nativemem::free(old);

        self.ptr = new_region.as_mut_ptr();
        self.capacity = new_capacity;

        nativemem::protect(new_region, Protection::NoAccess)
            .map_err(|e| MarshalError::ProtectionFailed(e.to_string()))?;

        Ok(())
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        if !self.closed {
            debug!("secure string dropped without close, wiping now");
            let _ = self.close();
        }
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the contents.
        f.debug_struct("SecureString")
            .field("len", &self.len)
            .field("read_only", &self.read_only)
            .field("closed", &self.closed)
            .finish()
    }
}
