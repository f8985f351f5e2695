use crate::alloc::{PageAllocator, UnmanagedAllocator};
use crate::error::{MarshalError, Result};
use crate::secure_string::SecureString;
use log::{error, trace};
use std::ptr::NonNull;
use std::slice;
use zeroize::Zeroize;

/// An opaque handle to an unmanaged, null-terminated UTF-16 buffer
/// produced by [`secure_string_to_unicode`].
///
/// Ownership of the underlying allocation travels with the handle: it is
/// transferred to the caller on export and consumed by
/// [`zero_free_unicode`]. The handle has no `Drop` impl; releasing the
/// buffer is the caller's explicit obligation, and a handle that is never
/// passed to `zero_free_unicode` leaks its plaintext.
#[derive(Debug)]
pub struct UnicodeHandle {
    ptr: *mut u16,
    byte_len: usize,
}

// Safety: the handle is an exclusively owned raw allocation; nothing
// aliases it.
unsafe impl Send for UnicodeHandle {}

impl UnicodeHandle {
    /// The null handle. Destroying it is a no-op.
    pub const fn null() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            byte_len: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Base address of the buffer, suitable for native APIs expecting a
    /// null-terminated wide string.
    pub fn as_ptr(&self) -> *const u16 {
        self.ptr.cast_const()
    }

    pub fn as_mut_ptr(&self) -> *mut u16 {
        self.ptr
    }

    /// Total allocation size in bytes: `(code_units + 1) * 2`.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

/// Copies the contents of a secure string into freshly allocated
/// unmanaged memory as a null-terminated UTF-16 string.
///
/// The plaintext is written code unit by code unit straight into the
/// fixed-address destination; it never passes through a growable or
/// movable intermediate buffer. The returned handle owns the allocation
/// and must eventually be passed to [`zero_free_unicode`].
///
/// `source` is an `Option` because the source system models a nullable
/// reference here: `None` fails with [`MarshalError::NullArgument`]
/// before anything is allocated. A closed secure string fails with
/// [`MarshalError::StringDisposed`]. On any failure after allocation the
/// block is wiped and freed before the error surfaces.
pub fn secure_string_to_unicode(source: Option<&SecureString>) -> Result<UnicodeHandle> {
    secure_string_to_unicode_with(&PageAllocator, source)
}

/// Variant of [`secure_string_to_unicode`] using a caller-supplied
/// allocator.
pub fn secure_string_to_unicode_with<A: UnmanagedAllocator>(
    allocator: &A,
    source: Option<&SecureString>,
) -> Result<UnicodeHandle> {
    let source = source.ok_or(MarshalError::NullArgument("source"))?;
    if source.is_closed() {
        return Err(MarshalError::StringDisposed);
    }

    let unit_count = source.len();
    let byte_len = (unit_count + 1) * 2;
    let dest = allocator.allocate(byte_len)?;

    trace!("exporting {} code units to {:p}", unit_count, dest.as_ptr());

    let copied = source.with_code_units(|src| {
        let out = dest.as_ptr().cast::<u16>();
        for (i, &unit) in src.iter().enumerate() {
            unsafe {
                out.add(i).write(unit);
            }
        }
        unsafe {
            out.add(unit_count).write(0);
        }
        Ok(())
    });

    if let Err(err) = copied {
        // The container was torn down between the check and the copy;
        // wipe and free so nothing leaks before the error surfaces.
        unsafe {
            slice::from_raw_parts_mut(dest.as_ptr(), byte_len).zeroize();
            if let Err(release_err) = allocator.release(dest, byte_len) {
                error!("could not release partially written buffer: {}", release_err);
            }
        }
        return Err(err);
    }

    Ok(UnicodeHandle {
        ptr: dest.as_ptr().cast::<u16>(),
        byte_len,
    })
}

/// Wipes and releases a buffer produced by [`secure_string_to_unicode`].
///
/// Every byte of the allocation is overwritten with zero before the
/// memory is returned to the allocator; both steps complete before this
/// function returns. A null handle is a safe no-op. Passing a handle that
/// was already destroyed, or one not obtained from an export, is caller
/// misuse with undefined behavior.
pub fn zero_free_unicode(handle: UnicodeHandle) {
    zero_free_unicode_with(&PageAllocator, handle);
}

/// Variant of [`zero_free_unicode`] using a caller-supplied allocator.
///
/// The allocator must be the one that produced the handle.
pub fn zero_free_unicode_with<A: UnmanagedAllocator>(allocator: &A, handle: UnicodeHandle) {
    let Some(base) = NonNull::new(handle.ptr.cast::<u8>()) else {
        return;
    };

    trace!("wiping and releasing {} bytes at {:p}", handle.byte_len, base.as_ptr());

    unsafe {
        slice::from_raw_parts_mut(base.as_ptr(), handle.byte_len).zeroize();
        if let Err(err) = allocator.release(base, handle.byte_len) {
            // The wipe has already happened; a failed release is not a
            // recoverable condition.
            error!("could not release wiped unicode buffer: {}", err);
            panic!("could not release wiped unicode buffer: {}", err);
        }
    }
}

/// Reads a null-terminated UTF-16 buffer back into a vector of code
/// units, stopping before the first zero unit.
///
/// # Safety
///
/// `base` must point to a readable buffer that contains a zero code unit
/// within its bounds.
pub unsafe fn unicode_to_units(base: *const u16) -> Vec<u16> {
    let mut units = Vec::new();
    let mut offset = 0;
    loop {
        let unit = base.add(offset).read();
        if unit == 0 {
            break;
        }
        units.push(unit);
        offset += 1;
    }
    units
}

/// Reads exactly `len` code units, embedded zero units included.
///
/// # Safety
///
/// `base` must point to a readable buffer of at least `len` code units.
pub unsafe fn unicode_to_units_len(base: *const u16, len: usize) -> Vec<u16> {
    slice::from_raw_parts(base, len).to_vec()
}

/// Reads a null-terminated UTF-16 buffer back as a `String`, replacing
/// invalid sequences. Use [`unicode_to_units`] when unpaired surrogates
/// must survive the round trip.
///
/// # Safety
///
/// Same contract as [`unicode_to_units`].
pub unsafe fn unicode_to_string(base: *const u16) -> String {
    String::from_utf16_lossy(&unicode_to_units(base))
}

/// Reads exactly `len` code units back as a `String`, replacing invalid
/// sequences.
///
/// # Safety
///
/// Same contract as [`unicode_to_units_len`].
pub unsafe fn unicode_to_string_len(base: *const u16, len: usize) -> String {
    String::from_utf16_lossy(&unicode_to_units_len(base, len))
}
