use crate::error::NativeMemError;
use crate::types::Protection;
use log::trace;
use once_cell::sync::Lazy;
use std::ptr;

static PAGE_SIZE: Lazy<usize> =
    Lazy::new(|| unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize });

#[inline]
fn as_mut_ptr(region: &mut [u8]) -> *mut libc::c_void {
    region.as_mut_ptr().cast::<libc::c_void>()
}

pub fn alloc(size: usize) -> Result<&'static mut [u8], NativeMemError> {
    if size == 0 {
        return Err(NativeMemError::InvalidArgument(
            "<nativemem> cannot allocate a zero-length region".to_string(),
        ));
    }

    let base = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        )
    };

    if base == libc::MAP_FAILED {
        return Err(NativeMemError::SystemError(format!(
            "<nativemem> could not allocate {} bytes [Err: {}]",
            size,
            std::io::Error::last_os_error()
        )));
    }

    trace!("allocated {} bytes at {:p}", size, base);

    let region = unsafe { std::slice::from_raw_parts_mut(base.cast::<u8>(), size) };

    // mmap'd anonymous pages are already zeroed, but only on first touch;
    // wipe explicitly so the contract holds for any backing.
    unsafe {
        ptr::write_bytes(region.as_mut_ptr(), 0, size);
    }

    Ok(region)
}

pub fn free(region: &mut [u8]) -> Result<(), NativeMemError> {
    if region.is_empty() {
        return Ok(());
    }

    // The region may currently be read-only or inaccessible; it has to be
    // writable for the wipe.
    protect(region, Protection::ReadWrite)?;

    unsafe {
        ptr::write_bytes(region.as_mut_ptr(), 0, region.len());
    }

    trace!("freeing {} bytes at {:p}", region.len(), region.as_ptr());

    let result = unsafe { libc::munmap(as_mut_ptr(region), region.len()) };
    if result != 0 {
        return Err(NativeMemError::SystemError(format!(
            "<nativemem> could not deallocate {:p} [Err: {}]",
            region.as_ptr(),
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

pub fn protect(region: &mut [u8], protection: Protection) -> Result<(), NativeMemError> {
    if region.is_empty() {
        return Ok(());
    }

    let prot = match protection {
        Protection::NoAccess => libc::PROT_NONE,
        Protection::ReadOnly => libc::PROT_READ,
        Protection::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
    };

    let result = unsafe { libc::mprotect(as_mut_ptr(region), region.len(), prot) };
    if result != 0 {
        return Err(NativeMemError::SystemError(format!(
            "<nativemem> could not set {:?} on {:p} [Err: {}]",
            protection,
            region.as_ptr(),
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

pub fn lock(region: &mut [u8]) -> Result<(), NativeMemError> {
    if region.is_empty() {
        return Ok(());
    }

    // Keep locked pages out of core dumps where the kernel supports it.
    #[cfg(target_os = "linux")]
    unsafe {
        libc::madvise(as_mut_ptr(region), region.len(), libc::MADV_DONTDUMP);
    }

    let result = unsafe { libc::mlock(as_mut_ptr(region), region.len()) };
    if result != 0 {
        return Err(NativeMemError::SystemError(format!(
            "<nativemem> could not acquire lock on {:p}, limit reached? [Err: {}]",
            region.as_ptr(),
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

pub fn unlock(region: &mut [u8]) -> Result<(), NativeMemError> {
    if region.is_empty() {
        return Ok(());
    }

    let result = unsafe { libc::munlock(as_mut_ptr(region), region.len()) };
    if result != 0 {
        return Err(NativeMemError::SystemError(format!(
            "<nativemem> could not free lock on {:p} [Err: {}]",
            region.as_ptr(),
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

pub fn page_size() -> usize {
    *PAGE_SIZE
}
