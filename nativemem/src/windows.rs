use crate::error::NativeMemError;
use crate::types::Protection;
use log::trace;
use std::ptr;
use winapi::um::memoryapi::{VirtualAlloc, VirtualFree, VirtualLock, VirtualProtect, VirtualUnlock};
use winapi::um::sysinfoapi::{GetSystemInfo, SYSTEM_INFO};
use winapi::um::winnt::{
    MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS, PAGE_READONLY, PAGE_READWRITE,
};

#[inline]
fn as_mut_ptr(region: &mut [u8]) -> *mut winapi::ctypes::c_void {
    region.as_mut_ptr().cast::<winapi::ctypes::c_void>()
}

pub fn alloc(size: usize) -> Result<&'static mut [u8], NativeMemError> {
    if size == 0 {
        return Err(NativeMemError::InvalidArgument(
            "<nativemem> cannot allocate a zero-length region".to_string(),
        ));
    }

    let base = unsafe {
        VirtualAlloc(
            ptr::null_mut(),
            size,
            MEM_COMMIT | MEM_RESERVE,
            PAGE_READWRITE,
        )
    };

    if base.is_null() {
        return Err(NativeMemError::SystemError(format!(
            "<nativemem> could not allocate {} bytes [Err: {}]",
            size,
            std::io::Error::last_os_error()
        )));
    }

    trace!("allocated {} bytes at {:p}", size, base);

    let region = unsafe { std::slice::from_raw_parts_mut(base.cast::<u8>(), size) };

    unsafe {
        ptr::write_bytes(region.as_mut_ptr(), 0, size);
    }

    Ok(region)
}

pub fn free(region: &mut [u8]) -> Result<(), NativeMemError> {
    if region.is_empty() {
        return Ok(());
    }

    protect(region, Protection::ReadWrite)?;

    unsafe {
        ptr::write_bytes(region.as_mut_ptr(), 0, region.len());
    }

    trace!("freeing {} bytes at {:p}", region.len(), region.as_ptr());

    let result = unsafe { VirtualFree(as_mut_ptr(region), 0, MEM_RELEASE) };
    if result == 0 {
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
        Protection::NoAccess => PAGE_NOACCESS,
        Protection::ReadOnly => PAGE_READONLY,
        Protection::ReadWrite => PAGE_READWRITE,
    };

    let mut old_protect: u32 = 0;
    let result =
        unsafe { VirtualProtect(as_mut_ptr(region), region.len(), prot, &mut old_protect) };
    if result == 0 {
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

    let result = unsafe { VirtualLock(as_mut_ptr(region), region.len()) };
    if result == 0 {
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

    let result = unsafe { VirtualUnlock(as_mut_ptr(region), region.len()) };
    if result == 0 {
        return Err(NativeMemError::SystemError(format!(
            "<nativemem> could not free lock on {:p} [Err: {}]",
            region.as_ptr(),
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

pub fn page_size() -> usize {
    unsafe {
        let mut si: SYSTEM_INFO = std::mem::zeroed();
        GetSystemInfo(&mut si);
        si.dwPageSize as usize
    }
}
