use nativemem::{alloc, free, lock, page_size, protect, unlock, Protection};

#[test]
fn test_alloc_lock_free_cycle() {
    let region = alloc(32).expect("Failed to allocate memory");

    assert_eq!(region.len(), 32, "allocation has invalid size");

    // Fresh allocations must be zeroed
    for &byte in region.iter() {
        assert_eq!(byte, 0, "allocated memory not zeroed");
    }

    lock(region).expect("Failed to lock memory");

    for byte in region.iter_mut() {
        *byte = 1;
        assert_eq!(*byte, 1, "read back data different to what was written");
    }

    unlock(region).expect("Failed to unlock memory");
    free(region).expect("Failed to free memory");
}

#[test]
fn test_protect_modes() {
    let region = alloc(32).expect("Failed to allocate memory");

    protect(region, Protection::ReadWrite).expect("Failed to set ReadWrite protection");
    protect(region, Protection::ReadOnly).expect("Failed to set ReadOnly protection");
    protect(region, Protection::NoAccess).expect("Failed to set NoAccess protection");

    // free() reopens the region itself before wiping
    free(region).expect("Failed to free memory");
}

#[test]
fn test_free_wipes_readonly_region() {
    let region = alloc(16).expect("Failed to allocate memory");
    region.fill(0xAA);

    protect(region, Protection::ReadOnly).expect("Failed to set ReadOnly protection");
    free(region).expect("Failed to free read-only memory");
}

#[test]
fn test_zero_length_alloc_is_rejected() {
    let result = alloc(0);
    assert!(result.is_err(), "zero-length allocation should fail");
}

#[test]
fn test_page_size() {
    let size = page_size();
    assert!(size > 0, "Page size should be greater than zero");
    assert!(size.is_power_of_two(), "Page size should be a power of 2");
}
