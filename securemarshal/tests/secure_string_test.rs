use securemarshal::{MarshalError, SecureString};

#[test]
fn test_push_and_read_back() {
    let mut secure = SecureString::new().expect("Failed to create secure string");
    assert!(secure.is_empty());

    for unit in "testing".encode_utf16() {
        secure.push_code_unit(unit).expect("Failed to push code unit");
    }
    assert_eq!(secure.len(), 7);

    secure
        .with_code_units(|units| {
            assert_eq!(units, "testing".encode_utf16().collect::<Vec<u16>>());
            Ok(())
        })
        .expect("Failed to read code units");
}

#[test]
fn test_push_char_expands_to_surrogate_pair() {
    let mut secure = SecureString::new().expect("Failed to create secure string");

    secure.push_char('\u{10000}').expect("Failed to push char");
    assert_eq!(secure.len(), 2);

    secure.push_char('a').expect("Failed to push char");
    assert_eq!(secure.len(), 3);

    secure
        .with_code_units(|units| {
            assert_eq!(units, &[0xD800, 0xDC00, 0x61]);
            Ok(())
        })
        .expect("Failed to read code units");
}

#[test]
fn test_unpaired_surrogate_is_stored_verbatim() {
    let mut secure = SecureString::new().expect("Failed to create secure string");
    secure.push_code_unit(0xD800).expect("Failed to push code unit");

    secure
        .with_code_units(|units| {
            assert_eq!(units, &[0xD800]);
            Ok(())
        })
        .expect("Failed to read code units");
}

#[test]
fn test_from_units_wipes_source() {
    let mut source: Vec<u16> = "hunter2".encode_utf16().collect();
    let expected = source.clone();

    let secure = SecureString::from_units(&mut source).expect("Failed to build secure string");

    // The caller's buffer no longer holds the plaintext.
    assert!(source.iter().all(|&u| u == 0));

    secure
        .with_code_units(|units| {
            assert_eq!(units, expected);
            Ok(())
        })
        .expect("Failed to read code units");
}

#[test]
fn test_read_only_rejects_mutation() {
    let mut source: Vec<u16> = "pizza".encode_utf16().collect();
    let mut secure = SecureString::from_units(&mut source).expect("Failed to build secure string");

    assert!(!secure.is_read_only());
    secure.make_read_only().expect("Failed to mark read-only");
    assert!(secure.is_read_only());

    match secure.push_code_unit(0x61) {
        Err(MarshalError::StringReadOnly) => {}
        other => panic!("Expected StringReadOnly error, got {:?}", other),
    }
    match secure.clear() {
        Err(MarshalError::StringReadOnly) => {}
        other => panic!("Expected StringReadOnly error, got {:?}", other),
    }

    // Reads are unaffected.
    secure
        .with_code_units(|units| {
            assert_eq!(units.len(), 5);
            Ok(())
        })
        .expect("Failed to read code units");
}

#[test]
fn test_close_is_idempotent() {
    let mut secure = SecureString::new().expect("Failed to create secure string");
    secure.push_code_unit(0x61).expect("Failed to push code unit");

    assert!(!secure.is_closed());
    secure.close().expect("Failed to close secure string");
    assert!(secure.is_closed());

    // Second close should not error
    secure.close().expect("Second close should be a no-op");
    assert!(secure.is_closed());
}

#[test]
fn test_closed_string_returns_error() {
    let mut secure = SecureString::new().expect("Failed to create secure string");
    secure.close().expect("Failed to close secure string");

    match secure.with_code_units(|_| Ok(())) {
        Err(MarshalError::StringDisposed) => {}
        other => panic!("Expected StringDisposed error, got {:?}", other),
    }
    match secure.push_code_unit(0x61) {
        Err(MarshalError::StringDisposed) => {}
        other => panic!("Expected StringDisposed error, got {:?}", other),
    }
    match secure.make_read_only() {
        Err(MarshalError::StringDisposed) => {}
        other => panic!("Expected StringDisposed error, got {:?}", other),
    }
}

#[test]
fn test_clear_resets_contents() {
    let mut secure = SecureString::new().expect("Failed to create secure string");
    for unit in "secret".encode_utf16() {
        secure.push_code_unit(unit).expect("Failed to push code unit");
    }

    secure.clear().expect("Failed to clear secure string");
    assert_eq!(secure.len(), 0);

    // The string is still usable after a clear.
    secure.push_code_unit(0x62).expect("Failed to push code unit");
    secure
        .with_code_units(|units| {
            assert_eq!(units, &[0x62]);
            Ok(())
        })
        .expect("Failed to read code units");
}

#[test]
fn test_growth_past_one_page() {
    let mut secure = SecureString::new().expect("Failed to create secure string");

    // Enough units to force at least one capacity doubling.
    let count = 5000_usize;
    for i in 0..count {
        secure
            .push_code_unit((i % 0xFFFF + 1) as u16)
            .expect("Failed to push code unit");
    }
    assert_eq!(secure.len(), count);

    secure
        .with_code_units(|units| {
            for (i, &unit) in units.iter().enumerate() {
                assert_eq!(unit, (i % 0xFFFF + 1) as u16, "mismatch at unit {}", i);
            }
            Ok(())
        })
        .expect("Failed to read code units");
}

#[test]
fn test_debug_never_prints_contents() {
    let mut source: Vec<u16> = "topsecret".encode_utf16().collect();
    let secure = SecureString::from_units(&mut source).expect("Failed to build secure string");

    let rendered = format!("{:?}", secure);
    assert!(!rendered.contains("topsecret"));
    assert!(rendered.contains("len: 9"));
}
