use lorawan_session::store::{
    DurableMemory, DurableStore, RetainedSlot, RetentionMemory, RetentionStore, StoreError,
};

#[test]
fn test_retention_slots() {
    let mut retention = RetentionMemory::new();
    let mut buf = [0u8; 8];

    for slot in RetainedSlot::ALL {
        assert!(!retention.contains(slot));
        assert_eq!(retention.read(slot, &mut buf), Ok(None));
    }

    retention.write(RetainedSlot::Session, &[1, 2, 3]).unwrap();
    assert_eq!(retention.read(RetainedSlot::Session, &mut buf), Ok(Some(3)));
    assert_eq!(&buf[..3], &[1, 2, 3]);
    assert!(!retention.contains(RetainedSlot::BootCount));

    let mut short = [0u8; 2];
    assert_eq!(
        retention.read(RetainedSlot::Session, &mut short),
        Err(StoreError::BufferTooSmall)
    );
}

#[test]
fn test_retention_counters() {
    let mut retention = RetentionMemory::new();

    assert_eq!(retention.read_counter(RetainedSlot::BootCount), Ok(0));
    retention.write_counter(RetainedSlot::BootCount, 41).unwrap();
    retention.write_counter(RetainedSlot::JoinFailures, 3).unwrap();
    assert_eq!(retention.read_counter(RetainedSlot::BootCount), Ok(41));
    assert_eq!(retention.read_counter(RetainedSlot::JoinFailures), Ok(3));

    // Not a counter
    retention.write(RetainedSlot::JoinFailures, &[7, 7]).unwrap();
    assert_eq!(retention.read_counter(RetainedSlot::JoinFailures), Ok(0));
}

#[test]
fn test_retention_power_loss() {
    let mut retention = RetentionMemory::new();
    retention.write(RetainedSlot::Session, &[0xAA; 16]).unwrap();
    retention.write_counter(RetainedSlot::BootCount, 5).unwrap();

    retention.power_loss();

    for slot in RetainedSlot::ALL {
        assert!(!retention.contains(slot));
    }
    assert_eq!(retention.read_counter(RetainedSlot::BootCount), Ok(0));
}

#[test]
fn test_retention_value_too_large() {
    let mut retention = RetentionMemory::new();
    let huge = [0u8; 1024];
    assert_eq!(
        retention.write(RetainedSlot::Session, &huge),
        Err(StoreError::ValueTooLarge)
    );
}

#[test]
fn test_durable_namespaces() {
    let mut durable = DurableMemory::new();
    let mut buf = [0u8; 16];

    durable.write("lorawan", "nonces", &[1, 2]).unwrap();
    durable.write("app", "nonces", &[9]).unwrap();

    assert_eq!(durable.read("lorawan", "nonces", &mut buf), Ok(Some(2)));
    assert_eq!(&buf[..2], &[1, 2]);
    assert_eq!(durable.get("app", "nonces"), Some(&[9u8][..]));
    assert_eq!(durable.read("lorawan", "session", &mut buf), Ok(None));
    assert_eq!(durable.write_count(), 2);
}

#[test]
fn test_durable_overwrite_and_remove() {
    let mut durable = DurableMemory::new();

    durable.write("lorawan", "nonces", &[1, 2, 3]).unwrap();
    durable.write("lorawan", "nonces", &[4]).unwrap();
    assert_eq!(durable.get("lorawan", "nonces"), Some(&[4u8][..]));

    durable.remove("lorawan", "nonces").unwrap();
    assert_eq!(durable.get("lorawan", "nonces"), None);
    // Absent key
    durable.remove("lorawan", "nonces").unwrap();
}

#[test]
fn test_durable_rejected_write_keeps_old_value() {
    let mut durable = DurableMemory::new();
    durable.write("lorawan", "nonces", &[1, 2, 3]).unwrap();

    let huge = [0u8; 65];
    assert_eq!(
        durable.write("lorawan", "nonces", &huge),
        Err(StoreError::ValueTooLarge)
    );
    assert_eq!(durable.get("lorawan", "nonces"), Some(&[1u8, 2, 3][..]));
    assert_eq!(durable.write_count(), 1);
}

#[test]
fn test_durable_limits() {
    let mut durable = DurableMemory::new();

    assert_eq!(
        durable.write("a-namespace-that-is-long", "k", &[1]),
        Err(StoreError::KeyTooLong)
    );

    let keys = ["k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7"];
    for key in keys {
        durable.write("ns", key, &[0]).unwrap();
    }
    assert_eq!(durable.write("ns", "k8", &[0]), Err(StoreError::Full));
    // Existing keys can still be replaced
    durable.write("ns", "k0", &[1]).unwrap();

    durable.erase();
    assert_eq!(durable.get("ns", "k0"), None);
}

#[test]
fn test_durable_buffer_too_small() {
    let mut durable = DurableMemory::new();
    durable.write("lorawan", "nonces", &[0u8; 10]).unwrap();

    let mut buf = [0u8; 4];
    assert_eq!(
        durable.read("lorawan", "nonces", &mut buf),
        Err(StoreError::BufferTooSmall)
    );
}

#[cfg(feature = "std")]
mod file {
    use std::path::PathBuf;

    use lorawan_session::store::{file::MAX_NAME_LEN, DurableStore, FileStore, StoreError};

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "lorawan-session-{}-{}",
            std::process::id(),
            name
        ));
        let _ = std::fs::remove_dir_all(&root);
        root
    }

    #[test]
    fn test_file_store_roundtrip() {
        let root = temp_root("roundtrip");
        let mut store = FileStore::open(&root).unwrap();
        let mut buf = [0u8; 16];

        assert_eq!(store.read("lorawan", "nonces", &mut buf), Ok(None));

        store.write("lorawan", "nonces", &[1, 2, 3]).unwrap();
        store.write("lorawan", "nonces", &[4, 5]).unwrap();
        assert_eq!(store.read("lorawan", "nonces", &mut buf), Ok(Some(2)));
        assert_eq!(&buf[..2], &[4, 5]);

        // Temporary file renamed away
        assert!(!root.join("lorawan").join("nonces.tmp").exists());

        // A second handle sees the value, as after a reboot
        let reopened = FileStore::open(&root).unwrap();
        assert_eq!(reopened.read("lorawan", "nonces", &mut buf), Ok(Some(2)));

        store.remove("lorawan", "nonces").unwrap();
        store.remove("lorawan", "nonces").unwrap();
        assert_eq!(store.read("lorawan", "nonces", &mut buf), Ok(None));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_file_store_rejects_paths() {
        let root = temp_root("paths");
        let mut store = FileStore::open(&root).unwrap();

        assert_eq!(store.write("..", "nonces", &[1]), Err(StoreError::InvalidKey));
        assert_eq!(store.write(".", "nonces", &[1]), Err(StoreError::InvalidKey));
        assert_eq!(store.write("lorawan", "a/b", &[1]), Err(StoreError::InvalidKey));
        assert_eq!(store.write("lorawan", "a\\b", &[1]), Err(StoreError::InvalidKey));
        assert_eq!(store.write("", "nonces", &[1]), Err(StoreError::InvalidKey));

        let long = "n".repeat(MAX_NAME_LEN + 1);
        assert_eq!(store.write(&long, "nonces", &[1]), Err(StoreError::KeyTooLong));
        // Longer than the in-memory store allows, still a valid file name
        let mut buf = [0u8; 4];
        store.write("lorawan-sessions", "nonces", &[7]).unwrap();
        assert_eq!(store.read("lorawan-sessions", "nonces", &mut buf), Ok(Some(1)));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_file_store_buffer_too_small() {
        let root = temp_root("small");
        let mut store = FileStore::open(&root).unwrap();
        store.write("lorawan", "nonces", &[0u8; 8]).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(
            store.read("lorawan", "nonces", &mut buf),
            Err(StoreError::BufferTooSmall)
        );

        let _ = std::fs::remove_dir_all(&root);
    }
}
