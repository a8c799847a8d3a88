//! Protection, advice, locking and sync through the public API.

use mmap_splice::{
    flags::constant, Advice, BufferState, MapOptions, MappedBuffer, MmapError, Protection,
    Sharing, SyncMode,
};
use std::fs;
use tempfile::tempdir;

#[test]
fn write_protection_round_trip_on_shared_map() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("protect.bin");
    fs::write(&path, b"guarded").expect("write");

    let mut buf = MappedBuffer::open_file(&path, "rw").expect("open");
    buf.protect_str("r").expect("read only");
    assert!(matches!(buf.set(0, b'G'), Err(MmapError::NoAccess(_))));
    assert_eq!(buf.state(), BufferState::Open);
    assert_eq!(buf.as_bytes().expect("still readable"), b"guarded");

    buf.protect(Protection::READ_WRITE).expect("read write");
    buf.set(0, b'G').expect("set");
    assert_eq!(buf.as_bytes().expect("bytes"), b"Guarded");
}

#[test]
fn removing_write_from_private_map_freezes_it() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("private.bin");
    fs::write(&path, b"cow").expect("write");

    let mut buf = MapOptions::new()
        .mode_str("rw")
        .expect("mode")
        .sharing(Sharing::Private)
        .open(&path)
        .expect("open");
    buf.protect(Protection::READ).expect("protect");
    assert_eq!(buf.state(), BufferState::Frozen);
    assert!(matches!(
        buf.protect(Protection::READ_WRITE),
        Err(MmapError::FrozenViolation)
    ));
}

#[test]
fn no_access_blocks_reads() {
    let mut buf = MappedBuffer::anonymous(16).expect("anon");
    buf.append(b"secret").expect("append");
    buf.protect(Protection::NONE).expect("none");
    assert!(matches!(buf.as_bytes(), Err(MmapError::NoAccess(_))));
    assert!(matches!(buf.get(0), Err(MmapError::NoAccess(_))));
    buf.protect(Protection::READ).expect("read");
    assert_eq!(buf.as_bytes().expect("bytes"), b"secret");
}

#[test]
fn advice_survives_growth() {
    let mut buf = MapOptions::new()
        .mode_str("rw")
        .expect("mode")
        .length(8)
        .advice(Advice::Sequential)
        .open_anonymous()
        .expect("anon");
    assert_eq!(buf.advice(), Some(Advice::Sequential));

    buf.append(&[1u8; 64]).expect("grow");
    buf.advise(Advice::WillNeed).expect("advise");
    buf.append(&[2u8; 64]).expect("grow again");
    assert_eq!(buf.advice(), Some(Advice::WillNeed));
    assert_eq!(buf.len(), 128);
}

#[test]
fn lock_is_idempotent_and_survives_growth() {
    let mut buf = MappedBuffer::anonymous(8).expect("anon");
    if let Err(e) = buf.lock() {
        // Unprivileged environments may have a zero RLIMIT_MEMLOCK.
        assert!(matches!(e, MmapError::LockFailed(_)));
        return;
    }
    buf.lock().expect("second lock");
    assert!(buf.is_locked());
    buf.append(&[0u8; 32]).expect("grow");
    assert!(buf.is_locked());
    buf.unlock().expect("unlock");
    buf.unlock().expect("second unlock");
    assert!(!buf.is_locked());
}

#[test]
fn sync_modes_and_constants() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("sync.bin");
    fs::write(&path, b"0123456789").expect("write");

    let mut buf = MappedBuffer::open_file(&path, "rw").expect("open");
    buf.replace(0, 4, b"").expect("delete");
    buf.sync(SyncMode::ASYNC).expect("async sync");
    assert_eq!(fs::read(&path).expect("read"), b"456789");
    buf.sync(SyncMode::SYNC.invalidate()).expect("sync invalidate");

    assert_eq!(constant("MS_SYNC"), Some(libc::MS_SYNC));
    assert_eq!(constant("PROT_READ"), Some(libc::PROT_READ));
    assert_eq!(constant("NOPE"), None);
}

#[test]
fn operations_after_unmap_fail() {
    let mut buf = MappedBuffer::anonymous(8).expect("anon");
    buf.unmap().expect("unmap");
    assert!(matches!(buf.flush(), Err(MmapError::UnmappedAccess)));
    assert!(matches!(buf.lock(), Err(MmapError::UnmappedAccess)));
    assert!(matches!(buf.advise(Advice::Random), Err(MmapError::UnmappedAccess)));
    assert!(matches!(buf.protect(Protection::READ), Err(MmapError::UnmappedAccess)));
    assert!(matches!(buf.freeze(), Err(MmapError::UnmappedAccess)));
    assert_eq!(buf.capacity(), 0);
}
