//! Basic integration tests for mmap-splice.

use mmap_splice::{
    map_anonymous, map_file, AccessMode, BufferState, MapOptions, MappedBuffer, MmapError,
    Protection, Sharing,
};
use std::fs;
use std::path::PathBuf;

fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("mmap_splice_test_{}_{}", name, std::process::id()));
    p
}

#[test]
fn anonymous_replace_append_replace() {
    let mut buf = MapOptions::new()
        .mode_str("rw")
        .expect("mode")
        .length(10)
        .open_anonymous()
        .expect("anon");
    assert_eq!(buf.len(), 0);
    assert_eq!(buf.sharing(), Sharing::Anonymous);

    buf.replace(0, 0, b"hello").expect("replace");
    buf.append(b" world").expect("append");
    assert_eq!(buf.as_bytes().expect("bytes"), b"hello world");
    assert!(buf.capacity() >= 11);

    buf.replace(0, 5, b"HI").expect("replace");
    assert_eq!(buf.as_bytes().expect("bytes"), b"HI world");
    assert_eq!(buf.len(), 8);
}

#[test]
fn read_only_file_is_frozen() {
    let path = tmp_path("read_only_file_is_frozen");
    fs::write(&path, vec![b'x'; 100]).expect("write");

    let mut buf = map_file(&path, "r").expect("open");
    assert_eq!(buf.state(), BufferState::Frozen);
    assert_eq!(buf.len(), 100);
    assert!(matches!(buf.append(b"more"), Err(MmapError::FrozenViolation)));
    assert!(matches!(buf.set(0, b'y'), Err(MmapError::FrozenViolation)));
    assert_eq!(buf.len(), 100);

    drop(buf);
    assert_eq!(fs::metadata(&path).expect("meta").len(), 100);
    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn range_past_end_of_file_is_rejected() {
    let path = tmp_path("range_past_end_of_file_is_rejected");
    fs::write(&path, vec![0u8; 120]).expect("write");

    let err = MapOptions::new()
        .length(50)
        .offset(100)
        .open(&path)
        .err()
        .expect("must fail");
    assert!(matches!(err, MmapError::InvalidArgument(_)));
    assert!(err.is_validation());
    assert_eq!(fs::metadata(&path).expect("meta").len(), 120);

    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn replace_matches_reference_splice() {
    let mut buf = map_anonymous(4).expect("anon");
    let mut model: Vec<u8> = Vec::new();

    let edits: &[(usize, usize, &[u8])] = &[
        (0, 0, b"abcdef"),
        (2, 2, b"XYZW"),
        (0, 1, b""),
        (7, 100, b"tail"),
        (3, 0, b"--inserted--"),
        (0, 5, b"Q"),
    ];
    for &(begin, len, bytes) in edits {
        buf.replace(begin, len, bytes).expect("replace");
        let end = (begin + len).min(model.len());
        model.splice(begin..end, bytes.iter().copied());
        assert_eq!(buf.as_bytes().expect("bytes"), model.as_slice());
        assert!(buf.len() <= buf.capacity());
    }
}

#[test]
fn many_small_appends() {
    let mut buf = map_anonymous(1).expect("anon");
    for i in 0..100u8 {
        buf.append(&[i; 10]).expect("append");
    }
    assert_eq!(buf.len(), 1000);
    for (i, chunk) in buf.as_bytes().expect("bytes").chunks(10).enumerate() {
        assert!(chunk.iter().all(|&b| usize::from(b) == i));
    }
}

#[test]
fn file_edits_reach_disk_and_unmap_truncates() {
    let path = tmp_path("file_edits_reach_disk_and_unmap_truncates");
    fs::write(&path, b"The quick brown fox").expect("write");

    let mut buf = map_file(&path, "rw").expect("open");
    buf.splice(4, 5, b"slow").expect("splice");
    buf.splice(-3, 3, b"turtle").expect("splice from end");
    assert_eq!(buf.as_bytes().expect("bytes"), b"The slow brown turtle");

    buf.remove(4, 5).expect("remove");
    assert_eq!(buf.as_bytes().expect("bytes"), b"The brown turtle");
    assert!(buf.capacity() > buf.len());

    buf.unmap().expect("unmap");
    assert_eq!(buf.state(), BufferState::Unmapped);
    assert_eq!(fs::read(&path).expect("read"), b"The brown turtle");

    buf.unmap().expect("second unmap is a no-op");
    assert!(matches!(buf.as_bytes(), Err(MmapError::UnmappedAccess)));
    assert!(matches!(buf.append(b"x"), Err(MmapError::UnmappedAccess)));

    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn drop_reconciles_file_length() {
    let path = tmp_path("drop_reconciles_file_length");
    fs::write(&path, b"0123456789").expect("write");

    {
        let mut buf = map_file(&path, "rw").expect("open");
        buf.remove(0, 6).expect("remove");
    }
    assert_eq!(fs::read(&path).expect("read"), b"6789");

    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn fixed_size_map_rejects_length_changes() {
    let path = tmp_path("fixed_size_map_rejects_length_changes");
    fs::write(&path, b"header|payload|footer").expect("write");

    let mut buf = MapOptions::new()
        .mode_str("rw")
        .expect("mode")
        .offset(7)
        .length(7)
        .open(&path)
        .expect("open");
    assert_eq!(buf.as_bytes().expect("bytes"), b"payload");
    assert!(buf.is_fixed_size());

    assert!(matches!(buf.append(b"!"), Err(MmapError::FixedSizeViolation)));
    assert!(matches!(buf.replace(0, 3, b"P"), Err(MmapError::FixedSizeViolation)));
    assert_eq!(buf.len(), 7);

    buf.replace(0, 7, b"PAYLOAD").expect("same-length replace");
    buf.flush().expect("flush");
    drop(buf);
    assert_eq!(fs::read(&path).expect("read"), b"header|PAYLOAD|footer");

    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn shared_maps_see_each_others_writes() {
    let path = tmp_path("shared_maps_see_each_others_writes");
    fs::write(&path, b"aaaa").expect("write");

    let mut writer = map_file(&path, "rw").expect("writer");
    let reader = map_file(&path, "r").expect("reader");
    writer.set(1, b'b').expect("set");
    assert_eq!(reader.as_bytes().expect("bytes"), b"abaa");

    drop(reader);
    drop(writer);
    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn anonymous_with_path_is_rejected() {
    let path = tmp_path("anonymous_with_path_is_rejected");
    let err = MappedBuffer::open(Some(&path), "rw", Sharing::Anonymous, MapOptions::new())
        .err()
        .expect("must fail");
    assert!(matches!(err, MmapError::InvalidArgument(_)));
}

#[test]
fn write_only_file_grows_and_persists() {
    let path = tmp_path("write_only_file_grows_and_persists");
    fs::write(&path, b"abc").expect("write");

    let mut buf = map_file(&path, "w").expect("open");
    assert_eq!(buf.mode(), AccessMode::Write);
    assert_eq!(buf.protection(), Protection::WRITE);
    assert_eq!(buf.state(), BufferState::Open);

    buf.replace(0, 1, b"XY").expect("replace grows");
    buf.append(b"tail").expect("append grows");
    assert_eq!(buf.capacity(), 8);
    assert_eq!(buf.protection(), Protection::WRITE);
    buf.flush().expect("flush");
    drop(buf);

    assert_eq!(fs::read(&path).expect("read"), b"XYbctail");
    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn write_only_anonymous_buffer_grows() {
    let mut buf = MapOptions::new()
        .mode(AccessMode::Write)
        .length(4)
        .open_anonymous()
        .expect("anon");
    assert!(!buf.is_frozen());

    buf.append(b"abcd").expect("fill");
    buf.append(b"efgh").expect("grow");
    assert_eq!(buf.capacity(), 8);
    assert_eq!(buf.protection(), Protection::WRITE);
    assert_eq!(buf.as_bytes().expect("bytes"), b"abcdefgh");
}

#[test]
fn anonymous_offset_is_ignored() {
    let mut buf = MapOptions::new()
        .mode_str("rw")
        .expect("mode")
        .length(8)
        .offset(100)
        .open_anonymous()
        .expect("anon with offset");
    assert_eq!(buf.offset(), 0);
    assert_eq!(buf.capacity(), 8);
    assert!(!buf.is_fixed_size());

    buf.append(b"0123456789").expect("anonymous stays growable");
    assert_eq!(buf.len(), 10);
}
