//! External operations applied to file-backed buffers.

use mmap_splice::{ExternalError, ExternalOp, MappedBuffer, MmapError, OpKind, Outcome};
use std::fs;
use std::path::PathBuf;

fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("mmap_splice_delegation_{}_{}", name, std::process::id()));
    p
}

/// Wraps every line in brackets; counts the lines it saw.
struct Bracket;

impl ExternalOp for Bracket {
    type Output = usize;
    type Error = std::fmt::Error;

    fn kind(&self) -> OpKind {
        OpKind::Resize
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<usize>, std::fmt::Error> {
        let mut out = Vec::with_capacity(bytes.len() * 2);
        let mut count = 0;
        for line in bytes.split(|&b| b == b'\n') {
            if count > 0 {
                out.push(b'\n');
            }
            out.push(b'[');
            out.extend_from_slice(line);
            out.push(b']');
            count += 1;
        }
        Ok(Outcome::replaced(count, out))
    }
}

#[test]
fn collaborator_edit_grows_the_file() {
    let path = tmp_path("grows");
    fs::write(&path, b"a\nbb\nccc").expect("write");

    let mut buf = MappedBuffer::open_file(&path, "rw").expect("open");
    assert_eq!(buf.apply_external(0, Bracket).expect("bracket"), 3);
    buf.flush().expect("flush");
    drop(buf);

    assert_eq!(fs::read(&path).expect("read"), b"[a]\n[bb]\n[ccc]");
    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn read_only_file_allows_inspection_only() {
    let path = tmp_path("inspect_only");
    fs::write(&path, b"x").expect("write");

    let mut buf = MappedBuffer::open_file(&path, "r").expect("open");
    assert!(matches!(
        buf.apply_external(0, Bracket),
        Err(ExternalError::Buffer(MmapError::FrozenViolation))
    ));

    drop(buf);
    fs::remove_file(&path).expect("cleanup");
}

#[cfg(feature = "text")]
mod text_ops {
    use super::*;
    use mmap_splice::text::{Checksum, Chomp, Gsub, Split, Upcase};

    #[test]
    fn gsub_then_shrink_then_inspect() {
        let path = tmp_path("text_ops");
        fs::write(&path, b"alpha  beta\t\tgamma\n").expect("write");

        let mut buf = MappedBuffer::open_file(&path, "rw").expect("open");
        assert!(buf.apply_external(0, Gsub::new(r"\s+", " ").expect("regex")).expect("gsub"));
        assert_eq!(buf.as_bytes().expect("bytes"), b"alpha beta gamma ");
        assert!(buf.apply_external(6, Upcase).expect("upcase"));
        assert_eq!(buf.as_bytes().expect("bytes"), b"alpha BETA GAMMA ");
        assert!(!buf.apply_external(0, Chomp::new()).expect("chomp"));

        let words = buf
            .apply_external(0, Split::new(" ").expect("regex"))
            .expect("split");
        assert_eq!(words, vec![b"alpha".to_vec(), b"BETA".to_vec(), b"GAMMA".to_vec()]);

        let expected: u64 = b"alpha BETA GAMMA ".iter().map(|&b| u64::from(b)).sum();
        assert_eq!(buf.apply_external(0, Checksum::new(0)).expect("sum"), expected);

        buf.unmap().expect("unmap");
        assert_eq!(fs::read(&path).expect("read"), b"alpha BETA GAMMA ");
        fs::remove_file(&path).expect("cleanup");
    }
}
