//! Convenience constructors and helpers around [`MappedBuffer`].

use std::fs;
use std::path::Path;

use crate::errors::{MmapError, Result};
use crate::flags::Sharing;
use crate::mmap::MappedBuffer;
use crate::options::MapOptions;

/// Map a whole file, shared, in the given mode (`"r"`, `"w"`, `"rw"`).
///
/// # Errors
///
/// Returns errors from [`MappedBuffer::open`].
pub fn map_file<P: AsRef<Path>>(path: P, mode: &str) -> Result<MappedBuffer> {
    MappedBuffer::open_file(path, mode)
}

/// Map a whole file copy-on-write. Writes stay in this process.
///
/// # Errors
///
/// Returns errors from [`MappedBuffer::open`].
pub fn map_private<P: AsRef<Path>>(path: P, mode: &str) -> Result<MappedBuffer> {
    MapOptions::new()
        .mode_str(mode)?
        .sharing(Sharing::Private)
        .open(path)
}

/// Map `len` bytes of a file starting at `offset`. The result is fixed-size.
///
/// # Errors
///
/// Returns errors from [`MappedBuffer::open`], including `InvalidArgument` when the
/// range does not lie within the file.
pub fn map_range<P: AsRef<Path>>(path: P, mode: &str, offset: u64, len: usize) -> Result<MappedBuffer> {
    MapOptions::new()
        .mode_str(mode)?
        .offset(offset)
        .length(len)
        .open(path)
}

/// Create a growable anonymous read-write buffer with the given initial capacity.
///
/// # Errors
///
/// Returns errors from [`MappedBuffer::anonymous`].
pub fn map_anonymous(capacity: usize) -> Result<MappedBuffer> {
    MappedBuffer::anonymous(capacity)
}

/// Write the live bytes of `buf` to a new file at `dst`, replacing any existing file.
/// The buffer's own backing file, if any, is not touched.
///
/// # Errors
///
/// Returns the errors of [`MappedBuffer::as_bytes`], or `MmapError::CannotOpen` if
/// the destination cannot be written.
pub fn write_to<P: AsRef<Path>>(buf: &MappedBuffer, dst: P) -> Result<()> {
    let dst = dst.as_ref();
    fs::write(dst, buf.as_bytes()?).map_err(|source| MmapError::CannotOpen {
        path: dst.to_path_buf(),
        source,
    })?;
    log::debug!("wrote {} bytes to {}", buf.len(), dst.display());
    Ok(())
}
