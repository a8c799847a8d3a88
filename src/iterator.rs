//! Borrowed iterators over the live region.
//!
//! Every item is a slice into the mapping, tied to a shared borrow of the buffer, so
//! no mutation (and hence no remap) can happen while an iterator is alive.

use std::iter::Copied;
use std::slice;

use crate::errors::{MmapError, Result};
use crate::mmap::MappedBuffer;
use crate::utils::page_size;

/// Iterator over fixed-size chunks of the live region. The last chunk may be short.
///
/// # Examples
///
/// ```no_run
/// use mmap_splice::MappedBuffer;
///
/// let buf = MappedBuffer::open_file("data.bin", "r")?;
///
/// // Iterate over 4KB chunks
/// for (i, chunk) in buf.chunks(4096)?.enumerate() {
///     println!("Chunk {} at offset {}: {} bytes", i, i * 4096, chunk.len());
/// }
/// # Ok::<(), mmap_splice::MmapError>(())
/// ```
pub struct ChunkIterator<'a> {
    inner: slice::Chunks<'a, u8>,
}

impl<'a> Iterator for ChunkIterator<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ChunkIterator<'_> {}

/// Iterator over page-sized chunks of the live region.
pub struct PageIterator<'a> {
    inner: ChunkIterator<'a>,
}

impl<'a> Iterator for PageIterator<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for PageIterator<'_> {}

/// Iterator over separator-terminated lines. Each line keeps its separator; the last
/// line has none if the content does not end with one.
pub struct Lines<'a> {
    rest: &'a [u8],
    separator: Vec<u8>,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .windows(self.separator.len())
            .position(|w| w == self.separator.as_slice())
            .map_or(self.rest.len(), |pos| pos + self.separator.len());
        let (line, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(line)
    }
}

impl MappedBuffer {
    /// Iterate over `chunk_size`-byte chunks of the live region.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero chunk size, `UnmappedAccess` or `NoAccess` if the
    /// live bytes cannot be read.
    pub fn chunks(&self, chunk_size: usize) -> Result<ChunkIterator<'_>> {
        if chunk_size == 0 {
            return Err(MmapError::InvalidArgument("chunk size must be greater than zero".into()));
        }
        Ok(ChunkIterator {
            inner: self.as_bytes()?.chunks(chunk_size),
        })
    }

    /// Iterate over page-sized chunks of the live region.
    ///
    /// Pages are counted from the start of the live region; with a non page-aligned
    /// offset they do not line up with the pages of the mapping.
    ///
    /// # Errors
    ///
    /// `UnmappedAccess` or `NoAccess` if the live bytes cannot be read.
    pub fn pages(&self) -> Result<PageIterator<'_>> {
        Ok(PageIterator {
            inner: self.chunks(page_size())?,
        })
    }

    /// Iterate over `\n`-terminated lines.
    ///
    /// # Errors
    ///
    /// `UnmappedAccess` or `NoAccess` if the live bytes cannot be read.
    pub fn lines(&self) -> Result<Lines<'_>> {
        self.lines_with(b"\n")
    }

    /// Iterate over lines terminated by `separator`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty separator, `UnmappedAccess` or `NoAccess` if the
    /// live bytes cannot be read.
    pub fn lines_with(&self, separator: &[u8]) -> Result<Lines<'_>> {
        if separator.is_empty() {
            return Err(MmapError::InvalidArgument("line separator must not be empty".into()));
        }
        Ok(Lines {
            rest: self.as_bytes()?,
            separator: separator.to_vec(),
        })
    }

    /// Iterate over the live bytes by value.
    ///
    /// # Errors
    ///
    /// `UnmappedAccess` or `NoAccess` if the live bytes cannot be read.
    pub fn bytes(&self) -> Result<Copied<slice::Iter<'_, u8>>> {
        Ok(self.as_bytes()?.iter().copied())
    }

    /// Visit the live region in `chunk_size`-byte chunks with mutable access.
    ///
    /// The callback gets the chunk's offset in the live region. The length never
    /// changes, so this works on fixed-size buffers. Stops at the first callback error
    /// and returns it in the inner result.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero chunk size, or the errors of the mutability check
    /// (`UnmappedAccess`, `FrozenViolation`, `NoAccess`).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mmap_splice::MappedBuffer;
    ///
    /// let mut buf = MappedBuffer::open_file("data.bin", "rw")?;
    ///
    /// // Zero out the buffer in 4KB chunks
    /// buf.for_each_chunk_mut(4096, |_offset, chunk| {
    ///     chunk.fill(0);
    ///     Ok::<(), std::io::Error>(())
    /// })??;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn for_each_chunk_mut<F, E>(
        &mut self,
        chunk_size: usize,
        mut f: F,
    ) -> Result<std::result::Result<(), E>>
    where
        F: FnMut(usize, &mut [u8]) -> std::result::Result<(), E>,
    {
        if chunk_size == 0 {
            return Err(MmapError::InvalidArgument("chunk size must be greater than zero".into()));
        }
        self.check_mutable()?;
        for (i, chunk) in self.live_bytes_mut()?.chunks_mut(chunk_size).enumerate() {
            if let Err(e) = f(i * chunk_size, chunk) {
                return Ok(Err(e));
            }
        }
        Ok(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn tmp_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "mmap_splice_iterator_test_{}_{}",
            name,
            std::process::id()
        ));
        p
    }

    #[test]
    fn test_chunk_iterator() {
        let path = tmp_path("chunk_iter");
        let mut data = Vec::with_capacity(10240);
        for i in 0..10u8 {
            data.extend(std::iter::repeat(i).take(1024));
        }
        fs::write(&path, &data).expect("write");

        let buf = MappedBuffer::open_file(&path, "r").expect("open");
        let chunks: Vec<_> = buf.chunks(1024).expect("chunks").collect();
        assert_eq!(chunks.len(), 10);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.len(), 1024);
            assert!(chunk.iter().all(|&b| b == i as u8));
        }

        // Non-aligned chunk size
        let chunks: Vec<_> = buf.chunks(3000).expect("chunks").collect();
        assert_eq!(chunks.len(), 4); // 3000, 3000, 3000, 1240
        assert_eq!(chunks[3].len(), 1240);
        assert_eq!(buf.chunks(3000).expect("chunks").size_hint(), (4, Some(4)));

        drop(buf);
        fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn test_page_iterator() {
        let ps = page_size();
        let mut buf = MappedBuffer::anonymous(ps * 3 + 100).expect("anon");
        buf.append(&vec![7u8; ps * 3 + 100]).expect("fill");

        let pages: Vec<_> = buf.pages().expect("pages").collect();
        assert_eq!(pages.len(), 4); // 3 full + 1 partial
        assert_eq!(pages[0].len(), ps);
        assert_eq!(pages[3].len(), 100);
    }

    #[test]
    fn chunks_cover_only_live_bytes() {
        let mut buf = MappedBuffer::anonymous(64).expect("anon");
        buf.append(b"abcde").expect("append");
        let chunks: Vec<_> = buf.chunks(2).expect("chunks").collect();
        assert_eq!(chunks, vec![&b"ab"[..], b"cd", b"e"]);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let buf = MappedBuffer::anonymous(8).expect("anon");
        assert!(matches!(buf.chunks(0), Err(MmapError::InvalidArgument(_))));
    }

    #[test]
    fn lines_keep_terminators() {
        let mut buf = MappedBuffer::anonymous(32).expect("anon");
        buf.append(b"one\ntwo\n\nthree").expect("append");
        let lines: Vec<_> = buf.lines().expect("lines").collect();
        assert_eq!(lines, vec![&b"one\n"[..], b"two\n", b"\n", b"three"]);

        let parts: Vec<_> = buf.lines_with(b"o\n").expect("lines").collect();
        assert_eq!(parts, vec![&b"one\ntwo\n"[..], b"\nthree"]);
        assert!(matches!(buf.lines_with(b""), Err(MmapError::InvalidArgument(_))));
    }

    #[test]
    fn bytes_iterates_by_value() {
        let mut buf = MappedBuffer::anonymous(4).expect("anon");
        buf.append(b"xyz").expect("append");
        assert_eq!(buf.bytes().expect("bytes").rev().collect::<Vec<u8>>(), b"zyx");
    }

    #[test]
    fn test_mutable_chunk_visit() {
        let path = tmp_path("mut_chunk_iter");
        fs::write(&path, vec![0u8; 4096]).expect("write");

        let mut buf = MappedBuffer::open_file(&path, "rw").expect("open");
        buf.for_each_chunk_mut(1024, |offset, chunk| {
            chunk.fill((offset / 1024) as u8);
            Ok::<(), std::io::Error>(())
        })
        .expect("visit")
        .expect("callback");
        buf.flush().expect("flush");

        for (i, chunk) in buf.chunks(1024).expect("chunks").enumerate() {
            assert!(chunk.iter().all(|&b| b == i as u8));
        }

        drop(buf);
        fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn mutable_visit_on_frozen_buffer_fails() {
        let mut buf = MappedBuffer::anonymous(8).expect("anon");
        buf.freeze().expect("freeze");
        let res = buf.for_each_chunk_mut(4, |_, _| Ok::<(), ()>(()));
        assert!(matches!(res, Err(MmapError::FrozenViolation)));
    }
}
