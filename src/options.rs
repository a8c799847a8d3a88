//! Builder for opening a [`MappedBuffer`].

use std::path::Path;

use crate::errors::Result;
use crate::flags::{AccessMode, Advice, Sharing};
use crate::mmap::MappedBuffer;

/// Options for opening a mapped buffer.
///
/// # Examples
///
/// ```no_run
/// use mmap_splice::{Advice, MapOptions, Sharing};
///
/// // Map bytes 100..150 of a file, read-write, with a fixed size.
/// let buf = MapOptions::new()
///     .mode_str("rw")?
///     .sharing(Sharing::Shared)
///     .offset(100)
///     .length(50)
///     .advice(Advice::Random)
///     .open("data.bin")?;
/// assert!(buf.is_fixed_size());
/// # Ok::<(), mmap_splice::MmapError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    pub(crate) mode: AccessMode,
    pub(crate) sharing: Sharing,
    pub(crate) length: Option<usize>,
    pub(crate) offset: Option<u64>,
    pub(crate) advice: Option<Advice>,
}

impl MapOptions {
    /// Defaults: read-only, shared, whole file, no advice.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Access mode.
    #[must_use]
    pub fn mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Access mode from its string form (`"r"`, `"w"`, `"rw"`).
    ///
    /// # Errors
    ///
    /// Returns `MmapError::InvalidArgument` for any other string.
    pub fn mode_str(self, mode: &str) -> Result<Self> {
        Ok(self.mode(mode.parse()?))
    }

    /// Sharing mode. Ignored by [`MapOptions::open_anonymous`].
    #[must_use]
    pub fn sharing(mut self, sharing: Sharing) -> Self {
        self.sharing = sharing;
        self
    }

    /// Number of bytes to map. For a file this fixes the size of the buffer; for an
    /// anonymous map it is the initial capacity and is required.
    #[must_use]
    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Byte offset into the file where the mapping begins. Fixes the size of the buffer.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Access-pattern hint applied on every (re)map.
    #[must_use]
    pub fn advice(mut self, advice: Advice) -> Self {
        self.advice = Some(advice);
        self
    }

    /// Map the file at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::open`].
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<MappedBuffer> {
        MappedBuffer::with_options(Some(path.as_ref()), self)
    }

    /// Create an anonymous mapping of `length` bytes.
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::open`].
    pub fn open_anonymous(self) -> Result<MappedBuffer> {
        MappedBuffer::with_options(None, self)
    }

    /// Whether a file buffer opened with these options has a fixed size.
    pub(crate) fn fixes_size(&self) -> bool {
        self.length.is_some() || self.offset.is_some()
    }
}
