//! The splice-able mapped buffer.
//!
//! A [`MappedBuffer`] separates the *live* length (the bytes that make up its value)
//! from the *capacity* of the current mapping. Every mutation goes through
//! [`MappedBuffer::replace`], which grows the mapping (and the backing file) when the
//! new content does not fit.
//!
//! The mapped address is never handed out. Reads return slices borrowed from the
//! buffer, so the borrow checker rejects any attempt to keep one across a call that
//! can remap.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{MmapError, Result};
use crate::flags::{AccessMode, Advice, Protection, Sharing};
use crate::options::MapOptions;
use crate::region::Region;
use crate::utils::{clamp_len, is_space, normalize_index};

/// Lifecycle state of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Mapped; mutable unless the protection forbids writes.
    Open,
    /// Mapped; every mutating call fails with `FrozenViolation`.
    Frozen,
    /// Terminal. Every call except `unmap` fails with `UnmappedAccess`.
    Unmapped,
}

/// Which ends [`MappedBuffer::trim_with`] strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimSide {
    /// Leading bytes only.
    Front,
    /// Trailing bytes only.
    Back,
    /// Both ends.
    Both,
}

/// Resizable byte string stored in a memory mapping.
///
/// # Examples
///
/// ```no_run
/// use mmap_splice::MappedBuffer;
///
/// let mut buf = MappedBuffer::anonymous(10)?;
/// buf.replace(0, 0, b"hello")?;
/// buf.append(b" world")?;
/// buf.replace(0, 5, b"HI")?;
/// assert_eq!(buf.as_bytes()?, b"HI world");
///
/// let mut file = MappedBuffer::open_file("data.txt", "rw")?;
/// file.append(b"\nappended line")?;
/// file.flush()?;
/// # Ok::<(), mmap_splice::MmapError>(())
/// ```
pub struct MappedBuffer {
    pub(crate) region: Option<Region>,
    pub(crate) path: Option<PathBuf>,
    pub(crate) mode: AccessMode,
    pub(crate) protection: Protection,
    pub(crate) sharing: Sharing,
    pub(crate) advice: Option<Advice>,
    pub(crate) offset: u64,
    pub(crate) live: usize,
    pub(crate) locked: bool,
    pub(crate) frozen: bool,
    pub(crate) fixed: bool,
}

impl fmt::Debug for MappedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedBuffer")
            .field("path", &self.path)
            .field("state", &self.state())
            .field("sharing", &self.sharing)
            .field("protection", &self.protection)
            .field("len", &self.live)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl MappedBuffer {
    /// Open a buffer. `path = None` requests an anonymous map, which requires
    /// `options.length`. `mode` is `"r"`, `"w"` or `"rw"`; `"r"` buffers start frozen.
    ///
    /// Giving a file map a `length` or `offset` fixes its size.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::InvalidArgument` for a bad mode, a zero length, a missing
    /// anonymous length or an offset/length pair beyond the end of the file.
    /// Returns `MmapError::CannotOpen`, `CannotStat`, `MapFailed`, `ProtectFailed` or
    /// `AdviseFailed` if the corresponding system call fails.
    pub fn open(
        path: Option<&Path>,
        mode: &str,
        sharing: Sharing,
        options: MapOptions,
    ) -> Result<Self> {
        let options = options.mode_str(mode)?.sharing(sharing);
        Self::with_options(path, options)
    }

    /// Map a whole file, shared.
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::open`].
    pub fn open_file<P: AsRef<Path>>(path: P, mode: &str) -> Result<Self> {
        MapOptions::new().mode_str(mode)?.open(path)
    }

    /// Empty, growable read-write anonymous buffer with `capacity` mapped bytes.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::InvalidArgument` if `capacity` is zero.
    /// Returns `MmapError::MapFailed` if the mapping fails.
    pub fn anonymous(capacity: usize) -> Result<Self> {
        MapOptions::new()
            .mode(AccessMode::ReadWrite)
            .length(capacity)
            .open_anonymous()
    }

    pub(crate) fn with_options(path: Option<&Path>, options: MapOptions) -> Result<Self> {
        if path.is_some() && options.sharing == Sharing::Anonymous {
            return Err(MmapError::InvalidArgument(
                "anonymous sharing requires no path".into(),
            ));
        }
        if options.length == Some(0) {
            return Err(MmapError::InvalidArgument(
                "length must be greater than zero".into(),
            ));
        }
        let region = Region::open(path, &options)?;
        let anonymous = path.is_none();
        let capacity = region.len();
        Ok(Self {
            region: Some(region),
            path: path.map(Path::to_path_buf),
            mode: options.mode,
            protection: options.mode.protection(),
            sharing: if anonymous {
                Sharing::Anonymous
            } else {
                options.sharing
            },
            advice: options.advice,
            offset: if anonymous {
                0
            } else {
                options.offset.unwrap_or(0)
            },
            live: if anonymous { 0 } else { capacity },
            locked: false,
            frozen: options.mode == AccessMode::Read,
            fixed: !anonymous && options.fixes_size(),
        })
    }

    /// Live length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the live region is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Capacity of the current mapping; zero once unmapped.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.region.as_ref().map_or(0, Region::len)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BufferState {
        if self.region.is_none() {
            BufferState::Unmapped
        } else if self.frozen {
            BufferState::Frozen
        } else {
            BufferState::Open
        }
    }

    /// Whether the buffer still owns a mapping.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.region.is_some()
    }

    /// Whether the buffer is frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether the live length can never change.
    #[must_use]
    pub fn is_fixed_size(&self) -> bool {
        self.fixed
    }

    /// Whether the pages are locked in memory.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Mode the buffer was opened with.
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Current protection of the mapping.
    #[must_use]
    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// Sharing mode.
    #[must_use]
    pub fn sharing(&self) -> Sharing {
        self.sharing
    }

    /// Advice applied on every (re)map, if any.
    #[must_use]
    pub fn advice(&self) -> Option<Advice> {
        self.advice
    }

    /// Offset into the backing file.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Backing file; `None` for anonymous buffers and after unmapping.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn region(&self) -> Result<&Region> {
        self.region.as_ref().ok_or(MmapError::UnmappedAccess)
    }

    fn readable_region(&self) -> Result<&Region> {
        let region = self.region()?;
        if !self.protection.readable() {
            return Err(MmapError::NoAccess("mapping is not readable"));
        }
        Ok(region)
    }

    /// Validate that the buffer may be mutated: mapped, not frozen, writable.
    pub(crate) fn check_mutable(&self) -> Result<()> {
        self.region()?;
        if self.frozen {
            return Err(MmapError::FrozenViolation);
        }
        if !self.protection.writable() {
            return Err(MmapError::NoAccess("mapping is not writable"));
        }
        Ok(())
    }

    pub(crate) fn live_bytes_mut(&mut self) -> Result<&mut [u8]> {
        let live = self.live;
        let region = self.region.as_mut().ok_or(MmapError::UnmappedAccess)?;
        Ok(&mut region.bytes_mut()?[..live])
    }

    /// The live bytes.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::UnmappedAccess` if the buffer was unmapped.
    /// Returns `MmapError::NoAccess` if the protection forbids reads.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        Ok(&self.readable_region()?.bytes()[..self.live])
    }

    /// Copy of the live bytes.
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::as_bytes`].
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        self.as_bytes().map(<[u8]>::to_vec)
    }

    /// Bounds-checked view of up to `len` bytes starting at `begin`.
    ///
    /// A negative `begin` counts from the end. `len` is clamped to the live end.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::IndexOutOfRange` if `begin` lies outside `[0, len()]`.
    pub fn read(&self, begin: isize, len: usize) -> Result<&[u8]> {
        let bytes = self.as_bytes()?;
        let begin = normalize_index(begin, bytes.len())?;
        let len = clamp_len(begin, len, bytes.len());
        Ok(&bytes[begin..begin + len])
    }

    /// The byte at `index` (negative counts from the end).
    ///
    /// # Errors
    ///
    /// Returns `MmapError::IndexOutOfRange` unless `index` addresses a live byte.
    pub fn get(&self, index: isize) -> Result<u8> {
        let bytes = self.as_bytes()?;
        match normalize_index(index, bytes.len()) {
            Ok(i) if i < bytes.len() => Ok(bytes[i]),
            _ => Err(MmapError::IndexOutOfRange {
                index: index as i64,
                len: bytes.len(),
            }),
        }
    }

    /// Overwrite the byte at `index` (negative counts from the end).
    ///
    /// # Errors
    ///
    /// Returns `MmapError::FrozenViolation`, `NoAccess` or `UnmappedAccess` if the
    /// buffer cannot be mutated, `IndexOutOfRange` unless `index` addresses a live byte.
    pub fn set(&mut self, index: isize, byte: u8) -> Result<()> {
        self.check_mutable()?;
        let live = self.live;
        let i = match normalize_index(index, live) {
            Ok(i) if i < live => i,
            _ => {
                return Err(MmapError::IndexOutOfRange {
                    index: index as i64,
                    len: live,
                })
            }
        };
        self.live_bytes_mut()?[i] = byte;
        Ok(())
    }

    /// Replace `[begin, begin + len)` with `bytes`, shifting the tail.
    ///
    /// `len` is clamped to the live end. Growing past the capacity remaps the buffer
    /// (and extends the file) to exactly the new live length. This one primitive covers
    /// assignment, insertion (`len == 0`) and deletion (`bytes` empty).
    ///
    /// # Errors
    ///
    /// Returns `MmapError::UnmappedAccess`, `FrozenViolation` or `NoAccess` if the
    /// buffer cannot be mutated, `IndexOutOfRange` if `begin > len()`,
    /// `FixedSizeViolation` if a fixed-size buffer would change length, or the errors
    /// of the growth step. Validation failures leave the buffer untouched.
    pub fn replace(&mut self, begin: usize, len: usize, bytes: &[u8]) -> Result<()> {
        self.check_mutable()?;
        let live = self.live;
        if begin > live {
            return Err(MmapError::IndexOutOfRange {
                index: begin as i64,
                len: live,
            });
        }
        let len = clamp_len(begin, len, live);
        if self.fixed && bytes.len() != len {
            return Err(MmapError::FixedSizeViolation);
        }
        let new_live = live - len + bytes.len();
        if new_live > self.capacity() {
            self.resize(new_live)?;
        }
        let region = self.region.as_mut().ok_or(MmapError::UnmappedAccess)?;
        let buf = region.bytes_mut()?;
        if bytes.len() != len {
            buf.copy_within(begin + len..live, begin + bytes.len());
        }
        buf[begin..begin + bytes.len()].copy_from_slice(bytes);
        self.live = new_live;
        Ok(())
    }

    /// [`MappedBuffer::replace`] with a possibly negative `begin`.
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::replace`].
    pub fn splice(&mut self, begin: isize, len: usize, bytes: &[u8]) -> Result<()> {
        self.check_mutable()?;
        let begin = normalize_index(begin, self.live)?;
        self.replace(begin, len, bytes)
    }

    /// Insert `bytes` before `index` (negative counts from the end).
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::replace`].
    pub fn insert(&mut self, index: isize, bytes: &[u8]) -> Result<()> {
        self.splice(index, 0, bytes)
    }

    /// Delete up to `len` bytes starting at `begin`.
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::replace`].
    pub fn remove(&mut self, begin: isize, len: usize) -> Result<()> {
        self.splice(begin, len, &[])
    }

    /// Append `bytes` at the live end, growing to exactly the required size.
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::replace`].
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_mutable()?;
        if bytes.is_empty() {
            return Ok(());
        }
        if self.fixed {
            return Err(MmapError::FixedSizeViolation);
        }
        let live = self.live;
        let new_live = live + bytes.len();
        if new_live > self.capacity() {
            self.resize(new_live)?;
        }
        let region = self.region.as_mut().ok_or(MmapError::UnmappedAccess)?;
        region.bytes_mut()?[live..new_live].copy_from_slice(bytes);
        self.live = new_live;
        Ok(())
    }

    /// Append a single byte.
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::append`].
    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.append(&[byte])
    }

    /// Append a copy of `[begin, begin + len)` of the buffer itself.
    ///
    /// The source range is resolved against the mapping that exists after growth, so
    /// appending a buffer to itself is safe.
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::splice`].
    pub fn append_within(&mut self, begin: isize, len: usize) -> Result<()> {
        self.check_mutable()?;
        let live = self.live;
        let begin = normalize_index(begin, live)?;
        let len = clamp_len(begin, len, live);
        if len == 0 {
            return Ok(());
        }
        if self.fixed {
            return Err(MmapError::FixedSizeViolation);
        }
        let new_live = live + len;
        if new_live > self.capacity() {
            self.resize(new_live)?;
        }
        let region = self.region.as_mut().ok_or(MmapError::UnmappedAccess)?;
        region.bytes_mut()?.copy_within(begin..begin + len, live);
        self.live = new_live;
        Ok(())
    }

    /// Strip leading and trailing whitespace. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::trim_with`].
    pub fn trim(&mut self) -> Result<bool> {
        self.trim_with(TrimSide::Both, is_space)
    }

    /// Strip bytes matching `pred` from the chosen end(s). Returns whether anything
    /// was removed.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::UnmappedAccess`, `FrozenViolation` or `NoAccess` if the
    /// buffer cannot be mutated, `FixedSizeViolation` if something would be stripped
    /// from a fixed-size buffer.
    pub fn trim_with<F>(&mut self, side: TrimSide, pred: F) -> Result<bool>
    where
        F: Fn(u8) -> bool,
    {
        self.check_mutable()?;
        let bytes = self.as_bytes()?;
        let front = match side {
            TrimSide::Back => 0,
            _ => bytes.iter().take_while(|&&b| pred(b)).count(),
        };
        let back = match side {
            TrimSide::Front => 0,
            _ => bytes[front..].iter().rev().take_while(|&&b| pred(b)).count(),
        };
        if front == 0 && back == 0 {
            return Ok(false);
        }
        if self.fixed {
            return Err(MmapError::FixedSizeViolation);
        }
        let live = self.live;
        self.replace(live - back, back, &[])?;
        self.replace(0, front, &[])?;
        Ok(true)
    }

    /// Reserve `additional` bytes of mapping capacity without touching the live length.
    /// Returns the new capacity.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::UnmappedAccess`, `FrozenViolation` or `NoAccess` if the
    /// buffer cannot be mutated, `InvalidState` for private maps,
    /// `FixedSizeViolation` for fixed-size maps, or the errors of the growth step.
    pub fn extend_by(&mut self, additional: usize) -> Result<usize> {
        self.check_mutable()?;
        if additional == 0 {
            return Ok(self.capacity());
        }
        let target = self
            .capacity()
            .checked_add(additional)
            .ok_or_else(|| MmapError::InvalidArgument("capacity overflow".into()))?;
        self.resize(target)?;
        Ok(self.capacity())
    }

    /// Change the protection of the mapping in place.
    ///
    /// Removing Write from a private map freezes the buffer for good. On a shared map
    /// mutations fail with `NoAccess` until Write is restored.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::UnmappedAccess` if the buffer was unmapped,
    /// `FrozenViolation` when asking a frozen buffer for Write, `ProtectFailed` if
    /// `mprotect` fails.
    pub fn protect(&mut self, protection: Protection) -> Result<()> {
        let region = self.region()?;
        if protection.writable() && self.frozen {
            return Err(MmapError::FrozenViolation);
        }
        region.protect(protection)?;
        self.protection = protection;
        if !protection.writable() && self.sharing == Sharing::Private {
            self.frozen = true;
        }
        Ok(())
    }

    /// [`MappedBuffer::protect`] with a mode string (`"r"`, `"w"`, `"rw"`).
    ///
    /// # Errors
    ///
    /// Returns `MmapError::InvalidArgument` for an unknown mode, otherwise the errors
    /// of [`MappedBuffer::protect`].
    pub fn protect_str(&mut self, mode: &str) -> Result<()> {
        self.protect(mode.parse()?)
    }

    /// Freeze the buffer. Irreversible.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::UnmappedAccess` if the buffer was unmapped.
    pub fn freeze(&mut self) -> Result<()> {
        self.region()?;
        self.frozen = true;
        Ok(())
    }

    /// Release the mapping. Idempotent.
    ///
    /// A shared file-backed buffer whose live length is below its capacity has its
    /// file truncated to the live length. Afterwards the buffer is permanently inert.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::TruncateFailed` if the reconciliation truncate fails. The
    /// mapping is released regardless.
    pub fn unmap(&mut self) -> Result<()> {
        let Some(region) = self.region.take() else {
            return Ok(());
        };
        let capacity = region.len();
        drop(region);
        self.locked = false;
        let path = self.path.take();
        log::debug!("unmapped {capacity} bytes ({:?})", path);
        match path {
            Some(path) if self.sharing == Sharing::Shared && self.live < capacity => {
                crate::grow::truncate_file(&path, self.offset + self.live as u64)
            }
            _ => Ok(()),
        }
    }
}

impl Drop for MappedBuffer {
    fn drop(&mut self) {
        if let Err(e) = self.unmap() {
            log::warn!("failed to reconcile mapped buffer on drop: {e}");
        }
    }
}

/// Two buffers are equal when both are readable and their live bytes match.
impl PartialEq for MappedBuffer {
    fn eq(&self, other: &Self) -> bool {
        match (self.as_bytes(), other.as_bytes()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq<[u8]> for MappedBuffer {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes().is_ok_and(|b| b == other)
    }
}
