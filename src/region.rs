//! Raw mapping ownership: establish, protect and release a mapped region.
//!
//! A [`Region`] knows nothing about the logical length of the buffer built on top
//! of it. It owns the memmap2 object, exposes the mapped bytes only as slices
//! borrowed from itself, and wraps the page-level syscalls (`mprotect` here,
//! `madvise`, `mlock` and `msync` in their own modules).

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use memmap2::{Mmap, MmapMut, MmapOptions, MmapRaw};

use crate::errors::{MmapError, Result};
use crate::flags::{AccessMode, Protection, Sharing};
use crate::options::MapOptions;
use crate::utils::{align_down, page_size};

/// The mapping itself. Which memmap2 type holds it depends on sharing and access mode.
pub(crate) enum MapVariant {
    /// Read-only mapping, shared or private.
    Ro(Mmap),
    /// Shared writable mapping of a file.
    Raw(MmapRaw),
    /// Private, copy-on-write mapping of a file.
    Cow(MmapMut),
    /// Anonymous mapping.
    Anon(MmapMut),
}

pub(crate) struct Region {
    map: MapVariant,
    len: usize,
    offset: u64,
}

impl Region {
    /// Open (or skip, for anonymous maps) the backing descriptor, establish the mapping,
    /// apply `advice` if set and close the descriptor again.
    ///
    /// Returns the region; its length is the mapped capacity.
    pub(crate) fn open(path: Option<&Path>, options: &MapOptions) -> Result<Self> {
        let region = match path {
            None => {
                let len = options.length.ok_or_else(|| {
                    MmapError::InvalidArgument("anonymous map requires a length".into())
                })?;
                if options.offset.is_some_and(|o| o > 0) {
                    log::warn!("offset is ignored for anonymous maps");
                }
                let region = Self::map_anon(len)?;
                if options.mode != AccessMode::ReadWrite {
                    region.protect(options.mode.protection())?;
                }
                region
            }
            Some(path) => {
                let file = open_backing(path, options.mode)?;
                let size = file_size(&file, path)?;
                let offset = options.offset.unwrap_or(0);
                let len = match options.length {
                    Some(len) if (len as u64).saturating_add(offset) > size => {
                        return Err(MmapError::InvalidArgument(format!(
                            "invalid value for length ({len}) or offset ({offset}): file is {size} bytes"
                        )));
                    }
                    Some(len) => len,
                    None if offset > size => {
                        return Err(MmapError::InvalidArgument(format!(
                            "offset {offset} beyond end of file ({size} bytes)"
                        )));
                    }
                    None => usize::try_from(size - offset).map_err(|_| {
                        MmapError::InvalidArgument(format!("file too large to map: {size} bytes"))
                    })?,
                };
                Self::map_file(&file, options.mode, options.sharing, offset, len)?
            }
        };
        if let Some(advice) = options.advice {
            region.advise(advice)?;
        }
        Ok(region)
    }

    /// Map `len` bytes of `file` starting at `offset`.
    pub(crate) fn map_file(
        file: &File,
        mode: AccessMode,
        sharing: Sharing,
        offset: u64,
        len: usize,
    ) -> Result<Self> {
        let mut opts = MmapOptions::new();
        opts.offset(offset).len(len);
        // SAFETY: the descriptor is open with the access the mapping needs. Concurrent
        // modification of the file by other processes is part of the shared-mapping
        // contract and never produces out-of-bounds access because every slice is
        // bounded by `len`.
        let map = unsafe {
            match (sharing, mode) {
                (Sharing::Private, AccessMode::Read) => opts.map_copy_read_only(file).map(MapVariant::Ro),
                (Sharing::Private, _) => opts.map_copy(file).map(MapVariant::Cow),
                (_, AccessMode::Read) => opts.map(file).map(MapVariant::Ro),
                (_, _) => opts.map_raw(file).map(MapVariant::Raw),
            }
        }
        .map_err(MmapError::MapFailed)?;
        log::debug!("mapped {len} bytes at offset {offset} ({sharing:?}, {mode:?})");
        let region = Self { map, len, offset };
        if mode == AccessMode::Write {
            region.protect(Protection::WRITE)?;
        }
        Ok(region)
    }

    /// Map `len` bytes of anonymous memory.
    pub(crate) fn map_anon(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(MmapError::InvalidArgument("length must be greater than zero".into()));
        }
        let map = MmapOptions::new()
            .len(len)
            .map_anon()
            .map_err(MmapError::MapFailed)?;
        log::debug!("mapped {len} anonymous bytes");
        Ok(Self {
            map: MapVariant::Anon(map),
            len,
            offset: 0,
        })
    }

    /// Mapped capacity in bytes.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// All mapped bytes. The slice borrows the region, so it cannot outlive a remap.
    pub(crate) fn bytes(&self) -> &[u8] {
        match &self.map {
            MapVariant::Ro(m) => &m[..],
            MapVariant::Cow(m) | MapVariant::Anon(m) => &m[..],
            // SAFETY: `as_ptr` points at `len` mapped bytes that stay valid while `self` lives.
            MapVariant::Raw(m) => unsafe { std::slice::from_raw_parts(m.as_ptr(), m.len()) },
        }
    }

    /// All mapped bytes, mutably.
    pub(crate) fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        match &mut self.map {
            MapVariant::Ro(_) => Err(MmapError::NoAccess("mapping was established read-only")),
            MapVariant::Cow(m) | MapVariant::Anon(m) => Ok(&mut m[..]),
            // SAFETY: the region is borrowed mutably, so no other slice into it exists in
            // this process.
            MapVariant::Raw(m) => Ok(unsafe { std::slice::from_raw_parts_mut(m.as_mut_ptr(), m.len()) }),
        }
    }

    /// Page-aligned start address and length covering the whole mapping, as the
    /// page-level syscalls require. memmap2 maps from the page boundary below `offset`.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn page_span(&self) -> (*mut libc::c_void, usize) {
        let misalign = (self.offset - align_down(self.offset, page_size() as u64)) as usize;
        let base = self.bytes().as_ptr().wrapping_sub(misalign);
        (base as *mut libc::c_void, self.len + misalign)
    }

    /// Change the protection of the whole mapping in place.
    pub(crate) fn protect(&self, prot: Protection) -> Result<()> {
        if self.len == 0 {
            return Ok(());
        }
        let (addr, len) = self.page_span();
        // SAFETY: `addr`/`len` describe exactly the pages of this live mapping.
        let rc = unsafe { libc::mprotect(addr, len, prot.as_raw()) };
        if rc != 0 {
            return Err(MmapError::ProtectFailed(io::Error::last_os_error()));
        }
        log::trace!("mprotect({len} bytes, {prot:?})");
        Ok(())
    }
}

/// Open the backing file with the access `mode` needs. Mapping always requires read
/// access on the descriptor, so it is requested for every mode.
pub(crate) fn open_backing(path: &Path, mode: AccessMode) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(mode.writable())
        .open(path)
        .map_err(|source| MmapError::CannotOpen {
            path: path.to_path_buf(),
            source,
        })
}

/// Current size of the backing file.
pub(crate) fn file_size(file: &File, path: &Path) -> Result<u64> {
    file.metadata()
        .map(|m| m.len())
        .map_err(|source| MmapError::CannotStat {
            path: path.to_path_buf(),
            source,
        })
}
