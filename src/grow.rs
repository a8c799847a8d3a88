//! Growing and shrinking the backing store, then remapping at the new length.

use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::errors::{MmapError, Result};
use crate::flags::Sharing;
use crate::mmap::MappedBuffer;
use crate::region::{file_size, open_backing, Region};

impl MappedBuffer {
    /// Resize the mapping (and, for file-backed buffers, the file) to `new_len` bytes.
    ///
    /// File-backed buffers are unmapped, the file is extended or truncated, and the
    /// region is mapped again with the same mode, sharing and offset. Any failure
    /// after the old mapping is gone leaves the buffer unmapped. Anonymous buffers map
    /// the new region first and copy the live bytes across, so a failed anonymous
    /// remap leaves the old mapping in place.
    ///
    /// Protection, advice and page lock are reapplied to the new mapping.
    pub(crate) fn resize(&mut self, new_len: usize) -> Result<()> {
        let current = self.region()?.len();
        if self.sharing == Sharing::Private {
            return Err(MmapError::InvalidState("can't resize a private map"));
        }
        if self.fixed {
            return Err(MmapError::FixedSizeViolation);
        }
        log::debug!("resizing mapping from {current} to {new_len} bytes");

        if self.sharing == Sharing::Anonymous {
            let mut region = Region::map_anon(new_len)?;
            let keep = self.live.min(new_len);
            region.bytes_mut()?[..keep].copy_from_slice(&self.region()?.bytes()[..keep]);
            self.region = Some(region);
            self.live = keep;
            return self.restore_attributes();
        }

        let path = self.path.clone().ok_or(MmapError::UnmappedAccess)?;
        self.region = None;
        match self.remap_file(&path, current, new_len) {
            Ok(region) => {
                self.region = Some(region);
                self.live = self.live.min(new_len);
                self.restore_attributes()
            }
            Err(e) => {
                log::warn!("remapping {} failed, buffer is now unmapped: {e}", path.display());
                self.path = None;
                self.locked = false;
                Err(e)
            }
        }
    }

    fn remap_file(&self, path: &Path, current: usize, new_len: usize) -> Result<Region> {
        let mut file = open_backing(path, self.mode)?;
        let target = self.offset + new_len as u64;
        if new_len > current {
            // Writing the last byte grows the file sparsely.
            if file_size(&file, path)? < target {
                file.seek(SeekFrom::Start(target - 1))
                    .and_then(|_| file.write_all(&[0]))
                    .map_err(|source| MmapError::ExtendFailed {
                        path: path.to_path_buf(),
                        source,
                    })?;
                log::debug!("extended {} to {target} bytes", path.display());
            }
        } else if new_len < current {
            file.set_len(target)
                .map_err(|source| MmapError::TruncateFailed {
                    path: path.to_path_buf(),
                    source,
                })?;
            log::debug!("truncated {} to {target} bytes", path.display());
        }
        Region::map_file(&file, self.mode, self.sharing, self.offset, new_len)
    }

    fn restore_attributes(&mut self) -> Result<()> {
        let region = self.region()?;
        region.protect(self.protection)?;
        if let Some(advice) = self.advice {
            region.advise(advice)?;
        }
        if self.locked {
            if let Err(e) = region.lock() {
                self.locked = false;
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Truncate the file at `path` to `len` bytes.
pub(crate) fn truncate_file(path: &Path, len: u64) -> Result<()> {
    std::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|file| file.set_len(len))
        .map_err(|source| MmapError::TruncateFailed {
            path: path.to_path_buf(),
            source,
        })?;
    log::debug!("truncated {} to {len} bytes", path.display());
    Ok(())
}
