//! Flushing dirty pages back to the backing file.

use crate::errors::{MmapError, Result};
use crate::flags::{Sharing, SyncMode};
use crate::mmap::MappedBuffer;
use crate::region::Region;

impl Region {
    /// Flush the whole mapping with `msync`.
    pub(crate) fn sync(&self, mode: SyncMode) -> Result<()> {
        if self.len() == 0 {
            return Ok(());
        }
        let (addr, len) = self.page_span();
        // SAFETY: msync is safe to call with the page span of a live mapping.
        let result = unsafe { libc::msync(addr, len, mode.as_raw()) };
        if result != 0 {
            return Err(MmapError::SyncFailed(std::io::Error::last_os_error()));
        }
        log::trace!("msync({len} bytes, {mode:?})");
        Ok(())
    }
}

impl MappedBuffer {
    /// Flush dirty pages to the backing file.
    ///
    /// `SyncMode::SYNC` blocks until the data is written, `SyncMode::ASYNC` only
    /// schedules it; either may be combined with `invalidate()`. Afterwards, a shared
    /// file-backed buffer whose live length is below its capacity is shrunk so the
    /// file on disk is exactly as long as the live content.
    ///
    /// Syncing is permitted on frozen buffers.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::UnmappedAccess` if the buffer was unmapped.
    /// Returns `MmapError::SyncFailed` if `msync` fails, or the truncate and remap
    /// errors of the shrink step.
    pub fn sync(&mut self, mode: SyncMode) -> Result<()> {
        self.region()?.sync(mode)?;
        if self.len() < self.capacity() && self.sharing() == Sharing::Shared && !self.is_fixed_size() {
            self.resize(self.len())?;
        }
        Ok(())
    }

    /// Blocking sync, the usual durability barrier.
    ///
    /// # Errors
    ///
    /// Same as [`MappedBuffer::sync`].
    pub fn flush(&mut self) -> Result<()> {
        self.sync(SyncMode::SYNC)
    }
}
