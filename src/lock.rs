//! Memory locking operations to prevent pages from being swapped out.

use crate::errors::{MmapError, Result};
use crate::flags::LockAllMode;
use crate::mmap::MappedBuffer;
use crate::region::Region;

impl Region {
    /// Pin every page of the mapping with `mlock`.
    pub(crate) fn lock(&self) -> Result<()> {
        if self.len() == 0 {
            return Ok(());
        }
        let (addr, len) = self.page_span();
        // SAFETY: mlock is safe to call with the page span of a live mapping.
        let result = unsafe { libc::mlock(addr as *const libc::c_void, len) };
        if result != 0 {
            return Err(MmapError::LockFailed(std::io::Error::last_os_error()));
        }
        log::trace!("mlock({len} bytes)");
        Ok(())
    }

    /// Release the pages pinned by [`Region::lock`].
    pub(crate) fn unlock(&self) -> Result<()> {
        if self.len() == 0 {
            return Ok(());
        }
        let (addr, len) = self.page_span();
        // SAFETY: munlock is safe to call with the page span of a live mapping.
        let result = unsafe { libc::munlock(addr as *const libc::c_void, len) };
        if result != 0 {
            return Err(MmapError::LockFailed(std::io::Error::last_os_error()));
        }
        log::trace!("munlock({len} bytes)");
        Ok(())
    }
}

impl MappedBuffer {
    /// Lock the pages of the buffer in memory so they are never swapped out.
    ///
    /// Locking an already locked buffer is a no-op. The lock is reapplied after every
    /// remap. Locked pages count against `RLIMIT_MEMLOCK`.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::UnmappedAccess` if the buffer was unmapped.
    /// Returns `MmapError::LockFailed` if `mlock` fails (often due to limits or permissions).
    pub fn lock(&mut self) -> Result<()> {
        let region = self.region()?;
        if self.locked {
            return Ok(());
        }
        region.lock()?;
        self.locked = true;
        Ok(())
    }

    /// Unlock previously locked pages. Unlocking an unlocked buffer is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::UnmappedAccess` if the buffer was unmapped.
    /// Returns `MmapError::LockFailed` if `munlock` fails.
    pub fn unlock(&mut self) -> Result<()> {
        let region = self.region()?;
        if !self.locked {
            return Ok(());
        }
        region.unlock()?;
        self.locked = false;
        Ok(())
    }
}

/// Disable paging for the whole address space of the process (`mlockall`).
///
/// # Errors
///
/// Returns `MmapError::LockFailed` if the system call fails.
pub fn lock_all(mode: LockAllMode) -> Result<()> {
    // SAFETY: mlockall only takes flags.
    if unsafe { libc::mlockall(mode.as_raw()) } != 0 {
        return Err(MmapError::LockFailed(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Re-enable paging for the whole process (`munlockall`).
///
/// # Errors
///
/// Returns `MmapError::LockFailed` if the system call fails.
pub fn unlock_all() -> Result<()> {
    // SAFETY: munlockall takes no arguments.
    if unsafe { libc::munlockall() } != 0 {
        return Err(MmapError::LockFailed(std::io::Error::last_os_error()));
    }
    Ok(())
}
