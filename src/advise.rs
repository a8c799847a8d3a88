//! Memory advise operations for optimizing OS behavior.

use crate::errors::{MmapError, Result};
use crate::flags::Advice;
use crate::mmap::MappedBuffer;
use crate::region::Region;

impl Region {
    /// Apply `advice` to the whole mapping with `madvise`.
    pub(crate) fn advise(&self, advice: Advice) -> Result<()> {
        if self.len() == 0 {
            return Ok(());
        }
        let (addr, len) = self.page_span();
        // SAFETY: madvise is safe to call with the page span of a live mapping.
        let result = unsafe { libc::madvise(addr, len, advice.as_raw()) };
        if result != 0 {
            return Err(MmapError::AdviseFailed(std::io::Error::last_os_error()));
        }
        log::trace!("madvise({len} bytes, {advice:?})");
        Ok(())
    }
}

impl MappedBuffer {
    /// Advise the OS about the expected access pattern of the mapping.
    ///
    /// The advice is a hint and may be ignored by the OS. It is remembered and
    /// reapplied every time the buffer is remapped.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::UnmappedAccess` if the buffer was unmapped.
    /// Returns `MmapError::AdviseFailed` if the system call fails.
    pub fn advise(&mut self, advice: Advice) -> Result<()> {
        self.region()?.advise(advice)?;
        self.advice = Some(advice);
        Ok(())
    }
}
