//! Crate-specific error types for mmap-splice.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for mmap-splice operations.
pub type Result<T> = std::result::Result<T, MmapError>;

/// Error type covering argument validation, buffer state violations and OS-call failures.
///
/// Validation errors (`InvalidArgument`, `UnmappedAccess`, `FrozenViolation`,
/// `FixedSizeViolation`, `IndexOutOfRange`, `NoAccess`, `InvalidState`) are always
/// detected before any system call is made. The remaining variants wrap the
/// `io::Error` produced by the failing call.
#[derive(Debug, Error)]
pub enum MmapError {
    /// Bad mode string, zero length, or offset/length outside the file.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The buffer has been unmapped and is permanently inert.
    #[error("unmapped buffer")]
    UnmappedAccess,

    /// Mutation attempted on a frozen buffer.
    #[error("can't modify frozen buffer")]
    FrozenViolation,

    /// Attempt to change the length of a fixed-size buffer.
    #[error("can't change the length of a fixed-size buffer")]
    FixedSizeViolation,

    /// Index outside the live region.
    #[error("index {index} out of range for buffer of length {len}")]
    IndexOutOfRange {
        /// Requested index, as given by the caller.
        index: i64,
        /// Live length at the time of the call.
        len: usize,
    },

    /// The current protection of the mapping does not allow this access.
    #[error("access denied by mapping protection: {0}")]
    NoAccess(&'static str),

    /// The operation is not possible for this kind of mapping.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The backing file could not be opened.
    #[error("can't open {}: {source}", .path.display())]
    CannotOpen {
        /// Backing file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The size of the backing file could not be determined.
    #[error("can't stat {}: {source}", .path.display())]
    CannotStat {
        /// Backing file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The mapping call failed.
    #[error("mmap failed: {0}")]
    MapFailed(#[source] io::Error),

    /// Releasing the mapping failed.
    ///
    /// Reserved for a backend that reports `munmap` errors. Mappings are currently
    /// released by the memmap2 destructor, which swallows them, so nothing in this
    /// crate constructs this variant today.
    #[error("munmap failed: {0}")]
    UnmapFailed(#[source] io::Error),

    /// Growing the backing file failed.
    #[error("can't extend {}: {source}", .path.display())]
    ExtendFailed {
        /// Backing file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Shrinking the backing file failed.
    #[error("can't truncate {}: {source}", .path.display())]
    TruncateFailed {
        /// Backing file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// `mprotect` failed.
    #[error("mprotect failed: {0}")]
    ProtectFailed(#[source] io::Error),

    /// `madvise` failed.
    #[error("madvise failed: {0}")]
    AdviseFailed(#[source] io::Error),

    /// `mlock`/`munlock` (or their process-wide forms) failed.
    #[error("memory lock failed: {0}. This operation typically requires elevated privileges.")]
    LockFailed(#[source] io::Error),

    /// `msync` failed.
    #[error("msync failed: {0}")]
    SyncFailed(#[source] io::Error),
}

impl MmapError {
    /// The OS error code behind an OS-call failure, if any.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::CannotOpen { source, .. }
            | Self::CannotStat { source, .. }
            | Self::ExtendFailed { source, .. }
            | Self::TruncateFailed { source, .. }
            | Self::MapFailed(source)
            | Self::UnmapFailed(source)
            | Self::ProtectFailed(source)
            | Self::AdviseFailed(source)
            | Self::LockFailed(source)
            | Self::SyncFailed(source) => source.raw_os_error(),
            _ => None,
        }
    }

    /// Whether this error was raised by validation rather than by a system call.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::UnmappedAccess
                | Self::FrozenViolation
                | Self::FixedSizeViolation
                | Self::IndexOutOfRange { .. }
                | Self::NoAccess(_)
                | Self::InvalidState(_)
        )
    }
}
