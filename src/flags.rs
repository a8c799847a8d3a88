//! Symbolic modes for protection, sharing, advice and sync, plus the constant table.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use crate::errors::MmapError;

/// Mode the backing file is opened with, as given to [`MappedBuffer::open`](crate::MappedBuffer::open).
///
/// The descriptor is always opened readable because the OS needs read access to map it;
/// `Write` only narrows the protection of the resulting mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    /// `"r"`: read-only. Buffers opened this way start frozen.
    #[default]
    Read,
    /// `"w"`: write-only mapping.
    Write,
    /// `"rw"` or `"wr"`: read-write mapping.
    ReadWrite,
}

impl AccessMode {
    /// Protection the mapping is established with.
    #[must_use]
    pub fn protection(self) -> Protection {
        match self {
            Self::Read => Protection::READ,
            Self::Write => Protection::WRITE,
            Self::ReadWrite => Protection::READ_WRITE,
        }
    }

    /// Whether the descriptor must be opened for writing.
    #[must_use]
    pub fn writable(self) -> bool {
        !matches!(self, Self::Read)
    }
}

impl FromStr for AccessMode {
    type Err = MmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            "rw" | "wr" => Ok(Self::ReadWrite),
            other => Err(MmapError::InvalidArgument(format!("invalid mode {other:?}"))),
        }
    }
}

/// Memory protection bits of a mapping.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protection {
    bits: u8,
}

impl Protection {
    /// No access at all (`PROT_NONE`).
    pub const NONE: Self = Self { bits: 0 };
    /// `PROT_READ`.
    pub const READ: Self = Self { bits: 0b001 };
    /// `PROT_WRITE`.
    pub const WRITE: Self = Self { bits: 0b010 };
    /// `PROT_EXEC`.
    pub const EXEC: Self = Self { bits: 0b100 };
    /// `PROT_READ | PROT_WRITE`.
    pub const READ_WRITE: Self = Self { bits: 0b011 };

    /// Whether every bit of `other` is set in `self`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.bits & other.bits == other.bits
    }

    /// Whether the live bytes may be read. A write-only mapping is readable on every
    /// MMU the crate targets, so `WRITE` implies read access here.
    #[must_use]
    pub fn readable(self) -> bool {
        self.contains(Self::READ) || self.contains(Self::WRITE)
    }

    /// Whether the live bytes may be written.
    #[must_use]
    pub fn writable(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub(crate) fn as_raw(self) -> libc::c_int {
        let mut prot = libc::PROT_NONE;
        if self.contains(Self::READ) {
            prot |= libc::PROT_READ;
        }
        if self.contains(Self::WRITE) {
            prot |= libc::PROT_WRITE;
        }
        if self.contains(Self::EXEC) {
            prot |= libc::PROT_EXEC;
        }
        prot
    }
}

impl BitOr for Protection {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

impl From<AccessMode> for Protection {
    fn from(mode: AccessMode) -> Self {
        mode.protection()
    }
}

impl FromStr for Protection {
    type Err = MmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<AccessMode>().map(AccessMode::protection)
    }
}

impl fmt::Debug for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bits == 0 {
            return f.write_str("NONE");
        }
        let names = [(Self::READ, "READ"), (Self::WRITE, "WRITE"), (Self::EXEC, "EXEC")];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// How writes through the mapping relate to the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Sharing {
    /// `MAP_SHARED`: writes reach the file and other mappers.
    #[default]
    Shared,
    /// `MAP_PRIVATE`: copy-on-write, never persisted, never resizable.
    Private,
    /// No backing file.
    Anonymous,
}

/// Memory access pattern advice for the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Advice {
    /// Normal access pattern (default).
    Normal,
    /// Random access pattern.
    Random,
    /// Sequential access pattern.
    Sequential,
    /// Will need this range soon.
    WillNeed,
    /// Won't need this range soon. On private and anonymous maps the kernel may
    /// discard the pages, so their contents read back as zeroes.
    DontNeed,
}

impl Advice {
    pub(crate) fn as_raw(self) -> libc::c_int {
        match self {
            Self::Normal => libc::MADV_NORMAL,
            Self::Random => libc::MADV_RANDOM,
            Self::Sequential => libc::MADV_SEQUENTIAL,
            Self::WillNeed => libc::MADV_WILLNEED,
            Self::DontNeed => libc::MADV_DONTNEED,
        }
    }
}

/// Flags for [`MappedBuffer::sync`](crate::MappedBuffer::sync).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncMode {
    asynchronous: bool,
    invalidate: bool,
}

impl SyncMode {
    /// Block until the dirty pages are written (`MS_SYNC`).
    pub const SYNC: Self = Self {
        asynchronous: false,
        invalidate: false,
    };
    /// Schedule the write and return (`MS_ASYNC`).
    pub const ASYNC: Self = Self {
        asynchronous: true,
        invalidate: false,
    };

    /// Additionally invalidate other mappings of the same file (`MS_INVALIDATE`).
    #[must_use]
    pub const fn invalidate(self) -> Self {
        Self {
            invalidate: true,
            ..self
        }
    }

    /// Whether the flush returns before the data is written.
    #[must_use]
    pub fn is_async(self) -> bool {
        self.asynchronous
    }

    pub(crate) fn as_raw(self) -> libc::c_int {
        let mut flags = if self.asynchronous {
            libc::MS_ASYNC
        } else {
            libc::MS_SYNC
        };
        if self.invalidate {
            flags |= libc::MS_INVALIDATE;
        }
        flags
    }
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::SYNC
    }
}

/// Scope of [`lock_all`](crate::lock::lock_all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockAllMode {
    /// Pages currently mapped (`MCL_CURRENT`).
    Current,
    /// Pages mapped in the future (`MCL_FUTURE`).
    Future,
    /// Both.
    CurrentAndFuture,
}

impl LockAllMode {
    pub(crate) fn as_raw(self) -> libc::c_int {
        match self {
            Self::Current => libc::MCL_CURRENT,
            Self::Future => libc::MCL_FUTURE,
            Self::CurrentAndFuture => libc::MCL_CURRENT | libc::MCL_FUTURE,
        }
    }
}

/// Process-wide table of the symbolic OS constants behind the enums above.
pub static CONSTANTS: &[(&str, libc::c_int)] = &[
    ("MS_SYNC", libc::MS_SYNC),
    ("MS_ASYNC", libc::MS_ASYNC),
    ("MS_INVALIDATE", libc::MS_INVALIDATE),
    ("PROT_READ", libc::PROT_READ),
    ("PROT_WRITE", libc::PROT_WRITE),
    ("PROT_EXEC", libc::PROT_EXEC),
    ("PROT_NONE", libc::PROT_NONE),
    ("MAP_SHARED", libc::MAP_SHARED),
    ("MAP_PRIVATE", libc::MAP_PRIVATE),
    ("MAP_ANON", libc::MAP_ANON),
    ("MADV_NORMAL", libc::MADV_NORMAL),
    ("MADV_RANDOM", libc::MADV_RANDOM),
    ("MADV_SEQUENTIAL", libc::MADV_SEQUENTIAL),
    ("MADV_WILLNEED", libc::MADV_WILLNEED),
    ("MADV_DONTNEED", libc::MADV_DONTNEED),
    ("MCL_CURRENT", libc::MCL_CURRENT),
    ("MCL_FUTURE", libc::MCL_FUTURE),
];

/// Look up a constant by its symbolic name.
#[must_use]
pub fn constant(name: &str) -> Option<libc::c_int> {
    CONSTANTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_strings_parse() {
        assert_eq!("r".parse::<AccessMode>().expect("r"), AccessMode::Read);
        assert_eq!("w".parse::<AccessMode>().expect("w"), AccessMode::Write);
        assert_eq!("rw".parse::<AccessMode>().expect("rw"), AccessMode::ReadWrite);
        assert_eq!("wr".parse::<AccessMode>().expect("wr"), AccessMode::ReadWrite);
        assert!(matches!(
            "a".parse::<AccessMode>(),
            Err(MmapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn protection_bits_map_to_libc() {
        assert_eq!(Protection::NONE.as_raw(), libc::PROT_NONE);
        assert_eq!(
            Protection::READ_WRITE.as_raw(),
            libc::PROT_READ | libc::PROT_WRITE
        );
        let rx = Protection::READ | Protection::EXEC;
        assert!(rx.readable());
        assert!(!rx.writable());
        assert_eq!(format!("{rx:?}"), "READ | EXEC");
        assert!(Protection::WRITE.readable());
        assert!(!Protection::NONE.readable());
    }

    #[test]
    fn sync_mode_flags() {
        assert_eq!(SyncMode::default().as_raw(), libc::MS_SYNC);
        assert_eq!(
            SyncMode::ASYNC.invalidate().as_raw(),
            libc::MS_ASYNC | libc::MS_INVALIDATE
        );
        assert!(SyncMode::ASYNC.is_async());
    }

    #[test]
    fn constant_table_lookup() {
        assert_eq!(constant("MAP_PRIVATE"), Some(libc::MAP_PRIVATE));
        assert_eq!(constant("MADV_WILLNEED"), Some(libc::MADV_WILLNEED));
        assert_eq!(constant("NOPE"), None);
    }
}
