//! # mmap-splice: resizable, splice-able byte buffers backed by memory maps
//!
//! A [`MappedBuffer`] is a byte string whose storage is a memory mapping of a file (or
//! of anonymous memory). It can be edited in place like a growable string: bytes can
//! be replaced, inserted, removed and appended, and the mapping and its backing file
//! grow as needed. Writes to a shared file mapping reach the file.
//!
//! ## Features
//!
//! - **Splicing**: replace any range with bytes of any length
//! - **Automatic growth**: the file is extended and remapped when content outgrows it
//! - **Page control**: protection, access advice, page locking and explicit sync
//! - **Delegation**: hand the live bytes to an external byte-string library through
//!   [`ExternalOp`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use mmap_splice::MappedBuffer;
//!
//! let mut buf = MappedBuffer::open_file("data.txt", "rw")?;
//! buf.replace(0, 5, b"HELLO")?;
//! buf.append(b" and more")?;
//! buf.flush()?;
//! # Ok::<(), mmap_splice::MmapError>(())
//! ```
//!
//! ## Modules
//!
//! - [`errors`]: Error types for all buffer operations
//! - [`flags`]: Access modes, protection, sharing, advice and sync flags
//! - [`mmap`]: Core `MappedBuffer` implementation
//! - [`bridge`]: The external operation protocol
//! - [`manager`]: High-level convenience functions
//!
//! ## Feature Flags
//!
//! - `iterator`: Borrowed chunk, page and line iterators
//! - `text`: Reference byte-string operations built on `regex`

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(missing_docs)]

cfg_if::cfg_if! {
    if #[cfg(not(unix))] {
        compile_error!("mmap-splice requires a Unix platform");
    }
}

pub mod errors;
pub mod flags;
pub mod utils;
pub mod mmap;
pub mod options;
pub mod bridge;
pub mod manager;

mod region;
mod advise;
mod flush;
mod grow;
mod lock;

#[cfg(feature = "iterator")]
pub mod iterator;

#[cfg(feature = "text")]
pub mod text;

pub use bridge::{Edit, ExternalError, ExternalOp, OpKind, Outcome};
pub use errors::{MmapError, Result};
pub use flags::{AccessMode, Advice, LockAllMode, Protection, Sharing, SyncMode};
pub use lock::{lock_all, unlock_all};
pub use manager::{map_anonymous, map_file, map_private, map_range, write_to};
pub use mmap::{BufferState, MappedBuffer, TrimSide};
pub use options::MapOptions;
