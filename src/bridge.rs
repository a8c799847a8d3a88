//! Handing the live bytes to an external byte-string library.
//!
//! The buffer is a splice target, not an algorithm host: case conversion, search,
//! substitution and the like live in a collaborator implementing [`ExternalOp`]. The
//! collaborator sees the live region as a borrowed slice for the duration of one call
//! and answers with an [`Outcome`]. Any replacement it produces is committed through
//! [`MappedBuffer::replace`], which owns the authority to remap.

use thiserror::Error;

use crate::errors::MmapError;
use crate::mmap::MappedBuffer;

/// What an external operation may do to the bytes it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Reads only. Allowed on frozen buffers.
    Inspect,
    /// Rewrites bytes without changing the length. Allowed on fixed-size buffers.
    Modify,
    /// May change the length.
    Resize,
}

/// Change requested by an external operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Leave the buffer as it is.
    Unchanged,
    /// Replace the exposed range with these bytes.
    Replace(Vec<u8>),
}

/// Result of an external operation: a value for the caller plus an edit for the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    /// Returned to the caller of [`MappedBuffer::apply_external`].
    pub value: T,
    /// Applied to the buffer before returning.
    pub edit: Edit,
}

impl<T> Outcome<T> {
    /// Outcome that leaves the buffer untouched.
    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            edit: Edit::Unchanged,
        }
    }

    /// Outcome that replaces the exposed range with `bytes`.
    pub fn replaced(value: T, bytes: Vec<u8>) -> Self {
        Self {
            value,
            edit: Edit::Replace(bytes),
        }
    }
}

/// An operation implemented by an external byte-string library.
///
/// Implementations must not keep the slice beyond the call; the signature makes that
/// impossible for safe code.
pub trait ExternalOp {
    /// Value handed back to the caller.
    type Output;
    /// Failure reported by the collaborator.
    type Error;

    /// What the operation may do; checked against the buffer before it runs.
    fn kind(&self) -> OpKind;

    /// Run over `bytes`, the exposed part of the live region.
    ///
    /// # Errors
    ///
    /// Any error is propagated to the caller unchanged.
    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<Self::Output>, Self::Error>;
}

/// Failure of [`MappedBuffer::apply_external`].
#[derive(Debug, Error)]
pub enum ExternalError<E> {
    /// The buffer rejected the call or the commit.
    #[error(transparent)]
    Buffer(#[from] MmapError),
    /// The collaborator failed; the buffer is untouched.
    #[error("external operation failed: {0}")]
    Collaborator(E),
}

impl MappedBuffer {
    /// Expose `[begin, len())` to `op` and commit the edit it returns.
    ///
    /// `Modify` and `Resize` operations are rejected up front on frozen or read-only
    /// buffers, `Resize` operations also on fixed-size buffers. The live length only
    /// changes when the edit is committed, so a failing collaborator leaves the buffer
    /// exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `ExternalError::Collaborator` with the collaborator's error unchanged,
    /// or `ExternalError::Buffer` for `UnmappedAccess`, `FrozenViolation`, `NoAccess`,
    /// `FixedSizeViolation`, `IndexOutOfRange` and the errors of the growth step.
    pub fn apply_external<O: ExternalOp>(
        &mut self,
        begin: usize,
        mut op: O,
    ) -> Result<O::Output, ExternalError<O::Error>> {
        let kind = op.kind();
        if kind != OpKind::Inspect {
            self.check_mutable()?;
        }
        if kind == OpKind::Resize && self.is_fixed_size() {
            return Err(MmapError::FixedSizeViolation.into());
        }
        let live = self.len();
        if begin > live {
            return Err(MmapError::IndexOutOfRange {
                index: begin as i64,
                len: live,
            }
            .into());
        }

        let outcome = op
            .apply(&self.as_bytes()?[begin..])
            .map_err(ExternalError::Collaborator)?;

        match outcome.edit {
            Edit::Unchanged => {}
            Edit::Replace(bytes) => self.replace(begin, live - begin, &bytes)?,
        }
        Ok(outcome.value)
    }
}
