//! Utility helpers for page alignment, index normalisation and byte classes.

use crate::errors::{MmapError, Result};

/// Get the system page size in bytes.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn page_size() -> usize {
    // SAFETY: sysconf with _SC_PAGESIZE is safe to call.
    unsafe {
        let page_size = libc::sysconf(libc::_SC_PAGESIZE);
        page_size.max(0) as usize
    }
}

/// Align a value down to the nearest multiple of `alignment`.
#[must_use]
pub fn align_down(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    if alignment.is_power_of_two() {
        value & !(alignment - 1)
    } else {
        value - value % alignment
    }
}

/// Normalise a possibly negative index against `len`.
///
/// Negative indices count from the end (`-1` is the last byte). The result lies in
/// `[0, len]`; anything outside that range is an `IndexOutOfRange` error.
///
/// # Errors
///
/// Returns `MmapError::IndexOutOfRange` if the normalised index falls outside `[0, len]`.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn normalize_index(index: isize, len: usize) -> Result<usize> {
    let resolved = if index < 0 {
        index.checked_add(len as isize)
    } else {
        Some(index)
    };
    match resolved {
        Some(i) if i >= 0 && (i as usize) <= len => Ok(i as usize),
        _ => Err(MmapError::IndexOutOfRange {
            index: index as i64,
            len,
        }),
    }
}

/// Clamp `[begin, begin + len)` so that it ends at or before `total`.
#[must_use]
pub fn clamp_len(begin: usize, len: usize, total: usize) -> usize {
    len.min(total.saturating_sub(begin))
}

/// The C locale `isspace` class: space, `\t`, `\n`, `\v`, `\f`, `\r`.
#[must_use]
pub fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}
