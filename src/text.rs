//! Byte-string operations that run against a buffer through [`ExternalOp`].
//!
//! These are ordinary collaborators: none of them touches the mapping directly.
//! Each is handed the live bytes, computes a result and, where it edits, returns the
//! new bytes for the buffer to splice in. Modifying operations return `true` when the
//! content changed.
//!
//! ```no_run
//! use mmap_splice::text::{Gsub, Upcase};
//! use mmap_splice::MappedBuffer;
//!
//! let mut buf = MappedBuffer::open_file("notes.txt", "rw")?;
//! buf.apply_external(0, Upcase)?;
//! let changed = buf.apply_external(0, Gsub::new(r"\s+", " ")?)?;
//! # let _ = changed;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::convert::Infallible;

use regex::bytes::Regex;

use crate::bridge::{ExternalOp, OpKind, Outcome};

fn rewrite(bytes: &[u8], new: Vec<u8>) -> Outcome<bool> {
    if new == bytes {
        Outcome::unchanged(false)
    } else {
        Outcome::replaced(true, new)
    }
}

macro_rules! map_bytes_op {
    ($(#[$doc:meta])* $name:ident, $f:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl ExternalOp for $name {
            type Output = bool;
            type Error = Infallible;

            fn kind(&self) -> OpKind {
                OpKind::Modify
            }

            fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<bool>, Infallible> {
                let f: fn(&[u8]) -> Vec<u8> = $f;
                Ok(rewrite(bytes, f(bytes)))
            }
        }
    };
}

map_bytes_op!(
    /// ASCII upper-case.
    Upcase,
    |b: &[u8]| b.to_ascii_uppercase()
);

map_bytes_op!(
    /// ASCII lower-case.
    Downcase,
    |b: &[u8]| b.to_ascii_lowercase()
);

map_bytes_op!(
    /// First byte upper-case, the rest lower-case.
    Capitalize,
    |b: &[u8]| {
        let mut out = b.to_ascii_lowercase();
        if let Some(first) = out.first_mut() {
            first.make_ascii_uppercase();
        }
        out
    }
);

map_bytes_op!(
    /// Swap the case of ASCII letters.
    Swapcase,
    |b: &[u8]| {
        b.iter()
            .map(|&c| match c {
                b'a'..=b'z' => c.to_ascii_uppercase(),
                b'A'..=b'Z' => c.to_ascii_lowercase(),
                _ => c,
            })
            .collect()
    }
);

map_bytes_op!(
    /// Reverse the byte order.
    Reverse,
    |b: &[u8]| b.iter().rev().copied().collect()
);

/// Remove the last byte, or a trailing `\r\n` pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chop;

impl ExternalOp for Chop {
    type Output = bool;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Resize
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<bool>, Infallible> {
        let cut = if bytes.ends_with(b"\r\n") { 2 } else { 1 };
        let keep = bytes.len().saturating_sub(cut);
        Ok(rewrite(bytes, bytes[..keep].to_vec()))
    }
}

/// Remove a trailing record separator.
///
/// Without a separator, one trailing `\n`, `\r\n` or `\r` is removed. An empty
/// separator removes every trailing newline. Any other separator is removed once if
/// the bytes end with it.
#[derive(Debug, Clone, Default)]
pub struct Chomp {
    separator: Option<Vec<u8>>,
}

impl Chomp {
    /// Chomp with the default line terminators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chomp a specific separator.
    pub fn with_separator(separator: impl Into<Vec<u8>>) -> Self {
        Self {
            separator: Some(separator.into()),
        }
    }

    fn keep(&self, bytes: &[u8]) -> usize {
        match self.separator.as_deref() {
            None => {
                if bytes.ends_with(b"\r\n") {
                    bytes.len() - 2
                } else if bytes.ends_with(b"\n") || bytes.ends_with(b"\r") {
                    bytes.len() - 1
                } else {
                    bytes.len()
                }
            }
            Some([]) => {
                let mut end = bytes.len();
                while end > 0 && bytes[end - 1] == b'\n' {
                    end -= 1;
                    if end > 0 && bytes[end - 1] == b'\r' {
                        end -= 1;
                    }
                }
                end
            }
            Some(sep) if bytes.ends_with(sep) => bytes.len() - sep.len(),
            Some(_) => bytes.len(),
        }
    }
}

impl ExternalOp for Chomp {
    type Output = bool;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Resize
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<bool>, Infallible> {
        Ok(rewrite(bytes, bytes[..self.keep(bytes)].to_vec()))
    }
}

/// Collapse runs of the same byte into one, optionally only for bytes in a set.
#[derive(Debug, Clone, Default)]
pub struct Squeeze {
    set: Option<Vec<u8>>,
}

impl Squeeze {
    /// Squeeze every repeated byte.
    pub fn new() -> Self {
        Self::default()
    }

    /// Squeeze only bytes contained in `set`.
    pub fn only(set: impl Into<Vec<u8>>) -> Self {
        Self {
            set: Some(set.into()),
        }
    }
}

impl ExternalOp for Squeeze {
    type Output = bool;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Resize
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<bool>, Infallible> {
        let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
        for &b in bytes {
            let squeezable = self.set.as_ref().map_or(true, |s| s.contains(&b));
            if squeezable && out.last() == Some(&b) {
                continue;
            }
            out.push(b);
        }
        Ok(rewrite(bytes, out))
    }
}

/// Remove every byte contained in a set.
#[derive(Debug, Clone)]
pub struct Delete {
    set: Vec<u8>,
}

impl Delete {
    /// Delete the bytes in `set`.
    pub fn new(set: impl Into<Vec<u8>>) -> Self {
        Self { set: set.into() }
    }
}

impl ExternalOp for Delete {
    type Output = bool;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Resize
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<bool>, Infallible> {
        let out = bytes.iter().copied().filter(|b| !self.set.contains(b)).collect();
        Ok(rewrite(bytes, out))
    }
}

/// Expand a character-set spec: `a-z` ranges, a leading `^` negates (when more
/// bytes follow), and `\` escapes the next byte. A reversed range expands to nothing.
fn expand_set(spec: &[u8]) -> (bool, Vec<u8>) {
    let (negated, spec) = match spec {
        [b'^', rest @ ..] if !rest.is_empty() => (true, rest),
        _ => (false, spec),
    };
    let mut out = Vec::new();
    let mut i = 0;
    while i < spec.len() {
        if spec[i] == b'\\' && i + 1 < spec.len() {
            out.push(spec[i + 1]);
            i += 2;
        } else if i + 2 < spec.len() && spec[i + 1] == b'-' {
            out.extend(spec[i]..=spec[i + 2]);
            i += 3;
        } else {
            out.push(spec[i]);
            i += 1;
        }
    }
    (negated, out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mapping {
    Keep,
    To(u8),
    Drop,
}

/// Byte translation table shared by [`Tr`] and [`TrS`].
#[derive(Debug, Clone)]
struct Translation {
    table: Vec<Mapping>,
    deletes: bool,
}

impl Translation {
    fn new(from: &[u8], to: &[u8]) -> Self {
        let (negated, from) = expand_set(from);
        let (_, to) = expand_set(to);
        let target = |i: usize| match to.get(i).or(to.last()) {
            Some(&c) => Mapping::To(c),
            None => Mapping::Drop,
        };
        let mut table = vec![Mapping::Keep; 256];
        if negated {
            let last = target(usize::MAX);
            for (b, slot) in table.iter_mut().enumerate() {
                if !from.iter().any(|&f| usize::from(f) == b) {
                    *slot = last;
                }
            }
        } else {
            for (i, &f) in from.iter().enumerate() {
                table[usize::from(f)] = target(i);
            }
        }
        Self {
            table,
            deletes: to.is_empty(),
        }
    }

    fn get(&self, b: u8) -> Mapping {
        self.table[usize::from(b)]
    }
}

/// Translate bytes from one set to another.
///
/// Sets accept `a-z` ranges and a leading `^` for negation. A `to` set shorter than
/// `from` is padded with its last byte; an empty `to` deletes the matched bytes.
#[derive(Debug, Clone)]
pub struct Tr {
    translation: Translation,
}

impl Tr {
    /// Translate bytes in `from` to the corresponding bytes in `to`.
    pub fn new(from: impl AsRef<[u8]>, to: impl AsRef<[u8]>) -> Self {
        Self {
            translation: Translation::new(from.as_ref(), to.as_ref()),
        }
    }
}

impl ExternalOp for Tr {
    type Output = bool;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        if self.translation.deletes {
            OpKind::Resize
        } else {
            OpKind::Modify
        }
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<bool>, Infallible> {
        let out = bytes
            .iter()
            .filter_map(|&b| match self.translation.get(b) {
                Mapping::Keep => Some(b),
                Mapping::To(c) => Some(c),
                Mapping::Drop => None,
            })
            .collect();
        Ok(rewrite(bytes, out))
    }
}

/// [`Tr`], then collapse each run of translated bytes that map to the same byte.
#[derive(Debug, Clone)]
pub struct TrS {
    translation: Translation,
}

impl TrS {
    /// Translate bytes in `from` to `to`, squeezing the translated runs.
    pub fn new(from: impl AsRef<[u8]>, to: impl AsRef<[u8]>) -> Self {
        Self {
            translation: Translation::new(from.as_ref(), to.as_ref()),
        }
    }
}

impl ExternalOp for TrS {
    type Output = bool;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Resize
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<bool>, Infallible> {
        let mut out = Vec::with_capacity(bytes.len());
        let mut last = None;
        for &b in bytes {
            match self.translation.get(b) {
                Mapping::Keep => {
                    out.push(b);
                    last = None;
                }
                Mapping::To(c) if last == Some(c) => {}
                Mapping::To(c) => {
                    out.push(c);
                    last = Some(c);
                }
                Mapping::Drop => {}
            }
        }
        Ok(rewrite(bytes, out))
    }
}

/// Replace the first match of a pattern. `$1`-style group references are expanded.
#[derive(Debug, Clone)]
pub struct Sub {
    pattern: Regex,
    replacement: Vec<u8>,
}

impl Sub {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error.
    pub fn new(pattern: &str, replacement: impl Into<Vec<u8>>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }
}

impl ExternalOp for Sub {
    type Output = bool;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Resize
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<bool>, Infallible> {
        let out = self.pattern.replace(bytes, self.replacement.as_slice());
        Ok(rewrite(bytes, out.into_owned()))
    }
}

/// Replace every match of a pattern. `$1`-style group references are expanded.
#[derive(Debug, Clone)]
pub struct Gsub {
    pattern: Regex,
    replacement: Vec<u8>,
}

impl Gsub {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error.
    pub fn new(pattern: &str, replacement: impl Into<Vec<u8>>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }
}

impl ExternalOp for Gsub {
    type Output = bool;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Resize
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<bool>, Infallible> {
        let out = self.pattern.replace_all(bytes, self.replacement.as_slice());
        Ok(rewrite(bytes, out.into_owned()))
    }
}

/// Position of the first match of a pattern, relative to where the bytes begin.
#[derive(Debug, Clone)]
pub struct Find {
    pattern: Regex,
}

impl Find {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl ExternalOp for Find {
    type Output = Option<usize>;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Inspect
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<Option<usize>>, Infallible> {
        Ok(Outcome::unchanged(self.pattern.find(bytes).map(|m| m.start())))
    }
}

/// Start of the last non-overlapping match of a pattern.
#[derive(Debug, Clone)]
pub struct Rfind {
    pattern: Regex,
}

impl Rfind {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl ExternalOp for Rfind {
    type Output = Option<usize>;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Inspect
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<Option<usize>>, Infallible> {
        Ok(Outcome::unchanged(
            self.pattern.find_iter(bytes).last().map(|m| m.start()),
        ))
    }
}

/// Every non-overlapping match of a pattern, copied out.
#[derive(Debug, Clone)]
pub struct Scan {
    pattern: Regex,
}

impl Scan {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl ExternalOp for Scan {
    type Output = Vec<Vec<u8>>;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Inspect
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<Vec<Vec<u8>>>, Infallible> {
        Ok(Outcome::unchanged(
            self.pattern
                .find_iter(bytes)
                .map(|m| m.as_bytes().to_vec())
                .collect(),
        ))
    }
}

/// Split on a pattern into owned pieces. Trailing empty pieces are dropped.
#[derive(Debug, Clone)]
pub struct Split {
    pattern: Regex,
}

impl Split {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl ExternalOp for Split {
    type Output = Vec<Vec<u8>>;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Inspect
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<Vec<Vec<u8>>>, Infallible> {
        let mut pieces: Vec<Vec<u8>> = self.pattern.split(bytes).map(<[u8]>::to_vec).collect();
        while pieces.last().is_some_and(Vec::is_empty) {
            pieces.pop();
        }
        Ok(Outcome::unchanged(pieces))
    }
}

/// Sum of all bytes modulo `2^bits`. `bits` of 0 or 64 and above keeps the full sum.
#[derive(Debug, Clone, Copy)]
pub struct Checksum {
    bits: u32,
}

impl Checksum {
    /// Checksum truncated to `bits` bits.
    pub fn new(bits: u32) -> Self {
        Self { bits }
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self { bits: 16 }
    }
}

impl ExternalOp for Checksum {
    type Output = u64;
    type Error = Infallible;

    fn kind(&self) -> OpKind {
        OpKind::Inspect
    }

    fn apply(&mut self, bytes: &[u8]) -> Result<Outcome<u64>, Infallible> {
        let sum = bytes
            .iter()
            .fold(0u64, |acc, &b| acc.wrapping_add(u64::from(b)));
        let sum = match self.bits {
            1..=63 => sum & ((1u64 << self.bits) - 1),
            _ => sum,
        };
        Ok(Outcome::unchanged(sum))
    }
}
