//! Compare two TI-83/84 program files (`.8xp`) while ignoring the comment.
//!
//! Rebuilt programs differ in the 42-byte comment field of the file header
//! (offset 11), which usually carries a build stamp. Everything else must match.

use std::fmt;
use std::path::Path;

use crate::error::Result;

pub const COMMENT_START: usize = 11;
pub const COMMENT_LEN: usize = 42;
pub const COMMENT_END: usize = COMMENT_START + COMMENT_LEN;

/// Zero the comment field. Data shorter than the header is returned unchanged.
pub fn mask_comment(data: &[u8]) -> Vec<u8> {
    let mut masked = data.to_vec();
    if masked.len() >= COMMENT_END {
        masked[COMMENT_START..COMMENT_END].fill(0);
    }
    masked
}

/// Result of comparing two masked files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Match,
    Mismatch { offset: usize, left: u8, right: u8 },
    LengthMismatch { left_len: usize, right_len: usize },
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Comparison::Match)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Match => write!(f, "MATCH (comment bytes ignored)"),
            Comparison::Mismatch {
                offset,
                left,
                right,
            } => write!(f, "MISMATCH at offset {}: 0x{:02x} vs 0x{:02x}", offset, left, right),
            Comparison::LengthMismatch { .. } => {
                write!(f, "MISMATCH: file lengths differ after masking comment bytes")
            }
        }
    }
}

/// Compare two byte buffers after masking their comments.
pub fn compare_bytes(a: &[u8], b: &[u8]) -> Comparison {
    let a = mask_comment(a);
    let b = mask_comment(b);

    if let Some(offset) = a.iter().zip(&b).position(|(x, y)| x != y) {
        return Comparison::Mismatch {
            offset,
            left: a[offset],
            right: b[offset],
        };
    }
    if a.len() != b.len() {
        return Comparison::LengthMismatch {
            left_len: a.len(),
            right_len: b.len(),
        };
    }
    Comparison::Match
}

/// Read and compare two files.
pub fn compare_files(a: &Path, b: &Path) -> Result<(Comparison, usize, usize)> {
    let left = std::fs::read(a)?;
    let right = std::fs::read(b)?;
    Ok((compare_bytes(&left, &right), left.len(), right.len()))
}
