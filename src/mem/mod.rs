// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endian/memory helpers (C2): byte-swap primitives and bounds-checked
//! block copy between host memory and telegram RAM.
//!
//! Sercos III telegrams are carried little-endian on the wire. Hosts are
//! normalized to that order here so every other component can work in
//! host-native values. The one documented exception (see
//! [`crate::svc`] field docs) is the variable-length-byte attribute
//! (`CSMD_SERC_VAR_BYTE_LEN = 0`): byte arrays carried in SVC info are
//! copied verbatim and must never be byte-swapped.

pub mod cursor;

pub use cursor::{Cursor, CursorMut};

use std::fmt;

/// Errors from bounds-checked buffer access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemError {
    WriteFailed { offset: usize, reason: String },
    ReadFailed { offset: usize, reason: String },
}

impl fmt::Display for MemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemError::WriteFailed { offset, reason } => {
                write!(f, "write failed at offset {offset}: {reason}")
            }
            MemError::ReadFailed { offset, reason } => {
                write!(f, "read failed at offset {offset}: {reason}")
            }
        }
    }
}

impl std::error::Error for MemError {}

pub type MemResult<T> = core::result::Result<T, MemError>;

/// Copy `src` into `dst` at `offset`, bounds-checked.
pub fn block_copy(dst: &mut [u8], offset: usize, src: &[u8]) -> MemResult<()> {
    let end = offset
        .checked_add(src.len())
        .ok_or_else(|| MemError::WriteFailed { offset, reason: "offset overflow".into() })?;
    if end > dst.len() {
        return Err(MemError::WriteFailed { offset, reason: "destination too small".into() });
    }
    dst[offset..end].copy_from_slice(src);
    Ok(())
}
