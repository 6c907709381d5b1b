//! Utility functions.

use anyhow::Result;

use crate::error::ConvertError;

/// Page granularity of the target runtime's memory mapping.
pub const PAGE_SIZE: u64 = 0x1000;

/// Aligns an address or size up to the next multiple of `align`.
/// `align` must be a power of two.
pub fn align_up(addr: u64, align: u64) -> u64 {
    assert!(align.is_power_of_two());
    (addr + align - 1) & !(align - 1)
}

/// Extends `bytes` with zeros up to the next page multiple.
/// Idempotent on already-aligned input.
pub fn page_pad(bytes: &[u8]) -> Vec<u8> {
    let padded_len = align_up(bytes.len() as u64, PAGE_SIZE) as usize;
    let mut out = bytes.to_vec();
    out.resize(padded_len, 0);
    out
}

/// Narrow a computed offset or size into a 32-bit container header field.
pub fn u32_field(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        ConvertError::MalformedInput(format!(
            "{what} {value:#x} does not fit a 32-bit container field"
        ))
        .into()
    })
}
