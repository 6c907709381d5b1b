//! NRO container assembler.
//!
//! Output layout (all fields little-endian u32):
//! - 0x00..0x10: first 16 bytes of the padded code segment, copied verbatim.
//!   They hold the entry branch instruction and the MOD0 pointer the runtime
//!   reads before the header; the transcoder must not touch them.
//! - 0x10: magic `NRO0`, reserved word, total payload size, reserved word.
//! - 0x20: (offset, size) pairs for code, rodata, data, then a pair for bss
//!   whose offset field carries the page-rounded bss memory size and whose
//!   size field is always 0.
//! - 0x40: 0x40 reserved bytes.
//! - 0x80: code[0x80..], rodata, data (the first 0x80 bytes of code are the
//!   pre-header region and header, not duplicated).
//! - optionally an ASET metadata block, appended with no alignment padding.
//!
//! The whole file is built in memory and handed back as one buffer, so a
//! failed validation never leaves a partial file behind.

use anyhow::Result;

use crate::aset::{self, Metadata};
use crate::error::malformed;
use crate::segments::{expect_contiguous, LoadImage};
use crate::utils::{align_up, page_pad, u32_field, PAGE_SIZE};

const MAGIC: &[u8; 4] = b"NRO0";
const HEADER_SIZE: usize = 0x80;

/// Build a complete NRO image from a validated [`LoadImage`].
pub fn build(image: &LoadImage, metadata: Option<&Metadata>) -> Result<Vec<u8>> {
    let code = page_pad(&image.code.data);
    let rodata = page_pad(&image.rodata.data);
    let data = page_pad(&image.data.data);

    if code.len() < HEADER_SIZE {
        malformed!(
            "code segment is {:#x} bytes, too small to carry the {:#x}-byte NRO pre-header",
            code.len(),
            HEADER_SIZE
        );
    }

    let total = code.len() + rodata.len() + data.len();
    let mut out = Vec::with_capacity(total + 0x80);

    out.extend_from_slice(&code[..0x10]);

    out.extend_from_slice(MAGIC);
    put_u32(&mut out, 0);
    put_u32(&mut out, u32_field(total as u64, "total payload size")?);
    put_u32(&mut out, 0);

    // Each segment's declared vaddr must equal the running payload offset;
    // this proves the input's addresses are contiguous and zero-based.
    let mut dot = 0u64;
    for (role, vaddr, len) in [
        ("code", image.code.vaddr, code.len() as u64),
        ("rodata", image.rodata.vaddr, rodata.len() as u64),
        ("data", image.data.vaddr, data.len() as u64),
    ] {
        expect_contiguous(role, vaddr, dot)?;
        put_u32(&mut out, u32_field(dot, "segment offset")?);
        put_u32(&mut out, u32_field(len, "segment size")?);
        dot += len;
    }

    expect_contiguous("bss", image.bss.vaddr, dot)?;
    put_u32(
        &mut out,
        u32_field(align_up(image.bss.mem_size, PAGE_SIZE), "bss size")?,
    );
    put_u32(&mut out, 0);

    out.resize(out.len() + 0x40, 0);
    debug_assert_eq!(out.len(), HEADER_SIZE);

    out.extend_from_slice(&code[HEADER_SIZE..]);
    out.extend_from_slice(&rodata);
    out.extend_from_slice(&data);

    if let Some(meta) = metadata {
        if meta.wants_container() {
            let block = aset::build(meta);
            tracing::debug!(aset_size = block.len(), "appending metadata block");
            out.extend_from_slice(&block);
        }
    }

    tracing::info!(
        payload = total,
        file_size = out.len(),
        "assembled NRO image"
    );
    Ok(out)
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}
