//! Loadable-segment model and input validation.
//!
//! A supported input image carries exactly four PT_LOAD segments in
//! program-header order: code (RX), read-only data (R), read-write data
//! (RW, file-backed) and bss (RW, zero-filled, no file bytes). This module
//! extracts them from a parsed `object::File` and enforces the structural
//! preconditions of the whole transcoding. All violations are
//! `ConvertError::MalformedInput` and abort before any output is written.

use anyhow::{Context, Result};
use object::elf::{PF_R, PF_W, PF_X};
use object::read::{Object, ObjectSegment};
use object::SegmentFlags;

use crate::error::{malformed, ConvertError};

/// One loadable region of the input image, immutable after extraction.
#[derive(Debug)]
pub struct Segment {
    /// Virtual address the segment must be mapped at (page-aligned).
    pub vaddr: u64,
    /// Number of file-backed bytes (0 for bss).
    pub file_size: u64,
    /// In-memory size; exceeds `file_size` only for bss.
    pub mem_size: u64,
    /// ELF p_flags permission bits.
    pub flags: u32,
    /// Raw file-backed bytes (empty for bss).
    pub data: Vec<u8>,
}

/// The four fixed-role segments of a supported image, in address order.
#[derive(Debug)]
pub struct LoadImage {
    pub code: Segment,
    pub rodata: Segment,
    pub data: Segment,
    pub bss: Segment,
}

const ROLES: [(&str, u32); 4] = [
    ("code", PF_X | PF_R),
    ("rodata", PF_R),
    ("data", PF_R | PF_W),
    ("bss", PF_R | PF_W),
];

impl LoadImage {
    /// Extract the four loadable segments from a parsed object file.
    ///
    /// `object`'s ELF segment iterator yields exactly the PT_LOAD entries
    /// in program-header order, which is the ordering contract this relies
    /// on.
    pub fn from_object(obj: &object::File) -> Result<Self> {
        let mut segments = Vec::new();
        for seg in obj.segments() {
            let p_flags = match seg.flags() {
                SegmentFlags::Elf { p_flags } => p_flags,
                other => malformed!("not an ELF segment (flags {:?})", other),
            };
            let (_, file_size) = seg.file_range();
            segments.push(Segment {
                vaddr: seg.address(),
                file_size,
                mem_size: seg.size(),
                flags: p_flags,
                data: seg
                    .data()
                    .context("failed to read segment bytes")?
                    .to_vec(),
            });
        }
        Self::from_segments(segments)
    }

    /// Validation core, separated from ELF parsing so it is testable on
    /// synthetic segment tables.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self> {
        if segments.len() != 4 {
            malformed!(
                "expected exactly 4 loadable segments, found {}",
                segments.len()
            );
        }

        for (seg, (role, expected_flags)) in segments.iter().zip(ROLES) {
            if seg.vaddr & 0xfff != 0 {
                malformed!(
                    "{} segment virtual address {:#x} is not page-aligned",
                    role,
                    seg.vaddr
                );
            }
            if seg.flags != expected_flags {
                malformed!(
                    "{} segment has permission flags {:#x}, expected {:#x}",
                    role,
                    seg.flags,
                    expected_flags
                );
            }
        }

        let [code, rodata, data, bss]: [Segment; 4] =
            segments.try_into().map_err(|_| {
                ConvertError::Internal("segment count changed after validation".into())
            })?;

        if bss.file_size != 0 {
            malformed!(
                "bss segment has {:#x} file-backed bytes, expected none",
                bss.file_size
            );
        }

        tracing::debug!(
            code_size = code.file_size,
            rodata_size = rodata.file_size,
            data_size = data.file_size,
            bss_size = bss.mem_size,
            "extracted loadable segments"
        );

        Ok(Self {
            code,
            rodata,
            data,
            bss,
        })
    }
}

/// Check that a segment's declared virtual address equals the running
/// cumulative offset of the output payload.
///
/// This is a load-bearing correctness check, not a sanity check: it proves
/// the linker produced contiguous, zero-based segments, which is what lets
/// the container formats store plain offsets instead of addresses.
pub fn expect_contiguous(role: &str, declared_vaddr: u64, cursor: u64) -> Result<()> {
    if declared_vaddr != cursor {
        malformed!(
            "{} segment declares vaddr {:#x} but the cumulative offset is {:#x} \
             (segments must be contiguous and zero-based)",
            role,
            declared_vaddr,
            cursor
        );
    }
    Ok(())
}
