//! NSO container assembler.
//!
//! Each padded segment is compressed independently with raw LZ4 block
//! compression and digested with SHA-256 over the uncompressed bytes. The
//! compressed streams deliberately carry no embedded size: the runtime
//! reads the decompressed size from the header, which lets it decompress
//! segments independently and in any order.
//!
//! Fixed 0x100-byte header, all fields little-endian u32:
//! - magic `NSO0`, two reserved words, flags word 0x3f (all segments
//!   compressed, all checksums present).
//! - three (file offset, memory offset, decompressed size, extra) tuples
//!   for code/rodata/data. File offsets accumulate over *compressed*
//!   lengths starting at 0x100; memory offsets over uncompressed lengths.
//!   The data tuple's extra field holds the page-rounded bss memory size
//!   (bss gets no tuple of its own since it has no file bytes).
//! - 0x20 reserved bytes, the three compressed sizes plus a reserved word,
//!   0x30 reserved bytes, then the three 32-byte digests.
//! - the three compressed payloads follow in the same order.

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::error::ConvertError;
use crate::segments::{expect_contiguous, LoadImage};
use crate::utils::{align_up, page_pad, u32_field, PAGE_SIZE};

const MAGIC: &[u8; 4] = b"NSO0";
const HEADER_SIZE: u64 = 0x100;
/// All three segments compressed, all three checksums present.
const FLAGS: u32 = 0x3f;
const DIGEST_SIZE: usize = 0x20;

/// Build a complete NSO image from a validated [`LoadImage`].
pub fn build(image: &LoadImage) -> Result<Vec<u8>> {
    let code = page_pad(&image.code.data);
    let rodata = page_pad(&image.rodata.data);
    let data = page_pad(&image.data.data);

    let compressed: Vec<Vec<u8>> = [&code, &rodata, &data]
        .iter()
        .map(|seg| lz4_flex::block::compress(seg))
        .collect();

    let digests = [&code, &rodata, &data]
        .iter()
        .map(|seg| {
            let digest = Sha256::digest(seg);
            <[u8; DIGEST_SIZE]>::try_from(digest.as_slice()).map_err(|_| {
                ConvertError::Internal(format!(
                    "digest is {} bytes, header reserves {DIGEST_SIZE}",
                    digest.len()
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(
        HEADER_SIZE as usize + compressed.iter().map(Vec::len).sum::<usize>(),
    );
    out.extend_from_slice(MAGIC);
    for word in [0u32, 0, FLAGS] {
        put_u32(&mut out, word);
    }

    let bss_size = align_up(image.bss.mem_size, PAGE_SIZE);
    let mut off = HEADER_SIZE;
    let mut dot = 0u64;
    for (i, (role, vaddr, seg)) in [
        ("code", image.code.vaddr, &code),
        ("rodata", image.rodata.vaddr, &rodata),
        ("data", image.data.vaddr, &data),
    ]
    .into_iter()
    .enumerate()
    {
        expect_contiguous(role, vaddr, dot)?;
        let extra = if role == "data" { bss_size } else { 0 };
        put_u32(&mut out, u32_field(off, "segment file offset")?);
        put_u32(&mut out, u32_field(dot, "segment memory offset")?);
        put_u32(&mut out, u32_field(seg.len() as u64, "segment size")?);
        put_u32(&mut out, u32_field(extra, "bss size")?);
        off += compressed[i].len() as u64;
        dot += seg.len() as u64;
    }
    expect_contiguous("bss", image.bss.vaddr, dot)?;

    out.resize(out.len() + 0x20, 0);

    for c in &compressed {
        put_u32(&mut out, u32_field(c.len() as u64, "compressed segment size")?);
    }
    put_u32(&mut out, 0);

    out.resize(out.len() + 0x30, 0);

    for digest in &digests {
        out.extend_from_slice(digest);
    }
    debug_assert_eq!(out.len() as u64, HEADER_SIZE);

    for c in &compressed {
        out.extend_from_slice(c);
    }

    tracing::info!(
        uncompressed = code.len() + rodata.len() + data.len(),
        file_size = out.len(),
        "assembled NSO image"
    );
    Ok(out)
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::tests::{bss, segment, valid_table};
    use object::elf::{PF_R, PF_W, PF_X};

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn header_layout_and_offsets() {
        let image = LoadImage::from_segments(valid_table()).unwrap();
        let out = build(&image).unwrap();

        assert_eq!(&out[..4], b"NSO0");
        assert_eq!(u32_at(&out, 0x0c), 0x3f);

        let clens = [u32_at(&out, 0x60), u32_at(&out, 0x64), u32_at(&out, 0x68)];
        assert_eq!(u32_at(&out, 0x6c), 0);

        // code tuple
        assert_eq!(u32_at(&out, 0x10), 0x100);
        assert_eq!(u32_at(&out, 0x14), 0);
        assert_eq!(u32_at(&out, 0x18), 0x1000);
        assert_eq!(u32_at(&out, 0x1c), 0);
        // rodata tuple
        assert_eq!(u32_at(&out, 0x20), 0x100 + clens[0]);
        assert_eq!(u32_at(&out, 0x24), 0x1000);
        assert_eq!(u32_at(&out, 0x28), 0x1000);
        assert_eq!(u32_at(&out, 0x2c), 0);
        // data tuple carries the rounded bss size in its extra field
        assert_eq!(u32_at(&out, 0x30), 0x100 + clens[0] + clens[1]);
        assert_eq!(u32_at(&out, 0x34), 0x2000);
        assert_eq!(u32_at(&out, 0x38), 0x1000);
        assert_eq!(u32_at(&out, 0x3c), 0x1000);

        let total_compressed: u32 = clens.iter().sum();
        assert_eq!(out.len(), 0x100 + total_compressed as usize);
    }

    #[test]
    fn compressed_payloads_round_trip() {
        let mut table = valid_table();
        for (i, byte) in table[0].data.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        let image = LoadImage::from_segments(table).unwrap();
        let out = build(&image).unwrap();

        let clens = [
            u32_at(&out, 0x60) as usize,
            u32_at(&out, 0x64) as usize,
            u32_at(&out, 0x68) as usize,
        ];
        let mut cursor = 0x100;
        for (i, expected) in [
            page_pad(&image.code.data),
            page_pad(&image.rodata.data),
            page_pad(&image.data.data),
        ]
        .iter()
        .enumerate()
        {
            let stream = &out[cursor..cursor + clens[i]];
            let decompressed =
                lz4_flex::block::decompress(stream, expected.len()).unwrap();
            assert_eq!(&decompressed, expected);
            cursor += clens[i];
        }
    }

    #[test]
    fn digests_match_uncompressed_padded_segments() {
        let image = LoadImage::from_segments(valid_table()).unwrap();
        let out = build(&image).unwrap();

        for (i, seg) in [
            page_pad(&image.code.data),
            page_pad(&image.rodata.data),
            page_pad(&image.data.data),
        ]
        .iter()
        .enumerate()
        {
            let expected = Sha256::digest(seg);
            let base = 0xa0 + i * 0x20;
            assert_eq!(&out[base..base + 0x20], expected.as_slice());
        }
    }

    #[test]
    fn digest_is_deterministic_and_byte_sensitive() {
        let a = vec![7u8; 0x1000];
        let mut b = a.clone();
        b[0x123] ^= 1;
        assert_eq!(Sha256::digest(&a), Sha256::digest(&a));
        assert_ne!(Sha256::digest(&a), Sha256::digest(&b));
    }

    #[test]
    fn rejects_non_contiguous_vaddrs() {
        let table = vec![
            segment(0x1000, vec![1; 0x1000], PF_X | PF_R),
            segment(0x2000, vec![2; 0x500], PF_R),
            segment(0x3000, vec![3; 0x200], PF_R | PF_W),
            bss(0x4000, 0x1000),
        ];
        let image = LoadImage::from_segments(table).unwrap();
        assert!(build(&image).is_err());
    }
}
