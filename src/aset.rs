//! ASET metadata block builder (NRO only).
//!
//! The block trails the NRO payload and carries three sub-blocks located by
//! (offset, size) pairs measured from the start of the block: the icon
//! image (verbatim user-supplied bytes, format unvalidated), the NACP
//! application-properties table, and a RomFS image slot that this tool
//! always leaves empty. Unlike the rest of the container headers, the
//! locator pairs are little-endian u64s.

const MAGIC: &[u8; 4] = b"ASET";
/// Magic + version word + three u64 (offset, size) pairs.
const HEADER_SIZE: u64 = 0x38;

/// NACP table geometry. Twelve locale slots each hold a name and a
/// developer field at fixed strides; one version field is shared at the
/// tail. This tool has no per-locale input, so every slot gets an
/// identical copy.
const NACP_SIZE: usize = 0x4000;
const LOCALE_SLOTS: usize = 12;
const LOCALE_STRIDE: usize = 0x300;
const NAME_CAP: usize = 0x200;
const DEVELOPER_SLOT_OFFSET: usize = 0x200;
const DEVELOPER_CAP: usize = 0x100;
const VERSION_OFFSET: usize = 0x3060;
const VERSION_CAP: usize = 0x10;

/// User-supplied application metadata, icon bytes already loaded.
#[derive(Debug)]
pub struct Metadata {
    pub name: String,
    pub developer: String,
    pub version: String,
    pub icon: Option<Vec<u8>>,
}

impl Metadata {
    /// Whether an ASET block should be appended at all. A version string
    /// alone does not trigger one; it only rides along when something else
    /// does.
    pub fn wants_container(&self) -> bool {
        !self.name.is_empty() || !self.developer.is_empty() || self.icon.is_some()
    }

    fn wants_nacp_content(&self) -> bool {
        !self.name.is_empty() || !self.developer.is_empty() || !self.version.is_empty()
    }
}

/// Build the complete ASET block. No failure modes: string truncation is
/// silent and the icon was read by the caller.
pub fn build(meta: &Metadata) -> Vec<u8> {
    let icon = meta.icon.as_deref().unwrap_or(&[]);
    let nacp = build_nacp(meta);

    let mut out = Vec::with_capacity(HEADER_SIZE as usize + icon.len() + nacp.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&0u32.to_le_bytes());

    let icon_offset = HEADER_SIZE;
    let nacp_offset = icon_offset + icon.len() as u64;
    let romfs_offset = nacp_offset + nacp.len() as u64;
    for (offset, size) in [
        (icon_offset, icon.len() as u64),
        (nacp_offset, nacp.len() as u64),
        (romfs_offset, 0u64), // RomFS unsupported, reserved
    ] {
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
    }
    debug_assert_eq!(out.len() as u64, HEADER_SIZE);

    out.extend_from_slice(icon);
    out.extend_from_slice(&nacp);
    out
}

/// Build the fixed 0x4000-byte NACP table. All-zero unless at least one of
/// name/developer/version was supplied.
pub fn build_nacp(meta: &Metadata) -> Vec<u8> {
    let mut table = vec![0u8; NACP_SIZE];
    if !meta.wants_nacp_content() {
        return table;
    }

    for slot in 0..LOCALE_SLOTS {
        let base = slot * LOCALE_STRIDE;
        write_field(&mut table, base, NAME_CAP, &meta.name);
        write_field(
            &mut table,
            base + DEVELOPER_SLOT_OFFSET,
            DEVELOPER_CAP,
            &meta.developer,
        );
    }
    write_field(&mut table, VERSION_OFFSET, VERSION_CAP, &meta.version);
    table
}

/// Copy `value` into `table[offset..]`, silently truncated to `cap` bytes.
fn write_field(table: &mut [u8], offset: usize, cap: usize, value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(cap);
    assert!(offset + cap <= table.len());
    table[offset..offset + len].copy_from_slice(&bytes[..len]);
}
