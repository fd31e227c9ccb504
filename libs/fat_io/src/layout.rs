//! Byte offsets and reserved values of the on-disk structures.
//!
//! Every multi-byte field is little-endian.

// ─── Master boot record ────────────────────────────────────────────────────────

/// First partition record of the MBR partition table.
pub const MBR_PART1_TYPE:        usize = 0x1C2;
pub const MBR_PART1_START:       usize = 0x1C6;
pub const MBR_PART1_SIZE:        usize = 0x1CA;

pub const SIGNATURE_OFFSET:      usize = 0x1FE;
pub const SIGNATURE:             [u8; 2] = [0x55, 0xAA];

// ─── BPB (BIOS Parameter Block) ───────────────────────────────────────────────

pub const BPB_BYTES_PER_SECTOR:  usize = 0x0B;
pub const BPB_SECTORS_PER_CLUS:  usize = 0x0D;
pub const BPB_RESERVED_SECTORS:  usize = 0x0E;
pub const BPB_NUM_FATS:          usize = 0x10;
pub const BPB_ROOT_ENTRY_COUNT:  usize = 0x11;
pub const BPB_TOTAL_SECTORS_16:  usize = 0x13;
pub const BPB_SECTORS_PER_FAT:   usize = 0x16;
pub const BPB_HIDDEN_SECTORS:    usize = 0x1C;
pub const BPB_TOTAL_SECTORS_32:  usize = 0x20;

// ─── Directory entry (32 bytes) ────────────────────────────────────────────────

pub const DIR_ENTRY_SIZE:        usize = 32;
pub const DIR_ENTRIES_PER_SECTOR: usize = 16;

pub const DIR_NAME:              usize = 0x00;
pub const DIR_NAME_LEN:          usize = 11;
pub const DIR_ATTR:              usize = 0x0B;
pub const DIR_NT_RESERVED:       usize = 0x0C;
pub const DIR_CRT_TIME_TENTH:    usize = 0x0D;
pub const DIR_CRT_TIME:          usize = 0x0E;
pub const DIR_CRT_DATE:          usize = 0x10;
pub const DIR_ACC_DATE:          usize = 0x12;
pub const DIR_CLUSTER_HI:        usize = 0x14;
pub const DIR_WRT_TIME:          usize = 0x16;
pub const DIR_WRT_DATE:          usize = 0x18;
pub const DIR_CLUSTER:           usize = 0x1A;
pub const DIR_SIZE:              usize = 0x1C;

/// First name byte of a slot that was never used. Nothing follows it in a
/// well-formed directory, but the whole table is scanned anyway.
pub const SLOT_NEVER_USED:       u8 = 0x00;
pub const SLOT_DELETED:          u8 = 0xE5;
pub const SLOT_DELETED_ALT:      u8 = 0x05;

pub const ATTR_VOLUME_ID:        u8 = 0x08;
pub const ATTR_LFN:              u8 = 0x0F;
pub const ATTR_ARCHIVE:          u8 = 0x20;

/// 1980-01-01, the earliest date a FAT timestamp can hold.
pub const PLACEHOLDER_DATE:      u16 = (1 << 5) | 1;
pub const PLACEHOLDER_TIME:      u16 = 0;

// ─── FAT16 entries ─────────────────────────────────────────────────────────────

pub const FAT_ENTRY_SIZE:        usize = 2;
pub const FAT_ENTRIES_PER_SECTOR: u32 = 256;

pub const CLUSTER_FREE:          u16 = 0x0000;
pub const CLUSTER_RESERVED:      u16 = 0x0001;
pub const CLUSTER_FIRST_DATA:    u16 = 0x0002;
pub const CLUSTER_LAST_DATA:     u16 = 0xFFF6;
pub const CLUSTER_BAD:           u16 = 0xFFF7;
pub const CLUSTER_EOC_MIN:       u16 = 0xFFF8;
/// Terminator this driver writes at the end of a chain.
pub const CLUSTER_EOC:           u16 = 0xFFFF;

// ─── Little-endian field access ────────────────────────────────────────────────

pub fn get_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

pub fn get_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

pub fn put_u16(buf: &mut [u8], off: usize, value: u16) {
    buf[off..off + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(buf: &mut [u8], off: usize, value: u32) {
    buf[off..off + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn has_signature(sector: &[u8]) -> bool {
    sector[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 2] == SIGNATURE
}
