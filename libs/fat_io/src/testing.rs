// Test fixtures shared by the unit tests of every module.

extern crate std;
use std::io::{Cursor, Read, Write};
use std::vec;
use std::vec::Vec;

use crate::block::{BlockDev, SECTOR_SIZE, Sector};
use crate::error::Error;
use crate::layout::*;

// ── Mock block device backed by Vec<u8> ──────────────────────────────────

pub struct MemDisk(pub Vec<u8>);

impl MemDisk {
    pub fn sector(&self, lba: u32) -> &[u8] {
        let off = lba as usize * SECTOR_SIZE;
        &self.0[off..off + SECTOR_SIZE]
    }

    pub fn sector_mut(&mut self, lba: u32) -> &mut [u8] {
        let off = lba as usize * SECTOR_SIZE;
        &mut self.0[off..off + SECTOR_SIZE]
    }
}

impl BlockDev for MemDisk {
    fn read(&mut self, lba: u32, buf: &mut Sector) -> Result<(), Error> {
        let off = lba as usize * SECTOR_SIZE;
        if off + SECTOR_SIZE > self.0.len() { return Err(Error::Io { sector: lba }); }
        buf.copy_from_slice(&self.0[off..off + SECTOR_SIZE]);
        Ok(())
    }
    fn write(&mut self, lba: u32, buf: &Sector) -> Result<(), Error> {
        let off = lba as usize * SECTOR_SIZE;
        if off + SECTOR_SIZE > self.0.len() { return Err(Error::Io { sector: lba }); }
        self.0[off..off + SECTOR_SIZE].copy_from_slice(buf);
        Ok(())
    }
}

// ── Hand-assembled volumes ───────────────────────────────────────────────

/// Shape of a volume built byte by byte. The default is the smallest useful
/// layout: boot, FAT #1, FAT #2, one root directory sector, 8 data clusters.
pub struct TinySpec {
    pub partition_start:     u32,
    pub sectors_per_cluster: u8,
    pub fat_count:           u8,
    pub root_entry_count:    u16,
    pub sectors_per_fat:     u16,
    pub total_sectors:       u32,
}

impl Default for TinySpec {
    fn default() -> Self {
        Self {
            partition_start: 0,
            sectors_per_cluster: 1,
            fat_count: 2,
            root_entry_count: 16,
            sectors_per_fat: 1,
            total_sectors: 12,
        }
    }
}

/// Build an image whose partition starts at `spec.partition_start`. With the
/// default start of 0 the partition table and the boot sector share sector 0.
pub fn tiny_image(spec: &TinySpec) -> MemDisk {
    let start = spec.partition_start;
    let mut img = vec![0u8; (start + spec.total_sectors) as usize * SECTOR_SIZE];

    let mbr = &mut img[..SECTOR_SIZE];
    mbr[MBR_PART1_TYPE] = 0x04;
    put_u32(mbr, MBR_PART1_START, start);
    put_u32(mbr, MBR_PART1_SIZE, spec.total_sectors);
    mbr[SIGNATURE_OFFSET..].copy_from_slice(&SIGNATURE);

    let off = start as usize * SECTOR_SIZE;
    let boot = &mut img[off..off + SECTOR_SIZE];
    boot[..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
    boot[3..11].copy_from_slice(b"FATIO   ");
    put_u16(boot, BPB_BYTES_PER_SECTOR, SECTOR_SIZE as u16);
    boot[BPB_SECTORS_PER_CLUS] = spec.sectors_per_cluster;
    put_u16(boot, BPB_RESERVED_SECTORS, 1);
    boot[BPB_NUM_FATS] = spec.fat_count;
    put_u16(boot, BPB_ROOT_ENTRY_COUNT, spec.root_entry_count);
    put_u16(boot, BPB_TOTAL_SECTORS_16, spec.total_sectors as u16);
    boot[0x15] = 0xF8; // media descriptor: fixed disk
    put_u16(boot, BPB_SECTORS_PER_FAT, spec.sectors_per_fat);
    put_u32(boot, BPB_HIDDEN_SECTORS, start);
    boot[SIGNATURE_OFFSET..].copy_from_slice(&SIGNATURE);

    for copy in 0..spec.fat_count as u32 {
        let fat = (start + 1 + copy * spec.sectors_per_fat as u32) as usize * SECTOR_SIZE;
        put_u16(&mut img, fat, 0xFFF8);
        put_u16(&mut img, fat + 2, CLUSTER_EOC);
    }
    MemDisk(img)
}

/// Raw 32-byte directory slot with `name`, start cluster and size.
pub fn put_dir_slot(disk: &mut MemDisk, lba: u32, slot: usize, name: &[u8; 11], cluster: u16, size: u32) {
    let sec = disk.sector_mut(lba);
    let raw = &mut sec[slot * DIR_ENTRY_SIZE..(slot + 1) * DIR_ENTRY_SIZE];
    raw.fill(0);
    raw[..DIR_NAME_LEN].copy_from_slice(name);
    raw[DIR_ATTR] = ATTR_ARCHIVE;
    put_u16(raw, DIR_CLUSTER, cluster);
    put_u32(raw, DIR_SIZE, size);
}

/// Set the FAT entry of `cluster` in every copy, the way a consistent volume has it.
pub fn put_fat(disk: &mut MemDisk, fat_begin: u32, sectors_per_fat: u32, copies: u32, cluster: u16, value: u16) {
    for copy in 0..copies {
        let off = (fat_begin + copy * sectors_per_fat) as usize * SECTOR_SIZE + cluster as usize * 2;
        put_u16(&mut disk.0, off, value);
    }
}

/// Byte slices of each FAT copy.
pub fn fat_copies(disk: &MemDisk, fat_begin: u32, sectors_per_fat: u32, copies: u32) -> Vec<&[u8]> {
    (0..copies)
        .map(|k| {
            let off = (fat_begin + k * sectors_per_fat) as usize * SECTOR_SIZE;
            &disk.0[off..off + sectors_per_fat as usize * SECTOR_SIZE]
        })
        .collect()
}

// ── Volumes formatted by `fatfs` ─────────────────────────────────────────

pub const PART_START: u32 = 63;
pub const PART_SECTORS: u32 = 16_384;

/// An 8 MB FAT16 volume with 1 KB clusters, formatted by `fatfs` and placed
/// behind an MBR at sector 63.
///
/// `fatfs` writes zero hidden sectors for an unpartitioned volume; the boot
/// sector is patched so the volume describes its real position on the disk.
pub fn fat16_image() -> MemDisk {
    let mut part = Cursor::new(vec![0u8; PART_SECTORS as usize * SECTOR_SIZE]);
    fatfs::format_volume(
        &mut part,
        fatfs::FormatVolumeOptions::new()
            .fat_type(fatfs::FatType::Fat16)
            .bytes_per_cluster(1024),
    ).expect("format_volume failed");
    let mut part = part.into_inner();
    put_u32(&mut part, BPB_HIDDEN_SECTORS, PART_START);

    let mut img = vec![0u8; PART_START as usize * SECTOR_SIZE];
    img[MBR_PART1_TYPE] = 0x06;
    put_u32(&mut img, MBR_PART1_START, PART_START);
    put_u32(&mut img, MBR_PART1_SIZE, PART_SECTORS);
    img[SIGNATURE_OFFSET..SECTOR_SIZE].copy_from_slice(&SIGNATURE);
    img.extend_from_slice(&part);
    MemDisk(img)
}

fn partition(disk: &mut MemDisk) -> Cursor<&mut [u8]> {
    Cursor::new(&mut disk.0[PART_START as usize * SECTOR_SIZE..])
}

/// Write a file through `fatfs`.
pub fn fatfs_write(disk: &mut MemDisk, name: &str, content: &[u8]) {
    let mut cursor = partition(disk);
    let fs = fatfs::FileSystem::new(&mut cursor, fatfs::FsOptions::new())
        .expect("FileSystem::new failed");
    let mut f = fs.root_dir().create_file(name).expect("create_file failed");
    f.truncate().unwrap();
    f.write_all(content).unwrap();
}

/// Read a file through `fatfs`; `None` if it does not exist.
pub fn fatfs_read(disk: &mut MemDisk, name: &str) -> Option<Vec<u8>> {
    let mut cursor = partition(disk);
    let fs = fatfs::FileSystem::new(&mut cursor, fatfs::FsOptions::new()).unwrap();
    let mut f = fs.root_dir().open_file(name).ok()?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).unwrap();
    Some(buf)
}

/// Deterministic, non-repeating-looking payload of `len` bytes.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| ((i * 31) as u8) ^ seed ^ ((i >> 9) as u8)).collect()
}
