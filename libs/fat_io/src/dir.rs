//! Root directory: 8.3 names, 32-byte slots, lookup and slot allocation.

use core::fmt;
use core::ops::ControlFlow;

use crate::block::{BlockDev, SECTOR_SIZE, Sector};
use crate::error::Error;
use crate::geometry::DiskGeometry;
use crate::layout::*;

// ─── 8.3 names ─────────────────────────────────────────────────────────────────

/// The fixed 11-byte name field: 8 bytes of base name and 3 of extension,
/// space padded, no dot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortName([u8; DIR_NAME_LEN]);

impl ShortName {
    pub const fn from_raw(raw: [u8; DIR_NAME_LEN]) -> Self {
        Self(raw)
    }

    /// Normalize a human file name, e.g. `"hello.txt"` → `"HELLO   TXT"`.
    ///
    /// The first dot starts the extension; base and extension are each
    /// truncated to their field width. Bytes are kept as given otherwise, so
    /// check [`is_storable`](Self::is_storable) before creating a file.
    pub fn from_file_name(name: &str) -> Self {
        let mut raw = [b' '; DIR_NAME_LEN];
        let mut pos = 0usize;
        let mut in_ext = false;
        for b in name.bytes() {
            let end = if in_ext { DIR_NAME_LEN } else { 8 };
            if b == b'.' && !in_ext {
                in_ext = true;
                pos = 8;
            } else if pos < end {
                raw[pos] = b.to_ascii_uppercase();
                pos += 1;
            }
        }
        Self(raw)
    }

    /// Whether a slot holding this name reads back as in use. A name that is
    /// blank or starts with a free-slot marker cannot be stored.
    pub fn is_storable(&self) -> bool {
        !matches!(self.0[0], SLOT_NEVER_USED | SLOT_DELETED | SLOT_DELETED_ALT | b' ')
    }

    pub fn as_bytes(&self) -> &[u8; DIR_NAME_LEN] {
        &self.0
    }
}

impl fmt::Display for ShortName {
    /// `"HELLO   TXT"` → `"HELLO.TXT"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trim = |part: &[u8]| part.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        let (base, ext) = self.0.split_at(8);
        for &b in &base[..trim(base)] { write!(f, "{}", b as char)?; }
        let ext_end = trim(ext);
        if ext_end > 0 {
            write!(f, ".")?;
            for &b in &ext[..ext_end] { write!(f, "{}", b as char)?; }
        }
        Ok(())
    }
}

impl fmt::Debug for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortName(\"")?;
        for &b in &self.0 { write!(f, "{}", b.escape_ascii())?; }
        write!(f, "\")")
    }
}

// ─── Directory entry (32 bytes) ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name:          ShortName,
    pub attr:          u8,
    pub start_cluster: u16,
    pub size:          u32,
}

impl DirEntry {
    /// A regular file as this driver writes it.
    pub fn file(name: ShortName, start_cluster: u16, size: u32) -> Self {
        Self { name, attr: ATTR_ARCHIVE, start_cluster, size }
    }

    pub fn decode(raw: &[u8]) -> Self {
        let mut name = [0u8; DIR_NAME_LEN];
        name.copy_from_slice(&raw[DIR_NAME..DIR_NAME + DIR_NAME_LEN]);
        Self {
            name: ShortName(name),
            attr: raw[DIR_ATTR],
            start_cluster: get_u16(raw, DIR_CLUSTER),
            size: get_u32(raw, DIR_SIZE),
        }
    }

    /// Overwrite the 32-byte slot `raw`. Timestamps get placeholder values.
    pub fn encode(&self, raw: &mut [u8]) {
        raw[..DIR_ENTRY_SIZE].fill(0);
        raw[DIR_NAME..DIR_NAME + DIR_NAME_LEN].copy_from_slice(&self.name.0);
        raw[DIR_ATTR] = self.attr;
        raw[DIR_NT_RESERVED] = 0;
        raw[DIR_CRT_TIME_TENTH] = 0;
        put_u16(raw, DIR_CRT_TIME, PLACEHOLDER_TIME);
        put_u16(raw, DIR_CRT_DATE, PLACEHOLDER_DATE);
        put_u16(raw, DIR_ACC_DATE, PLACEHOLDER_DATE);
        put_u16(raw, DIR_CLUSTER_HI, 0);
        put_u16(raw, DIR_WRT_TIME, PLACEHOLDER_TIME);
        put_u16(raw, DIR_WRT_DATE, PLACEHOLDER_DATE);
        put_u16(raw, DIR_CLUSTER, self.start_cluster);
        put_u32(raw, DIR_SIZE, self.size);
    }

    fn is_lfn(&self) -> bool { self.attr & ATTR_LFN == ATTR_LFN }
    fn is_volume_id(&self) -> bool { self.attr & ATTR_VOLUME_ID != 0 && !self.is_lfn() }
}

fn slot_in_use(raw: &[u8]) -> bool {
    !matches!(raw[0], SLOT_NEVER_USED | SLOT_DELETED | SLOT_DELETED_ALT)
}

fn name_matches(raw: &[u8], name: &ShortName) -> bool {
    raw[DIR_NAME..DIR_NAME + DIR_NAME_LEN] == name.0
}

// ─── Lookup ────────────────────────────────────────────────────────────────────

/// A root directory slot: where it is and what it held when it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirLocation {
    pub sector:        u32,
    /// Byte offset of the slot within `sector`.
    pub offset:        usize,
    pub start_cluster: u16,
    pub size:          u32,
    /// `true` when the slot holds a file with the searched name, `false` for a
    /// reusable slot handed out for a new file.
    pub existing:      bool,
}

impl DirLocation {
    fn existing(sector: u32, offset: usize, raw: &[u8]) -> Self {
        let entry = DirEntry::decode(raw);
        Self { sector, offset, start_cluster: entry.start_cluster, size: entry.size, existing: true }
    }

    fn vacant(sector: u32, offset: usize) -> Self {
        Self { sector, offset, start_cluster: 0, size: 0, existing: false }
    }
}

/// Visit every root directory slot in order, one sector read per 16 slots.
fn scan<D: BlockDev, T>(
    disk: &mut D,
    geometry: &DiskGeometry,
    mut visit: impl FnMut(u32, usize, &[u8]) -> ControlFlow<T>,
) -> Result<Option<T>, Error> {
    let mut sec: Sector = [0; SECTOR_SIZE];
    for i in 0..geometry.root_entry_count as usize {
        let lba = geometry.root_dir_begin_sector + (i / DIR_ENTRIES_PER_SECTOR) as u32;
        let slot = i % DIR_ENTRIES_PER_SECTOR;
        if slot == 0 { disk.read(lba, &mut sec)?; }
        let off = slot * DIR_ENTRY_SIZE;
        if let ControlFlow::Break(found) = visit(lba, off, &sec[off..off + DIR_ENTRY_SIZE]) {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Locate the in-use entry named `name`.
pub fn find<D: BlockDev>(
    disk: &mut D,
    geometry: &DiskGeometry,
    name: &ShortName,
) -> Result<Option<DirLocation>, Error> {
    scan(disk, geometry, |lba, off, raw| {
        if slot_in_use(raw) && name_matches(raw, name) {
            ControlFlow::Break(DirLocation::existing(lba, off, raw))
        } else {
            ControlFlow::Continue(())
        }
    })
}

/// The entry named `name` if there is one, else the first reusable slot.
pub fn find_or_allocate_slot<D: BlockDev>(
    disk: &mut D,
    geometry: &DiskGeometry,
    name: &ShortName,
) -> Result<DirLocation, Error> {
    let mut first_free = None;
    let found = scan(disk, geometry, |lba, off, raw| {
        if !slot_in_use(raw) {
            if first_free.is_none() { first_free = Some(DirLocation::vacant(lba, off)); }
            ControlFlow::Continue(())
        } else if name_matches(raw, name) {
            ControlFlow::Break(DirLocation::existing(lba, off, raw))
        } else {
            ControlFlow::Continue(())
        }
    })?;
    found.or(first_free).ok_or(Error::DirectoryFull)
}

/// Call `f` for every file in the root directory, skipping volume labels and
/// long-filename slots.
pub fn list<D: BlockDev>(
    disk: &mut D,
    geometry: &DiskGeometry,
    mut f: impl FnMut(&DirEntry),
) -> Result<(), Error> {
    scan::<_, ()>(disk, geometry, |_, _, raw| {
        if slot_in_use(raw) {
            let entry = DirEntry::decode(raw);
            if !entry.is_lfn() && !entry.is_volume_id() { f(&entry); }
        }
        ControlFlow::Continue(())
    })?;
    Ok(())
}

// ─── Slot updates ──────────────────────────────────────────────────────────────

pub fn store<D: BlockDev>(disk: &mut D, at: &DirLocation, entry: &DirEntry) -> Result<(), Error> {
    let mut sec: Sector = [0; SECTOR_SIZE];
    disk.read(at.sector, &mut sec)?;
    entry.encode(&mut sec[at.offset..at.offset + DIR_ENTRY_SIZE]);
    disk.write(at.sector, &sec)
}

pub fn mark_deleted<D: BlockDev>(disk: &mut D, at: &DirLocation) -> Result<(), Error> {
    let mut sec: Sector = [0; SECTOR_SIZE];
    disk.read(at.sector, &mut sec)?;
    sec[at.offset + DIR_NAME] = SLOT_DELETED;
    disk.write(at.sector, &sec)
}
