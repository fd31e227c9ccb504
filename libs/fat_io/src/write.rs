//! Creating or overwriting a root directory file.
//!
//! A write moves through three stages, each a method of [`ChainWriter`]:
//!
//! 1. [`locate`](ChainWriter::locate) picks the directory slot: the existing
//!    entry of that name or the first reusable one.
//! 2. [`stream`](ChainWriter::stream) copies the input one sector at a time.
//!    Clusters of the file being replaced are reused in chain order; after
//!    those, free clusters are taken in ascending order and marked
//!    end-of-chain as soon as they are claimed.
//! 3. [`finish`](ChainWriter::finish) terminates the new chain, frees what is
//!    left of the old one, mirrors the FAT and only then rewrites the
//!    directory entry.

use crate::block::{BlockDev, SECTOR_SIZE, Sector, SectorSource};
use crate::dir::{self, DirEntry, DirLocation, ShortName};
use crate::error::Error;
use crate::fat::{ClusterState, FatTable};
use crate::geometry::DiskGeometry;
use crate::layout::CLUSTER_EOC;

pub struct ChainWriter<'g> {
    geometry:        &'g DiskGeometry,
    fat:             FatTable,
    name:            ShortName,
    slot:            DirLocation,

    /// Next cluster of the replaced file's chain that has not been reused.
    reuse:           Option<u16>,
    /// Head of a replaced chain that loops back on itself. Never reused, only
    /// freed on finish.
    stale:           Option<u16>,
    first:           Option<u16>,
    last:            Option<u16>,
    /// Sectors of `last` already holding data.
    sectors_in_last: u32,
    written:         u32,
}

impl<'g> ChainWriter<'g> {
    pub fn locate<D: BlockDev>(disk: &mut D, geometry: &'g DiskGeometry, name: ShortName) -> Result<Self, Error> {
        if !name.is_storable() {
            return Err(Error::InvalidName);
        }
        let slot = dir::find_or_allocate_slot(disk, geometry, &name)?;
        let mut fat = FatTable::new(geometry);
        let mut reuse = None;
        let mut stale = None;
        if slot.existing {
            log::info!("write: overwriting {name} ({} bytes, cluster {:#06X})", slot.size, slot.start_cluster);
            if geometry.is_data_cluster(slot.start_cluster) {
                match fat.chain_length(disk, slot.start_cluster)? {
                    Some(_) => reuse = Some(slot.start_cluster),
                    None => {
                        log::warn!("write: chain of {name} loops, allocating fresh clusters");
                        stale = Some(slot.start_cluster);
                    }
                }
            }
        } else {
            log::info!("write: creating {name} in sector {:#X} at offset {:#X}", slot.sector, slot.offset);
        }

        Ok(Self {
            geometry,
            fat,
            name,
            slot,
            reuse,
            stale,
            first: None,
            last: None,
            sectors_in_last: 0,
            written: 0,
        })
    }

    /// Copy `source` until it runs dry. A short final sector is padded with
    /// zeros on disk. Fails with [`Error::FatExhausted`] when no cluster is
    /// left for the next sector; what was stored until then stays valid for
    /// [`finish`](Self::finish).
    pub fn stream<D: BlockDev, S: SectorSource + ?Sized>(&mut self, disk: &mut D, source: &mut S) -> Result<(), Error> {
        let mut sec: Sector = [0; SECTOR_SIZE];
        loop {
            sec.fill(0);
            let n = source.fill(&mut sec)?;
            if n == 0 { return Ok(()); }

            let written = self.written.checked_add(n as u32).ok_or(Error::FileTooLarge)?;
            let lba = self.next_sector(disk)?;
            disk.write(lba, &sec)?;
            self.written = written;

            if n < SECTOR_SIZE { return Ok(()); }
        }
    }

    fn next_sector<D: BlockDev>(&mut self, disk: &mut D) -> Result<u32, Error> {
        let cluster = match self.last {
            Some(c) if self.sectors_in_last < self.geometry.sectors_per_cluster as u32 => c,
            _ => {
                let c = self.acquire(disk)?;
                self.sectors_in_last = 0;
                c
            }
        };
        let lba = self.geometry.cluster_to_lba(cluster) + self.sectors_in_last;
        self.sectors_in_last += 1;
        Ok(lba)
    }

    /// Claim the next cluster of the new chain and link it behind the last one.
    fn acquire<D: BlockDev>(&mut self, disk: &mut D) -> Result<u16, Error> {
        let cluster = match self.reuse {
            Some(c) => {
                // step along the old chain before its links get rewritten
                self.reuse = match ClusterState::classify(self.fat.entry(disk, c)?) {
                    ClusterState::Next(n) if self.geometry.is_data_cluster(n) => Some(n),
                    _ => None,
                };
                c
            }
            None => {
                let c = self.fat.find_free_cluster(disk)?
                    .ok_or(Error::FatExhausted { written: self.written })?;
                self.fat.set(disk, c, CLUSTER_EOC)?;
                c
            }
        };

        match self.last {
            None => self.first = Some(cluster),
            Some(prev) => {
                if self.fat.entry(disk, prev)? != cluster {
                    self.fat.set(disk, prev, cluster)?;
                }
            }
        }
        log::debug!("write::acquire: cluster {cluster:#06X}");
        self.last = Some(cluster);
        Ok(cluster)
    }

    /// Terminate the chain, release the unused part of the old one and record
    /// the entry. Returns the file size stored in the directory.
    pub fn finish<D: BlockDev>(mut self, disk: &mut D) -> Result<u32, Error> {
        if let Some(last) = self.last {
            self.fat.set(disk, last, CLUSTER_EOC)?;
        }
        if let Some(tail) = self.reuse.take().or(self.stale.take()) {
            let freed = self.fat.free_chain(disk, tail)?;
            log::debug!("write::finish: released {freed} clusters of the old chain");
        }
        self.fat.flush(disk)?;

        let entry = DirEntry::file(self.name, self.first.unwrap_or(0), self.written);
        dir::store(disk, &self.slot, &entry)?;
        log::info!("write: {} = {} bytes from cluster {:#06X}", self.name, entry.size, entry.start_cluster);
        Ok(self.written)
    }
}

/// Run all three stages. When streaming fails the entry is still finalized
/// with the bytes stored so far, and the streaming error is returned;
/// [`Error::FatExhausted`] then carries the recorded size.
pub fn write_file<D: BlockDev, S: SectorSource + ?Sized>(
    disk: &mut D,
    geometry: &DiskGeometry,
    name: ShortName,
    source: &mut S,
) -> Result<u32, Error> {
    let mut writer = ChainWriter::locate(disk, geometry, name)?;
    match writer.stream(disk, source) {
        Ok(()) => writer.finish(disk),
        Err(err) => {
            let written = match writer.finish(disk) {
                Ok(written) => written,
                Err(finish_err) => {
                    log::error!("write: could not finalize {name} after failure: {finish_err}");
                    return Err(err);
                }
            };
            log::error!("write: {err}");
            match err {
                Error::FatExhausted { .. } => Err(Error::FatExhausted { written }),
                other => Err(other),
            }
        }
    }
}
