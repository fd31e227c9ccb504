//! The 16-bit File Allocation Table and its mirrored copies.

use crate::block::{BlockDev, SECTOR_SIZE, Sector};
use crate::error::Error;
use crate::geometry::DiskGeometry;
use crate::layout::*;

/// What a FAT entry says about the cluster after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Free,
    /// Cluster 1 or the bad-cluster mark. Ends a chain like `EndOfChain`.
    Reserved,
    /// The chain continues at this cluster.
    Next(u16),
    EndOfChain,
}

impl ClusterState {
    pub fn classify(value: u16) -> Self {
        match value {
            CLUSTER_FREE => ClusterState::Free,
            CLUSTER_RESERVED | CLUSTER_BAD => ClusterState::Reserved,
            CLUSTER_EOC_MIN..=CLUSTER_EOC => ClusterState::EndOfChain,
            next => ClusterState::Next(next),
        }
    }

    pub fn is_terminator(self) -> bool {
        matches!(self, ClusterState::Reserved | ClusterState::EndOfChain)
    }
}

/// One-sector window onto the FAT.
///
/// Reads come from the first copy. A modified sector is written to every copy
/// before another sector is loaded and on [`FatTable::flush`], so the copies
/// only differ inside the window while it is open.
pub struct FatTable {
    fat_begin:       u32,
    sectors_per_fat: u32,
    copies:          u32,
    cluster_limit:   u32,

    current:         Option<u32>,
    buf:             Sector,
    dirty:           bool,
    /// Next cluster `find_free_cluster` looks at. Only moves forward.
    cursor:          u16,
}

impl FatTable {
    pub fn new(geometry: &DiskGeometry) -> Self {
        Self {
            fat_begin:       geometry.fat_begin_sector,
            sectors_per_fat: geometry.sectors_per_fat as u32,
            copies:          geometry.fat_count as u32,
            cluster_limit:   geometry.cluster_limit,
            current:         None,
            buf:             [0; SECTOR_SIZE],
            dirty:           false,
            cursor:          CLUSTER_FIRST_DATA,
        }
    }

    fn sector_of(cluster: u16) -> u32 {
        cluster as u32 / FAT_ENTRIES_PER_SECTOR
    }

    fn offset_of(cluster: u16) -> usize {
        (cluster as u32 % FAT_ENTRIES_PER_SECTOR) as usize * FAT_ENTRY_SIZE
    }

    /// Index within one FAT copy of the sector currently loaded.
    pub fn current_sector(&self) -> Option<u32> {
        self.current
    }

    /// Whether `cluster` is a data cluster of this volume.
    pub fn holds(&self, cluster: u16) -> bool {
        cluster >= CLUSTER_FIRST_DATA && (cluster as u32) < self.cluster_limit
    }

    /// Make the FAT sector holding `cluster`'s entry the current one,
    /// mirroring the previous sector first if it was modified.
    pub fn ensure_sector_for_cluster<D: BlockDev>(&mut self, disk: &mut D, cluster: u16) -> Result<(), Error> {
        let sector = Self::sector_of(cluster);
        if self.current == Some(sector) { return Ok(()); }
        if sector >= self.sectors_per_fat {
            return Err(Error::InvalidGeometry("cluster number beyond the end of the FAT"));
        }
        self.flush(disk)?;
        disk.read(self.fat_begin + sector, &mut self.buf)?;
        self.current = Some(sector);
        Ok(())
    }

    /// Entry of `cluster` in the current sector. Call
    /// [`ensure_sector_for_cluster`](Self::ensure_sector_for_cluster) first.
    pub fn get_entry(&self, cluster: u16) -> u16 {
        debug_assert_eq!(self.current, Some(Self::sector_of(cluster)));
        get_u16(&self.buf, Self::offset_of(cluster))
    }

    pub fn set_entry(&mut self, cluster: u16, value: u16) {
        debug_assert_eq!(self.current, Some(Self::sector_of(cluster)));
        put_u16(&mut self.buf, Self::offset_of(cluster), value);
        self.dirty = true;
    }

    pub fn entry<D: BlockDev>(&mut self, disk: &mut D, cluster: u16) -> Result<u16, Error> {
        self.ensure_sector_for_cluster(disk, cluster)?;
        Ok(self.get_entry(cluster))
    }

    pub fn set<D: BlockDev>(&mut self, disk: &mut D, cluster: u16, value: u16) -> Result<(), Error> {
        self.ensure_sector_for_cluster(disk, cluster)?;
        self.set_entry(cluster, value);
        Ok(())
    }

    /// First free cluster at or after the cursor. The cursor moves past every
    /// cluster looked at, so a cluster is handed out at most once per table.
    pub fn find_free_cluster<D: BlockDev>(&mut self, disk: &mut D) -> Result<Option<u16>, Error> {
        while (self.cursor as u32) < self.cluster_limit {
            let cluster = self.cursor;
            self.cursor += 1;
            if self.entry(disk, cluster)? == CLUSTER_FREE {
                return Ok(Some(cluster));
            }
        }
        Ok(None)
    }

    /// Clear every link of the chain starting at `start` and return how many
    /// clusters were released. Stops at the first entry that does not name a
    /// data cluster; a cyclic chain therefore ends at the first cluster
    /// already cleared.
    pub fn free_chain<D: BlockDev>(&mut self, disk: &mut D, start: u16) -> Result<u32, Error> {
        let mut freed = 0;
        let mut cluster = start;
        while self.holds(cluster) {
            let next = self.entry(disk, cluster)?;
            if next == CLUSTER_FREE { break; }
            self.set_entry(cluster, CLUSTER_FREE);
            freed += 1;
            match ClusterState::classify(next) {
                ClusterState::Next(n) => cluster = n,
                _ => break,
            }
        }
        Ok(freed)
    }

    /// Number of clusters in the chain starting at `start`, or `None` when the
    /// chain does not end within `cluster_limit` steps, which only a cycle can
    /// cause.
    pub fn chain_length<D: BlockDev>(&mut self, disk: &mut D, start: u16) -> Result<Option<u32>, Error> {
        let mut len = 0;
        let mut cluster = start;
        while self.holds(cluster) {
            if len >= self.cluster_limit { return Ok(None); }
            len += 1;
            match ClusterState::classify(self.entry(disk, cluster)?) {
                ClusterState::Next(n) => cluster = n,
                _ => break,
            }
        }
        Ok(Some(len))
    }

    /// Number of free data clusters. Leaves the allocation cursor alone.
    pub fn count_free<D: BlockDev>(&mut self, disk: &mut D) -> Result<u32, Error> {
        let mut free = 0;
        for cluster in CLUSTER_FIRST_DATA as u32..self.cluster_limit {
            if self.entry(disk, cluster as u16)? == CLUSTER_FREE { free += 1; }
        }
        Ok(free)
    }

    /// Write the current sector to every FAT copy if it was modified.
    pub fn flush<D: BlockDev>(&mut self, disk: &mut D) -> Result<(), Error> {
        let Some(sector) = self.current else { return Ok(()) };
        if !self.dirty { return Ok(()); }
        for copy in 0..self.copies {
            disk.write(self.fat_begin + copy * self.sectors_per_fat + sector, &self.buf)?;
        }
        self.dirty = false;
        Ok(())
    }
}
