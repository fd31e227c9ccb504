//! A mounted partition and the four file operations on its root directory.

use crate::block::{BlockDev, SectorSink, SectorSource};
use crate::dir::{self, DirEntry, DirLocation, ShortName};
use crate::error::Error;
use crate::fat::FatTable;
use crate::geometry::DiskGeometry;
use crate::read::{self, ReadReport};
use crate::write::{self};

/// Disk plus the geometry resolved from it. Holds no other state between
/// operations; every FAT access goes through a fresh [`FatTable`].
pub struct Volume<D: BlockDev> {
    pub disk:     D,
    pub geometry: DiskGeometry,
}

impl<D: BlockDev> Volume<D> {
    pub fn mount(mut disk: D) -> Result<Self, Error> {
        let geometry = DiskGeometry::resolve(&mut disk)?;
        Ok(Self { disk, geometry })
    }

    pub fn find(&mut self, name: &ShortName) -> Result<Option<DirLocation>, Error> {
        dir::find(&mut self.disk, &self.geometry, name)
    }

    /// Stream `name` into `sink`. A chain that does not match the recorded
    /// size still returns `Ok`, with the fault in the report.
    pub fn read_file<S: SectorSink + ?Sized>(&mut self, name: &ShortName, sink: &mut S) -> Result<ReadReport, Error> {
        let loc = self.find(name)?.ok_or(Error::FileNotFound)?;
        log::info!("read: {name}: start cluster {:#06X}, {} bytes", loc.start_cluster, loc.size);
        let mut fat = FatTable::new(&self.geometry);
        read::read_chain(&mut self.disk, &self.geometry, &mut fat, loc.start_cluster, loc.size, sink)
    }

    /// Create or overwrite `name` with the contents of `source`; returns the
    /// size recorded in the directory.
    pub fn write_file<S: SectorSource + ?Sized>(&mut self, name: &ShortName, source: &mut S) -> Result<u32, Error> {
        write::write_file(&mut self.disk, &self.geometry, *name, source)
    }

    /// Mark the entry deleted and release its chain; returns the number of
    /// clusters freed. A missing file is [`Error::FileNotFound`] and leaves the
    /// disk untouched.
    pub fn delete_file(&mut self, name: &ShortName) -> Result<u32, Error> {
        let loc = self.find(name)?.ok_or(Error::FileNotFound)?;
        dir::mark_deleted(&mut self.disk, &loc)?;

        let mut fat = FatTable::new(&self.geometry);
        let freed = fat.free_chain(&mut self.disk, loc.start_cluster)?;
        fat.flush(&mut self.disk)?;
        log::info!("delete: {name}: {freed} clusters released");
        Ok(freed)
    }

    pub fn list(&mut self, f: impl FnMut(&DirEntry)) -> Result<(), Error> {
        dir::list(&mut self.disk, &self.geometry, f)
    }

    /// Free space in the data region, in clusters.
    pub fn free_clusters(&mut self) -> Result<u32, Error> {
        FatTable::new(&self.geometry).count_free(&mut self.disk)
    }
}

// ─── One-shot operations ───────────────────────────────────────────────────────

pub fn read<D: BlockDev, S: SectorSink + ?Sized>(disk: D, sink: &mut S, name: &ShortName) -> Result<ReadReport, Error> {
    Volume::mount(disk)?.read_file(name, sink)
}

pub fn write<D: BlockDev, S: SectorSource + ?Sized>(disk: D, source: &mut S, name: &ShortName) -> Result<u32, Error> {
    Volume::mount(disk)?.write_file(name, source)
}

pub fn delete<D: BlockDev>(disk: D, name: &ShortName) -> Result<u32, Error> {
    Volume::mount(disk)?.delete_file(name)
}

pub fn list<D: BlockDev>(disk: D, f: impl FnMut(&DirEntry)) -> Result<(), Error> {
    Volume::mount(disk)?.list(f)
}
