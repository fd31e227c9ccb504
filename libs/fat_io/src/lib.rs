// Library crate root. No_std when not testing, so the engine can be linked
// into a freestanding loader; the host tool in tools/fat_io supplies std I/O.
#![cfg_attr(not(test), no_std)]

//! Minimal FAT12/16 driver for raw, MBR-partitioned disk images.
//!
//! Every operation resolves the [`DiskGeometry`] once, then works on the root
//! directory and the 16-bit FAT through a [`BlockDev`]:
//!
//! * [`read`] streams a file's cluster chain into a [`SectorSink`],
//! * [`write`] creates or overwrites a file from a [`SectorSource`],
//! * [`delete`] releases a file's directory slot and cluster chain,
//! * [`list`] visits the in-use root directory entries.

pub mod block;
pub mod dir;
pub mod error;
pub mod fat;
pub mod geometry;
pub mod layout;
pub mod read;
pub mod volume;
pub mod write;

#[cfg(test)]
mod testing;

pub use block::{BlockDev, SECTOR_SIZE, SectorSink, SectorSource};
pub use dir::{DirEntry, DirLocation, ShortName};
pub use error::Error;
pub use fat::{ClusterState, FatTable};
pub use geometry::DiskGeometry;
pub use read::{ChainFault, ReadReport};
pub use volume::{Volume, delete, list, read, write};
