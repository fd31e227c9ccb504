//! Streaming a cluster chain out of the data region.

use core::fmt;

use crate::block::{BlockDev, SECTOR_SIZE, Sector, SectorSink};
use crate::error::Error;
use crate::fat::{ClusterState, FatTable};
use crate::geometry::DiskGeometry;

/// A chain that disagrees with the size recorded in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFault {
    /// The chain stopped at `at`, a value that is not a data cluster, while
    /// `missing` bytes of the file were still undelivered.
    BrokenEarly { at: u16, missing: u32 },
    /// Every byte was delivered but the FAT links `cluster`, the last one read,
    /// on to `next` instead of ending the chain.
    NotTerminated { cluster: u16, next: u16 },
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFault::BrokenEarly { at, missing } => write!(
                f, "FAT chain is broken in the middle of the file (at {at:#06X}, {missing} bytes missing)"
            ),
            ChainFault::NotTerminated { cluster, next } => write!(
                f, "FAT chain doesn't end at the end of the file ({cluster:#06X} -> {next:#06X})"
            ),
        }
    }
}

/// Outcome of a read that ran to completion or stopped at a chain fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadReport {
    pub bytes_read: u32,
    pub fault:      Option<ChainFault>,
}

impl ReadReport {
    pub fn is_clean(&self) -> bool {
        self.fault.is_none()
    }
}

/// Deliver `byte_length` bytes of the chain starting at `start_cluster` to
/// `sink`, one sector per call. The last sector is cut to the bytes that
/// remain, so the sink receives exactly the file.
pub fn read_chain<D: BlockDev, S: SectorSink + ?Sized>(
    disk: &mut D,
    geometry: &DiskGeometry,
    fat: &mut FatTable,
    start_cluster: u16,
    byte_length: u32,
    sink: &mut S,
) -> Result<ReadReport, Error> {
    let mut remaining = byte_length;
    let mut cluster = start_cluster;
    let mut fault = None;
    let mut sec: Sector = [0; SECTOR_SIZE];

    if remaining > 0 && !geometry.is_data_cluster(cluster) {
        fault = Some(ChainFault::BrokenEarly { at: cluster, missing: remaining });
    }

    while remaining > 0 && fault.is_none() {
        log::debug!("read::read_chain: cluster {cluster:#06X}");
        let lba = geometry.cluster_to_lba(cluster);
        for s in 0..geometry.sectors_per_cluster as u32 {
            if remaining == 0 { break; }
            disk.read(lba + s, &mut sec)?;
            let n = remaining.min(SECTOR_SIZE as u32);
            sink.put(&sec[..n as usize])?;
            remaining -= n;
        }

        let next = fat.entry(disk, cluster)?;
        match ClusterState::classify(next) {
            ClusterState::Next(n) if remaining > 0 && geometry.is_data_cluster(n) => cluster = n,
            _ if remaining > 0 => {
                fault = Some(ChainFault::BrokenEarly { at: next, missing: remaining });
            }
            state if !state.is_terminator() => {
                fault = Some(ChainFault::NotTerminated { cluster, next });
            }
            _ => {}
        }
    }

    match fault {
        Some(f @ ChainFault::BrokenEarly { .. }) => log::error!("read: {f}"),
        Some(f @ ChainFault::NotTerminated { .. }) => log::warn!("read: {f}"),
        None => {}
    }
    Ok(ReadReport { bytes_read: byte_length - remaining, fault })
}
