//! Sector-level I/O seams: the disk underneath and the byte streams on either
//! side of a file transfer.

use crate::error::Error;

/// The only sector size this driver understands.
pub const SECTOR_SIZE: usize = 512;

pub type Sector = [u8; SECTOR_SIZE];

// ─── Block device abstraction ──────────────────────────────────────────────────

/// Fixed-size sector store addressed by absolute sector index.
///
/// Any failure is fatal for the operation in progress; implementations report
/// it as [`Error::Io`] carrying the offending sector.
pub trait BlockDev {
    fn read(&mut self, lba: u32, buf: &mut Sector) -> Result<(), Error>;
    fn write(&mut self, lba: u32, buf: &Sector) -> Result<(), Error>;
}

impl<D: BlockDev + ?Sized> BlockDev for &mut D {
    fn read(&mut self, lba: u32, buf: &mut Sector) -> Result<(), Error> {
        (**self).read(lba, buf)
    }
    fn write(&mut self, lba: u32, buf: &Sector) -> Result<(), Error> {
        (**self).write(lba, buf)
    }
}

// ─── File payload streams ──────────────────────────────────────────────────────

/// Input of a write, consumed one sector at a time.
pub trait SectorSource {
    /// Fill `buf` from the front and return how many bytes were produced.
    /// Anything short of a full sector marks the end of the input; `0` means
    /// there was nothing left.
    fn fill(&mut self, buf: &mut Sector) -> Result<usize, Error>;
}

impl SectorSource for &[u8] {
    fn fill(&mut self, buf: &mut Sector) -> Result<usize, Error> {
        let n = self.len().min(SECTOR_SIZE);
        buf[..n].copy_from_slice(&self[..n]);
        *self = &self[n..];
        Ok(n)
    }
}

/// Output of a read. Receives the file in order, at most one sector per call.
pub trait SectorSink {
    fn put(&mut self, data: &[u8]) -> Result<(), Error>;
}

impl<F: FnMut(&[u8]) -> Result<(), Error>> SectorSink for F {
    fn put(&mut self, data: &[u8]) -> Result<(), Error> {
        self(data)
    }
}
