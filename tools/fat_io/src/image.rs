//! Host side of the engine's I/O seams: a disk image file as the sector
//! store, and std readers and writers as file payload streams.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use fat_io::block::Sector;
use fat_io::{BlockDev, Error, SECTOR_SIZE, SectorSink, SectorSource};

pub struct ImageDisk {
    file: File,
}

impl ImageDisk {
    /// Open an existing image for reading and writing.
    pub fn open(path: &Path) -> Result<Self, Error> {
        match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => Ok(Self { file }),
            Err(e) => {
                log::error!("image::open: {}: {e}", path.display());
                Err(Error::ImageOpenFailed)
            }
        }
    }

    fn seek_to(&mut self, lba: u32) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(lba as u64 * SECTOR_SIZE as u64))?;
        Ok(())
    }
}

impl BlockDev for ImageDisk {
    fn read(&mut self, lba: u32, buf: &mut Sector) -> Result<(), Error> {
        self.seek_to(lba)
            .and_then(|()| self.file.read_exact(buf))
            .map_err(|e| {
                log::debug!("image::read: sector {lba:#X}: {e}");
                Error::Io { sector: lba }
            })
    }

    fn write(&mut self, lba: u32, buf: &Sector) -> Result<(), Error> {
        self.seek_to(lba)
            .and_then(|()| self.file.write_all(buf))
            .map_err(|e| {
                log::debug!("image::write: sector {lba:#X}: {e}");
                Error::Io { sector: lba }
            })
    }
}

/// Feeds a write from any reader, a full sector per call until the reader
/// runs dry.
pub struct ReaderSource<R>(pub R);

impl<R: Read> SectorSource for ReaderSource<R> {
    fn fill(&mut self, buf: &mut Sector) -> Result<usize, Error> {
        let mut n = 0;
        while n < SECTOR_SIZE {
            match self.0.read(&mut buf[n..]) {
                Ok(0) => break,
                Ok(k) => n += k,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    log::error!("image::ReaderSource: {e}");
                    return Err(Error::Source);
                }
            }
        }
        Ok(n)
    }
}

pub struct WriterSink<W: Write>(pub W);

impl<W: Write> WriterSink<W> {
    pub fn finish(mut self) -> Result<W, Error> {
        self.0.flush().map_err(|e| {
            log::error!("image::WriterSink: {e}");
            Error::Sink
        })?;
        Ok(self.0)
    }
}

impl<W: Write> SectorSink for WriterSink<W> {
    fn put(&mut self, data: &[u8]) -> Result<(), Error> {
        self.0.write_all(data).map_err(|e| {
            log::error!("image::WriterSink: {e}");
            Error::Sink
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;

    use fat_io::{ShortName, Volume};

    use super::*;

    /// A file under the system temp directory, removed on drop.
    pub(crate) struct TempImage(pub(crate) PathBuf);

    impl TempImage {
        pub(crate) fn new(tag: &str, content: &[u8]) -> Self {
            let path = std::env::temp_dir().join(format!("fat_io_{}_{tag}.img", std::process::id()));
            std::fs::write(&path, content).unwrap();
            Self(path)
        }
    }

    impl Drop for TempImage {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    /// 4 MB FAT16 volume behind an MBR at sector 1.
    pub(crate) fn partitioned_fat16() -> Vec<u8> {
        const START: u32 = 1;
        let mut part = Cursor::new(vec![0u8; 8192 * SECTOR_SIZE]);
        fatfs::format_volume(
            &mut part,
            fatfs::FormatVolumeOptions::new().fat_type(fatfs::FatType::Fat16).bytes_per_cluster(512),
        ).unwrap();
        let mut part = part.into_inner();
        part[0x1C..0x20].copy_from_slice(&START.to_le_bytes());

        let mut img = vec![0u8; SECTOR_SIZE];
        img[0x1C2] = 0x06;
        img[0x1C6..0x1CA].copy_from_slice(&START.to_le_bytes());
        img[0x1CA..0x1CE].copy_from_slice(&8192u32.to_le_bytes());
        img[0x1FE] = 0x55;
        img[0x1FF] = 0xAA;
        img.extend_from_slice(&part);
        img
    }

    /// Hands out at most three bytes per read.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.0.len().min(buf.len()).min(3);
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn missing_image_is_an_open_error() {
        let path = std::env::temp_dir().join("fat_io_does_not_exist.img");
        assert!(matches!(ImageDisk::open(&path), Err(Error::ImageOpenFailed)));
    }

    #[test]
    fn sectors_land_at_their_offset() {
        let img = TempImage::new("sectors", &[0u8; 4 * SECTOR_SIZE]);
        let mut disk = ImageDisk::open(&img.0).unwrap();
        disk.write(2, &[0x42; SECTOR_SIZE]).unwrap();
        let mut buf = [0u8; SECTOR_SIZE];
        disk.read(2, &mut buf).unwrap();
        assert_eq!(buf, [0x42; SECTOR_SIZE]);
        disk.read(1, &mut buf).unwrap();
        assert_eq!(buf, [0; SECTOR_SIZE]);
        drop(disk);

        let raw = std::fs::read(&img.0).unwrap();
        assert!(raw[2 * SECTOR_SIZE..3 * SECTOR_SIZE].iter().all(|&b| b == 0x42));
    }

    #[test]
    fn reading_past_the_end_names_the_sector() {
        let img = TempImage::new("short", &[0u8; 2 * SECTOR_SIZE + 100]);
        let mut disk = ImageDisk::open(&img.0).unwrap();
        let mut buf = [0u8; SECTOR_SIZE];
        assert_eq!(disk.read(2, &mut buf), Err(Error::Io { sector: 2 }));
    }

    #[test]
    fn reader_source_fills_whole_sectors() {
        let data: Vec<u8> = (0..1200u32).map(|i| i as u8).collect();
        let mut src = ReaderSource(Trickle(&data));
        let mut buf = [0u8; SECTOR_SIZE];
        assert_eq!(src.fill(&mut buf).unwrap(), 512);
        assert_eq!(src.fill(&mut buf).unwrap(), 512);
        assert_eq!(src.fill(&mut buf).unwrap(), 176);
        assert_eq!(&buf[..176], &data[1024..]);
        assert_eq!(src.fill(&mut buf).unwrap(), 0);
    }

    #[test]
    fn write_read_delete_on_an_image_file() {
        let img = TempImage::new("volume", &partitioned_fat16());
        let name = ShortName::from_file_name("notes.txt");
        let data: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();

        let mut vol = Volume::mount(ImageDisk::open(&img.0).unwrap()).unwrap();
        assert_eq!(vol.write_file(&name, &mut ReaderSource(Trickle(&data))).unwrap(), 3000);
        drop(vol);

        let mut vol = Volume::mount(ImageDisk::open(&img.0).unwrap()).unwrap();
        let mut sink = WriterSink(Vec::new());
        assert!(vol.read_file(&name, &mut sink).unwrap().is_clean());
        assert_eq!(sink.finish().unwrap(), data);

        assert_eq!(vol.delete_file(&name).unwrap(), 6);
        assert_eq!(vol.find(&name).unwrap(), None);
    }
}
