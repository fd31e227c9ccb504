use core::fmt;

use crate::block::{BlockDev, SECTOR_SIZE, Sector};
use crate::error::Error;
use crate::layout::*;

/// Where everything lives on the disk, in absolute sectors.
///
/// Resolved once per operation from the partition table and the boot sector;
/// nothing else in the crate parses those two sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskGeometry {
    pub partition_type:         u8,
    pub partition_start_sector: u32,
    pub partition_size_sectors: u32,

    pub bytes_per_sector:       u16,
    pub sectors_per_cluster:    u8,
    pub reserved_sectors:       u16,
    pub fat_count:              u8,
    pub root_entry_count:       u16,
    pub total_sectors:          u32,
    pub sectors_per_fat:        u16,
    pub hidden_sectors:         u32,

    pub fat_begin_sector:       u32,
    pub root_dir_begin_sector:  u32,
    /// Sector where the nonexistent cluster 0 would start, so that cluster 2 is
    /// the first data sector. Negative when the data region begins before
    /// `2 * sectors_per_cluster`; addressing goes through `data_begin_sector`.
    pub cluster_base_sector:    i64,
    /// Exclusive upper bound of the cluster numbers that exist both in the FAT
    /// and in the data region.
    pub cluster_limit:          u32,
}

impl DiskGeometry {
    /// Read sector 0 and the first sector of partition 1 and derive the layout.
    pub fn resolve<D: BlockDev>(disk: &mut D) -> Result<Self, Error> {
        let mut mbr: Sector = [0; SECTOR_SIZE];
        disk.read(0, &mut mbr)?;
        let start = get_u32(&mbr, MBR_PART1_START);

        let mut boot: Sector = [0; SECTOR_SIZE];
        disk.read(start, &mut boot)?;

        let geometry = Self::from_sectors(&mbr, &boot)?;
        log::debug!("geometry::resolve: partition at {:#X}, {} sectors",
                    geometry.partition_start_sector, geometry.partition_size_sectors);
        Ok(geometry)
    }

    /// Pure decode of the partition table sector and the boot sector.
    pub fn from_sectors(mbr: &Sector, boot: &Sector) -> Result<Self, Error> {
        if !has_signature(mbr) {
            log::warn!("geometry: partition table sector has no 0x55AA signature");
        }
        if !has_signature(boot) {
            log::warn!("geometry: boot sector has no 0x55AA signature");
        }

        let partition_type         = mbr[MBR_PART1_TYPE];
        let partition_start_sector = get_u32(mbr, MBR_PART1_START);
        let partition_size_sectors = get_u32(mbr, MBR_PART1_SIZE);

        let bytes_per_sector    = get_u16(boot, BPB_BYTES_PER_SECTOR);
        let sectors_per_cluster = boot[BPB_SECTORS_PER_CLUS];
        let reserved_sectors    = get_u16(boot, BPB_RESERVED_SECTORS);
        let fat_count           = boot[BPB_NUM_FATS];
        let root_entry_count    = get_u16(boot, BPB_ROOT_ENTRY_COUNT);
        let total_sectors_16    = get_u16(boot, BPB_TOTAL_SECTORS_16);
        let sectors_per_fat     = get_u16(boot, BPB_SECTORS_PER_FAT);
        let hidden_sectors      = get_u32(boot, BPB_HIDDEN_SECTORS);

        let total_sectors = match total_sectors_16 {
            0 => get_u32(boot, BPB_TOTAL_SECTORS_32),
            n => n as u32,
        };

        if bytes_per_sector as usize != SECTOR_SIZE {
            return Err(Error::InvalidGeometry("bytes per sector is not 512"));
        }
        if sectors_per_cluster == 0 {
            return Err(Error::InvalidGeometry("zero sectors per cluster"));
        }
        if fat_count == 0 || sectors_per_fat == 0 {
            return Err(Error::InvalidGeometry("no FAT"));
        }
        if root_entry_count as usize % DIR_ENTRIES_PER_SECTOR != 0 {
            return Err(Error::InvalidGeometry("root entry count is not a multiple of 16"));
        }

        let spc = sectors_per_cluster as u32;
        let root_dir_sectors = root_entry_count as u32 / DIR_ENTRIES_PER_SECTOR as u32;
        let fat_sectors = sectors_per_fat as u32 * fat_count as u32;

        let fat_begin_sector = hidden_sectors
            .checked_add(reserved_sectors as u32)
            .ok_or(Error::InvalidGeometry("FAT begins past the end of a 32-bit disk"))?;
        let root_dir_begin_sector = fat_begin_sector
            .checked_add(fat_sectors)
            .ok_or(Error::InvalidGeometry("root directory begins past the end of a 32-bit disk"))?;
        let data_begin_sector = root_dir_begin_sector
            .checked_add(root_dir_sectors)
            .ok_or(Error::InvalidGeometry("data region begins past the end of a 32-bit disk"))?;
        let cluster_base_sector = data_begin_sector as i64 - spc as i64 * CLUSTER_FIRST_DATA as i64;

        let system_sectors = reserved_sectors as u32 + fat_sectors + root_dir_sectors;
        let data_clusters = total_sectors.saturating_sub(system_sectors) / spc;
        let cluster_limit = (sectors_per_fat as u32 * FAT_ENTRIES_PER_SECTOR)
            .min(data_clusters.saturating_add(CLUSTER_FIRST_DATA as u32))
            .min(CLUSTER_LAST_DATA as u32 + 1);

        Ok(Self {
            partition_type,
            partition_start_sector,
            partition_size_sectors,
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            fat_count,
            root_entry_count,
            total_sectors,
            sectors_per_fat,
            hidden_sectors,
            fat_begin_sector,
            root_dir_begin_sector,
            cluster_base_sector,
            cluster_limit,
        })
    }

    pub fn root_dir_sectors(&self) -> u32 {
        self.root_entry_count as u32 / DIR_ENTRIES_PER_SECTOR as u32
    }

    /// First sector of the data region, where cluster 2 lives.
    pub fn data_begin_sector(&self) -> u32 {
        self.root_dir_begin_sector + self.root_dir_sectors()
    }

    pub fn cluster_bytes(&self) -> u32 {
        self.sectors_per_cluster as u32 * SECTOR_SIZE as u32
    }

    /// First sector of a data cluster. Only meaningful for `cluster >= 2`.
    pub fn cluster_to_lba(&self, cluster: u16) -> u32 {
        let index = (cluster as u32).saturating_sub(CLUSTER_FIRST_DATA as u32);
        self.data_begin_sector() + self.sectors_per_cluster as u32 * index
    }

    /// Whether `cluster` names a data cluster this volume really has.
    pub fn is_data_cluster(&self, cluster: u16) -> bool {
        cluster >= CLUSTER_FIRST_DATA && (cluster as u32) < self.cluster_limit
    }
}

impl fmt::Display for DiskGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = |sectors: u32| sectors as u64 * SECTOR_SIZE as u64;
        writeln!(f, "----- disk info -----")?;
        writeln!(f, "partition_type    = 0x{:02X}", self.partition_type)?;
        writeln!(f, "total_sectors     = 0x{:08X} ({} bytes)",
                 self.total_sectors, bytes(self.total_sectors))?;
        writeln!(f, "fat_begin_sector  = 0x{:08X} (0x{:08X} bytes)",
                 self.fat_begin_sector, bytes(self.fat_begin_sector))?;
        writeln!(f, "rde_begin_sector  = 0x{:08X} (0x{:08X} bytes)",
                 self.root_dir_begin_sector, bytes(self.root_dir_begin_sector))?;
        write!(f, "data_begin_sector = 0x{:08X} (0x{:08X} bytes)",
               self.data_begin_sector(), bytes(self.data_begin_sector()))
    }
}
