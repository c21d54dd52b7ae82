//! 在块设备上建立空的 FAT32 卷

use alloc::string::String;
use alloc::vec;

use device::BlockDriver;
use log::info;
use vfs::FsError;

use super::layout::{Geometry, VolumeBootRecord};
use super::{CLUSTER_END_OF_CHAIN, CLUSTER_LAST_MIN, write_sectors};

const ROOT_CLUSTER: u32 = 2;
const MEDIA_ENTRY: u32 = CLUSTER_LAST_MIN;

/// 格式化参数
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// 每扇区字节数，必须等于设备扇区大小
    pub bytes_per_sector: u16,
    /// 每簇扇区数
    pub sectors_per_cluster: u8,
    /// 保留扇区数
    pub reserved_sectors: u16,
    /// FAT 表副本数
    pub fat_copies: u8,
    /// 卷标，最多 11 字节
    pub label: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            bytes_per_sector: 512,
            sectors_per_cluster: 8,
            reserved_sectors: 32,
            fat_copies: 2,
            label: String::from("NO NAME"),
        }
    }
}

/// 在 `partition_offset` 处写入新的文件系统，返回写入的 VBR
///
/// `partition_sectors` 为 0 时使用设备剩余的全部扇区。
/// 根目录占簇 2，格式化后为空。
pub fn format(
    device: &dyn BlockDriver,
    partition_offset: usize,
    partition_sectors: usize,
    options: &FormatOptions,
) -> Result<VolumeBootRecord, FsError> {
    let bps = options.bytes_per_sector as usize;
    if bps != device.sector_size() || options.sectors_per_cluster == 0 {
        return Err(FsError::InvalidArgument);
    }
    let total = match partition_sectors {
        0 => device
            .total_sectors()
            .checked_sub(partition_offset)
            .ok_or(FsError::InvalidArgument)?,
        n => n,
    };
    let total = total.min(u32::MAX as usize);
    let fat_size = fat_size_for(total, options)?;

    let mut volume_label = [b' '; 11];
    for (dst, b) in volume_label.iter_mut().zip(options.label.bytes()) {
        *dst = b.to_ascii_uppercase();
    }
    let vbr = VolumeBootRecord {
        bytes_per_sector: options.bytes_per_sector,
        sectors_per_cluster: options.sectors_per_cluster,
        reserved_sectors: options.reserved_sectors,
        fat_copies: options.fat_copies,
        total_sectors: total as u32,
        fat_size_sectors: fat_size as u32,
        root_cluster: ROOT_CLUSTER,
        volume_label,
        fat_type_label: *b"FAT32   ",
    };
    let geometry = Geometry::new(&vbr, partition_offset, total)?;

    let mut sector = vec![0u8; bps];
    vbr.encode(&mut sector);
    write_sectors(device, partition_offset, &sector)?;

    // FAT 表清零，前三项为介质描述、保留项和根目录链尾
    let zeros = vec![0u8; bps];
    let mut first = vec![0u8; bps];
    first[0..4].copy_from_slice(&MEDIA_ENTRY.to_le_bytes());
    first[4..8].copy_from_slice(&CLUSTER_END_OF_CHAIN.to_le_bytes());
    first[8..12].copy_from_slice(&CLUSTER_END_OF_CHAIN.to_le_bytes());
    for copy in 0..geometry.fat_copies {
        let start = geometry.fat_start + copy * geometry.fat_size;
        write_sectors(device, start, &first)?;
        for lba in start + 1..start + geometry.fat_size {
            write_sectors(device, lba, &zeros)?;
        }
    }

    let root = vec![0u8; geometry.cluster_size()];
    write_sectors(device, geometry.data_start, &root)?;

    info!(
        "fat32: formatted {} sectors at lba {} ({} sectors per FAT)",
        total, partition_offset, fat_size
    );
    Ok(vbr)
}

/// 求出能覆盖全部数据簇的最小 FAT 表扇区数
fn fat_size_for(total: usize, options: &FormatOptions) -> Result<usize, FsError> {
    let bps = options.bytes_per_sector as usize;
    let spc = options.sectors_per_cluster as usize;
    let reserved = options.reserved_sectors as usize;
    let copies = options.fat_copies as usize;
    let mut fat_size = 1;
    loop {
        let meta = reserved + copies * fat_size;
        // 至少要能放下根目录簇
        if total < meta + spc {
            return Err(FsError::InvalidArgument);
        }
        let clusters = (total - meta) / spc;
        let needed = ((clusters + 2) * 4).div_ceil(bps);
        if needed <= fat_size {
            return Ok(fat_size);
        }
        fat_size = needed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::RamDisk;
    use test_support::init_arch_ops;

    #[test]
    fn test_fat_size_converges() {
        let options = FormatOptions::default();
        assert_eq!(fat_size_for(8192, &options).unwrap(), 9);
        assert_eq!(fat_size_for(40, &options), Err(FsError::InvalidArgument));
    }

    #[test]
    fn test_format_layout() {
        init_arch_ops();
        let disk = RamDisk::new(8192 * 512, 512, 0);
        let options = FormatOptions {
            label: String::from("scratch"),
            ..FormatOptions::default()
        };
        let vbr = format(&*disk, 0, 0, &options).unwrap();
        assert_eq!(vbr.label(), "SCRATCH");
        assert_eq!(vbr.fat_type(), "FAT32");

        let raw = disk.raw_data();
        assert_eq!(&raw[510..512], &[0x55, 0xAA]);
        let fat = 32 * 512;
        assert_eq!(&raw[fat..fat + 4], &[0xF8, 0xFF, 0xFF, 0x0F]);
        assert_eq!(&raw[fat + 8..fat + 12], &[0xFF, 0xFF, 0xFF, 0x0F]);
        let mirror = fat + 9 * 512;
        assert_eq!(&raw[mirror..mirror + 12], &raw[fat..fat + 12]);
        assert_eq!(VolumeBootRecord::parse(&raw[..512]).unwrap(), vbr);
    }

    #[test]
    fn test_format_rejects_sector_mismatch() {
        init_arch_ops();
        let disk = RamDisk::new(64 * 1024, 1024, 0);
        assert_eq!(
            format(&*disk, 0, 0, &FormatOptions::default()),
            Err(FsError::InvalidArgument)
        );
    }
}
