//! 块设备模块
//!
//! 包含块设备驱动接口、内存磁盘和 MBR 分区表

mod mbr;
mod ram_disk;

use crate::driver::Driver;

pub use mbr::{MbrError, PARTITION_FAT32_CHS, PARTITION_FAT32_LBA, PartitionEntry, PartitionTable};
pub use ram_disk::RamDisk;

/// 块设备驱动程序接口
///
/// 读写以扇区为单位同步完成，`buf` 的长度必须是扇区大小的整数倍，
/// 多个扇区时按 `lba` 起连续读写。
pub trait BlockDriver: Driver {
    /// 读取从 `lba` 开始的若干扇区
    /// # 返回值：
    /// 如果读取成功则返回 true，否则返回 false
    fn read_sector(&self, lba: usize, buf: &mut [u8]) -> bool;

    /// 写入从 `lba` 开始的若干扇区
    /// # 返回值：
    /// 如果写入成功则返回 true，否则返回 false
    fn write_sector(&self, lba: usize, buf: &[u8]) -> bool;

    /// 刷新到磁盘
    fn flush(&self) -> bool {
        true
    }

    /// 扇区大小（字节）
    fn sector_size(&self) -> usize;

    /// 总扇区数
    fn total_sectors(&self) -> usize;
}
