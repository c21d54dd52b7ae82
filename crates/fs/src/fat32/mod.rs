//! FAT32 文件系统
//!
//! 分层如下：
//!
//! - [`layout`]：卷引导记录（VBR）与由它推导出的卷几何参数
//! - [`table`]：FAT 表，簇链的分配、遍历与释放
//! - [`data`]：数据区，簇内扇区读写与 32 字节目录槽操作
//! - [`volume`]：按路径的文件/目录操作与目录槽分配状态机
//! - [`node`]：把卷中的条目适配为 [`VfsNode`](vfs::VfsNode)
//! - [`format`]：在块设备上建立空卷
//!
//! 只支持 8.3 短文件名；磁盘上已有的长文件名记录在枚举时被跳过。

pub mod data;
pub mod entry;
pub mod format;
pub mod layout;
pub mod name;
pub mod node;
pub mod table;
pub mod volume;

use device::BlockDriver;
use log::warn;
use vfs::FsError;

pub use data::{ClusterData, EnumerateResult, FreeSlot};
pub use entry::{Fat32Entry, FatAttr, SlotAddr};
pub use format::{FormatOptions, format};
pub use layout::{Geometry, VolumeBootRecord};
pub use name::ShortName;
pub use node::FatNode;
pub use table::ClusterTable;
pub use volume::{DirIter, Fat32Volume};

// ========== 簇号 ==========

/// 空闲簇
pub const CLUSTER_UNUSED: u32 = 0;
/// 第一个数据簇
pub const CLUSTER_FIRST_DATA: u32 = 2;
/// 坏簇标记
pub const CLUSTER_BAD: u32 = 0x0FFF_FFF7;
/// 链尾标记的最小值
pub const CLUSTER_LAST_MIN: u32 = 0x0FFF_FFF8;
/// 写入链尾时使用的值
pub const CLUSTER_END_OF_CHAIN: u32 = 0x0FFF_FFFF;
/// FAT 表项的有效位
pub const CLUSTER_MASK: u32 = 0x0FFF_FFFF;

// ========== 设备读写 ==========

pub(crate) fn read_sectors(device: &dyn BlockDriver, lba: usize, buf: &mut [u8]) -> Result<(), FsError> {
    if device.read_sector(lba, buf) {
        Ok(())
    } else {
        warn!("fat32: read of lba {} ({} bytes) failed", lba, buf.len());
        Err(FsError::IoError)
    }
}

pub(crate) fn write_sectors(device: &dyn BlockDriver, lba: usize, buf: &[u8]) -> Result<(), FsError> {
    if device.write_sector(lba, buf) {
        Ok(())
    } else {
        warn!("fat32: write of lba {} ({} bytes) failed", lba, buf.len());
        Err(FsError::IoError)
    }
}

pub(crate) fn le16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

pub(crate) fn le32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}
