//! 卷引导记录与卷几何参数
//!
//! VBR 位于分区第 0 扇区，字段均为小端序。

use alloc::string::String;

use log::warn;
use vfs::FsError;

use super::{CLUSTER_FIRST_DATA, le16, le32};

// VBR 字段偏移
const BPB_BYTES_PER_SECTOR: usize = 11;
const BPB_SECTORS_PER_CLUSTER: usize = 13;
const BPB_RESERVED_SECTORS: usize = 14;
const BPB_FAT_COPIES: usize = 16;
const BPB_MEDIA: usize = 21;
const BPB_TOTAL_SECTORS32: usize = 32;
const BPB_FAT_SIZE32: usize = 36;
const BPB_ROOT_CLUSTER: usize = 44;
const BPB_FSINFO_SECTOR: usize = 48;
const BPB_BACKUP_BOOT_SECTOR: usize = 50;
const BS_BOOT_SIGNATURE: usize = 66;
const BS_VOLUME_ID: usize = 67;
const BS_VOLUME_LABEL: usize = 71;
const BS_FS_TYPE: usize = 82;
const SIGNATURE: usize = 510;

/// VBR 的最小长度
pub const VBR_SIZE: usize = 512;

/// 卷引导记录中用到的字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBootRecord {
    /// 每扇区字节数
    pub bytes_per_sector: u16,
    /// 每簇扇区数
    pub sectors_per_cluster: u8,
    /// 保留扇区数（FAT 表之前）
    pub reserved_sectors: u16,
    /// FAT 表副本数
    pub fat_copies: u8,
    /// 总扇区数
    pub total_sectors: u32,
    /// 每个 FAT 表占用的扇区数
    pub fat_size_sectors: u32,
    /// 根目录首簇
    pub root_cluster: u32,
    /// 卷标，空格填充
    pub volume_label: [u8; 11],
    /// 文件系统类型标签，空格填充
    pub fat_type_label: [u8; 8],
}

impl VolumeBootRecord {
    /// 从扇区内容解析并校验
    pub fn parse(sector: &[u8]) -> Result<Self, FsError> {
        if sector.len() < VBR_SIZE {
            return Err(FsError::InvalidArgument);
        }
        if sector[SIGNATURE] != 0x55 || sector[SIGNATURE + 1] != 0xAA {
            warn!("fat32: missing boot signature");
            return Err(FsError::InvalidArgument);
        }
        let mut volume_label = [0u8; 11];
        volume_label.copy_from_slice(&sector[BS_VOLUME_LABEL..BS_VOLUME_LABEL + 11]);
        let mut fat_type_label = [0u8; 8];
        fat_type_label.copy_from_slice(&sector[BS_FS_TYPE..BS_FS_TYPE + 8]);

        let vbr = Self {
            bytes_per_sector: le16(sector, BPB_BYTES_PER_SECTOR),
            sectors_per_cluster: sector[BPB_SECTORS_PER_CLUSTER],
            reserved_sectors: le16(sector, BPB_RESERVED_SECTORS),
            fat_copies: sector[BPB_FAT_COPIES],
            total_sectors: le32(sector, BPB_TOTAL_SECTORS32),
            fat_size_sectors: le32(sector, BPB_FAT_SIZE32),
            root_cluster: le32(sector, BPB_ROOT_CLUSTER),
            volume_label,
            fat_type_label,
        };
        vbr.validate()?;
        Ok(vbr)
    }

    fn validate(&self) -> Result<(), FsError> {
        let ok = matches!(self.bytes_per_sector, 512 | 1024 | 2048 | 4096)
            && self.sectors_per_cluster.is_power_of_two()
            && self.reserved_sectors > 0
            && self.fat_copies > 0
            && self.fat_size_sectors > 0
            && self.root_cluster >= CLUSTER_FIRST_DATA;
        if ok {
            Ok(())
        } else {
            warn!("fat32: malformed boot record {:?}", self);
            Err(FsError::InvalidArgument)
        }
    }

    /// 写入一个完整的 VBR 扇区（不含引导代码）
    pub fn encode(&self, sector: &mut [u8]) {
        sector[..VBR_SIZE].fill(0);
        sector[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        sector[3..11].copy_from_slice(b"SANKTAOS");
        sector[BPB_BYTES_PER_SECTOR..BPB_BYTES_PER_SECTOR + 2]
            .copy_from_slice(&self.bytes_per_sector.to_le_bytes());
        sector[BPB_SECTORS_PER_CLUSTER] = self.sectors_per_cluster;
        sector[BPB_RESERVED_SECTORS..BPB_RESERVED_SECTORS + 2]
            .copy_from_slice(&self.reserved_sectors.to_le_bytes());
        sector[BPB_FAT_COPIES] = self.fat_copies;
        sector[BPB_MEDIA] = 0xF8;
        sector[BPB_TOTAL_SECTORS32..BPB_TOTAL_SECTORS32 + 4]
            .copy_from_slice(&self.total_sectors.to_le_bytes());
        sector[BPB_FAT_SIZE32..BPB_FAT_SIZE32 + 4]
            .copy_from_slice(&self.fat_size_sectors.to_le_bytes());
        sector[BPB_ROOT_CLUSTER..BPB_ROOT_CLUSTER + 4]
            .copy_from_slice(&self.root_cluster.to_le_bytes());
        sector[BPB_FSINFO_SECTOR..BPB_FSINFO_SECTOR + 2].copy_from_slice(&1u16.to_le_bytes());
        sector[BPB_BACKUP_BOOT_SECTOR..BPB_BACKUP_BOOT_SECTOR + 2]
            .copy_from_slice(&6u16.to_le_bytes());
        sector[BS_BOOT_SIGNATURE] = 0x29;
        sector[BS_VOLUME_ID..BS_VOLUME_ID + 4].copy_from_slice(&0x5A4B_0001u32.to_le_bytes());
        sector[BS_VOLUME_LABEL..BS_VOLUME_LABEL + 11].copy_from_slice(&self.volume_label);
        sector[BS_FS_TYPE..BS_FS_TYPE + 8].copy_from_slice(&self.fat_type_label);
        sector[SIGNATURE] = 0x55;
        sector[SIGNATURE + 1] = 0xAA;
    }

    /// 卷标（去掉结尾空格）
    pub fn label(&self) -> String {
        trim_label(&self.volume_label)
    }

    /// 类型标签（去掉结尾空格）
    pub fn fat_type(&self) -> String {
        trim_label(&self.fat_type_label)
    }
}

fn trim_label(raw: &[u8]) -> String {
    let end = raw
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// 由 VBR 和分区位置推导出的卷几何参数，扇区号均为设备绝对 LBA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// 每扇区字节数
    pub bytes_per_sector: usize,
    /// 每簇扇区数
    pub sectors_per_cluster: usize,
    /// 第一个 FAT 表的起始扇区
    pub fat_start: usize,
    /// 每个 FAT 表的扇区数
    pub fat_size: usize,
    /// FAT 表副本数
    pub fat_copies: usize,
    /// 数据区起始扇区（簇 2 所在）
    pub data_start: usize,
    /// 合法簇号的上界（不含）
    pub cluster_limit: u32,
}

impl Geometry {
    /// 计算几何参数；`partition_sectors` 为 0 时使用 VBR 中的总扇区数
    pub fn new(
        vbr: &VolumeBootRecord,
        partition_offset: usize,
        partition_sectors: usize,
    ) -> Result<Self, FsError> {
        let bytes_per_sector = vbr.bytes_per_sector as usize;
        let sectors_per_cluster = vbr.sectors_per_cluster as usize;
        let fat_size = vbr.fat_size_sectors as usize;
        let fat_copies = vbr.fat_copies as usize;
        let total = match (vbr.total_sectors as usize, partition_sectors) {
            (0, p) => p,
            (t, 0) => t,
            (t, p) => t.min(p),
        };
        let meta = vbr.reserved_sectors as usize + fat_copies * fat_size;
        if total <= meta {
            return Err(FsError::InvalidArgument);
        }
        let data_clusters = (total - meta) / sectors_per_cluster;
        let table_entries = fat_size * bytes_per_sector / 4;
        let cluster_limit = (data_clusters + CLUSTER_FIRST_DATA as usize)
            .min(table_entries)
            .min(super::CLUSTER_BAD as usize);
        if vbr.root_cluster as usize >= cluster_limit {
            return Err(FsError::InvalidArgument);
        }
        let fat_start = partition_offset + vbr.reserved_sectors as usize;
        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster,
            fat_start,
            fat_size,
            fat_copies,
            data_start: fat_start + fat_copies * fat_size,
            cluster_limit: cluster_limit as u32,
        })
    }

    /// 每簇字节数
    pub fn cluster_size(&self) -> usize {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    /// 每扇区的目录槽数
    pub fn slots_per_sector(&self) -> usize {
        self.bytes_per_sector / super::entry::SLOT_SIZE
    }

    /// 每簇的目录槽数
    pub fn slots_per_cluster(&self) -> usize {
        self.cluster_size() / super::entry::SLOT_SIZE
    }

    /// 是否为合法数据簇号
    pub fn is_data_cluster(&self, cluster: u32) -> bool {
        (CLUSTER_FIRST_DATA..self.cluster_limit).contains(&cluster)
    }
}
