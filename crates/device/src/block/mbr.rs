//! MBR 分区表
//!
//! 只解析主分区表（4 项），不处理扩展分区。

use alloc::vec;
use alloc::vec::Vec;

use super::BlockDriver;

const TABLE_OFFSET: usize = 446;
const ENTRY_SIZE: usize = 16;
const SIGNATURE_OFFSET: usize = 510;
const MBR_SIZE: usize = 512;

/// FAT32（CHS 寻址）分区类型
pub const PARTITION_FAT32_CHS: u8 = 0x0B;
/// FAT32（LBA 寻址）分区类型
pub const PARTITION_FAT32_LBA: u8 = 0x0C;

/// 分区表读取错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbrError {
    /// 设备读写失败
    Io,
    /// 缺少 0x55AA 签名
    BadSignature,
    /// 扇区小于 512 字节
    UnsupportedSectorSize,
}

/// 单个分区项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionEntry {
    /// 在表中的序号（0..4）
    pub index: usize,
    /// 可引导标志
    pub bootable: bool,
    /// 分区类型字节
    pub kind: u8,
    /// 起始 LBA
    pub start_lba: u32,
    /// 扇区数
    pub sectors: u32,
}

impl PartitionEntry {
    /// 是否为 FAT32 分区
    pub fn is_fat32(&self) -> bool {
        matches!(self.kind, PARTITION_FAT32_CHS | PARTITION_FAT32_LBA)
    }

    fn parse(index: usize, raw: &[u8]) -> Option<Self> {
        let kind = raw[4];
        let sectors = u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]);
        if kind == 0 || sectors == 0 {
            return None;
        }
        Some(Self {
            index,
            bootable: raw[0] == 0x80,
            kind,
            start_lba: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
            sectors,
        })
    }

    fn encode(&self, raw: &mut [u8]) {
        raw.fill(0);
        raw[0] = if self.bootable { 0x80 } else { 0 };
        raw[4] = self.kind;
        raw[8..12].copy_from_slice(&self.start_lba.to_le_bytes());
        raw[12..16].copy_from_slice(&self.sectors.to_le_bytes());
    }
}

/// 主分区表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    entries: Vec<PartitionEntry>,
}

impl PartitionTable {
    /// 从设备第 0 扇区读取分区表
    pub fn read(device: &dyn BlockDriver) -> Result<Self, MbrError> {
        let sector_size = device.sector_size();
        if sector_size < MBR_SIZE {
            return Err(MbrError::UnsupportedSectorSize);
        }
        let mut sector = vec![0u8; sector_size];
        if !device.read_sector(0, &mut sector) {
            return Err(MbrError::Io);
        }
        Self::parse(&sector)
    }

    /// 解析一个扇区的内容
    pub fn parse(sector: &[u8]) -> Result<Self, MbrError> {
        if sector.len() < MBR_SIZE {
            return Err(MbrError::UnsupportedSectorSize);
        }
        if sector[SIGNATURE_OFFSET] != 0x55 || sector[SIGNATURE_OFFSET + 1] != 0xAA {
            return Err(MbrError::BadSignature);
        }
        let entries = (0..4)
            .filter_map(|i| {
                let off = TABLE_OFFSET + i * ENTRY_SIZE;
                PartitionEntry::parse(i, &sector[off..off + ENTRY_SIZE])
            })
            .collect();
        Ok(Self { entries })
    }

    /// 把分区表写入设备第 0 扇区，保留引导代码区
    pub fn write(device: &dyn BlockDriver, entries: &[PartitionEntry]) -> Result<(), MbrError> {
        let sector_size = device.sector_size();
        if sector_size < MBR_SIZE {
            return Err(MbrError::UnsupportedSectorSize);
        }
        let mut sector = vec![0u8; sector_size];
        if !device.read_sector(0, &mut sector) {
            return Err(MbrError::Io);
        }
        sector[TABLE_OFFSET..SIGNATURE_OFFSET].fill(0);
        for entry in entries.iter().filter(|e| e.index < 4) {
            let off = TABLE_OFFSET + entry.index * ENTRY_SIZE;
            entry.encode(&mut sector[off..off + ENTRY_SIZE]);
        }
        sector[SIGNATURE_OFFSET] = 0x55;
        sector[SIGNATURE_OFFSET + 1] = 0xAA;
        if !device.write_sector(0, &sector) {
            return Err(MbrError::Io);
        }
        Ok(())
    }

    /// 全部有效分区
    pub fn entries(&self) -> &[PartitionEntry] {
        &self.entries
    }

    /// FAT32 分区
    pub fn fat32_partitions(&self) -> impl Iterator<Item = &PartitionEntry> {
        self.entries.iter().filter(|e| e.is_fat32())
    }
}
