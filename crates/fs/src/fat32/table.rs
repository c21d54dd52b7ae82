//! FAT 表：簇链的分配、遍历与释放
//!
//! 表项直接在设备上读改写，不保留内存副本；写操作同步到每一份 FAT 副本。

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use device::BlockDriver;
use log::debug;
use vfs::FsError;

use super::layout::Geometry;
use super::{
    CLUSTER_END_OF_CHAIN, CLUSTER_FIRST_DATA, CLUSTER_LAST_MIN, CLUSTER_MASK, CLUSTER_UNUSED,
    le32, read_sectors, write_sectors,
};

const ENTRY_SIZE: usize = 4;

/// 簇分配表
pub struct ClusterTable {
    device: Arc<dyn BlockDriver>,
    geometry: Geometry,
}

impl ClusterTable {
    /// 在给定几何参数上打开 FAT 表
    pub fn new(device: Arc<dyn BlockDriver>, geometry: Geometry) -> Self {
        Self { device, geometry }
    }

    fn entries_per_sector(&self) -> usize {
        self.geometry.bytes_per_sector / ENTRY_SIZE
    }

    /// 簇号所在的 (FAT 内扇区序号, 扇区内字节偏移)
    fn locate(&self, cluster: u32) -> (usize, usize) {
        let byte = cluster as usize * ENTRY_SIZE;
        (
            byte / self.geometry.bytes_per_sector,
            byte % self.geometry.bytes_per_sector,
        )
    }

    fn check(&self, cluster: u32) -> Result<(), FsError> {
        if self.geometry.is_data_cluster(cluster) {
            Ok(())
        } else {
            Err(FsError::InvalidArgument)
        }
    }

    /// 读取簇 `cluster` 的后继（已去掉高 4 位）
    pub fn get_next(&self, cluster: u32) -> Result<u32, FsError> {
        self.check(cluster)?;
        let (sector, offset) = self.locate(cluster);
        let mut buf = vec![0u8; self.geometry.bytes_per_sector];
        read_sectors(&*self.device, self.geometry.fat_start + sector, &mut buf)?;
        Ok(le32(&buf, offset) & CLUSTER_MASK)
    }

    /// 设置簇 `cluster` 的后继，保留表项高 4 位
    pub fn set_next(&self, cluster: u32, next: u32) -> Result<(), FsError> {
        self.check(cluster)?;
        let (sector, offset) = self.locate(cluster);
        let mut buf = vec![0u8; self.geometry.bytes_per_sector];
        for copy in 0..self.geometry.fat_copies {
            let lba = self.geometry.fat_start + copy * self.geometry.fat_size + sector;
            read_sectors(&*self.device, lba, &mut buf)?;
            let old = le32(&buf, offset);
            let value = (old & !CLUSTER_MASK) | (next & CLUSTER_MASK);
            buf[offset..offset + ENTRY_SIZE].copy_from_slice(&value.to_le_bytes());
            write_sectors(&*self.device, lba, &buf)?;
        }
        Ok(())
    }

    /// 是否为链尾标记
    pub fn is_last(value: u32) -> bool {
        value >= CLUSTER_LAST_MIN
    }

    /// 簇是否已被占用
    pub fn is_allocated(&self, cluster: u32) -> Result<bool, FsError> {
        Ok(self.get_next(cluster)? != CLUSTER_UNUSED)
    }

    /// 分配一个空闲簇并标记为链尾
    ///
    /// 按扇区顺序扫描第一份 FAT；簇内容不做清零。
    pub fn alloc_cluster(&self) -> Result<u32, FsError> {
        let per_sector = self.entries_per_sector();
        let mut buf = vec![0u8; self.geometry.bytes_per_sector];
        let limit = self.geometry.cluster_limit as usize;
        let sectors = limit.div_ceil(per_sector);
        for sector in 0..sectors {
            read_sectors(&*self.device, self.geometry.fat_start + sector, &mut buf)?;
            for slot in 0..per_sector {
                let cluster = sector * per_sector + slot;
                if cluster < CLUSTER_FIRST_DATA as usize {
                    continue;
                }
                if cluster >= limit {
                    break;
                }
                if le32(&buf, slot * ENTRY_SIZE) & CLUSTER_MASK == CLUSTER_UNUSED {
                    let cluster = cluster as u32;
                    self.set_next(cluster, CLUSTER_END_OF_CHAIN)?;
                    debug!("fat32: allocated cluster {}", cluster);
                    return Ok(cluster);
                }
            }
        }
        Err(FsError::NoSpace)
    }

    /// 释放以 `head` 开头的整条链，返回释放的簇数
    ///
    /// 遍历步数以簇总数为上界，损坏的环形链不会导致死循环。
    pub fn free_chain(&self, head: u32) -> Result<usize, FsError> {
        let mut freed = 0;
        let mut current = head;
        while self.geometry.is_data_cluster(current) && freed < self.max_chain() {
            let next = self.get_next(current)?;
            if next == CLUSTER_UNUSED {
                break;
            }
            self.set_next(current, CLUSTER_UNUSED)?;
            freed += 1;
            current = next;
        }
        if freed > 0 {
            debug!("fat32: freed {} clusters from {}", freed, head);
        }
        Ok(freed)
    }

    fn max_chain(&self) -> usize {
        self.geometry.cluster_limit as usize
    }

    /// 遍历链上的簇，`visit` 返回 false 时停止
    fn walk(&self, head: u32, mut visit: impl FnMut(usize, u32) -> bool) -> Result<(), FsError> {
        let mut current = head;
        let mut index = 0;
        while self.geometry.is_data_cluster(current) && index < self.max_chain() {
            if !visit(index, current) {
                return Ok(());
            }
            let next = self.get_next(current)?;
            if Self::is_last(next) || next == CLUSTER_UNUSED {
                return Ok(());
            }
            current = next;
            index += 1;
        }
        Ok(())
    }

    /// 链上 `cluster` 的前驱；`cluster` 为链头或不在链上时返回 None
    pub fn get_prev(&self, head: u32, cluster: u32) -> Result<Option<u32>, FsError> {
        let mut prev = None;
        let mut found = None;
        self.walk(head, |_, c| {
            if c == cluster {
                found = prev;
                return false;
            }
            prev = Some(c);
            true
        })?;
        Ok(found)
    }

    /// 链的最后一个簇；空链返回 None
    pub fn last_in_chain(&self, head: u32) -> Result<Option<u32>, FsError> {
        let mut last = None;
        self.walk(head, |_, c| {
            last = Some(c);
            true
        })?;
        Ok(last)
    }

    /// 链上的全部簇，按链顺序
    pub fn chain(&self, head: u32) -> Result<Vec<u32>, FsError> {
        let mut clusters = Vec::new();
        self.walk(head, |_, c| {
            clusters.push(c);
            true
        })?;
        Ok(clusters)
    }

    /// 链长
    pub fn chain_len(&self, head: u32) -> Result<usize, FsError> {
        let mut len = 0;
        self.walk(head, |i, _| {
            len = i + 1;
            true
        })?;
        Ok(len)
    }

    /// 链上第 `n` 个簇（从 0 开始）
    pub fn nth_cluster(&self, head: u32, n: usize) -> Result<Option<u32>, FsError> {
        let mut found = None;
        self.walk(head, |i, c| {
            if i == n {
                found = Some(c);
                return false;
            }
            true
        })?;
        Ok(found)
    }

    /// 已占用的数据簇数
    pub fn used_cluster_count(&self) -> Result<usize, FsError> {
        let per_sector = self.entries_per_sector();
        let limit = self.geometry.cluster_limit as usize;
        let mut buf = vec![0u8; self.geometry.bytes_per_sector];
        let mut used = 0;
        for sector in 0..limit.div_ceil(per_sector) {
            read_sectors(&*self.device, self.geometry.fat_start + sector, &mut buf)?;
            for slot in 0..per_sector {
                let cluster = sector * per_sector + slot;
                if cluster < CLUSTER_FIRST_DATA as usize {
                    continue;
                }
                if cluster >= limit {
                    break;
                }
                if le32(&buf, slot * ENTRY_SIZE) & CLUSTER_MASK != CLUSTER_UNUSED {
                    used += 1;
                }
            }
        }
        Ok(used)
    }

    /// 几何参数
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::RamDisk;
    use test_support::init_arch_ops;

    fn table() -> (Arc<RamDisk>, ClusterTable) {
        init_arch_ops();
        let disk = RamDisk::new(128 * 512, 512, 0);
        let geometry = Geometry {
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            fat_start: 1,
            fat_size: 1,
            fat_copies: 2,
            data_start: 3,
            cluster_limit: 64,
        };
        let device: Arc<dyn BlockDriver> = disk.clone();
        (disk, ClusterTable::new(device, geometry))
    }

    #[test]
    fn test_alloc_is_sequential_and_mirrored() {
        let (disk, table) = table();
        assert_eq!(table.alloc_cluster().unwrap(), 2);
        assert_eq!(table.alloc_cluster().unwrap(), 3);
        let raw = disk.raw_data();
        assert_eq!(&raw[512 + 8..512 + 12], &[0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(&raw[1024 + 8..1024 + 12], &[0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(table.used_cluster_count().unwrap(), 2);
    }

    #[test]
    fn test_set_next_keeps_reserved_bits() {
        let (disk, table) = table();
        let mut raw = disk.raw_data();
        raw[512 + 20..512 + 24].copy_from_slice(&0xA000_0000u32.to_le_bytes());
        let disk = RamDisk::from_bytes(raw, 512, 0);
        let table = ClusterTable::new(disk.clone(), *table.geometry());
        table.set_next(5, 9).unwrap();
        assert_eq!(table.get_next(5).unwrap(), 9);
        assert_eq!(&disk.raw_data()[512 + 20..512 + 24], &0xA000_0009u32.to_le_bytes());
    }

    #[test]
    fn test_chain_walks() {
        let (_disk, table) = table();
        let a = table.alloc_cluster().unwrap();
        let b = table.alloc_cluster().unwrap();
        let c = table.alloc_cluster().unwrap();
        table.set_next(a, b).unwrap();
        table.set_next(b, c).unwrap();
        assert_eq!(table.chain_len(a).unwrap(), 3);
        assert_eq!(table.chain(a).unwrap(), [a, b, c]);
        assert_eq!(table.last_in_chain(a).unwrap(), Some(c));
        assert_eq!(table.nth_cluster(a, 1).unwrap(), Some(b));
        assert_eq!(table.nth_cluster(a, 3).unwrap(), None);
        assert_eq!(table.get_prev(a, c).unwrap(), Some(b));
        assert_eq!(table.get_prev(a, a).unwrap(), None);
        assert_eq!(table.free_chain(a).unwrap(), 3);
        assert_eq!(table.used_cluster_count().unwrap(), 0);
    }

    #[test]
    fn test_free_chain_survives_cycle() {
        let (_disk, table) = table();
        let a = table.alloc_cluster().unwrap();
        let b = table.alloc_cluster().unwrap();
        table.set_next(a, b).unwrap();
        table.set_next(b, a).unwrap();
        assert_eq!(table.chain_len(a).unwrap(), 64);
        assert_eq!(table.free_chain(a).unwrap(), 2);
    }

    #[test]
    fn test_full_volume() {
        let (_disk, table) = table();
        for _ in 2..64 {
            table.alloc_cluster().unwrap();
        }
        assert_eq!(table.alloc_cluster(), Err(FsError::NoSpace));
        assert!(table.is_allocated(63).unwrap());
        assert_eq!(table.get_next(64), Err(FsError::InvalidArgument));
    }
}
