//! 数据区：簇内字节读写与目录槽操作

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use device::BlockDriver;
use vfs::FsError;

use super::entry::{Fat32Entry, SLOT_NO_MORE, SLOT_SIZE, SLOT_UNUSED, SlotAddr, SlotState};
use super::layout::Geometry;
use super::{CLUSTER_FIRST_DATA, read_sectors, write_sectors};

/// 单簇枚举的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerateResult {
    /// 遇到目录结束标记
    Finished,
    /// 访问者要求停止
    Stopped,
    /// 本簇走完，目录可能在下一簇继续
    Continue,
}

/// 簇内第一个可用槽
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeSlot {
    /// 本簇没有可用槽
    NotFound,
    /// 已删除的槽
    Unused(SlotAddr),
    /// 目录结束标记所在的槽
    NoMore(SlotAddr),
}

/// 数据区访问
pub struct ClusterData {
    device: Arc<dyn BlockDriver>,
    geometry: Geometry,
}

impl ClusterData {
    /// 在给定几何参数上打开数据区
    pub fn new(device: Arc<dyn BlockDriver>, geometry: Geometry) -> Self {
        Self { device, geometry }
    }

    /// 簇的第一个扇区
    pub fn cluster_lba(&self, cluster: u32) -> Result<usize, FsError> {
        if !self.geometry.is_data_cluster(cluster) {
            return Err(FsError::InvalidArgument);
        }
        Ok(self.geometry.data_start
            + (cluster - CLUSTER_FIRST_DATA) as usize * self.geometry.sectors_per_cluster)
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<(), FsError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.geometry.cluster_size() => Ok(()),
            _ => Err(FsError::InvalidArgument),
        }
    }

    /// 从簇内 `offset` 处读取 `buf.len()` 字节
    pub fn read_bytes(&self, cluster: u32, offset: usize, buf: &mut [u8]) -> Result<(), FsError> {
        self.check_range(offset, buf.len())?;
        let bps = self.geometry.bytes_per_sector;
        let base = self.cluster_lba(cluster)?;
        let mut sector = vec![0u8; bps];
        let mut done = 0;
        while done < buf.len() {
            let pos = offset + done;
            let in_sector = pos % bps;
            let chunk = (bps - in_sector).min(buf.len() - done);
            read_sectors(&*self.device, base + pos / bps, &mut sector)?;
            buf[done..done + chunk].copy_from_slice(&sector[in_sector..in_sector + chunk]);
            done += chunk;
        }
        Ok(())
    }

    /// 向簇内 `offset` 处写入 `buf`，不足一扇区的部分先读后写
    pub fn write_bytes(&self, cluster: u32, offset: usize, buf: &[u8]) -> Result<(), FsError> {
        self.check_range(offset, buf.len())?;
        let bps = self.geometry.bytes_per_sector;
        let base = self.cluster_lba(cluster)?;
        let mut sector = vec![0u8; bps];
        let mut done = 0;
        while done < buf.len() {
            let pos = offset + done;
            let in_sector = pos % bps;
            let chunk = (bps - in_sector).min(buf.len() - done);
            let lba = base + pos / bps;
            if chunk == bps {
                write_sectors(&*self.device, lba, &buf[done..done + chunk])?;
            } else {
                read_sectors(&*self.device, lba, &mut sector)?;
                sector[in_sector..in_sector + chunk].copy_from_slice(&buf[done..done + chunk]);
                write_sectors(&*self.device, lba, &sector)?;
            }
            done += chunk;
        }
        Ok(())
    }

    /// 整簇清零；槽 0 随之成为目录结束标记
    pub fn clear_cluster(&self, cluster: u32) -> Result<(), FsError> {
        let zeros = vec![0u8; self.geometry.cluster_size()];
        write_sectors(&*self.device, self.cluster_lba(cluster)?, &zeros)
    }

    // ========== 槽寻址 ==========

    /// 簇内第 `n` 个槽的地址
    pub fn slot_addr(&self, cluster: u32, n: usize) -> SlotAddr {
        let per_sector = self.geometry.slots_per_sector();
        SlotAddr {
            cluster,
            sector: (n / per_sector) as u32,
            index: (n % per_sector) as u32,
        }
    }

    /// 槽在簇内的序号
    pub fn slot_number(&self, addr: SlotAddr) -> usize {
        addr.sector as usize * self.geometry.slots_per_sector() + addr.index as usize
    }

    /// 同一簇内的下一个槽；已是最后一个时返回 None
    pub fn next_slot(&self, addr: SlotAddr) -> Option<SlotAddr> {
        let n = self.slot_number(addr) + 1;
        (n < self.geometry.slots_per_cluster()).then(|| self.slot_addr(addr.cluster, n))
    }

    fn slot_offset(&self, addr: SlotAddr) -> usize {
        self.slot_number(addr) * SLOT_SIZE
    }

    // ========== 槽读写 ==========

    /// 读取并解码一个槽
    pub fn read_slot(&self, addr: SlotAddr) -> Result<SlotState, FsError> {
        let mut raw = [0u8; SLOT_SIZE];
        self.read_bytes(addr.cluster, self.slot_offset(addr), &mut raw)?;
        Ok(Fat32Entry::decode(&raw, addr))
    }

    /// 把条目写入槽
    pub fn write_slot(&self, addr: SlotAddr, entry: &Fat32Entry) -> Result<(), FsError> {
        self.write_bytes(addr.cluster, self.slot_offset(addr), &entry.encode())
    }

    fn write_marker(&self, addr: SlotAddr, marker: u8) -> Result<(), FsError> {
        self.write_bytes(addr.cluster, self.slot_offset(addr), &[marker])
    }

    /// 标记为目录结束
    pub fn mark_slot_no_more(&self, addr: SlotAddr) -> Result<(), FsError> {
        self.write_marker(addr, SLOT_NO_MORE)
    }

    /// 标记为已删除
    pub fn mark_slot_unused(&self, addr: SlotAddr) -> Result<(), FsError> {
        self.write_marker(addr, SLOT_UNUSED)
    }

    /// 把同簇内的下一个槽标记为目录结束；`addr` 已是最后一个槽时什么也不做
    pub fn mark_next_slot_no_more(&self, addr: SlotAddr) -> Result<(), FsError> {
        match self.next_slot(addr) {
            Some(next) => self.mark_slot_no_more(next),
            None => Ok(()),
        }
    }

    // ========== 槽扫描 ==========

    fn read_cluster(&self, cluster: u32) -> Result<Vec<u8>, FsError> {
        let mut buf = vec![0u8; self.geometry.cluster_size()];
        read_sectors(&*self.device, self.cluster_lba(cluster)?, &mut buf)?;
        Ok(buf)
    }

    /// 从第 `from` 个槽开始按顺序访问簇内的槽，直到目录结束标记
    ///
    /// `visit` 看到的是原始槽状态（包括已删除槽），返回 false 时停止。
    pub fn scan_slots(
        &self,
        cluster: u32,
        from: usize,
        mut visit: impl FnMut(SlotAddr, SlotState) -> bool,
    ) -> Result<EnumerateResult, FsError> {
        let buf = self.read_cluster(cluster)?;
        for n in from..self.geometry.slots_per_cluster() {
            let addr = self.slot_addr(cluster, n);
            let raw = &buf[n * SLOT_SIZE..(n + 1) * SLOT_SIZE];
            let state = Fat32Entry::decode(raw, addr);
            if state == SlotState::NoMore {
                return Ok(EnumerateResult::Finished);
            }
            if !visit(addr, state) {
                return Ok(EnumerateResult::Stopped);
            }
        }
        Ok(EnumerateResult::Continue)
    }

    /// 枚举簇内的可见条目
    ///
    /// 已删除槽、长文件名记录、卷标和 `.`/`..` 被跳过。
    pub fn enumerate_cluster(
        &self,
        cluster: u32,
        mut visit: impl FnMut(Fat32Entry) -> bool,
    ) -> Result<EnumerateResult, FsError> {
        self.scan_slots(cluster, 0, |_, state| match state {
            SlotState::Live(entry) if !entry.is_hidden_record() => visit(entry),
            _ => true,
        })
    }

    /// 簇内第一个已删除槽或目录结束槽
    pub fn find_free_slot(&self, cluster: u32) -> Result<FreeSlot, FsError> {
        let buf = self.read_cluster(cluster)?;
        for n in 0..self.geometry.slots_per_cluster() {
            match buf[n * SLOT_SIZE] {
                SLOT_UNUSED => return Ok(FreeSlot::Unused(self.slot_addr(cluster, n))),
                SLOT_NO_MORE => return Ok(FreeSlot::NoMore(self.slot_addr(cluster, n))),
                _ => {}
            }
        }
        Ok(FreeSlot::NotFound)
    }

    /// 簇内在目录结束之前是否没有任何有效槽
    pub fn is_cluster_empty(&self, cluster: u32) -> Result<bool, FsError> {
        let mut live = false;
        self.scan_slots(cluster, 0, |_, state| {
            live = matches!(state, SlotState::Live(_));
            !live
        })?;
        Ok(!live)
    }

    /// 几何参数
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat32::name::ShortName;
    use device::RamDisk;
    use test_support::init_arch_ops;

    fn data() -> (Arc<RamDisk>, ClusterData) {
        init_arch_ops();
        let disk = RamDisk::new(64 * 512, 512, 0);
        let geometry = Geometry {
            bytes_per_sector: 512,
            sectors_per_cluster: 2,
            fat_start: 1,
            fat_size: 1,
            fat_copies: 1,
            data_start: 2,
            cluster_limit: 20,
        };
        let device: Arc<dyn BlockDriver> = disk.clone();
        (disk, ClusterData::new(device, geometry))
    }

    fn entry(name: &str) -> Fat32Entry {
        Fat32Entry::new(ShortName::parse(name).unwrap(), false)
    }

    #[test]
    fn test_unaligned_bytes_cross_sector() {
        let (disk, data) = data();
        let payload: Vec<u8> = (0..100u8).collect();
        data.write_bytes(3, 480, &payload).unwrap();
        let mut back = [0u8; 100];
        data.read_bytes(3, 480, &mut back).unwrap();
        assert_eq!(&back[..], &payload[..]);
        // 簇 3 从扇区 2 + 2 开始
        assert_eq!(disk.raw_data()[4 * 512 + 480], 0);
        assert_eq!(disk.raw_data()[4 * 512 + 481], 1);
        assert_eq!(data.write_bytes(3, 1000, &payload), Err(FsError::InvalidArgument));
    }

    #[test]
    fn test_slot_lifecycle() {
        let (_disk, data) = data();
        data.clear_cluster(2).unwrap();
        assert!(data.is_cluster_empty(2).unwrap());
        let first = data.slot_addr(2, 0);
        assert_eq!(data.find_free_slot(2).unwrap(), FreeSlot::NoMore(first));

        data.write_slot(first, &entry("a.txt")).unwrap();
        data.write_slot(data.slot_addr(2, 1), &entry("b.txt")).unwrap();
        assert!(!data.is_cluster_empty(2).unwrap());
        assert_eq!(
            data.find_free_slot(2).unwrap(),
            FreeSlot::NoMore(data.slot_addr(2, 2))
        );

        data.mark_slot_unused(first).unwrap();
        assert_eq!(data.find_free_slot(2).unwrap(), FreeSlot::Unused(first));
        let mut seen = Vec::new();
        let result = data
            .enumerate_cluster(2, |e| {
                seen.push(e.name.display());
                true
            })
            .unwrap();
        assert_eq!(result, EnumerateResult::Finished);
        assert_eq!(seen, ["B.TXT"]);
    }

    #[test]
    fn test_full_cluster_continues() {
        let (_disk, data) = data();
        let slots = data.geometry().slots_per_cluster();
        for n in 0..slots {
            data.write_slot(data.slot_addr(5, n), &entry("f")).unwrap();
        }
        assert_eq!(data.find_free_slot(5).unwrap(), FreeSlot::NotFound);
        assert_eq!(
            data.enumerate_cluster(5, |_| true).unwrap(),
            EnumerateResult::Continue
        );
        assert_eq!(
            data.enumerate_cluster(5, |_| false).unwrap(),
            EnumerateResult::Stopped
        );
        let last = data.slot_addr(5, slots - 1);
        assert_eq!(data.next_slot(last), None);
        data.mark_next_slot_no_more(last).unwrap();
        assert_eq!(data.find_free_slot(5).unwrap(), FreeSlot::NotFound);
    }
}
