//! 内存模拟块设备

use super::BlockDriver;
use crate::driver::{DeviceType, Driver};
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use sync::SpinLock;

/// 内存模拟的块设备
///
/// 用于测试和开发。可以注入写失败，用来验证上层在 I/O 错误时的行为。
pub struct RamDisk {
    data: SpinLock<Vec<u8>>,
    sector_size: usize,
    device_id: usize,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl RamDisk {
    /// 创建指定大小的内存磁盘
    pub fn new(size: usize, sector_size: usize, device_id: usize) -> Arc<Self> {
        Self::from_bytes(vec![0u8; size], sector_size, device_id)
    }

    /// 从字节数组创建
    pub fn from_bytes(data: Vec<u8>, sector_size: usize, device_id: usize) -> Arc<Self> {
        Arc::new(Self {
            data: SpinLock::new(data),
            sector_size,
            device_id,
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        })
    }

    /// 获取原始数据（用于调试）
    pub fn raw_data(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// 获取设备 ID
    pub fn device_id(&self) -> usize {
        self.device_id
    }

    /// 之后的写操作全部失败
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// 成功写入的次数
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn range(&self, lba: usize, len: usize, total: usize) -> Option<core::ops::Range<usize>> {
        if len == 0 || len % self.sector_size != 0 {
            return None;
        }
        let start = lba.checked_mul(self.sector_size)?;
        let end = start.checked_add(len)?;
        (end <= total).then_some(start..end)
    }
}

impl Driver for RamDisk {
    fn try_handle_interrupt(&self, _irq: Option<usize>) -> bool {
        false
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::Block
    }

    fn get_id(&self) -> String {
        alloc::format!("ramdisk_{}", self.device_id)
    }

    fn as_block_arc(self: Arc<Self>) -> Option<Arc<dyn BlockDriver>> {
        Some(self)
    }
}

impl BlockDriver for RamDisk {
    fn read_sector(&self, lba: usize, buf: &mut [u8]) -> bool {
        let data = self.data.lock();
        match self.range(lba, buf.len(), data.len()) {
            Some(range) => {
                buf.copy_from_slice(&data[range]);
                true
            }
            None => false,
        }
    }

    fn write_sector(&self, lba: usize, buf: &[u8]) -> bool {
        if self.fail_writes.load(Ordering::Relaxed) {
            return false;
        }
        let mut data = self.data.lock();
        let total = data.len();
        match self.range(lba, buf.len(), total) {
            Some(range) => {
                data[range].copy_from_slice(buf);
                self.writes.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn total_sectors(&self) -> usize {
        self.data.lock().len() / self.sector_size
    }
}
