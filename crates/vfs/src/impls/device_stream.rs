//! 设备流
//!
//! 驱动在中断回调中把定长记录压入一个小环形队列（例如键盘扫描码），
//! 用户读取时按整条记录取出。读从不阻塞，队列满时丢弃最旧的记录。

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::sync::atomic::{AtomicUsize, Ordering};

use sync::SpinLock;

use crate::{FsError, NodeKind, VfsNode};

/// 设备流节点
pub struct DeviceStream {
    name: String,
    record_size: usize,
    depth: usize,
    records: SpinLock<VecDeque<Vec<u8>>>,
    dropped: AtomicUsize,
}

impl DeviceStream {
    /// 创建设备流
    ///
    /// `record_size` 与 `depth` 为 0 时返回 `InvalidArgument`。
    pub fn new(name: &str, record_size: usize, depth: usize) -> Result<Arc<Self>, FsError> {
        if record_size == 0 || depth == 0 {
            return Err(FsError::InvalidArgument);
        }
        Ok(Arc::new(Self {
            name: String::from(name),
            record_size,
            depth,
            records: SpinLock::new(VecDeque::with_capacity(depth)),
            dropped: AtomicUsize::new(0),
        }))
    }

    /// 驱动回调：压入一条记录
    pub fn push(&self, record: &[u8]) -> Result<(), FsError> {
        if record.len() != self.record_size {
            return Err(FsError::InvalidArgument);
        }
        let mut records = self.records.lock();
        if records.len() == self.depth {
            records.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        records.push_back(record.to_vec());
        Ok(())
    }

    /// 单条记录的字节数
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// 因队列满而丢弃的记录数
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl VfsNode for DeviceStream {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Device
    }

    fn size(&self) -> Result<u64, FsError> {
        Ok((self.records.lock().len() * self.record_size) as u64)
    }

    fn read(&self, _position: u64, buf: &mut [u8]) -> Result<usize, FsError> {
        if buf.len() < self.record_size {
            return Err(FsError::InvalidArgument);
        }
        let mut records = self.records.lock();
        let mut copied = 0;
        for chunk in buf.chunks_exact_mut(self.record_size) {
            let Some(record) = records.pop_front() else {
                break;
            };
            chunk.copy_from_slice(&record);
            copied += self.record_size;
        }
        Ok(copied)
    }

    fn write(&self, _position: u64, buf: &[u8]) -> Result<usize, FsError> {
        if buf.is_empty() || buf.len() % self.record_size != 0 {
            return Err(FsError::InvalidArgument);
        }
        for record in buf.chunks_exact(self.record_size) {
            self.push(record)?;
        }
        Ok(buf.len())
    }

    fn seekable(&self) -> bool {
        false
    }

    /// 只接受 0，兼容“先 seek(0) 再写入”的驱动写法
    fn seek(&self, position: u64) -> Result<u64, FsError> {
        if position == 0 {
            Ok(0)
        } else {
            Err(FsError::InvalidOperation)
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::init_arch_ops;

    #[test]
    fn test_reads_whole_records_only() {
        init_arch_ops();
        let kbd = DeviceStream::new("keyboard", 2, 4).unwrap();
        kbd.push(&[1, 2]).unwrap();
        kbd.push(&[3, 4]).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(kbd.read(0, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[1, 2]);
        let mut small = [0u8; 1];
        assert_eq!(kbd.read(0, &mut small), Err(FsError::InvalidArgument));
    }

    #[test]
    fn test_empty_read_returns_zero() {
        init_arch_ops();
        let kbd = DeviceStream::new("keyboard", 1, 4).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(kbd.read(0, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        init_arch_ops();
        let kbd = DeviceStream::new("keyboard", 1, 2).unwrap();
        assert_eq!(kbd.write(0, &[1, 2, 3]).unwrap(), 3);
        assert_eq!(kbd.dropped(), 1);
        let mut buf = [0u8; 4];
        assert_eq!(kbd.read(0, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[2, 3]);
    }

    #[test]
    fn test_bad_record_length() {
        init_arch_ops();
        let kbd = DeviceStream::new("mouse", 3, 2).unwrap();
        assert_eq!(kbd.push(&[1]), Err(FsError::InvalidArgument));
        assert_eq!(kbd.write(0, &[1, 2]), Err(FsError::InvalidArgument));
        assert!(DeviceStream::new("bad", 0, 1).is_err());
    }
}
