//! 内存命名管道
//!
//! 固定容量的环形字节缓冲区。读空时阻塞读者，写满时阻塞写者，
//! 阻塞通过两条 [`WaitQueue`] 完成。

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;

use sync::{Scheduler, SpinLock, WaitQueue};

use crate::{FsError, NodeKind, VfsNode};

/// 内存命名管道
pub struct RamFifo {
    name: String,
    buffer: SpinLock<VecDeque<u8>>,
    capacity: usize,
    readers: WaitQueue,
    writers: WaitQueue,
    scheduler: Arc<dyn Scheduler>,
}

impl RamFifo {
    /// 默认容量（字节）
    pub const DEFAULT_CAPACITY: usize = 512;

    /// 创建管道；容量为 0 时使用默认值
    pub fn new(name: &str, capacity: usize, scheduler: Arc<dyn Scheduler>) -> Arc<Self> {
        let capacity = if capacity == 0 {
            Self::DEFAULT_CAPACITY
        } else {
            capacity
        };
        Arc::new(Self {
            name: String::from(name),
            buffer: SpinLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            readers: WaitQueue::new(),
            writers: WaitQueue::new(),
            scheduler,
        })
    }

    /// 缓冲区容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 阻塞在读端的任务数
    pub fn blocked_readers(&self) -> usize {
        self.readers.len()
    }

    /// 阻塞在写端的任务数
    pub fn blocked_writers(&self) -> usize {
        self.writers.len()
    }
}

impl VfsNode for RamFifo {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Pipe
    }

    fn size(&self) -> Result<u64, FsError> {
        Ok(self.buffer.lock().len() as u64)
    }

    /// 至少读到一个字节才返回
    fn read(&self, _position: u64, buf: &mut [u8]) -> Result<usize, FsError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let sched = &*self.scheduler;
        loop {
            let mut buffer = self.buffer.lock();
            if buffer.is_empty() {
                self.readers.sleep(sched, buffer);
                continue;
            }
            let n = buf.len().min(buffer.len());
            for (dst, src) in buf.iter_mut().zip(buffer.drain(..n)) {
                *dst = src;
            }
            let more = !buffer.is_empty();
            drop(buffer);
            self.writers.wake_one(sched);
            if more {
                self.readers.wake_one(sched);
            }
            return Ok(n);
        }
    }

    /// 写完全部字节才返回
    fn write(&self, _position: u64, buf: &[u8]) -> Result<usize, FsError> {
        let sched = &*self.scheduler;
        let mut written = 0;
        while written < buf.len() {
            let mut buffer = self.buffer.lock();
            let space = self.capacity - buffer.len();
            if space == 0 {
                self.writers.sleep(sched, buffer);
                continue;
            }
            let n = space.min(buf.len() - written);
            buffer.extend(&buf[written..written + n]);
            let room_left = buffer.len() < self.capacity;
            drop(buffer);
            written += n;
            self.readers.wake_one(sched);
            if room_left && written == buf.len() {
                self.writers.wake_one(sched);
            }
        }
        Ok(written)
    }

    fn seekable(&self) -> bool {
        false
    }

    fn seek(&self, _position: u64) -> Result<u64, FsError> {
        Err(FsError::InvalidOperation)
    }

    /// 只支持清空
    fn truncate(&self, size: u64) -> Result<(), FsError> {
        if size != 0 {
            return Err(FsError::InvalidArgument);
        }
        self.buffer.lock().clear();
        self.writers.wake_all(&*self.scheduler);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
