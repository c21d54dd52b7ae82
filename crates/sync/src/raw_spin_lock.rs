//! 原始自旋锁
//!
//! 只保护一个标志位，不携带数据。持锁期间本地中断关闭。

use crate::intr_guard::IntrGuard;
use core::{
    hint,
    sync::atomic::{AtomicBool, Ordering},
};

/// 原始自旋锁，不可重入
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
}

impl RawSpinLock {
    /// 创建未上锁的自旋锁
    pub const fn new() -> Self {
        RawSpinLock {
            locked: AtomicBool::new(false),
        }
    }

    /// 关中断后自旋直到拿到锁
    pub fn lock(&self) -> RawSpinLockGuard<'_> {
        let intr = IntrGuard::new();
        while !self.try_acquire() {
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
        RawSpinLockGuard { lock: self, _intr: intr }
    }

    /// 尝试一次，失败时立即恢复中断状态
    pub fn try_lock(&self) -> Option<RawSpinLockGuard<'_>> {
        let intr = IntrGuard::new();
        self.try_acquire()
            .then_some(RawSpinLockGuard { lock: self, _intr: intr })
    }

    /// 锁当前是否被占用
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII 保护器：先释放锁标志，再由 IntrGuard 恢复中断
pub struct RawSpinLockGuard<'a> {
    lock: &'a RawSpinLock,
    _intr: IntrGuard,
}

impl Drop for RawSpinLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
