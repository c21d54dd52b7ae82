//! 自旋锁封装
//!
//! 提供对数据的互斥访问。

use core::cell::UnsafeCell;

use crate::raw_spin_lock::{RawSpinLock, RawSpinLockGuard};

/// 保护一份数据的自旋锁
///
/// # 示例
/// ```ignore
/// let lock = SpinLock::new(0);
/// {
///     let mut guard = lock.lock();
///     *guard += 1;
/// } // 离开作用域，自动释放锁
/// ```
///
/// # 注意
/// SpinLock 不可重入，且持锁期间中断关闭，临界区内不能挂起任务。
/// 需要阻塞时应先把自己挂到 [`WaitQueue`](crate::WaitQueue) 上，
/// 再把守卫交给 [`WaitQueue::sleep`](crate::WaitQueue::sleep) 释放。
#[derive(Debug)]
pub struct SpinLock<T> {
    raw: RawSpinLock,
    data: UnsafeCell<T>,
}

impl<T> SpinLock<T> {
    /// 创建 SpinLock
    pub const fn new(data: T) -> Self {
        SpinLock {
            raw: RawSpinLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// 获取锁
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let raw = self.raw.lock();
        SpinLockGuard {
            _raw: raw,
            // SAFETY: 持有 raw 期间只有这一个可变引用
            data: unsafe { &mut *self.data.get() },
        }
    }

    /// 尝试获取锁
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.raw.try_lock().map(|raw| SpinLockGuard {
            _raw: raw,
            // SAFETY: 同 lock()
            data: unsafe { &mut *self.data.get() },
        })
    }

    /// 独占访问时无需加锁
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// 取出内部数据
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// 锁当前是否被占用（调试用）
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// SpinLock 的 RAII 保护器
pub struct SpinLockGuard<'a, T> {
    _raw: RawSpinLockGuard<'a>,
    data: &'a mut T,
}

impl<T> core::ops::Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl<T> core::ops::DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data
    }
}

// Safety: RawSpinLock 保证了对数据的互斥访问
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}
