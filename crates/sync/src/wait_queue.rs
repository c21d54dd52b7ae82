//! 等待队列
//!
//! 每个可能阻塞的资源持有自己的 FIFO 等待队列，队列中只保存任务句柄。
//! 任务的挂起与唤醒通过显式传入的 [`Scheduler`] 完成。

use alloc::collections::VecDeque;

use crate::SpinLock;

/// 任务句柄
pub type TaskId = usize;

/// 调度器提供的阻塞原语
///
/// `wake` 可能先于对应任务的 `suspend_current` 到达（唤醒者在睡眠者
/// 释放资源锁之后、真正挂起之前运行）；此时下一次 `suspend_current`
/// 必须立即返回，否则会丢失唤醒。
pub trait Scheduler: Send + Sync {
    /// 当前任务的句柄
    fn current_task(&self) -> TaskId;

    /// 挂起当前任务，直到被 `wake`
    fn suspend_current(&self);

    /// 将任务重新放回就绪队列
    fn wake(&self, task: TaskId);
}

/// FIFO 等待队列
#[derive(Debug, Default)]
pub struct WaitQueue {
    waiters: SpinLock<VecDeque<TaskId>>,
}

impl WaitQueue {
    /// 创建空队列
    pub const fn new() -> Self {
        Self {
            waiters: SpinLock::new(VecDeque::new()),
        }
    }

    /// 把当前任务挂到队尾，释放 `guard`，然后挂起
    ///
    /// `guard` 通常是资源自身的锁守卫：入队发生在释放锁之前，
    /// 因此在检查条件与入队之间不会错过另一端的唤醒。
    /// 返回后调用方应重新获取锁并再次检查条件。
    pub fn sleep<G>(&self, sched: &dyn Scheduler, guard: G) {
        let current = sched.current_task();
        {
            let mut waiters = self.waiters.lock();
            if !waiters.contains(&current) {
                waiters.push_back(current);
            }
        }
        drop(guard);
        sched.suspend_current();
    }

    /// 唤醒队首任务；队列为空时返回 false
    pub fn wake_one(&self, sched: &dyn Scheduler) -> bool {
        let task = self.waiters.lock().pop_front();
        match task {
            Some(task) => {
                sched.wake(task);
                true
            }
            None => false,
        }
    }

    /// 唤醒全部任务，返回唤醒数量
    pub fn wake_all(&self, sched: &dyn Scheduler) -> usize {
        let drained: VecDeque<TaskId> = core::mem::take(&mut *self.waiters.lock());
        let count = drained.len();
        for task in drained {
            sched.wake(task);
        }
        count
    }

    /// 等待中的任务数量
    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    /// 队列是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
