//! 基于宿主线程的调度器
//!
//! 每个测试线程第一次调用 `current_task` 时获得一个任务句柄；
//! 挂起即 `thread::park`，唤醒即 `unpark`。park/unpark 的令牌语义
//! 正好满足“唤醒先于挂起到达时，挂起立即返回”的要求。

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, Thread};

use sync::{Scheduler, TaskId};

static NEXT_TASK_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static TASK_ID: Cell<Option<TaskId>> = const { Cell::new(None) };
}

/// 线程调度器
#[derive(Default)]
pub struct ThreadScheduler {
    threads: Mutex<HashMap<TaskId, Thread>>,
    wakeups: AtomicUsize,
}

impl ThreadScheduler {
    /// 创建调度器
    pub fn new() -> Self {
        Self::default()
    }

    /// 至今发出的唤醒次数
    pub fn wakeups(&self) -> usize {
        self.wakeups.load(Ordering::Relaxed)
    }

    /// 已登记的任务数
    pub fn task_count(&self) -> usize {
        self.threads.lock().map(|t| t.len()).unwrap_or(0)
    }
}

impl Scheduler for ThreadScheduler {
    fn current_task(&self) -> TaskId {
        let id = TASK_ID.with(|cell| match cell.get() {
            Some(id) => id,
            None => {
                let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
                cell.set(Some(id));
                id
            }
        });
        if let Ok(mut threads) = self.threads.lock() {
            threads.entry(id).or_insert_with(thread::current);
        }
        id
    }

    fn suspend_current(&self) {
        thread::park();
    }

    fn wake(&self, task: TaskId) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
        let thread = self
            .threads
            .lock()
            .ok()
            .and_then(|threads| threads.get(&task).cloned());
        if let Some(thread) = thread {
            thread.unpark();
        }
    }
}
