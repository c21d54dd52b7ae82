//! 系统信息接口
//!
//! 信息文件需要的任务与内存数据由内核通过 [`SystemInfo`] 提供，
//! 在构造生成器时显式传入。

use alloc::string::String;
use alloc::vec::Vec;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// 可运行
    Running,
    /// 阻塞在某个等待队列上
    Blocked,
}

impl TaskState {
    /// 状态名称
    pub fn name(self) -> &'static str {
        match self {
            TaskState::Running => "RUNNING",
            TaskState::Blocked => "BLOCKED",
        }
    }
}

/// 一个任务的快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    /// 任务 ID
    pub tid: usize,
    /// 任务名
    pub name: String,
    /// 是否运行在用户态
    pub is_user: bool,
    /// 状态
    pub state: TaskState,
}

/// 内核提供的系统信息
pub trait SystemInfo: Send + Sync {
    /// 当前全部任务
    fn tasks(&self) -> Vec<TaskInfo>;

    /// 可用物理页帧总数
    fn total_frames(&self) -> usize;

    /// 已分配的物理页帧数
    fn used_frames(&self) -> usize;
}
