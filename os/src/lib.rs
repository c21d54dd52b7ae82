//! # SanktaOS 内核核心
//!
//! 把各个 crate 组装成一个可以启动的内核：
//!
//! - **[config]**: 启动配置与命令行解析
//! - **[context]**: [`KernelContext`]，持有命名空间、卷和设备节点
//! - **[kmsg]**: 内核日志的信息文件
//! - **[syscall]**: 文件系统调用
//!
//! 中断分发、调度器和设备驱动位于本 crate 之外，分别通过
//! [`sync::ArchOps`]、[`sync::Scheduler`] 和 [`device::BlockDriver`] 接入。

#![no_std]

extern crate alloc;

pub mod config;
pub mod context;
pub mod kmsg;
pub mod syscall;

pub use config::KernelConfig;
pub use context::KernelContext;
pub use syscall::{SyscallRequest, dispatch};
