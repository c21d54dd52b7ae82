//! os 集成测试的公共构件

#![allow(dead_code)]

use std::sync::Arc;

use device::{BlockDriver, RamDisk};
use fs::{FormatOptions, SystemInfo, TaskInfo, TaskState};
use fs::fat32::format;
use os::{KernelConfig, KernelContext};
use test_support::{ThreadScheduler, init_arch_ops};

/// 固定的任务列表与页帧计数
pub struct MockSystem;

impl SystemInfo for MockSystem {
    fn tasks(&self) -> Vec<TaskInfo> {
        vec![
            TaskInfo {
                tid: 1,
                name: String::from("init"),
                is_user: false,
                state: TaskState::Running,
            },
            TaskInfo {
                tid: 7,
                name: String::from("shell"),
                is_user: true,
                state: TaskState::Blocked,
            },
        ]
    }

    fn total_frames(&self) -> usize {
        4096
    }

    fn used_frames(&self) -> usize {
        321
    }
}

/// 以给定配置启动的上下文
pub fn context_with(config: KernelConfig) -> Arc<KernelContext> {
    init_arch_ops();
    let ctx = KernelContext::new(
        config,
        Arc::new(ThreadScheduler::new()),
        Arc::new(MockSystem),
    )
    .unwrap();
    Arc::new(ctx)
}

/// 默认配置启动的上下文
pub fn context() -> Arc<KernelContext> {
    context_with(KernelConfig::default())
}

/// 格式化好的 4 MiB 内存盘
pub fn fat32_disk() -> Arc<dyn BlockDriver> {
    init_arch_ops();
    let disk = RamDisk::new(8192 * 512, 512, 0);
    format(&*disk, 0, 0, &FormatOptions::default()).unwrap();
    disk
}

/// 一次性读完信息文件
pub fn read_info(ctx: &KernelContext, path: &str) -> String {
    let ns = ctx.namespace();
    let fd = ns.open(path).unwrap();
    let mut buf = vec![0u8; 4096];
    let n = ns.read(fd, &mut buf).unwrap();
    ns.close(fd).unwrap();
    String::from_utf8(buf[..n].to_vec()).unwrap()
}
