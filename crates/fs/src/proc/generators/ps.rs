//! /proc/ps 生成器

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Write;

use crate::ops::SystemInfo;
use crate::proc::ContentGenerator;
use vfs::FsError;

/// 任务列表，每个任务一行
pub struct ProcessListGenerator {
    system: Arc<dyn SystemInfo>,
}

impl ProcessListGenerator {
    /// 从 `system` 读取任务列表
    pub fn new(system: Arc<dyn SystemInfo>) -> Self {
        Self { system }
    }
}

impl ContentGenerator for ProcessListGenerator {
    fn generate(&self) -> Result<Vec<u8>, FsError> {
        let mut content = String::new();
        for (i, task) in self.system.tasks().iter().enumerate() {
            let _ = writeln!(
                content,
                "{}. [{}] [{}] {}, tid {}",
                i,
                if task.is_user { "USER" } else { "KERN" },
                task.state.name(),
                task.name,
                task.tid
            );
        }
        Ok(content.into_bytes())
    }
}
