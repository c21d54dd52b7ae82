//! /proc/meminfo 生成器

use alloc::sync::Arc;
use alloc::{format, vec::Vec};

use crate::ops::SystemInfo;
use crate::proc::ContentGenerator;
use vfs::FsError;

/// `/proc/meminfo` 内容生成器
pub struct MeminfoGenerator {
    system: Arc<dyn SystemInfo>,
}

impl MeminfoGenerator {
    /// 从 `system` 读取页帧统计
    pub fn new(system: Arc<dyn SystemInfo>) -> Self {
        Self { system }
    }
}

impl ContentGenerator for MeminfoGenerator {
    fn generate(&self) -> Result<Vec<u8>, FsError> {
        let content = format!(
            "Used frames so far: {}, total available: {}\n",
            self.system.used_frames(),
            self.system.total_frames()
        );
        Ok(content.into_bytes())
    }
}
