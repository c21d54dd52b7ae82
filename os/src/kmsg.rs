//! /proc/kmsg 生成器

use alloc::sync::Arc;
use alloc::vec::Vec;

use fs::ContentGenerator;
use klog::KernelLogger;
use vfs::FsError;

/// 把日志缓冲区渲染为文本
pub struct KmsgGenerator {
    logger: Arc<KernelLogger>,
}

impl KmsgGenerator {
    /// 读取 `logger` 的缓冲区
    pub fn new(logger: Arc<KernelLogger>) -> Self {
        Self { logger }
    }
}

impl ContentGenerator for KmsgGenerator {
    fn generate(&self) -> Result<Vec<u8>, FsError> {
        Ok(self.logger.render().into_bytes())
    }
}
