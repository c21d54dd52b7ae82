//! /proc/volumes 生成器

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Write;

use sync::SpinLock;
use vfs::FsError;

use crate::fat32::Fat32Volume;
use crate::proc::ContentGenerator;

/// 已挂载的卷及其用量
///
/// 内核每挂载一个卷就调用一次 [`VolumesGenerator::add`]。
#[derive(Default)]
pub struct VolumesGenerator {
    volumes: SpinLock<Vec<(String, Arc<Fat32Volume>)>>,
}

impl VolumesGenerator {
    /// 空列表
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个挂载在 `/{name}` 的卷
    pub fn add(&self, name: &str, volume: Arc<Fat32Volume>) {
        self.volumes.lock().push((String::from(name), volume));
    }

    /// 移除挂载名为 `name` 的卷
    pub fn remove(&self, name: &str) {
        self.volumes.lock().retain(|(n, _)| n != name);
    }
}

impl ContentGenerator for VolumesGenerator {
    fn generate(&self) -> Result<Vec<u8>, FsError> {
        let volumes = self.volumes.lock().clone();
        let mut content = String::new();
        for (name, volume) in volumes {
            let _ = writeln!(
                content,
                "/{} [{}] label '{}', used {} of {} bytes",
                name,
                volume.fat_type(),
                volume.label(),
                volume.used_space_in_bytes()?,
                volume.size_in_bytes()
            );
        }
        Ok(content.into_bytes())
    }
}
