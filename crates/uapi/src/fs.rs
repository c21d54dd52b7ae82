//! 目录枚举结构
//!
//! `FILE_ENUMERATE` 系统调用向用户缓冲区写入的记录格式。

/// 目录项名称的最大字节数（含结尾 NUL）
pub const FS_ENTRY_NAME_LEN: usize = 256;

/// 目录枚举返回的单条记录
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FsEntry {
    /// 以 NUL 结尾的名称
    pub name: [u8; FS_ENTRY_NAME_LEN],
    /// 是否为目录
    pub is_directory: bool,
    /// 文件大小（字节），目录为 0
    pub size: u64,
}

impl FsEntry {
    /// 空记录
    pub const fn empty() -> Self {
        Self {
            name: [0; FS_ENTRY_NAME_LEN],
            is_directory: false,
            size: 0,
        }
    }

    /// 用给定名称构造记录，超长部分被截断
    pub fn new(name: &str, is_directory: bool, size: u64) -> Self {
        let mut entry = Self::empty();
        entry.set_name(name);
        entry.is_directory = is_directory;
        entry.size = size;
        entry
    }

    /// 写入名称，保证结尾 NUL
    pub fn set_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let len = bytes.len().min(FS_ENTRY_NAME_LEN - 1);
        self.name = [0; FS_ENTRY_NAME_LEN];
        self.name[..len].copy_from_slice(&bytes[..len]);
    }

    /// 名称字节（不含 NUL）
    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FS_ENTRY_NAME_LEN);
        &self.name[..end]
    }

    /// 名称字符串；非 UTF-8 时返回 None
    pub fn name_str(&self) -> Option<&str> {
        core::str::from_utf8(self.name_bytes()).ok()
    }
}

impl Default for FsEntry {
    fn default() -> Self {
        Self::empty()
    }
}
