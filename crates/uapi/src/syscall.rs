//! 文件系统相关的系统调用号
//!
//! 前几项与 x86_64 Linux 保持一致，目录枚举使用私有编号。

pub const SYS_READ: usize = 0;
pub const SYS_WRITE: usize = 1;
pub const SYS_OPEN: usize = 2;
pub const SYS_CLOSE: usize = 3;
pub const SYS_LSEEK: usize = 8;
pub const SYS_FTRUNCATE: usize = 77;
pub const SYS_RENAME: usize = 82;
pub const SYS_MKDIR: usize = 83;
pub const SYS_RMDIR: usize = 84;
pub const SYS_CREAT: usize = 85;
pub const SYS_UNLINK: usize = 87;

/// 枚举目录项，参数为 (fd, *mut FsEntry, max)
pub const SYS_FILE_ENUMERATE: usize = 600;
