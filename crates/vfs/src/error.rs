//! VFS 错误类型
//!
//! 存储层与命名空间共用的错误码，可通过 [`FsError::to_errno()`] 转换为系统调用错误码。

use uapi::errno::*;

/// VFS 错误类型
///
/// 各错误码对应标准 POSIX errno 值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    // 文件/目录相关
    /// 文件不存在 (-ENOENT)
    NotFound,
    /// 文件已存在 (-EEXIST)
    AlreadyExists,
    /// 不是目录 (-ENOTDIR)
    NotDirectory,
    /// 是目录 (-EISDIR)
    IsDirectory,
    /// 目录非空 (-ENOTEMPTY)
    DirectoryNotEmpty,

    // 权限相关
    /// 权限被拒绝 (-EPERM)
    PermissionDenied,

    // 文件描述符相关
    /// 无效的文件描述符 (-EBADF)
    BadFileDescriptor,
    /// 缓存表已满 (-EMFILE)
    TooManyOpenFiles,
    /// 目标仍被打开 (-EBUSY)
    Busy,

    // 参数相关
    /// 无效参数 (-EINVAL)
    InvalidArgument,
    /// 文件名过长或不符合 8.3 格式 (-ENAMETOOLONG)
    NameTooLong,
    /// 该类节点不支持此操作，例如对管道 seek (-ESPIPE)
    InvalidOperation,

    // 文件系统相关
    /// 设备空间不足 (-ENOSPC)
    NoSpace,
    /// I/O 错误 (-EIO)
    IoError,

    // 其他
    /// 操作不支持 (-ENOTSUP)
    NotSupported,
}

impl FsError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        let errno = match self {
            FsError::NotFound => ENOENT,
            FsError::PermissionDenied => EPERM,
            FsError::IoError => EIO,
            FsError::BadFileDescriptor => EBADF,
            FsError::Busy => EBUSY,
            FsError::AlreadyExists => EEXIST,
            FsError::NotDirectory => ENOTDIR,
            FsError::IsDirectory => EISDIR,
            FsError::InvalidArgument => EINVAL,
            FsError::TooManyOpenFiles => EMFILE,
            FsError::NoSpace => ENOSPC,
            FsError::InvalidOperation => ESPIPE,
            FsError::NameTooLong => ENAMETOOLONG,
            FsError::DirectoryNotEmpty => ENOTEMPTY,
            FsError::NotSupported => ENOTSUP,
        };
        -errno
    }
}

impl core::fmt::Display for FsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            FsError::NotFound => "no such file or directory",
            FsError::AlreadyExists => "file exists",
            FsError::NotDirectory => "not a directory",
            FsError::IsDirectory => "is a directory",
            FsError::DirectoryNotEmpty => "directory not empty",
            FsError::PermissionDenied => "operation not permitted",
            FsError::BadFileDescriptor => "bad file descriptor",
            FsError::TooManyOpenFiles => "too many open files",
            FsError::Busy => "resource busy",
            FsError::InvalidArgument => "invalid argument",
            FsError::NameTooLong => "file name too long",
            FsError::InvalidOperation => "illegal seek",
            FsError::NoSpace => "no space left on device",
            FsError::IoError => "i/o error",
            FsError::NotSupported => "operation not supported",
        };
        f.write_str(text)
    }
}
