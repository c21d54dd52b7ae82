//! 系统调用入口
//!
//! 陷入处理把寄存器中的参数解码为 [`SyscallRequest`] 后交给 [`dispatch`]；
//! 用户指针的校验与拷贝在解码时完成，这里只处理内核侧的切片。

mod fs;

pub use fs::{
    sys_close, sys_create, sys_delete, sys_enumerate, sys_move, sys_open, sys_read, sys_seek,
    sys_truncate, sys_write,
};

use log::warn;
use uapi::errno::ENOSYS;
use uapi::fs::FsEntry;
use uapi::syscall::*;

use crate::context::KernelContext;

/// 解码后的文件系统调用
#[derive(Debug)]
pub enum SyscallRequest<'a> {
    /// read(fd, buf)
    Read {
        /// 描述符
        fd: usize,
        /// 目标缓冲区
        buf: &'a mut [u8],
    },
    /// write(fd, buf)
    Write {
        /// 描述符
        fd: usize,
        /// 源缓冲区
        buf: &'a [u8],
    },
    /// open(path)
    Open {
        /// 绝对路径
        path: &'a str,
    },
    /// close(fd)
    Close {
        /// 描述符
        fd: usize,
    },
    /// lseek(fd, position)，只支持从文件头计算的位置
    Seek {
        /// 描述符
        fd: usize,
        /// 新位置
        position: u64,
    },
    /// ftruncate(fd, size)
    Truncate {
        /// 描述符
        fd: usize,
        /// 新大小
        size: u64,
    },
    /// rename(from, to)
    Rename {
        /// 原路径
        from: &'a str,
        /// 新路径
        to: &'a str,
    },
    /// mkdir(path)
    Mkdir {
        /// 新目录路径
        path: &'a str,
    },
    /// rmdir(path)
    Rmdir {
        /// 目录路径
        path: &'a str,
    },
    /// creat(path)
    Creat {
        /// 新文件路径
        path: &'a str,
    },
    /// unlink(path)
    Unlink {
        /// 文件路径
        path: &'a str,
    },
    /// 目录枚举
    Enumerate {
        /// 目录描述符
        fd: usize,
        /// 输出数组
        out: &'a mut [FsEntry],
    },
    /// 未实现的调用号
    Unknown(usize),
}

impl SyscallRequest<'_> {
    /// 对应的系统调用号
    pub fn number(&self) -> usize {
        match self {
            Self::Read { .. } => SYS_READ,
            Self::Write { .. } => SYS_WRITE,
            Self::Open { .. } => SYS_OPEN,
            Self::Close { .. } => SYS_CLOSE,
            Self::Seek { .. } => SYS_LSEEK,
            Self::Truncate { .. } => SYS_FTRUNCATE,
            Self::Rename { .. } => SYS_RENAME,
            Self::Mkdir { .. } => SYS_MKDIR,
            Self::Rmdir { .. } => SYS_RMDIR,
            Self::Creat { .. } => SYS_CREAT,
            Self::Unlink { .. } => SYS_UNLINK,
            Self::Enumerate { .. } => SYS_FILE_ENUMERATE,
            Self::Unknown(nr) => *nr,
        }
    }
}

/// 执行系统调用，返回值或负的 errno
pub fn dispatch(ctx: &KernelContext, request: SyscallRequest<'_>) -> isize {
    match request {
        SyscallRequest::Read { fd, buf } => sys_read(ctx, fd, buf),
        SyscallRequest::Write { fd, buf } => sys_write(ctx, fd, buf),
        SyscallRequest::Open { path } => sys_open(ctx, path),
        SyscallRequest::Close { fd } => sys_close(ctx, fd),
        SyscallRequest::Seek { fd, position } => sys_seek(ctx, fd, position),
        SyscallRequest::Truncate { fd, size } => sys_truncate(ctx, fd, size),
        SyscallRequest::Rename { from, to } => sys_move(ctx, from, to),
        SyscallRequest::Mkdir { path } => sys_create(ctx, path, true),
        SyscallRequest::Rmdir { path } => fs::sys_delete_kind(ctx, path, true),
        SyscallRequest::Creat { path } => sys_create(ctx, path, false),
        SyscallRequest::Unlink { path } => fs::sys_delete_kind(ctx, path, false),
        SyscallRequest::Enumerate { fd, out } => sys_enumerate(ctx, fd, out),
        SyscallRequest::Unknown(nr) => {
            warn!("syscall: unknown number {}", nr);
            -ENOSYS
        }
    }
}
