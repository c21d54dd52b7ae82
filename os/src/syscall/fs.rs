//! 文件相关的系统调用
//!
//! 每个调用成功时返回非负值，失败时返回负的 errno。

use log::debug;
use uapi::fs::FsEntry;
use vfs::{FsError, GlobalFileDescriptor, NodeKind};

use crate::context::KernelContext;

fn fd_of(fd: usize) -> GlobalFileDescriptor {
    GlobalFileDescriptor::from_raw(fd)
}

fn sysret(call: &str, result: Result<usize, FsError>) -> isize {
    match result {
        Ok(value) => value as isize,
        Err(e) => {
            debug!("syscall: {} failed: {}", call, e);
            e.to_errno()
        }
    }
}

/// 打开路径，返回描述符
pub fn sys_open(ctx: &KernelContext, path: &str) -> isize {
    sysret(
        "open",
        ctx.namespace().open(path).map(GlobalFileDescriptor::as_raw),
    )
}

/// 关闭描述符
pub fn sys_close(ctx: &KernelContext, fd: usize) -> isize {
    sysret("close", ctx.namespace().close(fd_of(fd)).map(|_| 0))
}

/// 从当前位置读取，返回读到的字节数，0 表示结束
pub fn sys_read(ctx: &KernelContext, fd: usize, buf: &mut [u8]) -> isize {
    sysret("read", ctx.namespace().read(fd_of(fd), buf))
}

/// 在当前位置写入，返回写入的字节数
pub fn sys_write(ctx: &KernelContext, fd: usize, buf: &[u8]) -> isize {
    sysret("write", ctx.namespace().write(fd_of(fd), buf))
}

/// 设置读写位置，返回新位置
pub fn sys_seek(ctx: &KernelContext, fd: usize, position: u64) -> isize {
    let result = ctx
        .namespace()
        .seek(fd_of(fd), position)
        .and_then(|pos| usize::try_from(pos).map_err(|_| FsError::InvalidArgument));
    sysret("seek", result)
}

/// 截断或扩展文件
pub fn sys_truncate(ctx: &KernelContext, fd: usize, size: u64) -> isize {
    sysret("truncate", ctx.namespace().truncate(fd_of(fd), size).map(|_| 0))
}

/// 从目录的当前位置起填充 `out`，返回填充的项数
pub fn sys_enumerate(ctx: &KernelContext, fd: usize, out: &mut [FsEntry]) -> isize {
    sysret("enumerate", ctx.namespace().enumerate(fd_of(fd), out))
}

/// 创建文件或目录
pub fn sys_create(ctx: &KernelContext, path: &str, is_dir: bool) -> isize {
    sysret("create", ctx.namespace().create_entry(path, is_dir).map(|_| 0))
}

/// 删除文件或空目录
pub fn sys_delete(ctx: &KernelContext, path: &str) -> isize {
    sysret("delete", ctx.namespace().delete_entry(path).map(|_| 0))
}

/// 移动或重命名
pub fn sys_move(ctx: &KernelContext, from: &str, to: &str) -> isize {
    sysret("move", ctx.namespace().move_entry(from, to).map(|_| 0))
}

/// 删除 `path`，`directory` 指定其必须是目录还是非目录
///
/// `unlink` 拒绝目录，`rmdir` 拒绝非目录。
pub(super) fn sys_delete_kind(ctx: &KernelContext, path: &str, directory: bool) -> isize {
    let result = ctx.namespace().node(path).and_then(|node| {
        match (node.kind() == NodeKind::Directory, directory) {
            (true, false) => Err(FsError::IsDirectory),
            (false, true) => Err(FsError::NotDirectory),
            _ => ctx.namespace().delete_entry(path).map(|_| 0),
        }
    });
    sysret(if directory { "rmdir" } else { "unlink" }, result)
}
