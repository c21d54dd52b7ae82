//! POSIX 错误码
//!
//! 系统调用失败时返回对应值的相反数。

pub const EPERM: isize = 1;
pub const ENOENT: isize = 2;
pub const EIO: isize = 5;
pub const EBADF: isize = 9;
pub const EAGAIN: isize = 11;
pub const EACCES: isize = 13;
pub const EBUSY: isize = 16;
pub const EEXIST: isize = 17;
pub const ENODEV: isize = 19;
pub const ENOTDIR: isize = 20;
pub const EISDIR: isize = 21;
pub const EINVAL: isize = 22;
pub const EMFILE: isize = 24;
pub const ENOSPC: isize = 28;
pub const ESPIPE: isize = 29;
pub const EROFS: isize = 30;
pub const ENAMETOOLONG: isize = 36;
pub const ENOSYS: isize = 38;
pub const ENOTEMPTY: isize = 39;
pub const ENOTSUP: isize = 95;
