//! 信息文件
//!
//! 内容在读取时由 [`ContentGenerator`] 现场生成的只读文件，
//! 挂在 `/proc` 下提供任务列表、内存和卷的统计信息。

pub mod generators;
pub mod inode;

pub use generators::{MeminfoGenerator, ProcessListGenerator, VolumesGenerator};
pub use inode::{ContentGenerator, InfoNode};
