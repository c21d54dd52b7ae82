//! 内核虚拟文件系统层
//!
//! 此 crate 提供命名空间抽象，包括：
//!
//! - [`VfsNode`] trait - 磁盘文件、内存目录、管道、设备流的统一接口
//! - [`VfsNamespace`] - 路径到节点的缓存表与文件描述符
//! - [`UnixPath`] - 规范化的绝对路径
//! - [`FsError`] - 与 POSIX errno 对应的错误码
//! - 内存节点实现：[`RamDirectory`]、[`RamFifo`]、[`DeviceStream`]

#![no_std]
#![allow(clippy::module_inception)]

extern crate alloc;

pub mod error;
pub mod impls;
mod namespace;
mod node;
mod path;

// Re-export error
pub use error::FsError;

// Re-export node
pub use node::{NodeIter, NodeKind, VfsNode};

// Re-export path
pub use path::{MAX_SEGMENT_LEN, PathComponent, UnixPath, parse_path};

// Re-export namespace
pub use namespace::{GlobalFileDescriptor, NamespaceConfig, VfsNamespace};

// Re-export impls
pub use impls::{DeviceStream, RamDirectory, RamFifo};

// Re-export uapi types for convenience
pub use uapi::fs::FsEntry;
