//! # 文件系统模块 (FS)
//!
//! 本模块提供挂到命名空间上的具体节点实现，均通过 [`vfs::VfsNode`] 与命名空间集成。
//!
//! ## 组成
//!
//! - **[fat32]**: 块设备上的 FAT32 卷，包括簇分配、目录槽分配和格式化
//! - **[proc]**: 读取时生成内容的只读信息文件
//! - **[ops]**: 信息文件所需的系统信息接口

#![no_std]
#![doc = "文件系统实现"]

extern crate alloc;

pub mod fat32;
pub mod ops;
pub mod proc;

pub use fat32::{Fat32Volume, FatNode, FormatOptions};
pub use ops::{SystemInfo, TaskInfo, TaskState};
pub use proc::{ContentGenerator, InfoNode};
