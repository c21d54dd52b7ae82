//! 内核设备驱动框架
//!
//! 存储层只需要设备的一小部分能力：
//!
//! - [`Driver`] trait - 设备驱动基础接口
//! - [`BlockDriver`] trait - 按扇区同步读写的块设备接口
//! - [`RamDisk`] - 内存模拟块设备
//! - [`PartitionTable`] - MBR 分区表解析
//! - [`DeviceRegistry`] - 已登记驱动的表，由内核上下文持有

#![no_std]
#![allow(clippy::module_inception)]

extern crate alloc;

pub mod block;
pub mod driver;

// Re-export driver
pub use driver::{DeviceRegistry, DeviceType, Driver};

// Re-export block
pub use block::{
    BlockDriver, MbrError, PARTITION_FAT32_CHS, PARTITION_FAT32_LBA, PartitionEntry, PartitionTable,
    RamDisk,
};
