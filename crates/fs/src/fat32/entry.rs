//! 32 字节目录槽
//!
//! 槽的第一个字节兼作状态：`0x00` 表示目录结束，`0xE5` 表示已删除可复用，
//! 其它值表示有效条目。

use bitflags::bitflags;

use super::name::ShortName;
use super::{CLUSTER_MASK, CLUSTER_UNUSED, le16, le32};

/// 目录槽大小
pub const SLOT_SIZE: usize = 32;
/// 目录结束标记
pub const SLOT_NO_MORE: u8 = 0x00;
/// 已删除标记
pub const SLOT_UNUSED: u8 = 0xE5;

const OFF_ATTR: usize = 11;
const OFF_CLUSTER_HI: usize = 20;
const OFF_CLUSTER_LO: usize = 26;
const OFF_SIZE: usize = 28;

bitflags! {
    /// 目录项属性
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FatAttr: u8 {
        /// 只读
        const READ_ONLY = 0x01;
        /// 隐藏
        const HIDDEN = 0x02;
        /// 系统
        const SYSTEM = 0x04;
        /// 卷标
        const VOLUME_ID = 0x08;
        /// 目录
        const DIRECTORY = 0x10;
        /// 归档
        const ARCHIVE = 0x20;
        /// 长文件名记录
        const LONG_NAME = Self::READ_ONLY.bits()
            | Self::HIDDEN.bits()
            | Self::SYSTEM.bits()
            | Self::VOLUME_ID.bits();
    }
}

/// 目录槽在磁盘上的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAddr {
    /// 所在簇
    pub cluster: u32,
    /// 簇内扇区序号
    pub sector: u32,
    /// 扇区内槽序号
    pub index: u32,
}

/// 解码后的一个槽
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    /// 目录结束
    NoMore,
    /// 已删除
    Unused,
    /// 有效条目
    Live(Fat32Entry),
}

/// 一个文件或目录条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fat32Entry {
    /// 短文件名
    pub name: ShortName,
    /// 原始属性
    pub attr: FatAttr,
    /// 文件大小（字节），目录为 0
    pub size: u32,
    /// 内容首簇，空内容为 [`CLUSTER_UNUSED`]
    pub data_cluster: u32,
    /// 自身所在的槽；根目录没有槽
    pub slot: Option<SlotAddr>,
}

impl Fat32Entry {
    /// 新建的空文件或空目录条目
    pub fn new(name: ShortName, is_directory: bool) -> Self {
        Self {
            name,
            attr: if is_directory {
                FatAttr::DIRECTORY
            } else {
                FatAttr::ARCHIVE
            },
            size: 0,
            data_cluster: CLUSTER_UNUSED,
            slot: None,
        }
    }

    /// 根目录条目
    pub fn root(root_cluster: u32) -> Self {
        Self {
            name: ShortName::from_raw([b' '; 11]),
            attr: FatAttr::DIRECTORY,
            size: 0,
            data_cluster: root_cluster,
            slot: None,
        }
    }

    /// 是否为目录
    pub fn is_directory(&self) -> bool {
        self.attr.contains(FatAttr::DIRECTORY)
    }

    /// 是否为根目录
    pub fn is_root(&self) -> bool {
        self.slot.is_none()
    }

    /// 解码一个槽
    pub fn decode(raw: &[u8], addr: SlotAddr) -> SlotState {
        match raw[0] {
            SLOT_NO_MORE => return SlotState::NoMore,
            SLOT_UNUSED => return SlotState::Unused,
            _ => {}
        }
        let mut name = [0u8; 11];
        name.copy_from_slice(&raw[..11]);
        let hi = le16(raw, OFF_CLUSTER_HI) as u32;
        let lo = le16(raw, OFF_CLUSTER_LO) as u32;
        SlotState::Live(Self {
            name: ShortName::from_raw(name),
            attr: FatAttr::from_bits_retain(raw[OFF_ATTR]),
            size: le32(raw, OFF_SIZE),
            data_cluster: ((hi << 16) | lo) & CLUSTER_MASK,
            slot: Some(addr),
        })
    }

    /// 编码为 32 字节
    pub fn encode(&self) -> [u8; SLOT_SIZE] {
        let mut raw = [0u8; SLOT_SIZE];
        raw[..11].copy_from_slice(self.name.raw());
        raw[OFF_ATTR] = self.attr.bits();
        raw[OFF_CLUSTER_HI..OFF_CLUSTER_HI + 2]
            .copy_from_slice(&((self.data_cluster >> 16) as u16).to_le_bytes());
        raw[OFF_CLUSTER_LO..OFF_CLUSTER_LO + 2]
            .copy_from_slice(&(self.data_cluster as u16).to_le_bytes());
        let size = if self.is_directory() { 0 } else { self.size };
        raw[OFF_SIZE..OFF_SIZE + 4].copy_from_slice(&size.to_le_bytes());
        raw
    }

    /// 枚举时是否应跳过（`.`、`..`、卷标、长文件名记录）
    pub fn is_hidden_record(&self) -> bool {
        self.attr.contains(FatAttr::LONG_NAME)
            || self.attr.contains(FatAttr::VOLUME_ID)
            || self.name.raw()[0] == b'.'
    }
}
