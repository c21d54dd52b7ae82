//! 驱动接口与设备表
//!
//! 驱动在启动时登记到内核上下文持有的 [`DeviceRegistry`]，
//! 中断分发和磁盘扫描都遍历这张表。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use sync::RwLock;

use crate::block::BlockDriver;

/// 设备类型
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DeviceType {
    /// 块设备
    Block,
    /// 输入设备（键盘等）
    Input,
}

/// 设备驱动
pub trait Driver: Send + Sync {
    /// 中断属于此驱动时处理并返回 true
    ///
    /// `irq` 为 None 表示轮询，驱动自行检查是否有待处理事件。
    fn try_handle_interrupt(&self, irq: Option<usize>) -> bool;

    /// 设备类型
    fn device_type(&self) -> DeviceType;

    /// 设备标识，同一张设备表中唯一
    fn get_id(&self) -> String;

    /// 转换为块设备 Arc（如果适用）
    fn as_block_arc(self: Arc<Self>) -> Option<Arc<dyn BlockDriver>> {
        None
    }
}

/// 已登记的驱动
///
/// 登记只发生在启动阶段，之后只读。
#[derive(Default)]
pub struct DeviceRegistry {
    drivers: RwLock<Vec<Arc<dyn Driver>>>,
}

impl DeviceRegistry {
    /// 空设备表
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记驱动；标识重复时返回 false
    pub fn register(&self, driver: Arc<dyn Driver>) -> bool {
        let mut drivers = self.drivers.write();
        let id = driver.get_id();
        if drivers.iter().any(|d| d.get_id() == id) {
            return false;
        }
        log::info!("device: registered {:?} device {}", driver.device_type(), id);
        drivers.push(driver);
        true
    }

    /// 按标识查找
    pub fn find(&self, id: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.read().iter().find(|d| d.get_id() == id).cloned()
    }

    /// 全部块设备，按登记顺序
    pub fn block_devices(&self) -> Vec<Arc<dyn BlockDriver>> {
        self.drivers
            .read()
            .iter()
            .filter(|d| d.device_type() == DeviceType::Block)
            .filter_map(|d| d.clone().as_block_arc())
            .collect()
    }

    /// 把中断交给第一个认领它的驱动
    pub fn handle_interrupt(&self, irq: Option<usize>) -> bool {
        let drivers = self.drivers.read().clone();
        drivers.iter().any(|d| d.try_handle_interrupt(irq))
    }

    /// 已登记的驱动数
    pub fn len(&self) -> usize {
        self.drivers.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.drivers.read().is_empty()
    }
}
