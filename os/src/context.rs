//! 内核上下文
//!
//! 命名空间、已挂载的卷、日志和设备节点都由 [`KernelContext`] 持有，
//! 调用方显式传递上下文，内核中不存在全局单例。
//!
//! 启动后的目录树：
//!
//! ```text
//! /
//! ├── dev/
//! │   └── keyboard      键盘记录流
//! ├── proc/
//! │   ├── ps            任务列表
//! │   ├── meminfo       物理页帧用量
//! │   ├── volumes       已挂载的卷
//! │   └── kmsg          内核日志
//! └── HDD0/ ...         挂载的 FAT32 卷
//! ```

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use device::{BlockDriver, DeviceRegistry, Driver, PartitionTable};
use fs::proc::{MeminfoGenerator, ProcessListGenerator, VolumesGenerator};
use fs::{Fat32Volume, FatNode, InfoNode, SystemInfo};
use hashbrown::HashMap;
use klog::KernelLogger;
use log::{info, warn};
use sync::{Scheduler, SpinLock};
use vfs::{DeviceStream, FsError, RamDirectory, RamFifo, UnixPath, VfsNamespace};

use crate::config::KernelConfig;
use crate::kmsg::KmsgGenerator;

/// 键盘记录：扫描码 (u16 LE) + 修饰键位图 + 按下/抬起标志
pub const KEYBOARD_RECORD_SIZE: usize = 4;

/// 挂载名前缀，磁盘分区依次命名为 `HDD0`、`HDD1` ...
pub const DISK_MOUNT_PREFIX: &str = "HDD";

/// 内核上下文
pub struct KernelContext {
    config: KernelConfig,
    namespace: VfsNamespace,
    scheduler: Arc<dyn Scheduler>,
    logger: Arc<KernelLogger>,
    keyboard: Arc<DeviceStream>,
    devices: DeviceRegistry,
    volumes_info: Arc<VolumesGenerator>,
    mounts: SpinLock<HashMap<String, Arc<Fat32Volume>>>,
}

impl KernelContext {
    /// 构建命名空间并挂上 `/dev` 与 `/proc`
    pub fn new(
        config: KernelConfig,
        scheduler: Arc<dyn Scheduler>,
        system_info: Arc<dyn SystemInfo>,
    ) -> Result<Self, FsError> {
        let logger = Arc::new(KernelLogger::new(
            config.kmsg_lines,
            config.log_level,
            config.console_level,
        ));
        let namespace = VfsNamespace::new(RamDirectory::new("/"), config.namespace_config())?;

        namespace.attach(RamDirectory::new("dev"), "/")?;
        let keyboard = DeviceStream::new("keyboard", KEYBOARD_RECORD_SIZE, config.keyboard_depth)?;
        namespace.attach(keyboard.clone(), "/dev")?;

        let volumes_info = Arc::new(VolumesGenerator::new());
        namespace.attach(RamDirectory::new("proc"), "/")?;
        namespace.attach(
            InfoNode::new("ps", Arc::new(ProcessListGenerator::new(system_info.clone()))),
            "/proc",
        )?;
        namespace.attach(
            InfoNode::new("meminfo", Arc::new(MeminfoGenerator::new(system_info))),
            "/proc",
        )?;
        namespace.attach(InfoNode::new("volumes", volumes_info.clone()), "/proc")?;
        namespace.attach(
            InfoNode::new("kmsg", Arc::new(KmsgGenerator::new(logger.clone()))),
            "/proc",
        )?;

        info!(
            "kernel: namespace ready, cache capacity {}",
            config.cache_capacity
        );
        Ok(Self {
            config,
            namespace,
            scheduler,
            logger,
            keyboard,
            devices: DeviceRegistry::new(),
            volumes_info,
            mounts: SpinLock::new(HashMap::new()),
        })
    }

    // ========== 访问器 ==========

    /// 启动配置
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// 命名空间
    pub fn namespace(&self) -> &VfsNamespace {
        &self.namespace
    }

    /// 内核 logger，可交给 [`klog::install`] 成为全局 logger
    pub fn logger(&self) -> &Arc<KernelLogger> {
        &self.logger
    }

    /// 已登记的驱动
    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    /// 挂载名对应的卷
    pub fn volume(&self, name: &str) -> Option<Arc<Fat32Volume>> {
        self.mounts.lock().get(name).cloned()
    }

    /// 已挂载的卷名，按名字排序
    pub fn mount_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.mounts.lock().keys().cloned().collect();
        names.sort();
        names
    }

    // ========== 挂载 ==========

    /// 把块设备上的 FAT32 卷挂到 `/{name}`
    ///
    /// `sectors` 为 0 表示使用卷引导记录中的扇区数。
    pub fn mount_fat32(
        &self,
        device: Arc<dyn BlockDriver>,
        offset: usize,
        sectors: usize,
        name: &str,
    ) -> Result<Arc<Fat32Volume>, FsError> {
        if self.mounts.lock().contains_key(name) {
            return Err(FsError::AlreadyExists);
        }
        let volume = Fat32Volume::open(device, offset, sectors)?;
        self.namespace.attach(FatNode::root(volume.clone(), name), "/")?;
        self.volumes_info.add(name, volume.clone());
        self.mounts
            .lock()
            .insert(String::from(name), volume.clone());
        info!(
            "kernel: mounted {} volume '{}' at /{}",
            volume.fat_type(),
            volume.label(),
            name
        );
        Ok(volume)
    }

    /// 卸载 `/{name}`
    ///
    /// 卷内仍有打开的描述符时返回 `Busy`。
    pub fn unmount(&self, name: &str) -> Result<(), FsError> {
        if !self.mounts.lock().contains_key(name) {
            return Err(FsError::NotFound);
        }
        self.namespace.detach(&format!("/{}", name))?;
        self.volumes_info.remove(name);
        self.mounts.lock().remove(name);
        info!("kernel: unmounted /{}", name);
        Ok(())
    }

    /// 扫描 MBR 分区表，挂载其中的 FAT32 分区
    ///
    /// 分区依次挂到下一个空闲的 `HDDn`。单个分区挂载失败只记录警告，
    /// 返回成功挂载的名字。
    pub fn mount_partitions(&self, device: Arc<dyn BlockDriver>) -> Result<Vec<String>, FsError> {
        let table = PartitionTable::read(&*device).map_err(|e| {
            warn!("kernel: no usable partition table: {:?}", e);
            FsError::IoError
        })?;
        let mut mounted = Vec::new();
        for part in table.fat32_partitions() {
            let name = self.next_disk_name();
            match self.mount_fat32(
                device.clone(),
                part.start_lba as usize,
                part.sectors as usize,
                &name,
            ) {
                Ok(_) => mounted.push(name),
                Err(e) => warn!(
                    "kernel: partition {} at lba {} not mounted: {}",
                    part.index, part.start_lba, e
                ),
            }
        }
        Ok(mounted)
    }

    /// 登记驱动
    pub fn register_device(&self, driver: Arc<dyn Driver>) -> Result<(), FsError> {
        if self.devices.register(driver) {
            Ok(())
        } else {
            Err(FsError::AlreadyExists)
        }
    }

    /// 挂载所有已登记块设备上的 FAT32 卷
    ///
    /// 有分区表的设备挂载其中的 FAT32 分区；没有分区表或其中没有可挂载分区的设备，
    /// 整体作为一个卷尝试挂载。
    pub fn probe_disks(&self) -> Vec<String> {
        let mut mounted = Vec::new();
        for device in self.devices.block_devices() {
            match self.mount_partitions(device.clone()) {
                Ok(names) if !names.is_empty() => mounted.extend(names),
                // FAT32 引导扇区同样以 0x55AA 结尾，会被读成空分区表
                _ => {
                    let name = self.next_disk_name();
                    match self.mount_fat32(device, 0, 0, &name) {
                        Ok(_) => mounted.push(name),
                        Err(e) => warn!("kernel: no FAT32 volume on device: {}", e),
                    }
                }
            }
        }
        mounted
    }

    fn next_disk_name(&self) -> String {
        let mounts = self.mounts.lock();
        (0..)
            .map(|n| format!("{}{}", DISK_MOUNT_PREFIX, n))
            .find(|name| !mounts.contains_key(name))
            .unwrap_or_default()
    }

    // ========== 设备节点 ==========

    /// 在 `path` 创建一个管道
    pub fn make_fifo(&self, path: &str) -> Result<(), FsError> {
        let path = UnixPath::parse(path)?;
        let (parent, name) = path.split()?;
        let fifo = RamFifo::new(name, self.config.fifo_capacity, self.scheduler.clone());
        self.namespace.attach(fifo, parent.as_str())
    }

    /// 键盘驱动回调：压入一条记录
    pub fn keyboard_event(&self, record: &[u8]) -> Result<(), FsError> {
        self.keyboard.push(record)
    }
}
