//! 命名空间与节点缓存
//!
//! [`VfsNamespace`] 把规范化路径映射到节点。被打开或被引用过的节点保存在
//! 固定容量的缓存表中，缓存表是节点的唯一长期持有者；调用方只拿到
//! [`GlobalFileDescriptor`]，即缓存表槽位的下标。
//!
//! # 查找
//!
//! 先“上溯”：从目标路径逐段截尾，直到命中一个已缓存的前缀（最差是根目录）；
//! 再“下探”：从该前缀逐段调用节点的 `lookup`，途中每一段都必须是目录。
//!
//! # 生命周期
//!
//! 缓存项在第一次打开或被挂载引用时创建；`open` 使引用计数加一，`close` 减一。
//! 当引用计数为 0 且节点的 `attachment_count` 也为 0 时缓存项被逐出。
//! 根目录常驻。
//!
//! # 锁
//!
//! 缓存表由一把自旋锁保护。调用节点的读写、枚举、查找时不持有该锁，
//! 节点内部可能访问磁盘或阻塞。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use hashbrown::HashMap;
use log::{debug, warn};
use sync::SpinLock;
use uapi::fs::FsEntry;

use crate::{FsError, NodeKind, UnixPath, VfsNode};

/// 命名空间配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceConfig {
    /// 缓存表容量，也是同时打开的不同路径数上限
    pub max_cached_entries: usize,
}

impl NamespaceConfig {
    /// 默认缓存表容量
    pub const DEFAULT_MAX_CACHED_ENTRIES: usize = 128;
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            max_cached_entries: Self::DEFAULT_MAX_CACHED_ENTRIES,
        }
    }
}

/// 全局文件描述符，即缓存表下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalFileDescriptor(usize);

impl GlobalFileDescriptor {
    /// 从原始整数构造
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// 原始整数
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

struct CacheEntry {
    path: UnixPath,
    node: Arc<dyn VfsNode>,
    refcount: usize,
    position: u64,
    pinned: bool,
}

impl CacheEntry {
    fn idle(&self) -> bool {
        !self.pinned && self.refcount == 0 && self.node.attachment_count() == 0
    }
}

struct CacheTable {
    slots: Vec<Option<CacheEntry>>,
    index: HashMap<String, usize>,
}

impl CacheTable {
    fn get(&self, slot: usize) -> Option<&CacheEntry> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, slot: usize) -> Option<&mut CacheEntry> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// 已打开的描述符
    fn open_entry(&self, fd: GlobalFileDescriptor) -> Result<&CacheEntry, FsError> {
        self.get(fd.as_raw())
            .filter(|e| e.refcount > 0)
            .ok_or(FsError::BadFileDescriptor)
    }

    fn open_entry_mut(&mut self, fd: GlobalFileDescriptor) -> Result<&mut CacheEntry, FsError> {
        self.get_mut(fd.as_raw())
            .filter(|e| e.refcount > 0)
            .ok_or(FsError::BadFileDescriptor)
    }

    fn slot_of(&self, path: &UnixPath) -> Option<usize> {
        self.index.get(path.as_str()).copied()
    }

    /// 插入缓存项；路径已缓存时返回已有槽位
    fn insert(&mut self, path: UnixPath, node: Arc<dyn VfsNode>) -> Result<usize, FsError> {
        if let Some(slot) = self.slot_of(&path) {
            return Ok(slot);
        }
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::TooManyOpenFiles)?;
        debug!("vfs: cache {} at slot {}", path, slot);
        self.index.insert(String::from(path.as_str()), slot);
        self.slots[slot] = Some(CacheEntry {
            path,
            node,
            refcount: 0,
            position: 0,
            pinned: false,
        });
        Ok(slot)
    }

    fn evict(&mut self, slot: usize) {
        if let Some(entry) = self.slots[slot].take() {
            debug!("vfs: evict {} from slot {}", entry.path, slot);
            self.index.remove(entry.path.as_str());
        }
    }

    fn evict_if_idle(&mut self, slot: usize) {
        if self.get(slot).is_some_and(CacheEntry::idle) {
            self.evict(slot);
        }
    }

    /// `path` 及其后代中是否有被打开的
    fn subtree_busy(&self, path: &UnixPath) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|e| e.refcount > 0 && e.path.starts_with(path))
    }

    /// 逐出 `path` 及其所有后代（常驻项除外）
    fn evict_subtree(&mut self, path: &UnixPath) {
        let stale: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, e)| {
                e.as_ref()
                    .filter(|e| !e.pinned && e.path.starts_with(path))
                    .map(|_| i)
            })
            .collect();
        for slot in stale {
            self.evict(slot);
        }
    }
}

/// 虚拟文件系统命名空间
pub struct VfsNamespace {
    table: SpinLock<CacheTable>,
    config: NamespaceConfig,
}

impl VfsNamespace {
    /// 以 `root` 为根目录创建命名空间
    pub fn new(root: Arc<dyn VfsNode>, config: NamespaceConfig) -> Result<Self, FsError> {
        if config.max_cached_entries == 0 {
            return Err(FsError::InvalidArgument);
        }
        if root.kind() != NodeKind::Directory {
            return Err(FsError::NotDirectory);
        }
        let mut slots = Vec::with_capacity(config.max_cached_entries);
        slots.resize_with(config.max_cached_entries, || None);
        let mut index = HashMap::new();
        index.insert(String::from("/"), 0);
        slots[0] = Some(CacheEntry {
            path: UnixPath::root(),
            node: root,
            refcount: 0,
            position: 0,
            pinned: true,
        });
        Ok(Self {
            table: SpinLock::new(CacheTable { slots, index }),
            config,
        })
    }

    /// 当前配置
    pub fn config(&self) -> NamespaceConfig {
        self.config
    }

    // ========== 查找 ==========

    /// 解析路径，返回规范路径与节点，不改变缓存
    ///
    /// 途中经过的目录如果已被缓存，使用缓存中的节点；
    /// 规范路径中的每一段取节点自己的名字（大小写不敏感的文件系统中，
    /// `/hdd0/foo` 与 `/HDD0/FOO` 解析到同一缓存项）。
    fn resolve(&self, path: &UnixPath) -> Result<(UnixPath, Arc<dyn VfsNode>), FsError> {
        let (mut current_path, mut node, skip) = {
            let table = self.table.lock();
            let mut prefix = path.clone();
            let mut stripped = 0;
            loop {
                if let Some(entry) = table.slot_of(&prefix).and_then(|s| table.get(s)) {
                    break (prefix, entry.node.clone(), path.depth() - stripped);
                }
                // 根目录常驻，上溯必然终止
                prefix = prefix.parent().unwrap_or_else(UnixPath::root);
                stripped += 1;
            }
        };

        for segment in path.segments().skip(skip) {
            if node.kind() != NodeKind::Directory {
                return Err(FsError::NotDirectory);
            }
            let child = node.lookup(segment)?;
            current_path = current_path.join(&child.name())?;
            let cached = {
                let table = self.table.lock();
                table
                    .slot_of(&current_path)
                    .and_then(|s| table.get(s))
                    .map(|e| e.node.clone())
            };
            node = cached.unwrap_or(child);
        }
        Ok((current_path, node))
    }

    /// 查找并缓存路径对应的节点，返回缓存槽位
    pub(crate) fn lookup_entry(&self, path: &UnixPath) -> Result<usize, FsError> {
        let (canonical, node) = self.resolve(path)?;
        self.table.lock().insert(canonical, node)
    }

    /// 路径是否存在
    pub fn exists(&self, path: &str) -> bool {
        UnixPath::parse(path)
            .and_then(|p| self.resolve(&p))
            .is_ok()
    }

    /// 解析路径并返回节点，不缓存
    pub fn node(&self, path: &str) -> Result<Arc<dyn VfsNode>, FsError> {
        let path = UnixPath::parse(path)?;
        self.resolve(&path).map(|(_, node)| node)
    }

    // ========== 挂载 ==========

    /// 把节点挂到 `parent_path` 下
    pub fn attach(&self, node: Arc<dyn VfsNode>, parent_path: &str) -> Result<(), FsError> {
        let parent_path = UnixPath::parse(parent_path)?;
        let slot = self.lookup_entry(&parent_path)?;
        let parent = self.slot_node(slot)?;
        let name = node.name();
        let result = if parent.kind() != NodeKind::Directory {
            Err(FsError::NotDirectory)
        } else if parent.lookup(&name).is_ok() {
            Err(FsError::AlreadyExists)
        } else {
            parent.attach_entry(node)
        };
        match &result {
            Ok(()) => debug!("vfs: attached {} under {}", name, parent_path),
            Err(e) => warn!("vfs: attach {} under {} failed: {}", name, parent_path, e),
        }
        self.table.lock().evict_if_idle(slot);
        result
    }

    /// 摘下挂载的节点
    pub fn detach(&self, path: &str) -> Result<Arc<dyn VfsNode>, FsError> {
        let path = UnixPath::parse(path)?;
        let (canonical, _) = self.resolve(&path)?;
        let (parent_path, name) = canonical.split()?;
        if self.table.lock().subtree_busy(&canonical) {
            return Err(FsError::Busy);
        }
        let slot = self.lookup_entry(&parent_path)?;
        let parent = self.slot_node(slot)?;
        let result = parent.detach_entry(name);
        let mut table = self.table.lock();
        if result.is_ok() {
            table.evict_subtree(&canonical);
        }
        table.evict_if_idle(slot);
        result
    }

    // ========== 打开与关闭 ==========

    /// 打开路径，返回描述符
    pub fn open(&self, path: &str) -> Result<GlobalFileDescriptor, FsError> {
        let path = UnixPath::parse(path)?;
        let (canonical, node) = self.resolve(&path)?;
        let slot = {
            let mut table = self.table.lock();
            let slot = table.insert(canonical, node)?;
            let entry = table.get_mut(slot).ok_or(FsError::NotFound)?;
            entry.refcount += 1;
            slot
        };
        let fd = GlobalFileDescriptor(slot);
        let node = self.slot_node(slot)?;
        if let Err(e) = node.open() {
            self.close(fd)?;
            return Err(e);
        }
        Ok(fd)
    }

    /// 关闭描述符
    pub fn close(&self, fd: GlobalFileDescriptor) -> Result<(), FsError> {
        let node = {
            let mut table = self.table.lock();
            let entry = table.open_entry_mut(fd)?;
            entry.refcount -= 1;
            entry.node.clone()
        };
        node.close();
        self.table.lock().evict_if_idle(fd.as_raw());
        Ok(())
    }

    // ========== 读写 ==========

    fn slot_node(&self, slot: usize) -> Result<Arc<dyn VfsNode>, FsError> {
        self.table
            .lock()
            .get(slot)
            .map(|e| e.node.clone())
            .ok_or(FsError::NotFound)
    }

    fn open_node(&self, fd: GlobalFileDescriptor) -> Result<(Arc<dyn VfsNode>, u64), FsError> {
        let table = self.table.lock();
        let entry = table.open_entry(fd)?;
        Ok((entry.node.clone(), entry.position))
    }

    fn advance(&self, fd: GlobalFileDescriptor, node: &Arc<dyn VfsNode>, new_position: u64) {
        if !node.seekable() {
            return;
        }
        if let Ok(entry) = self.table.lock().open_entry_mut(fd) {
            entry.position = new_position;
        }
    }

    /// 从当前位置读取并前移位置
    pub fn read(&self, fd: GlobalFileDescriptor, buf: &mut [u8]) -> Result<usize, FsError> {
        let (node, position) = self.open_node(fd)?;
        let n = node.read(position, buf)?;
        self.advance(fd, &node, position + n as u64);
        Ok(n)
    }

    /// 在当前位置写入并前移位置
    pub fn write(&self, fd: GlobalFileDescriptor, buf: &[u8]) -> Result<usize, FsError> {
        let (node, position) = self.open_node(fd)?;
        let n = node.write(position, buf)?;
        self.advance(fd, &node, position + n as u64);
        Ok(n)
    }

    /// 设置读写位置
    pub fn seek(&self, fd: GlobalFileDescriptor, position: u64) -> Result<u64, FsError> {
        let (node, _) = self.open_node(fd)?;
        let position = node.seek(position)?;
        self.advance(fd, &node, position);
        Ok(position)
    }

    /// 当前读写位置
    pub fn tell(&self, fd: GlobalFileDescriptor) -> Result<u64, FsError> {
        let (node, position) = self.open_node(fd)?;
        if !node.seekable() {
            return Err(FsError::InvalidOperation);
        }
        Ok(position)
    }

    /// 截断；位置超出新大小时移到末尾
    pub fn truncate(&self, fd: GlobalFileDescriptor, size: u64) -> Result<(), FsError> {
        let (node, position) = self.open_node(fd)?;
        node.truncate(size)?;
        if position > size {
            self.advance(fd, &node, size);
        }
        Ok(())
    }

    /// 节点大小
    pub fn size(&self, fd: GlobalFileDescriptor) -> Result<u64, FsError> {
        self.open_node(fd)?.0.size()
    }

    /// 节点类型
    pub fn kind(&self, fd: GlobalFileDescriptor) -> Result<NodeKind, FsError> {
        Ok(self.open_node(fd)?.0.kind())
    }

    /// 从头枚举目录，最多填满 `out`，返回填入的条目数
    pub fn enumerate(&self, fd: GlobalFileDescriptor, out: &mut [FsEntry]) -> Result<usize, FsError> {
        let (node, _) = self.open_node(fd)?;
        if node.kind() != NodeKind::Directory {
            return Err(FsError::NotDirectory);
        }
        let mut count = 0;
        for (slot, child) in out.iter_mut().zip(node.entries()?) {
            let child = child?;
            let is_directory = child.kind() == NodeKind::Directory;
            let size = if is_directory { 0 } else { child.size()? };
            *slot = FsEntry::new(&child.name(), is_directory, size);
            count += 1;
        }
        Ok(count)
    }

    // ========== 目录修改 ==========

    fn parent_of(&self, path: &UnixPath) -> Result<(usize, Arc<dyn VfsNode>), FsError> {
        let (parent_path, _) = path.split()?;
        let slot = self.lookup_entry(&parent_path)?;
        let node = self.slot_node(slot)?;
        Ok((slot, node))
    }

    /// 创建文件或目录
    pub fn create_entry(&self, path: &str, is_dir: bool) -> Result<(), FsError> {
        let path = UnixPath::parse(path)?;
        let (slot, parent) = self.parent_of(&path)?;
        let name = path.file_name().ok_or(FsError::InvalidArgument)?;
        let result = parent.create_entry(name, is_dir).map(|_| ());
        self.table.lock().evict_if_idle(slot);
        result
    }

    /// 删除文件或空目录；被打开时返回 `Busy`
    pub fn delete_entry(&self, path: &str) -> Result<(), FsError> {
        let path = UnixPath::parse(path)?;
        let (canonical, _) = self.resolve(&path)?;
        if canonical.is_root() {
            return Err(FsError::InvalidArgument);
        }
        if self.table.lock().subtree_busy(&canonical) {
            return Err(FsError::Busy);
        }
        let (slot, parent) = self.parent_of(&canonical)?;
        let name = canonical.file_name().ok_or(FsError::InvalidArgument)?;
        let result = parent.delete_entry(name);
        let mut table = self.table.lock();
        if result.is_ok() {
            table.evict_subtree(&canonical);
        }
        table.evict_if_idle(slot);
        result
    }

    /// 移动或重命名
    pub fn move_entry(&self, from: &str, to: &str) -> Result<(), FsError> {
        let from = UnixPath::parse(from)?;
        let to = UnixPath::parse(to)?;
        let (canonical, _) = self.resolve(&from)?;
        if canonical.is_root() || to.is_root() {
            return Err(FsError::InvalidArgument);
        }
        let (to_parent_path, to_name) = to.split()?;
        let (to_parent_canonical, _) = self.resolve(&to_parent_path)?;
        let to = to_parent_canonical.join(to_name)?;
        if to.starts_with(&canonical) {
            return Err(FsError::InvalidArgument);
        }
        if self.table.lock().subtree_busy(&canonical) {
            return Err(FsError::Busy);
        }
        if self.resolve(&to).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        let (from_slot, from_parent) = self.parent_of(&canonical)?;
        let (to_slot, to_parent) = match self.parent_of(&to) {
            Ok(parent) => parent,
            Err(e) => {
                self.table.lock().evict_if_idle(from_slot);
                return Err(e);
            }
        };
        let result = match (canonical.file_name(), to.file_name()) {
            (Some(name), Some(new_name)) => from_parent.move_entry(name, &to_parent, new_name),
            _ => Err(FsError::InvalidArgument),
        };
        let mut table = self.table.lock();
        if result.is_ok() {
            table.evict_subtree(&canonical);
        }
        table.evict_if_idle(from_slot);
        table.evict_if_idle(to_slot);
        result
    }

    // ========== 诊断 ==========

    /// 缓存中的路径及其引用计数
    pub fn cached_entries(&self) -> Vec<(String, usize)> {
        self.table
            .lock()
            .slots
            .iter()
            .flatten()
            .map(|e| (String::from(e.path.as_str()), e.refcount))
            .collect()
    }

    /// 路径是否在缓存中
    pub fn is_cached(&self, path: &str) -> bool {
        UnixPath::parse(path).is_ok_and(|p| self.table.lock().slot_of(&p).is_some())
    }

    /// 已缓存路径的引用计数
    pub fn refcount(&self, path: &str) -> Option<usize> {
        let path = UnixPath::parse(path).ok()?;
        let table = self.table.lock();
        table
            .slot_of(&path)
            .and_then(|s| table.get(s))
            .map(|e| e.refcount)
    }
}
