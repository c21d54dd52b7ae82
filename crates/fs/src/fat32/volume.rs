//! FAT32 卷
//!
//! [`Fat32Volume`] 在 [`ClusterTable`] 和 [`ClusterData`] 之上提供按路径的
//! 文件与目录操作。
//!
//! # 目录槽分配
//!
//! 在目录中新建条目时按以下顺序选择槽：
//!
//! - **A**：目录还没有数据簇。分配并清零一个簇，记为目录的首簇，条目写在槽 0。
//! - **B**：按链顺序找到的第一个已删除槽，直接覆盖。
//! - **C**：目录结束槽。覆盖后把同簇内的下一个槽标为目录结束；
//!   若它已是簇内最后一个槽则不写结束标记。
//! - **D**：链上所有槽都被占用。分配并清零一个新簇接到链尾，条目写在槽 0。
//!
//! 任何一步分配失败时卷保持不变。
//!
//! # 并发
//!
//! 每个卷带一把读写锁：只读操作共享，创建、删除、移动、写入和截断独占。

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use device::BlockDriver;
use log::{debug, info, warn};
use sync::RwLock;
use vfs::{FsError, UnixPath};

use super::data::{ClusterData, EnumerateResult, FreeSlot};
use super::entry::{Fat32Entry, SlotAddr, SlotState};
use super::layout::{Geometry, VolumeBootRecord};
use super::name::ShortName;
use super::table::ClusterTable;
use super::{CLUSTER_END_OF_CHAIN, CLUSTER_UNUSED, read_sectors};

/// 已挂载的 FAT32 卷
pub struct Fat32Volume {
    vbr: VolumeBootRecord,
    geometry: Geometry,
    table: ClusterTable,
    data: ClusterData,
    lock: RwLock<()>,
}

impl Fat32Volume {
    /// 打开位于 `partition_offset` 的卷
    ///
    /// `partition_sectors` 为 0 时以 VBR 中的总扇区数为准。
    pub fn open(
        device: Arc<dyn BlockDriver>,
        partition_offset: usize,
        partition_sectors: usize,
    ) -> Result<Arc<Self>, FsError> {
        let sector_size = device.sector_size();
        if sector_size < super::layout::VBR_SIZE {
            return Err(FsError::InvalidArgument);
        }
        let mut sector = vec![0u8; sector_size];
        read_sectors(&*device, partition_offset, &mut sector)?;
        let vbr = VolumeBootRecord::parse(&sector)?;
        if vbr.bytes_per_sector as usize != sector_size {
            warn!(
                "fat32: volume sector size {} does not match device sector size {}",
                vbr.bytes_per_sector, sector_size
            );
            return Err(FsError::InvalidArgument);
        }
        let geometry = Geometry::new(&vbr, partition_offset, partition_sectors)?;
        info!(
            "fat32: mounted '{}' at lba {}, {} clusters of {} bytes",
            vbr.label(),
            partition_offset,
            geometry.cluster_limit - super::CLUSTER_FIRST_DATA,
            geometry.cluster_size()
        );
        Ok(Arc::new(Self {
            table: ClusterTable::new(device.clone(), geometry),
            data: ClusterData::new(device, geometry),
            vbr,
            geometry,
            lock: RwLock::new(()),
        }))
    }

    // ========== 卷信息 ==========

    /// 卷标
    pub fn label(&self) -> String {
        self.vbr.label()
    }

    /// 类型标签
    pub fn fat_type(&self) -> String {
        self.vbr.fat_type()
    }

    /// 数据区容量（字节）
    pub fn size_in_bytes(&self) -> u64 {
        (self.geometry.cluster_limit - super::CLUSTER_FIRST_DATA) as u64
            * self.geometry.cluster_size() as u64
    }

    /// 每簇字节数
    pub fn cluster_size(&self) -> usize {
        self.geometry.cluster_size()
    }

    /// 已占用的簇数
    pub fn used_space_in_clusters(&self) -> Result<usize, FsError> {
        let _guard = self.lock.read();
        self.table.used_cluster_count()
    }

    /// 已占用的字节数
    pub fn used_space_in_bytes(&self) -> Result<u64, FsError> {
        Ok(self.used_space_in_clusters()? as u64 * self.cluster_size() as u64)
    }

    /// 几何参数
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    // ========== 查找 ==========

    /// 根目录条目
    pub fn root_entry(&self) -> Fat32Entry {
        Fat32Entry::root(self.vbr.root_cluster)
    }

    /// 按卷内绝对路径查找条目
    pub fn get_entry(&self, path: &UnixPath) -> Result<Fat32Entry, FsError> {
        let _guard = self.lock.read();
        self.get_entry_locked(path)
    }

    /// 在目录 `dir` 中按名称查找
    pub fn find_in_directory(
        &self,
        dir: &Fat32Entry,
        name: &str,
    ) -> Result<Option<Fat32Entry>, FsError> {
        let Ok(name) = ShortName::parse(name) else {
            return Ok(None);
        };
        let _guard = self.lock.read();
        let dir = self.refresh_locked(dir)?;
        if !dir.is_directory() {
            return Err(FsError::NotDirectory);
        }
        self.find_in_directory_locked(&dir, &name)
    }

    /// 从磁盘重新读取条目
    ///
    /// 槽已被删除或被其它名字占用时返回 `NotFound`。
    pub fn refresh(&self, entry: &Fat32Entry) -> Result<Fat32Entry, FsError> {
        let _guard = self.lock.read();
        self.refresh_locked(entry)
    }

    fn refresh_locked(&self, entry: &Fat32Entry) -> Result<Fat32Entry, FsError> {
        let Some(addr) = entry.slot else {
            return Ok(self.root_entry());
        };
        match self.data.read_slot(addr)? {
            SlotState::Live(fresh) if fresh.name.matches(&entry.name) => Ok(fresh),
            _ => Err(FsError::NotFound),
        }
    }

    fn get_entry_locked(&self, path: &UnixPath) -> Result<Fat32Entry, FsError> {
        let mut current = self.root_entry();
        for segment in path.segments() {
            if !current.is_directory() {
                return Err(FsError::NotDirectory);
            }
            let name = ShortName::parse(segment).map_err(|_| FsError::NotFound)?;
            current = self
                .find_in_directory_locked(&current, &name)?
                .ok_or(FsError::NotFound)?;
        }
        Ok(current)
    }

    fn find_in_directory_locked(
        &self,
        dir: &Fat32Entry,
        name: &ShortName,
    ) -> Result<Option<Fat32Entry>, FsError> {
        let mut found = None;
        self.enumerate_directory_locked(dir, |entry| {
            if entry.name.matches(name) {
                found = Some(entry);
                false
            } else {
                true
            }
        })?;
        Ok(found)
    }

    fn directory_chain(&self, dir: &Fat32Entry) -> Result<Vec<u32>, FsError> {
        if self.geometry.is_data_cluster(dir.data_cluster) {
            self.table.chain(dir.data_cluster)
        } else {
            Ok(Vec::new())
        }
    }

    // ========== 目录枚举 ==========

    /// 依次访问目录中的可见条目，`visit` 返回 false 时停止
    pub fn enumerate_directory(
        &self,
        dir: &Fat32Entry,
        visit: impl FnMut(Fat32Entry) -> bool,
    ) -> Result<(), FsError> {
        let _guard = self.lock.read();
        let dir = self.refresh_locked(dir)?;
        if !dir.is_directory() {
            return Err(FsError::NotDirectory);
        }
        self.enumerate_directory_locked(&dir, visit)
    }

    fn enumerate_directory_locked(
        &self,
        dir: &Fat32Entry,
        mut visit: impl FnMut(Fat32Entry) -> bool,
    ) -> Result<(), FsError> {
        for cluster in self.directory_chain(dir)? {
            match self.data.enumerate_cluster(cluster, &mut visit)? {
                EnumerateResult::Continue => {}
                EnumerateResult::Finished | EnumerateResult::Stopped => break,
            }
        }
        Ok(())
    }

    /// 惰性枚举目录
    ///
    /// 每次从链头开始，一次只读入一个簇。
    pub fn read_dir(&self, dir: &Fat32Entry) -> Result<DirIter<'_>, FsError> {
        if !dir.is_directory() {
            return Err(FsError::NotDirectory);
        }
        let next_cluster = if self.geometry.is_data_cluster(dir.data_cluster) {
            Some(dir.data_cluster)
        } else {
            None
        };
        Ok(DirIter {
            volume: self,
            next_cluster,
            buffered: VecDeque::new(),
            visited: 0,
        })
    }

    // ========== 创建 ==========

    /// 新建空文件或空目录
    pub fn create_entry(&self, path: &UnixPath, is_dir: bool) -> Result<Fat32Entry, FsError> {
        let _guard = self.lock.write();
        let (parent_path, name) = path.split()?;
        let name = ShortName::parse(name)?;
        let mut parent = self.get_entry_locked(&parent_path)?;
        if !parent.is_directory() {
            return Err(FsError::NotDirectory);
        }
        if self.find_in_directory_locked(&parent, &name)?.is_some() {
            return Err(FsError::AlreadyExists);
        }
        self.alloc_entry_in_directory(&mut parent, Fat32Entry::new(name, is_dir))
    }

    /// 为 `entry` 在目录 `parent` 中选一个槽并写入
    fn alloc_entry_in_directory(
        &self,
        parent: &mut Fat32Entry,
        mut entry: Fat32Entry,
    ) -> Result<Fat32Entry, FsError> {
        if !self.geometry.is_data_cluster(parent.data_cluster) {
            let cluster = self.alloc_zeroed_cluster()?;
            let addr = self.data.slot_addr(cluster, 0);
            entry.slot = Some(addr);
            let result = self.data.write_slot(addr, &entry).and_then(|_| {
                parent.data_cluster = cluster;
                self.persist(parent)
            });
            if let Err(e) = result {
                parent.data_cluster = CLUSTER_UNUSED;
                self.release_cluster(cluster);
                return Err(e);
            }
            debug!("fat32: {} placed in new head cluster {}", entry.name, cluster);
            return Ok(entry);
        }

        let chain = self.directory_chain(parent)?;
        for &cluster in &chain {
            match self.data.find_free_slot(cluster)? {
                FreeSlot::Unused(addr) => {
                    entry.slot = Some(addr);
                    self.data.write_slot(addr, &entry)?;
                    debug!("fat32: {} reuses deleted slot {:?}", entry.name, addr);
                    return Ok(entry);
                }
                FreeSlot::NoMore(addr) => {
                    entry.slot = Some(addr);
                    self.data.mark_next_slot_no_more(addr)?;
                    self.data.write_slot(addr, &entry)?;
                    debug!("fat32: {} placed at directory end {:?}", entry.name, addr);
                    return Ok(entry);
                }
                FreeSlot::NotFound => {}
            }
        }

        let Some(&tail) = chain.last() else {
            return Err(FsError::IoError);
        };
        let cluster = self.alloc_zeroed_cluster()?;
        let addr = self.data.slot_addr(cluster, 0);
        entry.slot = Some(addr);
        let result = self
            .data
            .write_slot(addr, &entry)
            .and_then(|_| self.table.set_next(tail, cluster));
        if let Err(e) = result {
            self.release_cluster(cluster);
            return Err(e);
        }
        debug!(
            "fat32: {} placed in cluster {} appended after {}",
            entry.name, cluster, tail
        );
        Ok(entry)
    }

    fn alloc_zeroed_cluster(&self) -> Result<u32, FsError> {
        let cluster = self.table.alloc_cluster()?;
        if let Err(e) = self.data.clear_cluster(cluster) {
            self.release_cluster(cluster);
            return Err(e);
        }
        Ok(cluster)
    }

    /// 回滚时归还单个簇，失败只记录
    fn release_cluster(&self, cluster: u32) {
        if self.table.set_next(cluster, CLUSTER_UNUSED).is_err() {
            warn!("fat32: failed to return cluster {} to the free pool", cluster);
        }
    }

    /// 把条目写回它自己的槽；根目录没有槽
    fn persist(&self, entry: &Fat32Entry) -> Result<(), FsError> {
        match entry.slot {
            Some(addr) => self.data.write_slot(addr, entry),
            None => Ok(()),
        }
    }

    // ========== 删除与移动 ==========

    /// 删除文件或空目录
    pub fn delete_entry(&self, path: &UnixPath) -> Result<(), FsError> {
        let _guard = self.lock.write();
        let (parent_path, _) = path.split()?;
        let entry = self.get_entry_locked(path)?;
        let mut parent = self.get_entry_locked(&parent_path)?;
        if entry.is_directory() && self.geometry.is_data_cluster(entry.data_cluster) {
            return Err(FsError::DirectoryNotEmpty);
        }
        if self.geometry.is_data_cluster(entry.data_cluster) {
            self.table.free_chain(entry.data_cluster)?;
        }
        let addr = entry.slot.ok_or(FsError::InvalidArgument)?;
        self.release_slot(&mut parent, addr)
    }

    /// 移动或改名
    pub fn move_entry(&self, from: &UnixPath, to: &UnixPath) -> Result<Fat32Entry, FsError> {
        let _guard = self.lock.write();
        let (from_parent, _) = from.split()?;
        let (to_parent, to_name) = to.split()?;
        let source = self.get_entry_locked(from)?;
        let addr = source.slot.ok_or(FsError::InvalidArgument)?;
        let name = ShortName::parse(to_name)?;
        let mut target_dir = self.get_entry_locked(&to_parent)?;
        if source.is_directory() && self.path_passes_through(&to_parent, addr)? {
            return Err(FsError::InvalidArgument);
        }
        if !target_dir.is_directory() {
            return Err(FsError::NotDirectory);
        }
        if self.find_in_directory_locked(&target_dir, &name)?.is_some() {
            return Err(FsError::AlreadyExists);
        }

        let moved = Fat32Entry {
            name,
            slot: None,
            ..source
        };
        let moved = self.alloc_entry_in_directory(&mut target_dir, moved)?;
        let mut source_dir = self.get_entry_locked(&from_parent)?;
        self.release_slot(&mut source_dir, addr)?;
        debug!("fat32: moved {} to {}", from, to);
        Ok(moved)
    }

    /// 从根目录沿 `path` 逐级查找，途经的某一级是否就是位于 `addr` 的条目
    fn path_passes_through(&self, path: &UnixPath, addr: SlotAddr) -> Result<bool, FsError> {
        let mut current = self.root_entry();
        for segment in path.segments() {
            let name = ShortName::parse(segment).map_err(|_| FsError::NotFound)?;
            current = self
                .find_in_directory_locked(&current, &name)?
                .ok_or(FsError::NotFound)?;
            if current.slot == Some(addr) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 释放 `parent` 中位于 `addr` 的槽，不动条目的数据簇
    fn release_slot(&self, parent: &mut Fat32Entry, addr: SlotAddr) -> Result<(), FsError> {
        if self.live_entry_after(parent, addr)? {
            self.data.mark_slot_unused(addr)?;
        } else {
            self.data.mark_slot_no_more(addr)?;
        }
        self.remove_dir_cluster_if_empty(parent, addr.cluster)
    }

    /// 目录中 `addr` 之后是否还有有效槽
    fn live_entry_after(&self, parent: &Fat32Entry, addr: SlotAddr) -> Result<bool, FsError> {
        let chain = self.directory_chain(parent)?;
        let Some(start) = chain.iter().position(|&c| c == addr.cluster) else {
            return Ok(false);
        };
        let mut from = self.data.slot_number(addr) + 1;
        for &cluster in &chain[start..] {
            let result = self
                .data
                .scan_slots(cluster, from, |_, state| !matches!(state, SlotState::Live(_)))?;
            match result {
                EnumerateResult::Stopped => return Ok(true),
                EnumerateResult::Finished => return Ok(false),
                EnumerateResult::Continue => from = 0,
            }
        }
        Ok(false)
    }

    /// 簇中已无有效槽时把它从目录链上摘下并释放；根目录首簇除外
    fn remove_dir_cluster_if_empty(
        &self,
        parent: &mut Fat32Entry,
        cluster: u32,
    ) -> Result<(), FsError> {
        if !self.data.is_cluster_empty(cluster)? {
            return Ok(());
        }
        if parent.is_root() && cluster == parent.data_cluster {
            return Ok(());
        }
        let next = self.table.get_next(cluster)?;
        let has_next = !ClusterTable::is_last(next) && self.geometry.is_data_cluster(next);
        if cluster == parent.data_cluster {
            parent.data_cluster = if has_next { next } else { CLUSTER_UNUSED };
            self.persist(parent)?;
        } else if let Some(prev) = self.table.get_prev(parent.data_cluster, cluster)? {
            self.table
                .set_next(prev, if has_next { next } else { CLUSTER_END_OF_CHAIN })?;
        }
        self.table.set_next(cluster, CLUSTER_UNUSED)?;
        debug!("fat32: detached empty directory cluster {}", cluster);
        Ok(())
    }

    // ========== 文件内容 ==========

    /// 从 `position` 处读取文件内容，返回读到的字节数
    ///
    /// `entry` 会先从磁盘刷新。
    pub fn read_file(
        &self,
        entry: &mut Fat32Entry,
        position: u64,
        buf: &mut [u8],
    ) -> Result<usize, FsError> {
        let _guard = self.lock.read();
        *entry = self.refresh_locked(entry)?;
        if entry.is_directory() {
            return Err(FsError::IsDirectory);
        }
        let size = entry.size as u64;
        if position >= size || buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len().min((size - position) as usize);
        let chain = self.table.chain(entry.data_cluster)?;
        self.copy_along_chain(&chain, position as usize, len, |cluster, offset, range| {
            self.data.read_bytes(cluster, offset, &mut buf[range])
        })?;
        Ok(len)
    }

    /// 在 `position` 处写入，返回写入的字节数
    ///
    /// `position` 不能超过当前大小。所需的簇在写数据之前一次分配完，
    /// 分配失败时卷保持不变。
    pub fn write_file(
        &self,
        entry: &mut Fat32Entry,
        position: u64,
        buf: &[u8],
    ) -> Result<usize, FsError> {
        let _guard = self.lock.write();
        *entry = self.refresh_locked(entry)?;
        self.write_file_locked(entry, position, buf)
    }

    fn write_file_locked(
        &self,
        entry: &mut Fat32Entry,
        position: u64,
        buf: &[u8],
    ) -> Result<usize, FsError> {
        if entry.is_directory() {
            return Err(FsError::IsDirectory);
        }
        if position > entry.size as u64 {
            return Err(FsError::InvalidArgument);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let end = position + buf.len() as u64;
        if end > u32::MAX as u64 {
            return Err(FsError::NoSpace);
        }
        let chain = self.reserve_clusters(entry, end)?;
        let result =
            self.copy_along_chain(&chain, position as usize, buf.len(), |cluster, offset, range| {
                self.data.write_bytes(cluster, offset, &buf[range])
            });
        if result.is_ok() {
            entry.size = entry.size.max(end as u32);
        }
        self.persist(entry)?;
        result.map(|_| buf.len())
    }

    /// 保证链能容纳 `bytes` 字节，返回完整的链
    ///
    /// 新簇全部分配成功后才接到链上，任何一步失败都会归还已分配的簇。
    fn reserve_clusters(&self, entry: &mut Fat32Entry, bytes: u64) -> Result<Vec<u32>, FsError> {
        let needed = (bytes as usize).div_ceil(self.cluster_size());
        let mut chain = if self.geometry.is_data_cluster(entry.data_cluster) {
            self.table.chain(entry.data_cluster)?
        } else {
            Vec::new()
        };
        if chain.len() >= needed {
            return Ok(chain);
        }

        let mut fresh = Vec::with_capacity(needed - chain.len());
        let mut link = || -> Result<(), FsError> {
            while chain.len() + fresh.len() < needed {
                fresh.push(self.table.alloc_cluster()?);
            }
            for pair in fresh.windows(2) {
                self.table.set_next(pair[0], pair[1])?;
            }
            Ok(())
        };
        if let Err(e) = link() {
            debug!("fat32: rolling back {} reserved clusters", fresh.len());
            for &cluster in &fresh {
                self.release_cluster(cluster);
            }
            return Err(e);
        }

        match chain.last() {
            Some(&tail) => {
                if let Err(e) = self.table.set_next(tail, fresh[0]) {
                    for &cluster in &fresh {
                        self.release_cluster(cluster);
                    }
                    return Err(e);
                }
            }
            None => entry.data_cluster = fresh[0],
        }
        chain.extend(fresh);
        Ok(chain)
    }

    /// 把文件字节区间 `[position, position + len)` 按扇区切块，交给 `op`
    ///
    /// `op` 收到 (簇号, 簇内偏移, 缓冲区内范围)。
    fn copy_along_chain(
        &self,
        chain: &[u32],
        position: usize,
        len: usize,
        mut op: impl FnMut(u32, usize, core::ops::Range<usize>) -> Result<(), FsError>,
    ) -> Result<(), FsError> {
        let cluster_size = self.cluster_size();
        let sector_size = self.geometry.bytes_per_sector;
        let mut done = 0;
        while done < len {
            let pos = position + done;
            let cluster = *chain.get(pos / cluster_size).ok_or(FsError::IoError)?;
            let offset = pos % cluster_size;
            let chunk = (sector_size - offset % sector_size).min(len - done);
            op(cluster, offset, done..done + chunk)?;
            done += chunk;
        }
        Ok(())
    }

    /// 截断或扩展文件；扩展部分填零
    pub fn truncate_file(&self, entry: &mut Fat32Entry, new_size: u64) -> Result<(), FsError> {
        let _guard = self.lock.write();
        *entry = self.refresh_locked(entry)?;
        if entry.is_directory() {
            return Err(FsError::IsDirectory);
        }
        if new_size > u32::MAX as u64 {
            return Err(FsError::InvalidArgument);
        }
        let size = entry.size as u64;
        if new_size > size {
            self.reserve_clusters(entry, new_size)?;
            let zeros = vec![0u8; self.cluster_size()];
            let mut at = size;
            while at < new_size {
                let chunk = (new_size - at).min(zeros.len() as u64) as usize;
                self.write_file_locked(entry, at, &zeros[..chunk])?;
                at += chunk as u64;
            }
            return Ok(());
        }
        if new_size < size {
            let keep = (new_size as usize).div_ceil(self.cluster_size());
            if keep == 0 {
                if self.geometry.is_data_cluster(entry.data_cluster) {
                    self.table.free_chain(entry.data_cluster)?;
                }
                entry.data_cluster = CLUSTER_UNUSED;
            } else if let Some(last) = self.table.nth_cluster(entry.data_cluster, keep - 1)? {
                let next = self.table.get_next(last)?;
                self.table.set_next(last, CLUSTER_END_OF_CHAIN)?;
                if !ClusterTable::is_last(next) && self.geometry.is_data_cluster(next) {
                    self.table.free_chain(next)?;
                }
            }
            entry.size = new_size as u32;
            self.persist(entry)?;
        }
        Ok(())
    }
}

/// [`Fat32Volume::read_dir`] 返回的惰性目录迭代器
pub struct DirIter<'a> {
    volume: &'a Fat32Volume,
    next_cluster: Option<u32>,
    buffered: VecDeque<Fat32Entry>,
    visited: usize,
}

impl DirIter<'_> {
    /// 读入下一个簇中的可见条目
    fn fill(&mut self) -> Result<(), FsError> {
        let Some(cluster) = self.next_cluster.take() else {
            return Ok(());
        };
        self.visited += 1;
        let _guard = self.volume.lock.read();
        let buffered = &mut self.buffered;
        let result = self.volume.data.enumerate_cluster(cluster, |entry| {
            buffered.push_back(entry);
            true
        })?;
        if result == EnumerateResult::Continue
            && self.visited < self.volume.geometry.cluster_limit as usize
        {
            let next = self.volume.table.get_next(cluster)?;
            if !ClusterTable::is_last(next) && self.volume.geometry.is_data_cluster(next) {
                self.next_cluster = Some(next);
            }
        }
        Ok(())
    }
}

impl Iterator for DirIter<'_> {
    type Item = Result<Fat32Entry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffered.is_empty() {
            self.next_cluster?;
            if let Err(e) = self.fill() {
                self.next_cluster = None;
                return Some(Err(e));
            }
        }
        self.buffered.pop_front().map(Ok)
    }
}
