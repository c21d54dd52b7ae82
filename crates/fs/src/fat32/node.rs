//! 把卷中的条目适配为 [`VfsNode`]

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;

use sync::SpinLock;
use vfs::{FsError, NodeIter, NodeKind, UnixPath, VfsNode};

use super::entry::Fat32Entry;
use super::name::ShortName;
use super::volume::Fat32Volume;

/// FAT32 卷中的文件或目录
///
/// 节点只记住自己在卷内的路径和最近一次读到的槽内容；每个操作之前都会
/// 从磁盘刷新，缓存中的目录节点不会用到过期的首簇。
pub struct FatNode {
    volume: Arc<Fat32Volume>,
    path: UnixPath,
    name: String,
    entry: SpinLock<Fat32Entry>,
}

impl FatNode {
    /// 卷的根目录，以 `mount_name` 作为节点名
    pub fn root(volume: Arc<Fat32Volume>, mount_name: &str) -> Arc<Self> {
        let entry = volume.root_entry();
        Arc::new(Self {
            volume,
            path: UnixPath::root(),
            name: String::from(mount_name),
            entry: SpinLock::new(entry),
        })
    }

    fn child(&self, entry: Fat32Entry) -> Result<Arc<Self>, FsError> {
        let name = entry.name.display();
        Ok(Arc::new(Self {
            volume: self.volume.clone(),
            path: self.path.join(&name)?,
            name,
            entry: SpinLock::new(entry),
        }))
    }

    /// 所在的卷
    pub fn volume(&self) -> &Arc<Fat32Volume> {
        &self.volume
    }

    /// 卷内路径
    pub fn volume_path(&self) -> &UnixPath {
        &self.path
    }

    /// 从磁盘刷新后的条目
    pub fn entry(&self) -> Result<Fat32Entry, FsError> {
        let snapshot = self.entry.lock().clone();
        let fresh = self.volume.refresh(&snapshot)?;
        *self.entry.lock() = fresh.clone();
        Ok(fresh)
    }

    fn snapshot(&self) -> Fat32Entry {
        self.entry.lock().clone()
    }

    fn store(&self, entry: Fat32Entry) {
        *self.entry.lock() = entry;
    }

    fn child_path(&self, name: &str) -> Result<UnixPath, FsError> {
        self.path.join(name)
    }
}

impl VfsNode for FatNode {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> NodeKind {
        if self.entry.lock().is_directory() {
            NodeKind::Directory
        } else {
            NodeKind::File
        }
    }

    fn matches_name(&self, name: &str) -> bool {
        if self.path.is_root() {
            return self.name == name;
        }
        ShortName::parse(name).is_ok_and(|short| self.entry.lock().name.matches(&short))
    }

    fn is_mount_root(&self) -> bool {
        self.path.is_root()
    }

    fn size(&self) -> Result<u64, FsError> {
        Ok(self.entry()?.size as u64)
    }

    fn read(&self, position: u64, buf: &mut [u8]) -> Result<usize, FsError> {
        let mut entry = self.snapshot();
        let n = self.volume.read_file(&mut entry, position, buf)?;
        self.store(entry);
        Ok(n)
    }

    fn write(&self, position: u64, buf: &[u8]) -> Result<usize, FsError> {
        let mut entry = self.snapshot();
        let result = self.volume.write_file(&mut entry, position, buf);
        self.store(entry);
        result
    }

    fn seek(&self, position: u64) -> Result<u64, FsError> {
        let entry = self.entry()?;
        if entry.is_directory() {
            return Err(FsError::IsDirectory);
        }
        if position > entry.size as u64 {
            return Err(FsError::InvalidArgument);
        }
        Ok(position)
    }

    fn truncate(&self, size: u64) -> Result<(), FsError> {
        let mut entry = self.snapshot();
        let result = self.volume.truncate_file(&mut entry, size);
        self.store(entry);
        result
    }

    fn entries(&self) -> Result<NodeIter<'_>, FsError> {
        let dir = self.entry()?;
        let iter = self.volume.read_dir(&dir)?;
        Ok(Box::new(iter.map(
            move |entry| -> Result<Arc<dyn VfsNode>, FsError> { Ok(self.child(entry?)?) },
        )))
    }

    fn lookup(&self, name: &str) -> Result<Arc<dyn VfsNode>, FsError> {
        let dir = self.entry()?;
        match self.volume.find_in_directory(&dir, name)? {
            Some(entry) => Ok(self.child(entry)?),
            None => Err(FsError::NotFound),
        }
    }

    fn create_entry(&self, name: &str, is_dir: bool) -> Result<Arc<dyn VfsNode>, FsError> {
        if !self.entry()?.is_directory() {
            return Err(FsError::NotDirectory);
        }
        let entry = self.volume.create_entry(&self.child_path(name)?, is_dir)?;
        Ok(self.child(entry)?)
    }

    fn delete_entry(&self, name: &str) -> Result<(), FsError> {
        if !self.entry()?.is_directory() {
            return Err(FsError::NotDirectory);
        }
        self.volume.delete_entry(&self.child_path(name)?)
    }

    fn move_entry(
        &self,
        name: &str,
        new_parent: &Arc<dyn VfsNode>,
        new_name: &str,
    ) -> Result<(), FsError> {
        let Some(target) = new_parent.downcast_ref::<FatNode>() else {
            return Err(FsError::NotSupported);
        };
        if !Arc::ptr_eq(&self.volume, &target.volume) {
            return Err(FsError::NotSupported);
        }
        let from = self.child_path(name)?;
        let to = target.child_path(new_name)?;
        self.volume.move_entry(&from, &to)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
