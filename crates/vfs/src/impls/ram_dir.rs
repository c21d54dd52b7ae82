//! 内存目录
//!
//! 子节点按挂载顺序保存。`/`、`/dev`、`/proc` 都是内存目录，
//! 磁盘卷的根节点也挂在它们下面。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use sync::SpinLock;

use crate::{FsError, NodeIter, NodeKind, VfsNode};

/// 内存目录
pub struct RamDirectory {
    name: String,
    children: SpinLock<Vec<Arc<dyn VfsNode>>>,
}

impl RamDirectory {
    /// 创建空目录
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: String::from(name),
            children: SpinLock::new(Vec::new()),
        })
    }

    fn position_of(children: &[Arc<dyn VfsNode>], name: &str) -> Option<usize> {
        children.iter().position(|c| c.matches_name(name))
    }

    fn is_empty_directory(node: &Arc<dyn VfsNode>) -> Result<bool, FsError> {
        if node.kind() != NodeKind::Directory {
            return Ok(true);
        }
        Ok(node.entries()?.next().is_none())
    }
}

impl VfsNode for RamDirectory {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn seekable(&self) -> bool {
        false
    }

    fn entries(&self) -> Result<NodeIter<'_>, FsError> {
        let snapshot = self.children.lock().clone();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    fn lookup(&self, name: &str) -> Result<Arc<dyn VfsNode>, FsError> {
        let children = self.children.lock();
        Self::position_of(&children, name)
            .map(|i| children[i].clone())
            .ok_or(FsError::NotFound)
    }

    fn attach_entry(&self, node: Arc<dyn VfsNode>) -> Result<(), FsError> {
        let mut children = self.children.lock();
        if Self::position_of(&children, &node.name()).is_some() {
            return Err(FsError::AlreadyExists);
        }
        children.push(node);
        Ok(())
    }

    fn detach_entry(&self, name: &str) -> Result<Arc<dyn VfsNode>, FsError> {
        let mut children = self.children.lock();
        let index = Self::position_of(&children, name).ok_or(FsError::NotFound)?;
        Ok(children.remove(index))
    }

    fn attachment_count(&self) -> usize {
        self.children.lock().len()
    }

    fn create_entry(&self, name: &str, is_dir: bool) -> Result<Arc<dyn VfsNode>, FsError> {
        if !is_dir {
            return Err(FsError::NotSupported);
        }
        let dir: Arc<dyn VfsNode> = RamDirectory::new(name);
        self.attach_entry(dir.clone())?;
        Ok(dir)
    }

    fn delete_entry(&self, name: &str) -> Result<(), FsError> {
        let child = self.lookup(name)?;
        if child.is_mount_root() {
            return Err(FsError::Busy);
        }
        // 子目录的枚举可能访问磁盘，不能在持锁时进行
        if !Self::is_empty_directory(&child)? {
            return Err(FsError::DirectoryNotEmpty);
        }
        self.detach_entry(name).map(|_| ())
    }

    fn move_entry(
        &self,
        name: &str,
        new_parent: &Arc<dyn VfsNode>,
        new_name: &str,
    ) -> Result<(), FsError> {
        let child = self.lookup(name)?;
        if child.is_mount_root() {
            return Err(FsError::Busy);
        }
        // 内存节点的名字在创建时固定
        if !child.matches_name(new_name) {
            return Err(FsError::NotSupported);
        }
        new_parent.attach_entry(child)?;
        self.detach_entry(name).map(|_| ())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::init_arch_ops;

    #[test]
    fn test_attach_rejects_duplicate_name() {
        init_arch_ops();
        let root = RamDirectory::new("");
        root.attach_entry(RamDirectory::new("dev")).unwrap();
        assert_eq!(
            root.attach_entry(RamDirectory::new("dev")),
            Err(FsError::AlreadyExists)
        );
        assert_eq!(root.attachment_count(), 1);
    }

    #[test]
    fn test_entries_keep_attach_order() {
        init_arch_ops();
        let root = RamDirectory::new("");
        for name in ["b", "a", "c"] {
            root.attach_entry(RamDirectory::new(name)).unwrap();
        }
        let names: Vec<String> = root.entries().unwrap().map(|e| e.unwrap().name()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn test_create_only_directories() {
        init_arch_ops();
        let root = RamDirectory::new("");
        assert!(matches!(root.create_entry("f", false), Err(FsError::NotSupported)));
        let dir = root.create_entry("d", true).unwrap();
        assert_eq!(dir.kind(), NodeKind::Directory);
        assert!(root.lookup("d").is_ok());
    }

    #[test]
    fn test_delete_non_empty_directory() {
        init_arch_ops();
        let root = RamDirectory::new("");
        let dir = root.create_entry("d", true).unwrap();
        dir.create_entry("inner", true).unwrap();
        assert_eq!(root.delete_entry("d"), Err(FsError::DirectoryNotEmpty));
        dir.delete_entry("inner").unwrap();
        root.delete_entry("d").unwrap();
        assert!(matches!(root.lookup("d"), Err(FsError::NotFound)));
    }

    #[test]
    fn test_move_between_directories() {
        init_arch_ops();
        let root = RamDirectory::new("");
        let a = root.create_entry("a", true).unwrap();
        let b = root.create_entry("b", true).unwrap();
        a.create_entry("x", true).unwrap();
        a.move_entry("x", &b, "x").unwrap();
        assert!(b.lookup("x").is_ok());
        assert_eq!(a.attachment_count(), 0);
        assert_eq!(a.move_entry("y", &b, "y"), Err(FsError::NotFound));
    }

    struct VolumeRoot;

    impl VfsNode for VolumeRoot {
        fn name(&self) -> String {
            String::from("HDD0")
        }

        fn kind(&self) -> NodeKind {
            NodeKind::Directory
        }

        fn is_mount_root(&self) -> bool {
            true
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_mount_root_only_leaves_by_detach() {
        init_arch_ops();
        let root = RamDirectory::new("");
        let other = root.create_entry("mnt", true).unwrap();
        root.attach_entry(Arc::new(VolumeRoot)).unwrap();
        assert_eq!(root.delete_entry("HDD0"), Err(FsError::Busy));
        assert_eq!(root.move_entry("HDD0", &other, "HDD0"), Err(FsError::Busy));
        assert!(root.lookup("HDD0").is_ok());
        root.detach_entry("HDD0").unwrap();
        assert!(matches!(root.lookup("HDD0"), Err(FsError::NotFound)));
    }
}
