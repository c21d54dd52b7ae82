//! 命名空间节点接口
//!
//! [`VfsNode`] 统一了磁盘文件、内存目录、管道、信息文件和设备流。
//! 节点只在命名空间缓存表中被长期持有，调用方通过文件描述符间接访问。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;

use crate::FsError;

/// 节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// 普通文件（包括合成的信息文件）
    File,
    /// 目录
    Directory,
    /// 命名管道
    Pipe,
    /// 设备流
    Device,
}

/// 目录枚举的惰性序列
///
/// 每次调用 [`VfsNode::entries`] 都从头开始，序列有限，可以在任意位置丢弃。
pub type NodeIter<'a> = Box<dyn Iterator<Item = Result<Arc<dyn VfsNode>, FsError>> + 'a>;

/// 命名空间节点
///
/// 默认实现对应“该类节点不支持此操作”。实现者只需覆盖自己支持的部分。
/// `attachment_count` 会在命名空间缓存锁内被调用，实现不得阻塞。
pub trait VfsNode: Send + Sync + Any {
    /// 节点名称（所在目录中的名字）
    fn name(&self) -> String;

    /// 节点类型
    fn kind(&self) -> NodeKind;

    /// 名称是否匹配；大小写不敏感的文件系统需要覆盖
    fn matches_name(&self, name: &str) -> bool {
        self.name() == name
    }

    /// 当前大小（字节）
    fn size(&self) -> Result<u64, FsError> {
        Ok(0)
    }

    /// 从 `position` 处读取
    fn read(&self, _position: u64, _buf: &mut [u8]) -> Result<usize, FsError> {
        match self.kind() {
            NodeKind::Directory => Err(FsError::IsDirectory),
            _ => Err(FsError::NotSupported),
        }
    }

    /// 在 `position` 处写入
    fn write(&self, _position: u64, _buf: &[u8]) -> Result<usize, FsError> {
        match self.kind() {
            NodeKind::Directory => Err(FsError::IsDirectory),
            _ => Err(FsError::NotSupported),
        }
    }

    /// 是否有读写位置
    fn seekable(&self) -> bool {
        true
    }

    /// 校验新的读写位置并返回它
    fn seek(&self, position: u64) -> Result<u64, FsError> {
        if !self.seekable() {
            return Err(FsError::InvalidOperation);
        }
        if position > self.size()? {
            return Err(FsError::InvalidArgument);
        }
        Ok(position)
    }

    /// 截断或扩展到 `size`
    fn truncate(&self, _size: u64) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 枚举子节点
    fn entries(&self) -> Result<NodeIter<'_>, FsError> {
        Err(FsError::NotDirectory)
    }

    /// 按名称查找子节点
    fn lookup(&self, name: &str) -> Result<Arc<dyn VfsNode>, FsError> {
        for child in self.entries()? {
            let child = child?;
            if child.matches_name(name) {
                return Ok(child);
            }
        }
        Err(FsError::NotFound)
    }

    /// 把已有节点挂到本目录下
    fn attach_entry(&self, _node: Arc<dyn VfsNode>) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 从本目录摘下一个挂载的子节点
    fn detach_entry(&self, _name: &str) -> Result<Arc<dyn VfsNode>, FsError> {
        Err(FsError::NotSupported)
    }

    /// 挂在本节点下的子节点数，非零时节点不会被逐出缓存
    fn attachment_count(&self) -> usize {
        0
    }

    /// 是否为挂载的卷根；卷根只能经卸载摘下，不能被删除或移动
    fn is_mount_root(&self) -> bool {
        false
    }

    /// 创建子文件或子目录
    fn create_entry(&self, _name: &str, _is_dir: bool) -> Result<Arc<dyn VfsNode>, FsError> {
        Err(directory_only(self))
    }

    /// 删除子节点
    fn delete_entry(&self, _name: &str) -> Result<(), FsError> {
        Err(directory_only(self))
    }

    /// 把子节点 `name` 移到 `new_parent` 下并命名为 `new_name`
    fn move_entry(
        &self,
        _name: &str,
        _new_parent: &Arc<dyn VfsNode>,
        _new_name: &str,
    ) -> Result<(), FsError> {
        Err(directory_only(self))
    }

    /// 每次被打开时调用
    fn open(&self) -> Result<(), FsError> {
        Ok(())
    }

    /// 每次被关闭时调用
    fn close(&self) {}

    /// 向下转型为 &dyn Any，用于支持 downcast
    fn as_any(&self) -> &dyn Any;
}

fn directory_only<N: VfsNode + ?Sized>(node: &N) -> FsError {
    if node.kind() == NodeKind::Directory {
        FsError::NotSupported
    } else {
        FsError::NotDirectory
    }
}

/// 为 `Arc<dyn VfsNode>` 提供向下转型辅助方法
impl dyn VfsNode {
    /// 尝试向下转型为具体的节点类型
    pub fn downcast_arc<T: VfsNode>(self: Arc<Self>) -> Result<Arc<T>, Arc<Self>> {
        if (*self).as_any().is::<T>() {
            // SAFETY: 已经通过 is::<T>() 检查了类型
            unsafe {
                let ptr = Arc::into_raw(self);
                Ok(Arc::from_raw(ptr as *const T))
            }
        } else {
            Err(self)
        }
    }

    /// 尝试获取具体类型的引用
    pub fn downcast_ref<T: VfsNode>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
