//! 信息文件节点

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::sync::atomic::{AtomicBool, Ordering};

use vfs::{FsError, NodeKind, VfsNode};

/// 动态内容生成器
pub trait ContentGenerator: Send + Sync {
    /// 生成文件内容（每次调用时重新生成）
    fn generate(&self) -> Result<Vec<u8>, FsError>;
}

/// 内容在读取时生成的只读文件
///
/// 大小恒为 0。一次读取返回生成内容的最后 `min(count, len)` 字节，
/// 随后的一次读取返回 0 表示结束，再之后重新生成；重新打开也会重置。
pub struct InfoNode {
    name: String,
    generator: Arc<dyn ContentGenerator>,
    drained: AtomicBool,
}

impl InfoNode {
    /// 创建信息文件
    pub fn new(name: &str, generator: Arc<dyn ContentGenerator>) -> Arc<Self> {
        Arc::new(Self {
            name: String::from(name),
            generator,
            drained: AtomicBool::new(false),
        })
    }
}

impl VfsNode for InfoNode {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::File
    }

    fn read(&self, _position: u64, buf: &mut [u8]) -> Result<usize, FsError> {
        if self.drained.swap(false, Ordering::AcqRel) {
            return Ok(0);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let content = self.generator.generate()?;
        let n = buf.len().min(content.len());
        buf[..n].copy_from_slice(&content[content.len() - n..]);
        self.drained.store(true, Ordering::Release);
        Ok(n)
    }

    fn write(&self, _position: u64, _buf: &[u8]) -> Result<usize, FsError> {
        Err(FsError::PermissionDenied)
    }

    fn truncate(&self, _size: u64) -> Result<(), FsError> {
        Err(FsError::PermissionDenied)
    }

    fn open(&self) -> Result<(), FsError> {
        self.drained.store(false, Ordering::Release);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    struct Fixed(&'static [u8]);

    impl ContentGenerator for Fixed {
        fn generate(&self) -> Result<Vec<u8>, FsError> {
            Ok(self.0.to_vec())
        }
    }

    #[test]
    fn test_read_returns_tail_then_zero() {
        let node = InfoNode::new("info", Arc::new(Fixed(b"0123456789")));
        let mut buf = vec![0u8; 4];
        assert_eq!(node.read(0, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"6789");
        assert_eq!(node.read(0, &mut buf).unwrap(), 0);
        assert_eq!(node.read(0, &mut buf).unwrap(), 4);
    }

    #[test]
    fn test_open_rearms() {
        let node = InfoNode::new("info", Arc::new(Fixed(b"abc")));
        let mut buf = [0u8; 16];
        assert_eq!(node.read(0, &mut buf).unwrap(), 3);
        node.open().unwrap();
        assert_eq!(node.read(0, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn test_read_only() {
        let node = InfoNode::new("info", Arc::new(Fixed(b"")));
        assert_eq!(node.write(0, b"x"), Err(FsError::PermissionDenied));
        assert_eq!(node.size().unwrap(), 0);
        assert_eq!(node.kind(), NodeKind::File);
    }
}
