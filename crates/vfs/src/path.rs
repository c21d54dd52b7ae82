//! 路径处理
//!
//! 命名空间内的路径一律是绝对路径，先规范化为 [`UnixPath`] 再使用：
//!
//! - 连续的 `/` 合并，结尾的 `/` 去掉
//! - `.` 跳过；`..` 回到父目录，不越过根
//! - 相对路径被拒绝

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::FsError;

/// 单个路径段的最大字节数
pub const MAX_SEGMENT_LEN: usize = 255;

/// 路径组件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathComponent<'a> {
    /// 根目录 "/"
    Root,
    /// 当前目录 "."
    Current,
    /// 父目录 ".."
    Parent,
    /// 正常的文件名
    Normal(&'a str),
}

/// 将路径字符串拆成组件列表
pub fn parse_path(path: &str) -> Vec<PathComponent<'_>> {
    let mut components = Vec::new();
    if path.starts_with('/') {
        components.push(PathComponent::Root);
    }
    for part in path.split('/').filter(|s| !s.is_empty()) {
        components.push(match part {
            "." => PathComponent::Current,
            ".." => PathComponent::Parent,
            name => PathComponent::Normal(name),
        });
    }
    components
}

/// 规范化的绝对路径
///
/// 内部保存形如 `/a/b/c` 的字符串，根目录为 `/`。
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnixPath {
    inner: String,
}

impl UnixPath {
    /// 根目录
    pub fn root() -> Self {
        Self {
            inner: String::from("/"),
        }
    }

    /// 解析并规范化绝对路径
    pub fn parse(path: &str) -> Result<Self, FsError> {
        let components = parse_path(path);
        if components.first() != Some(&PathComponent::Root) {
            return Err(FsError::InvalidArgument);
        }
        let mut stack: Vec<&str> = Vec::new();
        for component in components {
            match component {
                PathComponent::Root | PathComponent::Current => {}
                PathComponent::Parent => {
                    stack.pop();
                }
                PathComponent::Normal(name) => {
                    if name.len() > MAX_SEGMENT_LEN {
                        return Err(FsError::NameTooLong);
                    }
                    stack.push(name);
                }
            }
        }
        Ok(Self::from_segments(stack))
    }

    fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Self {
        let mut inner = String::new();
        for seg in segments {
            inner.push('/');
            inner.push_str(seg);
        }
        if inner.is_empty() {
            inner.push('/');
        }
        Self { inner }
    }

    /// 路径字符串
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// 是否为根目录
    pub fn is_root(&self) -> bool {
        self.inner == "/"
    }

    /// 各个路径段，根目录没有段
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.inner.split('/').filter(|s| !s.is_empty())
    }

    /// 路径段数
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// 最后一个路径段；根目录返回 None
    pub fn file_name(&self) -> Option<&str> {
        self.segments().next_back()
    }

    /// 父目录；根目录返回 None
    pub fn parent(&self) -> Option<UnixPath> {
        if self.is_root() {
            return None;
        }
        let cut = self.inner.rfind('/')?;
        Some(if cut == 0 {
            Self::root()
        } else {
            Self {
                inner: String::from(&self.inner[..cut]),
            }
        })
    }

    /// 拆成 (父目录, 文件名)
    pub fn split(&self) -> Result<(UnixPath, &str), FsError> {
        match (self.parent(), self.file_name()) {
            (Some(parent), Some(name)) => Ok((parent, name)),
            _ => Err(FsError::InvalidArgument),
        }
    }

    /// 追加一个路径段
    pub fn join(&self, name: &str) -> Result<UnixPath, FsError> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(FsError::InvalidArgument);
        }
        if name.len() > MAX_SEGMENT_LEN {
            return Err(FsError::NameTooLong);
        }
        let mut inner = self.inner.clone();
        if !self.is_root() {
            inner.push('/');
        }
        inner.push_str(name);
        Ok(Self { inner })
    }

    /// `self` 是否等于 `prefix` 或位于其下（按段比较）
    pub fn starts_with(&self, prefix: &UnixPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        match self.inner.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// 去掉前缀后剩余的路径段
    pub fn strip_prefix<'a>(&'a self, prefix: &UnixPath) -> Option<impl Iterator<Item = &'a str>> {
        if !self.starts_with(prefix) {
            return None;
        }
        Some(self.segments().skip(prefix.depth()))
    }

    /// 截去末尾 `n` 个路径段
    pub fn snap_tail(&self, n: usize) -> UnixPath {
        let keep = self.depth().saturating_sub(n);
        Self::from_segments(self.segments().take(keep))
    }
}

impl fmt::Debug for UnixPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.inner)
    }
}

impl fmt::Display for UnixPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}
