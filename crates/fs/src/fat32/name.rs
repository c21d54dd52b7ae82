//! 8.3 短文件名
//!
//! 磁盘上占 11 字节：8 字节主名 + 3 字节扩展名，空格填充，大写存储。
//! 比较时不区分大小写。

use alloc::string::String;
use core::fmt;

use vfs::FsError;

/// 8.3 短文件名
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortName {
    raw: [u8; 11],
}

impl ShortName {
    /// 从 `NAME.EXT` 形式解析
    ///
    /// 超长返回 `NameTooLong`，空名、多个点或非法字符返回 `InvalidArgument`。
    pub fn parse(name: &str) -> Result<Self, FsError> {
        if name.is_empty() || name == "." || name == ".." {
            return Err(FsError::InvalidArgument);
        }
        let (base, ext) = match name.rfind('.') {
            Some(dot) => (&name[..dot], &name[dot + 1..]),
            None => (name, ""),
        };
        if base.is_empty() || base.contains('.') || (name.ends_with('.') && ext.is_empty()) {
            return Err(FsError::InvalidArgument);
        }
        if base.len() > 8 || ext.len() > 3 {
            return Err(FsError::NameTooLong);
        }
        let mut raw = [b' '; 11];
        for (dst, &b) in raw[..8].iter_mut().zip(base.as_bytes()) {
            *dst = Self::canonical_byte(b)?;
        }
        for (dst, &b) in raw[8..].iter_mut().zip(ext.as_bytes()) {
            *dst = Self::canonical_byte(b)?;
        }
        Ok(Self { raw })
    }

    fn canonical_byte(b: u8) -> Result<u8, FsError> {
        match b {
            b'a'..=b'z' => Ok(b.to_ascii_uppercase()),
            b'A'..=b'Z' | b'0'..=b'9' => Ok(b),
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'(' | b')' | b'-' | b'@' | b'^' | b'_'
            | b'`' | b'{' | b'}' | b'~' => Ok(b),
            _ => Err(FsError::InvalidArgument),
        }
    }

    /// 由磁盘上的 11 字节构造，不做校验
    pub fn from_raw(raw: [u8; 11]) -> Self {
        Self { raw }
    }

    /// 磁盘格式
    pub fn raw(&self) -> &[u8; 11] {
        &self.raw
    }

    /// 与另一个名字是否相同（不区分大小写）
    pub fn matches(&self, other: &ShortName) -> bool {
        self.raw.eq_ignore_ascii_case(&other.raw)
    }

    /// 与字符串形式的名字是否相同；`name` 不是合法 8.3 名时返回 false
    pub fn matches_str(&self, name: &str) -> bool {
        Self::parse(name).is_ok_and(|other| self.matches(&other))
    }

    /// `NAME.EXT` 形式；没有扩展名时不带点
    pub fn display(&self) -> String {
        let base = trim(&self.raw[..8]);
        let ext = trim(&self.raw[8..]);
        let mut out = String::from_utf8_lossy(base).into_owned();
        if !ext.is_empty() {
            out.push('.');
            out.push_str(&String::from_utf8_lossy(ext));
        }
        out
    }
}

fn trim(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    &bytes[..end]
}

impl fmt::Debug for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortName({:?})", self.display())
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pads_and_uppercases() {
        let name = ShortName::parse("readme.txt").unwrap();
        assert_eq!(name.raw(), b"README  TXT");
        assert_eq!(name.display(), "README.TXT");

        let dir = ShortName::parse("Docs").unwrap();
        assert_eq!(dir.raw(), b"DOCS       ");
        assert_eq!(dir.display(), "DOCS");
    }

    #[test]
    fn test_too_long() {
        assert_eq!(ShortName::parse("verylongname.txt"), Err(FsError::NameTooLong));
        assert_eq!(ShortName::parse("a.text"), Err(FsError::NameTooLong));
    }

    #[test]
    fn test_invalid() {
        for bad in ["", ".", "..", ".hidden", "a.b.c", "sp ace", "star*", "dot."] {
            assert_eq!(ShortName::parse(bad), Err(FsError::InvalidArgument), "{bad}");
        }
    }

    #[test]
    fn test_case_insensitive_match() {
        let name = ShortName::parse("KERNEL.BIN").unwrap();
        assert!(name.matches_str("kernel.bin"));
        assert!(name.matches(&ShortName::from_raw(*b"kernel  bin")));
        assert!(!name.matches_str("kernel"));
        assert!(!name.matches_str("not valid name"));
    }
}
