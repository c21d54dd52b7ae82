//! 启动配置
//!
//! 默认值可以被内核命令行覆盖，命令行是空格分隔的 `key=value` 列表：
//!
//! | 键           | 含义                       | 默认 |
//! |--------------|----------------------------|------|
//! | `vfs.cache`  | 命名空间缓存表容量         | 128  |
//! | `fifo.size`  | 新建管道的缓冲区字节数     | 512  |
//! | `kbd.depth`  | 键盘设备流的记录数         | 16   |
//! | `kmsg.lines` | 内核日志缓冲区行数         | 256  |
//! | `log`        | 写入日志缓冲区的最低级别   | info |
//! | `console`    | 同时打印到控制台的最低级别 | warn |

use log::{LevelFilter, warn};
use vfs::NamespaceConfig;

/// 内核启动配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// 命名空间缓存表容量
    pub cache_capacity: usize,
    /// 新建管道的缓冲区字节数
    pub fifo_capacity: usize,
    /// 键盘设备流能缓存的记录数
    pub keyboard_depth: usize,
    /// 内核日志缓冲区行数
    pub kmsg_lines: usize,
    /// 写入日志缓冲区的最低级别
    pub log_level: LevelFilter,
    /// 同时打印到控制台的最低级别
    pub console_level: LevelFilter,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 128,
            fifo_capacity: 512,
            keyboard_depth: 16,
            kmsg_lines: klog::DEFAULT_RING_LINES,
            log_level: LevelFilter::Info,
            console_level: LevelFilter::Warn,
        }
    }
}

impl KernelConfig {
    /// 在默认值基础上应用命令行
    ///
    /// 未知的键和无法解析的值被忽略并记录警告。
    pub fn from_cmdline(cmdline: &str) -> Self {
        let mut config = Self::default();
        for arg in cmdline.split_whitespace() {
            let Some((key, value)) = arg.split_once('=') else {
                continue;
            };
            if !config.apply(key, value) {
                warn!("config: ignoring boot argument '{}'", arg);
            }
        }
        config
    }

    fn apply(&mut self, key: &str, value: &str) -> bool {
        match key {
            "vfs.cache" => set_count(&mut self.cache_capacity, value),
            "fifo.size" => set_count(&mut self.fifo_capacity, value),
            "kbd.depth" => set_count(&mut self.keyboard_depth, value),
            "kmsg.lines" => set_count(&mut self.kmsg_lines, value),
            "log" => set_level(&mut self.log_level, value),
            "console" => set_level(&mut self.console_level, value),
            _ => false,
        }
    }

    /// 命名空间配置
    pub fn namespace_config(&self) -> NamespaceConfig {
        NamespaceConfig {
            max_cached_entries: self.cache_capacity,
        }
    }
}

fn set_count(slot: &mut usize, value: &str) -> bool {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => {
            *slot = n;
            true
        }
        _ => false,
    }
}

fn set_level(slot: &mut LevelFilter, value: &str) -> bool {
    match klog::parse_level(value) {
        Some(level) => {
            *slot = level;
            true
        }
        None => false,
    }
}
