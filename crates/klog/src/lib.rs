//! 内核日志子系统
//!
//! 该模块为 `log` 门面提供内核端实现 [`KernelLogger`]。
//!
//! # 双输出策略
//!
//! 1. **环形缓冲区存储**：达到全局级别阈值（默认：Info 及以上）的日志写入有界环形缓冲区，
//!    满了以后丢弃最旧的一行，供 `/proc/kmsg` 之类的读取方事后查看。
//! 2. **即时控制台输出**：达到控制台级别阈值（默认：Warn 及以上）的日志同时写到
//!    注册的 [`LogOutput`]。
//!
//! 各个库 crate 只依赖 `log` 宏；内核在启动时用 [`install`] 把同一个
//! [`KernelLogger`] 注册为全局 logger。

#![no_std]

extern crate alloc;

mod logger;
mod ring;

pub use logger::{KernelLogger, install, parse_level};
pub use ring::{LogLine, LogRing};

/// 日志输出 trait
///
/// 实现此 trait 以提供日志的控制台输出能力。
pub trait LogOutput: Send + Sync {
    /// 输出字符串到控制台
    fn write_str(&self, s: &str);
}

/// 默认环形缓冲区行数
pub const DEFAULT_RING_LINES: usize = 256;

/// 单行日志消息的最大字节数，超出部分截断
pub const MAX_LOG_MESSAGE_LENGTH: usize = 256;

#[cfg(test)]
mod tests;
