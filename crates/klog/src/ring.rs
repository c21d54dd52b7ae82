//! 日志行环形缓冲区

use alloc::collections::VecDeque;
use alloc::string::String;
use core::fmt;

use log::Level;

/// 一行已格式化的日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// 全局序号，从 0 开始单调递增
    pub seq: u64,
    /// 级别
    pub level: Level,
    /// 来源（`log` 的 target，通常是模块路径）
    pub target: String,
    /// 消息正文
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>6}] {:<5} {}: {}",
            self.seq, self.level, self.target, self.message
        )
    }
}

/// 有界日志缓冲区，满了以后丢弃最旧的一行
pub struct LogRing {
    lines: VecDeque<LogLine>,
    capacity: usize,
    next_seq: u64,
    dropped: usize,
}

impl LogRing {
    /// 最多保存 `capacity` 行；0 表示只计数不保存
    pub const fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity,
            next_seq: 0,
            dropped: 0,
        }
    }

    /// 追加一行，返回分配到的序号
    pub fn push(&mut self, level: Level, target: &str, message: String) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.capacity == 0 {
            self.dropped += 1;
            return seq;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(LogLine {
            seq,
            level,
            target: String::from(target),
            message,
        });
        seq
    }

    /// 当前保存的行，从旧到新
    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    /// 当前保存的行数
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 因溢出被丢弃的行数
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// 清空已保存的行，序号继续递增
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
