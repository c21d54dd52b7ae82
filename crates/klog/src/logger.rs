//! `log` 门面的内核实现

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Write;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use sync::SpinLock;

use crate::ring::{LogLine, LogRing};
use crate::{LogOutput, MAX_LOG_MESSAGE_LENGTH};

/// 内核 logger
///
/// 由内核上下文持有；[`install`] 之后同时作为全局 logger。
pub struct KernelLogger {
    ring: SpinLock<LogRing>,
    level: AtomicUsize,
    console_level: AtomicUsize,
    output: SpinLock<Option<Arc<dyn LogOutput>>>,
    installed: AtomicBool,
}

impl KernelLogger {
    /// 创建 logger
    ///
    /// * `capacity` - 环形缓冲区最多保存的行数
    /// * `level` - 写入缓冲区的最低级别
    /// * `console_level` - 同时写到控制台的最低级别
    pub fn new(capacity: usize, level: LevelFilter, console_level: LevelFilter) -> Self {
        Self {
            ring: SpinLock::new(LogRing::new(capacity)),
            level: AtomicUsize::new(level as usize),
            console_level: AtomicUsize::new(console_level as usize),
            output: SpinLock::new(None),
            installed: AtomicBool::new(false),
        }
    }

    /// 注册控制台输出
    pub fn set_output(&self, output: Arc<dyn LogOutput>) {
        *self.output.lock() = Some(output);
    }

    /// 设置全局日志级别阈值
    pub fn set_level(&self, level: LevelFilter) {
        self.level.store(level as usize, Ordering::Release);
        self.sync_max_level();
    }

    /// 当前全局日志级别
    pub fn level(&self) -> LevelFilter {
        filter_from_usize(self.level.load(Ordering::Acquire))
    }

    /// 设置控制台输出级别阈值
    pub fn set_console_level(&self, level: LevelFilter) {
        self.console_level.store(level as usize, Ordering::Release);
        self.sync_max_level();
    }

    /// 当前控制台输出级别
    pub fn console_level(&self) -> LevelFilter {
        filter_from_usize(self.console_level.load(Ordering::Acquire))
    }

    fn sync_max_level(&self) {
        if self.installed.load(Ordering::Acquire) {
            log::set_max_level(self.level().max(self.console_level()));
        }
    }

    /// 缓冲区中的全部行，从旧到新
    pub fn lines(&self) -> Vec<LogLine> {
        self.ring.lock().iter().cloned().collect()
    }

    /// 缓冲区内容，每行以换行结尾
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in self.ring.lock().iter() {
            let _ = writeln!(out, "{}", line);
        }
        out
    }

    /// 缓冲区中的行数
    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    /// 缓冲区是否为空
    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    /// 因溢出被丢弃的行数
    pub fn dropped(&self) -> usize {
        self.ring.lock().dropped()
    }

    /// 清空缓冲区
    pub fn clear(&self) {
        self.ring.lock().clear();
    }

    fn to_ring(&self, level: Level) -> bool {
        level <= self.level()
    }

    fn to_console(&self, level: Level) -> bool {
        level <= self.console_level()
    }
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.to_ring(metadata.level()) || self.to_console(metadata.level())
    }

    fn log(&self, record: &Record<'_>) {
        let level = record.level();
        let (ring, console) = (self.to_ring(level), self.to_console(level));
        if !ring && !console {
            return;
        }
        let mut message = format!("{}", record.args());
        truncate_at_boundary(&mut message, MAX_LOG_MESSAGE_LENGTH);

        let seq = if ring {
            self.ring.lock().push(level, record.target(), message.clone())
        } else {
            0
        };
        if console {
            let output = self.output.lock().clone();
            if let Some(output) = output {
                let line = LogLine {
                    seq,
                    level,
                    target: String::from(record.target()),
                    message,
                };
                output.write_str(&format!("{}\n", line));
            }
        }
    }

    fn flush(&self) {}
}

/// 把 logger 注册为全局 logger，只能成功一次
pub fn install(logger: Arc<KernelLogger>) -> Result<(), SetLoggerError> {
    struct Installed(Arc<KernelLogger>);

    impl Log for Installed {
        fn enabled(&self, metadata: &Metadata<'_>) -> bool {
            self.0.enabled(metadata)
        }

        fn log(&self, record: &Record<'_>) {
            self.0.log(record)
        }

        fn flush(&self) {}
    }

    let installed: &'static Installed = Box::leak(Box::new(Installed(logger.clone())));
    log::set_logger(installed)?;
    logger.installed.store(true, Ordering::Release);
    logger.sync_max_level();
    Ok(())
}

/// 解析级别名（`off`、`error`、`warn`、`info`、`debug`、`trace`，不区分大小写）
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.parse().ok()
}

fn filter_from_usize(value: usize) -> LevelFilter {
    match value {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn truncate_at_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}
