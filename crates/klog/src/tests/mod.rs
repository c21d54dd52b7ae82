use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use log::{Level, LevelFilter, Log, Record};
use sync::SpinLock;

use super::*;

mod filter;
mod ring;

/// 收集控制台输出
struct CaptureOutput {
    text: SpinLock<String>,
}

impl CaptureOutput {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            text: SpinLock::new(String::new()),
        })
    }

    fn text(&self) -> String {
        self.text.lock().clone()
    }
}

impl LogOutput for CaptureOutput {
    fn write_str(&self, s: &str) {
        self.text.lock().push_str(s);
    }
}

/// 直接向实例投递一条记录，不经过全局 logger
fn emit(logger: &KernelLogger, level: Level, target: &str, message: &str) {
    logger.log(
        &Record::builder()
            .level(level)
            .target(target)
            .args(format_args!("{}", message))
            .build(),
    );
}

fn messages(logger: &KernelLogger) -> Vec<String> {
    logger.lines().into_iter().map(|l| l.message).collect()
}
