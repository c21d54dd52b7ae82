//! 架构相关操作的 Mock 实现

use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use sync::ArchOps;

/// Mock 架构操作
///
/// 只记录“中断开关”状态，不做任何真实的中断屏蔽。
pub struct MockArchOps {
    /// 模拟的中断使能状态
    pub interrupt_state: AtomicBool,
}

impl MockArchOps {
    /// 中断使能位
    pub const SIE: usize = 0x2;

    /// 创建处于“中断开启”状态的实例
    pub const fn new() -> Self {
        Self {
            interrupt_state: AtomicBool::new(true),
        }
    }
}

impl Default for MockArchOps {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchOps for MockArchOps {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        if self.interrupt_state.swap(false, Ordering::SeqCst) {
            Self::SIE
        } else {
            0
        }
    }

    unsafe fn restore_interrupts(&self, flags: usize) {
        self.interrupt_state
            .store(flags & Self::SIE != 0, Ordering::SeqCst);
    }

    fn interrupt_enable_mask(&self) -> usize {
        Self::SIE
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();

static INIT: Once = Once::new();

/// 注册 Mock 架构操作，可重复调用
pub fn init_arch_ops() {
    INIT.call_once(|| {
        // SAFETY: Once 保证只注册一次
        unsafe { sync::register_arch_ops(&MOCK_ARCH_OPS) };
    });
}
