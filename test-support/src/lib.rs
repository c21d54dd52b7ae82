//! 测试支持 crate
//!
//! 提供主机端测试所需的 Mock 实现：架构操作、基于线程的调度器。
//!
//! 只依赖 `sync`，因此 `vfs`、`fs`、`os` 都可以把它作为 dev-dependency。

pub mod mock;

pub use mock::arch::init_arch_ops;
pub use mock::sched::ThreadScheduler;
