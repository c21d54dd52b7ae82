//! 内存中的节点实现
//!
//! 包括目录、命名管道和设备流。

mod device_stream;
mod ram_dir;
mod ram_fifo;

pub use device_stream::DeviceStream;
pub use ram_dir::RamDirectory;
pub use ram_fifo::RamFifo;
