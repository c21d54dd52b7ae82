//! 内容生成器

mod meminfo;
mod ps;
mod volumes;

pub use meminfo::MeminfoGenerator;
pub use ps::ProcessListGenerator;
pub use volumes::VolumesGenerator;
