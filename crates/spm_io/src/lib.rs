// crates/spm_io/src/lib.rs

//! SPM 轨迹存储模块
//!
//! 提供分帧的二进制轨迹文件读写：
//!
//! - [`frame`]: 单帧快照记录与尺寸校验
//! - [`store`]: 追加写入器与顺序读取器（每帧 CRC32，逐帧落盘）
//! - [`error`]: 存储错误类型

pub mod error;
pub mod frame;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use frame::{FrameRecord, StoreMeta};
pub use store::{TrajectoryReader, TrajectoryWriter};
