// crates/spm_foundation/src/lib.rs

//! SPM 基础层
//!
//! 提供整个工作区共享的错误类型与参数校验工具。
//! 物理求解相关的错误在 `spm_physics` 中扩展。

pub mod error;

pub use error::{SpmError, SpmResult};
