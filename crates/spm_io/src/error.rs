// crates/spm_io/src/error.rs

//! 轨迹存储错误类型

use thiserror::Error;

/// 存储操作结果类型
pub type StoreResult<T> = Result<T, StoreError>;

/// 轨迹存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 文件格式错误（魔数、结构）
    #[error("格式错误: {0}")]
    Format(String),

    /// 版本不兼容
    #[error("版本不兼容: 文件版本 {file}, 当前版本 {current}")]
    Version {
        /// 文件中的版本号
        file: u32,
        /// 当前支持的版本号
        current: u32,
    },

    /// 校验和错误
    #[error("校验和错误: 期望 {expected:08x}, 实际 {found:08x}")]
    Checksum {
        /// 文件中记录的校验和
        expected: u32,
        /// 重新计算的校验和
        found: u32,
    },

    /// 帧数据与文件头声明的尺寸不一致
    #[error("尺寸不匹配: {field} 期望 {expected}, 实际 {found}")]
    ShapeMismatch {
        /// 数据集名称
        field: &'static str,
        /// 期望元素数
        expected: usize,
        /// 实际元素数
        found: usize,
    },

    /// 数据损坏（截断等）
    #[error("数据损坏: {0}")]
    Corrupted(String),
}
