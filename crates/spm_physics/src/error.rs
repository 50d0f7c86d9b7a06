// crates/spm_physics/src/error.rs

//! 物理求解错误类型
//!
//! 在 `spm_foundation` 的核心错误之上扩展求解器相关错误。
//! 线性求解不收敛与场爆破（非有限值）是硬失败：
//! 时间步管线内不做重试，由运行器带帧/步上下文中止。

use spm_foundation::SpmError;
use thiserror::Error;

/// 物理求解结果类型
pub type PhysicsResult<T> = Result<T, PhysicsError>;

/// 物理求解错误
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// 迭代线性求解在迭代预算内未达到残差容限
    #[error("线性求解未收敛: {iterations} 次迭代后相对残差 {residual:.3e}")]
    SolverDiverged {
        /// 已执行的迭代次数
        iterations: usize,
        /// 最终相对残差
        residual: f64,
    },

    /// 场出现非有限值（数值爆破）
    #[error("场出现非有限值: {field}")]
    NonFinite {
        /// 场名称
        field: &'static str,
    },

    /// 基础层错误（配置、校验等）
    #[error(transparent)]
    Foundation(#[from] SpmError),
}
