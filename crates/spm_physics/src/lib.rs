// crates/spm_physics/src/lib.rs

//! SPM 电动力学核心
//!
//! 在同一周期谱网格上耦合求解：谱方法流体动量方程（ETD 积分）、
//! 离子组分输运（对流/扩散/电迁移）、变介电常数 Poisson 方程
//! （无矩阵 GMRES）及其导出的 Maxwell 应力，以及粒子位置/速度更新
//! 与光滑外形力耦合。
//!
//! # 模块
//!
//! - [`config`]: 显式配置对象（构建期注入，运行期只读）
//! - [`particle`]: 粒子集合与刚体参数
//! - [`fluid`]: ETD 谱方法动量推进
//! - [`electrokinetics`]: 逐组分浓度更新与自由电荷密度
//! - [`electrostatics`]: 交错网格变介电 Poisson 求解与 Maxwell 应力
//! - [`applied`]: 时谐均匀外加电场
//! - [`engine`]: 子步编排器与可互换积分策略

pub mod applied;
pub mod config;
pub mod electrokinetics;
pub mod electrostatics;
pub mod engine;
pub mod error;
pub mod fluid;
pub mod particle;

pub use config::SimulationConfig;
pub use engine::{SimState, StepEngine, StepReport};
pub use error::{PhysicsError, PhysicsResult};
