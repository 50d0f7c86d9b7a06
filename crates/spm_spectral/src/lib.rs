// crates/spm_spectral/src/lib.rs

//! SPM 谱网格模块
//!
//! 提供周期谱网格与光滑外形（Smoothed Profile）几何功能。
//!
//! # 模块
//!
//! - [`grid`]: 周期谱网格、波数向量、正/逆 Fourier 变换、交错差分算子
//! - [`field`]: 复值标量/矢量场类型与逐点工具（roll、面/心平均、零模钉扎）
//! - [`projector`]: 波数空间螺线管（无散）投影
//! - [`profile`]: 指示场核函数、刚体速度场、水动力合力/合力矩、切向投影算子
//! - [`dielectric`]: Janus 粒子介电场生成（含 AC 复介电常数）

pub mod dielectric;
pub mod field;
pub mod grid;
pub mod profile;
pub mod projector;

pub use dielectric::{DielectricModel, MaterialTable};
pub use field::{ScalarField, VectorField};
pub use grid::SpectralGrid;
pub use profile::{ParticleShape, ProfileKernel, TangentialField};
