// crates/spm_io/src/frame.rs

//! 帧记录
//!
//! 单帧快照包含速度、指示场、介电场、粒子状态、各组分浓度
//! 与全部静电派生量。写入前按文件头声明的尺寸校验。

use ndarray::Array2;
use num_complex::Complex64;

use spm_spectral::profile::ForceTorque;
use spm_spectral::{ScalarField, VectorField};

use crate::error::{StoreError, StoreResult};

/// 轨迹元信息（文件头）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreMeta {
    /// 网格 x 尺寸
    pub nx: usize,
    /// 网格 y 尺寸
    pub ny: usize,
    /// 组分数
    pub n_species: usize,
    /// 粒子数
    pub n_particles: usize,
}

/// 单帧快照
#[derive(Debug, Clone)]
pub struct FrameRecord {
    /// 帧时刻
    pub time: f64,
    /// 实空间速度场
    pub u: VectorField,
    /// 粒子指示场
    pub phi: Array2<f64>,
    /// 复介电常数场
    pub epsilon: ScalarField,
    /// 粒子位置
    pub positions: Vec<[f64; 2]>,
    /// 粒子取向
    pub orientations: Vec<[f64; 2]>,
    /// 粒子速度
    pub velocities: Vec<[f64; 2]>,
    /// 粒子角速度
    pub omegas: Vec<f64>,
    /// 水动力力/力矩率
    pub force_rates: Vec<ForceTorque>,
    /// 各组分浓度
    pub concentrations: Vec<ScalarField>,
    /// 全组分全域浓度总和（守恒性诊断）
    pub c_total: Complex64,
    /// 自由电荷密度
    pub free_charge: ScalarField,
    /// 束缚电荷密度
    pub bound_charge: ScalarField,
    /// 总电势
    pub potential: ScalarField,
    /// 总电场（胞心）
    pub efield: VectorField,
    /// 电致体积力
    pub body_force: VectorField,
}

impl FrameRecord {
    /// 校验帧各数据集尺寸与元信息一致
    pub fn check_shapes(&self, meta: &StoreMeta) -> StoreResult<()> {
        let cells = (meta.nx, meta.ny);
        let check_scalar = |field: &'static str, f: &ScalarField| -> StoreResult<()> {
            if f.dim() != cells {
                return Err(StoreError::ShapeMismatch {
                    field,
                    expected: meta.nx * meta.ny,
                    found: f.len(),
                });
            }
            Ok(())
        };
        let check_vector = |field: &'static str, v: &VectorField| -> StoreResult<()> {
            if v.x.dim() != cells || v.y.dim() != cells {
                return Err(StoreError::ShapeMismatch {
                    field,
                    expected: meta.nx * meta.ny,
                    found: v.x.len(),
                });
            }
            Ok(())
        };
        let check_count = |field: &'static str, found: usize, expected: usize| -> StoreResult<()> {
            if found != expected {
                return Err(StoreError::ShapeMismatch { field, expected, found });
            }
            Ok(())
        };

        check_vector("u", &self.u)?;
        if self.phi.dim() != cells {
            return Err(StoreError::ShapeMismatch {
                field: "phi",
                expected: meta.nx * meta.ny,
                found: self.phi.len(),
            });
        }
        check_scalar("epsilon", &self.epsilon)?;
        check_count("positions", self.positions.len(), meta.n_particles)?;
        check_count("orientations", self.orientations.len(), meta.n_particles)?;
        check_count("velocities", self.velocities.len(), meta.n_particles)?;
        check_count("omegas", self.omegas.len(), meta.n_particles)?;
        check_count("force_rates", self.force_rates.len(), meta.n_particles)?;
        check_count("concentrations", self.concentrations.len(), meta.n_species)?;
        for c in &self.concentrations {
            check_scalar("concentration", c)?;
        }
        check_scalar("free_charge", &self.free_charge)?;
        check_scalar("bound_charge", &self.bound_charge)?;
        check_scalar("potential", &self.potential)?;
        check_vector("efield", &self.efield)?;
        check_vector("body_force", &self.body_force)?;
        Ok(())
    }
}
