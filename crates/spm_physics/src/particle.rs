// crates/spm_physics/src/particle.rs

//! 粒子集合与刚体参数
//!
//! 每个粒子恰有一条刚体记录：位置（周期域内）、二维单位矢量取向、
//! 平动速度、标量角速度。位置/取向由位置积分器推进，
//! 速度/角速度由速度积分器推进，二者每子步各推进一次。

use spm_foundation::{SpmError, SpmResult};

/// 粒子集合（SoA 布局）
#[derive(Debug, Clone)]
pub struct ParticleSet {
    /// 位置
    pub positions: Vec<[f64; 2]>,
    /// 取向（单位矢量）
    pub orientations: Vec<[f64; 2]>,
    /// 平动速度
    pub velocities: Vec<[f64; 2]>,
    /// 角速度（二维标量）
    pub omegas: Vec<f64>,
}

impl ParticleSet {
    /// 以静止状态创建粒子集合
    pub fn at_rest(positions: Vec<[f64; 2]>, orientations: Vec<[f64; 2]>) -> SpmResult<Self> {
        SpmError::check_size("orientations", positions.len(), orientations.len())?;
        if positions.is_empty() {
            return Err(SpmError::invalid_input("粒子集合不能为空"));
        }
        let n = positions.len();
        let mut set = Self {
            positions,
            orientations,
            velocities: vec![[0.0, 0.0]; n],
            omegas: vec![0.0; n],
        };
        set.normalize_orientations();
        Ok(set)
    }

    /// 粒子数
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// 取向重新归一化（旋转更新后调用，保持单位模）
    pub fn normalize_orientations(&mut self) {
        for q in &mut self.orientations {
            let norm = (q[0] * q[0] + q[1] * q[1]).sqrt();
            if norm > 0.0 {
                q[0] /= norm;
                q[1] /= norm;
            } else {
                *q = [1.0, 0.0];
            }
        }
    }

    /// 取向单位模偏差的最大值（诊断）
    pub fn max_orientation_defect(&self) -> f64 {
        self.orientations
            .iter()
            .map(|q| ((q[0] * q[0] + q[1] * q[1]).sqrt() - 1.0).abs())
            .fold(0.0, f64::max)
    }
}

/// 刚体惯性参数（同质粒子）
#[derive(Debug, Clone, Copy)]
pub struct RigidBody {
    /// 质量倒数
    pub imass: f64,
    /// 转动惯量倒数
    pub imoment: f64,
}

impl RigidBody {
    /// 由密度比与几何尺寸构造（二维圆盘）
    ///
    /// m = mass_ratio·ρ_f·πa²，I = m·a²/2。
    pub fn disk(radius: f64, mass_ratio: f64, rho_fluid: f64) -> SpmResult<Self> {
        SpmError::check_positive("radius", radius)?;
        SpmError::check_positive("mass_ratio", mass_ratio)?;
        SpmError::check_positive("rho_fluid", rho_fluid)?;
        let volume = std::f64::consts::PI * radius * radius;
        let mass = mass_ratio * rho_fluid * volume;
        let moment = 0.5 * mass * radius * radius;
        Ok(Self { imass: 1.0 / mass, imoment: 1.0 / moment })
    }
}
