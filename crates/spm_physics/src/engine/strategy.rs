// crates/spm_physics/src/engine/strategy.rs

//! 刚体积分策略与体积力方案
//!
//! 位置/取向与速度/角速度的推进解耦为两个策略接口，
//! 各自提供 Euler 推进与冻结变体；配置层通过枚举选择，
//! 由 `make()` 实例化。

use serde::{Deserialize, Serialize};

use spm_spectral::profile::{wrap_position, ForceTorque};

use crate::particle::{ParticleSet, RigidBody};

// ==================== 位置 / 取向 ====================

/// 位置与取向积分策略 trait
pub trait PositionIntegrator: Send + Sync {
    /// 策略名称
    fn name(&self) -> &'static str;

    /// 推进一个子步
    fn advance(&self, particles: &mut ParticleSet, lengths: [f64; 2], dt: f64);
}

/// 平动 + 旋转的显式 Euler 推进
///
/// 取向按 dq/dt = ω·(-q_y, q_x) 推进后重新归一化。
pub struct EulerPose;

impl PositionIntegrator for EulerPose {
    fn name(&self) -> &'static str {
        "euler"
    }

    fn advance(&self, particles: &mut ParticleSet, lengths: [f64; 2], dt: f64) {
        for i in 0..particles.len() {
            let v = particles.velocities[i];
            let p = particles.positions[i];
            particles.positions[i] =
                wrap_position([p[0] + v[0] * dt, p[1] + v[1] * dt], lengths);
            let w = particles.omegas[i];
            let q = particles.orientations[i];
            particles.orientations[i] = [q[0] - dt * w * q[1], q[1] + dt * w * q[0]];
        }
        particles.normalize_orientations();
    }
}

/// 仅平动，取向固定（AC 驱动 Janus 粒子的默认方案）
pub struct TranslateOnly;

impl PositionIntegrator for TranslateOnly {
    fn name(&self) -> &'static str {
        "translate_only"
    }

    fn advance(&self, particles: &mut ParticleSet, lengths: [f64; 2], dt: f64) {
        for i in 0..particles.len() {
            let v = particles.velocities[i];
            let p = particles.positions[i];
            particles.positions[i] =
                wrap_position([p[0] + v[0] * dt, p[1] + v[1] * dt], lengths);
        }
    }
}

/// 位置与取向均冻结（钉扎粒子）
pub struct FrozenPose;

impl PositionIntegrator for FrozenPose {
    fn name(&self) -> &'static str {
        "frozen"
    }

    fn advance(&self, _particles: &mut ParticleSet, _lengths: [f64; 2], _dt: f64) {}
}

/// 位置积分策略选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PositionUpdate {
    /// 平动 + 旋转
    Euler,
    /// 仅平动
    #[default]
    TranslateOnly,
    /// 冻结
    Frozen,
}

impl PositionUpdate {
    /// 实例化策略
    pub fn make(self) -> Box<dyn PositionIntegrator> {
        match self {
            Self::Euler => Box::new(EulerPose),
            Self::TranslateOnly => Box::new(TranslateOnly),
            Self::Frozen => Box::new(FrozenPose),
        }
    }
}

// ==================== 速度 / 角速度 ====================

/// 速度与角速度积分策略 trait
pub trait VelocityIntegrator: Send + Sync {
    /// 策略名称
    fn name(&self) -> &'static str;

    /// 由力/力矩变化率推进一个子步
    fn advance(
        &self,
        particles: &mut ParticleSet,
        body: &RigidBody,
        rates: &[ForceTorque],
        dt: f64,
    );
}

/// 显式 Euler 速度推进
pub struct EulerVelocity;

impl VelocityIntegrator for EulerVelocity {
    fn name(&self) -> &'static str {
        "euler"
    }

    fn advance(
        &self,
        particles: &mut ParticleSet,
        body: &RigidBody,
        rates: &[ForceTorque],
        dt: f64,
    ) {
        for (i, ft) in rates.iter().enumerate() {
            particles.velocities[i][0] += body.imass * ft.force[0] * dt;
            particles.velocities[i][1] += body.imass * ft.force[1] * dt;
            particles.omegas[i] += body.imoment * ft.torque * dt;
        }
    }
}

/// 速度固定（受迫运动粒子）
pub struct FixedVelocity;

impl VelocityIntegrator for FixedVelocity {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn advance(
        &self,
        _particles: &mut ParticleSet,
        _body: &RigidBody,
        _rates: &[ForceTorque],
        _dt: f64,
    ) {
    }
}

/// 速度积分策略选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VelocityUpdate {
    /// 显式 Euler
    #[default]
    Euler,
    /// 固定速度
    Fixed,
}

impl VelocityUpdate {
    /// 实例化策略
    pub fn make(self) -> Box<dyn VelocityIntegrator> {
        match self {
            Self::Euler => Box::new(EulerVelocity),
            Self::Fixed => Box::new(FixedVelocity),
        }
    }
}

// ==================== 体积力方案 ====================

/// 电致体积力方案
///
/// 两种方案的动量注入均只发生一次：
///
/// - `MaxwellStress`: 静电求解派生的应力散度力（交错网格组装）
/// - `ChargeDensity`: 总电荷直积 (ρ_e + ρ_b)·E（胞心）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BodyForceScheme {
    /// Maxwell 应力散度
    #[default]
    MaxwellStress,
    /// 电荷密度直积
    ChargeDensity,
}
