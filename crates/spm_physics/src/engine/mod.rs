// crates/spm_physics/src/engine/mod.rs

//! 子步编排器
//!
//! 每个子步按固定顺序执行：
//!
//! 1. 组分输运（用上一子步的速度场与总电场）与自由电荷密度
//! 2. 流体 ETD 推进、粒子位形推进、重建指示场与介电场
//! 3. 静电求解（GMRES 温启动），电致体积力注入动量方程（恰一次）
//! 4. 水动力合力/合力矩
//! 5. 粒子速度/角速度推进
//! 6. 刚体约束力，速度场在粒子域内回到刚体速度
//!
//! 外加场在子步入口时刻取值，子步末尾推进时间。
//! 所有场始终保持复值；浓度虚部超出阈值只告警不截断。

pub mod strategy;

use ndarray::Array2;
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::{debug, warn};

use spm_spectral::field::{lift, ScalarField};
use spm_spectral::profile::{
    hydro_force, indicator, rigid_velocity, tangential_operator, ForceTorque, ParticleShape,
    ProfileKernel,
};
use spm_spectral::{dielectric, DielectricModel, MaterialTable, SpectralGrid, VectorField};

use crate::applied::AppliedField;
use crate::config::SimulationConfig;
use crate::electrokinetics::ElectrokineticSolver;
use crate::electrostatics::{ElectrostaticSolver, GmresConfig};
use crate::error::{PhysicsError, PhysicsResult};
use crate::fluid::FluidSolver;
use crate::particle::{ParticleSet, RigidBody};

use strategy::{BodyForceScheme, PositionIntegrator, VelocityIntegrator};

/// 浓度虚部告警阈值
const IMAG_WARN_TOL: f64 = 1e-8;

/// 模拟状态
///
/// 推进变量（速度谱、浓度、粒子、内部势）与帧输出缓存
/// （指示场、介电场、电荷密度、体积力、力率）放在一起，
/// 每子步末尾缓存即为该时刻的一致快照。
#[derive(Debug, Clone)]
pub struct SimState {
    /// 当前时间
    pub time: f64,
    /// 速度场（波数空间）
    pub uk: VectorField,
    /// 各组分浓度（实空间）
    pub charges: Vec<ScalarField>,
    /// 粒子集合
    pub particles: ParticleSet,
    /// 内部电势（温启动初值）
    pub potential_internal: ScalarField,
    /// 总电势（内部 + 外加斜坡）
    pub potential: ScalarField,
    /// 总电场（胞心）
    pub efield: VectorField,
    /// 粒子指示场
    pub phi: Array2<f64>,
    /// 复介电常数场
    pub eps: ScalarField,
    /// 自由电荷密度
    pub rho_e: ScalarField,
    /// 束缚电荷密度
    pub rho_b: ScalarField,
    /// 电致体积力
    pub body_force: VectorField,
    /// 水动力力/力矩变化率
    pub force_rates: Vec<ForceTorque>,
}

/// 单子步报告
#[derive(Debug, Clone)]
pub struct StepReport {
    /// 子步结束时刻
    pub time: f64,
    /// Poisson 求解迭代次数
    pub poisson_iterations: usize,
    /// 实空间最大流速模
    pub max_velocity: f64,
    /// 浓度虚部最大模（应保持在容差内）
    pub max_imag_concentration: f64,
}

/// 子步编排引擎
pub struct StepEngine {
    grid: SpectralGrid,
    config: SimulationConfig,
    shape: ParticleShape,
    body: RigidBody,
    fluid: FluidSolver,
    kinetics: ElectrokineticSolver,
    electrostatics: ElectrostaticSolver,
    applied: AppliedField,
    model: DielectricModel,
    position: Box<dyn PositionIntegrator>,
    velocity: Box<dyn VelocityIntegrator>,
    body_force: BodyForceScheme,
    dt: f64,
}

impl StepEngine {
    /// 由配置装配引擎
    ///
    /// 子步长取谱稳定性界 dt = 1/(ν·max k²)。
    pub fn new(config: SimulationConfig) -> PhysicsResult<Self> {
        config.validate()?;

        let grid = SpectralGrid::new(config.grid.power_x, config.grid.power_y, config.grid.dx)?;
        let nu = config.fluid.nu();
        let dt = 1.0 / (nu * grid.max_k2());

        let shape = ParticleShape { radius: config.particle.radius, xi: config.particle.xi };
        let body = RigidBody::disk(config.particle.radius, config.particle.mass_ratio, config.fluid.rho)?;
        let fluid = FluidSolver::new(&grid, nu, dt)?;
        let kinetics = ElectrokineticSolver::new(config.thermal_energy, dt);

        let gmres = GmresConfig {
            rtol: config.linear_solver.rtol,
            max_iter: config.linear_solver.max_iter,
            restart: config.linear_solver.restart,
        };
        let electrostatics =
            ElectrostaticSolver::new(grid.nx() * grid.ny(), gmres, config.epsilon0);

        let applied = AppliedField {
            amplitude: config.applied_field.amplitude,
            frequency: config.applied_field.frequency,
            axis: config.applied_field.axis,
        };
        let model = DielectricModel {
            epsilon: MaterialTable {
                head: config.dielectric.epsilon_head,
                tail: config.dielectric.epsilon_tail,
                fluid: config.dielectric.epsilon_fluid,
            },
            sigma: MaterialTable {
                head: config.dielectric.sigma_head,
                tail: config.dielectric.sigma_tail,
                fluid: config.dielectric.sigma_fluid,
            },
            blend_xi: config.particle.xi,
        };
        model.validate()?;

        let position = config.scheme.position.make();
        let velocity = config.scheme.velocity.make();
        let body_force = config.scheme.body_force;

        debug!(
            dt,
            nu,
            nx = grid.nx(),
            ny = grid.ny(),
            position = position.name(),
            velocity = velocity.name(),
            "引擎装配完成"
        );

        Ok(Self {
            grid,
            config,
            shape,
            body,
            fluid,
            kinetics,
            electrostatics,
            applied,
            model,
            position,
            velocity,
            body_force,
            dt,
        })
    }

    /// 子步长
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// 网格引用
    pub fn grid(&self) -> &SpectralGrid {
        &self.grid
    }

    /// 配置引用
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// 构造初始状态
    ///
    /// 位置缺省为域中心单粒子，取向缺省为 +x，浓度为各组分均匀初值，
    /// 速度为零。入口即做一次冷启动静电求解，使首个子步的组分输运
    /// 看到 t = 0 的总电场。
    pub fn initialize(&mut self) -> PhysicsResult<SimState> {
        let lengths = self.grid.lengths();
        let positions = if self.config.particle.positions.is_empty() {
            vec![[0.5 * lengths[0], 0.5 * lengths[1]]]
        } else {
            self.config.particle.positions.clone()
        };
        let orientations = if self.config.particle.orientations.is_empty() {
            vec![[1.0, 0.0]; positions.len()]
        } else {
            self.config.particle.orientations.clone()
        };
        let particles = ParticleSet::at_rest(positions, orientations)?;

        let shape = self.grid.shape();
        let c0 = Complex64::new(self.config.initial_concentration, 0.0);
        let charges: Vec<ScalarField> = self
            .config
            .species
            .iter()
            .map(|_| Array2::from_elem(shape, c0))
            .collect();

        let phi = indicator(&self.grid, ProfileKernel::Tanh, self.shape, &particles.positions);
        let phi_s = indicator(&self.grid, ProfileKernel::Sine, self.shape, &particles.positions);
        // 介电场与溶质掩膜同用正弦指示场：界面带外 ε 精确取流体值
        let (eps, deps) = dielectric::dielectric_field(
            &self.grid,
            &self.model,
            self.shape,
            ProfileKernel::Sine,
            &particles.positions,
            &particles.orientations,
            self.config.applied_field.frequency,
        );
        let rho_e = self.kinetics.free_charge(&self.grid, &charges, &self.config.species, &phi_s);

        // t = 0 的冷启动静电求解
        let ext = self.applied.uniform_field(&self.grid, 0.0);
        let pot_ext = self.applied.potential_ramp(&self.grid, 0.0);
        let sol = self.electrostatics.solve(
            &self.grid,
            &eps,
            &deps,
            &ext,
            &rho_e,
            &ScalarField::zeros(shape),
        )?;
        let potential_internal = sol.potential.clone();
        let mut potential = sol.potential;
        potential.zip_mut_with(&pot_ext, |a, b| *a += b);
        let mut efield = sol.efield;
        efield.add_scaled(&ext, Complex64::new(1.0, 0.0));

        let n_particles = particles.len();

        Ok(SimState {
            time: 0.0,
            uk: VectorField::zeros(shape),
            charges,
            particles,
            potential_internal,
            potential,
            efield,
            phi,
            eps,
            rho_e,
            rho_b: sol.bound_charge,
            body_force: sol.maxwell_force,
            force_rates: vec![ForceTorque::default(); n_particles],
        })
    }

    /// 推进一个子步
    pub fn step(&mut self, state: &mut SimState) -> PhysicsResult<StepReport> {
        let grid = &self.grid;
        let lengths = grid.lengths();
        let dt = self.dt;

        // 入口扫描：爆破状态不得进入管线
        if !state.uk.all_finite() {
            return Err(PhysicsError::NonFinite { field: "uk" });
        }
        if !charges_finite(&state.charges) {
            return Err(PhysicsError::NonFinite { field: "concentration" });
        }

        // 外加场在子步入口时刻取值
        let ext = self.applied.uniform_field(grid, state.time);
        let pot_ext = self.applied.potential_ramp(grid, state.time);

        // ---- 1. 组分输运与自由电荷 ----
        let phi_s = indicator(grid, ProfileKernel::Sine, self.shape, &state.particles.positions);
        let u_old = grid.inverse_vector(&state.uk);
        let t_op = tangential_operator(grid, &phi_s);
        let kinetics = self.kinetics;
        let new_charges: Vec<ScalarField> = state
            .charges
            .par_iter()
            .zip(self.config.species.par_iter())
            .map(|(c, sp)| kinetics.advance_species(grid, c, &u_old, &t_op, &state.efield, sp))
            .collect();
        state.charges = new_charges;
        let rho_e = self.kinetics.free_charge(grid, &state.charges, &self.config.species, &phi_s);

        // ---- 2. 流体推进与粒子位形 ----
        state.uk = self.fluid.advance(grid, &state.uk);
        self.position.advance(&mut state.particles, lengths, dt);
        let phi = indicator(grid, ProfileKernel::Tanh, self.shape, &state.particles.positions);
        let (eps, deps) = dielectric::dielectric_field(
            grid,
            &self.model,
            self.shape,
            ProfileKernel::Sine,
            &state.particles.positions,
            &state.particles.orientations,
            self.config.applied_field.frequency,
        );

        // ---- 3. 静电求解与体积力注入 ----
        let sol = self.electrostatics.solve(
            grid,
            &eps,
            &deps,
            &ext,
            &rho_e,
            &state.potential_internal,
        )?;
        state.potential_internal = sol.potential.clone();
        let mut potential = sol.potential;
        potential.zip_mut_with(&pot_ext, |a, b| *a += b);
        let mut efield = sol.efield.clone();
        efield.add_scaled(&ext, Complex64::new(1.0, 0.0));

        let force = match self.body_force {
            BodyForceScheme::MaxwellStress => sol.maxwell_force.clone(),
            BodyForceScheme::ChargeDensity => {
                charge_density_force(&efield, &rho_e, &sol.bound_charge)
            }
        };
        let mut fk = grid.forward_vector(&force);
        grid.project_solenoidal(&mut fk);
        state.uk.add_scaled(&fk, Complex64::new(dt, 0.0));
        state.uk.pin_zero_mode();

        // ---- 4. 水动力 ----
        let u = grid.inverse_vector(&state.uk);
        let forces = hydro_force(
            grid,
            ProfileKernel::Tanh,
            self.shape,
            &u,
            &state.particles.positions,
            &state.particles.velocities,
            &state.particles.omegas,
            self.config.fluid.rho,
        );
        let rates: Vec<ForceTorque> = forces
            .iter()
            .map(|ft| ForceTorque {
                force: [ft.force[0] / dt, ft.force[1] / dt],
                torque: ft.torque / dt,
            })
            .collect();

        // ---- 5. 粒子速度推进 ----
        self.velocity.advance(&mut state.particles, &self.body, &rates, dt);

        // ---- 6. 刚体约束力 ----
        let up = rigid_velocity(
            grid,
            ProfileKernel::Tanh,
            self.shape,
            &state.particles.positions,
            &state.particles.velocities,
            &state.particles.omegas,
        );
        let phi_c = lift(&phi);
        let du = VectorField::from_components(
            &up.x - &(&phi_c * &u.x),
            &up.y - &(&phi_c * &u.y),
        );
        let mut duk = grid.forward_vector(&du);
        grid.project_solenoidal(&mut duk);
        state.uk.add_scaled(&duk, Complex64::new(1.0, 0.0));
        state.uk.pin_zero_mode();

        // ---- 诊断与缓存 ----
        if !state.uk.all_finite() {
            return Err(PhysicsError::NonFinite { field: "uk" });
        }
        if !efield.all_finite() {
            return Err(PhysicsError::NonFinite { field: "efield" });
        }
        if !scalar_finite(&potential) {
            return Err(PhysicsError::NonFinite { field: "potential" });
        }
        if !charges_finite(&state.charges) {
            return Err(PhysicsError::NonFinite { field: "concentration" });
        }
        let max_imag = state
            .charges
            .iter()
            .flat_map(|c| c.iter())
            .map(|v| v.im.abs())
            .fold(0.0, f64::max);
        if max_imag > IMAG_WARN_TOL {
            warn!(max_imag, time = state.time, "浓度虚部漂移超出容差");
        }
        let max_velocity = u.max_abs();

        state.time += dt;
        state.potential = potential;
        state.efield = efield;
        state.phi = phi;
        state.eps = eps;
        state.rho_e = rho_e;
        state.rho_b = sol.bound_charge;
        state.body_force = force;
        state.force_rates = rates;

        debug!(
            time = state.time,
            iters = sol.iterations,
            max_velocity,
            "子步完成"
        );

        Ok(StepReport {
            time: state.time,
            poisson_iterations: sol.iterations,
            max_velocity,
            max_imag_concentration: max_imag,
        })
    }
}

/// 标量场所有分量是否有限
fn scalar_finite(f: &ScalarField) -> bool {
    f.iter().all(|v| v.re.is_finite() && v.im.is_finite())
}

/// 所有组分浓度场是否有限
fn charges_finite(charges: &[ScalarField]) -> bool {
    charges.iter().all(scalar_finite)
}

/// 总电荷直积体积力 f = (ρ_e + ρ_b)·E（胞心，复数组装）
fn charge_density_force(
    efield: &VectorField,
    rho_e: &ScalarField,
    rho_b: &ScalarField,
) -> VectorField {
    let rho = rho_e + rho_b;
    VectorField::from_components(&rho * &efield.x, &rho * &efield.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    fn small_config() -> SimulationConfig {
        let mut cfg = SimulationConfig::default();
        cfg.grid = GridConfig { power_x: 5, power_y: 5, dx: 0.5 };
        cfg.particle.radius = 3.0;
        cfg.particle.xi = 1.0;
        cfg.linear_solver.max_iter = 5000;
        cfg.run.frames = 1;
        cfg.run.substeps = 1;
        cfg
    }

    #[test]
    fn test_engine_assembles_with_defaults() {
        let engine = StepEngine::new(SimulationConfig::default()).unwrap();
        assert!(engine.dt() > 0.0);
    }

    #[test]
    fn test_initialize_places_particle_at_center() {
        let mut engine = StepEngine::new(small_config()).unwrap();
        let state = engine.initialize().unwrap();
        let l = engine.grid().lengths();
        assert_eq!(state.particles.len(), 1);
        assert_eq!(state.particles.positions[0], [0.5 * l[0], 0.5 * l[1]]);
        assert_eq!(state.charges.len(), 2);
        assert!((state.charges[0][[0, 0]].re - 0.1).abs() < 1e-14);
    }

    #[test]
    fn test_step_advances_time_by_dt() {
        let mut engine = StepEngine::new(small_config()).unwrap();
        let mut state = engine.initialize().unwrap();
        let report = engine.step(&mut state).unwrap();
        assert!((state.time - engine.dt()).abs() < 1e-14);
        assert!((report.time - state.time).abs() < 1e-14);
    }

    #[test]
    fn test_step_keeps_fields_finite() {
        let mut engine = StepEngine::new(small_config()).unwrap();
        let mut state = engine.initialize().unwrap();
        for _ in 0..3 {
            let report = engine.step(&mut state).unwrap();
            assert!(report.max_velocity.is_finite());
        }
        assert!(state.uk.all_finite());
        assert!(state.efield.all_finite());
    }

    #[test]
    fn test_dielectric_is_fluid_value_outside_interface_band() {
        // 正弦指示场在 a+ξ/2 外严格为零，远点 ε 必须精确等于流体复介电常数
        let mut engine = StepEngine::new(small_config()).unwrap();
        let mut state = engine.initialize().unwrap();
        let d = &engine.config().dielectric;
        let expect = Complex64::new(
            d.epsilon_fluid,
            -d.sigma_fluid / engine.config().applied_field.frequency,
        );
        // 域角与粒子中心相距远超 a + ξ/2
        assert!((state.eps[[0, 0]] - expect).norm() < 1e-14);

        engine.step(&mut state).unwrap();
        assert!((state.eps[[0, 0]] - expect).norm() < 1e-14);
    }

    #[test]
    fn test_step_rejects_non_finite_velocity() {
        let mut engine = StepEngine::new(small_config()).unwrap();
        let mut state = engine.initialize().unwrap();
        state.uk.x[[1, 1]] = Complex64::new(f64::NAN, 0.0);
        let err = engine.step(&mut state).unwrap_err();
        assert!(matches!(err, PhysicsError::NonFinite { field: "uk" }));
    }

    #[test]
    fn test_step_rejects_non_finite_concentration() {
        let mut engine = StepEngine::new(small_config()).unwrap();
        let mut state = engine.initialize().unwrap();
        state.charges[0][[2, 3]] = Complex64::new(0.1, f64::INFINITY);
        let err = engine.step(&mut state).unwrap_err();
        assert!(matches!(err, PhysicsError::NonFinite { field: "concentration" }));
    }

    #[test]
    fn test_charge_density_force_matches_pointwise_formula() {
        let mut e = VectorField::zeros((4, 4));
        e.x.fill(Complex64::new(2.0, 0.0));
        let rho_e = Array2::from_elem((4, 4), Complex64::new(0.25, 0.0));
        let rho_b = Array2::from_elem((4, 4), Complex64::new(0.15, 0.0));
        let f = charge_density_force(&e, &rho_e, &rho_b);
        for v in f.x.iter() {
            assert!((v.re - 0.8).abs() < 1e-12);
        }
        for v in f.y.iter() {
            assert_eq!(v.norm(), 0.0);
        }
    }
}
