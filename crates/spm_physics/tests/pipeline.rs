// crates/spm_physics/tests/pipeline.rs

//! 子步管线集成测试
//!
//! 针对可判定的整体性质：中性静止系的零演化、均匀介质下
//! 外加场的直通、组分总量守恒、温启动复用。

use num_complex::Complex64;

use spm_physics::config::GridConfig;
use spm_physics::electrostatics::{ElectrostaticSolver, GmresConfig};
use spm_physics::engine::StepEngine;
use spm_physics::SimulationConfig;
use spm_spectral::dielectric::dielectric_field;
use spm_spectral::profile::{ParticleShape, ProfileKernel};
use spm_spectral::{DielectricModel, MaterialTable, ScalarField, SpectralGrid, VectorField};

fn base_config() -> SimulationConfig {
    let mut cfg = SimulationConfig::default();
    cfg.grid = GridConfig { power_x: 4, power_y: 4, dx: 0.5 };
    cfg.particle.radius = 2.0;
    cfg.particle.xi = 1.0;
    cfg.linear_solver.max_iter = 5000;
    cfg
}

#[test]
fn neutral_system_without_drive_stays_at_rest() {
    // 对称两组分、零外场：电荷逐点抵消，全部场保持零
    let mut cfg = base_config();
    cfg.applied_field.amplitude = 0.0;
    let mut engine = StepEngine::new(cfg).unwrap();
    let mut state = engine.initialize().unwrap();
    let p0 = state.particles.positions[0];

    for _ in 0..3 {
        engine.step(&mut state).unwrap();
    }

    assert!(state.uk.max_abs() < 1e-12, "速度场应保持零");
    assert!(state.rho_e.iter().all(|v| v.norm() < 1e-12), "自由电荷应逐点抵消");
    assert!(state.efield.max_abs() < 1e-12);
    assert_eq!(state.particles.positions[0], p0);
    assert_eq!(state.particles.velocities[0], [0.0, 0.0]);
}

#[test]
fn uniform_medium_passes_applied_field_through() {
    // 均匀介质、中性电荷：内场为零，输出电场逐点等于外加场
    let mut cfg = base_config();
    cfg.dielectric.epsilon_head = 1.0;
    cfg.dielectric.epsilon_tail = 1.0;
    cfg.dielectric.epsilon_fluid = 1.0;
    cfg.dielectric.sigma_head = 2.0;
    cfg.dielectric.sigma_tail = 2.0;
    cfg.dielectric.sigma_fluid = 2.0;
    let amplitude = cfg.applied_field.amplitude;
    let freq = cfg.applied_field.frequency;

    let mut engine = StepEngine::new(cfg).unwrap();
    let mut state = engine.initialize().unwrap();
    let mut entry_time = 0.0;
    for _ in 0..3 {
        entry_time = state.time;
        engine.step(&mut state).unwrap();
    }

    // 外加场取子步入口时刻的复振幅，且只进入输出场一次
    let expected = amplitude * Complex64::from_polar(1.0, -freq * entry_time);
    for v in state.efield.y.iter() {
        assert!((v - expected).norm() < 1e-10, "{} vs {}", v, expected);
    }
    for v in state.efield.x.iter() {
        assert!(v.norm() < 1e-10);
    }
}

#[test]
fn species_totals_are_conserved_under_drive() {
    // 通量散度形式更新：外场驱动下各组分总量严格守恒
    let cfg = base_config();
    let mut engine = StepEngine::new(cfg).unwrap();
    let mut state = engine.initialize().unwrap();

    let before: Vec<Complex64> = state.charges.iter().map(|c| c.sum()).collect();
    for _ in 0..3 {
        engine.step(&mut state).unwrap();
    }
    let after: Vec<Complex64> = state.charges.iter().map(|c| c.sum()).collect();

    for (b, a) in before.iter().zip(&after) {
        assert!(
            (b - a).norm() < 1e-9 * b.norm().max(1.0),
            "组分总量漂移 {} -> {}",
            b,
            a
        );
    }
}

#[test]
fn concentration_imaginary_drift_stays_bounded_under_dc_drive() {
    // 直流驱动下全部物理量应为实值：逐子步报告的浓度虚部
    // 必须停留在数值噪声水平（时谐场景的虚部结构是物理的，不在此列）
    let mut cfg = base_config();
    cfg.applied_field.frequency = 0.0;
    let mut engine = StepEngine::new(cfg).unwrap();
    let mut state = engine.initialize().unwrap();

    for _ in 0..5 {
        let report = engine.step(&mut state).unwrap();
        assert!(
            report.max_imag_concentration < 1e-8,
            "浓度虚部漂移 {:e}",
            report.max_imag_concentration
        );
    }
}

#[test]
fn electrostatic_warm_start_reuses_converged_potential() {
    // 同一位形重复求解：上次的解作初值应零次迭代通过
    let grid = SpectralGrid::new(4, 4, 0.5).unwrap();
    let model = DielectricModel {
        epsilon: MaterialTable { head: 10.0, tail: 0.1, fluid: 1.0 },
        sigma: MaterialTable { head: 0.0, tail: 0.0, fluid: 0.0 },
        blend_xi: 1.0,
    };
    let shape = ParticleShape { radius: 2.0, xi: 1.0 };
    let center = [[4.0, 4.0]];
    let orient = [[1.0, 0.0]];
    let (eps, deps) = dielectric_field(&grid, &model, shape, ProfileKernel::Sine, &center, &orient, 0.0);

    let mut ext = VectorField::zeros(grid.shape());
    ext.y.fill(Complex64::new(0.5, 0.0));
    let rho = ScalarField::zeros(grid.shape());

    let config = GmresConfig { rtol: 1e-5, max_iter: 5000, restart: 30 };
    let mut solver = ElectrostaticSolver::new(grid.nx() * grid.ny(), config, 1.0);

    let cold = solver
        .solve(&grid, &eps, &deps, &ext, &rho, &ScalarField::zeros(grid.shape()))
        .unwrap();
    assert!(cold.iterations > 0, "非均匀介质下冷启动应需要迭代");

    let warm = solver
        .solve(&grid, &eps, &deps, &ext, &rho, &cold.potential)
        .unwrap();
    assert!(
        warm.iterations <= 1 && warm.iterations < cold.iterations,
        "温启动迭代数 {} 应远小于冷启动 {}",
        warm.iterations,
        cold.iterations
    );
}
