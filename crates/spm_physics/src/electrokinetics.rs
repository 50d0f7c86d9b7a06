// crates/spm_physics/src/electrokinetics.rs

//! 离子组分输运（电动力学求解器）
//!
//! 对每个组分在波数空间做一次显式 Euler 连续性方程更新：
//!
//! ĉ ← ĉ − i·dt·k·(Â − B̂ − Ĉ)
//!
//! 扩散与电迁移通量经切向投影算子 T = I − n⊗n 限制在流体区内；
//! 对流通量不投影（速度场本身已由粒子约束力贴合刚体运动）：
//!
//! - Â: 对流通量 FFT(u·c)
//! - B̂: 扩散通量 FFT(Γ·kBT·T·∇c)
//! - Ĉ: 电迁移通量 FFT(Γ·z·c·T·(−E))
//!
//! 各组分独立更新，组分间天然可并行（由编排器 rayon 分发）。
//!
//! 守恒性：更新为波数空间散度形式，零模（总量）不被通量改变；
//! 自由电荷密度另行钉扎零模，保证总带电量守恒。

use num_complex::Complex64;

use spm_spectral::field::{lift, ScalarField};
use spm_spectral::profile::TangentialField;
use spm_spectral::{SpectralGrid, VectorField};

use crate::config::SpeciesConfig;

/// 电动力学求解器（逐组分）
#[derive(Debug, Clone, Copy)]
pub struct ElectrokineticSolver {
    /// 热能 kBT
    kbt: f64,
    /// 子步长
    dt: f64,
}

impl ElectrokineticSolver {
    /// 创建求解器
    pub fn new(kbt: f64, dt: f64) -> Self {
        Self { kbt, dt }
    }

    /// 推进单个组分一个子步
    ///
    /// # 参数
    ///
    /// - `c`: 该组分浓度场（实空间，复值）
    /// - `u`: 流体速度（实空间）
    /// - `tangential`: 当前位形的切向投影算子
    /// - `efield`: 电场（实空间，含外加场）
    /// - `species`: 组分价数与迁移率
    pub fn advance_species(
        &self,
        grid: &SpectralGrid,
        c: &ScalarField,
        u: &VectorField,
        tangential: &TangentialField,
        efield: &VectorField,
        species: &SpeciesConfig,
    ) -> ScalarField {
        let ck = grid.forward_scalar(c);

        // A: 对流通量 u·c
        let adv = VectorField::from_components(&u.x * c, &u.y * c);
        let fa = grid.forward_vector(&adv);

        // B: 扩散通量 Γ·kBT·T·∇c（胞心谱梯度）
        let grad_c = grid.center_gradient(c);
        let mut diff = tangential.apply(&grad_c);
        let coeff = Complex64::new(species.mobility * self.kbt, 0.0);
        diff.x.mapv_inplace(|v| coeff * v);
        diff.y.mapv_inplace(|v| coeff * v);
        let fb = grid.forward_vector(&diff);

        // C: 电迁移通量 Γ·z·c·T·(−E)
        let mut neg_e = VectorField::from_components(
            efield.x.mapv(|v| -v),
            efield.y.mapv(|v| -v),
        );
        neg_e = tangential.apply(&neg_e);
        let zc = Complex64::new(species.mobility * species.valence, 0.0);
        let mig = VectorField::from_components(
            ScalarField::from_shape_fn(c.dim(), |(i, j)| zc * c[[i, j]] * neg_e.x[[i, j]]),
            ScalarField::from_shape_fn(c.dim(), |(i, j)| zc * c[[i, j]] * neg_e.y[[i, j]]),
        );
        let fc = grid.forward_vector(&mig);

        // 连续性方程：ĉ − i·dt·k·(A − B − C)
        let i1 = Complex64::new(0.0, 1.0);
        let next_k = ScalarField::from_shape_fn(ck.dim(), |(i, j)| {
            let [kx, ky] = grid.k(i, j);
            let fx = fa.x[[i, j]] - fb.x[[i, j]] - fc.x[[i, j]];
            let fy = fa.y[[i, j]] - fb.y[[i, j]] - fc.y[[i, j]];
            ck[[i, j]] - i1 * self.dt * (kx * fx + ky * fy)
        });
        grid.inverse_scalar(&next_k)
    }

    /// 自由电荷密度 ρ_e = (1 − φ)·Σ z_i c_i，零模钉扎为零
    ///
    /// 零模钉扎使域总自由电荷严格为零（电中性系统），
    /// 与谱空间 Poisson 求解的可解性条件一致。
    pub fn free_charge(
        &self,
        grid: &SpectralGrid,
        charges: &[ScalarField],
        species: &[SpeciesConfig],
        phi: &ndarray::Array2<f64>,
    ) -> ScalarField {
        let mask = lift(&phi.mapv(|v| 1.0 - v));
        let mut rho: ScalarField = ndarray::Array2::zeros(grid.shape());
        for (c, sp) in charges.iter().zip(species) {
            let z = Complex64::new(sp.valence, 0.0);
            rho.zip_mut_with(c, |a, b| *a += z * b);
        }
        rho.zip_mut_with(&mask, |a, b| *a *= b);

        let mut rk = grid.forward_scalar(&rho);
        rk[[0, 0]] = Complex64::new(0.0, 0.0);
        grid.inverse_scalar(&rk)
    }

    /// 域内总浓度（守恒性诊断）
    pub fn total_concentration(&self, c: &ScalarField) -> Complex64 {
        c.sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use spm_spectral::profile::{indicator, tangential_operator, ParticleShape, ProfileKernel};

    fn grid() -> SpectralGrid {
        SpectralGrid::new(4, 4, 0.5).unwrap()
    }

    fn uniform_field(grid: &SpectralGrid, value: f64) -> ScalarField {
        Array2::from_elem(grid.shape(), Complex64::new(value, 0.0))
    }

    #[test]
    fn test_uniform_state_is_stationary() {
        // 均匀浓度、零速度、零电场：三项通量全为零
        let g = grid();
        let solver = ElectrokineticSolver::new(1.0, 0.01);
        let c = uniform_field(&g, 0.1);
        let u = VectorField::zeros(g.shape());
        let e = VectorField::zeros(g.shape());
        let t = tangential_operator(&g, &Array2::zeros(g.shape()));
        let sp = SpeciesConfig { valence: 1.0, mobility: 1.0 };
        let next = solver.advance_species(&g, &c, &u, &t, &e, &sp);
        for (a, b) in next.iter().zip(c.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_total_concentration_conserved() {
        // 无电迁移、周期边界：一子步内总量守恒到离散误差
        let g = grid();
        let solver = ElectrokineticSolver::new(1.0, 0.005);
        let c = ScalarField::from_shape_fn(g.shape(), |(i, j)| {
            Complex64::new(0.1 + 0.01 * ((i * 3 + j * 5) % 7) as f64, 0.0)
        });
        let mut u = VectorField::zeros(g.shape());
        u.x.fill(Complex64::new(0.2, 0.0));
        let e = VectorField::zeros(g.shape());
        let phi = indicator(
            &g,
            ProfileKernel::Sine,
            ParticleShape { radius: 2.0, xi: 1.0 },
            &[[4.0, 4.0]],
        );
        let t = tangential_operator(&g, &phi);
        let sp = SpeciesConfig { valence: 0.0, mobility: 1.0 };
        let before = solver.total_concentration(&c);
        let next = solver.advance_species(&g, &c, &u, &t, &e, &sp);
        let after = solver.total_concentration(&next);
        assert!(
            (before - after).norm() < 1e-10,
            "总量漂移 {:e}",
            (before - after).norm()
        );
    }

    #[test]
    fn test_free_charge_neutral_species_cancel() {
        // 两组分等浓度、相反单位价：自由电荷恒为零
        let g = grid();
        let solver = ElectrokineticSolver::new(1.0, 0.01);
        let c = uniform_field(&g, 0.1);
        let charges = vec![c.clone(), c];
        let species = [
            SpeciesConfig { valence: 1.0, mobility: 1.0 },
            SpeciesConfig { valence: -1.0, mobility: 1.0 },
        ];
        let phi = Array2::zeros(g.shape());
        let rho = solver.free_charge(&g, &charges, &species, &phi);
        for v in rho.iter() {
            assert!(v.norm() < 1e-12);
        }
    }

    #[test]
    fn test_free_charge_zero_mode_pinned() {
        let g = grid();
        let solver = ElectrokineticSolver::new(1.0, 0.01);
        let c = uniform_field(&g, 0.3);
        let species = [SpeciesConfig { valence: 1.0, mobility: 1.0 }];
        let phi = Array2::zeros(g.shape());
        let rho = solver.free_charge(&g, &[c], &species, &phi);
        let rk = g.forward_scalar(&rho);
        assert!(rk[[0, 0]].norm() < 1e-10, "自由电荷零模未钉扎");
    }
}
