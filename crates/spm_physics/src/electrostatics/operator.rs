// crates/spm_physics/src/electrostatics/operator.rs

//! 变介电常数 Poisson 算子（无矩阵，交错网格）
//!
//! 系统矩阵 A·ψ = ∇_s·(ε_f ∇_s ψ)，其中：
//!
//! - ∇_s 为带半格偏移相位的谱梯度（面心采样）
//! - ε_f 为沿各轴面平均的复介电常数 ½(ε + roll(ε, -1, axis))
//! - ∇_s· 为共轭偏移相位的谱散度（回到胞心）
//!
//! 算子只依赖当前位形的 ε 场，在每个子步重建一次；
//! GMRES 通过扁平化的复向量访问它。

use num_complex::Complex64;

use spm_spectral::field::{to_faces, ScalarField};
use spm_spectral::{SpectralGrid, VectorField};

use super::gmres::LinearOperator;

/// 交错网格 Poisson 算子
pub struct StaggeredPoissonOperator<'a> {
    grid: &'a SpectralGrid,
    /// 面平均复介电常数（x 面与 y 面）
    eps_face: VectorField,
}

impl<'a> StaggeredPoissonOperator<'a> {
    /// 由胞心 ε 场构建算子，面平均一次完成
    pub fn new(grid: &'a SpectralGrid, eps: &ScalarField) -> Self {
        let eps_face = VectorField::from_components(to_faces(eps, 0), to_faces(eps, 1));
        Self { grid, eps_face }
    }

    /// 面平均介电常数（x 面、y 面）
    pub fn eps_face(&self) -> &VectorField {
        &self.eps_face
    }

    /// 作用于场形式的输入：∇_s·(ε_f ∇_s ψ)
    pub fn apply_field(&self, psi: &ScalarField) -> ScalarField {
        let mut flux = self.grid.staggered_gradient(psi);
        flux.x *= &self.eps_face.x;
        flux.y *= &self.eps_face.y;
        self.grid.staggered_divergence(&flux)
    }

    /// 右端项 b = ∇_s·(ε_f E_ext) − ρ_e
    ///
    /// 外加场在面上取值（均匀场两套网格取值相同），
    /// 与算子左端同一套交错散度。
    pub fn rhs(&self, ext: &VectorField, rho_e: &ScalarField) -> ScalarField {
        let flux = VectorField::from_components(
            &ext.x * &self.eps_face.x,
            &ext.y * &self.eps_face.y,
        );
        let mut b = self.grid.staggered_divergence(&flux);
        b.zip_mut_with(rho_e, |a, r| *a -= r);
        b
    }

    /// 束缚电荷 ρ_b = −∇_s·((ε − ε₀)_f E_total)
    ///
    /// `e_total` 为面心总电场（内场 + 外加场）。
    pub fn bound_charge(
        &self,
        eps: &ScalarField,
        epsilon0: f64,
        e_total: &VectorField,
    ) -> ScalarField {
        let chi = eps.mapv(|v| v - Complex64::new(epsilon0, 0.0));
        let flux = VectorField::from_components(
            &e_total.x * &to_faces(&chi, 0),
            &e_total.y * &to_faces(&chi, 1),
        );
        let mut rho_b = self.grid.staggered_divergence(&flux);
        rho_b.mapv_inplace(|v| -v);
        rho_b
    }
}

impl LinearOperator for StaggeredPoissonOperator<'_> {
    fn apply(&self, x: &[Complex64], y: &mut [Complex64]) {
        // 扁平向量与标准布局场行主序一致
        let mut psi = ScalarField::zeros(self.grid.shape());
        for (dst, src) in psi.iter_mut().zip(x) {
            *dst = *src;
        }
        let out = self.apply_field(&psi);
        for (dst, src) in y.iter_mut().zip(out.iter()) {
            *dst = *src;
        }
    }

    fn dimension(&self) -> usize {
        self.grid.nx() * self.grid.ny()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn grid() -> SpectralGrid {
        SpectralGrid::new(4, 4, 0.5).unwrap()
    }

    fn uniform_eps(grid: &SpectralGrid, value: f64) -> ScalarField {
        Array2::from_elem(grid.shape(), Complex64::new(value, 0.0))
    }

    #[test]
    fn test_constant_eps_reduces_to_scaled_laplacian() {
        // ε ≡ ε₀：算子即 ε₀·∇²，对单模场可逐模验证
        let g = grid();
        let eps0 = 3.0;
        let op = StaggeredPoissonOperator::new(&g, &uniform_eps(&g, eps0));
        let lx = g.lengths()[0];
        let kx = 2.0 * std::f64::consts::PI / lx;
        let psi = ScalarField::from_shape_fn(g.shape(), |(i, _)| {
            Complex64::new((kx * i as f64 * g.dx()).cos(), 0.0)
        });
        let out = op.apply_field(&psi);
        // 偏移相位在正反变换中共轭相消，谱 Laplace 本征值为 -k²
        for ((i, j), v) in out.indexed_iter() {
            let expected = -eps0 * kx * kx * psi[[i, j]].re;
            assert!(
                (v.re - expected).abs() < 1e-10,
                "({}, {}): {} vs {}",
                i,
                j,
                v.re,
                expected
            );
        }
    }

    #[test]
    fn test_apply_constant_field_is_zero() {
        // 常数势梯度为零，算子作用为零（奇异方向）
        let g = grid();
        let op = StaggeredPoissonOperator::new(&g, &uniform_eps(&g, 2.0));
        let n = g.nx() * g.ny();
        let x = vec![Complex64::new(1.5, -0.25); n];
        let mut y = vec![Complex64::new(9.9, 9.9); n];
        op.apply(&x, &mut y);
        for v in &y {
            assert!(v.norm() < 1e-10);
        }
    }

    #[test]
    fn test_rhs_uniform_field_constant_eps_is_minus_rho() {
        // 均匀 ε 下均匀外场无散度：b = -ρ_e
        let g = grid();
        let op = StaggeredPoissonOperator::new(&g, &uniform_eps(&g, 1.0));
        let mut ext = VectorField::zeros(g.shape());
        ext.y.fill(Complex64::new(0.5, 0.0));
        let rho = ScalarField::from_shape_fn(g.shape(), |(i, j)| {
            Complex64::new(((i + 2 * j) % 3) as f64 * 0.1 - 0.1, 0.0)
        });
        let b = op.rhs(&ext, &rho);
        for (bv, rv) in b.iter().zip(rho.iter()) {
            assert!((bv + rv).norm() < 1e-10);
        }
    }

    #[test]
    fn test_bound_charge_vanishes_at_eps0() {
        // ε ≡ ε₀ 时无极化，束缚电荷为零
        let g = grid();
        let op = StaggeredPoissonOperator::new(&g, &uniform_eps(&g, 1.0));
        let mut e = VectorField::zeros(g.shape());
        e.x.fill(Complex64::new(0.3, -0.1));
        let rho_b = op.bound_charge(&uniform_eps(&g, 1.0), 1.0, &e);
        for v in rho_b.iter() {
            assert!(v.norm() < 1e-12);
        }
    }
}
