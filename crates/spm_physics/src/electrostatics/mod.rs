// crates/spm_physics/src/electrostatics/mod.rs

//! 静电场求解（变介电常数 Poisson 方程）
//!
//! 每个子步：由当前位形的复介电常数场构建无矩阵算子，
//! GMRES 温启动求解内部势，再派生内部电场、束缚电荷与
//! Maxwell 应力体积力。外加场的贡献在右端项与总场中进入，
//! 不出现在系统矩阵里。

pub mod gmres;
pub mod operator;

use num_complex::Complex64;

use spm_spectral::field::{to_centers, to_faces, ScalarField};
use spm_spectral::{SpectralGrid, VectorField};

use crate::error::{PhysicsError, PhysicsResult};

pub use gmres::{GmresConfig, GmresResult, GmresSolver, LinearOperator};
pub use operator::StaggeredPoissonOperator;

/// 单次静电求解的输出
#[derive(Debug, Clone)]
pub struct ElectrostaticSolution {
    /// 内部电势（下个子步的温启动初值）
    pub potential: ScalarField,
    /// 内部电场，已由面心移回胞心
    pub efield: VectorField,
    /// 束缚电荷密度
    pub bound_charge: ScalarField,
    /// Maxwell 应力体积力（胞心）
    pub maxwell_force: VectorField,
    /// GMRES 迭代次数
    pub iterations: usize,
}

/// 静电求解器
///
/// 持有 GMRES 工作区，跨子步复用；算子本身每次由 ε 场重建。
pub struct ElectrostaticSolver {
    gmres: GmresSolver,
    epsilon0: f64,
}

impl ElectrostaticSolver {
    /// 创建求解器
    pub fn new(n: usize, config: GmresConfig, epsilon0: f64) -> Self {
        Self {
            gmres: GmresSolver::new(n, config),
            epsilon0,
        }
    }

    /// 真空（背景）介电常数
    pub fn epsilon0(&self) -> f64 {
        self.epsilon0
    }

    /// 求解当前位形的静电问题
    ///
    /// # 参数
    ///
    /// - `eps`: 胞心复介电常数场
    /// - `deps`: ε 的面心梯度
    /// - `ext`: 外加均匀电场（当前时刻复振幅）
    /// - `rho_e`: 自由电荷密度（零模已钉扎）
    /// - `warm`: 上个子步的内部势，作温启动初值
    ///
    /// # 错误
    ///
    /// 迭代预算耗尽仍未达容限时返回 [`PhysicsError::SolverDiverged`]。
    pub fn solve(
        &mut self,
        grid: &SpectralGrid,
        eps: &ScalarField,
        deps: &VectorField,
        ext: &VectorField,
        rho_e: &ScalarField,
        warm: &ScalarField,
    ) -> PhysicsResult<ElectrostaticSolution> {
        let op = StaggeredPoissonOperator::new(grid, eps);
        let b = op.rhs(ext, rho_e);

        let mut x: Vec<Complex64> = warm.iter().copied().collect();
        let rhs_flat: Vec<Complex64> = b.iter().copied().collect();
        let report = self.gmres.solve(&op, &mut x, &rhs_flat);
        if !report.converged {
            return Err(PhysicsError::SolverDiverged {
                iterations: report.iterations,
                residual: report.relative_residual,
            });
        }

        let mut potential = ScalarField::zeros(grid.shape());
        for (dst, src) in potential.iter_mut().zip(&x) {
            *dst = *src;
        }

        // 内部电场 E = -∇_s ψ（面心）
        let mut e_stag = grid.staggered_gradient(&potential);
        e_stag.x.mapv_inplace(|v| -v);
        e_stag.y.mapv_inplace(|v| -v);

        // 总场 = 内场 + 外加场（面心；均匀外场两套网格同值）
        let mut e_total = e_stag.clone();
        e_total.add_scaled(ext, Complex64::new(1.0, 0.0));

        let bound_charge = op.bound_charge(eps, self.epsilon0, &e_total);
        let maxwell_force = maxwell_force(&e_total, deps, rho_e);

        // 输出场移回胞心
        let efield = VectorField::from_components(
            to_centers(&e_stag.x, 0),
            to_centers(&e_stag.y, 1),
        );

        Ok(ElectrostaticSolution {
            potential,
            efield,
            bound_charge,
            maxwell_force,
            iterations: report.iterations,
        })
    }
}

/// Maxwell 应力体积力
///
/// f = -½ E² ∇ε + ρ_e E，全部由实部组装：
///
/// 1. 面心总场移回胞心，得 E² = E_x² + E_y²
/// 2. 面上组装 f_s = -½·(E²)_f·∂ε + (ρ_e)_f·E_s
/// 3. 各分量沿自身轴移回胞心
pub fn maxwell_force(
    e_total_stag: &VectorField,
    deps: &VectorField,
    rho_e: &ScalarField,
) -> VectorField {
    let re = |f: &ScalarField| f.mapv(|v| Complex64::new(v.re, 0.0));
    let ex = re(&e_total_stag.x);
    let ey = re(&e_total_stag.y);
    let rho = re(rho_e);

    let exc = to_centers(&ex, 0);
    let eyc = to_centers(&ey, 1);
    let e2 = &exc * &exc + &eyc * &eyc;

    let half = Complex64::new(0.5, 0.0);
    let mut fx = to_faces(&e2, 0);
    fx.zip_mut_with(&re(&deps.x), |a, d| *a = -half * *a * d);
    fx.zip_mut_with(&(&to_faces(&rho, 0) * &ex), |a, b| *a += b);

    let mut fy = to_faces(&e2, 1);
    fy.zip_mut_with(&re(&deps.y), |a, d| *a = -half * *a * d);
    fy.zip_mut_with(&(&to_faces(&rho, 1) * &ey), |a, b| *a += b);

    VectorField::from_components(to_centers(&fx, 0), to_centers(&fy, 1))
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
    fn test_constant_eps_no_charge_gives_zero_internal_field() {
        // 均匀介质、零自由电荷：内场恒零，外场不被屏蔽
        let g = grid();
        let n = g.nx() * g.ny();
        let eps = uniform_eps(&g, 1.0);
        let deps = g.staggered_gradient(&eps);
        let mut ext = VectorField::zeros(g.shape());
        ext.y.fill(Complex64::new(0.5, 0.0));
        let rho = ScalarField::zeros(g.shape());
        let warm = ScalarField::zeros(g.shape());
        let mut solver = ElectrostaticSolver::new(n, GmresConfig::default(), 1.0);
        let sol = solver.solve(&g, &eps, &deps, &ext, &rho, &warm).unwrap();
        assert_eq!(sol.iterations, 0, "b = 0 时温启动零初值应零次迭代");
        assert!(sol.efield.max_abs() < 1e-10);
        assert!(sol.bound_charge.iter().all(|v| v.norm() < 1e-10));
    }

    #[test]
    fn test_maxwell_force_uniform_field_no_gradients_is_zero() {
        // 均匀场、均匀 ε、零电荷：体积力为零
        let g = grid();
        let mut e = VectorField::zeros(g.shape());
        e.x.fill(Complex64::new(0.7, 0.0));
        let deps = VectorField::zeros(g.shape());
        let rho = ScalarField::zeros(g.shape());
        let f = maxwell_force(&e, &deps, &rho);
        assert!(f.max_abs() < 1e-12);
    }

    #[test]
    fn test_maxwell_force_charge_term() {
        // 仅电荷项：f = ρ_e E，均匀场均匀电荷下逐点成立
        let g = grid();
        let mut e = VectorField::zeros(g.shape());
        e.x.fill(Complex64::new(2.0, 0.0));
        let deps = VectorField::zeros(g.shape());
        let rho = Array2::from_elem(g.shape(), Complex64::new(0.3, 0.0));
        let f = maxwell_force(&e, &deps, &rho);
        for v in f.x.iter() {
            assert!((v.re - 0.6).abs() < 1e-12);
        }
        for v in f.y.iter() {
            assert!(v.norm() < 1e-12);
        }
    }

    #[test]
    fn test_maxwell_force_uses_real_parts_only() {
        // 纯虚场不产生力
        let g = grid();
        let mut e = VectorField::zeros(g.shape());
        e.x.fill(Complex64::new(0.0, 3.0));
        let deps = VectorField::zeros(g.shape());
        let rho = Array2::from_elem(g.shape(), Complex64::new(0.0, 0.5));
        let f = maxwell_force(&e, &deps, &rho);
        assert!(f.max_abs() < 1e-12);
    }
}
