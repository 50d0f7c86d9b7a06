// crates/spm_physics/src/fluid.rs

//! 流体动量谱求解（ETD 积分）
//!
//! 在波数空间推进不可压缩 Navier–Stokes 动量方程：
//! 黏性扩散项按模解析积分（指数时间差分，ETD），
//! 非线性对流项显式一阶处理。
//!
//! 每模更新式：û ← φ₀·û + dt·φ₁·ĝ，其中
//! φ₀ = e^{−ν k² dt}，φ₁ = (φ₀ − 1)/(−ν k² dt)（k→0 时 φ₁→1），
//! ĝ = −i·P·k·FFT(u⊗u) 为投影后的对流项。
//!
//! 更新后零波数模（平均流）强制为零，防止净动量数值漂移。

use ndarray::Array2;
use num_complex::Complex64;

use spm_foundation::{SpmError, SpmResult};
use spm_spectral::field::ScalarField;
use spm_spectral::{SpectralGrid, VectorField};

/// ETD 积分因子在 |x| 低于此值时使用极限 φ₁ = 1
const ETD_SMALL: f64 = 1e-12;

/// ETD 流体求解器
///
/// 构建时按网格预计算逐模积分因子；运行期无状态。
#[derive(Debug)]
pub struct FluidSolver {
    /// φ₀ = e^{−ν k² dt}
    phi0: Array2<f64>,
    /// φ₁ = (e^{−ν k² dt} − 1)/(−ν k² dt)
    phi1: Array2<f64>,
    dt: f64,
}

impl FluidSolver {
    /// 创建求解器并预计算积分因子
    pub fn new(grid: &SpectralGrid, nu: f64, dt: f64) -> SpmResult<Self> {
        SpmError::check_positive("nu", nu)?;
        SpmError::check_positive("dt", dt)?;
        let mut phi0 = Array2::zeros(grid.shape());
        let mut phi1 = Array2::zeros(grid.shape());
        for ((i, j), p0) in phi0.indexed_iter_mut() {
            let x = -nu * grid.k2(i, j) * dt;
            *p0 = x.exp();
            phi1[[i, j]] = if x.abs() < ETD_SMALL { 1.0 } else { (x.exp() - 1.0) / x };
        }
        Ok(Self { phi0, phi1, dt })
    }

    /// 推进一个子步：输入/输出均为波数域螺线管速度场
    pub fn advance(&self, grid: &SpectralGrid, uk: &VectorField) -> VectorField {
        let gnl = self.advection(grid, uk);

        let shape = uk.shape();
        let mut out = VectorField::zeros(shape);
        for axis in 0..2 {
            let u = uk.comp(axis);
            let g = gnl.comp(axis);
            let o = out.comp_mut(axis);
            for ((i, j), v) in o.indexed_iter_mut() {
                *v = self.phi0[[i, j]] * u[[i, j]] + self.dt * self.phi1[[i, j]] * g[[i, j]];
            }
        }
        out.pin_zero_mode();
        out
    }

    /// 投影后的对流项 ĝ = −i·P·(k·FFT(u⊗u))
    fn advection(&self, grid: &SpectralGrid, uk: &VectorField) -> VectorField {
        let u = grid.inverse_vector(uk);

        // 对流张量 u⊗u 的三个独立分量（标量逐点乘法，对称）
        let axx: ScalarField = &u.x * &u.x;
        let axy: ScalarField = &u.x * &u.y;
        let ayy: ScalarField = &u.y * &u.y;
        let fxx = grid.forward_scalar(&axx);
        let fxy = grid.forward_scalar(&axy);
        let fyy = grid.forward_scalar(&ayy);

        let i1 = Complex64::new(0.0, 1.0);
        let shape = uk.shape();
        let mut gnl = VectorField::zeros(shape);
        for ((i, j), gx) in gnl.x.indexed_iter_mut() {
            let [kx, ky] = grid.k(i, j);
            *gx = -i1 * (kx * fxx[[i, j]] + ky * fxy[[i, j]]);
        }
        for ((i, j), gy) in gnl.y.indexed_iter_mut() {
            let [kx, ky] = grid.k(i, j);
            *gy = -i1 * (kx * fxy[[i, j]] + ky * fyy[[i, j]]);
        }
        grid.project_solenoidal(&mut gnl);
        gnl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SpectralGrid {
        SpectralGrid::new(4, 4, 0.5).unwrap()
    }

    #[test]
    fn test_rejects_nonpositive_viscosity() {
        let g = grid();
        assert!(FluidSolver::new(&g, 0.0, 0.1).is_err());
        assert!(FluidSolver::new(&g, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_zero_field_stays_zero() {
        let g = grid();
        let solver = FluidSolver::new(&g, 1.0, 0.01).unwrap();
        let uk = VectorField::zeros(g.shape());
        let next = solver.advance(&g, &uk);
        assert_eq!(next.max_abs(), 0.0);
    }

    #[test]
    fn test_single_mode_viscous_decay() {
        // 无对流贡献的单模横波应按 e^{−ν k² dt} 精确衰减
        let g = grid();
        let nu = 1.0;
        let dt = 0.01;
        let solver = FluidSolver::new(&g, nu, dt).unwrap();

        let mut uk = VectorField::zeros(g.shape());
        // 波矢沿 x 的单模，速度沿 y：横波，k·u = 0
        let (i0, j0) = (1usize, 0usize);
        uk.y[[i0, j0]] = Complex64::new(1.0, 0.0);
        // 共轭模保证实值速度场
        let ic = g.nx() - i0;
        uk.y[[ic, j0]] = Complex64::new(1.0, 0.0);

        let next = solver.advance(&g, &uk);
        let k2 = g.k2(i0, j0);
        let decay = (-nu * k2 * dt).exp();
        // 该构型下 u⊗u 仅产生 ky=0 的纵向模，对流项恒为零，衰减应精确
        let got = next.y[[i0, j0]].re;
        assert!((got - decay).abs() < 1e-10, "got {} want {}", got, decay);
    }

    #[test]
    fn test_zero_mode_pinned_after_advance() {
        let g = grid();
        let solver = FluidSolver::new(&g, 1.0, 0.01).unwrap();
        let mut uk = VectorField::zeros(g.shape());
        uk.x[[0, 0]] = Complex64::new(5.0, 0.0);
        let next = solver.advance(&g, &uk);
        assert_eq!(next.x[[0, 0]].norm(), 0.0);
        assert_eq!(next.y[[0, 0]].norm(), 0.0);
    }

    #[test]
    fn test_advance_preserves_solenoidality() {
        let g = grid();
        let solver = FluidSolver::new(&g, 1.0, 0.01).unwrap();
        let mut uk = VectorField::zeros(g.shape());
        // 任意横波组合
        for (i0, j0) in [(1usize, 2usize), (3, 1)] {
            let [kx, ky] = g.k(i0, j0);
            uk.x[[i0, j0]] = Complex64::new(ky, 0.1);
            uk.y[[i0, j0]] = Complex64::new(-kx, 0.2 * kx / ky.max(1e-9));
        }
        g.project_solenoidal(&mut uk);
        let next = solver.advance(&g, &uk);
        assert!(g.max_divergence_mode(&next) < 1e-10);
    }
}
