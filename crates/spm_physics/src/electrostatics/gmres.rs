// crates/spm_physics/src/electrostatics/gmres.rs

//! 重启广义最小残差法（GMRES）求解器
//!
//! 该模块实现复数域上的重启 GMRES(m) 算法，用于求解非对称线性系统
//! Ax = b。主要用于变介电常数 Poisson 方程的无矩阵求解。
//!
//! # 算法概述
//!
//! 1. r_0 = b - A*x_0, β = ||r_0||, v_1 = r_0/β
//! 2. Arnoldi 过程（修正 Gram-Schmidt）构建 Krylov 基：
//!    - w = A*v_j
//!    - h_{ij} = ⟨v_i, w⟩, w ← w - h_{ij}*v_i（i ≤ j）
//!    - h_{j+1,j} = ||w||, v_{j+1} = w/h_{j+1,j}
//! 3. 复 Givens 旋转逐列三角化 Hessenberg 矩阵，
//!    残差模为 |g_{j+1}|，无需显式成解即可判敛
//! 4. 回代求 y，x ← x + V*y；未收敛则以当前 x 重启
//!
//! 复内积取 ⟨x, y⟩ = Σ conj(x_i)·y_i。

use num_complex::Complex64;

/// 数值零阈值，用于幸运中断与除零保护
const BREAKDOWN_TOL: f64 = 1e-30;

/// 无矩阵线性算子 trait
///
/// GMRES 只通过矩阵-向量乘积访问系统矩阵，
/// 实现者提供 y = A*x 的计算。
pub trait LinearOperator {
    /// 计算 y = A * x（结果写入 `y`）
    fn apply(&self, x: &[Complex64], y: &mut [Complex64]);

    /// 系统维度
    fn dimension(&self) -> usize;
}

/// GMRES 求解器配置
#[derive(Debug, Clone)]
pub struct GmresConfig {
    /// 相对残差容限（||r|| / ||b||）
    pub rtol: f64,
    /// 总迭代次数上限（跨重启累计）
    pub max_iter: usize,
    /// 重启长度 m
    pub restart: usize,
}

impl Default for GmresConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            max_iter: 500,
            restart: 30,
        }
    }
}

/// GMRES 求解结果
#[derive(Debug, Clone)]
pub struct GmresResult {
    /// 是否收敛
    pub converged: bool,
    /// 实际迭代次数（跨重启累计）
    pub iterations: usize,
    /// 最终残差范数
    pub residual_norm: f64,
    /// 相对残差（||r|| / ||b||）
    pub relative_residual: f64,
}

/// GMRES 求解器工作区
///
/// 存储 Krylov 基与 Hessenberg 分解所需的全部缓冲区，
/// 跨多次求解复用，避免重复分配。
pub struct GmresWorkspace {
    /// Krylov 正交基 v_1..v_{m+1}
    basis: Vec<Vec<Complex64>>,
    /// Hessenberg 矩阵，按列存储，每列长 m+1
    hess: Vec<Vec<Complex64>>,
    /// 旋转后的右端投影 g
    g: Vec<Complex64>,
    /// Givens 旋转系数 c
    cs: Vec<Complex64>,
    /// Givens 旋转系数 s
    sn: Vec<Complex64>,
    /// 残差 / Arnoldi 候选向量
    w: Vec<Complex64>,
    /// 回代解
    y: Vec<Complex64>,
    /// 已分配的系统维度
    n_allocated: usize,
}

impl GmresWorkspace {
    /// 创建新的工作区
    pub fn new(n: usize, restart: usize) -> Self {
        let m = restart;
        Self {
            basis: (0..m + 1).map(|_| vec![Complex64::ZERO; n]).collect(),
            hess: (0..m).map(|_| vec![Complex64::ZERO; m + 1]).collect(),
            g: vec![Complex64::ZERO; m + 1],
            cs: vec![Complex64::ZERO; m],
            sn: vec![Complex64::ZERO; m],
            w: vec![Complex64::ZERO; n],
            y: vec![Complex64::ZERO; m],
            n_allocated: n,
        }
    }

    /// 确保工作区容量足够
    pub fn ensure_capacity(&mut self, n: usize, restart: usize) {
        if n > self.n_allocated || restart + 1 > self.basis.len() {
            *self = Self::new(n.max(self.n_allocated), restart);
        }
    }
}

/// 重启 GMRES 求解器
pub struct GmresSolver {
    config: GmresConfig,
    workspace: GmresWorkspace,
}

impl GmresSolver {
    /// 创建求解器
    pub fn new(n: usize, config: GmresConfig) -> Self {
        let workspace = GmresWorkspace::new(n, config.restart);
        Self { config, workspace }
    }

    /// 获取配置引用
    pub fn config(&self) -> &GmresConfig {
        &self.config
    }

    /// 求解线性系统 Ax = b
    ///
    /// # 参数
    ///
    /// - `op`: 系统算子（无矩阵）
    /// - `x`: 解向量（输入初始猜测，输出解；温启动直接传入上次的解）
    /// - `b`: 右端向量
    pub fn solve<M: LinearOperator>(
        &mut self,
        op: &M,
        x: &mut [Complex64],
        b: &[Complex64],
    ) -> GmresResult {
        let n = op.dimension();
        let m = self.config.restart;
        self.workspace.ensure_capacity(n, m);
        let ws = &mut self.workspace;

        let b_norm = vec_norm(b);
        if b_norm < BREAKDOWN_TOL {
            // 齐次系统：零解
            x.fill(Complex64::ZERO);
            return GmresResult {
                converged: true,
                iterations: 0,
                residual_norm: 0.0,
                relative_residual: 0.0,
            };
        }

        let mut total_iters = 0usize;
        let mut residual;

        loop {
            // 外层：重算真实残差 r = b - A*x
            op.apply(x, &mut ws.w);
            for (wi, bi) in ws.w.iter_mut().zip(b) {
                *wi = bi - *wi;
            }
            let beta = vec_norm(&ws.w);
            residual = beta;
            if beta / b_norm < self.config.rtol {
                return GmresResult {
                    converged: true,
                    iterations: total_iters,
                    residual_norm: beta,
                    relative_residual: beta / b_norm,
                };
            }
            if total_iters >= self.config.max_iter {
                return GmresResult {
                    converged: false,
                    iterations: total_iters,
                    residual_norm: beta,
                    relative_residual: beta / b_norm,
                };
            }

            let inv_beta = Complex64::new(1.0 / beta, 0.0);
            for (vi, wi) in ws.basis[0].iter_mut().zip(&ws.w) {
                *vi = inv_beta * wi;
            }
            ws.g.fill(Complex64::ZERO);
            ws.g[0] = Complex64::new(beta, 0.0);

            // 内层 Arnoldi 循环
            let mut k = 0usize;
            for j in 0..m {
                op.apply(&ws.basis[j], &mut ws.w);

                // 修正 Gram-Schmidt 正交化
                for i in 0..=j {
                    let h = dotc(&ws.basis[i], &ws.w);
                    ws.hess[j][i] = h;
                    for (wi, vi) in ws.w.iter_mut().zip(&ws.basis[i]) {
                        *wi -= h * vi;
                    }
                }
                let h_next = vec_norm(&ws.w);
                ws.hess[j][j + 1] = Complex64::new(h_next, 0.0);
                let breakdown = h_next < BREAKDOWN_TOL;
                if !breakdown {
                    let inv = Complex64::new(1.0 / h_next, 0.0);
                    for (vi, wi) in ws.basis[j + 1].iter_mut().zip(&ws.w) {
                        *vi = inv * wi;
                    }
                }

                // 施加已有旋转，三角化本列
                for i in 0..j {
                    let hi = ws.hess[j][i];
                    let hi1 = ws.hess[j][i + 1];
                    ws.hess[j][i] = ws.cs[i].conj() * hi + ws.sn[i].conj() * hi1;
                    ws.hess[j][i + 1] = -ws.sn[i] * hi + ws.cs[i] * hi1;
                }

                // 构造消去 h_{j+1,j} 的新旋转
                let a = ws.hess[j][j];
                let bb = ws.hess[j][j + 1];
                let r = (a.norm_sqr() + bb.norm_sqr()).sqrt();
                if r > BREAKDOWN_TOL {
                    ws.cs[j] = a / r;
                    ws.sn[j] = bb / r;
                } else {
                    ws.cs[j] = Complex64::ONE;
                    ws.sn[j] = Complex64::ZERO;
                }
                ws.hess[j][j] = Complex64::new(r, 0.0);
                ws.hess[j][j + 1] = Complex64::ZERO;
                ws.g[j + 1] = -ws.sn[j] * ws.g[j];
                ws.g[j] = ws.cs[j].conj() * ws.g[j];

                total_iters += 1;
                k = j + 1;
                residual = ws.g[j + 1].norm();
                if residual / b_norm < self.config.rtol
                    || total_iters >= self.config.max_iter
                    || breakdown
                {
                    break;
                }
            }

            // 回代上三角系统 H y = g
            for i in (0..k).rev() {
                let mut s = ws.g[i];
                for l in i + 1..k {
                    s -= ws.hess[l][i] * ws.y[l];
                }
                ws.y[i] = s / ws.hess[i][i];
            }
            for j in 0..k {
                let yj = ws.y[j];
                for (xi, vi) in x.iter_mut().zip(&ws.basis[j]) {
                    *xi += yj * vi;
                }
            }

            if residual / b_norm < self.config.rtol {
                return GmresResult {
                    converged: true,
                    iterations: total_iters,
                    residual_norm: residual,
                    relative_residual: residual / b_norm,
                };
            }
            if total_iters >= self.config.max_iter {
                return GmresResult {
                    converged: false,
                    iterations: total_iters,
                    residual_norm: residual,
                    relative_residual: residual / b_norm,
                };
            }
            // 重启：外层循环以当前 x 重新计算残差
        }
    }
}

/// 复内积 ⟨x, y⟩ = Σ conj(x_i)·y_i
#[inline]
fn dotc(x: &[Complex64], y: &[Complex64]) -> Complex64 {
    x.iter().zip(y).map(|(a, b)| a.conj() * b).sum()
}

/// 欧氏范数
#[inline]
fn vec_norm(x: &[Complex64]) -> f64 {
    x.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 稠密矩阵算子（仅测试用）
    struct DenseOperator {
        a: Vec<Vec<Complex64>>,
    }

    impl LinearOperator for DenseOperator {
        fn apply(&self, x: &[Complex64], y: &mut [Complex64]) {
            for (row, yi) in self.a.iter().zip(y.iter_mut()) {
                *yi = row.iter().zip(x).map(|(aij, xj)| aij * xj).sum();
            }
        }

        fn dimension(&self) -> usize {
            self.a.len()
        }
    }

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_gmres_diagonal_system() {
        // 对角系统 A = diag(1..n)，解 x_i = 1/i
        let n = 10;
        let a: Vec<Vec<Complex64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if i == j { c((i + 1) as f64, 0.0) } else { Complex64::ZERO })
                    .collect()
            })
            .collect();
        let op = DenseOperator { a };
        let b = vec![Complex64::ONE; n];
        let mut x = vec![Complex64::ZERO; n];
        let mut solver = GmresSolver::new(n, GmresConfig::default());
        let result = solver.solve(&op, &mut x, &b);
        assert!(result.converged, "GMRES 应收敛");
        for (i, xi) in x.iter().enumerate() {
            let expected = 1.0 / ((i + 1) as f64);
            assert!((xi - c(expected, 0.0)).norm() < 1e-4, "x[{}] = {}", i, xi);
        }
    }

    #[test]
    fn test_gmres_complex_2x2() {
        // 复系数 2x2 系统，已知精确解 x = (1, -i)
        let a = vec![
            vec![c(2.0, 1.0), c(0.0, -1.0)],
            vec![c(1.0, 0.0), c(3.0, 0.0)],
        ];
        let x_exact = [c(1.0, 0.0), c(0.0, -1.0)];
        let op = DenseOperator { a: a.clone() };
        let mut b = vec![Complex64::ZERO; 2];
        op.apply(&x_exact, &mut b);
        let mut x = vec![Complex64::ZERO; 2];
        let mut solver = GmresSolver::new(2, GmresConfig::default());
        let result = solver.solve(&op, &mut x, &b);
        assert!(result.converged);
        for (xi, xe) in x.iter().zip(&x_exact) {
            assert!((xi - xe).norm() < 1e-4);
        }
    }

    #[test]
    fn test_gmres_warm_start_exact_guess() {
        // 初始猜测即为精确解：零次迭代收敛
        let n = 4;
        let a: Vec<Vec<Complex64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if i == j { c(2.0, 0.5) } else { Complex64::ZERO })
                    .collect()
            })
            .collect();
        let op = DenseOperator { a };
        let x_exact: Vec<Complex64> = (0..n).map(|i| c(i as f64, -1.0)).collect();
        let mut b = vec![Complex64::ZERO; n];
        op.apply(&x_exact, &mut b);
        let mut x = x_exact.clone();
        let mut solver = GmresSolver::new(n, GmresConfig::default());
        let result = solver.solve(&op, &mut x, &b);
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_gmres_restart_path() {
        // 重启长度小于问题维度，仍应收敛
        let n = 8;
        let a: Vec<Vec<Complex64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            c(4.0 + i as f64, 0.0)
                        } else if j == i + 1 {
                            c(1.0, 0.2)
                        } else {
                            Complex64::ZERO
                        }
                    })
                    .collect()
            })
            .collect();
        let op = DenseOperator { a };
        let b = vec![Complex64::ONE; n];
        let mut x = vec![Complex64::ZERO; n];
        let config = GmresConfig { rtol: 1e-8, max_iter: 200, restart: 3 };
        let mut solver = GmresSolver::new(n, config);
        let result = solver.solve(&op, &mut x, &b);
        assert!(result.converged, "重启路径应收敛，残差 {:e}", result.relative_residual);
        // 验证 ||Ax - b|| 确实小
        let mut ax = vec![Complex64::ZERO; n];
        op.apply(&x, &mut ax);
        let err: f64 = ax.iter().zip(&b).map(|(p, q)| (p - q).norm_sqr()).sum::<f64>().sqrt();
        assert!(err < 1e-6);
    }

    #[test]
    fn test_gmres_exhaustion_reports_divergence() {
        // 迭代预算给 1 次，非平凡系统不可能收敛
        let n = 6;
        let a: Vec<Vec<Complex64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| c(((i * 7 + j * 3) % 5 + 1) as f64, ((i + j) % 3) as f64))
                    .collect()
            })
            .collect();
        let op = DenseOperator { a };
        let b: Vec<Complex64> = (0..n).map(|i| c(1.0 + i as f64, -0.5)).collect();
        let mut x = vec![Complex64::ZERO; n];
        let config = GmresConfig { rtol: 1e-14, max_iter: 1, restart: 30 };
        let mut solver = GmresSolver::new(n, config);
        let result = solver.solve(&op, &mut x, &b);
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
    }
}
