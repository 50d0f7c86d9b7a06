// crates/spm_spectral/src/grid.rs

//! 周期谱网格
//!
//! 提供波数向量、交错半胞相移、标量/矢量场的正逆 Fourier 变换，
//! 以及基于谱微分的梯度/散度算子（胞心与交错两种约定）。
//!
//! # 离散约定
//!
//! - 网格各轴尺寸为 2 的幂，胞间距 dx，周期长度 L = n·dx
//! - 波数 k = 2π·m/L，m ∈ [-n/2, n/2)
//! - 交错导数：d/dx|面 = IFFT(i·k·e^{+ik·dx/2}·FFT(f))，
//!   对应实空间的相邻胞差分极限；散度用共轭相移返回胞心
//!
//! # 变换
//!
//! 全部使用复-复变换（rustfft），逆变换归一化因子 1/(nx·ny)。

use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use spm_foundation::{SpmError, SpmResult};

use crate::field::{ScalarField, VectorField};

/// 周期谱网格（二维）
pub struct SpectralGrid {
    nx: usize,
    ny: usize,
    dx: f64,
    /// 各轴角波数 [rad/长度]
    kx: Vec<f64>,
    ky: Vec<f64>,
    /// 半胞相移 e^{+i k dx/2}
    shift_x: Vec<Complex64>,
    shift_y: Vec<Complex64>,
    fwd_x: Arc<dyn Fft<f64>>,
    inv_x: Arc<dyn Fft<f64>>,
    fwd_y: Arc<dyn Fft<f64>>,
    inv_y: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for SpectralGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralGrid")
            .field("nx", &self.nx)
            .field("ny", &self.ny)
            .field("dx", &self.dx)
            .finish()
    }
}

impl SpectralGrid {
    /// 由各轴 2 的幂指数与胞间距创建网格
    ///
    /// # 参数
    ///
    /// - `power_x`, `power_y`: 网格尺寸指数（n = 2^power）
    /// - `dx`: 胞间距，必须为正
    pub fn new(power_x: u32, power_y: u32, dx: f64) -> SpmResult<Self> {
        SpmError::check_positive("dx", dx)?;
        SpmError::check_range("power_x", power_x as f64, 1.0, 14.0)?;
        SpmError::check_range("power_y", power_y as f64, 1.0, 14.0)?;

        let nx = 1usize << power_x;
        let ny = 1usize << power_y;

        let kx = wavenumbers(nx, dx);
        let ky = wavenumbers(ny, dx);
        let shift_x = kx.iter().map(|k| Complex64::from_polar(1.0, k * dx * 0.5)).collect();
        let shift_y = ky.iter().map(|k| Complex64::from_polar(1.0, k * dx * 0.5)).collect();

        let mut planner = FftPlanner::new();
        Ok(Self {
            fwd_x: planner.plan_fft_forward(nx),
            inv_x: planner.plan_fft_inverse(nx),
            fwd_y: planner.plan_fft_forward(ny),
            inv_y: planner.plan_fft_inverse(ny),
            nx,
            ny,
            dx,
            kx,
            ky,
            shift_x,
            shift_y,
        })
    }

    /// x 轴网格点数
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// y 轴网格点数
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// 场形状 (nx, ny)
    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// 胞间距
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// 胞面积（二维体积元）
    pub fn cell_volume(&self) -> f64 {
        self.dx * self.dx
    }

    /// 各轴周期长度 [Lx, Ly]
    pub fn lengths(&self) -> [f64; 2] {
        [self.nx as f64 * self.dx, self.ny as f64 * self.dx]
    }

    /// 胞心坐标
    #[inline]
    pub fn coord(&self, i: usize, j: usize) -> [f64; 2] {
        [i as f64 * self.dx, j as f64 * self.dx]
    }

    /// 给定模的角波数分量
    #[inline]
    pub fn k(&self, i: usize, j: usize) -> [f64; 2] {
        [self.kx[i], self.ky[j]]
    }

    /// 给定模的 k²
    #[inline]
    pub fn k2(&self, i: usize, j: usize) -> f64 {
        self.kx[i] * self.kx[i] + self.ky[j] * self.ky[j]
    }

    /// 全网格最大 k²（时间步长标度：dt = 1/(ν·max k²)）
    pub fn max_k2(&self) -> f64 {
        let mx = self.kx.iter().fold(0.0f64, |a, k| a.max(k * k));
        let my = self.ky.iter().fold(0.0f64, |a, k| a.max(k * k));
        mx + my
    }

    /// 半胞相移因子 e^{+i k dx/2}
    #[inline]
    pub fn shift(&self, i: usize, j: usize) -> [Complex64; 2] {
        [self.shift_x[i], self.shift_y[j]]
    }

    // ============================================================
    // Fourier 变换
    // ============================================================

    /// 标量场正变换（实空间 → 波数域）
    pub fn forward_scalar(&self, f: &ScalarField) -> ScalarField {
        let mut out = f.clone();
        self.transform(&mut out, true);
        out
    }

    /// 标量场逆变换（波数域 → 实空间）
    pub fn inverse_scalar(&self, f: &ScalarField) -> ScalarField {
        let mut out = f.clone();
        self.transform(&mut out, false);
        out
    }

    /// 矢量场正变换
    pub fn forward_vector(&self, v: &VectorField) -> VectorField {
        VectorField {
            x: self.forward_scalar(&v.x),
            y: self.forward_scalar(&v.y),
        }
    }

    /// 矢量场逆变换
    pub fn inverse_vector(&self, v: &VectorField) -> VectorField {
        VectorField {
            x: self.inverse_scalar(&v.x),
            y: self.inverse_scalar(&v.y),
        }
    }

    /// 二维变换：先沿 y（行内连续），再沿 x（跨行），逆变换后归一化
    fn transform(&self, f: &mut ScalarField, forward: bool) {
        let (fft_x, fft_y) = if forward {
            (&self.fwd_x, &self.fwd_y)
        } else {
            (&self.inv_x, &self.inv_y)
        };

        let mut buf_y = vec![Complex64::new(0.0, 0.0); self.ny];
        for mut row in f.outer_iter_mut() {
            for (b, v) in buf_y.iter_mut().zip(row.iter()) {
                *b = *v;
            }
            fft_y.process(&mut buf_y);
            for (v, b) in row.iter_mut().zip(buf_y.iter()) {
                *v = *b;
            }
        }

        let mut buf_x = vec![Complex64::new(0.0, 0.0); self.nx];
        for j in 0..self.ny {
            for i in 0..self.nx {
                buf_x[i] = f[[i, j]];
            }
            fft_x.process(&mut buf_x);
            for i in 0..self.nx {
                f[[i, j]] = buf_x[i];
            }
        }

        if !forward {
            let norm = 1.0 / (self.nx * self.ny) as f64;
            f.mapv_inplace(|c| c * norm);
        }
    }

    // ============================================================
    // 谱微分算子
    // ============================================================

    /// 胞心梯度：IFFT(i·k·FFT(f))
    pub fn center_gradient(&self, f: &ScalarField) -> VectorField {
        let fk = self.forward_scalar(f);
        let i1 = Complex64::new(0.0, 1.0);
        let gx = ScalarField::from_shape_fn(fk.dim(), |(i, j)| i1 * self.kx[i] * fk[[i, j]]);
        let gy = ScalarField::from_shape_fn(fk.dim(), |(i, j)| i1 * self.ky[j] * fk[[i, j]]);
        VectorField {
            x: self.inverse_scalar(&gx),
            y: self.inverse_scalar(&gy),
        }
    }

    /// 交错梯度（胞心标量 → 面通量）：IFFT(i·k·e^{+ik dx/2}·FFT(f))
    pub fn staggered_gradient(&self, f: &ScalarField) -> VectorField {
        let fk = self.forward_scalar(f);
        let i1 = Complex64::new(0.0, 1.0);
        let gx = ScalarField::from_shape_fn(fk.dim(), |(i, j)| {
            i1 * self.kx[i] * self.shift_x[i] * fk[[i, j]]
        });
        let gy = ScalarField::from_shape_fn(fk.dim(), |(i, j)| {
            i1 * self.ky[j] * self.shift_y[j] * fk[[i, j]]
        });
        VectorField {
            x: self.inverse_scalar(&gx),
            y: self.inverse_scalar(&gy),
        }
    }

    /// 交错散度（面通量 → 胞心标量）：IFFT(Σ i·k·conj(e^{+ik dx/2})·FFT(v))
    pub fn staggered_divergence(&self, v: &VectorField) -> ScalarField {
        let vkx = self.forward_scalar(&v.x);
        let vky = self.forward_scalar(&v.y);
        let i1 = Complex64::new(0.0, 1.0);
        let dk = ScalarField::from_shape_fn(vkx.dim(), |(i, j)| {
            i1 * self.kx[i] * self.shift_x[i].conj() * vkx[[i, j]]
                + i1 * self.ky[j] * self.shift_y[j].conj() * vky[[i, j]]
        });
        self.inverse_scalar(&dk)
    }
}

/// 标准 FFT 频率排布下的角波数
fn wavenumbers(n: usize, dx: f64) -> Vec<f64> {
    let length = n as f64 * dx;
    (0..n)
        .map(|m| {
            let m = if m <= n / 2 - 1 { m as isize } else { m as isize - n as isize };
            2.0 * PI * m as f64 / length
        })
        .collect()
}
