// crates/spm_spectral/src/profile.rs

//! 光滑外形（Smoothed Profile）几何
//!
//! 刚性粒子以光滑指示场 φ ∈ [0,1] 表示：界面处在宽度 ξ 内连续过渡，
//! 使粒子与流体方程可在同一周期网格上求解。
//!
//! 本模块提供：
//!
//! - 指示场核函数（tanh 与正弦斜坡两种光滑形状）
//! - 粒子指示场 φ 与单粒子指示场
//! - 粒子固连（刚体）速度场 u_p = Σ φ_i (V_i + ω_i × r_i)
//! - 水动力合力/合力矩：对 φ 加权的动量差积分
//! - 切向投影算子 T = I − n⊗n（n 为界面法向，由 ∇φ 归一化）

use ndarray::Array2;
use num_complex::Complex64;

use crate::field::{lift, ScalarField, VectorField};
use crate::grid::SpectralGrid;

/// 法向归一化的梯度模下限；低于该值的点视为远离界面，T = I
const NORMAL_EPS: f64 = 1e-10;

/// 指示场核函数形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKernel {
    /// tanh 过渡：φ(r) = (1 + tanh((a−r)/ξ)) / 2
    Tanh,
    /// 正弦斜坡：界面带 [a−ξ/2, a+ξ/2] 内用正弦过渡，带外取 0/1
    Sine,
}

impl ProfileKernel {
    /// 距粒子中心 r 处的指示值
    #[inline]
    pub fn eval(&self, r: f64, radius: f64, xi: f64) -> f64 {
        match self {
            ProfileKernel::Tanh => 0.5 * (1.0 + ((radius - r) / xi).tanh()),
            ProfileKernel::Sine => {
                let half = 0.5 * xi;
                if r <= radius - half {
                    1.0
                } else if r >= radius + half {
                    0.0
                } else {
                    0.5 * (1.0 - (std::f64::consts::PI * (r - radius) / xi).sin())
                }
            }
        }
    }
}

/// 粒子外形参数
#[derive(Debug, Clone, Copy)]
pub struct ParticleShape {
    /// 粒子半径
    pub radius: f64,
    /// 界面宽度
    pub xi: f64,
}

impl ParticleShape {
    /// 粒子体积（二维：圆盘面积）
    pub fn volume(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }
}

/// 最小镜像位移：x − center 沿各轴折回 [-L/2, L/2)
#[inline]
pub fn min_image(x: [f64; 2], center: [f64; 2], lengths: [f64; 2]) -> [f64; 2] {
    let mut r = [x[0] - center[0], x[1] - center[1]];
    for a in 0..2 {
        r[a] -= lengths[a] * (r[a] / lengths[a]).round();
    }
    r
}

/// 周期位置折回：各分量规约到 [0, L)
#[inline]
pub fn wrap_position(pos: [f64; 2], lengths: [f64; 2]) -> [f64; 2] {
    [pos[0].rem_euclid(lengths[0]), pos[1].rem_euclid(lengths[1])]
}

/// 单粒子指示场
pub fn indicator_single(
    grid: &SpectralGrid,
    kernel: ProfileKernel,
    shape: ParticleShape,
    center: [f64; 2],
) -> Array2<f64> {
    let lengths = grid.lengths();
    Array2::from_shape_fn(grid.shape(), |(i, j)| {
        let r = min_image(grid.coord(i, j), center, lengths);
        kernel.eval((r[0] * r[0] + r[1] * r[1]).sqrt(), shape.radius, shape.xi)
    })
}

/// 全粒子指示场（逐粒子求和，截断到 1）
pub fn indicator(
    grid: &SpectralGrid,
    kernel: ProfileKernel,
    shape: ParticleShape,
    centers: &[[f64; 2]],
) -> Array2<f64> {
    let mut phi = Array2::zeros(grid.shape());
    for center in centers {
        let single = indicator_single(grid, kernel, shape, *center);
        phi.zip_mut_with(&single, |a: &mut f64, b| *a = (*a + *b).min(1.0));
    }
    phi
}

/// 粒子固连速度场 u_p(x) = Σ_i φ_i(x)·(V_i + ω_i × r_i)
///
/// 二维角速度为标量，ω × r = ω·(−r_y, r_x)。
pub fn rigid_velocity(
    grid: &SpectralGrid,
    kernel: ProfileKernel,
    shape: ParticleShape,
    centers: &[[f64; 2]],
    velocities: &[[f64; 2]],
    omegas: &[f64],
) -> VectorField {
    let lengths = grid.lengths();
    let mut up = VectorField::zeros(grid.shape());
    for ((center, vel), omega) in centers.iter().zip(velocities).zip(omegas) {
        for ((i, j), px) in up.x.indexed_iter_mut() {
            let r = min_image(grid.coord(i, j), *center, lengths);
            let w = kernel.eval((r[0] * r[0] + r[1] * r[1]).sqrt(), shape.radius, shape.xi);
            *px += Complex64::new(w * (vel[0] - omega * r[1]), 0.0);
        }
        for ((i, j), py) in up.y.indexed_iter_mut() {
            let r = min_image(grid.coord(i, j), *center, lengths);
            let w = kernel.eval((r[0] * r[0] + r[1] * r[1]).sqrt(), shape.radius, shape.xi);
            *py += Complex64::new(w * (vel[1] + omega * r[0]), 0.0);
        }
    }
    up
}

/// 单个粒子所受水动力合力与合力矩
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceTorque {
    /// 合力（动量差积分）
    pub force: [f64; 2],
    /// 合力矩（二维标量）
    pub torque: f64,
}

/// 水动力合力/合力矩：F_i = ρ_f ∫ φ_i (u − v_p,i) dV
///
/// u 为实空间流体速度（取实部），v_p,i = V_i + ω_i × r。
/// 合力矩为 r × (动量差) 的积分。
pub fn hydro_force(
    grid: &SpectralGrid,
    kernel: ProfileKernel,
    shape: ParticleShape,
    u: &VectorField,
    centers: &[[f64; 2]],
    velocities: &[[f64; 2]],
    omegas: &[f64],
    rho_fluid: f64,
) -> Vec<ForceTorque> {
    let lengths = grid.lengths();
    let dv = grid.cell_volume();
    let mut out = Vec::with_capacity(centers.len());
    for ((center, vel), omega) in centers.iter().zip(velocities).zip(omegas) {
        let mut fx = 0.0;
        let mut fy = 0.0;
        let mut tq = 0.0;
        for ((i, j), ux) in u.x.indexed_iter() {
            let r = min_image(grid.coord(i, j), *center, lengths);
            let w = kernel.eval((r[0] * r[0] + r[1] * r[1]).sqrt(), shape.radius, shape.xi);
            if w == 0.0 {
                continue;
            }
            let dux = ux.re - (vel[0] - omega * r[1]);
            let duy = u.y[[i, j]].re - (vel[1] + omega * r[0]);
            fx += w * dux;
            fy += w * duy;
            tq += w * (r[0] * duy - r[1] * dux);
        }
        out.push(ForceTorque {
            force: [rho_fluid * fx * dv, rho_fluid * fy * dv],
            torque: rho_fluid * tq * dv,
        });
    }
    out
}

/// 切向投影算子场 T = I − n⊗n（实对称 2×2，逐点存储）
///
/// n 由 ∇φ 归一化得到；远离界面处 ∇φ ≈ 0，T 退化为单位阵，
/// 即流体区内通量不受限制。
#[derive(Debug, Clone)]
pub struct TangentialField {
    /// T_xx
    pub txx: Array2<f64>,
    /// T_xy = T_yx
    pub txy: Array2<f64>,
    /// T_yy
    pub tyy: Array2<f64>,
}

impl TangentialField {
    /// 对复矢量场逐点施加 T（返回新场）
    pub fn apply(&self, v: &VectorField) -> VectorField {
        let x = ScalarField::from_shape_fn(v.x.dim(), |(i, j)| {
            self.txx[[i, j]] * v.x[[i, j]] + self.txy[[i, j]] * v.y[[i, j]]
        });
        let y = ScalarField::from_shape_fn(v.y.dim(), |(i, j)| {
            self.txy[[i, j]] * v.x[[i, j]] + self.tyy[[i, j]] * v.y[[i, j]]
        });
        VectorField::from_components(x, y)
    }
}

/// 由指示场构建切向投影算子
pub fn tangential_operator(grid: &SpectralGrid, phi: &Array2<f64>) -> TangentialField {
    let grad = grid.center_gradient(&lift(phi));
    let shape = grid.shape();
    let mut txx = Array2::from_elem(shape, 1.0);
    let mut txy = Array2::zeros(shape);
    let mut tyy = Array2::from_elem(shape, 1.0);
    for i in 0..shape.0 {
        for j in 0..shape.1 {
            let gx = grad.x[[i, j]].re;
            let gy = grad.y[[i, j]].re;
            let norm = (gx * gx + gy * gy).sqrt();
            if norm > NORMAL_EPS {
                let nx = gx / norm;
                let ny = gy / norm;
                txx[[i, j]] = 1.0 - nx * nx;
                txy[[i, j]] = -nx * ny;
                tyy[[i, j]] = 1.0 - ny * ny;
            }
        }
    }
    TangentialField { txx, txy, tyy }
}
