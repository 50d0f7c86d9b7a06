// crates/spm_spectral/src/projector.rs

//! 螺线管（无散）投影
//!
//! 波数空间算子 P_ij = δ_ij − k_i k_j / k²，移除矢量场的有散分量，
//! 强制不可压缩性。k = 0 模不含方向信息，保持不变（净动量由调用方
//! 单独钉扎为零）。
//!
//! 投影为幂等算子：P² = P。

use num_complex::Complex64;

use crate::field::VectorField;
use crate::grid::SpectralGrid;

impl SpectralGrid {
    /// 对波数域矢量场施加无散投影（原位）
    pub fn project_solenoidal(&self, v: &mut VectorField) {
        for i in 0..self.nx() {
            for j in 0..self.ny() {
                let [kx, ky] = self.k(i, j);
                let k2 = kx * kx + ky * ky;
                if k2 == 0.0 {
                    continue;
                }
                let ux = v.x[[i, j]];
                let uy = v.y[[i, j]];
                let s = (kx * ux + ky * uy) / k2;
                v.x[[i, j]] = ux - kx * s;
                v.y[[i, j]] = uy - ky * s;
            }
        }
    }

    /// 波数域矢量场与波数向量的最大内积模（散度诊断）
    pub fn max_divergence_mode(&self, v: &VectorField) -> f64 {
        let mut worst = 0.0f64;
        for i in 0..self.nx() {
            for j in 0..self.ny() {
                let [kx, ky] = self.k(i, j);
                let d: Complex64 = kx * v.x[[i, j]] + ky * v.y[[i, j]];
                worst = worst.max(d.norm());
            }
        }
        worst
    }
}
