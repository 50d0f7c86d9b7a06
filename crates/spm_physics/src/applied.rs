// crates/spm_physics/src/applied.rs

//! 外加电场生成
//!
//! 产生给定时刻的时谐均匀电场 E₀(t) = A·e^{−i f t} 及其对应的
//! 线性电位斜坡（沿极化轴线性下降）。纯时间函数，无内部状态。

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use spm_spectral::field::ScalarField;
use spm_spectral::{SpectralGrid, VectorField};

/// 极化轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldAxis {
    /// x 轴极化
    X,
    /// y 轴极化
    Y,
}

impl FieldAxis {
    /// 轴序号
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            FieldAxis::X => 0,
            FieldAxis::Y => 1,
        }
    }
}

/// 时谐均匀外加电场
#[derive(Debug, Clone, Copy)]
pub struct AppliedField {
    /// 振幅
    pub amplitude: f64,
    /// 角频率（0 = DC）
    pub frequency: f64,
    /// 极化轴
    pub axis: FieldAxis,
}

impl AppliedField {
    /// t 时刻的复振幅 E₀ = A·e^{−i f t}
    #[inline]
    pub fn amplitude_at(&self, time: f64) -> Complex64 {
        self.amplitude * Complex64::from_polar(1.0, -self.frequency * time)
    }

    /// t 时刻的均匀电场（仅极化轴分量非零）
    pub fn uniform_field(&self, grid: &SpectralGrid, time: f64) -> VectorField {
        let e0 = self.amplitude_at(time);
        let mut ext = VectorField::zeros(grid.shape());
        ext.comp_mut(self.axis.index()).fill(e0);
        ext
    }

    /// t 时刻的电位斜坡：(max(X_axis) − X_axis)·E₀
    pub fn potential_ramp(&self, grid: &SpectralGrid, time: f64) -> ScalarField {
        let e0 = self.amplitude_at(time);
        let axis = self.axis.index();
        let n = if axis == 0 { grid.nx() } else { grid.ny() };
        let max_coord = (n - 1) as f64 * grid.dx();
        ScalarField::from_shape_fn(grid.shape(), |(i, j)| {
            let c = grid.coord(i, j)[axis];
            (max_coord - c) * e0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SpectralGrid {
        SpectralGrid::new(4, 4, 0.5).unwrap()
    }

    #[test]
    fn test_amplitude_matches_harmonic_form() {
        let f = AppliedField { amplitude: 0.5, frequency: 2.0, axis: FieldAxis::X };
        let t = 0.7;
        let e0 = f.amplitude_at(t);
        let expect = 0.5 * Complex64::new((2.0 * t).cos(), -(2.0 * t).sin());
        assert!((e0 - expect).norm() < 1e-14);
    }

    #[test]
    fn test_dc_amplitude_is_real() {
        let f = AppliedField { amplitude: 1.0, frequency: 0.0, axis: FieldAxis::X };
        let e0 = f.amplitude_at(123.0);
        assert!((e0.re - 1.0).abs() < 1e-14);
        assert!(e0.im.abs() < 1e-14);
    }

    #[test]
    fn test_uniform_field_polarization() {
        let g = grid();
        let f = AppliedField { amplitude: 0.5, frequency: 1.0, axis: FieldAxis::Y };
        let ext = f.uniform_field(&g, 0.0);
        for v in ext.x.iter() {
            assert_eq!(v.norm(), 0.0);
        }
        for v in ext.y.iter() {
            assert!((v.re - 0.5).abs() < 1e-14);
        }
    }

    #[test]
    fn test_potential_ramp_gradient_matches_field() {
        // 斜坡差分 (pot[i] − pot[i+1])/dx = E₀（周期折回点除外）
        let g = grid();
        let f = AppliedField { amplitude: 0.3, frequency: 0.0, axis: FieldAxis::X };
        let pot = f.potential_ramp(&g, 0.0);
        for i in 0..g.nx() - 1 {
            let d = (pot[[i, 0]] - pot[[i + 1, 0]]) / g.dx();
            assert!((d.re - 0.3).abs() < 1e-12);
        }
    }
}
