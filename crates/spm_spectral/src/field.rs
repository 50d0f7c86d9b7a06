// crates/spm_spectral/src/field.rs

//! 场类型与逐点工具
//!
//! 标量场为 `Array2<Complex64>`，矢量场为两个分量的组合。
//! 所有场均为复值：AC 驱动下各物理量携带时谐复结构，
//! 非时谐场景下虚部应保持在数值噪声水平。

use ndarray::Array2;
use num_complex::Complex64;

/// 复值标量场（行优先，形状 = (nx, ny)）
pub type ScalarField = Array2<Complex64>;

/// 复值矢量场（二维：x、y 两个分量）
#[derive(Debug, Clone)]
pub struct VectorField {
    /// x 分量
    pub x: ScalarField,
    /// y 分量
    pub y: ScalarField,
}

impl VectorField {
    /// 创建零矢量场
    pub fn zeros(shape: (usize, usize)) -> Self {
        Self {
            x: Array2::zeros(shape),
            y: Array2::zeros(shape),
        }
    }

    /// 以两个分量构造
    pub fn from_components(x: ScalarField, y: ScalarField) -> Self {
        Self { x, y }
    }

    /// 分量引用（axis: 0=x, 1=y）
    #[inline]
    pub fn comp(&self, axis: usize) -> &ScalarField {
        match axis {
            0 => &self.x,
            _ => &self.y,
        }
    }

    /// 分量可变引用
    #[inline]
    pub fn comp_mut(&mut self, axis: usize) -> &mut ScalarField {
        match axis {
            0 => &mut self.x,
            _ => &mut self.y,
        }
    }

    /// 场形状
    pub fn shape(&self) -> (usize, usize) {
        let s = self.x.dim();
        (s.0, s.1)
    }

    /// 将零波数模（净动量）钉扎为零
    ///
    /// 对波数域动量场使用；每次修改动量后调用，防止净动量漂移。
    pub fn pin_zero_mode(&mut self) {
        self.x[[0, 0]] = Complex64::new(0.0, 0.0);
        self.y[[0, 0]] = Complex64::new(0.0, 0.0);
    }

    /// 逐点相加（self += rhs * scale）
    pub fn add_scaled(&mut self, rhs: &VectorField, scale: Complex64) {
        self.x.zip_mut_with(&rhs.x, |a, b| *a += scale * b);
        self.y.zip_mut_with(&rhs.y, |a, b| *a += scale * b);
    }

    /// 所有分量绝对值的最大值
    pub fn max_abs(&self) -> f64 {
        let mx = self.x.iter().map(|c| c.norm()).fold(0.0, f64::max);
        let my = self.y.iter().map(|c| c.norm()).fold(0.0, f64::max);
        mx.max(my)
    }

    /// 是否所有分量均为有限值
    pub fn all_finite(&self) -> bool {
        self.x.iter().chain(self.y.iter()).all(|c| c.re.is_finite() && c.im.is_finite())
    }
}

// ============================================================
// 逐点工具
// ============================================================

/// 周期滚动：out[i] = f[i - shift]（沿给定轴，负移位取相邻后继）
///
/// 与 numpy.roll 语义一致，用于交错网格的面平均。
pub fn roll<A: Clone + num_traits::Zero>(f: &Array2<A>, shift: isize, axis: usize) -> Array2<A> {
    let (nx, ny) = f.dim();
    let n = if axis == 0 { nx as isize } else { ny as isize };
    let mut out = Array2::zeros((nx, ny));
    for ((i, j), v) in f.indexed_iter() {
        let (mut ti, mut tj) = (i as isize, j as isize);
        if axis == 0 {
            ti = (ti + shift).rem_euclid(n);
        } else {
            tj = (tj + shift).rem_euclid(n);
        }
        out[[ti as usize, tj as usize]] = v.clone();
    }
    out
}

/// 心→面平均：0.5 * (f + roll(f, -1, axis))
///
/// 将胞心标量平均到沿 axis 方向的交错面上（如介电常数的面值）。
pub fn to_faces(f: &ScalarField, axis: usize) -> ScalarField {
    let mut out = roll(f, -1, axis);
    out.zip_mut_with(f, |a, b| *a = 0.5 * (*a + *b));
    out
}

/// 面→心平均：0.5 * (f + roll(f, +1, axis))
///
/// 将交错面上的通量分量平均回胞心。
pub fn to_centers(f: &ScalarField, axis: usize) -> ScalarField {
    let mut out = roll(f, 1, axis);
    out.zip_mut_with(f, |a, b| *a = 0.5 * (*a + *b));
    out
}

/// 实场提升为复场
pub fn lift(f: &Array2<f64>) -> ScalarField {
    f.mapv(|v| Complex64::new(v, 0.0))
}
