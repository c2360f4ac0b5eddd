//! 有界变差分解 (Aujol 型 f = u + v 分解, 2 维).
//!
//! 交替固定 u / v, 用对偶场 (q1, q2) 上的正交投影迭代逼近
//! 两个子问题; 散度与梯度都取单侧差分, 边界行列按半支处理.
//! 只取 0 号通道做分解, 输出按所选分量经 min-max 归一后复制
//! 到全部通道.
//!
//! 文献: Aujol et al., "Image decomposition into a bounded
//! variation component and an oscillating component", JMIV 22,
//! 2005.

use itertools::{izip, Itertools, MinMaxResult};

use crate::cache::ImageCache;
use crate::error::KernelError;

/// 分解结果的取向.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BvcResult {
    /// 有界变差分量 mean + u.
    BoundedVariation,
    /// 振荡 (纹理 + 噪声) 分量 v.
    Oscillating,
    /// 重构 mean + u + v.
    Reconstruction,
    /// 残差 |f - (mean + u + v)|.
    Difference,
}

/// 对偶场的散度: 边界行列取半支差分.
fn divergence(q1: &[f64], q2: &[f64], width: usize, height: usize, out: &mut [f64]) {
    for y in 0..height {
        for x in 0..width {
            let at = y * width + x;
            let mut d = if y == 0 {
                q2[at]
            } else if y == height - 1 {
                -q2[at - width]
            } else {
                q2[at] - q2[at - width]
            };
            d += if x == 0 {
                q1[at]
            } else if x == width - 1 {
                -q1[at - 1]
            } else {
                q1[at] - q1[at - 1]
            };
            out[at] = d;
        }
    }
}

/// 一步正交投影: 把 (q1, q2) 朝 `(f - mean - target)/lambda`
/// 的约束集推进并重新投影到对偶球.
fn orthogonal_projection(
    residual: &[f64],
    target: &[f64],
    tou: f64,
    lambda: f64,
    width: usize,
    height: usize,
    q1: &mut [f64],
    q2: &mut [f64],
    diff: &mut [f64],
) {
    divergence(q1, q2, width, height, diff);
    for at in 0..width * height {
        diff[at] -= (residual[at] - target[at]) / lambda;
    }
    for y in 0..height {
        for x in 0..width {
            let at = y * width + x;
            let d2 = if y < height - 1 { diff[at + width] - diff[at] } else { 0.0 };
            let d1 = if x < width - 1 { diff[at + 1] - diff[at] } else { 0.0 };
            let norm = (d1 * d1 + d2 * d2).sqrt();
            q1[at] = (q1[at] + tou * d1) / (1.0 + tou * norm);
            q2[at] = (q2[at] + tou * d2) / (1.0 + tou * norm);
        }
    }
}

/// 把 0 号通道分解为 f = mean + u + v 并输出所选分量.
///
/// 输出分量的取值全等 (无法归一) 时报 [`KernelError::FlatResult`].
pub fn bvc_decompose(
    cache: &mut ImageCache,
    result: BvcResult,
    iterations: usize,
    tou: f64,
    lambda: f64,
    mu: f64,
) -> Result<(), KernelError> {
    assert!(iterations >= 1, "iterations 至少为 1");
    assert!(tou > 0.0 && lambda > 0.0 && mu > 0.0, "步长与权重必须为正");
    super::require_planar(cache)?;

    let width = cache.sizes()[0];
    let height = cache.sizes()[1];
    let depth = cache.depth();
    let pixels = width * height;

    // 0 号通道去均值.
    let f: Vec<f64> = (0..pixels).map(|i| cache.data()[i * depth]).collect();
    let mean = f.iter().sum::<f64>() / pixels as f64;
    let residual: Vec<f64> = f.iter().map(|&v| v - mean).collect();

    let mut u = residual.clone();
    let mut v = vec![0.0f64; pixels];
    let mut q1 = vec![0.0f64; pixels];
    let mut q2 = vec![0.0f64; pixels];
    let mut diff = vec![0.0f64; pixels];

    for _ in 0..iterations {
        // 固定 v, 解 u = (f - mean) - v - lambda·div(q).
        q1.fill(0.0);
        q2.fill(0.0);
        for _ in 0..iterations {
            orthogonal_projection(
                &residual, &v, tou, lambda, width, height, &mut q1, &mut q2, &mut diff,
            );
        }
        divergence(&q1, &q2, width, height, &mut diff);
        for (ui, ri, vi, di) in izip!(u.iter_mut(), &residual, &v, &diff) {
            *ui = ri - vi - lambda * di;
        }

        // 固定 u, 解 v = mu·div(q).
        q1.fill(0.0);
        q2.fill(0.0);
        for _ in 0..iterations {
            orthogonal_projection(
                &residual, &u, tou, mu, width, height, &mut q1, &mut q2, &mut diff,
            );
        }
        divergence(&q1, &q2, width, height, &mut diff);
        for (vi, di) in v.iter_mut().zip(&diff) {
            *vi = mu * di;
        }
    }

    let component: Vec<f64> = match result {
        BvcResult::BoundedVariation => u.iter().map(|&ui| mean + ui).collect(),
        BvcResult::Oscillating => v.clone(),
        BvcResult::Reconstruction => {
            (0..pixels).map(|i| mean + u[i] + v[i]).collect()
        }
        BvcResult::Difference => {
            (0..pixels).map(|i| (f[i] - (mean + u[i] + v[i])).abs()).collect()
        }
    };
    let (min, max) = match component.iter().copied().minmax_by(f64::total_cmp) {
        MinMaxResult::MinMax(lo, hi) if hi > lo => (lo, hi),
        _ => return Err(KernelError::FlatResult),
    };

    let mut out = vec![0.0f64; cache.data().len()];
    for (i, &c) in component.iter().enumerate() {
        let norm = (c - min) / (max - min);
        out[i * depth..(i + 1) * depth].fill(norm);
    }
    cache.replace_data(out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{bvc_decompose, BvcResult};
    use crate::error::KernelError;
    use crate::kernel::testing::planar_cache;

    fn step_image() -> Vec<f64> {
        let mut data = vec![0.2; 64];
        for row in 0..8 {
            for col in 4..8 {
                data[row * 8 + col] = 0.8;
            }
        }
        data
    }

    /// 输出总被归一到 [0, 1] 且铺满整个区间.
    #[test]
    fn test_output_normalized() {
        for result in [
            BvcResult::BoundedVariation,
            BvcResult::Oscillating,
            BvcResult::Reconstruction,
            BvcResult::Difference,
        ] {
            let mut cache = planar_cache(8, 8, step_image());
            bvc_decompose(&mut cache, result, 4, 0.1, 0.1, 100.0).unwrap();
            let lo = cache.data().iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = cache.data().iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert!((0.0..=1.0).contains(&lo), "{result:?}: lo = {lo}");
            assert!((lo - 0.0).abs() < 1e-12 && (hi - 1.0).abs() < 1e-12, "{result:?}");
        }
    }

    /// 有界变差分量保留阶跃的左右结构 (左半暗, 右半亮).
    #[test]
    fn test_bounded_variation_keeps_step() {
        let mut cache = planar_cache(8, 8, step_image());
        bvc_decompose(&mut cache, BvcResult::BoundedVariation, 4, 0.1, 0.1, 100.0).unwrap();
        let row = 4;
        assert!(cache.data()[row * 8 + 1] < cache.data()[row * 8 + 6]);
    }

    /// 常值图像所有分量全等, 报 FlatResult.
    #[test]
    fn test_flat_image_rejected() {
        let mut cache = planar_cache(4, 4, vec![0.5; 16]);
        assert_eq!(
            bvc_decompose(&mut cache, BvcResult::Oscillating, 2, 0.1, 0.1, 100.0).unwrap_err(),
            KernelError::FlatResult
        );
    }
}
