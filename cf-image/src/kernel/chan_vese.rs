//! Chan-Vese 活动轮廓分割 (2 维).
//!
//! 水平集 phi 从一个内切圆出发, 按正则化 Heaviside / Dirac
//! 近似演化: 曲率项用 "前向差分 / sqrt(前向² + 中心²/4)" 的
//! 归一化梯度再取后向差分, 数据项用内外两侧的加权灰度均值.
//! 演化完成后按 phi 的符号输出两档标签.

use std::f64::consts::PI;

use crate::cache::ImageCache;
use crate::consts::chan_vese::{
    CIRCLE_MARGIN, CURVATURE_WEIGHT, GRAY_SCALE, INSIDE_VALUE, OUTSIDE_VALUE, TIME_STEP,
};
use crate::error::KernelError;

fn dirac(x: f64) -> f64 {
    1.0 / (PI * (1.0 + x * x))
}

fn heaviside(x: f64) -> f64 {
    0.5 * (1.0 + 2.0 * x.atan() / PI)
}

/// 前向 x 差分, 末列取 0.
fn delta_x_forward(src: &[f64], out: &mut [f64], w: usize, h: usize) {
    for y in 0..h {
        for x in 0..w {
            out[y * w + x] = if x == w - 1 { 0.0 } else { src[y * w + x + 1] - src[y * w + x] };
        }
    }
}

/// 后向 x 差分, 首列取 0.
fn delta_x_backward(src: &[f64], out: &mut [f64], w: usize, h: usize) {
    for y in 0..h {
        for x in 0..w {
            out[y * w + x] = if x == 0 { 0.0 } else { src[y * w + x] - src[y * w + x - 1] };
        }
    }
}

/// 中心 x 差分, 两侧列取 0.
fn delta_x_central(src: &[f64], out: &mut [f64], w: usize, h: usize) {
    for y in 0..h {
        for x in 0..w {
            out[y * w + x] = if x == 0 || x == w - 1 {
                0.0
            } else {
                src[y * w + x + 1] - src[y * w + x - 1]
            };
        }
    }
}

fn delta_y_forward(src: &[f64], out: &mut [f64], w: usize, h: usize) {
    for y in 0..h {
        for x in 0..w {
            out[y * w + x] = if y == h - 1 { 0.0 } else { src[(y + 1) * w + x] - src[y * w + x] };
        }
    }
}

fn delta_y_backward(src: &[f64], out: &mut [f64], w: usize, h: usize) {
    for y in 0..h {
        for x in 0..w {
            out[y * w + x] = if y == 0 { 0.0 } else { src[y * w + x] - src[(y - 1) * w + x] };
        }
    }
}

fn delta_y_central(src: &[f64], out: &mut [f64], w: usize, h: usize) {
    for y in 0..h {
        for x in 0..w {
            out[y * w + x] = if y == 0 || y == h - 1 {
                0.0
            } else {
                src[(y + 1) * w + x] - src[(y - 1) * w + x]
            };
        }
    }
}

/// phi 内侧 (H ≈ 1) 的加权灰度均值.
fn inside_mean(gray: &[f64], phi: &[f64]) -> f64 {
    let mut weighted = 0.0;
    let mut weight = 0.0;
    for (g, p) in gray.iter().zip(phi) {
        let h = heaviside(*p);
        weighted += g * h;
        weight += h;
    }
    weighted / weight
}

fn outside_mean(gray: &[f64], phi: &[f64]) -> f64 {
    let mut weighted = 0.0;
    let mut weight = 0.0;
    for (g, p) in gray.iter().zip(phi) {
        let h = 1.0 - heaviside(*p);
        weighted += g * h;
        weight += h;
    }
    weighted / weight
}

/// 对 0 号通道跑 `iterations` 步 Chan-Vese 演化, 输出两档标签
/// (0.0 为轮廓内, 0.7 为轮廓外), 复制到全部通道.
pub fn chan_vese_segment(cache: &mut ImageCache, iterations: usize) -> Result<(), KernelError> {
    assert!(iterations >= 1, "iterations 至少为 1");
    super::require_planar(cache)?;

    let w = cache.sizes()[0];
    let h = cache.sizes()[1];
    let depth = cache.depth();
    let pixels = w * h;

    let gray: Vec<f64> = (0..pixels).map(|i| cache.data()[i * depth] * GRAY_SCALE).collect();

    // 初始水平集: 以图像中心为圆心的内切圆 (留边).
    let radius = (w.min(h) as f64) / 2.0 - CIRCLE_MARGIN;
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;
    let mut phi: Vec<f64> = (0..pixels)
        .map(|i| {
            let x = (i % w) as f64;
            let y = (i / w) as f64;
            radius - ((x - cx).powi(2) + (y - cy).powi(2)).sqrt()
        })
        .collect();

    let mut dxp = vec![0.0f64; pixels];
    let mut dxc = vec![0.0f64; pixels];
    let mut dyp = vec![0.0f64; pixels];
    let mut dyc = vec![0.0f64; pixels];
    let mut nx = vec![0.0f64; pixels];
    let mut ny = vec![0.0f64; pixels];
    let mut div_x = vec![0.0f64; pixels];
    let mut div_y = vec![0.0f64; pixels];

    for _ in 0..iterations {
        delta_x_forward(&phi, &mut dxp, w, h);
        delta_x_central(&phi, &mut dxc, w, h);
        delta_y_forward(&phi, &mut dyp, w, h);
        delta_y_central(&phi, &mut dyc, w, h);
        for j in 0..pixels {
            let fm1 = (dxp[j] * dxp[j] + dxc[j] * dxc[j] / 4.0).sqrt();
            let fm2 = (dyp[j] * dyp[j] + dyc[j] * dyc[j] / 4.0).sqrt();
            nx[j] = if fm1 == 0.0 { 0.0 } else { dxp[j] / fm1 };
            ny[j] = if fm2 == 0.0 { 0.0 } else { dyp[j] / fm2 };
        }
        delta_x_backward(&nx, &mut div_x, w, h);
        delta_y_backward(&ny, &mut div_y, w, h);
        let c1 = inside_mean(&gray, &phi);
        let c2 = outside_mean(&gray, &phi);
        for j in 0..pixels {
            let force = CURVATURE_WEIGHT * (div_x[j] + div_y[j])
                - (gray[j] - c1) * (gray[j] - c1)
                + (gray[j] - c2) * (gray[j] - c2);
            phi[j] += TIME_STEP * dirac(phi[j]) * force;
        }
    }

    let mut out = vec![0.0f64; cache.data().len()];
    for (i, &p) in phi.iter().enumerate() {
        let label = if p >= 0.0 { INSIDE_VALUE } else { OUTSIDE_VALUE };
        out[i * depth..(i + 1) * depth].fill(label);
    }
    cache.replace_data(out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::chan_vese_segment;
    use crate::consts::chan_vese::{INSIDE_VALUE, OUTSIDE_VALUE};
    use crate::kernel::testing::planar_cache;

    /// 输出只有两档标签.
    #[test]
    fn test_binary_labels() {
        let data: Vec<f64> = (0..256)
            .map(|i| {
                let x = i % 16;
                let y = i / 16;
                let inside = (4..12).contains(&x) && (4..12).contains(&y);
                if inside {
                    0.9
                } else {
                    0.1
                }
            })
            .collect();
        let mut cache = planar_cache(16, 16, data);
        chan_vese_segment(&mut cache, 5).unwrap();
        assert!(cache
            .data()
            .iter()
            .all(|&v| v == INSIDE_VALUE || v == OUTSIDE_VALUE));
    }

    /// 中心亮块落在初始轮廓内, 五步后中心仍被标成内侧,
    /// 角点被标成外侧.
    #[test]
    fn test_bright_square_segmented() {
        let data: Vec<f64> = (0..256)
            .map(|i| {
                let x = i % 16;
                let y = i / 16;
                let inside = (5..11).contains(&x) && (5..11).contains(&y);
                if inside {
                    0.9
                } else {
                    0.1
                }
            })
            .collect();
        let mut cache = planar_cache(16, 16, data);
        chan_vese_segment(&mut cache, 5).unwrap();
        assert_eq!(cache.data()[8 * 16 + 8], INSIDE_VALUE);
        assert_eq!(cache.data()[0], OUTSIDE_VALUE);
    }
}
