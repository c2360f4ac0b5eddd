//! 图像重采样 (2 维 / 3 维): 最近格点抽取与 B 样条双三次插值.
//!
//! 目标尺寸与当前尺寸完全相同时为恒等变换. 双三次插值的支撑
//! 点取 `floor(x·in/out) + n + 2` (n 取 -1..3) 并钳到图像边界;
//! 样条权仍按未移位的 `n - frac` 求值.

use crate::cache::ImageCache;
use crate::consts::B3_SPLINE_COEFF;
use crate::error::KernelError;

/// 重采样方式.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResampleMode {
    /// 最近格点抽取, 不引入新的颜色值.
    Nearest,
    /// 三次 B 样条插值.
    Bicubic,
}

/// 三次 B 样条基函数, 支撑 (-2, 2).
fn b3spline(x: f64) -> f64 {
    let cube = |t: f64| if t <= 0.0 { 0.0 } else { t * t * t };
    B3_SPLINE_COEFF
        * (cube(x + 2.0) - 4.0 * cube(x + 1.0) + 6.0 * cube(x) - 4.0 * cube(x - 1.0))
}

fn clamp_index(i: isize, size: usize) -> usize {
    i.clamp(0, size as isize - 1) as usize
}

/// 最近格点: `trunc(x·(in-1)/(out-1))`, 输出轴长 1 时取 0.
fn nearest_axis(x: usize, in_size: usize, out_size: usize) -> usize {
    if out_size <= 1 {
        return 0;
    }
    (x as f64 * (in_size as f64 - 1.0) / (out_size as f64 - 1.0)) as usize
}

/// 把 cache 重采样到 `output_sizes` 网格.
pub fn image_resample(
    cache: &mut ImageCache,
    mode: ResampleMode,
    output_sizes: &[usize],
) -> Result<(), KernelError> {
    super::require_data(cache)?;
    let dimension = cache.dimension();
    if output_sizes.len() != dimension {
        return Err(KernelError::SizesLength);
    }
    if output_sizes.iter().any(|&s| s == 0) {
        return Err(KernelError::ZeroOutputSizes);
    }
    if output_sizes == cache.sizes() {
        return Ok(());
    }
    if dimension != 2 && dimension != 3 {
        return Err(KernelError::UnsupportedDimension(dimension));
    }

    let depth = cache.depth();
    let in_sizes = cache.sizes().to_vec();
    let output_pixels: usize = output_sizes.iter().product();
    let mut out = vec![0.0f64; output_pixels * depth];

    match mode {
        ResampleMode::Nearest => {
            let lattice = cache.lattice();
            for i in 0..output_pixels {
                let mut cur = i;
                let mut indices = vec![0usize; dimension];
                for m in 0..dimension {
                    indices[m] = nearest_axis(cur % output_sizes[m], in_sizes[m], output_sizes[m]);
                    cur /= output_sizes[m];
                }
                let src = lattice.encode(&indices) * depth;
                out[i * depth..(i + 1) * depth]
                    .copy_from_slice(&cache.data()[src..src + depth]);
            }
        }
        ResampleMode::Bicubic => {
            let scales: Vec<f64> = (0..dimension)
                .map(|m| in_sizes[m] as f64 / output_sizes[m] as f64)
                .collect();
            let mut sum = vec![0.0f64; depth];
            for i in 0..output_pixels {
                let mut cur = i;
                let mut base = vec![0isize; dimension];
                let mut frac = vec![0.0f64; dimension];
                for m in 0..dimension {
                    let f = (cur % output_sizes[m]) as f64 * scales[m];
                    base[m] = f.floor() as isize;
                    frac[m] = f - f.floor();
                    cur /= output_sizes[m];
                }
                sum.fill(0.0);
                if dimension == 2 {
                    for m in -1isize..3 {
                        let r1 = b3spline(m as f64 - frac[1]);
                        let yy = clamp_index(base[1] + m + 2, in_sizes[1]);
                        for n in -1isize..3 {
                            let r2 = b3spline(-(n as f64 - frac[0]));
                            let xx = clamp_index(base[0] + n + 2, in_sizes[0]);
                            let src = (yy * in_sizes[0] + xx) * depth;
                            for k in 0..depth {
                                sum[k] += cache.data()[src + k] * r1 * r2;
                            }
                        }
                    }
                } else {
                    for l in -1isize..3 {
                        let r1 = b3spline(l as f64 - frac[2]);
                        let zz = clamp_index(base[2] + l + 2, in_sizes[2]);
                        for m in -1isize..3 {
                            let r2 = b3spline(m as f64 - frac[1]);
                            let yy = clamp_index(base[1] + m + 2, in_sizes[1]);
                            for n in -1isize..3 {
                                let r3 = b3spline(-(n as f64 - frac[0]));
                                let xx = clamp_index(base[0] + n + 2, in_sizes[0]);
                                let src = ((zz * in_sizes[1] + yy) * in_sizes[0] + xx) * depth;
                                for k in 0..depth {
                                    sum[k] += cache.data()[src + k] * r1 * r2 * r3;
                                }
                            }
                        }
                    }
                }
                out[i * depth..(i + 1) * depth].copy_from_slice(&sum);
            }
        }
    }
    cache.replace_data_with_sizes(output_sizes, out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{image_resample, ResampleMode};
    use crate::kernel::testing::{f64_eq, planar_cache};

    /// 目标尺寸与当前尺寸相同: 数据原样保留.
    #[test]
    fn test_equal_sizes_noop() {
        let data: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let mut cache = planar_cache(4, 4, data.clone());
        image_resample(&mut cache, ResampleMode::Bicubic, &[4, 4]).unwrap();
        assert_eq!(cache.data(), &data[..]);
    }

    /// 最近格点下采样 4x4 -> 2x2 取四角.
    #[test]
    fn test_nearest_corners() {
        let data: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let mut cache = planar_cache(4, 4, data);
        image_resample(&mut cache, ResampleMode::Nearest, &[2, 2]).unwrap();
        assert_eq!(cache.sizes(), &[2, 2]);
        assert_eq!(cache.data(), &[0.0, 3.0, 12.0, 15.0]);
    }

    /// 常值图像双三次上采样后仍近似常值 (样条系数取 0.1667,
    /// 权和略偏离 1).
    #[test]
    fn test_bicubic_constant() {
        let mut cache = planar_cache(4, 4, vec![0.5; 16]);
        image_resample(&mut cache, ResampleMode::Bicubic, &[8, 8]).unwrap();
        assert_eq!(cache.sizes(), &[8, 8]);
        for &v in cache.data() {
            assert!((v - 0.5).abs() < 1e-2);
        }
    }

    /// 输出尺寸为 0 被拒绝.
    #[test]
    fn test_zero_output_rejected() {
        let mut cache = planar_cache(4, 4, vec![0.0; 16]);
        assert!(image_resample(&mut cache, ResampleMode::Nearest, &[0, 2]).is_err());
        assert!(f64_eq(cache.data()[0], 0.0));
    }
}
