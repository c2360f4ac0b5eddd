//! 可分离 Gaussian 平滑.
//!
//! 对每个轴做一趟 1 维卷积, 核系数 `exp(-x²/2σ²)` 整体归一;
//! 边界按扁平缓冲区截断, 出界的核系数直接丢弃而不重新归一,
//! 因此贴近缓冲区首尾的像素会被整体压暗.

use crate::cache::ImageCache;
use crate::consts::GAUSSIAN_RADIUS_FACTOR;
use crate::error::KernelError;

/// 归一化的 1 维核, 长度 `1 + 2*ceil(2.5σ)`.
fn gaussian_taps(sigma: f64) -> Vec<f64> {
    let kernel_size = 1 + 2 * (GAUSSIAN_RADIUS_FACTOR * sigma).ceil() as usize;
    let center = (kernel_size / 2) as f64;
    let mut taps: Vec<f64> = (0..kernel_size)
        .map(|j| {
            let x = j as f64 - center;
            (-0.5 * x * x / (sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = taps.iter().sum();
    for t in &mut taps {
        *t /= sum;
    }
    taps
}

/// 以标准差 `sigma` 平滑 cache 中的图像 (任意维度与通道数).
pub fn gaussian_filter(cache: &mut ImageCache, sigma: f64) -> Result<(), KernelError> {
    assert!(sigma > 0.0, "sigma 必须为正");
    super::require_data(cache)?;

    let depth = cache.depth();
    let sizes = cache.sizes().to_vec();
    let storage_len = cache.data().len();
    let taps = gaussian_taps(sigma);
    let center = taps.len() / 2;

    let mut temp = cache.data().to_vec();
    let mut result = vec![0.0f64; storage_len];
    let mut image_step = 1usize;
    for &size in &sizes {
        let offsets: Vec<isize> = (0..taps.len())
            .map(|j| (j as isize - center as isize) * (image_step * depth) as isize)
            .collect();
        image_step *= size;
        for pixel in 0..storage_len / depth {
            let base = (pixel * depth) as isize;
            for k in 0..depth {
                let mut dot = 0.0;
                for (&off, &w) in offsets.iter().zip(&taps) {
                    let at = base + off;
                    if at >= 0 && (at as usize) < storage_len {
                        dot += temp[at as usize + k] * w;
                    }
                }
                result[pixel * depth + k] = dot;
            }
        }
        temp.copy_from_slice(&result);
    }
    cache.replace_data(temp);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{gaussian_filter, gaussian_taps};
    use crate::kernel::testing::{f64_eq, planar_cache};

    /// 任意 sigma 下核系数之和为 1.
    #[test]
    fn test_taps_normalized() {
        for sigma in [0.3, 0.5, 1.0, 2.5] {
            let taps = gaussian_taps(sigma);
            assert_eq!(taps.len(), 1 + 2 * (2.5f64 * sigma).ceil() as usize);
            assert!(f64_eq(taps.iter().sum::<f64>(), 1.0), "sigma = {sigma}");
        }
    }

    /// 远离缓冲区首尾的像素上, 常值图像保持不变 (核已归一).
    #[test]
    fn test_constant_preserved_in_interior() {
        let mut cache = planar_cache(8, 8, vec![0.5; 64]);
        gaussian_filter(&mut cache, 0.5).unwrap();
        assert!(cache.is_valid());
        // sigma = 0.5 的核半径为 2. X 方向的截断压暗缓冲区首尾两端,
        // Y 方向再把这些像素扩散进边缘列, 因此只断言两轴支撑都
        // 完整落在缓冲区内的 2..6 x 2..6 块.
        for row in 2..6 {
            for col in 2..6 {
                assert!(f64_eq(cache.data()[row * 8 + col], 0.5));
            }
        }
        // 首行被截断压暗.
        assert!(cache.data()[0] < 0.5);
    }

    /// 中心亮斑被摊开: 峰值下降但仍高于背景, 无过冲.
    #[test]
    fn test_bump_is_smoothed() {
        let mut data = vec![0.5; 64];
        data[4 * 8 + 4] = 1.0;
        let mut cache = planar_cache(8, 8, data);
        gaussian_filter(&mut cache, 0.5).unwrap();
        let center = cache.data()[4 * 8 + 4];
        assert!(center > 0.5 && center < 1.0);
        assert!(cache.data().iter().all(|&v| v <= 1.0 + 1e-12));
        // 亮斑的邻居被抬高.
        assert!(cache.data()[4 * 8 + 5] > 0.5);
        assert!(cache.data()[3 * 8 + 4] > 0.5);
    }
}
