//! 滑窗一阶统计量 (任意维度, 单通道输入).
//!
//! 对每个格点取边长 `2r+1` 的超立方窗口, 算局部均值与
//! `sqrt(Σ(v-mean)²)/n` 形式的局部离散度, 再各自按全图最大值
//! 归一. 窗口越过缓冲区首尾时按整条扁平缓冲区环绕.
//!
//! 输出通道数变为 2: `[局部均值, 局部离散度]`.

use crate::cache::ImageCache;
use crate::error::KernelError;

/// 计算半径 `radius` 的滑窗一阶统计量.
pub fn first_order_statistics(cache: &mut ImageCache, radius: usize) -> Result<(), KernelError> {
    assert!(radius >= 1, "radius 至少为 1");
    super::require_single_channel(cache)?;

    let lattice = cache.lattice();
    let pixels = lattice.pixels();
    let offsets = lattice.window_offsets(radius);
    let count = offsets.len() as f64;

    let mut out = vec![0.0f64; pixels * 2];
    let mut window = vec![0.0f64; offsets.len()];
    let mut max_mean = 0.0f64;
    let mut max_std = 0.0f64;
    for pixel in 0..pixels {
        let mut mean = 0.0;
        for (slot, &off) in window.iter_mut().zip(&offsets) {
            // 扁平环绕.
            let at = (pixel as isize + off).rem_euclid(pixels as isize) as usize;
            *slot = cache.data()[at];
            mean += *slot;
        }
        mean /= count;
        let mut std = 0.0;
        for &v in &window {
            std += (v - mean) * (v - mean);
        }
        std = std.sqrt() / count;
        out[pixel * 2] = mean;
        out[pixel * 2 + 1] = std;
        max_mean = max_mean.max(mean);
        max_std = max_std.max(std);
    }
    for pixel in 0..pixels {
        out[pixel * 2] = if max_mean == 0.0 { 0.0 } else { out[pixel * 2] / max_mean };
        out[pixel * 2 + 1] = if max_std == 0.0 { 0.0 } else { out[pixel * 2 + 1] / max_std };
    }
    cache.replace_data_with_depth(2, out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::first_order_statistics;
    use crate::kernel::testing::{f64_eq, planar_cache};

    /// 常值图像: 均值归一后全 1, 离散度全 0.
    #[test]
    fn test_constant_image() {
        let mut cache = planar_cache(4, 4, vec![0.3; 16]);
        first_order_statistics(&mut cache, 1).unwrap();
        assert_eq!(cache.depth(), 2);
        for pixel in 0..16 {
            assert!(f64_eq(cache.data()[pixel * 2], 1.0));
            assert!(f64_eq(cache.data()[pixel * 2 + 1], 0.0));
        }
    }

    /// 单个亮点: 窗口覆盖到它的格点上均值与离散度同时达到
    /// 最大 (归一后为 1), 远处为 0.
    #[test]
    fn test_single_spike() {
        let mut data = vec![0.0; 25];
        data[2 * 5 + 2] = 1.0;
        let mut cache = planar_cache(5, 5, data);
        first_order_statistics(&mut cache, 1).unwrap();
        // 中心 3x3 内的格点都看到亮点.
        assert!(f64_eq(cache.data()[(2 * 5 + 2) * 2], 1.0));
        assert!(f64_eq(cache.data()[(1 * 5 + 1) * 2], 1.0));
        assert!(f64_eq(cache.data()[(2 * 5 + 2) * 2 + 1], 1.0));
        // 角点的窗口 (含环绕) 碰不到亮点.
        assert!(f64_eq(cache.data()[0], 0.0));
        assert!(f64_eq(cache.data()[1], 0.0));
    }
}
