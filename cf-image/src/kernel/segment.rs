//! 基于颜色距离的前景分割 (2 维, 多通道).
//!
//! 假设图像四周一圈是背景: 取宽 `min(w,h)/4` 的边框估计背景
//! 颜色均值 (按 `1 - v` 的反相空间), 对每个像素算到该均值的
//! 欧氏距离, 以最大距离的 0.3 倍为阈, 近者判背景 (0), 远者
//! 判前景 (1).

use crate::cache::ImageCache;
use crate::consts::COLOR_DISTANCE_RATIO;
use crate::error::KernelError;

/// 按边框背景均值做二值分割.
pub fn color_segment(cache: &mut ImageCache) -> Result<(), KernelError> {
    super::require_planar(cache)?;

    let w = cache.sizes()[0];
    let h = cache.sizes()[1];
    let depth = cache.depth();
    let pixels = w * h;
    // 小图也至少留一圈边框.
    let frame = (w.min(h) / 4).max(1);

    let mut color_mean = vec![0.0f64; depth];
    let mut background = 0usize;
    for y in 0..h {
        for x in 0..w {
            let in_frame = x < frame || x + frame >= w || y < frame || y + frame >= h;
            if !in_frame {
                continue;
            }
            let base = (y * w + x) * depth;
            for k in 0..depth {
                color_mean[k] += 1.0 - cache.data()[base + k];
            }
            background += 1;
        }
    }
    for m in &mut color_mean {
        *m /= background as f64;
    }

    let mut dist = vec![0.0f64; pixels];
    for (i, d) in dist.iter_mut().enumerate() {
        let base = i * depth;
        let mut sum = 0.0;
        for k in 0..depth {
            let diff = color_mean[k] - (1.0 - cache.data()[base + k]);
            sum += diff * diff;
        }
        *d = sum.sqrt();
    }
    let max_dist = {
        use ordered_float::NotNan;

        dist.iter()
            .map(|&d| NotNan::<f64>::new(d).unwrap())
            .max()
            .map_or(0.0, NotNan::into_inner)
    };

    let threshold = COLOR_DISTANCE_RATIO * max_dist;
    let mut out = vec![0.0f64; cache.data().len()];
    for (i, &d) in dist.iter().enumerate() {
        let label = if d < threshold { 0.0 } else { 1.0 };
        out[i * depth..(i + 1) * depth].fill(label);
    }
    cache.replace_data(out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::color_segment;
    use crate::kernel::testing::planar_cache;

    /// 与边框同色的像素判背景, 中心异色块判前景.
    #[test]
    fn test_foreground_block_detected() {
        let mut data = vec![0.1; 144];
        for y in 5..7 {
            for x in 5..7 {
                data[y * 12 + x] = 0.9;
            }
        }
        let mut cache = planar_cache(12, 12, data);
        color_segment(&mut cache).unwrap();
        assert_eq!(cache.data()[0], 0.0);
        assert_eq!(cache.data()[5 * 12 + 5], 1.0);
        assert_eq!(cache.data()[6 * 12 + 6], 1.0);
        assert_eq!(cache.data()[2 * 12 + 2], 0.0);
    }

    /// 常值图像的最大距离为 0, 阈值也为 0, `d < 0` 恒假,
    /// 全部像素落入前景档.
    #[test]
    fn test_flat_image_all_foreground() {
        let mut cache = planar_cache(8, 8, vec![0.4; 64]);
        color_segment(&mut cache).unwrap();
        assert!(cache.data().iter().all(|&v| v == 1.0));
    }
}
