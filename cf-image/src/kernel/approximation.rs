//! 变分图像逼近 (任意维度, 取 0 号通道).
//!
//! 梯度流迭代 `u += alpha·h - belta·b`:
//!
//! - `h` 为各轴前向二阶差分之和 (`f[i+2ê] - 2f[i+ê] + f[i]`),
//!   出界的抽头按 0 丢弃;
//! - `b` 为 `u` 与一个 LoG 型权核的自相关核的卷积, 权核
//!   `(fx - 2σ²)·exp(-fx/2σ²)/σ⁴` 以高斯权之和归一, 自相关
//!   用图像空间偏移直接索引核数组;
//! - 边界像素的窗口一律按扁平缓冲区截断.
//!
//! 迭代完成后负值截为 0, 按最大值归一并复制到全部通道.
//! `iterations == 0` 时为恒等变换.

use crate::cache::ImageCache;
use crate::consts::GAUSSIAN_RADIUS_FACTOR;
use crate::error::KernelError;

/// 一次窗口偏移分解出的逐轴索引 (0 号轴最快).
fn window_axis_index(j: usize, axis: usize, filter_size: usize) -> isize {
    let mut step = 1;
    for _ in 0..axis {
        step *= filter_size;
    }
    ((j / step) % filter_size) as isize
}

/// 以变分模型迭代逼近 0 号通道.
pub fn image_approximation(
    cache: &mut ImageCache,
    sigma: f64,
    alpha: f64,
    belta: f64,
    iterations: usize,
) -> Result<(), KernelError> {
    assert!(sigma > 0.0, "sigma 必须为正");
    super::require_data(cache)?;
    if iterations == 0 {
        return Ok(());
    }

    let dimension = cache.dimension();
    let depth = cache.depth();
    let sizes = cache.sizes().to_vec();
    let pixels = cache.data().len() / depth;

    let radius = (GAUSSIAN_RADIUS_FACTOR * sigma).ceil() as usize;
    let filter_size = 2 * radius + 1;
    let kernel_size = filter_size.pow(dimension as u32);

    // LoG 型权核与像素偏移.
    let mut offsets = vec![0isize; kernel_size];
    let mut w_kernel = vec![0.0f64; kernel_size];
    let mut gauss_sum = 0.0f64;
    for j in 0..kernel_size {
        let mut image_step = 1usize;
        let mut fx = 0.0f64;
        for m in 0..dimension {
            let k = window_axis_index(j, m, filter_size) - radius as isize;
            offsets[j] += k * image_step as isize;
            fx += (k * k) as f64;
            image_step *= sizes[m];
        }
        let spread = sigma * sigma;
        let gauss = (-0.5 * fx / spread).exp();
        w_kernel[j] = (fx - 2.0 * spread) * gauss / (spread * spread);
        gauss_sum += gauss;
    }
    for w in &mut w_kernel {
        *w /= gauss_sum;
    }

    // 自相关核: 以图像空间偏移索引核数组.
    let w1_kernel: Vec<f64> = (0..kernel_size)
        .map(|j| {
            let mut dot = 0.0;
            for k in 0..kernel_size {
                let at = j as isize + offsets[k];
                if at >= 0 && (at as usize) < kernel_size {
                    dot += w_kernel[k] * w_kernel[at as usize];
                }
            }
            dot
        })
        .collect();

    // 二阶差分抽头 (+ê, +2ê).
    let stencil: Vec<(isize, f64)> = (0..dimension)
        .flat_map(|axis| {
            let stride: isize = sizes[..axis].iter().product::<usize>() as isize;
            [(2 * stride, 1.0), (stride, -2.0)]
        })
        .collect();

    let mut u: Vec<f64> = (0..pixels).map(|i| cache.data()[i * depth]).collect();
    let mut f = vec![0.0f64; pixels];
    for _ in 0..iterations {
        f.copy_from_slice(&u);
        for i in 0..pixels {
            // 每轴的二阶差分各贡献一份 f[i].
            let mut h = dimension as f64 * f[i];
            for &(off, weight) in &stencil {
                let at = i as isize + off;
                if at >= 0 && (at as usize) < pixels {
                    h += weight * f[at as usize];
                }
            }
            let mut b = 0.0;
            for (j, &off) in offsets.iter().enumerate() {
                let at = i as isize + off;
                if at >= 0 && (at as usize) < pixels {
                    b += w1_kernel[j] * f[at as usize];
                }
            }
            u[i] += alpha * h - belta * b;
        }
    }

    let mut max = 0.0f64;
    for v in &mut u {
        if *v < 0.0 {
            *v = 0.0;
        }
        max = max.max(*v);
    }
    let mut out = vec![0.0f64; cache.data().len()];
    for (i, &v) in u.iter().enumerate() {
        let norm = if max == 0.0 { 0.0 } else { v / max };
        out[i * depth..(i + 1) * depth].fill(norm);
    }
    cache.replace_data(out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::image_approximation;
    use crate::kernel::testing::{f64_eq, planar_cache};

    /// 零次迭代是恒等变换.
    #[test]
    fn test_zero_iterations_identity() {
        let data: Vec<f64> = (0..16).map(|i| i as f64 / 15.0).collect();
        let mut cache = planar_cache(4, 4, data.clone());
        image_approximation(&mut cache, 1.0, 0.05, 0.05, 0).unwrap();
        for (a, b) in cache.data().iter().zip(&data) {
            assert!(f64_eq(*a, *b));
        }
    }

    /// 迭代后输出归一到 [0, 1] 且最大值恰为 1.
    #[test]
    fn test_output_normalized() {
        let mut data = vec![0.2; 64];
        data[27] = 0.9;
        let mut cache = planar_cache(8, 8, data);
        image_approximation(&mut cache, 1.0, 0.02, 0.02, 3).unwrap();
        let hi = cache.data().iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(f64_eq(hi, 1.0));
        assert!(cache.data().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
