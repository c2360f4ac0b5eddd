//! 直方图类变换: 均衡化, 对比度归一化, Otsu 自动阈值.
//!
//! 三者都把像素值当作落在 `[0, 1]` 的灰度强度, 以
//! `floor((bins-1)·v + 0.5)` 装箱; 越界值并入端点 bin.
//! 均衡化与归一化逐通道独立进行, 阈值化先把多通道取均值
//! 折成灰度再统一判决.

use crate::cache::ImageCache;
use crate::consts::{OTSU_BINS, TAIL_TRIM_DIVISOR};
use crate::error::KernelError;

fn bin_of(value: f64, bins: usize) -> usize {
    let raw = ((bins as f64 - 1.0) * value + 0.5).floor();
    (raw.max(0.0) as usize).min(bins - 1)
}

/// 逐通道直方图均衡化: 以累积分布重映射强度, 输出仍在 `[0, 1]`.
///
/// 某通道所有像素都挤在 0 号 bin 时无法均衡, 报
/// [`KernelError::FlatHistogram`].
pub fn histogram_equalize(cache: &mut ImageCache, bins: usize) -> Result<(), KernelError> {
    assert!(bins >= 2, "bins 至少为 2");
    super::require_data(cache)?;

    let depth = cache.depth();
    let pixels = cache.data().len() / depth;
    let mut result = vec![0.0f64; cache.data().len()];

    for k in 0..depth {
        let mut histogram = vec![0u64; bins];
        for pixel in 0..pixels {
            histogram[bin_of(cache.data()[pixel * depth + k], bins)] += 1;
        }
        // 累积分布.
        let mut map = vec![0u64; bins];
        let mut running = 0u64;
        for (j, &h) in histogram.iter().enumerate() {
            running += h;
            map[j] = running;
        }
        let low = map[0];
        let high = map[bins - 1];
        if low >= high {
            return Err(KernelError::FlatHistogram(k));
        }
        let remap: Vec<f64> = map
            .iter()
            .map(|&m| {
                let level = ((m - low) as f64 * (bins as f64 - 1.0) / (high - low) as f64) as u64;
                (level.min(bins as u64 - 1)) as f64 / (bins as f64 - 1.0)
            })
            .collect();
        for pixel in 0..pixels {
            let at = pixel * depth + k;
            result[at] = remap[bin_of(cache.data()[at], bins)];
        }
    }
    cache.replace_data(result);
    Ok(())
}

/// 逐通道对比度归一化: 砍掉直方图两端各约 1% 的像素后把剩余
/// 强度区间线性拉伸到 `[0, 1]`.
///
/// 先用 `pixels / 100` 作尾部阈值找上下界; 上下界重合时退回
/// 零阈值重找, 仍重合则该通道无法拉伸, 报
/// [`KernelError::ZeroSpanBound`].
pub fn histogram_normalize(cache: &mut ImageCache, bins: usize) -> Result<(), KernelError> {
    assert!(bins >= 2, "bins 至少为 2");
    super::require_data(cache)?;

    let depth = cache.depth();
    let pixels = cache.data().len() / depth;
    let mut result = vec![0.0f64; cache.data().len()];

    for k in 0..depth {
        let mut histogram = vec![0u64; bins];
        for pixel in 0..pixels {
            histogram[bin_of(cache.data()[pixel * depth + k], bins)] += 1;
        }

        let tail_bound = |threshold: u64| -> (usize, usize) {
            let mut low = 0;
            let mut intense = 0u64;
            while low < bins - 1 {
                intense += histogram[low];
                if intense > threshold {
                    break;
                }
                low += 1;
            }
            let mut high = bins - 1;
            intense = 0;
            while high != 0 {
                intense += histogram[high];
                if intense > threshold {
                    break;
                }
                high -= 1;
            }
            (low, high)
        };

        let (mut low, mut high) = tail_bound((pixels / TAIL_TRIM_DIVISOR) as u64);
        if low == high {
            (low, high) = tail_bound(0);
        }
        if low == high {
            return Err(KernelError::ZeroSpanBound(k));
        }
        // 区间内按整数比例拉到 0..bins-2, 两侧饱和.
        let remap: Vec<f64> = (0..bins)
            .map(|i| {
                let level = if i < low {
                    0
                } else if i > high {
                    bins as i64 - 1
                } else {
                    (bins as i64 - 2) * (i as i64 - low as i64) / (high as i64 - low as i64)
                };
                level as f64 / (bins as f64 - 1.0)
            })
            .collect();
        for pixel in 0..pixels {
            let at = pixel * depth + k;
            result[at] = remap[bin_of(cache.data()[at], bins)];
        }
    }
    cache.replace_data(result);
    Ok(())
}

/// Otsu 自动阈值: 折灰度, 拉伸到 `[0, 1]`, 按 256 bin 直方图
/// 选类间方差最大的第一个阈值, 输出 0 / 1 二值图 (各通道同值).
///
/// 灰度全等时无法定阈, 报 [`KernelError::FlatImage`].
pub fn histogram_threshold(cache: &mut ImageCache) -> Result<(), KernelError> {
    super::require_data(cache)?;

    let depth = cache.depth();
    let pixels = cache.data().len() / depth;
    let bins = OTSU_BINS;

    let mut gray = vec![0.0f64; pixels];
    let mut min_gray = f64::INFINITY;
    let mut max_gray = f64::NEG_INFINITY;
    for (pixel, g) in gray.iter_mut().enumerate() {
        let base = pixel * depth;
        *g = cache.data()[base..base + depth].iter().sum::<f64>() / depth as f64;
        min_gray = min_gray.min(*g);
        max_gray = max_gray.max(*g);
    }
    if max_gray <= min_gray {
        return Err(KernelError::FlatImage);
    }
    for g in &mut gray {
        *g = (*g - min_gray) / (max_gray - min_gray);
    }

    let mut histogram = vec![0.0f64; bins];
    for &g in &gray {
        histogram[bin_of(g, bins)] += 1.0;
    }
    for h in &mut histogram {
        *h /= pixels as f64;
    }
    let mean_total: f64 = histogram.iter().enumerate().map(|(j, &h)| j as f64 * h).sum();

    // 类间方差, 取最大值的第一个 bin 作阈值.
    let mut threshold = 0;
    let mut best = 0.0f64;
    let mut w0 = 0.0f64;
    let mut mu = 0.0f64;
    for j in 0..bins {
        w0 += histogram[j];
        mu += j as f64 * histogram[j];
        let w1 = 1.0 - w0;
        let sig_b = if w0 == 0.0 || w1 == 0.0 {
            0.0
        } else {
            let mu0 = mu / w0;
            let mu1 = (mean_total - mu) / w1;
            w0 * w1 * (mu1 - mu0) * (mu1 - mu0)
        };
        if sig_b > best {
            best = sig_b;
            threshold = j;
        }
    }

    let mut result = vec![0.0f64; cache.data().len()];
    for (pixel, &g) in gray.iter().enumerate() {
        let value = if bin_of(g, bins) <= threshold { 0.0 } else { 1.0 };
        result[pixel * depth..(pixel + 1) * depth].fill(value);
    }
    cache.replace_data(result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{histogram_equalize, histogram_normalize, histogram_threshold};
    use crate::error::KernelError;
    use crate::kernel::testing::{f64_eq, planar_cache};

    /// 两档强度 (各占一半): 低档映到累积分布一半附近, 高档映到 1.
    #[test]
    fn test_equalize_two_levels() {
        let mut data = vec![0.25; 8];
        data.extend(vec![0.75; 8]);
        let mut cache = planar_cache(4, 4, data);
        histogram_equalize(&mut cache, 16).unwrap();
        // 低档: 累积 8/16, 整数映射 (8*15/16) = 7, 即 7/15.
        for i in 0..8 {
            assert!(f64_eq(cache.data()[i], 7.0 / 15.0));
            assert!(f64_eq(cache.data()[8 + i], 1.0));
        }
    }

    /// 均衡化的重映射单调: 原值的相对次序不变.
    #[test]
    fn test_equalize_monotonic() {
        let data: Vec<f64> = (0..16).map(|i| i as f64 / 15.0).collect();
        let mut cache = planar_cache(4, 4, data);
        histogram_equalize(&mut cache, 16).unwrap();
        for i in 1..16 {
            assert!(cache.data()[i] >= cache.data()[i - 1]);
        }
    }

    /// 常值图像落入单一 bin, 均衡化报 FlatHistogram.
    #[test]
    fn test_equalize_rejects_flat() {
        let mut cache = planar_cache(4, 4, vec![0.0; 16]);
        assert_eq!(
            histogram_equalize(&mut cache, 16).unwrap_err(),
            KernelError::FlatHistogram(0)
        );
    }

    /// 压在 [0.25, 0.75] 的强度区间被拉伸, 端点接近 0 与 1.
    #[test]
    fn test_normalize_stretches_span() {
        let data: Vec<f64> = (0..16).map(|i| 0.25 + 0.5 * i as f64 / 15.0).collect();
        let mut cache = planar_cache(4, 4, data);
        histogram_normalize(&mut cache, 64).unwrap();
        let lo = cache.data().iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = cache.data().iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(lo < 0.05);
        assert!(hi > 0.9);
        // 单调性: 原序不变.
        for i in 1..16 {
            assert!(cache.data()[i] >= cache.data()[i - 1]);
        }
    }

    /// 双峰图像被 Otsu 阈值分成 0 / 1 两类.
    #[test]
    fn test_threshold_bimodal() {
        let mut data = vec![0.1; 8];
        data.extend(vec![0.9; 8]);
        let mut cache = planar_cache(4, 4, data);
        histogram_threshold(&mut cache).unwrap();
        for i in 0..8 {
            assert!(f64_eq(cache.data()[i], 0.0));
            assert!(f64_eq(cache.data()[8 + i], 1.0));
        }
    }

    /// 灰度全等时报 FlatImage.
    #[test]
    fn test_threshold_rejects_flat() {
        let mut cache = planar_cache(4, 4, vec![0.3; 16]);
        assert_eq!(histogram_threshold(&mut cache).unwrap_err(), KernelError::FlatImage);
    }
}
