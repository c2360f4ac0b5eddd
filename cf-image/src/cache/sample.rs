//! 按坐标逐点读出 cache 值.

use super::ImageCache;
use crate::consts::OUT_OF_RANGE_FILL;
use crate::error::CacheError;

/// 把坐标 `coordinate` 处的最近格点值写入 `values`.
///
/// 每轴归一化到 `[0, 1]` 后取 `round(frac * (size - 1))` 并钳制
/// 到合法下标; 任一轴归一化结果落在 `[0, 1]` 之外时不读格点,
/// `values` 整体填 [`OUT_OF_RANGE_FILL`].
pub fn sample_into(
    cache: &ImageCache,
    coordinate: &[f64],
    values: &mut [f64],
) -> Result<(), CacheError> {
    let dimension = cache.dimension();
    if dimension == 0 {
        return Err(CacheError::ZeroDimension);
    }
    if coordinate.len() < dimension {
        return Err(CacheError::CoordinateComponents(dimension, coordinate.len()));
    }
    if values.len() != cache.depth() {
        return Err(CacheError::ValueComponents(cache.depth(), values.len()));
    }
    let extent = cache.extent().ok_or(CacheError::NoExtent)?;
    let sizes = cache.sizes();

    let mut offset = 0usize;
    for axis in (0..dimension).rev() {
        let lo = extent.minimums()[axis];
        let hi = extent.maximums()[axis];
        let span = hi - lo;
        // 退化轴 (min == max): 只有坐标恰为该值时命中.
        let frac = if span > 0.0 {
            (coordinate[axis] - lo) / span
        } else if coordinate[axis] == lo {
            0.0
        } else {
            values.fill(OUT_OF_RANGE_FILL);
            return Ok(());
        };
        if !(0.0..=1.0).contains(&frac) {
            values.fill(OUT_OF_RANGE_FILL);
            return Ok(());
        }
        let last = sizes[axis] - 1;
        let index = ((frac * last as f64).round() as usize).min(last);
        offset = offset * sizes[axis] + index;
    }

    let depth = cache.depth();
    let start = offset * depth;
    values.copy_from_slice(&cache.data()[start..start + depth]);
    Ok(())
}

impl ImageCache {
    /// [`sample_into`] 的便捷形式.
    pub fn sample(&self, coordinate: &[f64], values: &mut [f64]) -> Result<(), CacheError> {
        sample_into(self, coordinate, values)
    }
}
