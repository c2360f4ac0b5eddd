//! 从源字段填充 cache: 全格点扫描求值.
//!
//! 这是整条流水线的主要开销 (`∏sizes` 次字段求值), 不做并行,
//! 也不做增量: cache 一旦失效, 下一次读取触发完整重算.

use super::ImageCache;
use crate::error::CacheError;
use crate::field::{MeshLocator, SourceField};
use log::warn;

/// 一次填充的结果统计.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// 格点总数.
    pub lattice_points: usize,

    /// 坐标无法解析到网格单元的格点数 (已按 0 填充).
    pub resolve_failures: usize,

    /// 解析成功但字段求值失败的格点数 (已按 0 填充).
    pub evaluate_failures: usize,
}

impl PopulateReport {
    /// 把非零的失败计数各汇报一条 warning (整趟一条, 不逐点刷屏).
    pub fn log_warnings(&self) {
        if self.evaluate_failures > 0 {
            warn!(
                "populate: field could not be evaluated for {} of {} pixels",
                self.evaluate_failures, self.lattice_points
            );
        }
        if self.resolve_failures > 0 {
            warn!(
                "populate: unable to locate mesh element for {} of {} pixels",
                self.resolve_failures, self.lattice_points
            );
        }
    }
}

/// 以 0 号轴最快的顺序扫描整张格点, 把 `value_field` 的取值写入
/// cache, 结束后标记 cache 有效.
///
/// 每个格点: 由坐标范围算出坐标向量, 经 `locator` 反查网格位置,
/// 再求值写入对应扁平偏移; 解析或求值失败的格点按 0 填充并计数.
pub fn populate<M, V>(
    cache: &mut ImageCache,
    value_field: &V,
    locator: &M,
    search_dimension: usize,
    time: f64,
) -> Result<PopulateReport, CacheError>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    if cache.dimension() == 0 {
        return Err(CacheError::ZeroDimension);
    }
    if cache.extent().is_none() {
        return Err(CacheError::NoExtent);
    }
    let dimension = cache.dimension();
    let depth = cache.depth();
    if value_field.component_count() != depth {
        return Err(CacheError::ValueComponents(depth, value_field.component_count()));
    }
    if locator.coordinate_components() < dimension {
        return Err(CacheError::CoordinateComponents(
            dimension,
            locator.coordinate_components(),
        ));
    }
    cache.allocate_data()?;

    let sizes = cache.sizes().to_vec();
    let mut report = PopulateReport {
        lattice_points: cache.lattice().pixels(),
        ..Default::default()
    };

    // 里程计扫描: indices 进位, 坐标只重算被进位的轴.
    let mut indices = vec![0usize; dimension];
    let mut coordinate = vec![0.0f64; dimension];
    for axis in 0..dimension {
        coordinate[axis] = cache.axis_coordinate(axis, 0)?;
    }

    let mut offset = 0usize;
    loop {
        let wrote = match locator.resolve(&coordinate, search_dimension) {
            Some(location) => {
                let values = &mut cache.data_mut()[offset..offset + depth];
                if value_field.evaluate(&location, time, values) {
                    true
                } else {
                    report.evaluate_failures += 1;
                    false
                }
            }
            None => {
                report.resolve_failures += 1;
                false
            }
        };
        if !wrote {
            cache.data_mut()[offset..offset + depth].fill(0.0);
        }
        offset += depth;

        // 进位.
        let mut axis = 0;
        while axis < dimension && indices[axis] + 1 >= sizes[axis] {
            axis += 1;
        }
        if axis == dimension {
            break;
        }
        for lower in 0..axis {
            indices[lower] = 0;
            coordinate[lower] = cache.axis_coordinate(lower, 0)?;
        }
        indices[axis] += 1;
        coordinate[axis] = cache.axis_coordinate(axis, indices[axis])?;
    }

    cache.mark_valid();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::populate;
    use crate::cache::{GridExtent, ImageCache};
    use crate::field::{MeshLocator, SourceField};

    /// 把坐标本身当作网格位置: 单元测试里最小的解析器.
    struct IdentityLocator {
        components: usize,
    }

    impl MeshLocator for IdentityLocator {
        type Location = Vec<f64>;

        fn coordinate_components(&self) -> usize {
            self.components
        }

        fn resolve(&self, coordinate: &[f64], _search_dimension: usize) -> Option<Vec<f64>> {
            Some(coordinate.to_vec())
        }
    }

    /// 返回 x + 10*y 的单通道解析字段.
    struct RampField;

    impl SourceField<Vec<f64>> for RampField {
        fn component_count(&self) -> usize {
            1
        }

        fn evaluate(&self, location: &Vec<f64>, _time: f64, values: &mut [f64]) -> bool {
            values[0] = location[0] + 10.0 * location[1];
            true
        }
    }

    /// 在 x > 1.5 处拒绝解析的定位器.
    struct HalfLocator;

    impl MeshLocator for HalfLocator {
        type Location = Vec<f64>;

        fn coordinate_components(&self) -> usize {
            2
        }

        fn resolve(&self, coordinate: &[f64], _search_dimension: usize) -> Option<Vec<f64>> {
            (coordinate[0] <= 1.5).then(|| coordinate.to_vec())
        }
    }

    fn ramp_cache() -> ImageCache {
        let mut cache = ImageCache::new();
        let ext = GridExtent::new(&[0.0, 0.0], &[3.0, 2.0]).unwrap();
        cache.resize(2, 1, &[4, 3], Some(ext)).unwrap();
        cache
    }

    /// 0 号轴最快的写入顺序与坐标公式.
    #[test]
    fn test_populate_order() {
        let mut cache = ramp_cache();
        let locator = IdentityLocator { components: 2 };
        let report = populate(&mut cache, &RampField, &locator, 0, 0.0).unwrap();
        assert_eq!(report.lattice_points, 12);
        assert_eq!(report.resolve_failures, 0);
        assert!(cache.is_valid());
        // 第 0 行: x = 0..3; 第 1 行起每行 +10.
        assert_eq!(cache.data()[0], 0.0);
        assert_eq!(cache.data()[3], 3.0);
        assert_eq!(cache.data()[4], 10.0);
        // 末格点 [3, 2]: 3 + 10 * 2.
        assert_eq!(cache.data()[11], 23.0);
    }

    /// 解析失败的格点按 0 填充并计数, 不影响其它格点.
    #[test]
    fn test_populate_failures_zero_filled() {
        let mut cache = ramp_cache();
        let report = populate(&mut cache, &RampField, &HalfLocator, 0, 0.0).unwrap();
        // 每行 x = 2.0, 3.0 两点失败.
        assert_eq!(report.resolve_failures, 6);
        assert_eq!(report.evaluate_failures, 0);
        assert_eq!(cache.data()[2], 0.0);
        assert_eq!(cache.data()[3], 0.0);
        assert_eq!(cache.data()[5], 11.0);
    }
}
