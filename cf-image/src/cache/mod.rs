//! 图像 cache 核心: 规则格点上的稠密多通道采样缓存.
//!
//! [`ImageCache`] 把一个 field 在 N 维规则格点上的取值物化为
//! 扁平 `f64` 缓冲区, 供 kernel 原地改写, 再按坐标逐点读出.
//! 布局约定见 [`stride`] 模块.

use crate::error::CacheError;
use ndarray::{ArrayD, ArrayViewD, IxDyn};

pub mod populate;
pub mod sample;
mod stride;

pub use stride::Lattice;

/// 坐标范围元数据: 各轴的 `[minimum, maximum]` 区间, 与采样格点
/// 做仿射对应. 只做重采样的 cache 可以没有它.
#[derive(Clone, Debug, PartialEq)]
pub struct GridExtent {
    minimums: Vec<f64>,
    maximums: Vec<f64>,
}

impl GridExtent {
    /// 构造并校验: 两数组等长, 且各轴 `minimum <= maximum`.
    pub fn new(minimums: &[f64], maximums: &[f64]) -> Result<Self, CacheError> {
        if minimums.len() != maximums.len() {
            return Err(CacheError::MetadataLength);
        }
        for (i, (lo, hi)) in minimums.iter().zip(maximums).enumerate() {
            if lo > hi {
                return Err(CacheError::InvertedRange(i));
            }
        }
        Ok(GridExtent {
            minimums: minimums.to_vec(),
            maximums: maximums.to_vec(),
        })
    }

    /// 各轴下界.
    #[inline]
    pub fn minimums(&self) -> &[f64] {
        &self.minimums
    }

    /// 各轴上界.
    #[inline]
    pub fn maximums(&self) -> &[f64] {
        &self.maximums
    }

    fn dimension(&self) -> usize {
        self.minimums.len()
    }
}

/// 稠密 N 维多通道采样缓存.
///
/// 生命周期: 由 operator 创建为空 (`dimension == 0`), 知道几何
/// 参数后 [`resize`](Self::resize), 上游字段变化时
/// [`invalidate`](Self::invalidate), 随 operator 一起销毁.
/// 每个 operator 独占自己的 cache, 不跨 operator 共享.
#[derive(Clone, Debug)]
pub struct ImageCache {
    dimension: usize,
    sizes: Vec<usize>,
    extent: Option<GridExtent>,
    depth: usize,
    data: Vec<f64>,
    valid: bool,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCache {
    /// 创建空 cache (`dimension == 0`, 无数据).
    pub fn new() -> Self {
        ImageCache {
            dimension: 0,
            sizes: vec![],
            extent: None,
            depth: 0,
            data: vec![],
            valid: false,
        }
    }

    /// 重设几何: 维度/通道/各轴采样数/坐标范围.
    ///
    /// 任何几何变化都会令 cache 失效; 数据缓冲区在下一次
    /// [`allocate_data`](Self::allocate_data) 时才重新分配.
    pub fn resize(
        &mut self,
        dimension: usize,
        depth: usize,
        sizes: &[usize],
        extent: Option<GridExtent>,
    ) -> Result<(), CacheError> {
        if dimension == 0 {
            return Err(CacheError::ZeroDimension);
        }
        if depth == 0 {
            return Err(CacheError::ZeroDepth);
        }
        if sizes.len() != dimension {
            return Err(CacheError::MetadataLength);
        }
        if let Some(axis) = sizes.iter().position(|&s| s == 0) {
            return Err(CacheError::ZeroSize(axis));
        }
        if let Some(ext) = &extent {
            if ext.dimension() != dimension {
                return Err(CacheError::MetadataLength);
            }
        }
        self.dimension = dimension;
        self.depth = depth;
        self.sizes = sizes.to_vec();
        self.extent = extent;
        self.valid = false;
        Ok(())
    }

    /// (重新) 分配数据缓冲区为 `depth * ∏sizes` 个 0.0, 并令 cache
    /// 失效. 必须在 `resize` 之后调用.
    pub fn allocate_data(&mut self) -> Result<(), CacheError> {
        if self.dimension == 0 {
            return Err(CacheError::ZeroDimension);
        }
        let len = self.lattice().storage_len();
        self.data.clear();
        self.data.resize(len, 0.0);
        self.valid = false;
        Ok(())
    }

    /// 维度数 (空 cache 为 0).
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// 通道数.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 各轴采样数.
    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// 坐标范围元数据 (若有).
    #[inline]
    pub fn extent(&self) -> Option<&GridExtent> {
        self.extent.as_ref()
    }

    /// cache 内容当前是否可信.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// 令 cache 失效. 下一次读取前必须重新填充并处理.
    #[inline]
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// 标记内容可信. 仅供填充与 kernel 流程使用.
    #[inline]
    pub(crate) fn mark_valid(&mut self) {
        self.valid = true;
    }

    /// 当前几何对应的 [`Lattice`].
    pub fn lattice(&self) -> Lattice {
        assert!(self.dimension > 0, "cache 尚未 resize");
        Lattice::new(&self.sizes, self.depth)
    }

    /// 数据缓冲区 (只读).
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// 数据缓冲区 (可写). 仅供填充流程使用.
    #[inline]
    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// kernel 换入新缓冲区并标记内容可信. 长度必须与几何一致.
    pub(crate) fn replace_data(&mut self, data: Vec<f64>) {
        assert_eq!(data.len(), self.lattice().storage_len());
        self.data = data;
        self.valid = true;
    }

    /// kernel 换入新缓冲区, 同时改写各轴采样数 (重采样类 kernel).
    pub(crate) fn replace_data_with_sizes(&mut self, sizes: &[usize], data: Vec<f64>) {
        assert_eq!(sizes.len(), self.dimension);
        self.sizes = sizes.to_vec();
        self.replace_data(data);
    }

    /// kernel 换入新缓冲区, 同时改写通道数 (统计类 kernel).
    pub(crate) fn replace_data_with_depth(&mut self, depth: usize, data: Vec<f64>) {
        assert!(depth > 0);
        self.depth = depth;
        self.replace_data(data);
    }

    /// 轴 `axis` 上格点 `index` 的坐标.
    ///
    /// `sizes[axis] == 1` 时取该轴下界.
    pub fn axis_coordinate(&self, axis: usize, index: usize) -> Result<f64, CacheError> {
        let ext = self.extent.as_ref().ok_or(CacheError::NoExtent)?;
        let lo = ext.minimums[axis];
        let hi = ext.maximums[axis];
        let n = self.sizes[axis];
        if n == 1 {
            return Ok(lo);
        }
        Ok(lo + index as f64 * (hi - lo) / (n - 1) as f64)
    }

    /// 以 ndarray 视图读取: 形状 `[sizes[d-1], ..., sizes[0], depth]`
    /// (行主序, 与内部布局一致, 零拷贝).
    pub fn view(&self) -> ArrayViewD<'_, f64> {
        let mut shape: Vec<usize> = self.sizes.iter().rev().copied().collect();
        shape.push(self.depth);
        ArrayViewD::from_shape(IxDyn(&shape), &self.data)
            .expect("cache 数据长度与几何不一致")
    }

    /// 从 ndarray 构造已填充好的 cache:
    /// 数组形状按 `[sizes[d-1], ..., sizes[0], depth]` 解释.
    ///
    /// 主要供测试与 experiments 直接喂图像用.
    pub fn from_array(
        array: ArrayD<f64>,
        extent: Option<GridExtent>,
    ) -> Result<Self, CacheError> {
        let shape = array.shape().to_vec();
        if shape.len() < 2 {
            return Err(CacheError::ZeroDimension);
        }
        let depth = shape[shape.len() - 1];
        let sizes: Vec<usize> = shape[..shape.len() - 1].iter().rev().copied().collect();
        let mut cache = ImageCache::new();
        cache.resize(sizes.len(), depth, &sizes, extent)?;
        let standard = array.as_standard_layout();
        cache.data = standard.iter().copied().collect();
        cache.valid = true;
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::{GridExtent, ImageCache};
    use crate::error::CacheError;
    use ndarray::ArrayD;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    /// resize + allocate 后缓冲区长度与几何一致且 cache 无效.
    #[test]
    fn test_resize_invariant() {
        let mut cache = ImageCache::new();
        let ext = GridExtent::new(&[0.0, 0.0], &[1.0, 2.0]).unwrap();
        cache.resize(2, 3, &[4, 5], Some(ext)).unwrap();
        cache.allocate_data().unwrap();
        assert_eq!(cache.data().len(), 3 * 4 * 5);
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_resize_rejects_bad_geometry() {
        let mut cache = ImageCache::new();
        assert_eq!(
            cache.resize(0, 1, &[], None).unwrap_err(),
            CacheError::ZeroDimension
        );
        assert_eq!(
            cache.resize(1, 0, &[4], None).unwrap_err(),
            CacheError::ZeroDepth
        );
        assert_eq!(
            cache.resize(2, 1, &[4], None).unwrap_err(),
            CacheError::MetadataLength
        );
        assert_eq!(
            cache.resize(2, 1, &[4, 0], None).unwrap_err(),
            CacheError::ZeroSize(1)
        );
        assert_eq!(
            GridExtent::new(&[1.0], &[0.0]).unwrap_err(),
            CacheError::InvertedRange(0)
        );
    }

    /// 轴坐标公式: `min + j * (max - min) / (size - 1)`.
    #[test]
    fn test_axis_coordinate() {
        let mut cache = ImageCache::new();
        let ext = GridExtent::new(&[0.0, -1.0], &[3.0, 1.0]).unwrap();
        cache.resize(2, 1, &[4, 3], Some(ext)).unwrap();
        assert!(f64_eq(cache.axis_coordinate(0, 0).unwrap(), 0.0));
        assert!(f64_eq(cache.axis_coordinate(0, 3).unwrap(), 3.0));
        assert!(f64_eq(cache.axis_coordinate(1, 1).unwrap(), 0.0));
    }

    /// ndarray 往返: from_array 与 view 形状/内容一致.
    #[test]
    fn test_array_round_trip() {
        let array = ArrayD::from_shape_vec(
            ndarray::IxDyn(&[2, 3, 1]),
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        )
        .unwrap();
        let cache = ImageCache::from_array(array.clone(), None).unwrap();
        assert_eq!(cache.sizes(), &[3, 2]);
        assert_eq!(cache.depth(), 1);
        assert!(cache.is_valid());
        assert_eq!(cache.view(), array.view());
        // 0 号轴 (宽) 最快.
        assert!(f64_eq(cache.data()[1], 1.0));
        assert!(f64_eq(cache.data()[3], 3.0));
    }
}
