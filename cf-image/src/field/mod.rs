//! Field 侧接口: 外部协作者 trait 与各 operator 的胶水层.
//!
//! cache 核心只消费两个外部能力: 把坐标解析为网格位置的
//! [`MeshLocator`], 和在网格位置上求值的 [`SourceField`].
//! 网格搜索与基函数求值本身不在本 crate 范围内.

use crate::cache::{GridExtent, ImageCache};
use crate::cache::populate::{populate, PopulateReport};
use crate::cache::sample::sample_into;
use crate::error::{CacheError, FieldError, FieldOptionError};

pub mod notify;
pub mod ops;

use notify::{ChangeBus, FieldTag, StaleFlag, Subscription};

/// 坐标 -> 网格位置解析器.
///
/// 一次 `resolve` 对应一条坐标向量在网格 (某个 region) 内的反查;
/// `Location` 对本 crate 完全不透明, 原样传给 [`SourceField`].
pub trait MeshLocator {
    /// 解析结果的位置类型 (网格单元 + 局部坐标等).
    type Location;

    /// 该解析器对应的坐标字段分量数.
    fn coordinate_components(&self) -> usize;

    /// 解析坐标. `search_dimension` 为 0 时在所有维度的单元中搜索,
    /// 否则只搜该维度的单元. 找不到时返回 `None`.
    fn resolve(&self, coordinate: &[f64], search_dimension: usize)
        -> Option<Self::Location>;
}

/// 可在网格位置上求值的源字段.
pub trait SourceField<L> {
    /// 分量 (通道) 数.
    fn component_count(&self) -> usize;

    /// 在位置 `location`, 时刻 `time` 求值, 写入 `values`
    /// (长度等于分量数). 返回是否求值成功; 失败时 `values`
    /// 内容未定义, 由调用方清零.
    fn evaluate(&self, location: &L, time: f64, values: &mut [f64]) -> bool;
}

/// operator 的公共几何参数, 构造时一次性给齐.
#[derive(Clone, Debug)]
pub struct ImageFieldOptions {
    /// 空间维度 (1..=3 常用, 不设上限).
    pub dimension: usize,

    /// 各轴采样数.
    pub sizes: Vec<usize>,

    /// 各轴坐标下界.
    pub minimums: Vec<f64>,

    /// 各轴坐标上界.
    pub maximums: Vec<f64>,

    /// 网格反查的单元维度, 0 表示不限.
    pub search_dimension: usize,
}

/// 各 operator 共用的 "cache + 源字段 + 失效订阅" 组合.
///
/// 每个 operator 独占一个 core (correlation 额外再带一个模板
/// cache); 源字段与解析器均为非占有引用, 生存期由调用方保证.
pub struct ImageFieldCore<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    value_field: &'a V,
    locator: &'a M,
    search_dimension: usize,
    // kernel 可能改写 cache 的 sizes/depth, 重新填充前按这里
    // 记录的几何复位.
    sizes: Vec<usize>,
    extent: GridExtent,
    cache: ImageCache,
    stale: StaleFlag,
    subscription: Option<Subscription>,
}

impl<'a, M, V> ImageFieldCore<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造并立即确定 cache 几何. 校验失败时不产生任何副作用.
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
    ) -> Result<Self, FieldOptionError> {
        let depth = value_field.component_count();
        if depth == 0 {
            return Err(CacheError::ZeroDepth.into());
        }
        if locator.coordinate_components() < options.dimension {
            return Err(CacheError::CoordinateComponents(
                options.dimension,
                locator.coordinate_components(),
            )
            .into());
        }
        let extent = GridExtent::new(&options.minimums, &options.maximums)?;
        let mut cache = ImageCache::new();
        cache.resize(options.dimension, depth, &options.sizes, Some(extent.clone()))?;
        Ok(ImageFieldCore {
            value_field,
            locator,
            search_dimension: options.search_dimension,
            sizes: options.sizes.clone(),
            extent,
            cache,
            stale: StaleFlag::new(),
            subscription: None,
        })
    }

    /// 订阅上游字段变化: 任一 `tags` 中的字段变化时, 下一次读取
    /// 前 cache 将被置为无效. 重复调用会替换旧订阅.
    pub fn subscribe_invalidation(&mut self, bus: &ChangeBus, tags: &[FieldTag]) {
        self.subscription = Some(bus.subscribe(tags, &self.stale));
    }

    /// cache 只读访问.
    #[inline]
    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// cache 可写访问 (kernel 用).
    #[inline]
    pub fn cache_mut(&mut self) -> &mut ImageCache {
        &mut self.cache
    }

    /// 若上游变化或 cache 无效, 重新填充. 返回是否执行了填充
    /// (kernel 需要在填充后重跑).
    pub fn refresh(&mut self, time: f64) -> Result<bool, FieldError> {
        if self.stale.take() {
            self.cache.invalidate();
        }
        if self.cache.is_valid() {
            return Ok(false);
        }
        // kernel 可能改过 sizes/depth, 先复位几何.
        self.cache.resize(
            self.sizes.len(),
            self.value_field.component_count(),
            &self.sizes,
            Some(self.extent.clone()),
        ).map_err(FieldError::Populate)?;
        let report =
            populate(&mut self.cache, self.value_field, self.locator, self.search_dimension, time)?;
        report.log_warnings();
        Ok(true)
    }

    /// 重算流程: 需要时重新填充并重跑 kernel. kernel 失败时
    /// cache 被置为无效并把错误向上传.
    pub fn apply<F>(&mut self, time: f64, kernel: F) -> Result<(), FieldError>
    where
        F: FnOnce(&mut ImageCache) -> Result<(), crate::error::KernelError>,
    {
        if self.refresh(time)? {
            if let Err(e) = kernel(&mut self.cache) {
                self.cache.invalidate();
                return Err(FieldError::Kernel(e));
            }
        }
        Ok(())
    }

    /// 按坐标逐点读出 (越界填 0.5).
    pub fn sample(&self, coordinate: &[f64], values: &mut [f64]) -> Result<(), CacheError> {
        sample_into(&self.cache, coordinate, values)
    }

    /// cache 当前的原生分辨率 (维度/各轴采样数/坐标范围).
    pub fn native_resolution(&self) -> NativeResolution {
        let extent = self.cache.extent().expect("core 的 cache 总有 extent");
        NativeResolution {
            dimension: self.cache.dimension(),
            sizes: self.cache.sizes().to_vec(),
            minimums: extent.minimums().to_vec(),
            maximums: extent.maximums().to_vec(),
        }
    }

    /// 手动填充一次, 不经过 stale 检查, 也不重跑 kernel.
    pub fn populate_now(&mut self, time: f64) -> Result<PopulateReport, CacheError> {
        populate(&mut self.cache, self.value_field, self.locator, self.search_dimension, time)
    }
}

/// operator 输出格点的原生分辨率.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeResolution {
    /// 空间维度.
    pub dimension: usize,

    /// 各轴采样数.
    pub sizes: Vec<usize>,

    /// 各轴坐标下界.
    pub minimums: Vec<f64>,

    /// 各轴坐标上界.
    pub maximums: Vec<f64>,
}
