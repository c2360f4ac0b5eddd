//! 运行时错误.
//!
//! 错误分三层: cache 几何/填充错误, kernel 数值错误, 以及
//! operator 参数错误. 所有错误都是可恢复的; 不可恢复的调用方
//! bug (如缓冲区长度不匹配) 直接 panic.

/// [`crate::cache::ImageCache`] 几何与填充错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// 维度必须为正.
    ZeroDimension,

    /// 通道数必须为正.
    ZeroDepth,

    /// 给定轴上的采样数为 0. 参数为轴下标.
    ZeroSize(usize),

    /// sizes / minimums / maximums 的长度与维度不一致.
    MetadataLength,

    /// 给定轴上 `minimum > maximum`. 参数为轴下标.
    InvertedRange(usize),

    /// cache 缺少坐标范围元数据, 无法做坐标 <-> 格点换算.
    NoExtent,

    /// 坐标字段分量数不足. `(需要, 实际)`.
    CoordinateComponents(usize, usize),

    /// 值字段分量数与 cache 通道数不一致. `(cache 通道, 字段分量)`.
    ValueComponents(usize, usize),
}

/// Kernel 数值错误.
///
/// 除分配失败 (Rust 下由 OOM abort 承担) 以外, kernel 的失败全部
/// 来自退化输入; 返回错误时 cache 内容不可信, 调用方应令其失效.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// cache 从未 resize/填充, 没有可处理的数据.
    EmptyCache,

    /// kernel 不支持该维度. 参数为实际维度.
    UnsupportedDimension(usize),

    /// kernel 要求单通道输入. 参数为实际通道数.
    NotSingleChannel(usize),

    /// 直方图没有跨度 (累积分布首尾相等), 无法均衡化. 参数为通道下标.
    FlatHistogram(usize),

    /// 裁剪后的直方图上下界重合. 参数为通道下标.
    ZeroSpanBound(usize),

    /// 灰度图为常值, 无法归一化/取阈值.
    FlatImage,

    /// 结果分量为常值, 无法做 min-max 归一化.
    FlatResult,

    /// 模板图像某通道权重和为 0. 参数为通道下标.
    ZeroTemplateWeight(usize),

    /// 输出 sizes 全为 0.
    ZeroOutputSizes,

    /// 模板/输出 sizes 的长度与图像维度不一致.
    SizesLength,

    /// 两个 cache 的通道数不一致. `(图像, 模板)`.
    DepthMismatch(usize, usize),
}

/// Operator 构造参数错误.
///
/// 构造失败不产生任何副作用: 既不分配 cache, 也不注册失效订阅.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOptionError {
    /// cache 几何参数非法.
    Cache(CacheError),

    /// 必须为正的数值参数非正. 参数为其名字.
    NonPositive(&'static str),

    /// 必须非零的整型参数为 0. 参数为其名字.
    Zero(&'static str),

    /// 直方图 bin 数过少 (至少 2). 参数为实际值.
    TooFewBins(usize),

    /// 输出 sizes 长度与维度不一致. `(维度, 实际长度)`.
    OutputSizesLength(usize, usize),

    /// 只支持 2 维格点的算法收到其它维度. 参数为实际维度.
    NotPlanar(usize),

    /// 输入字段必须单分量. 参数为实际分量数.
    NotSingleChannel(usize),

    /// 某轴采样数不能被 2 的 levels 次幂整除. 参数为轴下标.
    SizeNotDivisible(usize),
}

impl From<CacheError> for FieldOptionError {
    fn from(e: CacheError) -> Self {
        FieldOptionError::Cache(e)
    }
}

/// Operator 求值错误: 填充或 kernel 阶段失败.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// 填充 (populate) 阶段失败.
    Populate(CacheError),

    /// kernel 阶段失败, cache 已被置为无效.
    Kernel(KernelError),
}

impl From<CacheError> for FieldError {
    fn from(e: CacheError) -> Self {
        FieldError::Populate(e)
    }
}

impl From<KernelError> for FieldError {
    fn from(e: KernelError) -> Self {
        FieldError::Kernel(e)
    }
}
