//! 各图像处理 operator 的 field 适配层.
//!
//! 每个 operator 在构造时校验参数并确定 cache 几何, 求值时走
//! 统一流程: 上游变化 -> 重新填充 -> 重跑 kernel -> 逐点读出.
//! 公共读出接口集中在 [`ImageOperator`] trait.

use crate::cache::ImageCache;
use crate::error::{CacheError, FieldError, FieldOptionError};
use crate::kernel;

use super::notify::{ChangeBus, FieldTag};
use super::{ImageFieldCore, ImageFieldOptions, MeshLocator, NativeResolution, SourceField};

pub use crate::kernel::bvc::BvcResult;
pub use crate::kernel::resample::ResampleMode;

/// 所有 operator 共有的求值/读出/订阅接口.
///
/// 对象安全: 不同参数类型的 operator 可以收进同一个
/// `Vec<Box<dyn ImageOperator>>` 流水线.
pub trait ImageOperator {
    /// 确保 cache 就绪: 需要时重新填充并重跑 kernel.
    fn evaluate(&mut self, time: f64) -> Result<(), FieldError>;

    /// 按坐标逐点读出 (须先 [`evaluate`](Self::evaluate)).
    fn sample(&self, coordinate: &[f64], values: &mut [f64]) -> Result<(), CacheError>;

    /// 输出格点的原生分辨率.
    fn native_resolution(&self) -> NativeResolution;

    /// 输出 cache 只读访问.
    fn cache(&self) -> &ImageCache;

    /// 订阅上游字段变化.
    fn subscribe_invalidation(&mut self, bus: &ChangeBus, tags: &[FieldTag]);
}

macro_rules! impl_operator_readout {
    () => {
        fn sample(&self, coordinate: &[f64], values: &mut [f64]) -> Result<(), CacheError> {
            self.core.sample(coordinate, values)
        }

        fn native_resolution(&self) -> NativeResolution {
            self.core.native_resolution()
        }

        fn cache(&self) -> &ImageCache {
            self.core.cache()
        }

        fn subscribe_invalidation(&mut self, bus: &ChangeBus, tags: &[FieldTag]) {
            self.core.subscribe_invalidation(bus, tags);
        }
    };
}

fn positive(value: f64, name: &'static str) -> Result<f64, FieldOptionError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(FieldOptionError::NonPositive(name))
    }
}

fn nonzero(value: usize, name: &'static str) -> Result<usize, FieldOptionError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(FieldOptionError::Zero(name))
    }
}

fn planar(options: &ImageFieldOptions) -> Result<(), FieldOptionError> {
    if options.dimension == 2 {
        Ok(())
    } else {
        Err(FieldOptionError::NotPlanar(options.dimension))
    }
}

/// Gaussian 平滑 operator.
pub struct GaussianFilterField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
    sigma: f64,
}

impl<'a, M, V> GaussianFilterField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造, `sigma` 必须为正.
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
        sigma: f64,
    ) -> Result<Self, FieldOptionError> {
        Ok(GaussianFilterField {
            core: ImageFieldCore::new(value_field, locator, options)?,
            sigma: positive(sigma, "sigma")?,
        })
    }

    /// 平滑标准差.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl<'a, M, V> ImageOperator for GaussianFilterField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        let sigma = self.sigma;
        self.core.apply(time, |cache| kernel::gaussian::gaussian_filter(cache, sigma))
    }
}

/// 直方图均衡化 operator.
pub struct HistogramEqualizeField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
    bins: usize,
}

impl<'a, M, V> HistogramEqualizeField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造, `bins` 至少为 2.
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
        bins: usize,
    ) -> Result<Self, FieldOptionError> {
        if bins < 2 {
            return Err(FieldOptionError::TooFewBins(bins));
        }
        Ok(HistogramEqualizeField {
            core: ImageFieldCore::new(value_field, locator, options)?,
            bins,
        })
    }

    /// 直方图 bin 数.
    pub fn bins(&self) -> usize {
        self.bins
    }
}

impl<'a, M, V> ImageOperator for HistogramEqualizeField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        let bins = self.bins;
        self.core.apply(time, |cache| kernel::histogram::histogram_equalize(cache, bins))
    }
}

/// 直方图对比度归一化 operator.
pub struct HistogramNormalizeField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
    bins: usize,
}

impl<'a, M, V> HistogramNormalizeField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造, `bins` 至少为 2.
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
        bins: usize,
    ) -> Result<Self, FieldOptionError> {
        if bins < 2 {
            return Err(FieldOptionError::TooFewBins(bins));
        }
        Ok(HistogramNormalizeField {
            core: ImageFieldCore::new(value_field, locator, options)?,
            bins,
        })
    }

    /// 直方图 bin 数.
    pub fn bins(&self) -> usize {
        self.bins
    }
}

impl<'a, M, V> ImageOperator for HistogramNormalizeField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        let bins = self.bins;
        self.core.apply(time, |cache| kernel::histogram::histogram_normalize(cache, bins))
    }
}

/// Otsu 自动阈值 operator, 无参数.
pub struct HistogramThresholdField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
}

impl<'a, M, V> HistogramThresholdField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造.
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
    ) -> Result<Self, FieldOptionError> {
        Ok(HistogramThresholdField {
            core: ImageFieldCore::new(value_field, locator, options)?,
        })
    }
}

impl<'a, M, V> ImageOperator for HistogramThresholdField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        self.core.apply(time, kernel::histogram::histogram_threshold)
    }
}

/// Haar 小波重构 operator.
///
/// 各轴采样数必须能被 `2^levels` 整除.
pub struct HaarReconstructField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
    levels: usize,
}

impl<'a, M, V> HaarReconstructField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造, `levels` 至少为 1, 且各轴采样数须被 `2^levels` 整除.
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
        levels: usize,
    ) -> Result<Self, FieldOptionError> {
        let levels = nonzero(levels, "levels")?;
        planar(options)?;
        let block = 1usize << levels;
        if let Some(axis) = options.sizes.iter().position(|&s| s % block != 0) {
            return Err(FieldOptionError::SizeNotDivisible(axis));
        }
        Ok(HaarReconstructField {
            core: ImageFieldCore::new(value_field, locator, options)?,
            levels,
        })
    }

    /// 重构级数.
    pub fn levels(&self) -> usize {
        self.levels
    }
}

impl<'a, M, V> ImageOperator for HaarReconstructField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        let levels = self.levels;
        self.core.apply(time, |cache| kernel::haar::haar_reconstruct(cache, levels))
    }
}

/// 有界变差分解 operator.
pub struct BvcDecompField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
    result: BvcResult,
    iterations: usize,
    tou: f64,
    lambda: f64,
    mu: f64,
}

impl<'a, M, V> BvcDecompField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造. `iterations` 至少为 1, `tou`/`lambda`/`mu` 必须为正.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
        result: BvcResult,
        iterations: usize,
        tou: f64,
        lambda: f64,
        mu: f64,
    ) -> Result<Self, FieldOptionError> {
        planar(options)?;
        Ok(BvcDecompField {
            core: ImageFieldCore::new(value_field, locator, options)?,
            result,
            iterations: nonzero(iterations, "iterations")?,
            tou: positive(tou, "tou")?,
            lambda: positive(lambda, "lambda")?,
            mu: positive(mu, "mu")?,
        })
    }

    /// 输出的分解分量.
    pub fn result(&self) -> BvcResult {
        self.result
    }

    /// `(iterations, tou, lambda, mu)`.
    pub fn parameters(&self) -> (usize, f64, f64, f64) {
        (self.iterations, self.tou, self.lambda, self.mu)
    }
}

impl<'a, M, V> ImageOperator for BvcDecompField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        let (result, iterations) = (self.result, self.iterations);
        let (tou, lambda, mu) = (self.tou, self.lambda, self.mu);
        self.core.apply(time, |cache| {
            kernel::bvc::bvc_decompose(cache, result, iterations, tou, lambda, mu)
        })
    }
}

/// Chan-Vese 轮廓分割 operator.
pub struct ChanVeseField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
    iterations: usize,
}

impl<'a, M, V> ChanVeseField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造, `iterations` 至少为 1.
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
        iterations: usize,
    ) -> Result<Self, FieldOptionError> {
        planar(options)?;
        Ok(ChanVeseField {
            core: ImageFieldCore::new(value_field, locator, options)?,
            iterations: nonzero(iterations, "iterations")?,
        })
    }

    /// 演化步数.
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

impl<'a, M, V> ImageOperator for ChanVeseField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        let iterations = self.iterations;
        self.core.apply(time, |cache| kernel::chan_vese::chan_vese_segment(cache, iterations))
    }
}

/// 颜色距离分割 operator, 无参数.
pub struct ColorSegmentField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
}

impl<'a, M, V> ColorSegmentField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造.
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
    ) -> Result<Self, FieldOptionError> {
        planar(options)?;
        Ok(ColorSegmentField {
            core: ImageFieldCore::new(value_field, locator, options)?,
        })
    }
}

impl<'a, M, V> ImageOperator for ColorSegmentField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        self.core.apply(time, kernel::segment::color_segment)
    }
}

/// 滑窗一阶统计量 operator. 输出通道为 `[均值, 离散度]`.
pub struct FirstOrderStatisticsField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
    radius: usize,
}

impl<'a, M, V> FirstOrderStatisticsField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造, `radius` 至少为 1. 源字段必须是单分量的.
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
        radius: usize,
    ) -> Result<Self, FieldOptionError> {
        let depth = value_field.component_count();
        if depth != 1 {
            return Err(FieldOptionError::NotSingleChannel(depth));
        }
        Ok(FirstOrderStatisticsField {
            core: ImageFieldCore::new(value_field, locator, options)?,
            radius: nonzero(radius, "radius")?,
        })
    }

    /// 滑窗半径.
    pub fn radius(&self) -> usize {
        self.radius
    }
}

impl<'a, M, V> ImageOperator for FirstOrderStatisticsField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        let radius = self.radius;
        self.core
            .apply(time, |cache| kernel::statistics::first_order_statistics(cache, radius))
    }
}

/// 变分图像逼近 operator.
pub struct ImageApproximationField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
    sigma: f64,
    alpha: f64,
    belta: f64,
    iterations: usize,
}

impl<'a, M, V> ImageApproximationField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造, `sigma` 必须为正. `iterations == 0` 时为恒等变换.
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
        sigma: f64,
        alpha: f64,
        belta: f64,
        iterations: usize,
    ) -> Result<Self, FieldOptionError> {
        Ok(ImageApproximationField {
            core: ImageFieldCore::new(value_field, locator, options)?,
            sigma: positive(sigma, "sigma")?,
            alpha,
            belta,
            iterations,
        })
    }

    /// `(sigma, alpha, belta, iterations)`.
    pub fn parameters(&self) -> (f64, f64, f64, usize) {
        (self.sigma, self.alpha, self.belta, self.iterations)
    }
}

impl<'a, M, V> ImageOperator for ImageApproximationField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        let (sigma, alpha, belta, iterations) =
            (self.sigma, self.alpha, self.belta, self.iterations);
        self.core.apply(time, |cache| {
            kernel::approximation::image_approximation(cache, sigma, alpha, belta, iterations)
        })
    }
}

/// 图像相关 operator: 额外带一个模板 cache.
///
/// 模板字段 `T` 与图像字段共用定位器类型, 可以指向不同实例.
pub struct ImageCorrelationField<'a, M, V, T>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
    T: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
    template: ImageFieldCore<'a, M, T>,
    output_sizes: Vec<usize>,
}

impl<'a, M, V, T> ImageCorrelationField<'a, M, V, T>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
    T: SourceField<M::Location>,
{
    /// 构造. `output_sizes` 的长度必须等于图像维度; 模板与图像
    /// 的维度及通道数一致与否在求值时校验.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
        template_field: &'a T,
        template_locator: &'a M,
        template_options: &ImageFieldOptions,
        output_sizes: &[usize],
    ) -> Result<Self, FieldOptionError> {
        if output_sizes.len() != options.dimension {
            return Err(FieldOptionError::OutputSizesLength(
                options.dimension,
                output_sizes.len(),
            ));
        }
        Ok(ImageCorrelationField {
            core: ImageFieldCore::new(value_field, locator, options)?,
            template: ImageFieldCore::new(template_field, template_locator, template_options)?,
            output_sizes: output_sizes.to_vec(),
        })
    }

    /// 输出网格各轴采样数.
    pub fn output_sizes(&self) -> &[usize] {
        &self.output_sizes
    }

    /// 订阅模板字段的变化 (图像字段的订阅走
    /// [`ImageOperator::subscribe_invalidation`]).
    pub fn subscribe_template_invalidation(&mut self, bus: &ChangeBus, tags: &[FieldTag]) {
        self.template.subscribe_invalidation(bus, tags);
    }
}

impl<'a, M, V, T> ImageOperator for ImageCorrelationField<'a, M, V, T>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
    T: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        // 模板变化时图像输出同样过期.
        if self.template.refresh(time)? {
            self.core.cache_mut().invalidate();
        }
        let template = &self.template;
        let output_sizes = &self.output_sizes;
        self.core.apply(time, |cache| {
            kernel::correlation::image_correlation(cache, template.cache(), output_sizes)
        })
    }
}

/// 图像重采样 operator.
pub struct ImageResampleField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    core: ImageFieldCore<'a, M, V>,
    mode: ResampleMode,
    output_sizes: Vec<usize>,
}

impl<'a, M, V> ImageResampleField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    /// 构造. `output_sizes` 的长度必须等于维度, 各项为正.
    pub fn new(
        value_field: &'a V,
        locator: &'a M,
        options: &ImageFieldOptions,
        mode: ResampleMode,
        output_sizes: &[usize],
    ) -> Result<Self, FieldOptionError> {
        if output_sizes.len() != options.dimension {
            return Err(FieldOptionError::OutputSizesLength(
                options.dimension,
                output_sizes.len(),
            ));
        }
        if output_sizes.iter().any(|&s| s == 0) {
            return Err(FieldOptionError::Zero("output_sizes"));
        }
        Ok(ImageResampleField {
            core: ImageFieldCore::new(value_field, locator, options)?,
            mode,
            output_sizes: output_sizes.to_vec(),
        })
    }

    /// 重采样方式.
    pub fn mode(&self) -> ResampleMode {
        self.mode
    }

    /// 输出网格各轴采样数.
    pub fn output_sizes(&self) -> &[usize] {
        &self.output_sizes
    }
}

impl<'a, M, V> ImageOperator for ImageResampleField<'a, M, V>
where
    M: MeshLocator,
    V: SourceField<M::Location>,
{
    impl_operator_readout!();

    fn evaluate(&mut self, time: f64) -> Result<(), FieldError> {
        let mode = self.mode;
        let output_sizes = &self.output_sizes;
        self.core.apply(time, |cache| {
            kernel::resample::image_resample(cache, mode, output_sizes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BvcResult, ChanVeseField, FirstOrderStatisticsField, GaussianFilterField,
        HaarReconstructField, HistogramEqualizeField, ImageOperator, ImageResampleField,
        ResampleMode,
    };
    use crate::error::FieldOptionError;
    use crate::field::notify::ChangeBus;
    use crate::field::{ImageFieldOptions, MeshLocator, SourceField};

    struct UnitLocator;

    impl MeshLocator for UnitLocator {
        type Location = [f64; 2];

        fn coordinate_components(&self) -> usize {
            2
        }

        fn resolve(&self, coordinate: &[f64], _search_dimension: usize) -> Option<[f64; 2]> {
            Some([coordinate[0], coordinate[1]])
        }
    }

    /// 对角线斜坡场.
    struct RampField;

    impl SourceField<[f64; 2]> for RampField {
        fn component_count(&self) -> usize {
            1
        }

        fn evaluate(&self, location: &[f64; 2], _time: f64, values: &mut [f64]) -> bool {
            values[0] = 0.5 * (location[0] + location[1]);
            true
        }
    }

    fn unit_options(sizes: &[usize]) -> ImageFieldOptions {
        ImageFieldOptions {
            dimension: 2,
            sizes: sizes.to_vec(),
            minimums: vec![0.0, 0.0],
            maximums: vec![1.0, 1.0],
            search_dimension: 0,
        }
    }

    /// 参数校验发生在构造期.
    #[test]
    fn test_invalid_parameters_rejected() {
        let locator = UnitLocator;
        assert!(matches!(
            GaussianFilterField::new(&RampField, &locator, &unit_options(&[8, 8]), 0.0),
            Err(FieldOptionError::NonPositive("sigma"))
        ));
        assert!(matches!(
            HistogramEqualizeField::new(&RampField, &locator, &unit_options(&[8, 8]), 1),
            Err(FieldOptionError::TooFewBins(1))
        ));
        assert!(matches!(
            ImageResampleField::new(
                &RampField,
                &locator,
                &unit_options(&[8, 8]),
                ResampleMode::Nearest,
                &[4]
            ),
            Err(FieldOptionError::OutputSizesLength(2, 1))
        ));
        // BvcResult 在适配层原样透传.
        let _ = BvcResult::BoundedVariation;
    }

    /// 两分量场, 用于分量数校验.
    struct PairField;

    impl SourceField<[f64; 2]> for PairField {
        fn component_count(&self) -> usize {
            2
        }

        fn evaluate(&self, location: &[f64; 2], _time: f64, values: &mut [f64]) -> bool {
            values[0] = location[0];
            values[1] = location[1];
            true
        }
    }

    /// 几何约束在构造期拒绝, 而不是等到求值时 panic.
    #[test]
    fn test_geometry_rejected_at_construction() {
        let locator = UnitLocator;
        // 6 不能被 2^2 整除.
        assert!(matches!(
            HaarReconstructField::new(&RampField, &locator, &unit_options(&[6, 6]), 2),
            Err(FieldOptionError::SizeNotDivisible(0))
        ));
        assert!(HaarReconstructField::new(&RampField, &locator, &unit_options(&[8, 8]), 2).is_ok());
        assert!(matches!(
            FirstOrderStatisticsField::new(&PairField, &locator, &unit_options(&[8, 8]), 1),
            Err(FieldOptionError::NotSingleChannel(2))
        ));

        let line = ImageFieldOptions {
            dimension: 1,
            sizes: vec![8],
            minimums: vec![0.0],
            maximums: vec![1.0],
            search_dimension: 0,
        };
        assert!(matches!(
            ChanVeseField::new(&RampField, &locator, &line, 5),
            Err(FieldOptionError::NotPlanar(1))
        ));
    }

    /// 求值 -> 读出: 平滑后的斜坡场内部仍单调.
    #[test]
    fn test_evaluate_and_sample() {
        let locator = UnitLocator;
        let mut field =
            GaussianFilterField::new(&RampField, &locator, &unit_options(&[8, 8]), 0.5).unwrap();
        field.evaluate(0.0).unwrap();
        let mut low = [0.0];
        let mut high = [0.0];
        field.sample(&[0.4, 0.4], &mut low).unwrap();
        field.sample(&[0.6, 0.6], &mut high).unwrap();
        assert!(low[0] < high[0]);

        let res = field.native_resolution();
        assert_eq!(res.sizes, vec![8, 8]);
        assert_eq!(res.minimums, vec![0.0, 0.0]);
    }

    /// 上游变化通知使 cache 在下一次求值时重算.
    #[test]
    fn test_invalidation_triggers_recompute() {
        let locator = UnitLocator;
        let bus = ChangeBus::new();
        let mut field =
            GaussianFilterField::new(&RampField, &locator, &unit_options(&[8, 8]), 0.5).unwrap();
        field.subscribe_invalidation(&bus, &[7]);
        field.evaluate(0.0).unwrap();
        assert!(field.cache().is_valid());

        bus.notify(&[7]);
        // 通知本身不清 cache, 下一次求值才重算.
        assert!(field.cache().is_valid());
        field.evaluate(0.0).unwrap();
        assert!(field.cache().is_valid());
    }

    /// 重采样 operator 求值后 native_resolution 反映输出网格.
    #[test]
    fn test_resample_native_resolution() {
        let locator = UnitLocator;
        let mut field = ImageResampleField::new(
            &RampField,
            &locator,
            &unit_options(&[8, 8]),
            ResampleMode::Nearest,
            &[4, 4],
        )
        .unwrap();
        field.evaluate(0.0).unwrap();
        assert_eq!(field.native_resolution().sizes, vec![4, 4]);
        assert_eq!(field.cache().data().len(), 16);
    }
}
