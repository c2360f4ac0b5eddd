//! 全 operator 冒烟流水线.
//!
//! 用一个解析定义的二维亮斑场跑一遍全部 operator,
//! 打印各输出 cache 的统计摘要. 无数据集依赖.

use cf_image::prelude::*;
use log::info;

/// 恒等定位器: 坐标本身就是网格位置.
struct PlaneLocator;

impl MeshLocator for PlaneLocator {
    type Location = [f64; 2];

    fn coordinate_components(&self) -> usize {
        2
    }

    fn resolve(&self, coordinate: &[f64], _search_dimension: usize) -> Option<[f64; 2]> {
        let p = [coordinate[0], coordinate[1]];
        if p.iter().all(|c| (0.0..=1.0).contains(c)) {
            Some(p)
        } else {
            None
        }
    }
}

/// 中心亮斑 + 微弱斜坡的单通道场, 取值落在 [0, 1].
struct BlobField;

impl SourceField<[f64; 2]> for BlobField {
    fn component_count(&self) -> usize {
        1
    }

    fn evaluate(&self, location: &[f64; 2], _time: f64, values: &mut [f64]) -> bool {
        let (dx, dy) = (location[0] - 0.5, location[1] - 0.5);
        let blob = (-(dx * dx + dy * dy) / 0.02).exp();
        values[0] = (0.8 * blob + 0.1 * (location[0] + location[1])).min(1.0);
        true
    }
}

/// 相关 operator 的小模板: 全 1 的 3x3 均值核.
struct FlatTemplate;

impl SourceField<[f64; 2]> for FlatTemplate {
    fn component_count(&self) -> usize {
        1
    }

    fn evaluate(&self, _location: &[f64; 2], _time: f64, values: &mut [f64]) -> bool {
        values[0] = 1.0;
        true
    }
}

fn options(sizes: &[usize]) -> ImageFieldOptions {
    ImageFieldOptions {
        dimension: 2,
        sizes: sizes.to_vec(),
        minimums: vec![0.0, 0.0],
        maximums: vec![1.0, 1.0],
        search_dimension: 0,
    }
}

fn summarize(name: &str, cache: &ImageCache) {
    let data = cache.data();
    let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    info!(
        "{name}: sizes={:?} depth={} min={min:.4} max={max:.4} mean={mean:.4}",
        cache.sizes(),
        cache.depth(),
    );
}

fn run_all() -> Result<(), FieldError> {
    let locator = PlaneLocator;
    let field = BlobField;
    let opts = options(&[64, 64]);
    let time = 0.0;

    let mut gaussian = GaussianFilterField::new(&field, &locator, &opts, 0.05).unwrap();
    gaussian.evaluate(time)?;
    summarize("gaussian", gaussian.cache());

    let mut equalize = HistogramEqualizeField::new(&field, &locator, &opts, 256).unwrap();
    equalize.evaluate(time)?;
    summarize("histogram_equalize", equalize.cache());

    let mut normalize = HistogramNormalizeField::new(&field, &locator, &opts, 256).unwrap();
    normalize.evaluate(time)?;
    summarize("histogram_normalize", normalize.cache());

    let mut threshold = HistogramThresholdField::new(&field, &locator, &opts).unwrap();
    threshold.evaluate(time)?;
    summarize("histogram_threshold", threshold.cache());

    let mut haar = HaarReconstructField::new(&field, &locator, &opts, 2).unwrap();
    haar.evaluate(time)?;
    summarize("haar_reconstruct", haar.cache());

    let mut bvc = BvcDecompField::new(
        &field,
        &locator,
        &opts,
        BvcResult::BoundedVariation,
        4,
        0.12,
        0.1,
        0.05,
    )
    .unwrap();
    bvc.evaluate(time)?;
    summarize("bvc_decompose", bvc.cache());

    let mut chan_vese = ChanVeseField::new(&field, &locator, &opts, 20).unwrap();
    chan_vese.evaluate(time)?;
    summarize("chan_vese", chan_vese.cache());

    let mut segment = ColorSegmentField::new(&field, &locator, &opts).unwrap();
    segment.evaluate(time)?;
    summarize("color_segment", segment.cache());

    let mut statistics = FirstOrderStatisticsField::new(&field, &locator, &opts, 2).unwrap();
    statistics.evaluate(time)?;
    summarize("first_order_statistics", statistics.cache());

    let mut approximation =
        ImageApproximationField::new(&field, &locator, &opts, 1.0, 0.05, 0.01, 3).unwrap();
    approximation.evaluate(time)?;
    summarize("image_approximation", approximation.cache());

    let template = FlatTemplate;
    let mut correlation = ImageCorrelationField::new(
        &field,
        &locator,
        &opts,
        &template,
        &locator,
        &options(&[3, 3]),
        &[32, 32],
    )
    .unwrap();
    correlation.evaluate(time)?;
    summarize("image_correlation", correlation.cache());

    let mut resample =
        ImageResampleField::new(&field, &locator, &opts, ResampleMode::Bicubic, &[96, 96])
            .unwrap();
    resample.evaluate(time)?;
    summarize("image_resample", resample.cache());

    // 失效联动: 亮斑场变化后 gaussian 自动重算.
    let bus = ChangeBus::new();
    const BLOB_TAG: FieldTag = 1;
    gaussian.subscribe_invalidation(&bus, &[BLOB_TAG]);
    bus.notify(&[BLOB_TAG]);
    let recomputed = {
        gaussian.evaluate(time)?;
        gaussian.cache().is_valid()
    };
    info!("gaussian recomputed after upstream change: {recomputed}");

    Ok(())
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("logger init");

    if let Err(e) = run_all() {
        eprintln!("pipeline failed: {e:?}");
        std::process::exit(1);
    }
}
