//! 数值 kernel: 在已填充的 [`ImageCache`](crate::cache::ImageCache)
//! 扁平缓冲区上原位变换.
//!
//! 所有 kernel 遵循同一套约定:
//!
//! - 输入 cache 必须已填充 (数据非空), 否则报
//!   [`KernelError::EmptyCache`](crate::error::KernelError::EmptyCache);
//! - 参数的取值范围在 field 适配层校验, kernel 内用 `assert!`
//!   兜底调用方 bug;
//! - 成功时以新缓冲区整体替换 cache 数据并把 cache 标记为有效,
//!   失败时不触碰 cache 数据.
//!
//! 边界处理各 kernel 不同 (扁平截断 / 环绕 / 钳制 / 单侧差分),
//! 见各模块文档.

pub mod approximation;
pub mod bvc;
pub mod chan_vese;
pub mod correlation;
pub mod gaussian;
pub mod haar;
pub mod histogram;
pub mod resample;
pub mod segment;
pub mod statistics;

use crate::cache::ImageCache;
use crate::error::KernelError;

/// 校验 cache 已填充.
pub(crate) fn require_data(cache: &ImageCache) -> Result<(), KernelError> {
    if cache.data().is_empty() {
        return Err(KernelError::EmptyCache);
    }
    Ok(())
}

/// 校验 cache 为已填充的单通道图像.
pub(crate) fn require_single_channel(cache: &ImageCache) -> Result<(), KernelError> {
    require_data(cache)?;
    if cache.depth() != 1 {
        return Err(KernelError::NotSingleChannel(cache.depth()));
    }
    Ok(())
}

/// 校验 cache 为已填充的 2 维图像 (任意通道数).
pub(crate) fn require_planar(cache: &ImageCache) -> Result<(), KernelError> {
    require_data(cache)?;
    if cache.dimension() != 2 {
        return Err(KernelError::UnsupportedDimension(cache.dimension()));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::cache::{GridExtent, ImageCache};

    pub fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// 单通道 2 维 cache, 单位坐标范围, 数据按 0 号轴最快排布.
    pub fn planar_cache(width: usize, height: usize, data: Vec<f64>) -> ImageCache {
        assert_eq!(data.len(), width * height);
        let mut cache = ImageCache::new();
        let ext = GridExtent::new(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        cache.resize(2, 1, &[width, height], Some(ext)).unwrap();
        cache.allocate_data().unwrap();
        cache.replace_data(data);
        cache
    }
}
