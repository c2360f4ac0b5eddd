//! 图像与模板的相关 / 加权平均 (任意维度).
//!
//! 输出网格独立于输入网格: 每个输出格点先映射到输入格点
//! `trunc((x_out + 0.5)·(in_size - 1)/out_size)`, 再以模板窗口
//! 对输入做加权求和, 除以模板各通道的权重总和. 窗口越过缓冲区
//! 首尾时按整条扁平缓冲区环绕.
//!
//! 成功后 cache 的各轴采样数变为 `output_sizes`.

use crate::cache::ImageCache;
use crate::error::KernelError;

/// 以 `template` 为权重窗口对 cache 做相关, 重采样到
/// `output_sizes` 网格.
pub fn image_correlation(
    cache: &mut ImageCache,
    template: &ImageCache,
    output_sizes: &[usize],
) -> Result<(), KernelError> {
    super::require_data(cache)?;
    if template.data().is_empty() {
        return Err(KernelError::EmptyCache);
    }
    let dimension = cache.dimension();
    let depth = cache.depth();
    if template.depth() != depth {
        return Err(KernelError::DepthMismatch(depth, template.depth()));
    }
    if template.dimension() != dimension || output_sizes.len() != dimension {
        return Err(KernelError::SizesLength);
    }
    if output_sizes.iter().any(|&s| s == 0) {
        return Err(KernelError::ZeroOutputSizes);
    }

    let lattice = cache.lattice();
    let in_sizes = cache.sizes().to_vec();
    let storage_len = cache.data().len() as isize;

    // 模板各通道的权重总和.
    let template_pixels = template.data().len() / depth;
    let mut total_weight = vec![0.0f64; depth];
    for j in 0..template_pixels {
        for k in 0..depth {
            total_weight[k] += template.data()[j * depth + k];
        }
    }
    if let Some(k) = total_weight.iter().position(|&t| t == 0.0) {
        return Err(KernelError::ZeroTemplateWeight(k));
    }

    let offsets = lattice.template_offsets(template.sizes());
    let output_pixels: usize = output_sizes.iter().product();
    let mut out = vec![0.0f64; output_pixels * depth];
    let mut mean = vec![0.0f64; depth];
    for i in 0..output_pixels {
        // 输出格点 -> 输入格点.
        let mut cur = i;
        let mut input_pixel = 0usize;
        let mut input_indices = vec![0usize; dimension];
        for m in 0..dimension {
            let xout = cur % output_sizes[m];
            cur /= output_sizes[m];
            input_indices[m] = ((xout as f64 + 0.5) * (in_sizes[m] as f64 - 1.0)
                / output_sizes[m] as f64) as usize;
        }
        for m in (0..dimension).rev() {
            input_pixel = input_pixel * in_sizes[m] + input_indices[m];
        }

        mean.fill(0.0);
        for (j, &off) in offsets.iter().enumerate() {
            let mut at = input_pixel as isize * depth as isize + off;
            if at < 0 {
                at += storage_len;
            } else if at >= storage_len {
                at -= storage_len;
            }
            for k in 0..depth {
                mean[k] += cache.data()[at as usize + k] * template.data()[j * depth + k];
            }
        }
        for k in 0..depth {
            out[i * depth + k] = mean[k] / total_weight[k];
        }
    }
    cache.replace_data_with_sizes(output_sizes, out);
    Ok(())
}
