//! Haar 小波重构 (2 维, 逐通道).
//!
//! 输入被解释为多级 Haar 系数: 沿 X 方向按 [近似 | 细节]
//! 排布, 沿 Y 方向按 [细节 / 近似] 排布 (即近似块在下半).
//! 第一阶段把各列的上下半块互换成标准排布, 第二阶段从最粗一级
//! 起逐级做蝶形逆变换 (先 Y 后 X); 粗级只对系数覆盖到的前
//! `2w` 列 / `2h` 行做逆变换, 其余行列原样带过.

use crate::cache::ImageCache;
use crate::error::KernelError;

/// 长度 `2w` 的一维逆蝶形: `out[2i] = a[i] + a[i+w]`,
/// `out[2i+1] = a[i] - a[i+w]`.
fn undo_haar(line: &mut [f64], w: usize) {
    let mut tmp = vec![0.0f64; 2 * w];
    for i in 0..w {
        tmp[2 * i] = line[i] + line[i + w];
        tmp[2 * i + 1] = line[i] - line[i + w];
    }
    line[..2 * w].copy_from_slice(&tmp);
}

/// 从 `levels` 级 Haar 系数重构图像.
pub fn haar_reconstruct(cache: &mut ImageCache, levels: usize) -> Result<(), KernelError> {
    assert!(levels >= 1, "levels 至少为 1");
    super::require_planar(cache)?;

    let width = cache.sizes()[0];
    let height = cache.sizes()[1];
    let depth = cache.depth();
    assert!(
        width % (1 << levels) == 0 && height % (1 << levels) == 0,
        "各轴采样数必须能被 2^levels 整除"
    );

    let mut work = cache.data().to_vec();
    let mut line = vec![0.0f64; width.max(height)];

    // 阶段 1: 各级逐列上下半块互换.
    for pass in 0..depth {
        let mut h = height;
        let mut w = width;
        for level in 0..levels {
            for col in 0..w {
                for k in 0..height {
                    line[k] = work[(k * width + col) * depth + pass];
                }
                for k in 0..height {
                    let from = if level == 0 || k < h {
                        if k < h / 2 {
                            k + h / 2
                        } else if k < h {
                            k - h / 2
                        } else {
                            k
                        }
                    } else {
                        k
                    };
                    work[(k * width + col) * depth + pass] = line[from];
                }
            }
            w /= 2;
            h /= 2;
        }
    }

    // 阶段 2: 自最粗一级向上逐级逆变换.
    let mut result = work.clone();
    let mut scratch = vec![0.0f64; result.len()];
    for pass in 0..depth {
        let mut h = height >> levels;
        let mut w = width >> levels;
        for level in 0..levels {
            let last = level == levels - 1;
            // Y 方向.
            for col in 0..width {
                for k in 0..height {
                    line[k] = result[(k * width + col) * depth + pass];
                }
                if last || col < 2 * w {
                    undo_haar(&mut line[..height], h);
                }
                for k in 0..height {
                    scratch[(k * width + col) * depth + pass] = line[k];
                }
            }
            // X 方向.
            for row in 0..height {
                for k in 0..width {
                    line[k] = scratch[(row * width + k) * depth + pass];
                }
                if last || row < 2 * h {
                    undo_haar(&mut line[..width], w);
                }
                for k in 0..width {
                    result[(row * width + k) * depth + pass] = line[k];
                }
            }
            h *= 2;
            w *= 2;
        }
    }
    cache.replace_data(result);
    Ok(())
}
