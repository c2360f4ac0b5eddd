//! 扁平缓冲区的多维索引/步长抽象.
//!
//! cache 的数据布局: 通道在最内层 (channel-minor), 其次 0 号轴
//! 变化最快, 即 axis-0-innermost 的行主序. 本模块把所有
//! 下标运算集中到 [`Lattice`] 上, kernel 不再手算步长.

/// 一张图像的格点几何: 各轴采样数加通道数.
///
/// 所有 "元素" (element) 下标均以 `f64` 条目计, 已含通道因子;
/// 所有 "像素" (pixel) 下标不含通道因子.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lattice {
    sizes: Vec<usize>,
    depth: usize,
}

impl Lattice {
    /// 构造. 调用方保证 `sizes` 非空且各项为正, `depth` 为正.
    pub fn new(sizes: &[usize], depth: usize) -> Self {
        assert!(!sizes.is_empty() && depth > 0);
        assert!(sizes.iter().all(|&s| s > 0));
        Lattice {
            sizes: sizes.to_vec(),
            depth,
        }
    }

    /// 维度数.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.sizes.len()
    }

    /// 各轴采样数.
    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// 通道数.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 格点 (像素) 总数.
    #[inline]
    pub fn pixels(&self) -> usize {
        self.sizes.iter().product()
    }

    /// 数据缓冲区的元素总数 (`depth * ∏sizes`).
    #[inline]
    pub fn storage_len(&self) -> usize {
        self.depth * self.pixels()
    }

    /// 给定轴的元素步长 (已含通道因子).
    #[inline]
    pub fn axis_stride(&self, axis: usize) -> usize {
        self.sizes[..axis].iter().product::<usize>() * self.depth
    }

    /// 多维格点下标 -> 像素下标 (0 号轴最快).
    pub fn encode(&self, indices: &[usize]) -> usize {
        debug_assert_eq!(indices.len(), self.dimension());
        let mut flat = indices[self.dimension() - 1];
        for m in (0..self.dimension() - 1).rev() {
            flat = flat * self.sizes[m] + indices[m];
        }
        flat
    }

    /// 像素下标 -> 多维格点下标.
    pub fn decode(&self, pixel: usize) -> Vec<usize> {
        let mut cur = pixel;
        self.sizes
            .iter()
            .map(|&s| {
                let i = cur % s;
                cur /= s;
                i
            })
            .collect()
    }

    /// 元素下标是否落在缓冲区内.
    #[inline]
    pub fn element_in_bounds(&self, element: isize) -> bool {
        element >= 0 && (element as usize) < self.storage_len()
    }

    /// 以 `radius` 为半径的超立方窗口的各格点相对元素偏移,
    /// 窗口内 0 号轴最快. 窗口边长 `2*radius + 1`, 共
    /// `(2*radius + 1)^dimension` 项.
    pub fn window_offsets(&self, radius: usize) -> Vec<isize> {
        let filter_size = 2 * radius + 1;
        let window_len = filter_size.pow(self.dimension() as u32);
        (0..window_len)
            .map(|j| {
                let mut offset = 0isize;
                let mut kernel_step = 1usize;
                for m in 0..self.dimension() {
                    let k = (j / kernel_step) % filter_size;
                    offset +=
                        (k as isize - radius as isize) * self.axis_stride(m) as isize;
                    kernel_step *= filter_size;
                }
                offset
            })
            .collect()
    }

    /// 任意边长模板窗口的相对元素偏移, 各轴以 `template_sizes[m]/2`
    /// 为中心 (偶数边长时中心偏向高侧).
    pub fn template_offsets(&self, template_sizes: &[usize]) -> Vec<isize> {
        debug_assert_eq!(template_sizes.len(), self.dimension());
        let window_len: usize = template_sizes.iter().product();
        (0..window_len)
            .map(|j| {
                let mut offset = 0isize;
                let mut kernel_step = 1usize;
                for m in 0..self.dimension() {
                    let k = (j / kernel_step) % template_sizes[m];
                    offset += (k as isize - (template_sizes[m] / 2) as isize)
                        * self.axis_stride(m) as isize;
                    kernel_step *= template_sizes[m];
                }
                offset
            })
            .collect()
    }
}
