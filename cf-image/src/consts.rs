//! 通用常量.
//!
//! 各 kernel 的数值常量集中于此, 便于查阅与测试引用.
//! 边界策略本身是 per-kernel 的, 不在此统一.

/// 采样坐标越界时的中性填充值 (灰色), 每通道相同.
///
/// 注意是 0.5 而非 0.0: 越界点视为 "未知" 而非 "黑色".
pub const OUT_OF_RANGE_FILL: f64 = 0.5;

/// Otsu 自动阈值使用的固定直方图 bin 数.
pub const OTSU_BINS: usize = 256;

/// 直方图 normalize 的尾部裁剪分母: 每侧丢弃约 `1/TAIL_TRIM_DIVISOR`
/// 的像素后确定映射上下界.
pub const TAIL_TRIM_DIVISOR: usize = 100;

/// Gaussian 核半径系数: 半径取 `ceil(GAUSSIAN_RADIUS_FACTOR * sigma)`.
pub const GAUSSIAN_RADIUS_FACTOR: f64 = 2.5;

/// Chan-Vese 轮廓演化相关常量.
pub mod chan_vese {
    /// 显式 Euler 步长 `d_t`.
    pub const TIME_STEP: f64 = 0.1;

    /// 曲率项权重 `mu`. 图像先被放大到 `[0, 255]` 灰度域,
    /// 故权重带 `255^2` 因子.
    pub const CURVATURE_WEIGHT: f64 = 0.01 * 255.0 * 255.0;

    /// 通道值放大到灰度域的系数.
    pub const GRAY_SCALE: f64 = 255.0;

    /// 初始水平集圆半径 = `min(w, h)/2 - CIRCLE_MARGIN`.
    pub const CIRCLE_MARGIN: f64 = 5.0;

    /// 输出掩码: `phi >= 0` 一侧.
    pub const INSIDE_VALUE: f64 = 0.0;

    /// 输出掩码: `phi < 0` 一侧.
    pub const OUTSIDE_VALUE: f64 = 0.7;
}

/// 颜色分割: 距离阈值 = `COLOR_DISTANCE_RATIO * max_distance`.
pub const COLOR_DISTANCE_RATIO: f64 = 0.3;

/// 三次 B-spline 插值核系数, 取 0.1667 而非精确 1/6.
pub const B3_SPLINE_COEFF: f64 = 0.1667;
