#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 在 N 维规则格点上缓存字段取值, 并提供一组就地图像处理
//! kernel 及其 field 适配层.
//!
//! 该 crate 目前仅提供 `safe` 接口. 在非期望情况下程序会直接
//! panic, 而不会导致内存错误. As what Rust promises.
//!
//! # 结构
//!
//! ### Cache 层 ✅
//!
//! 扁平 `f64` 缓冲区 + 格点几何 (各轴采样数, 坐标范围, 通道数),
//! 含惰性填充与最近邻逐点读出.
//!
//! 实现位于 `cf-image/src/cache`.
//!
//! ### Kernel 层 ✅
//!
//! 就地变换 cache 的数值算法:
//!
//! 1. Gaussian 平滑 (任意维) ✅
//! 2. 直方图均衡化 / 对比度归一化 / Otsu 自动阈值 ✅
//! 3. Haar 小波重构 ✅
//! 4. 有界变差分解 (BV + 振荡分量) ✅
//! 5. Chan-Vese 轮廓分割 ✅
//! 6. 颜色距离分割 ✅
//! 7. 滑窗一阶统计量 ✅
//! 8. 变分图像逼近 ✅
//! 9. 模板相关 ✅
//! 10. 最近邻 / 双三次重采样 ✅
//!
//! 实现位于 `cf-image/src/kernel`.
//!
//! ### Field 层 ✅
//!
//! operator 适配: 参数校验, 上游变化订阅, "重新填充 -> 重跑
//! kernel -> 逐点读出" 的统一求值流程. 网格反查与源字段求值
//! 通过 [`field::MeshLocator`] / [`field::SourceField`] 两个
//! trait 交给调用方.
//!
//! 实现位于 `cf-image/src/field`.

pub mod cache;
pub mod consts;
pub mod error;
pub mod field;
pub mod kernel;

pub mod prelude;

pub use cache::{GridExtent, ImageCache};
pub use field::{ImageFieldOptions, MeshLocator, NativeResolution, SourceField};
