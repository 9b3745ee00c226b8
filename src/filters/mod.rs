//! 内置滤镜库
//!
//! 一组基于核心滤镜契约的常用滤镜：构造函数配好着色器源与默认
//! 参数，返回普通的 [`Filter`] / [`TwoPassFilter`](crate::filter::TwoPassFilter)
//! 节点。核心对这些滤镜的数学一无所知：它们与第三方滤镜走完全
//! 相同的具名参数与节点接口。

pub mod blur;
pub mod color;
pub mod convolution;

pub use blur::{box_blur, gaussian_blur, set_blur_size};
pub use color::{brightness, color_matrix, contrast, gamma, saturation};
pub use convolution::{convolution_3x3, set_texel_size};
