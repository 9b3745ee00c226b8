//! 外部输入源节点
//!
//! 包装图外产生的图像内容的零元数节点：
//! - `picture`: 客户端随时赋图的静态图像源
//! - `stream`: 经单槽信箱从投递线程接收帧的流式源（相机/解码器）
//!
//! 两者的共同点：没有上游依赖，陈旧性完全由外部条件决定
//! （"上次渲染后是否有新内容"），渲染即上传。

pub mod picture;
pub mod stream;

use crate::gpu::{CanvasSize, PixelFormat};

pub use picture::PictureSource;
pub use stream::StreamSource;

/// 一帧外部图像数据
#[derive(Debug, Clone)]
pub struct FramePayload {
    pub data: Vec<u8>,
    pub size: CanvasSize,
    pub format: PixelFormat,
}

impl FramePayload {
    #[must_use]
    pub fn new(data: Vec<u8>, size: CanvasSize, format: PixelFormat) -> Self {
        Self { data, size, format }
    }
}
