//! 静态图像源
//!
//! 包装一张客户端提供的图像。图像可以随时重新赋值；
//! 赋值本身不触碰 GPU，下一次 `update` 传播时才上传。

use std::any::Any;

use crate::canvas::Canvas;
use crate::context::RenderContext;
use crate::errors::{PrismError, Result};
use crate::graph::{FlowNode, SourceArity};

use super::FramePayload;

/// 外部赋图的零元数源节点
pub struct PictureSource {
    name: String,
    canvas: Option<Canvas>,
    image: Option<FramePayload>,
    /// 上次渲染之后被重新赋图
    pending: bool,
}

impl PictureSource {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            canvas: None,
            image: None,
            pending: false,
        }
    }

    #[must_use]
    pub fn with_image(name: &str, image: FramePayload) -> Self {
        let mut s = Self::new(name);
        s.set_image(image);
        s
    }

    /// 赋一张新图。可以在任意时刻调用；节点随之变为陈旧。
    pub fn set_image(&mut self, image: FramePayload) {
        self.image = Some(image);
        self.pending = true;
    }

    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

impl FlowNode for PictureSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> SourceArity {
        SourceArity::None
    }

    fn externally_stale(&self) -> bool {
        self.pending
    }

    fn render(&mut self, ctx: &mut RenderContext, _inputs: &[Canvas]) -> Result<()> {
        let image = self.image.as_ref().ok_or_else(|| {
            PrismError::RenderFailed(format!("picture source '{}' has no image", self.name))
        })?;
        let needs_alloc = self
            .canvas
            .as_ref()
            .is_none_or(|c| c.size() != image.size || c.format() != image.format);
        if needs_alloc {
            self.canvas = Some(Canvas::allocate(ctx, image.size, image.format)?);
        }
        let canvas = self.canvas.as_ref().ok_or_else(|| {
            PrismError::RenderFailed("picture canvas allocation missing".into())
        })?;
        canvas.upload(&image.data)?;
        self.pending = false;
        Ok(())
    }

    fn backing_canvas(&self) -> Option<Canvas> {
        self.canvas.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
