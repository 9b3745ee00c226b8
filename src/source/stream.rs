//! 流式帧源
//!
//! 相机回调、视频解码器等外部生产者通过 [`FrameMailbox`] 的克隆
//! 句柄（"入口"）从自己的线程投递帧；图这边的节点在下一次更新
//! 传播时取走最新一帧并上传。旧帧被新帧顶替时直接丢弃：
//! 永不阻塞投递线程，也永不渲染已被取代的帧。

use std::any::Any;

use crate::canvas::Canvas;
use crate::context::RenderContext;
use crate::errors::Result;
use crate::graph::{FlowNode, FrameMailbox, SourceArity};

use super::FramePayload;

/// 跨线程投递驱动的零元数源节点
pub struct StreamSource {
    name: String,
    mailbox: FrameMailbox<FramePayload>,
    canvas: Option<Canvas>,
}

impl StreamSource {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mailbox: FrameMailbox::new(),
            canvas: None,
        }
    }

    /// 交给生产者线程的投递入口（可克隆、可跨线程发送）
    #[must_use]
    pub fn inlet(&self) -> FrameMailbox<FramePayload> {
        self.mailbox.clone()
    }
}

impl FlowNode for StreamSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> SourceArity {
        SourceArity::None
    }

    fn externally_stale(&self) -> bool {
        self.mailbox.is_occupied()
    }

    fn render(&mut self, ctx: &mut RenderContext, _inputs: &[Canvas]) -> Result<()> {
        let Some(frame) = self.mailbox.take() else {
            log::debug!("Stream source '{}' rendered with empty mailbox", self.name);
            return Ok(());
        };
        let needs_alloc = self
            .canvas
            .as_ref()
            .is_none_or(|c| c.size() != frame.size || c.format() != frame.format);
        if needs_alloc {
            self.canvas = Some(Canvas::allocate(ctx, frame.size, frame.format)?);
        }
        if let Some(canvas) = &self.canvas {
            canvas.upload(&frame.data)?;
        }
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
