//! 两阶段滤镜
//!
//! 内部串联两个私有的 [`Filter`] 阶段（例如可分离高斯模糊的水平/
//! 垂直两趟），各自渲染进中间 Canvas；对图只暴露最终输出，
//! 内部阶段不是独立的图节点。

use std::any::Any;

use crate::canvas::Canvas;
use crate::context::RenderContext;
use crate::errors::{PrismError, Result};
use crate::gpu::UniformValue;
use crate::graph::{FlowNode, SourceArity};

use super::Filter;

/// 内部两趟渲染的滤镜节点
pub struct TwoPassFilter {
    name: String,
    stage_one: Filter,
    stage_two: Filter,
}

impl TwoPassFilter {
    #[must_use]
    pub fn new(name: &str, stage_one: Filter, stage_two: Filter) -> Self {
        Self {
            name: name.to_string(),
            stage_one,
            stage_two,
        }
    }

    pub fn stage_one_mut(&mut self) -> &mut Filter {
        &mut self.stage_one
    }

    pub fn stage_two_mut(&mut self) -> &mut Filter {
        &mut self.stage_two
    }

    /// 同名参数同时赋给两个阶段
    pub fn set_uniform_both<V: Into<UniformValue>>(&mut self, name: &str, value: V) -> Result<()> {
        let value = value.into();
        self.stage_one.set_uniform(name, value.clone())?;
        self.stage_two.set_uniform(name, value)
    }
}

impl FlowNode for TwoPassFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> SourceArity {
        SourceArity::Single
    }

    fn externally_stale(&self) -> bool {
        self.stage_one.externally_stale() || self.stage_two.externally_stale()
    }

    fn render(&mut self, ctx: &mut RenderContext, inputs: &[Canvas]) -> Result<()> {
        FlowNode::render(&mut self.stage_one, ctx, inputs)?;
        let intermediate = self.stage_one.backing_canvas().ok_or_else(|| {
            PrismError::RenderFailed(format!(
                "two-pass filter '{}': stage one produced no canvas",
                self.name
            ))
        })?;
        FlowNode::render(&mut self.stage_two, ctx, &[intermediate])
    }

    fn backing_canvas(&self) -> Option<Canvas> {
        self.stage_two.backing_canvas()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
