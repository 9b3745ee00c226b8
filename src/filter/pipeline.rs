//! 滤镜流水线
//!
//! [`FilterPipeline`] 把一串一进一出的滤镜包装成单个图节点，
//! 行为与普通滤镜完全一致：`render` 把每个滤镜的输出接成下一个
//! 滤镜的输入，节点对外供给最后一个滤镜的 Canvas。除正确接线外
//! 不需要任何额外算法；陈旧性判定仍由标准更新协议完成。
//!
//! `filters_mut` 返回可变列表，调用方可以自由增删滤镜；
//! 空流水线无法渲染（没有可供给的输出）。

use std::any::Any;

use crate::canvas::Canvas;
use crate::context::RenderContext;
use crate::errors::{PrismError, Result};
use crate::graph::{FlowNode, SourceArity};

use super::Filter;

/// 一进一出滤镜的有序串联
pub struct FilterPipeline {
    name: String,
    filters: Vec<Filter>,
}

impl FilterPipeline {
    #[must_use]
    pub fn new(name: &str, filters: Vec<Filter>) -> Self {
        Self {
            name: name.to_string(),
            filters,
        }
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// 可变滤镜列表；可以自由增删
    pub fn filters_mut(&mut self) -> &mut Vec<Filter> {
        &mut self.filters
    }
}

impl FlowNode for FilterPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> SourceArity {
        SourceArity::Single
    }

    fn externally_stale(&self) -> bool {
        self.filters.iter().any(FlowNode::externally_stale)
    }

    fn render(&mut self, ctx: &mut RenderContext, inputs: &[Canvas]) -> Result<()> {
        if self.filters.is_empty() {
            return Err(PrismError::RenderFailed(format!(
                "pipeline '{}' has no filters",
                self.name
            )));
        }
        let mut current: Vec<Canvas> = inputs.to_vec();
        for filter in &mut self.filters {
            FlowNode::render(filter, ctx, &current)?;
            let out = filter.backing_canvas().ok_or_else(|| {
                PrismError::RenderFailed(format!(
                    "pipeline '{}': filter '{}' produced no canvas",
                    self.name,
                    filter.name()
                ))
            })?;
            current = vec![out];
        }
        Ok(())
    }

    fn backing_canvas(&self) -> Option<Canvas> {
        self.filters.last().and_then(Filter::backing_canvas)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
