//! 图节点 Trait
//!
//! 定义更新图中节点的抽象接口。
//! 每个节点消费上游的 Canvas，可选地经过着色器变换后向下游发布新的 Canvas。
//!
//! # 设计原则
//! - 时间戳与依赖边由 [`FlowGraph`](super::FlowGraph) 统一管理，节点只实现行为
//! - `render` 通过显式传入的 `RenderContext` 访问 GPU，不依赖任何全局状态
//! - "渲染"的含义是"使自身变为最新"，不一定涉及实际绘制
//!
//! # 元数（arity）
//! 每种节点类型声明自己接受几个上游源；连线时由图在建边阶段校验，
//! 而不是在运行期靠鸭子类型约定。

use std::any::Any;

use crate::canvas::Canvas;
use crate::context::RenderContext;
use crate::errors::Result;

/// 节点接受的上游源数量策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceArity {
    /// 纯源节点，不接受任何上游（例如外部图像输入）
    None,
    /// 恰好一个上游源
    Single,
    /// 任意多个上游源（多输入滤镜）
    Many,
}

impl SourceArity {
    /// 再接入一个上游后是否仍然合法
    #[must_use]
    pub fn admits(self, current_parents: usize) -> bool {
        match self {
            SourceArity::None => false,
            SourceArity::Single => current_parents == 0,
            SourceArity::Many => true,
        }
    }
}

/// 图节点 Trait
///
/// 所有参与更新传播的节点必须实现此接口。
pub trait FlowNode: Any {
    /// 节点名称，用于调试与日志
    fn name(&self) -> &str;

    /// 本节点类型的上游元数策略
    fn arity(&self) -> SourceArity;

    /// 外部陈旧条件（与父节点时间戳比较是"或"的关系，不是替代）。
    ///
    /// 例如包装外部图像的节点在"上次渲染后又被赋了新图"时返回 true。
    fn externally_stale(&self) -> bool {
        false
    }

    /// 使自身变为最新。`inputs` 按依赖声明顺序给出各上游的 Canvas。
    ///
    /// 只能由 `FlowGraph::update` 调用，客户端不要直接调用。
    fn render(&mut self, ctx: &mut RenderContext, inputs: &[Canvas]) -> Result<()>;

    /// 本节点对外供给的图像资源；尚未渲染过时可以为 None
    fn backing_canvas(&self) -> Option<Canvas>;

    // 通过 Any 支持从图中按具体类型取回节点
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
