//! 更新图
//!
//! [`FlowGraph`] 持有全部节点并驱动更新协议：
//! - 节点存放在 slotmap 竞技场中，以 [`NodeKey`] 句柄引用
//! - 依赖边通过 `derive_from` / `undo_derive_from` 显式建立与拆除，
//!   建边时即校验元数与环（而不是运行期检测）
//! - `update` 自底向上传播：先更新全部上游，再按时间戳判定陈旧性，
//!   只重渲最小的脏子树
//!
//! # 确定性
//! - 依赖按声明顺序更新
//! - 一次 `update` 传播内每个节点至多访问一次（菱形拓扑中共享祖先
//!   的消费者不会被重复渲染）

use rustc_hash::FxHashSet;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::canvas::Canvas;
use crate::context::RenderContext;
use crate::errors::{PrismError, Result};

use super::node::FlowNode;
use super::timestamp::Timestamp;

new_key_type! {
    /// 图中节点的稳定句柄
    pub struct NodeKey;
}

/// 节点的图侧状态：时间戳与两个方向的边
#[derive(Debug, Default)]
struct FlowState {
    /// 仅在成功渲染的最后一步被更新
    last_changed: Timestamp,
    /// 上游源，按声明顺序
    parents: SmallVec<[NodeKey; 2]>,
    /// 下游消费者（反向边，用于拆除节点时断开连线）
    dependents: SmallVec<[NodeKey; 2]>,
}

struct Slot {
    /// 渲染期间临时取出（避免与图的可变借用冲突）
    node: Option<Box<dyn FlowNode>>,
    state: FlowState,
}

/// 更新图：节点竞技场 + 更新协议驱动器
#[derive(Default)]
pub struct FlowGraph {
    nodes: SlotMap<NodeKey, Slot>,
}

impl FlowGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// 节点数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ========================================================================
    // 节点生命周期
    // ========================================================================

    /// 加入一个节点，返回其句柄
    pub fn add_node<N: FlowNode>(&mut self, node: N) -> NodeKey {
        self.nodes.insert(Slot {
            node: Some(Box::new(node)),
            state: FlowState::default(),
        })
    }

    /// 移除节点。先断开两个方向的全部连线，再交还节点本体。
    pub fn remove_node(&mut self, key: NodeKey) -> Option<Box<dyn FlowNode>> {
        let slot = self.nodes.remove(key)?;
        for parent in &slot.state.parents {
            if let Some(p) = self.nodes.get_mut(*parent) {
                p.state.dependents.retain(|d| *d != key);
            }
        }
        for dependent in &slot.state.dependents {
            if let Some(d) = self.nodes.get_mut(*dependent) {
                d.state.parents.retain(|p| *p != key);
                log::warn!(
                    "Node removed while still feeding a dependent; downstream lost a source"
                );
            }
        }
        slot.node
    }

    // ========================================================================
    // 连线
    // ========================================================================

    /// 建立 `node` 依赖 `source` 的边。
    ///
    /// 建边时校验：句柄有效、非自环、不重复、元数允许、不成环。
    /// 任一校验失败时图保持不变。
    pub fn derive_from(&mut self, node: NodeKey, source: NodeKey) -> Result<()> {
        if !self.nodes.contains_key(source) {
            return Err(PrismError::UnknownNode);
        }
        let slot = self.nodes.get(node).ok_or(PrismError::UnknownNode)?;
        if node == source {
            return Err(PrismError::InvalidTopology(
                "a node cannot derive from itself".into(),
            ));
        }
        if slot.state.parents.contains(&source) {
            return Err(PrismError::InvalidTopology(
                "duplicate dependency edge".into(),
            ));
        }
        let behavior = slot
            .node
            .as_deref()
            .ok_or_else(|| PrismError::RenderFailed("graph re-entered during update".into()))?;
        if !behavior.arity().admits(slot.state.parents.len()) {
            return Err(PrismError::InvalidTopology(format!(
                "node '{}' does not admit another source (arity {:?}, current {})",
                behavior.name(),
                behavior.arity(),
                slot.state.parents.len()
            )));
        }
        if self.reaches(source, node) {
            return Err(PrismError::InvalidTopology(
                "edge would create a dependency cycle".into(),
            ));
        }

        self.nodes[node].state.parents.push(source);
        self.nodes[source].state.dependents.push(node);
        Ok(())
    }

    /// 拆除 `node` 依赖 `source` 的边
    pub fn undo_derive_from(&mut self, node: NodeKey, source: NodeKey) -> Result<()> {
        let slot = self.nodes.get_mut(node).ok_or(PrismError::UnknownNode)?;
        let before = slot.state.parents.len();
        slot.state.parents.retain(|p| *p != source);
        if slot.state.parents.len() == before {
            return Err(PrismError::InvalidTopology(
                "no such dependency edge".into(),
            ));
        }
        if let Some(src) = self.nodes.get_mut(source) {
            src.state.dependents.retain(|d| *d != node);
        }
        Ok(())
    }

    /// `to` 是否可以从 `from` 沿上游边到达
    fn reaches(&self, from: NodeKey, to: NodeKey) -> bool {
        let mut stack: SmallVec<[NodeKey; 8]> = SmallVec::new();
        let mut seen = FxHashSet::default();
        stack.push(from);
        seen.insert(from);
        while let Some(k) = stack.pop() {
            if k == to {
                return true;
            }
            if let Some(slot) = self.nodes.get(k) {
                for p in &slot.state.parents {
                    if seen.insert(*p) {
                        stack.push(*p);
                    }
                }
            }
        }
        false
    }

    // ========================================================================
    // 访问
    // ========================================================================

    /// 节点最近一次成功渲染的时间戳
    #[must_use]
    pub fn last_changed(&self, key: NodeKey) -> Option<Timestamp> {
        self.nodes.get(key).map(|s| s.state.last_changed)
    }

    /// 节点的上游句柄，按声明顺序
    #[must_use]
    pub fn parents(&self, key: NodeKey) -> Option<&[NodeKey]> {
        self.nodes.get(key).map(|s| s.state.parents.as_slice())
    }

    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&dyn FlowNode> {
        self.nodes.get(key).and_then(|s| s.node.as_deref())
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut dyn FlowNode> {
        self.nodes
            .get_mut(key)
            .and_then(|s| s.node.as_deref_mut())
    }

    /// 按具体类型取回节点引用
    #[must_use]
    pub fn node_as<N: FlowNode>(&self, key: NodeKey) -> Option<&N> {
        self.node(key).and_then(|n| n.as_any().downcast_ref())
    }

    /// 按具体类型取回节点可变引用
    pub fn node_as_mut<N: FlowNode>(&mut self, key: NodeKey) -> Option<&mut N> {
        self.node_mut(key)
            .and_then(|n| n.as_any_mut().downcast_mut())
    }

    /// 节点对外供给的 Canvas（已渲染过才有）
    #[must_use]
    pub fn backing_canvas(&self, key: NodeKey) -> Option<Canvas> {
        self.node(key).and_then(|n| n.backing_canvas())
    }

    // ========================================================================
    // 更新协议
    // ========================================================================

    /// 自底向上更新 `key` 及其整个上游子图。
    ///
    /// 任一上游渲染失败时立即中止并返回该错误；失败节点及其下游的
    /// 时间戳不会被触碰。没有跨帧错误记忆，下一帧重新开始。
    pub fn update(&mut self, ctx: &mut RenderContext, key: NodeKey) -> Result<()> {
        if !self.nodes.contains_key(key) {
            return Err(PrismError::UnknownNode);
        }
        for k in self.post_order(key) {
            self.update_one(ctx, k)?;
        }
        Ok(())
    }

    /// 确定性后序遍历：上游在前，每个节点至多出现一次
    fn post_order(&self, root: NodeKey) -> Vec<NodeKey> {
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        let mut stack: Vec<(NodeKey, usize)> = vec![(root, 0)];
        visited.insert(root);

        while let Some(top) = stack.last_mut() {
            let (key, next_parent) = *top;
            let parents = &self.nodes[key].state.parents;
            if next_parent < parents.len() {
                top.1 += 1;
                let parent = parents[next_parent];
                if self.nodes.contains_key(parent) && visited.insert(parent) {
                    stack.push((parent, 0));
                }
            } else {
                order.push(key);
                stack.pop();
            }
        }
        order
    }

    fn update_one(&mut self, ctx: &mut RenderContext, key: NodeKey) -> Result<()> {
        let (parents, stale) = {
            let slot = self.nodes.get(key).ok_or(PrismError::UnknownNode)?;
            let behavior = slot
                .node
                .as_deref()
                .ok_or_else(|| PrismError::RenderFailed("graph re-entered during update".into()))?;
            let newest_parent = slot
                .state
                .parents
                .iter()
                .filter_map(|p| self.nodes.get(*p))
                .map(|s| s.state.last_changed)
                .max()
                .unwrap_or(Timestamp::ZERO);
            // 外部陈旧条件与父时间戳比较是"或"关系
            let stale =
                newest_parent > slot.state.last_changed || behavior.externally_stale();
            (slot.state.parents.clone(), stale)
        };

        if !stale {
            return Ok(());
        }

        let mut inputs: SmallVec<[Canvas; 2]> = SmallVec::new();
        for p in &parents {
            let canvas = self
                .nodes
                .get(*p)
                .and_then(|s| s.node.as_deref())
                .and_then(|n| n.backing_canvas())
                .ok_or_else(|| {
                    PrismError::RenderFailed("upstream source has no backing canvas".into())
                })?;
            inputs.push(canvas);
        }

        let mut node = self.nodes[key]
            .node
            .take()
            .ok_or_else(|| PrismError::RenderFailed("graph re-entered during update".into()))?;
        let result = node.render(ctx, &inputs);
        if let Err(e) = &result {
            log::error!("Render failed in node '{}': {e}", node.name());
        }
        self.nodes[key].node = Some(node);

        result?;
        // 成功渲染的最后一步才盖时间戳
        self.nodes[key].state.last_changed = ctx.mint_timestamp();
        Ok(())
    }
}
