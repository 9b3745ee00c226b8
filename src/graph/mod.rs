//! 更新图模块
//!
//! 增量更新协议的核心：
//! - `timestamp`: 单调时间戳与铸造时钟
//! - `node`: 节点 trait 与元数策略
//! - `graph`: 节点竞技场、连线管理、自底向上的更新传播
//! - `mailbox`: 外部生产者到图线程的单槽信箱

pub mod graph;
pub mod mailbox;
pub mod node;
pub mod timestamp;

pub use graph::{FlowGraph, NodeKey};
pub use mailbox::FrameMailbox;
pub use node::{FlowNode, SourceArity};
pub use timestamp::{FrameClock, Timestamp};
