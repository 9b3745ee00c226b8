//! GPU 抽象层
//!
//! 引擎核心面向 [`GpuContext`] trait 编程，不绑定具体硬件 API：
//! - `context`: 上下文 trait 与资源句柄类型
//! - `types`: 尺寸/格式/采样参数/符号类型/uniform 值模型
//! - `headless`: 纯内存参考实现（测试与诊断用）

pub mod context;
pub mod headless;
pub mod types;

pub use context::{FramebufferId, GpuContext, ProgramId, RenderbufferId, TextureId};
pub use headless::{DrawRecord, HeadlessContext};
pub use types::{
    CanvasSize, GpuType, PixelFormat, SymbolInfo, SymbolSlot, TextureFilter, TextureParams,
    TextureWrap, UniformValue,
};
