//! GPU 上下文抽象
//!
//! [`GpuContext`] 是引擎面向立即模式图形 API 的最小抽象面：
//! 图像资源、帧缓冲、纹理单元、着色器程序与标准四边形绘制。
//! 引擎核心只依赖这个 trait，不绑定任何具体硬件 API。
//!
//! 所有方法接收 `&self`：底层图形 API 本身就是一个带内部状态的句柄
//! （参考 glow 的 `HasContext`），实现方自行处理内部可变性。
//! 线程亲和性由调用方保证：整个图在拥有 GPU 上下文的执行环境上
//! 单线程同步执行。

use glam::Vec4;

use crate::errors::Result;

use super::types::{CanvasSize, PixelFormat, SymbolInfo, TextureParams, UniformValue};

/// 纹理对象句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// 渲染缓冲对象句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderbufferId(pub u32);

/// 帧缓冲对象句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

/// 程序对象句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// 立即模式 GPU 上下文
pub trait GpuContext {
    // ========================================================================
    // 能力查询
    // ========================================================================

    /// 硬件纹理单元数量
    fn max_texture_units(&self) -> u32;

    /// 单边最大纹理尺寸
    fn max_texture_size(&self) -> u32;

    // ========================================================================
    // 图像资源
    // ========================================================================

    /// 分配一个纹理，失败返回 `OutOfResources`
    fn create_texture(&self, size: CanvasSize, format: PixelFormat) -> Result<TextureId>;

    fn delete_texture(&self, texture: TextureId);

    /// 将像素数据上传到纹理（完整替换）
    fn upload_texture(
        &self,
        texture: TextureId,
        size: CanvasSize,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<()>;

    /// 下发采样参数到纹理对象
    fn set_texture_params(&self, texture: TextureId, params: TextureParams);

    /// 分配一个渲染缓冲，失败返回 `OutOfResources`
    fn create_renderbuffer(&self, size: CanvasSize, format: PixelFormat) -> Result<RenderbufferId>;

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferId);

    // ========================================================================
    // 帧缓冲
    // ========================================================================

    fn create_framebuffer(&self) -> Result<FramebufferId>;

    fn delete_framebuffer(&self, framebuffer: FramebufferId);

    /// 把纹理附着为颜色目标，并校验帧缓冲完整性
    fn attach_texture(&self, framebuffer: FramebufferId, texture: TextureId) -> Result<()>;

    fn attach_renderbuffer(
        &self,
        framebuffer: FramebufferId,
        renderbuffer: RenderbufferId,
    ) -> Result<()>;

    /// 绑定渲染目标；`None` 表示回到默认帧缓冲
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>);

    fn set_viewport(&self, size: CanvasSize);

    /// 清空当前绑定的帧缓冲
    fn clear(&self, color: Vec4);

    /// 从当前绑定的帧缓冲读回像素
    fn read_pixels(&self, size: CanvasSize, format: PixelFormat) -> Result<Vec<u8>>;

    // ========================================================================
    // 纹理单元
    // ========================================================================

    /// 激活指定纹理单元
    fn select_texture_unit(&self, unit: u32);

    /// 将纹理绑定到当前激活的单元
    fn bind_texture(&self, texture: TextureId);

    // ========================================================================
    // 着色器程序
    // ========================================================================

    /// 编译并链接一对顶点/片段着色器。
    /// 编译或链接失败时错误携带编译器日志。
    fn compile_program(&self, vertex: &str, fragment: &str) -> Result<ProgramId>;

    fn delete_program(&self, program: ProgramId);

    fn use_program(&self, program: ProgramId);

    /// 枚举链接后程序中活跃的 uniform 与顶点属性
    fn active_symbols(&self, program: ProgramId) -> Vec<SymbolInfo>;

    /// 向当前程序的指定位置写入 uniform 值（值已通过形状校验）
    fn set_uniform(&self, location: u32, value: &UniformValue);

    /// 设置顶点属性数据（每顶点 `components` 个分量）
    fn set_attribute(&self, location: u32, components: u32, data: &[f32]);

    /// 以三角带方式绘制标准的双三角形全画布四边形
    fn draw_quad(&self);
}
