//! Canvas 资源句柄
//!
//! 核心概念：
//! - [`Canvas`]: 对一份物理 GPU 图像资源（纹理或渲染缓冲）的共享句柄，
//!   附带按需创建的帧缓冲。包装的意义在于底层缓冲的可共享性，
//!   以及在无人引用时确定性地释放 GPU 内存
//! - [`CanvasSpec`]: "Canvas 的规格说明"：尺寸/格式可以暂缺，
//!   由 `adopt_parameters_from` 从输入补全后再实际分配
//! - [`TextureUnitTracker`]: 纹理单元绑定缓存（见 `texture_unit`）
//!
//! # 共享规则
//! 多个节点可以持有同一个 Canvas 的句柄，但一帧之内至多一个写入者；
//! 这由图拓扑在结构上保证，Canvas 本身不做运行期检查。

pub mod texture_unit;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use glam::Vec4;

use crate::context::RenderContext;
use crate::errors::{PrismError, Result};
use crate::gpu::{
    CanvasSize, FramebufferId, GpuContext, PixelFormat, RenderbufferId, TextureFilter, TextureId,
    TextureParams, TextureWrap,
};

pub use texture_unit::TextureUnitTracker;

/// 底层资源种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanvasKind {
    /// 可采样的纹理（绝大多数中间结果）
    #[default]
    Texture,
    /// 渲染缓冲（仅作为渲染目标，不可采样）
    Renderbuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backing {
    Texture(TextureId),
    Renderbuffer(RenderbufferId),
}

struct CanvasInner {
    gpu: Rc<dyn GpuContext>,
    backing: Backing,
    size: CanvasSize,
    format: PixelFormat,
    /// 帧缓冲按需创建
    framebuffer: Cell<Option<FramebufferId>>,
    params: Cell<TextureParams>,
    /// 采样参数改动后置位，下一次绑定时下发
    params_dirty: Cell<bool>,
    /// 释放是幂等的：GPU 句柄恰好归还一次
    released: Cell<bool>,
}

impl CanvasInner {
    fn release(&self) {
        if self.released.replace(true) {
            return;
        }
        if let Some(fbo) = self.framebuffer.take() {
            self.gpu.delete_framebuffer(fbo);
        }
        match self.backing {
            Backing::Texture(t) => self.gpu.delete_texture(t),
            Backing::Renderbuffer(r) => self.gpu.delete_renderbuffer(r),
        }
    }
}

impl Drop for CanvasInner {
    fn drop(&mut self) {
        self.release();
    }
}

/// GPU 图像资源的共享句柄
#[derive(Clone)]
pub struct Canvas {
    inner: Rc<CanvasInner>,
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("backing", &self.inner.backing)
            .field("size", &self.inner.size)
            .field("format", &self.inner.format)
            .field("refs", &Rc::strong_count(&self.inner))
            .finish()
    }
}

impl Canvas {
    /// 分配一个纹理后端的 Canvas
    pub fn allocate(ctx: &RenderContext, size: CanvasSize, format: PixelFormat) -> Result<Canvas> {
        Self::allocate_with(ctx, size, format, CanvasKind::Texture, TextureParams::default())
    }

    /// 分配一个渲染缓冲后端的 Canvas（不可采样）
    pub fn allocate_renderbuffer(
        ctx: &RenderContext,
        size: CanvasSize,
        format: PixelFormat,
    ) -> Result<Canvas> {
        Self::allocate_with(
            ctx,
            size,
            format,
            CanvasKind::Renderbuffer,
            TextureParams::default(),
        )
    }

    /// 按完整参数分配
    pub fn allocate_with(
        ctx: &RenderContext,
        size: CanvasSize,
        format: PixelFormat,
        kind: CanvasKind,
        params: TextureParams,
    ) -> Result<Canvas> {
        if size.is_empty() {
            return Err(PrismError::OutOfResources(
                "cannot allocate a zero-sized canvas".into(),
            ));
        }
        let gpu = Rc::clone(ctx.gpu());
        let backing = match kind {
            CanvasKind::Texture => {
                let t = gpu.create_texture(size, format)?;
                gpu.set_texture_params(t, params);
                Backing::Texture(t)
            }
            CanvasKind::Renderbuffer => Backing::Renderbuffer(gpu.create_renderbuffer(size, format)?),
        };
        Ok(Canvas {
            inner: Rc::new(CanvasInner {
                gpu,
                backing,
                size,
                format,
                framebuffer: Cell::new(None),
                params: Cell::new(params),
                params_dirty: Cell::new(false),
                released: Cell::new(false),
            }),
        })
    }

    // ========================================================================
    // 属性
    // ========================================================================

    #[must_use]
    pub fn kind(&self) -> CanvasKind {
        match self.inner.backing {
            Backing::Texture(_) => CanvasKind::Texture,
            Backing::Renderbuffer(_) => CanvasKind::Renderbuffer,
        }
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> CanvasSize {
        self.inner.size
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.inner.format
    }

    /// 纹理句柄；渲染缓冲后端返回 None
    #[must_use]
    pub fn texture(&self) -> Option<TextureId> {
        match self.inner.backing {
            Backing::Texture(t) => Some(t),
            Backing::Renderbuffer(_) => None,
        }
    }

    /// 当前存活的句柄数
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// 是否仍持有 GPU 资源
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.inner.released.get()
    }

    // ========================================================================
    // 采样参数（调用方可调整，不得直接改像素内容）
    // ========================================================================

    #[must_use]
    pub fn params(&self) -> TextureParams {
        self.inner.params.get()
    }

    pub fn set_params(&self, params: TextureParams) {
        if self.inner.params.replace(params) != params {
            self.inner.params_dirty.set(true);
        }
    }

    /// 同时设置 min/mag 过滤
    pub fn set_filter(&self, filter: TextureFilter) {
        let mut p = self.inner.params.get();
        p.min_filter = filter;
        p.mag_filter = filter;
        self.set_params(p);
    }

    /// 同时设置 s/t 环绕
    pub fn set_wrap(&self, wrap: TextureWrap) {
        let mut p = self.inner.params.get();
        p.wrap_s = wrap;
        p.wrap_t = wrap;
        self.set_params(p);
    }

    /// 取走并清除参数脏标记（绑定路径专用）
    pub(crate) fn take_params_dirty(&self) -> bool {
        self.inner.params_dirty.replace(false)
    }

    // ========================================================================
    // 渲染目标
    // ========================================================================

    /// 把本 Canvas 的帧缓冲设为当前渲染目标（按需创建帧缓冲）
    pub fn bind_as_framebuffer(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.released.get() {
            return Err(PrismError::RenderFailed(
                "bind of a released canvas".into(),
            ));
        }
        let fbo = match inner.framebuffer.get() {
            Some(fbo) => fbo,
            None => {
                let fbo = inner.gpu.create_framebuffer()?;
                let attach = match inner.backing {
                    Backing::Texture(t) => inner.gpu.attach_texture(fbo, t),
                    Backing::Renderbuffer(r) => inner.gpu.attach_renderbuffer(fbo, r),
                };
                if let Err(e) = attach {
                    inner.gpu.delete_framebuffer(fbo);
                    return Err(e);
                }
                inner.framebuffer.set(Some(fbo));
                fbo
            }
        };
        inner.gpu.bind_framebuffer(Some(fbo));
        inner.gpu.set_viewport(inner.size);
        Ok(())
    }

    /// 清空本 Canvas（隐式绑定为渲染目标）
    pub fn clear(&self, color: Vec4) -> Result<()> {
        self.bind_as_framebuffer()?;
        self.inner.gpu.clear(color);
        Ok(())
    }

    /// 上传像素数据（仅纹理后端）
    pub fn upload(&self, pixels: &[u8]) -> Result<()> {
        if self.inner.released.get() {
            return Err(PrismError::RenderFailed(
                "upload to a released canvas".into(),
            ));
        }
        match self.inner.backing {
            Backing::Texture(t) => {
                self.inner
                    .gpu
                    .upload_texture(t, self.inner.size, self.inner.format, pixels)
            }
            Backing::Renderbuffer(_) => Err(PrismError::RenderFailed(
                "cannot upload pixels into a renderbuffer-backed canvas".into(),
            )),
        }
    }

    /// 从本 Canvas 读回像素（隐式绑定为渲染目标）
    pub fn read_pixels(&self) -> Result<Vec<u8>> {
        self.bind_as_framebuffer()?;
        self.inner.gpu.read_pixels(self.inner.size, self.inner.format)
    }

    /// 显式归还 GPU 资源。幂等；其余句柄此后不可再使用本 Canvas。
    pub fn release(&self) {
        self.inner.release();
    }
}

// ============================================================================
// CanvasSpec
// ============================================================================

/// Canvas 的规格说明：尺寸/格式可以暂缺。
///
/// 滤镜用它表达"我的输出跟输入一样大"而无须写死尺寸：渲染前先
/// `adopt_parameters_from` 输入，再 `realize` 成真正的 Canvas。
#[derive(Debug, Clone, Default)]
pub struct CanvasSpec {
    pub size: Option<CanvasSize>,
    pub format: Option<PixelFormat>,
    pub kind: CanvasKind,
    pub params: TextureParams,
}

impl CanvasSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 仅在自身尺寸/格式仍未指定时从 `other` 采纳；绝不覆盖已指定的值
    pub fn adopt_parameters_from(&mut self, other: &Canvas) {
        if self.size.is_none() {
            self.size = Some(other.size());
        }
        if self.format.is_none() {
            self.format = Some(other.format());
        }
    }

    /// 规格是否已经完整（可以分配）
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.size.is_some() && self.format.is_some()
    }

    /// 已分配的 Canvas 是否仍符合本规格
    #[must_use]
    pub fn matches(&self, canvas: &Canvas) -> bool {
        self.size == Some(canvas.size())
            && self.format == Some(canvas.format())
            && self.kind == canvas.kind()
    }

    /// 按本规格分配一个 Canvas
    pub fn realize(&self, ctx: &RenderContext) -> Result<Canvas> {
        let size = self.size.ok_or_else(|| {
            PrismError::RenderFailed("canvas specification has no size".into())
        })?;
        let format = self.format.unwrap_or_default();
        Canvas::allocate_with(ctx, size, format, self.kind, self.params)
    }
}
