//! 滤镜节点
//!
//! [`Filter`] 是最常用的图节点：恰好持有一个 [`Program`] 与一个主输出
//! Canvas。`render` 的默认流程：从第一个输入采纳输出尺寸（仅当自身
//! 未指定时）→ 按需分配输出 Canvas → 绑定为渲染目标 → 把各输入按
//! 位置绑到标准采样器名上 → 标准四边形绘制。
//!
//! 滤镜的具体数学（着色器源与参数）完全由构造方提供，核心不感知；
//! 参数通过 `set_uniform` 的具名赋值面向外暴露。

pub mod pipeline;
pub mod two_pass;

use std::any::Any;
use std::rc::Rc;

use glam::Vec4;

use crate::canvas::{Canvas, CanvasSpec};
use crate::context::RenderContext;
use crate::errors::{PrismError, Result};
use crate::gpu::{GpuContext, UniformValue};
use crate::graph::{FlowNode, SourceArity};
use crate::program::{
    Program, Rotation, UNIFORM_AUXILIARY_IMAGE, UNIFORM_INPUT_IMAGE,
};

pub use pipeline::FilterPipeline;
pub use two_pass::TwoPassFilter;

/// 标准直通顶点着色器
pub const STANDARD_VERTEX_SHADER: &str = "\
attribute vec4 position;
attribute vec4 inputTextureCoordinate;

varying vec2 textureCoordinate;

void main()
{
    gl_Position = position;
    textureCoordinate = inputTextureCoordinate.xy;
}
";

/// 标准直通片段着色器
pub const PASSTHROUGH_FRAGMENT_SHADER: &str = "\
varying highp vec2 textureCoordinate;

uniform sampler2D inputImage;

void main()
{
    gl_FragColor = texture2D(inputImage, textureCoordinate);
}
";

/// 输入按位置绑定到的标准采样器名
const INPUT_SAMPLER_NAMES: [&str; 2] = [UNIFORM_INPUT_IMAGE, UNIFORM_AUXILIARY_IMAGE];

/// 单程序滤镜节点
pub struct Filter {
    name: String,
    program: Program,
    output_spec: CanvasSpec,
    output: Option<Canvas>,
    rotation: Rotation,
    /// 绘制前的可选清屏色（滤镜通常整幅覆盖，默认不清）
    clear_color: Option<Vec4>,
}

impl Filter {
    /// 用给定的顶点/片段着色器构造滤镜
    #[must_use]
    pub fn new(gpu: &Rc<dyn GpuContext>, name: &str, vertex: &str, fragment: &str) -> Self {
        Self {
            name: name.to_string(),
            program: Program::with_source(Rc::clone(gpu), vertex, fragment),
            output_spec: CanvasSpec::new(),
            output: None,
            rotation: Rotation::default(),
            clear_color: None,
        }
    }

    /// 标准顶点着色器 + 给定片段着色器
    #[must_use]
    pub fn with_fragment(gpu: &Rc<dyn GpuContext>, name: &str, fragment: &str) -> Self {
        Self::new(gpu, name, STANDARD_VERTEX_SHADER, fragment)
    }

    /// 直通滤镜
    #[must_use]
    pub fn passthrough(gpu: &Rc<dyn GpuContext>, name: &str) -> Self {
        Self::with_fragment(gpu, name, PASSTHROUGH_FRAGMENT_SHADER)
    }

    // ========================================================================
    // 参数面
    // ========================================================================

    /// 具名参数赋值（透传到程序符号表）
    pub fn set_uniform<V: Into<UniformValue>>(&mut self, name: &str, value: V) -> Result<()> {
        self.program.set_uniform(name, value)
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    #[must_use]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    pub fn set_clear_color(&mut self, color: Option<Vec4>) {
        self.clear_color = color;
    }

    /// 输出规格；可在首次渲染前显式指定尺寸/格式
    pub fn output_spec_mut(&mut self) -> &mut CanvasSpec {
        &mut self.output_spec
    }

    /// 确保输出 Canvas 存在且符合规格
    fn ensure_output(&mut self, ctx: &RenderContext, inputs: &[Canvas]) -> Result<Canvas> {
        if let Some(first) = inputs.first() {
            self.output_spec.adopt_parameters_from(first);
        }
        if let Some(out) = &self.output {
            if self.output_spec.matches(out) {
                return Ok(out.clone());
            }
            log::debug!("Filter '{}' output respecified, reallocating", self.name);
        }
        let canvas = self.output_spec.realize(ctx)?;
        self.output = Some(canvas.clone());
        Ok(canvas)
    }
}

impl FlowNode for Filter {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> SourceArity {
        SourceArity::Many
    }

    fn externally_stale(&self) -> bool {
        // 参数改过（有待下发的符号）也要求重渲，与父时间戳比较互不排斥
        self.program.has_dirty_symbols()
    }

    fn render(&mut self, ctx: &mut RenderContext, inputs: &[Canvas]) -> Result<()> {
        if inputs.len() > INPUT_SAMPLER_NAMES.len() {
            return Err(PrismError::RenderFailed(format!(
                "filter '{}' accepts at most {} inputs, got {}",
                self.name,
                INPUT_SAMPLER_NAMES.len(),
                inputs.len()
            )));
        }
        let output = self.ensure_output(ctx, inputs)?;
        output.bind_as_framebuffer()?;
        if let Some(color) = self.clear_color {
            ctx.gpu().clear(color);
        }
        for (i, input) in inputs.iter().enumerate() {
            self.program.set_input_canvas(INPUT_SAMPLER_NAMES[i], input)?;
        }
        self.program.draw(ctx, self.rotation)
    }

    fn backing_canvas(&self) -> Option<Canvas> {
        self.output.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
