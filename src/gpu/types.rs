//! GPU 值模型
//!
//! 核心概念：
//! - `CanvasSize` / `PixelFormat`: 图像资源的尺寸与基础像素格式
//! - `TextureParams`: 采样参数（过滤、环绕），绑定时惰性下发
//! - `GpuType`: 着色器符号的类型标签（标量/向量/矩阵/采样器）
//! - `UniformValue`: 按名称赋值时携带的装箱值，类型在链接后校验
//! - `SymbolInfo`: 链接后从程序对象查询到的符号元数据

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

/// 图像资源尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 像素总数
    #[inline]
    #[must_use]
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// 基础像素格式
///
/// 对应 OpenGL 风格的 base internal format。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    #[default]
    Rgba8,
    Rgb8,
    Luminance8,
}

impl PixelFormat {
    /// 每像素字节数
    #[inline]
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Luminance8 => 1,
        }
    }
}

/// 纹理过滤方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// 纹理环绕方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

/// 采样参数集合
///
/// 通过共享的 Canvas 句柄可随时修改，在下一次绑定时下发到 GPU。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureParams {
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            wrap_s: TextureWrap::ClampToEdge,
            wrap_t: TextureWrap::ClampToEdge,
        }
    }
}

/// 着色器符号的 GPU 类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2d,
}

impl GpuType {
    /// 单个元素的分量数（矩阵按列展开计数）
    #[must_use]
    pub fn component_count(self) -> usize {
        match self {
            GpuType::Float | GpuType::Int | GpuType::Sampler2d => 1,
            GpuType::Vec2 => 2,
            GpuType::Vec3 => 3,
            GpuType::Mat2 | GpuType::Vec4 => 4,
            GpuType::Mat3 => 9,
            GpuType::Mat4 => 16,
        }
    }

    /// GLSL 中的类型关键字
    #[must_use]
    pub fn glsl_name(self) -> &'static str {
        match self {
            GpuType::Float => "float",
            GpuType::Int => "int",
            GpuType::Vec2 => "vec2",
            GpuType::Vec3 => "vec3",
            GpuType::Vec4 => "vec4",
            GpuType::Mat2 => "mat2",
            GpuType::Mat3 => "mat3",
            GpuType::Mat4 => "mat4",
            GpuType::Sampler2d => "sampler2D",
        }
    }
}

/// 符号归属：uniform 或顶点属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolSlot {
    Uniform,
    Attribute,
}

/// 链接后从程序对象查询到的活跃符号元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: String,
    pub slot: SymbolSlot,
    pub gpu_type: GpuType,
    /// 数组长度，非数组为 1
    pub count: u32,
    pub location: u32,
}

/// 按名称赋给程序符号的装箱值
///
/// 调用方不需要预先知道 GPU 类型；形状校验发生在链接后的首次 `use` 时。
/// `Floats` 是数组 uniform（例如卷积核权重）的原始形式，按总分量数匹配。
/// `Sampler` 只在下发阶段产生，携带分配到的纹理单元号。
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
    Floats(Vec<f32>),
    Sampler(u32),
}

impl UniformValue {
    /// 值的形状是否与程序声明的 (类型, 数组长度) 匹配
    #[must_use]
    pub fn matches(&self, gpu_type: GpuType, count: u32) -> bool {
        match self {
            UniformValue::Float(_) => gpu_type == GpuType::Float && count == 1,
            UniformValue::Int(_) => gpu_type == GpuType::Int && count == 1,
            UniformValue::Vec2(_) => gpu_type == GpuType::Vec2 && count == 1,
            UniformValue::Vec3(_) => gpu_type == GpuType::Vec3 && count == 1,
            UniformValue::Vec4(_) => gpu_type == GpuType::Vec4 && count == 1,
            UniformValue::Mat2(_) => gpu_type == GpuType::Mat2 && count == 1,
            UniformValue::Mat3(_) => gpu_type == GpuType::Mat3 && count == 1,
            UniformValue::Mat4(_) => gpu_type == GpuType::Mat4 && count == 1,
            // 原始浮点数组按总分量数匹配任意浮点形状
            UniformValue::Floats(v) => {
                gpu_type != GpuType::Int
                    && gpu_type != GpuType::Sampler2d
                    && v.len() == gpu_type.component_count() * count as usize
            }
            UniformValue::Sampler(_) => gpu_type == GpuType::Sampler2d && count == 1,
        }
    }

    /// 形状描述，用于 TypeMismatch 报错信息
    #[must_use]
    pub fn shape_name(&self) -> String {
        match self {
            UniformValue::Float(_) => "float".into(),
            UniformValue::Int(_) => "int".into(),
            UniformValue::Vec2(_) => "vec2".into(),
            UniformValue::Vec3(_) => "vec3".into(),
            UniformValue::Vec4(_) => "vec4".into(),
            UniformValue::Mat2(_) => "mat2".into(),
            UniformValue::Mat3(_) => "mat3".into(),
            UniformValue::Mat4(_) => "mat4".into(),
            UniformValue::Floats(v) => format!("float[{}]", v.len()),
            UniformValue::Sampler(_) => "sampler2D".into(),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat2> for UniformValue {
    fn from(v: Mat2) -> Self {
        UniformValue::Mat2(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<Vec<f32>> for UniformValue {
    fn from(v: Vec<f32>) -> Self {
        UniformValue::Floats(v)
    }
}

impl From<&[f32]> for UniformValue {
    fn from(v: &[f32]) -> Self {
        UniformValue::Floats(v.to_vec())
    }
}
