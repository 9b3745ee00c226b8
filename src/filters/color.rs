//! 颜色调整滤镜
//!
//! 每个构造函数返回一个已配好着色器与默认参数的 [`Filter`]；
//! 参数随后可用 `set_uniform` 按名调整。

use std::rc::Rc;

use glam::Mat4;

use crate::filter::Filter;
use crate::gpu::GpuContext;

const BRIGHTNESS_FRAGMENT_SHADER: &str = "\
varying highp vec2 textureCoordinate;

uniform sampler2D inputImage;
uniform lowp float brightness;

void main()
{
    lowp vec4 color = texture2D(inputImage, textureCoordinate);
    gl_FragColor = vec4(color.rgb + vec3(brightness), color.a);
}
";

const CONTRAST_FRAGMENT_SHADER: &str = "\
varying highp vec2 textureCoordinate;

uniform sampler2D inputImage;
uniform lowp float contrast;

void main()
{
    lowp vec4 color = texture2D(inputImage, textureCoordinate);
    gl_FragColor = vec4((color.rgb - vec3(0.5)) * contrast + vec3(0.5), color.a);
}
";

const SATURATION_FRAGMENT_SHADER: &str = "\
varying highp vec2 textureCoordinate;

uniform sampler2D inputImage;
uniform lowp float saturation;

const mediump vec3 luminanceWeighting = vec3(0.2125, 0.7154, 0.0721);

void main()
{
    lowp vec4 color = texture2D(inputImage, textureCoordinate);
    lowp float luminance = dot(color.rgb, luminanceWeighting);
    gl_FragColor = vec4(mix(vec3(luminance), color.rgb, saturation), color.a);
}
";

const GAMMA_FRAGMENT_SHADER: &str = "\
varying highp vec2 textureCoordinate;

uniform sampler2D inputImage;
uniform lowp float gamma;

void main()
{
    lowp vec4 color = texture2D(inputImage, textureCoordinate);
    gl_FragColor = vec4(pow(color.rgb, vec3(gamma)), color.a);
}
";

const COLOR_MATRIX_FRAGMENT_SHADER: &str = "\
varying highp vec2 textureCoordinate;

uniform sampler2D inputImage;
uniform lowp mat4 colorMatrix;
uniform lowp float intensity;

void main()
{
    lowp vec4 color = texture2D(inputImage, textureCoordinate);
    lowp vec4 outputColor = color * colorMatrix;
    gl_FragColor = (intensity * outputColor) + ((1.0 - intensity) * color);
}
";

/// 亮度调整。`brightness` 范围 -1.0 ~ 1.0，0.0 为原图。
pub fn brightness(gpu: &Rc<dyn GpuContext>) -> Filter {
    let mut f = Filter::with_fragment(gpu, "brightness", BRIGHTNESS_FRAGMENT_SHADER);
    f.set_uniform("brightness", 0.0f32).expect("Failed to set default uniform");
    f
}

/// 对比度调整。`contrast` 范围 0.0 ~ 4.0，1.0 为原图。
pub fn contrast(gpu: &Rc<dyn GpuContext>) -> Filter {
    let mut f = Filter::with_fragment(gpu, "contrast", CONTRAST_FRAGMENT_SHADER);
    f.set_uniform("contrast", 1.0f32).expect("Failed to set default uniform");
    f
}

/// 饱和度调整。`saturation` 范围 0.0 ~ 2.0，1.0 为原图。
pub fn saturation(gpu: &Rc<dyn GpuContext>) -> Filter {
    let mut f = Filter::with_fragment(gpu, "saturation", SATURATION_FRAGMENT_SHADER);
    f.set_uniform("saturation", 1.0f32).expect("Failed to set default uniform");
    f
}

/// 伽马调整。`gamma` 范围 0.0 ~ 3.0，1.0 为原图。
pub fn gamma(gpu: &Rc<dyn GpuContext>) -> Filter {
    let mut f = Filter::with_fragment(gpu, "gamma", GAMMA_FRAGMENT_SHADER);
    f.set_uniform("gamma", 1.0f32).expect("Failed to set default uniform");
    f
}

/// 4x4 颜色矩阵变换。`colorMatrix` 为变换矩阵，
/// `intensity` 控制与原图的混合程度。
pub fn color_matrix(gpu: &Rc<dyn GpuContext>) -> Filter {
    let mut f = Filter::with_fragment(gpu, "color_matrix", COLOR_MATRIX_FRAGMENT_SHADER);
    f.set_uniform("colorMatrix", Mat4::IDENTITY)
        .expect("Failed to set default uniform");
    f.set_uniform("intensity", 1.0f32).expect("Failed to set default uniform");
    f
}
