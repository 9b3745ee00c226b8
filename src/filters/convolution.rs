//! 3x3 卷积滤镜
//!
//! 卷积核是作用于像素及其 8 邻域的 3x3 矩阵，按行主序指定，
//! 左上为 [0][0]。核元素之和不为 1.0 时图像会变亮或变暗。

use std::rc::Rc;

use glam::Mat3;

use crate::errors::Result;
use crate::filter::Filter;
use crate::gpu::{CanvasSize, GpuContext};

const CONVOLUTION_3X3_FRAGMENT_SHADER: &str = "\
varying highp vec2 textureCoordinate;

uniform sampler2D inputImage;
uniform highp float texelWidth;
uniform highp float texelHeight;
uniform mediump mat3 convolutionKernel;

void main()
{
    highp vec2 offset = vec2(texelWidth, texelHeight);

    mediump vec4 sum = vec4(0.0);
    sum += texture2D(inputImage, textureCoordinate + vec2(-offset.x, -offset.y)) * convolutionKernel[0][0];
    sum += texture2D(inputImage, textureCoordinate + vec2(0.0, -offset.y)) * convolutionKernel[0][1];
    sum += texture2D(inputImage, textureCoordinate + vec2(offset.x, -offset.y)) * convolutionKernel[0][2];
    sum += texture2D(inputImage, textureCoordinate + vec2(-offset.x, 0.0)) * convolutionKernel[1][0];
    sum += texture2D(inputImage, textureCoordinate) * convolutionKernel[1][1];
    sum += texture2D(inputImage, textureCoordinate + vec2(offset.x, 0.0)) * convolutionKernel[1][2];
    sum += texture2D(inputImage, textureCoordinate + vec2(-offset.x, offset.y)) * convolutionKernel[2][0];
    sum += texture2D(inputImage, textureCoordinate + vec2(0.0, offset.y)) * convolutionKernel[2][1];
    sum += texture2D(inputImage, textureCoordinate + vec2(offset.x, offset.y)) * convolutionKernel[2][2];

    gl_FragColor = vec4(sum.rgb, texture2D(inputImage, textureCoordinate).a);
}
";

/// 3x3 卷积。默认核为恒等；`convolutionKernel` 按名赋 Mat3 可改。
pub fn convolution_3x3(gpu: &Rc<dyn GpuContext>) -> Filter {
    let mut f = Filter::with_fragment(gpu, "convolution_3x3", CONVOLUTION_3X3_FRAGMENT_SHADER);
    f.set_uniform("convolutionKernel", Mat3::IDENTITY)
        .expect("Failed to set default uniform");
    f.set_uniform("texelWidth", 0.0f32)
        .expect("Failed to set default uniform");
    f.set_uniform("texelHeight", 0.0f32)
        .expect("Failed to set default uniform");
    f
}

/// 按输入尺寸设置邻域采样的纹素间距
pub fn set_texel_size(filter: &mut Filter, input_size: CanvasSize) -> Result<()> {
    filter.set_uniform("texelWidth", 1.0 / input_size.width.max(1) as f32)?;
    filter.set_uniform("texelHeight", 1.0 / input_size.height.max(1) as f32)?;
    Ok(())
}
