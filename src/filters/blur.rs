//! 模糊滤镜
//!
//! 盒式模糊与可分离高斯模糊。两者都是内部两趟的 [`TwoPassFilter`]：
//! 第一趟水平采样，第二趟垂直采样，各 9 个 tap。tap 间距由
//! `texelWidthOffset` / `texelHeightOffset` 控制；[`set_blur_size`]
//! 按输入尺寸与模糊倍率换算两趟的偏移量。

use std::rc::Rc;

use crate::errors::Result;
use crate::filter::{Filter, TwoPassFilter};
use crate::gpu::{CanvasSize, GpuContext};

const GAUSSIAN_BLUR_FRAGMENT_SHADER: &str = "\
varying highp vec2 textureCoordinate;

uniform sampler2D inputImage;
uniform highp float texelWidthOffset;
uniform highp float texelHeightOffset;

void main()
{
    highp vec2 step = vec2(texelWidthOffset, texelHeightOffset);
    lowp vec4 sum = vec4(0.0);

    sum += texture2D(inputImage, textureCoordinate - 4.0 * step) * 0.05;
    sum += texture2D(inputImage, textureCoordinate - 3.0 * step) * 0.09;
    sum += texture2D(inputImage, textureCoordinate - 2.0 * step) * 0.12;
    sum += texture2D(inputImage, textureCoordinate - 1.0 * step) * 0.15;
    sum += texture2D(inputImage, textureCoordinate) * 0.18;
    sum += texture2D(inputImage, textureCoordinate + 1.0 * step) * 0.15;
    sum += texture2D(inputImage, textureCoordinate + 2.0 * step) * 0.12;
    sum += texture2D(inputImage, textureCoordinate + 3.0 * step) * 0.09;
    sum += texture2D(inputImage, textureCoordinate + 4.0 * step) * 0.05;

    gl_FragColor = sum;
}
";

const BOX_BLUR_FRAGMENT_SHADER: &str = "\
varying highp vec2 textureCoordinate;

uniform sampler2D inputImage;
uniform highp float texelWidthOffset;
uniform highp float texelHeightOffset;

void main()
{
    highp vec2 step = vec2(texelWidthOffset, texelHeightOffset);
    lowp vec4 sum = vec4(0.0);

    sum += texture2D(inputImage, textureCoordinate - 4.0 * step);
    sum += texture2D(inputImage, textureCoordinate - 3.0 * step);
    sum += texture2D(inputImage, textureCoordinate - 2.0 * step);
    sum += texture2D(inputImage, textureCoordinate - 1.0 * step);
    sum += texture2D(inputImage, textureCoordinate);
    sum += texture2D(inputImage, textureCoordinate + 1.0 * step);
    sum += texture2D(inputImage, textureCoordinate + 2.0 * step);
    sum += texture2D(inputImage, textureCoordinate + 3.0 * step);
    sum += texture2D(inputImage, textureCoordinate + 4.0 * step);

    gl_FragColor = sum / 9.0;
}
";

fn two_pass_blur(gpu: &Rc<dyn GpuContext>, name: &str, fragment: &str) -> TwoPassFilter {
    let mut stage_one = Filter::with_fragment(gpu, &format!("{name}_horizontal"), fragment);
    let mut stage_two = Filter::with_fragment(gpu, &format!("{name}_vertical"), fragment);
    // 偏移量在首次 set_blur_size 前为 0（等价于直通）
    stage_one
        .set_uniform("texelWidthOffset", 0.0f32)
        .expect("Failed to set default uniform");
    stage_one
        .set_uniform("texelHeightOffset", 0.0f32)
        .expect("Failed to set default uniform");
    stage_two
        .set_uniform("texelWidthOffset", 0.0f32)
        .expect("Failed to set default uniform");
    stage_two
        .set_uniform("texelHeightOffset", 0.0f32)
        .expect("Failed to set default uniform");
    TwoPassFilter::new(name, stage_one, stage_two)
}

/// 可分离高斯模糊
pub fn gaussian_blur(gpu: &Rc<dyn GpuContext>) -> TwoPassFilter {
    two_pass_blur(gpu, "gaussian_blur", GAUSSIAN_BLUR_FRAGMENT_SHADER)
}

/// 盒式模糊
pub fn box_blur(gpu: &Rc<dyn GpuContext>) -> TwoPassFilter {
    two_pass_blur(gpu, "box_blur", BOX_BLUR_FRAGMENT_SHADER)
}

/// 按输入尺寸换算两趟的 tap 偏移。
///
/// `blur_size` 为模糊倍率，0.0 起，1.0 为默认档。
pub fn set_blur_size(
    blur: &mut TwoPassFilter,
    blur_size: f32,
    input_size: CanvasSize,
) -> Result<()> {
    let width = input_size.width.max(1) as f32;
    let height = input_size.height.max(1) as f32;
    blur.stage_one_mut()
        .set_uniform("texelWidthOffset", blur_size / width)?;
    blur.stage_one_mut().set_uniform("texelHeightOffset", 0.0f32)?;
    blur.stage_two_mut().set_uniform("texelWidthOffset", 0.0f32)?;
    blur.stage_two_mut()
        .set_uniform("texelHeightOffset", blur_size / height)?;
    Ok(())
}
