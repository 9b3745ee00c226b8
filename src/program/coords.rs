//! 标准四边形与朝向坐标表
//!
//! 全画布绘制用固定的双三角形三角带；旋转/翻转不做运行期矩阵乘法，
//! 而是按朝向枚举查预先排好的四角纹理坐标表。

/// 标准全画布顶点（三角带顺序）
pub const QUAD_VERTICES: [f32; 8] = [
    -1.0, -1.0, //
    1.0, -1.0, //
    -1.0, 1.0, //
    1.0, 1.0, //
];

/// 绘制朝向：恒等、左旋、右旋、垂直翻转、水平翻转、右旋加垂直翻转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    RotateLeft,
    RotateRight,
    FlipVertical,
    FlipHorizontal,
    RotateRightFlipVertical,
}

const NO_ROTATION: [f32; 8] = [
    0.0, 0.0, //
    1.0, 0.0, //
    0.0, 1.0, //
    1.0, 1.0, //
];

const ROTATE_LEFT: [f32; 8] = [
    1.0, 0.0, //
    1.0, 1.0, //
    0.0, 0.0, //
    0.0, 1.0, //
];

const ROTATE_RIGHT: [f32; 8] = [
    0.0, 1.0, //
    0.0, 0.0, //
    1.0, 1.0, //
    1.0, 0.0, //
];

const FLIP_VERTICAL: [f32; 8] = [
    0.0, 1.0, //
    1.0, 1.0, //
    0.0, 0.0, //
    1.0, 0.0, //
];

const FLIP_HORIZONTAL: [f32; 8] = [
    1.0, 0.0, //
    0.0, 0.0, //
    1.0, 1.0, //
    0.0, 1.0, //
];

const ROTATE_RIGHT_FLIP_VERTICAL: [f32; 8] = [
    0.0, 0.0, //
    0.0, 1.0, //
    1.0, 0.0, //
    1.0, 1.0, //
];

impl Rotation {
    /// 该朝向下四个角的纹理坐标（与 [`QUAD_VERTICES`] 同序）
    #[must_use]
    pub fn texture_coordinates(self) -> &'static [f32; 8] {
        match self {
            Rotation::None => &NO_ROTATION,
            Rotation::RotateLeft => &ROTATE_LEFT,
            Rotation::RotateRight => &ROTATE_RIGHT,
            Rotation::FlipVertical => &FLIP_VERTICAL,
            Rotation::FlipHorizontal => &FLIP_HORIZONTAL,
            Rotation::RotateRightFlipVertical => &ROTATE_RIGHT_FLIP_VERTICAL,
        }
    }
}
