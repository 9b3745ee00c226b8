//! 着色器符号
//!
//! 一个 [`Symbol`] 对应程序中一个具名 uniform 槽位的本地缓存：
//! 当前值、脏标记、链接后查询到的类型元数据，以及（仅采样器）
//! 分配到的纹理单元。
//!
//! 脏标记的不变量：本地缓存值与 GPU 上驻留值不一致时为 true，
//! 只有成功下发之后才清除。脏跟踪纯粹是为了避免每帧 O(符号数)
//! 的 GPU 调用；正确性不依赖它。

use crate::canvas::Canvas;
use crate::gpu::{SymbolInfo, UniformValue};

/// 符号的缓存值：普通值，或采样器引用的上游 Canvas
#[derive(Debug, Clone)]
pub enum SymbolValue {
    Value(UniformValue),
    /// 采样器符号持有源 Canvas 而不是原始值；下发时换算成单元号
    Input(Canvas),
}

impl SymbolValue {
    /// 赋相同值不应置脏；采样器按底层纹理句柄比较
    #[must_use]
    pub fn same_as(&self, other: &SymbolValue) -> bool {
        match (self, other) {
            (SymbolValue::Value(a), SymbolValue::Value(b)) => a == b,
            (SymbolValue::Input(a), SymbolValue::Input(b)) => {
                a.texture().is_some() && a.texture() == b.texture()
            }
            _ => false,
        }
    }
}

/// 程序中一个具名符号的本地状态
#[derive(Debug)]
pub struct Symbol {
    pub(crate) name: String,
    pub(crate) value: Option<SymbolValue>,
    pub(crate) dirty: bool,
    /// 链接后从程序对象查询到的元数据；查询前为 None
    pub(crate) info: Option<SymbolInfo>,
    /// 采样器符号分配到的纹理单元
    pub(crate) unit: Option<u32>,
}

impl Symbol {
    #[must_use]
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            dirty: false,
            info: None,
            unit: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 链接后查询到的类型元数据
    #[inline]
    #[must_use]
    pub fn info(&self) -> Option<&SymbolInfo> {
        self.info.as_ref()
    }

    /// 采样器符号分配到的纹理单元
    #[inline]
    #[must_use]
    pub fn texture_unit(&self) -> Option<u32> {
        self.unit
    }

    /// 缓存的普通 uniform 值（采样器符号返回 None）
    #[must_use]
    pub fn uniform_value(&self) -> Option<&UniformValue> {
        match &self.value {
            Some(SymbolValue::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// 采样器符号引用的源 Canvas
    #[must_use]
    pub fn input_canvas(&self) -> Option<&Canvas> {
        match &self.value {
            Some(SymbolValue::Input(c)) => Some(c),
            _ => None,
        }
    }
}
