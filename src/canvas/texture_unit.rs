//! 纹理单元绑定缓存
//!
//! 跟踪每个硬件纹理单元上当前绑定的纹理。与 uniform 值不同，
//! 纹理单元绑定不依附于程序对象，跨程序共享；知道某个绑定是否仍然
//! 有效可以省掉冗余的绑定调用，更重要的是让 GPU 指令流保持干净，
//! 便于调试。
//!
//! 最后一个硬件单元被保留为"擦写单元"（scratch unit）：在调用可能
//! 在跟踪器视野之外扰动绑定状态的外部 GPU 代码之前，先 [`protect`]
//! 切换到擦写单元并作废整个缓存，保证缓存永远不撒谎。
//!
//! [`protect`]: TextureUnitTracker::protect

use crate::errors::{PrismError, Result};
use crate::gpu::{GpuContext, TextureId};

use super::Canvas;

/// 纹理单元状态跟踪器（每个 `RenderContext` 一个）
#[derive(Debug)]
pub struct TextureUnitTracker {
    /// 各单元上当前绑定的纹理；必须反映真实的 GPU 绑定状态
    bound: Vec<Option<TextureId>>,
    /// 擦写单元号（不参与分配）
    scratch: u32,
}

impl TextureUnitTracker {
    /// `max_units` 为硬件单元总数；最后一个保留为擦写单元
    #[must_use]
    pub fn new(max_units: u32) -> Self {
        let max_units = max_units.max(2);
        Self {
            bound: vec![None; max_units as usize],
            scratch: max_units - 1,
        }
    }

    /// 可分配的单元数量（不含擦写单元）
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.scratch
    }

    /// 单元上当前缓存的绑定
    #[must_use]
    pub fn binding(&self, unit: u32) -> Option<TextureId> {
        self.bound.get(unit as usize).copied().flatten()
    }

    /// 确保 `canvas` 绑定在 `unit` 上；命中缓存时不产生任何 GPU 调用。
    ///
    /// 采样参数有改动时即便命中缓存也会下发参数。
    pub fn bind(&mut self, gpu: &dyn GpuContext, unit: u32, canvas: &Canvas) -> Result<()> {
        if unit >= self.scratch {
            return Err(PrismError::OutOfResources(format!(
                "texture unit {unit} exceeds available units ({})",
                self.scratch
            )));
        }
        let texture = canvas.texture().ok_or_else(|| {
            PrismError::RenderFailed(
                "cannot sample a renderbuffer-backed canvas".into(),
            )
        })?;
        let params_dirty = canvas.take_params_dirty();
        if self.bound[unit as usize] == Some(texture) {
            if params_dirty {
                gpu.select_texture_unit(unit);
                gpu.set_texture_params(texture, canvas.params());
            }
            return Ok(());
        }
        gpu.select_texture_unit(unit);
        gpu.bind_texture(texture);
        if params_dirty {
            gpu.set_texture_params(texture, canvas.params());
        }
        self.bound[unit as usize] = Some(texture);
        Ok(())
    }

    /// 切换到擦写单元并作废缓存。
    ///
    /// 在调用任何可能改变纹理绑定的外部 GPU 代码之前使用，
    /// 避免外部绑定粘在最近使用过的单元上造成缓存失真。
    pub fn protect(&mut self, gpu: &dyn GpuContext) {
        gpu.select_texture_unit(self.scratch);
        self.invalidate();
    }

    /// 仅作废缓存（不触碰 GPU）
    pub fn invalidate(&mut self) {
        for slot in &mut self.bound {
            *slot = None;
        }
    }
}
