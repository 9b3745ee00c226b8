//! Render Context
//!
//! The [`RenderContext`] holds everything a render pass needs: the GPU
//! context handle, the texture-unit tracker, and the frame clock. It is
//! passed explicitly through every `update`/`render` call instead of living
//! in ambient global state, which keeps GPU ownership and thread affinity
//! visible in the signatures.
//!
//! One context corresponds to one GPU execution environment; all graph,
//! canvas and program mutation must happen on the thread that owns it.

use std::rc::Rc;

use crate::canvas::TextureUnitTracker;
use crate::gpu::GpuContext;
use crate::graph::{FrameClock, Timestamp};

/// Execution-context handle threaded through render calls.
pub struct RenderContext {
    gpu: Rc<dyn GpuContext>,
    units: TextureUnitTracker,
    clock: FrameClock,
}

impl RenderContext {
    /// Wrap a GPU context. The tracker sizes itself from the hardware
    /// texture-unit count.
    #[must_use]
    pub fn new(gpu: Rc<dyn GpuContext>) -> Self {
        let units = TextureUnitTracker::new(gpu.max_texture_units());
        Self {
            gpu,
            units,
            clock: FrameClock::new(),
        }
    }

    /// The underlying GPU context.
    #[inline]
    #[must_use]
    pub fn gpu(&self) -> &Rc<dyn GpuContext> {
        &self.gpu
    }

    /// The texture-unit binding tracker.
    #[inline]
    #[must_use]
    pub fn units(&self) -> &TextureUnitTracker {
        &self.units
    }

    #[inline]
    pub fn units_mut(&mut self) -> &mut TextureUnitTracker {
        &mut self.units
    }

    /// The monotonic render clock shared by every node using this context.
    #[inline]
    #[must_use]
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Mint a fresh timestamp (called as the last step of a successful
    /// render).
    #[inline]
    pub fn mint_timestamp(&self) -> Timestamp {
        self.clock.mint()
    }

    /// Force a neutral texture-unit state before foreign GPU calls that
    /// might disturb bindings behind the tracker's back.
    pub fn protect_texture_context(&mut self) {
        self.units.protect(self.gpu.as_ref());
    }
}
