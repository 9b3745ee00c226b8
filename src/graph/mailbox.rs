//! 跨线程帧信箱
//!
//! 图在拥有 GPU 上下文的线程上单线程执行；相机回调、解码器等外部
//! 生产者在自己的投递线程上产出帧。[`FrameMailbox`] 是两者之间的
//! 单槽信箱：投递永不阻塞，新帧到达时直接顶替尚未被消费的旧帧
//! （后到者胜）。这是刻意的背压/丢帧策略：永远不渲染已被取代的帧。

use std::sync::Arc;

use parking_lot::Mutex;

/// 单槽、后到者胜的跨线程信箱。
///
/// 克隆出的句柄共享同一个槽位；任意克隆都可以投递或取走。
#[derive(Debug)]
pub struct FrameMailbox<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for FrameMailbox<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for FrameMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameMailbox<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// 投递一帧。返回 true 表示顶替（丢弃）了一帧未消费的旧数据。
    pub fn post(&self, frame: T) -> bool {
        let dropped = self.slot.lock().replace(frame).is_some();
        if dropped {
            log::debug!("FrameMailbox: superseded an unconsumed frame");
        }
        dropped
    }

    /// 取走当前帧（若有），清空槽位
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    /// 槽位中是否有待消费的帧
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.slot.lock().is_some()
    }
}
