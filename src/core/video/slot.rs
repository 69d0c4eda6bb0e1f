//! 单槽邮箱：采集线程写、消费者读，最新帧覆盖旧帧
//!
//! 写入不等待读取，读取不阻塞写入（锁只在交换期间持有）。
//! 未被读取就被覆盖的帧直接丢弃并计数。

use super::frame::Frame;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 从邮箱取出的帧及其发布序号
#[derive(Debug, Clone)]
pub struct SlotFrame {
    pub seq: u64,
    pub frame: Frame,
}

#[derive(Default)]
struct SlotInner {
    pending: Option<SlotFrame>,
    last_seq: u64,
}

#[derive(Default)]
pub struct FrameSlot {
    inner: Mutex<SlotInner>,
    dropped: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布新帧，返回分配的序号
    pub fn publish(&self, frame: Frame) -> u64 {
        let mut inner = self.lock();
        inner.last_seq += 1;
        let seq = inner.last_seq;
        if inner.pending.replace(SlotFrame { seq, frame }).is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        seq
    }

    /// 取走待处理的最新帧；没有新帧时返回 None
    pub fn take(&self) -> Option<SlotFrame> {
        self.lock().pending.take()
    }

    /// 查看最新帧但不取走
    pub fn peek(&self) -> Option<SlotFrame> {
        self.lock().pending.clone()
    }

    pub fn last_seq(&self) -> u64 {
        self.lock().last_seq
    }

    /// 未被读取就被覆盖的帧数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// 清空待处理帧，序号保持单调
    pub fn clear(&self) {
        self.lock().pending = None;
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
