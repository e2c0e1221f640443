//! 帧资源环
//!
//! CPU 最多领先 GPU `N` 帧：每个槽位保存一帧的私有资源（命令分配器、
//! 常量缓冲区）和提交该帧时使用的 fence 值。开始新的一帧前，
//! 只有当 GPU 还没有执行完这个槽位上一次的命令时才阻塞。
//!
//! ```text
//! 帧 N   : CPU 正在写入
//! 帧 N-1 : GPU 正在处理
//! 帧 N-2 : 已完成，可以复用
//! ```

use tracing::trace;

use super::sync::{FenceCounter, FenceValue, GpuFence};
use crate::core::error::{DemoError, Result};

/// 单个帧资源
#[derive(Debug)]
pub struct FrameResource<R> {
    /// 最近一次使用该槽位提交命令时的 fence 值
    pub fence: FenceValue,
    /// 该帧私有的资源
    pub resources: R,
}

/// 帧资源环
#[derive(Debug)]
pub struct FrameRing<R> {
    frames: Vec<FrameResource<R>>,
    current: usize,
}

impl<R> FrameRing<R> {
    /// 创建 `count` 个槽位，`make` 接收槽位索引
    pub fn new<F>(count: usize, mut make: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<R>,
    {
        if count == 0 {
            return Err(DemoError::Initialization(
                "frame ring needs at least one frame resource".to_string(),
            ));
        }

        let frames = (0..count)
            .map(|index| {
                Ok(FrameResource {
                    fence: FenceValue::NONE,
                    resources: make(index)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { frames, current: 0 })
    }

    /// 切换到下一个槽位，必要时等待 GPU 释放它
    pub fn begin_frame<F: GpuFence + ?Sized>(&mut self, fence: &F) -> Result<&mut FrameResource<R>> {
        self.current = (self.current + 1) % self.frames.len();

        let pending = self.frames[self.current].fence;
        if pending.is_submitted() && !fence.is_completed(pending) {
            trace!(slot = self.current, fence = pending.value(), "waiting for frame resource");
            fence.wait_for(pending)?;
        }

        Ok(&mut self.frames[self.current])
    }

    /// 当前帧的命令已提交：分配新的 fence 值并在队列上 signal，成功后记录到槽位
    pub fn end_frame<F: GpuFence + ?Sized>(
        &mut self,
        fence: &F,
        counter: &mut FenceCounter,
    ) -> Result<FenceValue> {
        let value = counter.advance();
        fence.signal(value)?;
        self.frames[self.current].fence = value;
        Ok(value)
    }

    pub fn current(&self) -> &FrameResource<R> {
        &self.frames[self.current]
    }

    pub fn current_mut(&mut self) -> &mut FrameResource<R> {
        &mut self.frames[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// 槽位数量，至少为 1
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameResource<R>> {
        self.frames.iter()
    }
}

/// 脏标记计数
///
/// 每个帧资源都有自己的一份常量缓冲区，数据改变后
/// 必须依次写入所有槽位，因此计数从帧资源数量开始递减。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyFrames(usize);

impl DirtyFrames {
    /// 新建时视为脏，保证每个槽位至少写入一次
    pub fn new(frame_count: usize) -> Self {
        Self(frame_count)
    }

    /// 数据已改变
    pub fn mark(&mut self, frame_count: usize) {
        self.0 = frame_count;
    }

    /// 当前帧是否需要写入；需要时计数减一
    pub fn consume(&mut self) -> bool {
        if self.0 > 0 {
            self.0 -= 1;
            true
        } else {
            false
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.0 > 0
    }

    pub fn remaining(&self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::sync::testing::SimulatedFence;

    fn ring(count: usize) -> FrameRing<usize> {
        FrameRing::new(count, |index| Ok(index * 10)).unwrap()
    }

    #[test]
    fn test_empty_ring_is_rejected() {
        assert!(FrameRing::<()>::new(0, |_| Ok(())).is_err());
    }

    #[test]
    fn test_make_error_propagates() {
        let result = FrameRing::<u32>::new(3, |index| {
            if index == 2 {
                Err(DemoError::Runtime("out of memory".into()))
            } else {
                Ok(0)
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_ring_cycles_through_slots() {
        let fence = SimulatedFence::new();
        let mut counter = FenceCounter::new();
        let mut frames = ring(3);

        let mut visited = Vec::new();
        for _ in 0..6 {
            let frame = frames.begin_frame(&fence).unwrap();
            visited.push(frame.resources);
            frames.end_frame(&fence, &mut counter).unwrap();
        }
        assert_eq!(visited, vec![10, 20, 0, 10, 20, 0]);
    }

    #[test]
    fn test_fresh_slots_never_wait() {
        let fence = SimulatedFence::new();
        let mut counter = FenceCounter::new();
        let mut frames = ring(3);

        for _ in 0..3 {
            frames.begin_frame(&fence).unwrap();
            frames.end_frame(&fence, &mut counter).unwrap();
        }
        assert!(fence.waits.borrow().is_empty());
    }

    #[test]
    fn test_reused_slot_waits_for_its_own_fence() {
        let fence = SimulatedFence::new();
        let mut counter = FenceCounter::new();
        let mut frames = ring(3);

        for _ in 0..3 {
            frames.begin_frame(&fence).unwrap();
            frames.end_frame(&fence, &mut counter).unwrap();
        }

        // 第 4 帧复用第 1 帧的槽位，只需等待 fence 1
        frames.begin_frame(&fence).unwrap();
        assert_eq!(*fence.waits.borrow(), vec![FenceValue::new(1)]);
        assert_eq!(fence.completed_value(), FenceValue::new(1));
    }

    #[test]
    fn test_no_wait_when_gpu_is_ahead() {
        let fence = SimulatedFence::new();
        let mut counter = FenceCounter::new();
        let mut frames = ring(2);

        for _ in 0..2 {
            frames.begin_frame(&fence).unwrap();
            frames.end_frame(&fence, &mut counter).unwrap();
        }
        fence.retire_through(counter.current());

        frames.begin_frame(&fence).unwrap();
        assert!(fence.waits.borrow().is_empty());
    }

    #[test]
    fn test_end_frame_records_and_signals() {
        let fence = SimulatedFence::new();
        let mut counter = FenceCounter::new();
        let mut frames = ring(3);

        assert_eq!(frames.frame_count(), 3);
        frames.begin_frame(&fence).unwrap();
        let value = frames.end_frame(&fence, &mut counter).unwrap();

        assert_eq!(frames.current().fence, value);
        assert_eq!(frames.current_index(), 1);
        assert_eq!(*fence.signals.borrow(), vec![value]);
        assert_eq!(frames.iter().filter(|f| f.fence.is_submitted()).count(), 1);
    }

    #[test]
    fn test_failed_signal_leaves_slot_reusable() {
        let fence = SimulatedFence::new();
        let mut counter = FenceCounter::new();
        let mut frames = ring(2);

        frames.begin_frame(&fence).unwrap();
        fence.fail_signals();
        assert!(frames.end_frame(&fence, &mut counter).is_err());
        assert_eq!(frames.current().fence, FenceValue::NONE);
        assert!(fence.signals.borrow().is_empty());

        // 这个槽位再次轮到时不会等待一个永远不会完成的值
        frames.begin_frame(&fence).unwrap();
        frames.begin_frame(&fence).unwrap();
        assert!(fence.waits.borrow().is_empty());
    }

    #[test]
    fn test_dirty_frames_count_down() {
        let mut dirty = DirtyFrames::new(3);
        assert!(dirty.consume());
        assert!(dirty.consume());
        assert!(dirty.consume());
        assert!(!dirty.consume());
        assert!(!dirty.is_dirty());

        dirty.mark(3);
        assert_eq!(dirty.remaining(), 3);
    }
}
