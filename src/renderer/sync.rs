//! GPU 同步机制模块
//!
//! CPU 与 GPU 之间只通过一个单调递增的 fence 值同步：
//! CPU 每提交一批命令就把计数器加一，并让队列在执行到该位置时
//! 把 fence 设为这个值；CPU 需要复用资源时，等待 fence 的完成值
//! 追上当时记录的值即可。
//!
//! `GpuFence` 把"队列 + fence 对象"抽象出来，帧资源环和资源上传
//! 只依赖这个 trait，因此可以在没有 GPU 的环境下测试。

use std::fmt;

use crate::core::error::Result;

/// Fence 值
///
/// 0 表示"从未提交过"，有效的提交值从 1 开始。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FenceValue(u64);

impl FenceValue {
    /// 从未提交
    pub const NONE: FenceValue = FenceValue(0);

    /// 创建新的Fence值
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// 获取内部值
    pub const fn value(self) -> u64 {
        self.0
    }

    /// 是否对应一次真实的提交
    pub const fn is_submitted(self) -> bool {
        self.0 != 0
    }

    /// 下一个Fence值
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for FenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CPU 侧的 fence 计数器
///
/// 只增不减，整个程序生命周期内共用一个。
#[derive(Debug, Default)]
pub struct FenceCounter {
    current: FenceValue,
}

impl FenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 最近一次分配的值
    pub fn current(&self) -> FenceValue {
        self.current
    }

    /// 分配下一个值
    pub fn advance(&mut self) -> FenceValue {
        self.current = self.current.next();
        self.current
    }
}

/// 命令队列上的 fence
pub trait GpuFence {
    /// GPU 已经执行到的值
    fn completed_value(&self) -> FenceValue;

    /// 阻塞，直到 `completed_value() >= value`
    fn wait_for(&self, value: FenceValue) -> Result<()>;

    /// 在队列末尾插入一条"把 fence 设为 `value`"的命令
    fn signal(&self, value: FenceValue) -> Result<()>;

    /// `value` 是否已经完成
    fn is_completed(&self, value: FenceValue) -> bool {
        self.completed_value() >= value
    }
}

/// 刷新命令队列：等待之前提交的所有命令执行完毕
///
/// 返回本次使用的 fence 值。
pub fn flush<F: GpuFence + ?Sized>(fence: &F, counter: &mut FenceCounter) -> Result<FenceValue> {
    let value = counter.advance();
    fence.signal(value)?;

    if !fence.is_completed(value) {
        fence.wait_for(value)?;
    }

    Ok(value)
}

/// 测试用的模拟 fence
///
/// `signal` 只把值放入待执行队列；`wait_for` 模拟 GPU 按顺序执行到目标值。
/// `retire_through` 可以让"GPU"提前完成一部分工作。
#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    use super::*;
    use crate::core::error::{DemoError, GraphicsError};

    #[derive(Debug, Default)]
    pub(crate) struct SimulatedFence {
        completed: Cell<FenceValue>,
        pending: RefCell<VecDeque<FenceValue>>,
        pub(crate) waits: RefCell<Vec<FenceValue>>,
        pub(crate) signals: RefCell<Vec<FenceValue>>,
        signal_fails: Cell<bool>,
    }

    impl SimulatedFence {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// 之后的 `signal` 都返回错误（例如设备已移除）
        pub(crate) fn fail_signals(&self) {
            self.signal_fails.set(true);
        }

        /// GPU 执行完所有不大于 `value` 的信号
        pub(crate) fn retire_through(&self, value: FenceValue) {
            let mut pending = self.pending.borrow_mut();
            while let Some(&front) = pending.front() {
                if front > value {
                    break;
                }
                self.completed.set(front);
                pending.pop_front();
            }
        }
    }

    impl GpuFence for SimulatedFence {
        fn completed_value(&self) -> FenceValue {
            self.completed.get()
        }

        fn wait_for(&self, value: FenceValue) -> Result<()> {
            self.waits.borrow_mut().push(value);
            self.retire_through(value);

            if self.completed.get() < value {
                return Err(DemoError::Graphics(GraphicsError::Synchronization(format!(
                    "fence value {} was never signaled",
                    value
                ))));
            }
            Ok(())
        }

        fn signal(&self, value: FenceValue) -> Result<()> {
            if self.signal_fails.get() {
                return Err(DemoError::Graphics(GraphicsError::Synchronization(format!(
                    "failed to signal fence value {}",
                    value
                ))));
            }
            self.signals.borrow_mut().push(value);
            self.pending.borrow_mut().push_back(value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::SimulatedFence;
    use super::*;

    #[test]
    fn test_fence_value() {
        let fence = FenceValue::new(0);
        assert!(!fence.is_submitted());
        assert_eq!(fence, FenceValue::NONE);

        let next = fence.next();
        assert_eq!(next.value(), 1);
        assert!(next.is_submitted());
        assert!(fence < next);
    }

    #[test]
    fn test_counter_is_monotonic() {
        let mut counter = FenceCounter::new();
        assert_eq!(counter.current(), FenceValue::NONE);

        let a = counter.advance();
        let b = counter.advance();
        assert_eq!(a.value(), 1);
        assert_eq!(b.value(), 2);
        assert_eq!(counter.current(), b);
    }

    #[test]
    fn test_flush_waits_for_everything() {
        let fence = SimulatedFence::new();
        let mut counter = FenceCounter::new();

        // 两次普通提交，GPU 还没有执行
        fence.signal(counter.advance()).unwrap();
        fence.signal(counter.advance()).unwrap();
        assert_eq!(fence.completed_value(), FenceValue::NONE);

        let value = flush(&fence, &mut counter).unwrap();
        assert_eq!(value.value(), 3);
        assert_eq!(fence.completed_value(), value);
        assert_eq!(*fence.waits.borrow(), vec![value]);
    }

    #[test]
    fn test_flush_always_waits_for_its_own_signal() {
        let fence = SimulatedFence::new();
        let mut counter = FenceCounter::new();

        flush(&fence, &mut counter).unwrap();
        fence.retire_through(FenceValue::new(100));
        let waits_before = fence.waits.borrow().len();

        // 刚 signal 的值尚未执行，仍然需要等待
        flush(&fence, &mut counter).unwrap();
        assert_eq!(fence.waits.borrow().len(), waits_before + 1);
    }

    #[test]
    fn test_waiting_for_unsignaled_value_fails() {
        let fence = SimulatedFence::new();
        assert!(fence.wait_for(FenceValue::new(5)).is_err());
    }
}
