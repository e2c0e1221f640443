//! 计时器模块
//!
//! `GameTimer` 负责每帧的时间步长和累计运行时间（不含暂停的时间段），
//! `FrameStats` 每秒统计一次帧率，供窗口标题显示。

use std::time::{Duration, Instant};

/// 游戏计时器
#[derive(Debug, Clone)]
pub struct GameTimer {
    base_time: Instant,
    paused_time: Duration,
    stop_time: Option<Instant>,
    prev_time: Instant,
    curr_time: Instant,
    delta_time: f32,
}

impl GameTimer {
    /// 创建计时器，以当前时刻为起点
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            base_time: now,
            paused_time: Duration::ZERO,
            stop_time: None,
            prev_time: now,
            curr_time: now,
            delta_time: 0.0,
        }
    }

    /// 重置计时器（进入消息循环之前调用）
    pub fn reset(&mut self) {
        *self = Self::starting_at(Instant::now());
    }

    /// 暂停后恢复计时
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// 暂停计时
    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    /// 每帧调用一次
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub(crate) fn start_at(&mut self, now: Instant) {
        if let Some(stop_time) = self.stop_time.take() {
            self.paused_time += now.saturating_duration_since(stop_time);
            self.prev_time = now;
        }
    }

    pub(crate) fn stop_at(&mut self, now: Instant) {
        if self.stop_time.is_none() {
            self.stop_time = Some(now);
        }
    }

    pub(crate) fn tick_at(&mut self, now: Instant) {
        if self.stop_time.is_some() {
            self.delta_time = 0.0;
            return;
        }

        self.curr_time = now;
        // Instant 单调，但保险起见仍然取非负值
        self.delta_time = now.saturating_duration_since(self.prev_time).as_secs_f32();
        self.prev_time = now;
    }

    /// 是否处于暂停状态
    pub fn is_stopped(&self) -> bool {
        self.stop_time.is_some()
    }

    /// 自 `reset` 以来的运行时间（秒），不含暂停时间
    pub fn total_time(&self) -> f32 {
        let end = self.stop_time.unwrap_or(self.curr_time);
        end.saturating_duration_since(self.base_time)
            .saturating_sub(self.paused_time)
            .as_secs_f32()
    }

    /// 上一帧到本帧的时间（秒）
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }
}

impl Default for GameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// 一秒内的帧率统计结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRate {
    /// 每秒帧数
    pub fps: f32,
    /// 每帧毫秒数
    pub mspf: f32,
}

/// 帧率统计
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    frame_count: u32,
    time_elapsed: f32,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧；距上次报告满一秒时返回统计结果
    pub fn record(&mut self, total_time: f32) -> Option<FrameRate> {
        self.frame_count += 1;

        if total_time - self.time_elapsed < 1.0 {
            return None;
        }

        let fps = self.frame_count as f32;
        let rate = FrameRate { fps, mspf: 1000.0 / fps };

        self.frame_count = 0;
        self.time_elapsed += 1.0;
        Some(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_measures_delta() {
        let start = Instant::now();
        let mut timer = GameTimer::starting_at(start);

        timer.tick_at(start + Duration::from_millis(16));
        assert!((timer.delta_time() - 0.016).abs() < 1e-4);

        timer.tick_at(start + Duration::from_millis(50));
        assert!((timer.delta_time() - 0.034).abs() < 1e-4);
        assert!((timer.total_time() - 0.05).abs() < 1e-4);
    }

    #[test]
    fn test_paused_time_is_excluded() {
        let start = Instant::now();
        let mut timer = GameTimer::starting_at(start);

        timer.tick_at(start + Duration::from_secs(1));
        timer.stop_at(start + Duration::from_secs(1));
        assert!(timer.is_stopped());

        timer.tick_at(start + Duration::from_secs(3));
        assert_eq!(timer.delta_time(), 0.0);
        assert!((timer.total_time() - 1.0).abs() < 1e-4);

        timer.start_at(start + Duration::from_secs(5));
        timer.tick_at(start + Duration::from_millis(5500));
        assert!((timer.delta_time() - 0.5).abs() < 1e-4);
        assert!((timer.total_time() - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_start_without_stop_is_noop() {
        let start = Instant::now();
        let mut timer = GameTimer::starting_at(start);
        timer.start_at(start + Duration::from_secs(2));
        timer.tick_at(start + Duration::from_secs(2));
        assert!((timer.total_time() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_frame_stats_reports_once_per_second() {
        let mut stats = FrameStats::new();

        for i in 0..59 {
            assert!(stats.record(i as f32 / 60.0).is_none());
        }
        let rate = stats.record(1.0).expect("a full second elapsed");
        assert_eq!(rate.fps, 60.0);
        assert!((rate.mspf - 16.666_666).abs() < 1e-3);

        assert!(stats.record(1.5).is_none());
        assert!(stats.record(2.0).is_some());
    }
}
