use std::time::{Duration, Instant};

use embedded_timers::clock::Clock;

/// 基于`std::time::Instant`的标准时钟
///
/// 示例程序用它统计每次测量周期的耗时。
#[derive(Debug, Default, Clone, Copy)]
pub struct StdClock;

impl StdClock {
    pub fn new() -> Self {
        Self
    }

    /// 执行一次操作并返回其结果和耗时
    pub fn timed<T>(&self, op: impl FnOnce() -> T) -> (T, Duration) {
        let start = self.now();
        let result = op();
        (result, self.elapsed(start))
    }
}

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn elapsed(&self, instant: Self::Instant) -> Duration {
        instant.elapsed()
    }
}
