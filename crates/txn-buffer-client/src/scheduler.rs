//! Tick-driven timeout scheduler.
//!
//! One background task fires a callback every `tick` instead of arming a timer per
//! request, so the cost is proportional to elapsed ticks rather than to pending
//! requests. A request can therefore outlive its deadline by up to one tick.

use crate::config::MAX_OPERATION_TIMEOUT;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// What the scheduler should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Handle to the periodic sweep task.
#[derive(Debug)]
pub struct TimeoutScheduler {
    tick: Duration,
    task: JoinHandle<()>,
}

impl TimeoutScheduler {
    /// Spawn the tick task on the current tokio runtime.
    ///
    /// The first tick fires one `tick` after start. `on_tick` returning
    /// [`TickControl::Stop`] ends the task. `tick` is clamped to
    /// `1ms..=MAX_OPERATION_TIMEOUT`.
    pub fn start<F>(tick: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> TickControl + Send + 'static,
    {
        let tick = tick.clamp(Duration::from_millis(1), MAX_OPERATION_TIMEOUT);
        let task = tokio::spawn(async move {
            let now = Instant::now();
            let first = now.checked_add(tick).unwrap_or(now);
            let mut ticker = interval_at(first, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if on_tick() == TickControl::Stop {
                    debug!("Timeout scheduler stopped by its owner");
                    break;
                }
            }
        });

        Self { tick, task }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the tick task. No tick fires after this returns.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for TimeoutScheduler {
    fn drop(&mut self) {
        self.task.abort();
    }
}
