use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

/// Loop statistics over one reporting interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    /// Game ticks simulated per wall-clock second.
    pub tps: f32,
    /// `tps` relative to the target tick rate; below 1 the game ran slow.
    pub game_speed: f32,
    pub frame_time_ms: f32,
    /// Largest single-frame step seen in the interval, in game ticks.
    pub max_frame_ticks: f32,
    /// Frames whose step was cut short by the frame-delta clamp.
    pub clamped_frames: u32,
}

/// Shared view of the latest snapshot, readable from outside the loop.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    shared: Arc<SharedMetrics>,
}

#[derive(Debug, Default)]
struct SharedMetrics {
    latest: Mutex<LoopMetricsSnapshot>,
    poison_reported: AtomicBool,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *self.lock()
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        *self.lock() = snapshot;
    }

    fn lock(&self) -> MutexGuard<'_, LoopMetricsSnapshot> {
        self.shared.latest.lock().unwrap_or_else(|poisoned| {
            if !self.shared.poison_reported.swap(true, Ordering::Relaxed) {
                warn!("metrics_lock_poisoned_recovered");
            }
            PoisonError::into_inner(poisoned)
        })
    }
}

/// One rendered frame as the loop saw it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FrameSample {
    /// Wall-clock time since the previous frame, before clamping.
    pub wall: Duration,
    /// Game ticks the scene was advanced by.
    pub ticks: f32,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval: Duration,
    target_tps: f32,
    /// Step length of a frame that hit the delta clamp.
    clamp_ticks: f32,
    started: Instant,
    frames: u32,
    wall_sum: Duration,
    ticks: f32,
    max_frame_ticks: f32,
    clamped_frames: u32,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, target_tps: u32, max_frame_delta: Duration) -> Self {
        let target_tps = target_tps.max(1) as f32;
        Self {
            interval,
            target_tps,
            clamp_ticks: max_frame_delta.as_secs_f32() * target_tps,
            started: Instant::now(),
            frames: 0,
            wall_sum: Duration::ZERO,
            ticks: 0.0,
            max_frame_ticks: 0.0,
            clamped_frames: 0,
        }
    }

    pub(crate) fn record(&mut self, sample: FrameSample) {
        self.frames = self.frames.saturating_add(1);
        self.wall_sum = self.wall_sum.saturating_add(sample.wall);
        if !sample.ticks.is_finite() || sample.ticks < 0.0 {
            return;
        }
        self.ticks += sample.ticks;
        self.max_frame_ticks = self.max_frame_ticks.max(sample.ticks);
        if sample.ticks >= self.clamp_ticks {
            self.clamped_frames += 1;
        }
    }

    /// Closes the interval once it has run its length and starts the next one.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.interval {
            return None;
        }
        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let tps = self.ticks / seconds;
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps,
            game_speed: tps / self.target_tps,
            frame_time_ms: match self.frames {
                0 => 0.0,
                frames => self.wall_sum.as_secs_f32() * 1000.0 / frames as f32,
            },
            max_frame_ticks: self.max_frame_ticks,
            clamped_frames: self.clamped_frames,
        };

        self.started = now;
        self.frames = 0;
        self.wall_sum = Duration::ZERO;
        self.ticks = 0.0;
        self.max_frame_ticks = 0.0;
        self.clamped_frames = 0;
        Some(snapshot)
    }
}
