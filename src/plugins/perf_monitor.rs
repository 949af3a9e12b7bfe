use bevy::prelude::*;
use std::collections::VecDeque;

pub const TARGET_FRAME_TIME_MS: f32 = 1000.0 / 60.0;
const WINDOW: usize = 60;

/// Rolling frame-time window reduced to a performance factor in `[0, 1]`:
/// 1 at or above the target frame rate, falling as frames slow down.
#[derive(Resource, Debug, Clone)]
pub struct PerfMonitor {
    samples_ms: VecDeque<f32>,
    window: usize,
    target_ms: f32,
    // Reactive redraws wait on input, so their deltas say nothing about the GPU.
    paused: bool,
}

impl Default for PerfMonitor {
    fn default() -> Self {
        Self::new(WINDOW, TARGET_FRAME_TIME_MS)
    }
}

impl PerfMonitor {
    pub fn new(window: usize, target_ms: f32) -> Self {
        Self {
            samples_ms: VecDeque::with_capacity(window.max(1)),
            window: window.max(1),
            target_ms,
            paused: false,
        }
    }

    /// Stops or resumes sampling. Either transition starts a fresh window.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused == paused { return; }
        self.paused = paused;
        self.samples_ms.clear();
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn push(&mut self, frame_ms: f32) {
        if self.paused || !frame_ms.is_finite() || frame_ms <= 0.0 { return; }
        if self.samples_ms.len() == self.window {
            self.samples_ms.pop_front();
        }
        self.samples_ms.push_back(frame_ms);
    }

    pub fn average_ms(&self) -> Option<f32> {
        if self.samples_ms.is_empty() { return None; }
        Some(self.samples_ms.iter().sum::<f32>() / self.samples_ms.len() as f32)
    }

    /// Optimistic until the first sample arrives.
    pub fn current(&self) -> f32 {
        match self.average_ms() {
            Some(avg) => (self.target_ms / avg).clamp(0.0, 1.0),
            None => 1.0,
        }
    }
}

pub struct PerfMonitorPlugin;
impl Plugin for PerfMonitorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PerfMonitor>()
            .add_systems(Last, sample_frame_time);
    }
}

fn sample_frame_time(time: Res<Time>, mut perf: ResMut<PerfMonitor>, mut was_degraded: Local<bool>) {
    if perf.is_paused() { return; }
    perf.push(time.delta_seconds() * 1000.0);
    let degraded = perf.current() < crate::plugins::gating::PERF_DEGRADE_THRESHOLD;
    if degraded != *was_degraded {
        *was_degraded = degraded;
        info!("PERF degraded={} factor={:.2}", degraded, perf.current());
    }
}
