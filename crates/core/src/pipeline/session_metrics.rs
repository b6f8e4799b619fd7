use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

/// The last `capacity` frame-processing durations, oldest evicted first.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, duration_ms: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(duration_ms);
    }

    /// Mean of the retained samples, 0 when empty.
    pub fn average_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Cumulative per-session detection counts.
///
/// Only ever grows while a session runs. `DetectionSession::stop` and
/// `DetectionSession::reset` zero it; `stop` first hands back the totals in
/// its `SessionSummary`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounters {
    pub total_detections: u64,
    pub with_mask_total: u64,
    pub without_mask_total: u64,
}

impl SessionCounters {
    pub fn record(&mut self, has_mask: bool) {
        self.total_detections += 1;
        if has_mask {
            self.with_mask_total += 1;
        } else {
            self.without_mask_total += 1;
        }
    }

    /// Fraction of detections wearing a mask; `None` before any detection.
    pub fn compliance_rate(&self) -> Option<f64> {
        (self.total_detections > 0)
            .then(|| self.with_mask_total as f64 / self.total_detections as f64)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Rolling latency plus instantaneous FPS.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    latency: LatencyWindow,
    last_frame_at: Option<Instant>,
    fps: u32,
}

impl MetricsAggregator {
    pub fn new(latency_window: usize) -> Self {
        Self {
            latency: LatencyWindow::new(latency_window),
            last_frame_at: None,
            fps: 0,
        }
    }

    /// Sets the reference point the first frame's FPS is measured from.
    pub fn mark_start(&mut self, at: Instant) {
        self.last_frame_at = Some(at);
    }

    /// Records one processed frame.
    ///
    /// `frame_start` is when the iteration began, `now` when it finished.
    /// FPS is derived from the gap between consecutive iteration starts;
    /// a zero gap keeps the previous value.
    pub fn record_frame(&mut self, frame_start: Instant, now: Instant) {
        let processing = now.saturating_duration_since(frame_start);
        self.latency.record(duration_ms(processing));

        if let Some(previous) = self.last_frame_at {
            let delta_ms = duration_ms(frame_start.saturating_duration_since(previous));
            if delta_ms > 0.0 {
                self.fps = (1000.0 / delta_ms).round() as u32;
            }
        }
        self.last_frame_at = Some(frame_start);
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn average_latency_ms(&self) -> f64 {
        self.latency.average_ms()
    }

    pub fn latency(&self) -> &LatencyWindow {
        &self.latency
    }

    pub fn reset(&mut self) {
        self.latency.clear();
        self.last_frame_at = None;
        self.fps = 0;
    }
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
