use std::collections::BTreeMap;
use std::time::Instant;

use crossbeam_channel::{Sender, TrySendError};
use serde::Serialize;

use crate::shared::bounding_box::BoundingBox;

/// A recoverable condition observed while processing a frame.
///
/// None of these abort the frame; they only explain why a located box
/// did not make it into the frame result.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineDiagnostic {
    /// Box clamped to zero area against the frame.
    EmptyRegion { frame_index: usize, bbox: BoundingBox },
    /// Classifier failed for this box; nothing was cached.
    ClassificationUnavailable {
        frame_index: usize,
        bbox: BoundingBox,
        reason: String,
    },
    /// Locator errored; the frame was handled as if it had no faces.
    LocatorFailure { frame_index: usize, reason: String },
    /// Frame source reached end of stream.
    FrameSourceExhausted { frames: usize },
}

impl PipelineDiagnostic {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineDiagnostic::EmptyRegion { .. } => "empty_region",
            PipelineDiagnostic::ClassificationUnavailable { .. } => "classification_unavailable",
            PipelineDiagnostic::LocatorFailure { .. } => "locator_failure",
            PipelineDiagnostic::FrameSourceExhausted { .. } => "frame_source_exhausted",
        }
    }
}

/// Receives detection session events. Implementations decide where they go.
pub trait PipelineLogger: Send {
    /// Report how many frames have been processed so far.
    fn progress(&mut self, frames_processed: usize);

    /// Record how long a named pipeline stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per frame, cache size).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Report a recoverable per-frame condition.
    fn diagnostic(&mut self, diagnostic: &PipelineDiagnostic);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _frames_processed: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
    fn diagnostic(&mut self, _diagnostic: &PipelineDiagnostic) {}
}

/// Count, sum and peak of a stream of samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStat {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl RunningStat {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = if self.count == 1 { value } else { self.max.max(value) };
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Logger for the CLI: forwards events to the `log` facade and keeps
/// per-stage timings, metrics and diagnostic counts for the end-of-session
/// report. Progress lines are printed every `progress_every` frames.
pub struct StdoutPipelineLogger {
    progress_every: usize,
    frames: usize,
    started: Instant,
    stages: BTreeMap<String, RunningStat>,
    gauges: BTreeMap<String, RunningStat>,
    diagnostics: BTreeMap<&'static str, usize>,
}

impl StdoutPipelineLogger {
    pub fn new(progress_every: usize) -> Self {
        Self {
            progress_every: progress_every.max(1),
            frames: 0,
            started: Instant::now(),
            stages: BTreeMap::new(),
            gauges: BTreeMap::new(),
            diagnostics: BTreeMap::new(),
        }
    }

    pub fn stage(&self, name: &str) -> Option<RunningStat> {
        self.stages.get(name).copied()
    }

    pub fn gauge(&self, name: &str) -> Option<RunningStat> {
        self.gauges.get(name).copied()
    }

    /// Number of diagnostics seen with the given [`PipelineDiagnostic::name`].
    pub fn diagnostic_count(&self, name: &str) -> usize {
        self.diagnostics.get(name).copied().unwrap_or(0)
    }

    /// Multi-line session report; `None` before anything was recorded.
    pub fn report(&self) -> Option<String> {
        if self.stages.is_empty() && self.gauges.is_empty() && self.diagnostics.is_empty() {
            return None;
        }
        let secs = self.started.elapsed().as_secs_f64();
        let mut out = format!("Session summary ({} frames, {secs:.1}s total):", self.frames);

        for (name, stat) in &self.stages {
            out.push_str(&format!(
                "\n  {name:12}: avg {:6.1}ms  max {:6.1}ms  total {:7.0}ms",
                stat.mean(),
                stat.max,
                stat.sum
            ));
        }
        for (name, stat) in &self.gauges {
            out.push_str(&format!("\n  {name}: avg {:.1}", stat.mean()));
        }
        for (name, count) in &self.diagnostics {
            out.push_str(&format!("\n  {name}: {count}"));
        }
        if self.frames > 0 && secs > 0.0 {
            out.push_str(&format!("\n  Throughput: {:.1} fps", self.frames as f64 / secs));
        }
        Some(out)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, frames_processed: usize) {
        self.frames = frames_processed;
        if frames_processed % self.progress_every == 0 {
            log::info!("Processed {frames_processed} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stages.entry(stage.to_owned()).or_default().add(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.gauges.entry(name.to_owned()).or_default().add(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn diagnostic(&mut self, diagnostic: &PipelineDiagnostic) {
        *self.diagnostics.entry(diagnostic.name()).or_default() += 1;
        match diagnostic {
            PipelineDiagnostic::LocatorFailure { frame_index, reason } => {
                log::warn!("Face locator failed on frame {frame_index}: {reason}");
            }
            PipelineDiagnostic::ClassificationUnavailable {
                frame_index,
                reason,
                ..
            } => {
                log::debug!("Skipped face on frame {frame_index}: {reason}");
            }
            PipelineDiagnostic::EmptyRegion { frame_index, bbox } => {
                log::debug!("Skipped empty region {bbox:?} on frame {frame_index}");
            }
            PipelineDiagnostic::FrameSourceExhausted { frames } => {
                log::info!("Frame source exhausted after {frames} frames");
            }
        }
    }

    fn summary(&self) {
        if let Some(text) = self.report() {
            log::info!("\n\n{text}");
        }
    }
}

/// Forwards diagnostics to a bounded channel for a presentation layer.
///
/// Never blocks the session: when the receiver falls behind, events are
/// dropped and counted. Other events are discarded.
pub struct ChannelPipelineLogger {
    sender: Sender<PipelineDiagnostic>,
    dropped: usize,
}

impl ChannelPipelineLogger {
    pub fn new(sender: Sender<PipelineDiagnostic>) -> Self {
        Self { sender, dropped: 0 }
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl PipelineLogger for ChannelPipelineLogger {
    fn progress(&mut self, _frames_processed: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}

    fn diagnostic(&mut self, diagnostic: &PipelineDiagnostic) {
        match self.sender.try_send(diagnostic.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.dropped += 1,
            // Receiver gone; nobody is listening.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unavailable() -> PipelineDiagnostic {
        PipelineDiagnostic::ClassificationUnavailable {
            frame_index: 3,
            bbox: BoundingBox::new(0, 0, 10, 10),
            reason: "model unavailable".into(),
        }
    }

    #[test]
    fn test_null_logger_accepts_every_event() {
        let mut logger = NullPipelineLogger;
        logger.progress(1);
        logger.timing("locate", 5.0);
        logger.metric("faces", 3.0);
        logger.info("hello");
        logger.diagnostic(&unavailable());
        logger.summary();
    }

    #[test]
    fn test_running_stat_tracks_mean_and_peak() {
        let mut stat = RunningStat::default();
        assert_eq!(stat.mean(), 0.0);
        stat.add(-2.0);
        stat.add(-1.0);
        assert_eq!(stat.count, 2);
        assert_relative_eq!(stat.mean(), -1.5);
        assert_relative_eq!(stat.max, -1.0);
    }

    #[test]
    fn test_timings_aggregate_per_stage() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("locate", 20.0);
        logger.timing("locate", 30.0);
        logger.timing("classify", 5.0);

        let locate = logger.stage("locate").unwrap();
        assert_eq!(locate.count, 2);
        assert_relative_eq!(locate.sum, 50.0);
        assert_relative_eq!(locate.max, 30.0);
        assert_eq!(logger.stage("classify").unwrap().count, 1);
        assert!(logger.stage("frame").is_none());
    }

    #[test]
    fn test_metrics_average() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric("faces", 3.0);
        logger.metric("faces", 4.0);

        assert_relative_eq!(logger.gauge("faces").unwrap().mean(), 3.5);
    }

    #[test]
    fn test_diagnostics_are_counted_by_kind() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.diagnostic(&unavailable());
        logger.diagnostic(&unavailable());
        logger.diagnostic(&PipelineDiagnostic::LocatorFailure {
            frame_index: 1,
            reason: "timeout".into(),
        });

        assert_eq!(logger.diagnostic_count("classification_unavailable"), 2);
        assert_eq!(logger.diagnostic_count("locator_failure"), 1);
        assert_eq!(logger.diagnostic_count("empty_region"), 0);
    }

    #[test]
    fn test_report_lists_stages_metrics_and_diagnostics() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(10);
        logger.timing("locate", 20.0);
        logger.metric("faces", 2.0);
        logger.diagnostic(&unavailable());

        let report = logger.report().unwrap();
        assert!(report.starts_with("Session summary (10 frames"));
        assert!(report.contains("locate"));
        assert!(report.contains("faces: avg 2.0"));
        assert!(report.contains("classification_unavailable: 1"));
    }

    #[test]
    fn test_report_is_none_before_any_event() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(5);
        assert!(logger.report().is_none());
    }

    #[test]
    fn test_progress_keeps_latest_frame_count() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 1..=25 {
            logger.progress(i);
        }
        assert_eq!(logger.frames, 25);
    }

    #[test]
    fn test_channel_logger_forwards_diagnostics() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let mut logger = ChannelPipelineLogger::new(tx);

        logger.diagnostic(&unavailable());

        assert_eq!(rx.try_recv().unwrap(), unavailable());
        assert_eq!(logger.dropped(), 0);
    }

    #[test]
    fn test_channel_logger_drops_when_full() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut logger = ChannelPipelineLogger::new(tx);

        logger.diagnostic(&unavailable());
        logger.diagnostic(&unavailable());
        logger.diagnostic(&unavailable());

        assert_eq!(logger.dropped(), 2);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_channel_logger_ignores_disconnected_receiver() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let mut logger = ChannelPipelineLogger::new(tx);

        logger.diagnostic(&unavailable());

        assert_eq!(logger.dropped(), 0);
    }

    #[test]
    fn test_diagnostic_serializes_with_kind_tag() {
        let json = serde_json::to_string(&PipelineDiagnostic::FrameSourceExhausted { frames: 7 })
            .unwrap();
        assert_eq!(json, r#"{"kind":"frame_source_exhausted","frames":7}"#);
    }
}
