use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::classification::domain::mask_classifier::{ClassificationError, MaskClassifier};
use crate::classification::domain::region_extractor::RegionExtractor;
use crate::classification::domain::stabilization_cache::StabilizationCache;
use crate::detection::domain::face_locator::FaceLocator;
use crate::detection::domain::identity_tracker::{FaceIdentity, IdentityTracker};
use crate::pipeline::frame_result::{FaceVerdict, FrameResult, VerdictSource};
use crate::pipeline::frame_scheduler::FrameScheduler;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineDiagnostic, PipelineLogger};
use crate::pipeline::session_metrics::{MetricsAggregator, SessionCounters};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::clock::{Clock, SystemClock};
use crate::shared::frame::Frame;
use crate::shared::session_config::{ConfigError, SessionConfig};
use crate::video::domain::frame_source::FrameSource;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("detection session is already running")]
    AlreadyRunning,
    #[error("detection session is not running")]
    NotRunning,
    #[error("frame source failed: {0}")]
    FrameSource(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
}

/// What a single [`DetectionSession::step`] did.
#[derive(Debug)]
pub enum StepOutcome {
    Processed(FrameResult),
    /// The frame source ran dry; the session has stopped.
    Exhausted(SessionSummary),
}

/// Snapshot taken just before a session stops and resets its counters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    pub frames: usize,
    pub counters: SessionCounters,
    pub compliance_rate: Option<f64>,
    pub average_latency_ms: f64,
}

/// Cooperative stop request shared with other threads (e.g. a Ctrl-C
/// handler). Checked before each iteration is scheduled; an iteration in
/// flight always completes.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Drives frames through locate → track → classify or reuse → aggregate.
///
/// Owns every piece of per-session state (frame source, stabilization
/// cache, latency window, counters). `start`, `stop` and `reset` are the
/// only commands that change that state outside of frame processing.
/// Frames are processed strictly one at a time, so none of the state
/// needs locking.
pub struct DetectionSession {
    source: Box<dyn FrameSource>,
    locator: Box<dyn FaceLocator>,
    classifier: Box<dyn MaskClassifier>,
    logger: Box<dyn PipelineLogger>,
    clock: Box<dyn Clock>,
    config: SessionConfig,
    tracker: IdentityTracker,
    extractor: RegionExtractor,
    cache: StabilizationCache,
    metrics: MetricsAggregator,
    counters: SessionCounters,
    state: SessionState,
    stop: StopHandle,
    frames_processed: usize,
}

impl DetectionSession {
    /// The identity bucket size is fixed here for the session's lifetime.
    /// Regions are resized to the classifier's declared input size, if any.
    ///
    /// Fails if `config` does not pass [`SessionConfig::validate`].
    pub fn new(
        source: Box<dyn FrameSource>,
        locator: Box<dyn FaceLocator>,
        classifier: Box<dyn MaskClassifier>,
        config: SessionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let extractor = RegionExtractor::new(classifier.input_size());
        Ok(Self {
            source,
            locator,
            classifier,
            logger: Box::new(NullPipelineLogger),
            clock: Box::new(SystemClock),
            tracker: IdentityTracker::new(config.bucket_size),
            extractor,
            cache: StabilizationCache::new(),
            metrics: MetricsAggregator::new(config.latency_window),
            counters: SessionCounters::default(),
            state: SessionState::Idle,
            stop: StopHandle::default(),
            frames_processed: 0,
            config,
        })
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    /// `None` until at least one face has been counted.
    pub fn compliance_rate(&self) -> Option<f64> {
        self.counters.compliance_rate()
    }

    pub fn fps(&self) -> u32 {
        self.metrics.fps()
    }

    pub fn average_latency_ms(&self) -> f64 {
        self.metrics.average_latency_ms()
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    /// Identities currently holding a stabilized verdict, sorted.
    pub fn cached_identities(&self) -> Vec<FaceIdentity> {
        let mut ids: Vec<_> = self.cache.identities().copied().collect();
        ids.sort();
        ids
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Idle → Running. Opens the frame source and starts a fresh cache and
    /// latency window. Session counters are left alone.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Running {
            return Err(SessionError::AlreadyRunning);
        }
        self.source
            .open()
            .map_err(|e| SessionError::FrameSource(e.to_string()))?;

        self.cache.clear();
        self.metrics.reset();
        self.metrics.mark_start(self.clock.now());
        self.stop.clear();
        self.frames_processed = 0;
        self.state = SessionState::Running;
        self.logger.info(&format!(
            "Detection session started (bucket size {}px)",
            self.tracker.bucket_size()
        ));
        Ok(())
    }

    /// Running → Idle. Releases the frame source, forgets every cached
    /// verdict and resets counters and latency.
    ///
    /// Returns the totals as they were just before the reset.
    pub fn stop(&mut self) -> Result<SessionSummary, SessionError> {
        if self.state != SessionState::Running {
            return Err(SessionError::NotRunning);
        }
        let summary = self.summary();

        self.source.close();
        self.cache.clear();
        self.counters.reset();
        self.metrics.reset();
        self.state = SessionState::Idle;

        self.logger.info(&format!(
            "Detection session stopped after {} frames",
            summary.frames
        ));
        self.logger.summary();
        Ok(summary)
    }

    /// Zeroes the session counters in any state.
    pub fn reset(&mut self) {
        self.counters.reset();
    }

    /// Pulls one frame from the source and processes it.
    ///
    /// End of stream stops the session. A source read error also stops the
    /// session and is returned.
    pub fn step(&mut self) -> Result<StepOutcome, SessionError> {
        if self.state != SessionState::Running {
            return Err(SessionError::NotRunning);
        }
        match self.source.next_frame() {
            Ok(Some(frame)) => self.process_frame(&frame).map(StepOutcome::Processed),
            Ok(None) => {
                self.logger
                    .diagnostic(&PipelineDiagnostic::FrameSourceExhausted {
                        frames: self.frames_processed,
                    });
                self.stop().map(StepOutcome::Exhausted)
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("Frame source failed: {message}");
                self.stop()?;
                Err(SessionError::FrameSource(message))
            }
        }
    }

    /// Runs one orchestration cycle on a frame the caller already has.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameResult, SessionError> {
        if self.state != SessionState::Running {
            return Err(SessionError::NotRunning);
        }
        let frame_start = self.clock.now();

        let boxes = match self.locator.locate(frame) {
            Ok(boxes) => boxes,
            Err(e) => {
                self.logger.diagnostic(&PipelineDiagnostic::LocatorFailure {
                    frame_index: frame.index(),
                    reason: e.to_string(),
                });
                Vec::new()
            }
        };
        self.logger
            .timing("locate", elapsed_ms(frame_start, self.clock.now()));

        let mut result = if boxes.is_empty() {
            self.cache.clear();
            FrameResult::empty(frame.index())
        } else {
            let mut faces = Vec::with_capacity(boxes.len());
            for bbox in &boxes {
                if let Some(face) = self.evaluate_box(frame, bbox) {
                    self.counters.record(face.has_mask);
                    faces.push(face);
                }
            }
            FrameResult::new(frame.index(), boxes.len(), faces)
        };

        let now = self.clock.now();
        self.metrics.record_frame(frame_start, now);
        result.fps = self.metrics.fps();
        result.average_latency_ms = self.metrics.average_latency_ms();

        self.frames_processed += 1;
        self.logger.timing("frame", elapsed_ms(frame_start, now));
        self.logger.metric("faces", result.face_count as f64);
        self.logger.metric("cached_identities", self.cache.len() as f64);
        self.logger.progress(self.frames_processed);
        Ok(result)
    }

    /// Cooperative loop: wait for the scheduler, step, hand the result to
    /// `on_result`, repeat. Starts the session if it is idle.
    ///
    /// Ends when the source is exhausted, `on_result` returns `false`, or
    /// a stop is requested through the [`StopHandle`].
    pub fn run<F>(
        &mut self,
        scheduler: &mut dyn FrameScheduler,
        mut on_result: F,
    ) -> Result<SessionSummary, SessionError>
    where
        F: FnMut(&FrameResult) -> bool,
    {
        if self.state == SessionState::Idle {
            self.start()?;
        }
        loop {
            if self.stop.is_stop_requested() {
                return self.stop();
            }
            scheduler.wait_for_next();
            // A stop that arrived while waiting abandons the pending frame.
            if self.stop.is_stop_requested() {
                return self.stop();
            }
            match self.step()? {
                StepOutcome::Processed(result) => {
                    if !on_result(&result) {
                        self.stop.request_stop();
                    }
                }
                StepOutcome::Exhausted(summary) => return Ok(summary),
            }
        }
    }

    /// Verdict for one box: cached if its identity is known, otherwise
    /// freshly classified and stored. `None` means the box is skipped.
    fn evaluate_box(&mut self, frame: &Frame, bbox: &BoundingBox) -> Option<FaceVerdict> {
        let identity = self.tracker.identity_for(bbox);
        if let Some(verdict) = self.cache.lookup(&identity) {
            return Some(FaceVerdict::new(*bbox, verdict, VerdictSource::Cached));
        }

        let Some(region) = self.extractor.extract(frame, bbox) else {
            self.logger.diagnostic(&PipelineDiagnostic::EmptyRegion {
                frame_index: frame.index(),
                bbox: *bbox,
            });
            return None;
        };

        let started = self.clock.now();
        let classified = self.classifier.classify(&region);
        self.logger
            .timing("classify", elapsed_ms(started, self.clock.now()));

        let verdict = classified.and_then(|v| {
            v.clamped(self.config.min_confidence, self.config.max_confidence)
                .ok_or_else(|| {
                    ClassificationError::Unavailable("non-finite confidence".into())
                })
        });
        match verdict {
            Ok(verdict) => {
                self.cache.store(identity, verdict);
                Some(FaceVerdict::new(*bbox, verdict, VerdictSource::Fresh))
            }
            Err(ClassificationError::Unavailable(reason)) => {
                self.logger
                    .diagnostic(&PipelineDiagnostic::ClassificationUnavailable {
                        frame_index: frame.index(),
                        bbox: *bbox,
                        reason,
                    });
                None
            }
        }
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            frames: self.frames_processed,
            counters: self.counters,
            compliance_rate: self.counters.compliance_rate(),
            average_latency_ms: self.metrics.average_latency_ms(),
        }
    }
}

fn elapsed_ms(from: Instant, to: Instant) -> f64 {
    to.saturating_duration_since(from).as_secs_f64() * 1000.0
}
