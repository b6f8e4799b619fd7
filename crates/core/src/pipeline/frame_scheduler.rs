use std::time::{Duration, Instant};

/// Decides when the run loop may request the next frame.
pub trait FrameScheduler: Send {
    fn wait_for_next(&mut self);
}

/// Requests the next frame as soon as the previous one is done.
pub struct ImmediateScheduler;

impl FrameScheduler for ImmediateScheduler {
    fn wait_for_next(&mut self) {}
}

/// Sleeps off whatever is left of a fixed frame interval.
///
/// If processing overran the interval the next frame is requested
/// immediately; missed slots are not made up.
pub struct PacedScheduler {
    interval: Duration,
    last_release: Option<Instant>,
}

impl PacedScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_release: None,
        }
    }

    /// Returns `None` unless `fps` is finite and positive.
    pub fn from_fps(fps: f64) -> Option<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return None;
        }
        Some(Self::new(Duration::from_secs_f64(1.0 / fps)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How long to sleep at `now` before releasing the next frame.
    fn remaining(&self, now: Instant) -> Duration {
        match self.last_release {
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }
}

impl FrameScheduler for PacedScheduler {
    fn wait_for_next(&mut self) {
        let wait = self.remaining(Instant::now());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        self.last_release = Some(Instant::now());
    }
}

/// Picks a paced scheduler when a target rate is given.
pub fn scheduler_for(target_fps: Option<f64>) -> Box<dyn FrameScheduler> {
    match target_fps.and_then(PacedScheduler::from_fps) {
        Some(paced) => Box::new(paced),
        None => Box::new(ImmediateScheduler),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_fps_interval() {
        let scheduler = PacedScheduler::from_fps(25.0).unwrap();
        assert_eq!(scheduler.interval(), Duration::from_millis(40));
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-5.0)]
    #[case::nan(f64::NAN)]
    fn test_from_fps_rejects_invalid(#[case] fps: f64) {
        assert!(PacedScheduler::from_fps(fps).is_none());
    }

    #[test]
    fn test_first_frame_is_not_delayed() {
        let scheduler = PacedScheduler::new(Duration::from_millis(100));
        assert_eq!(scheduler.remaining(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn test_remaining_subtracts_elapsed() {
        let mut scheduler = PacedScheduler::new(Duration::from_millis(100));
        let t0 = Instant::now();
        scheduler.last_release = Some(t0);

        assert_eq!(
            scheduler.remaining(t0 + Duration::from_millis(30)),
            Duration::from_millis(70)
        );
        assert_eq!(
            scheduler.remaining(t0 + Duration::from_millis(250)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_paced_wait_sleeps_interval() {
        let mut scheduler = PacedScheduler::new(Duration::from_millis(20));
        scheduler.wait_for_next();
        let start = Instant::now();
        scheduler.wait_for_next();
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_immediate_scheduler_does_not_block() {
        let mut scheduler = ImmediateScheduler;
        let start = Instant::now();
        for _ in 0..100 {
            scheduler.wait_for_next();
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
