use std::fmt::{self, Display};
use std::time::Instant;

const REPORT_INTERVAL_FRAMES: u64 = 180;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsReport {
    pub fps: f64,
    pub frames: u64,
}

impl Display for FpsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Glint || FPS: {:6.1} || Frames: {}", self.fps, self.frames)
    }
}

/// Counts presented frames and produces an average FPS report every 180 frames.
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    frames: u64,
    interval_start: Option<Instant>,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self) -> Option<FpsReport> {
        self.record_frame_at(Instant::now())
    }

    pub fn record_frame_at(&mut self, now: Instant) -> Option<FpsReport> {
        let interval_start = *self.interval_start.get_or_insert(now);

        let report = (self.frames != 0 && self.frames % REPORT_INTERVAL_FRAMES == 0).then(|| {
            self.interval_start = Some(now);

            let elapsed = now.saturating_duration_since(interval_start).as_secs_f64();
            let fps = if elapsed > 0.0 { REPORT_INTERVAL_FRAMES as f64 / elapsed } else { 0.0 };
            log::debug!("FPS: {fps:.1}");

            FpsReport { fps, frames: self.frames }
        });

        self.frames += 1;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use test_log::test;

    #[test]
    fn reports_every_180_frames() {
        let mut counter = FpsCounter::new();
        let start = Instant::now();
        let frame_time = Duration::from_millis(20);

        let mut reports = Vec::new();
        for i in 0..=360 {
            if let Some(report) = counter.record_frame_at(start + frame_time * i) {
                reports.push((i, report));
            }
        }

        assert_eq!(reports.len(), 2);

        let (index, report) = reports[0];
        assert_eq!(index, 180);
        assert_eq!(report.frames, 180);
        assert!((report.fps - 50.0).abs() < 1e-6, "{}", report.fps);

        let (index, report) = reports[1];
        assert_eq!(index, 360);
        assert_eq!(report.frames, 360);
        assert!((report.fps - 50.0).abs() < 1e-6, "{}", report.fps);
    }

    #[test]
    fn status_text() {
        let report = FpsReport { fps: 59.94, frames: 540 };
        assert_eq!(report.to_string(), "Glint || FPS:   59.9 || Frames: 540");
    }
}
