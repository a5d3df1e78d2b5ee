use std::collections::HashMap;
use std::time::Instant;

use crate::detection::domain::face_estimate::FaceEstimate;

/// Observer for per-frame tracking events.
///
/// Lets the worker and the CLI report stage timings and detection rates
/// without the tracker knowing where the numbers go.
pub trait TrackingLogger: Send {
    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. frames dropped by the source).
    fn metric(&mut self, name: &str, value: f64);

    /// Record the estimate published for one frame.
    fn frame(&mut self, estimate: &FaceEstimate);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullTrackingLogger;

impl TrackingLogger for NullTrackingLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn frame(&mut self, _estimate: &FaceEstimate) {}
}

/// Collects stage timings, metrics and detection counts, and logs a
/// summary at the end of a session.
pub struct StatsTrackingLogger {
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames: usize,
    detected_frames: usize,
}

impl StatsTrackingLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
            detected_frames: 0,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn detected_frames(&self) -> usize {
        self.detected_frames
    }

    /// Returns the formatted summary string, or `None` if no frame was seen.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames;
        let detected_pct = self.detected_frames as f64 / frames as f64 * 100.0;
        let mut lines = vec![format!(
            "Tracking summary ({frames} frames, {detected_pct:.1}% with a face, {:.1}s):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms"
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            let avg = values.iter().sum::<f64>() / values.len().max(1) as f64;
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        if elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for StatsTrackingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingLogger for StatsTrackingLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn frame(&mut self, estimate: &FaceEstimate) {
        self.frames += 1;
        if estimate.is_detected() {
            self.detected_frames += 1;
        }
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn detected() -> FaceEstimate {
        FaceEstimate {
            confidence: 0.8,
            ..FaceEstimate::default()
        }
    }

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullTrackingLogger;
        logger.timing("detect", 5.0);
        logger.metric("dropped", 1.0);
        logger.frame(&FaceEstimate::default());
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StatsTrackingLogger::new();
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("smooth", 0.1);

        assert_eq!(logger.timings_for("detect").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("smooth").unwrap().len(), 1);
        assert!(logger.timings_for("preprocess").is_none());
    }

    #[test]
    fn test_metric_records_values() {
        let mut logger = StatsTrackingLogger::new();
        logger.metric("dropped_frames", 3.0);
        logger.metric("dropped_frames", 4.0);

        let values = logger.metrics_for("dropped_frames").unwrap();
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        assert_relative_eq!(avg, 3.5);
    }

    #[test]
    fn test_frame_counts_detections() {
        let mut logger = StatsTrackingLogger::new();
        logger.frame(&detected());
        logger.frame(&FaceEstimate::default());
        logger.frame(&detected());

        assert_eq!(logger.frames(), 3);
        assert_eq!(logger.detected_frames(), 2);
    }

    #[test]
    fn test_summary_contents() {
        let mut logger = StatsTrackingLogger::new();
        logger.frame(&detected());
        logger.frame(&FaceEstimate::default());
        logger.timing("detect", 10.0);
        logger.timing("detect", 30.0);
        logger.metric("dropped_frames", 2.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Tracking summary (2 frames, 50.0% with a face"));
        assert!(summary.contains("avg   20.0ms"));
        assert!(summary.contains("max   30.0ms"));
        assert!(summary.contains("dropped_frames: avg 2.0"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let mut logger = StatsTrackingLogger::new();
        logger.timing("detect", 1.0);
        assert!(logger.summary_string().is_none());
    }
}
