use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::shared::frame::Frame;
use crate::tracking::face_tracker::FaceTracker;
use crate::tracking::tracking_logger::TrackingLogger;

/// Where the worker pulls frames from.
pub trait FrameSource: Send {
    /// The newest available frame, or `None` when nothing new arrived.
    fn latest_frame(&mut self) -> Option<Frame>;

    /// Frames discarded so far because a newer one was available.
    fn skipped(&self) -> usize {
        0
    }
}

/// Frame source backed by a bounded channel.
///
/// Each pull drains the channel and keeps only the newest frame, so a slow
/// tracker never falls behind the capture stream.
pub struct ChannelFrameSource {
    receiver: Receiver<Frame>,
    skipped: usize,
}

impl ChannelFrameSource {
    pub fn new(receiver: Receiver<Frame>) -> Self {
        Self {
            receiver,
            skipped: 0,
        }
    }

    /// A source plus the sender that feeds it.
    pub fn bounded(capacity: usize) -> (Sender<Frame>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        (tx, Self::new(rx))
    }
}

impl FrameSource for ChannelFrameSource {
    fn latest_frame(&mut self) -> Option<Frame> {
        let mut latest = None;
        for frame in self.receiver.try_iter() {
            if latest.replace(frame).is_some() {
                self.skipped += 1;
            }
        }
        latest
    }

    fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Background thread that runs the tracker at a fixed period.
///
/// Stopping is cooperative: the flag is checked once per tick, so
/// [`stop`](Self::stop) waits for the current period to finish.
pub struct TrackingWorker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Box<dyn TrackingLogger>>>,
}

impl TrackingWorker {
    pub fn spawn(
        tracker: Arc<FaceTracker>,
        mut source: Box<dyn FrameSource>,
        period: Duration,
        mut logger: Box<dyn TrackingLogger>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = std::thread::spawn(move || {
            let ticker = crossbeam_channel::tick(period);
            let mut skipped = source.skipped();
            while ticker.recv().is_ok() {
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }
                let Some(frame) = source.latest_frame() else {
                    continue;
                };
                let now_skipped = source.skipped();
                logger.metric("skipped_frames", (now_skipped - skipped) as f64);
                skipped = now_skipped;
                tracker.estimate_logged(&frame, logger.as_mut());
            }
            log::debug!("Tracking worker stopped");
            logger
        });

        log::debug!("Tracking worker started, period {period:?}");
        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the thread to stop and wait for it. Returns the logger on the
    /// first call, `None` afterwards or if the thread panicked.
    pub fn stop(&mut self) -> Option<Box<dyn TrackingLogger>> {
        self.stop.store(true, Ordering::Relaxed);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(logger) => Some(logger),
            Err(_) => {
                log::error!("Tracking worker panicked");
                None
            }
        }
    }
}

impl Drop for TrackingWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_estimate::FaceEstimate;
    use crate::shared::pixel_rect::PixelRect;
    use crate::testing::{FnDetector, FnLoader};
    use crate::tracking::tracker_config::TrackerConfig;
    use crate::tracking::tracking_logger::NullTrackingLogger;
    use std::sync::Mutex;
    use std::time::Instant;

    const PERIOD: Duration = Duration::from_millis(5);

    fn frame(index: usize) -> Frame {
        Frame::new(vec![50; 320 * 240], 320, 240, 1, index)
    }

    fn tracker() -> Arc<FaceTracker> {
        let loader = FnLoader::new(|| {
            Box::new(FnDetector::new(|_, _| vec![PixelRect::new(100, 80, 90, 90)]))
        });
        let tracker = FaceTracker::new(&TrackerConfig::default(), Box::new(loader));
        tracker.initialize().unwrap();
        Arc::new(tracker)
    }

    /// Counts processed frames into a shared cell.
    struct CountingLogger(Arc<Mutex<usize>>);

    impl TrackingLogger for CountingLogger {
        fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn frame(&mut self, _estimate: &FaceEstimate) {
            *self.0.lock().unwrap() += 1;
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_channel_source_keeps_latest() {
        let (tx, mut source) = ChannelFrameSource::bounded(4);
        for i in 0..3 {
            tx.send(frame(i)).unwrap();
        }

        assert_eq!(source.latest_frame().unwrap().index(), 2);
        assert_eq!(source.skipped(), 2);
        assert!(source.latest_frame().is_none());
    }

    #[test]
    fn test_channel_source_empty_and_disconnected() {
        let (tx, mut source) = ChannelFrameSource::bounded(1);
        assert!(source.latest_frame().is_none());
        drop(tx);
        assert!(source.latest_frame().is_none());
        assert_eq!(source.skipped(), 0);
    }

    #[test]
    fn test_worker_publishes_estimates() {
        let tracker = tracker();
        let (tx, source) = ChannelFrameSource::bounded(2);
        let processed = Arc::new(Mutex::new(0));
        let mut worker = TrackingWorker::spawn(
            tracker.clone(),
            Box::new(source),
            PERIOD,
            Box::new(CountingLogger(processed.clone())),
        );
        assert!(worker.is_running());

        tx.send(frame(0)).unwrap();
        assert!(wait_until(|| tracker.signal().detected));

        assert!(worker.stop().is_some());
        assert!(!worker.is_running());
        assert_eq!(*processed.lock().unwrap(), 1);
    }

    #[test]
    fn test_worker_idles_without_frames() {
        let tracker = tracker();
        let (_tx, source) = ChannelFrameSource::bounded(1);
        let mut worker = TrackingWorker::spawn(
            tracker.clone(),
            Box::new(source),
            PERIOD,
            Box::new(NullTrackingLogger),
        );

        std::thread::sleep(PERIOD * 4);
        worker.stop();
        assert_eq!(tracker.latest(), FaceEstimate::default());
    }

    #[test]
    fn test_stop_is_idempotent_and_drop_joins() {
        let (_tx, source) = ChannelFrameSource::bounded(1);
        let mut worker = TrackingWorker::spawn(
            tracker(),
            Box::new(source),
            PERIOD,
            Box::new(NullTrackingLogger),
        );
        assert!(worker.stop().is_some());
        assert!(worker.stop().is_none());

        let (_tx, source) = ChannelFrameSource::bounded(1);
        let worker = TrackingWorker::spawn(
            tracker(),
            Box::new(source),
            PERIOD,
            Box::new(NullTrackingLogger),
        );
        drop(worker);
    }
}
